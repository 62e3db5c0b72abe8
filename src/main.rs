/*!
gg is a line oriented search tool: it recursively walks the given roots,
matches each candidate file against one or more patterns (literal, regex
or PCRE) and prints matching lines in walker discovery order.

The driver below wires the pipeline together. The walker produces file
entries on a bounded channel; the scheduler's worker pool reads and scans
each file, tagging results with discovery-order sequence numbers; the
ordered writer re-serialises results by sequence and owns the only exit of
match output. Directory errors drain onto stderr on their own thread so
warnings never mix into match output.

Exit codes: 0 when something matched, 1 when nothing matched, 2 for
configuration or startup errors.
*/

use std::error::Error;
use std::io;
use std::process;
use std::result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel as channel;

mod app;
mod args;
mod binary;
mod bytestr;
mod config;
mod gitignore;
mod glob;
mod json;
mod matcher;
mod matchset;
mod pathutil;
mod printer;
mod reader;
mod walker;
mod worker;
mod writer;

use crate::args::Args;
use crate::reader::BufferPool;
use crate::worker::{Scheduler, Work};
use crate::writer::OutputWriter;

pub type Result<T> = result::Result<T, Box<dyn Error + Send + Sync>>;

fn main() {
    match Args::parse().and_then(run) {
        Ok(true) => process::exit(0),
        Ok(false) => process::exit(1),
        Err(err) => {
            eprintln!("gg: {}", err);
            process::exit(2);
        }
    }
}

fn run(args: Args) -> Result<bool> {
    let matcher = args.matcher()?;
    let pool = Arc::new(BufferPool::new());
    let reader = args.reader(pool.clone());
    let workers = args.workers();
    // Bounded channels cap the number of in-flight buffers.
    let bound = workers * 2;

    let (work_tx, work_rx) = channel::bounded::<Work>(bound);
    let (result_tx, result_rx) = channel::bounded(bound);

    let found = Arc::new(AtomicBool::new(false));
    let found_flag = found.clone();
    let writer =
        OutputWriter::new(io::BufWriter::new(io::stdout()), args.format())
            .on_found(Box::new(move |_| {
                found_flag.store(true, Ordering::SeqCst);
            }));
    let writer_thread = thread::spawn(move || writer.run(result_rx));

    let mut feeders = Vec::new();
    if args.search_stdin() {
        work_tx
            .send(Work::Stdin)
            .map_err(|_| "output pipeline closed early")?;
        drop(work_tx);
    } else {
        let walker = args.walker()?;
        let (entry_tx, entry_rx) = channel::bounded(bound);
        let (err_tx, err_rx) = channel::bounded(bound);
        feeders.push(thread::spawn(move || {
            for err in err_rx {
                eprintln!("gg: {}", err);
            }
        }));
        feeders.push(thread::spawn(move || walker.run(entry_tx, err_tx)));
        feeders.push(thread::spawn(move || {
            for entry in entry_rx {
                if work_tx.send(Work::File(entry)).is_err() {
                    break;
                }
            }
        }));
    }

    let scheduler =
        Scheduler::new(matcher, reader, pool, args.mode(), workers);
    scheduler.run(work_rx, result_tx);

    let matched = writer_thread.join().expect("writer thread panicked");
    for feeder in feeders {
        feeder.join().expect("pipeline thread panicked");
    }
    Ok(found.load(Ordering::SeqCst) || matched > 0)
}
