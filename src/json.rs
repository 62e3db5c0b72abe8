/*!
The json module renders match sets as JSON lines: one object per matched
line, no wrapping array, so consumers can stream the output. Context lines
and group separators carry no match of their own and are omitted. Line text
is decoded lossily; a file that slipped past the binary filters cannot
corrupt the output stream.
*/

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::matchset::MatchSet;

#[derive(Serialize)]
struct JsonMatch<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    file: Option<&'a str>,
    line_number: u64,
    byte_offset: u64,
    text: &'a str,
    matches: Vec<JsonSpan>,
}

#[derive(Serialize)]
struct JsonSpan {
    start: usize,
    end: usize,
}

/// Formats whole match sets into a reusable byte buffer.
pub struct JsonPrinter {
    buf: Vec<u8>,
}

impl JsonPrinter {
    pub fn new() -> JsonPrinter {
        JsonPrinter { buf: Vec::new() }
    }

    /// Renders every non-context record of the set as one JSON object per
    /// line. The returned slice lives until the next formatting call.
    pub fn format(
        &mut self,
        path: Option<&Path>,
        data: &[u8],
        set: &MatchSet,
    ) -> &[u8] {
        self.buf.clear();
        let file = path.map(|p| p.to_string_lossy());
        for rec in &set.matches {
            if rec.is_separator() || rec.is_context {
                continue;
            }
            let line = &data[rec.line_start..rec.line_start + rec.line_len];
            let text = String::from_utf8_lossy(line);
            let msg = JsonMatch {
                kind: "match",
                file: file.as_deref(),
                line_number: rec.line_num,
                byte_offset: rec.byte_offset,
                text: &text,
                matches: set
                    .positions_of(rec)
                    .iter()
                    .map(|&(start, end)| JsonSpan { start, end })
                    .collect(),
            };
            // Serialisation of these records cannot fail; ignore the
            // write-to-vec result the same way the text printer does.
            if serde_json::to_writer(&mut self.buf, &msg).is_ok() {
                let _ = self.buf.write_all(b"\n");
            }
        }
        &self.buf
    }
}
