/*!
Extraction of a required literal from a regex pattern. A literal is
"required" when it must appear in every match, which makes it usable as a
prefilter: the SIMD substring scan finds candidate offsets and the regex
only runs on the few lines that contain the literal.

The extraction walks the parsed syntax tree:

* literal runs inside a concatenation merge into one candidate;
* groups and repetitions with a minimum of one recurse into their child;
* `?`, `*` and alternations contribute nothing (their child may be absent);
* a dot that can match the line terminator (under the `s` flag) poisons the
  whole pattern, because candidate verification happens per line.

Of the collected candidates the longest all-ASCII one wins, and only if it
is at least three bytes long; shorter filters generate more candidate hits
than they eliminate.
*/

use regex_syntax::ast::{
    self, Ast, Flag, FlagsItemKind, GroupKind, RepetitionKind, RepetitionRange,
};

/// The minimum useful filter length.
const MIN_FILTER_LEN: usize = 3;

/// A literal that must occur in every match of the pattern it was extracted
/// from. `needle` is lowercased when `case_insensitive` is set.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LiteralFilter {
    pub needle: Vec<u8>,
    pub case_insensitive: bool,
}

/// Extracts the best required literal from `pattern`, or `None` when the
/// pattern has no usable required literal (or could not be parsed; the real
/// parse error surfaces when the regex itself is compiled).
pub fn required_literal(
    pattern: &str,
    case_insensitive: bool,
) -> Option<LiteralFilter> {
    let ast = ast::parse::Parser::new().parse(pattern).ok()?;
    let mut ex = Extractor { candidates: vec![], disabled: false };
    let flags = FlagState { casei: case_insensitive, dotnl: false };
    ex.walk(&ast, flags, true);
    if ex.disabled {
        return None;
    }
    let best = ex
        .candidates
        .into_iter()
        .filter(|c| c.text.is_ascii() && c.text.len() >= MIN_FILTER_LEN)
        .max_by_key(|c| c.text.len())?;
    let mut needle = best.text.into_bytes();
    if best.casei {
        needle.make_ascii_lowercase();
    }
    Some(LiteralFilter { needle, case_insensitive: best.casei })
}

/// Inline flag state tracked during the walk.
#[derive(Clone, Copy)]
struct FlagState {
    casei: bool,
    dotnl: bool,
}

struct Candidate {
    text: String,
    casei: bool,
}

struct Extractor {
    candidates: Vec<Candidate>,
    disabled: bool,
}

impl Extractor {
    /// Walks `ast` under `flags`. `collecting` is false inside constructs
    /// whose contents are not required (alternations, `?`, `*`); the walk
    /// still descends there to spot prefilter-poisoning dots. Returns the
    /// flag state after the node, since `(?s)`-style settings apply to the
    /// remainder of their enclosing concatenation.
    fn walk(&mut self, ast: &Ast, flags: FlagState, collecting: bool) -> FlagState {
        match *ast {
            Ast::Empty(_) | Ast::Assertion(_) | Ast::Class(_) => flags,
            Ast::Flags(ref set) => apply_flags(flags, &set.flags),
            Ast::Dot(_) => {
                if flags.dotnl {
                    self.disabled = true;
                }
                flags
            }
            Ast::Literal(ref lit) => {
                if collecting {
                    self.candidates.push(Candidate {
                        text: lit.c.to_string(),
                        casei: flags.casei,
                    });
                }
                flags
            }
            Ast::Repetition(ref rep) => {
                let at_least_once = match rep.op.kind {
                    RepetitionKind::OneOrMore => true,
                    RepetitionKind::Range(RepetitionRange::Exactly(n))
                    | RepetitionKind::Range(RepetitionRange::AtLeast(n)) => n >= 1,
                    RepetitionKind::Range(RepetitionRange::Bounded(m, _)) => {
                        m >= 1
                    }
                    RepetitionKind::ZeroOrOne
                    | RepetitionKind::ZeroOrMore => false,
                };
                self.walk(&rep.ast, flags, collecting && at_least_once);
                flags
            }
            Ast::Group(ref group) => {
                let inner = match group.kind {
                    GroupKind::NonCapturing(ref f) => apply_flags(flags, f),
                    _ => flags,
                };
                self.walk(&group.ast, inner, collecting);
                flags
            }
            Ast::Alternation(ref alt) => {
                for a in &alt.asts {
                    self.walk(a, flags, false);
                }
                flags
            }
            Ast::Concat(ref concat) => {
                let mut cur = flags;
                let mut run = String::new();
                let mut run_casei = cur.casei;
                for child in &concat.asts {
                    if let Ast::Literal(ref lit) = *child {
                        if collecting {
                            if run.is_empty() {
                                run_casei = cur.casei;
                            }
                            run.push(lit.c);
                            continue;
                        }
                    }
                    self.flush(&mut run, run_casei);
                    cur = self.walk(child, cur, collecting);
                }
                self.flush(&mut run, run_casei);
                flags
            }
        }
    }

    fn flush(&mut self, run: &mut String, casei: bool) {
        if !run.is_empty() {
            self.candidates.push(Candidate {
                text: std::mem::take(run),
                casei,
            });
        }
    }
}

fn apply_flags(mut cur: FlagState, flags: &ast::Flags) -> FlagState {
    let mut negated = false;
    for item in &flags.items {
        match item.kind {
            FlagsItemKind::Negation => negated = true,
            FlagsItemKind::Flag(Flag::CaseInsensitive) => {
                cur.casei = !negated;
            }
            FlagsItemKind::Flag(Flag::DotMatchesNewLine) => {
                cur.dotnl = !negated;
            }
            FlagsItemKind::Flag(_) => {}
        }
    }
    cur
}
