//! NAADSM text trace reader
//!
//! Two framings are understood. The `node` framing writes a header before
//! every daily state line:
//!
//! ```text
//! node 0 run 5620
//! 1 0 0 0
//! node 0 run 5620
//! 3 0 0 0
//! ```
//!
//! The `Iteration` framing writes one header per run followed by one line
//! per day, using digits or the one-letter state codes, until a blank line:
//!
//! ```text
//! Iteration 1
//! S L S S
//! S B S S
//! ```

use crate::error::{Error, Result};
use crate::state_machine::State;
use crate::trajectory::{Run, Snapshot};
use regex::Regex;
use std::io::{BufRead, Lines};

const NODE_HEADER: &str = r"^node\s+(\d+)\s+run\s+(\d+)$";
const ITERATION_HEADER: &str = r"^Iteration\s+(\d+)$";

/// One-letter NAADSM state codes in state order: Susceptible, Latent,
/// suBclinical, Clinical, Naturally immune, Vaccine immune, Destroyed.
const STATE_CODES: [char; 7] = ['S', 'L', 'B', 'C', 'N', 'V', 'D'];

/// Map a state token to its numeric state
pub fn parse_state_code(token: &str) -> Option<State> {
    if let Ok(state) = token.parse::<State>() {
        return Some(state);
    }
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(code), None) => STATE_CODES
            .iter()
            .position(|&c| c == code)
            .map(|idx| idx as State),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Header,
    NodeStates,
    IterationStates,
}

#[derive(Debug)]
struct RunBuilder {
    run: u32,
    snapshots: Vec<Snapshot>,
}

impl RunBuilder {
    fn push(&mut self, snapshot: Snapshot) -> Result<()> {
        if let Some(first) = self.snapshots.first() {
            if first.len() != snapshot.len() {
                return Err(Error::Shape {
                    expected: first.len(),
                    found: snapshot.len(),
                    day: self.snapshots.len(),
                });
            }
        }
        self.snapshots.push(snapshot);
        Ok(())
    }

    fn finish(self) -> Run {
        tracing::debug!("Read run {} with {} days", self.run, self.snapshots.len());
        Run::new(self.run, self.snapshots)
    }
}

/// Lazy, forward-only reader yielding one [`Run`] per simulation run.
///
/// A change of run number in the headers closes the current run. Lines
/// outside a header block are ignored. The reader stops after the first
/// error.
pub struct TraceReader<R> {
    lines: Lines<R>,
    line_no: usize,
    pending: Option<(usize, String)>,
    current: Option<RunBuilder>,
    expect: Expect,
    node_header: Regex,
    iteration_header: Regex,
    done: bool,
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(reader: R) -> Result<Self> {
        Ok(Self {
            lines: reader.lines(),
            line_no: 0,
            pending: None,
            current: None,
            expect: Expect::Header,
            node_header: Regex::new(NODE_HEADER).map_err(anyhow::Error::from)?,
            iteration_header: Regex::new(ITERATION_HEADER).map_err(anyhow::Error::from)?,
            done: false,
        })
    }

    fn next_line(&mut self) -> Option<Result<(usize, String)>> {
        if let Some(pending) = self.pending.take() {
            return Some(Ok(pending));
        }
        let line = self.lines.next()?;
        self.line_no += 1;
        Some(line.map(|l| (self.line_no, l)).map_err(Error::from))
    }

    /// Run number of a header line and the framing it opens
    fn header(&self, line_no: usize, line: &str) -> Result<Option<(u32, Expect)>> {
        let (captures, group, expect) = if let Some(c) = self.node_header.captures(line) {
            (c, 2usize, Expect::NodeStates)
        } else if let Some(c) = self.iteration_header.captures(line) {
            (c, 1usize, Expect::IterationStates)
        } else {
            return Ok(None);
        };
        let run = captures[group]
            .parse::<u32>()
            .map_err(|e| Error::trace(line_no, format!("bad run number: {}", e)))?;
        Ok(Some((run, expect)))
    }

    fn parse_states(line_no: usize, line: &str, allow_codes: bool) -> Result<Snapshot> {
        line.split_whitespace()
            .map(|token| {
                let state = if allow_codes {
                    parse_state_code(token)
                } else {
                    token.parse::<State>().ok()
                };
                state.ok_or_else(|| Error::trace(line_no, format!("unknown state {:?}", token)))
            })
            .collect()
    }

    fn read_run(&mut self) -> Result<Option<Run>> {
        while let Some(next) = self.next_line() {
            let (line_no, raw) = next?;
            let line = raw.trim();

            if let Some((run, expect)) = self.header(line_no, line)? {
                if self.expect == Expect::NodeStates {
                    return Err(Error::trace(line_no, "node header without state line"));
                }
                let current_run = self.current.as_ref().map(|current| current.run);
                match current_run {
                    Some(current) if current != run => {
                        self.pending = Some((line_no, raw));
                        self.expect = Expect::Header;
                        return Ok(self.current.take().map(RunBuilder::finish));
                    }
                    Some(_) => {}
                    None => {
                        self.current = Some(RunBuilder {
                            run,
                            snapshots: Vec::new(),
                        });
                    }
                }
                self.expect = expect;
                continue;
            }

            if line.is_empty() {
                if self.expect == Expect::IterationStates {
                    self.expect = Expect::Header;
                }
                continue;
            }

            let snapshot = match self.expect {
                Expect::Header => {
                    tracing::trace!("Skipping line {}: {}", line_no, line);
                    continue;
                }
                Expect::NodeStates => {
                    self.expect = Expect::Header;
                    Self::parse_states(line_no, line, false)?
                }
                Expect::IterationStates => Self::parse_states(line_no, line, true)?,
            };
            if let Some(current) = self.current.as_mut() {
                current.push(snapshot)?;
            }
        }

        if self.expect == Expect::NodeStates {
            return Err(Error::trace(self.line_no, "node header without state line"));
        }
        Ok(self.current.take().map(RunBuilder::finish))
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = Result<Run>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_run() {
            Ok(Some(run)) => Some(Ok(run)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read_all(text: &str) -> Result<Vec<Run>> {
        TraceReader::new(Cursor::new(text.to_string()))?.collect()
    }

    #[test]
    fn test_node_framing() {
        let text = "\
node 0 run 5620
1 0 0 0
node 0 run 5620
3 0 0 0
node 0 run 5620
3 0 1 0
node 0 run 5621
0 0 0 0
node 0 run 5621
0 1 0 0
";
        let runs = read_all(text).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].run, 5620);
        assert_eq!(
            runs[0].trajectory,
            vec![vec![1, 0, 0, 0], vec![3, 0, 0, 0], vec![3, 0, 1, 0]]
        );
        assert_eq!(runs[1].run, 5621);
        assert_eq!(runs[1].day_count(), 2);
    }

    #[test]
    fn test_iteration_framing_with_codes() {
        let text = "\
Iteration 1
S L S
S B 2

Iteration 2
0 0 0
C 0 N
";
        let runs = read_all(text).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].trajectory, vec![vec![0, 1, 0], vec![0, 2, 2]]);
        assert_eq!(runs[1].run, 2);
        assert_eq!(runs[1].trajectory, vec![vec![0, 0, 0], vec![3, 0, 4]]);
    }

    #[test]
    fn test_unrelated_lines_skipped() {
        let text = "# NAADSM output\nnode 3 run 1\n0 1\nsummary line\nnode 3 run 1\n1 1\n";
        let runs = read_all(text).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].trajectory, vec![vec![0, 1], vec![1, 1]]);
    }

    #[test]
    fn test_shape_error_within_run() {
        let text = "node 0 run 1\n0 0\nnode 0 run 1\n0 0 0\n";
        let err = read_all(text).unwrap_err();
        assert!(matches!(
            err,
            Error::Shape {
                expected: 2,
                found: 3,
                day: 1
            }
        ));
    }

    #[test]
    fn test_bad_token_reports_line() {
        let text = "node 0 run 1\n0 X\n";
        match read_all(text).unwrap_err() {
            Error::Trace { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_truncated_node_block() {
        assert!(read_all("node 0 run 1\n0 0\nnode 0 run 1\n").is_err());
    }

    #[test]
    fn test_node_header_without_state_line() {
        let err = read_all("node 0 run 1\nnode 0 run 1\n0 0\n").unwrap_err();
        assert!(matches!(err, Error::Trace { line: 2, .. }));

        // A new run may not start before the open header gets its states either.
        assert!(read_all("node 0 run 1\nnode 0 run 2\n0 0\n").is_err());
    }

    #[test]
    fn test_empty_trace() {
        assert!(read_all("").unwrap().is_empty());
    }

    #[test]
    fn test_reader_stops_after_error() {
        let mut reader = TraceReader::new(Cursor::new("node 0 run 1\nbad\n")).unwrap();
        assert!(matches!(reader.next(), Some(Err(_))));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_state_codes() {
        assert_eq!(parse_state_code("S"), Some(0));
        assert_eq!(parse_state_code("D"), Some(6));
        assert_eq!(parse_state_code("12"), Some(12));
        assert_eq!(parse_state_code("X"), None);
        assert_eq!(parse_state_code("SL"), None);
    }
}
