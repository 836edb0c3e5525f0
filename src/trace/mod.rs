//! Trace module - Read simulation traces into runs of daily snapshots

use crate::Result;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub mod reader;

pub use reader::{TraceReader, parse_state_code};

/// Open a trace file for lazy, run-by-run reading
pub fn open_trace(path: impl AsRef<Path>) -> Result<TraceReader<BufReader<File>>> {
    let path = path.as_ref();
    tracing::info!("Reading trace {:?}", path);
    let file = File::open(path)?;
    TraceReader::new(BufReader::new(file))
}
