//! Trajectory module - Turn per-day state snapshots into transition events

pub mod decoder;
pub mod models;

// Re-export key types
pub use decoder::{TrajectoryDecoder, decode, infer_initial_state};
pub use models::{Event, Run, Snapshot, Trajectory};
