//! Trajectory data models

use crate::state_machine::{State, TransitionId};
use serde::{Deserialize, Serialize};

/// One state per monitored unit for a single day
pub type Snapshot = Vec<State>;

/// One snapshot per day, all of equal length
pub type Trajectory = Vec<Snapshot>;

/// A single transition of one unit on one day.
///
/// State changes are self-transitions of a unit, so `subject` and `source`
/// name the same unit. `day` is the 0-based index of the snapshot where the
/// change was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event {
    pub transition: TransitionId,
    pub subject: u32,
    pub source: u32,
    pub day: u32,
}

impl Event {
    pub fn new(transition: TransitionId, subject: u32, source: u32, day: u32) -> Self {
        Self {
            transition,
            subject,
            source,
            day,
        }
    }

    /// A state change of `unit` with itself as the source
    pub fn state_change(transition: TransitionId, unit: u32, day: u32) -> Self {
        Self::new(transition, unit, unit, day)
    }

    pub fn as_tuple(&self) -> (TransitionId, u32, u32, u32) {
        (self.transition, self.subject, self.source, self.day)
    }
}

/// A simulation run read from a trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    /// Run number as written in the trace
    pub run: u32,
    pub trajectory: Trajectory,
}

impl Run {
    pub fn new(run: u32, trajectory: Trajectory) -> Self {
        Self { run, trajectory }
    }

    /// Number of monitored units, 0 for an empty run
    pub fn unit_count(&self) -> usize {
        self.trajectory.first().map(Vec::len).unwrap_or(0)
    }

    pub fn day_count(&self) -> usize {
        self.trajectory.len()
    }

    pub fn first_snapshot(&self) -> Option<&Snapshot> {
        self.trajectory.first()
    }
}
