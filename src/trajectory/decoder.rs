//! Trajectory decoder
//!
//! Infers the transitions that happened between consecutive snapshots.
//! Several transitions may fall into one day when intermediate states were
//! skipped, so one observed state change can emit several events.

use super::{Event, Snapshot};
use crate::error::{Error, Result};
use crate::state_machine::{State, TransitionGraph, TransitionId};
use std::collections::BTreeSet;

/// Rolling decoder state for one trajectory.
///
/// Holds only the previous snapshot and the day counter, so decoding is a
/// fold over the snapshot stream. Independent trajectories need independent
/// decoders; the graph itself can be shared.
#[derive(Debug, Clone)]
pub struct TrajectoryDecoder<'g> {
    graph: &'g TransitionGraph,
    previous: Snapshot,
    day: usize,
}

impl<'g> TrajectoryDecoder<'g> {
    pub fn new(graph: &'g TransitionGraph, initial: Snapshot) -> Self {
        Self {
            graph,
            previous: initial,
            day: 0,
        }
    }

    /// Day index the next snapshot will be assigned
    pub fn day(&self) -> usize {
        self.day
    }

    pub fn previous(&self) -> &Snapshot {
        &self.previous
    }

    /// Compare `snapshot` with the previous one and append the events for
    /// every changed unit, in increasing unit order. Nothing is appended if
    /// the step fails.
    pub fn step_into(&mut self, snapshot: Snapshot, out: &mut Vec<Event>) -> Result<()> {
        if snapshot.len() != self.previous.len() {
            return Err(Error::Shape {
                expected: self.previous.len(),
                found: snapshot.len(),
                day: self.day,
            });
        }

        let day = to_u32(self.day, "day")?;
        let mut events = Vec::new();
        for (unit, (&from, &to)) in self.previous.iter().zip(snapshot.iter()).enumerate() {
            if from == to {
                continue;
            }
            let transitions = self.transitions(from, to, unit)?;
            let subject = to_u32(unit, "unit")?;
            events.extend(
                transitions
                    .iter()
                    .map(|&transition| Event::state_change(transition, subject, day)),
            );
        }

        out.append(&mut events);
        self.previous = snapshot;
        self.day += 1;
        Ok(())
    }

    /// Same as [`TrajectoryDecoder::step_into`] returning the day's events.
    pub fn step(&mut self, snapshot: Snapshot) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        self.step_into(snapshot, &mut events)?;
        Ok(events)
    }

    fn transitions(&self, from: State, to: State, unit: usize) -> Result<&'g [TransitionId]> {
        self.graph
            .transitions(from, to)
            .map_err(|_| Error::MissingTransition {
                from,
                to,
                day: self.day,
                unit,
            })
    }
}

fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| crate::custom_error!("{} index {} overflows u32", what, value))
}

/// Decode a whole trajectory into a time-ordered event list.
///
/// The first snapshot is day 0, the step after `initial`. Any missing
/// transition or shape mismatch aborts the whole trajectory.
pub fn decode(
    trajectory: impl IntoIterator<Item = Snapshot>,
    initial: &Snapshot,
    graph: &TransitionGraph,
) -> Result<Vec<Event>> {
    let mut decoder = TrajectoryDecoder::new(graph, initial.clone());
    let mut events = Vec::new();
    for snapshot in trajectory {
        decoder.step_into(snapshot, &mut events)?;
    }
    tracing::debug!(
        "Decoded {} events over {} days",
        events.len(),
        decoder.day()
    );
    Ok(events)
}

/// Guess an initial state vector from the first snapshot of several runs.
///
/// For every unit the possible previous states of each observed state are
/// intersected across runs and the most advanced survivor is chosen. This
/// is a heuristic: a multi-valued intersection may resolve differently from
/// whatever generated the data.
pub fn infer_initial_state<'a>(
    first_snapshots: impl IntoIterator<Item = &'a Snapshot>,
    graph: &TransitionGraph,
) -> Result<Snapshot> {
    let mut possible: Option<Vec<BTreeSet<State>>> = None;

    for (run, snapshot) in first_snapshots.into_iter().enumerate() {
        match possible.as_mut() {
            None => {
                let sets = snapshot
                    .iter()
                    .map(|&state| {
                        graph
                            .possible_previous_states(state)
                            .map(|states| states.iter().copied().collect())
                    })
                    .collect::<Result<Vec<BTreeSet<State>>>>()?;
                possible = Some(sets);
            }
            Some(sets) => {
                if snapshot.len() != sets.len() {
                    return Err(Error::Shape {
                        expected: sets.len(),
                        found: snapshot.len(),
                        day: 0,
                    });
                }
                for (set, &state) in sets.iter_mut().zip(snapshot.iter()) {
                    let previous = graph.possible_previous_states(state)?;
                    set.retain(|s| previous.contains(s));
                }
            }
        }
        tracing::debug!("Intersected possible initial states with run {}", run);
    }

    let possible = possible
        .ok_or_else(|| Error::custom("initial-state inference needs at least one snapshot"))?;
    tracing::debug!("Possible initial states: {:?}", possible);

    // The root precedes every reachable state, so no set is empty here.
    possible
        .into_iter()
        .map(|set| graph.maximal_state(set))
        .collect()
}
