//! Catalog and trajectory analyzer
//!
//! Classifies the shape of a transition catalog and summarises which state
//! changes actually occur in observed trajectories.

use super::{State, TransitionGraph};
use crate::error::{Error, Result};
use crate::trajectory::Snapshot;
use petgraph::Direction;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogPattern {
    /// 0 -> 1 -> 2 -> 3
    Linear,

    /// 0 -> 1
    ///   -> 3
    Branching,

    /// 0 -> 1 -> 2 -> 0
    Cyclic,

    /// No edges
    Empty,
}

impl CatalogPattern {
    pub fn display_name(&self) -> &'static str {
        match self {
            CatalogPattern::Linear => "Linear",
            CatalogPattern::Branching => "Branching",
            CatalogPattern::Cyclic => "Cyclic",
            CatalogPattern::Empty => "Empty",
        }
    }
}

/// Analysis report containing pattern and metrics
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub pattern: CatalogPattern,
    pub branching_factor: f64,
    pub max_depth: usize,
    pub has_cycles: bool,
}

/// Detect the pattern of a transition catalog
pub fn detect_pattern(graph: &TransitionGraph) -> AnalysisReport {
    let node_count = graph.graph.node_count();

    if graph.graph.edge_count() == 0 {
        return AnalysisReport {
            pattern: CatalogPattern::Empty,
            branching_factor: 0.0,
            max_depth: 0,
            has_cycles: false,
        };
    }

    let has_cycles = petgraph::algo::is_cyclic_directed(&graph.graph);

    let out_degrees: Vec<usize> = graph
        .graph
        .node_indices()
        .map(|idx| graph.graph.edges_directed(idx, Direction::Outgoing).count())
        .collect();
    let branching_factor = out_degrees.iter().sum::<usize>() as f64 / node_count as f64;
    let max_out = out_degrees.iter().copied().max().unwrap_or(0);

    let pattern = if max_out > 1 {
        CatalogPattern::Branching
    } else if has_cycles {
        CatalogPattern::Cyclic
    } else {
        CatalogPattern::Linear
    };

    AnalysisReport {
        pattern,
        branching_factor,
        max_depth: graph.stats().max_depth,
        has_cycles,
    }
}

/// Counts of observed (from, to) state changes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionSummary {
    counts: BTreeMap<(State, State), usize>,
}

impl TransitionSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, from: State, to: State) {
        *self.counts.entry((from, to)).or_insert(0) += 1;
    }

    /// Fold another summary into this one
    pub fn merge(&mut self, other: &TransitionSummary) {
        for (&pair, &count) in &other.counts {
            *self.counts.entry(pair).or_insert(0) += count;
        }
    }

    pub fn count(&self, from: State, to: State) -> usize {
        self.counts.get(&(from, to)).copied().unwrap_or(0)
    }

    /// (from, to, count) sorted by state pair
    pub fn entries(&self) -> Vec<(State, State, usize)> {
        self.counts
            .iter()
            .map(|(&(from, to), &count)| (from, to, count))
            .collect()
    }

    /// Observed pairs the graph cannot explain
    pub fn unexplained(&self, graph: &TransitionGraph) -> Vec<(State, State)> {
        self.counts
            .keys()
            .filter(|&&(from, to)| graph.transitions(from, to).is_err())
            .copied()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Count state changes between consecutive snapshots, starting from `initial`.
///
/// Every snapshot must have as many units as `initial`.
pub fn observed_state_changes<'a>(
    initial: &Snapshot,
    snapshots: impl IntoIterator<Item = &'a Snapshot>,
) -> Result<TransitionSummary> {
    let mut summary = TransitionSummary::new();
    let mut previous = initial;
    for (day, snapshot) in snapshots.into_iter().enumerate() {
        if snapshot.len() != initial.len() {
            return Err(Error::Shape {
                expected: initial.len(),
                found: snapshot.len(),
                day,
            });
        }
        for (&from, &to) in previous.iter().zip(snapshot.iter()) {
            if from != to {
                summary.record(from, to);
            }
        }
        previous = snapshot;
    }
    Ok(summary)
}
