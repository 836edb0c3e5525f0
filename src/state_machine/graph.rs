use crate::error::{Error, Result};
use crate::state_machine::{State, TransitionCatalog, TransitionId};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::prelude::EdgeRef;
use std::collections::{BTreeSet, HashMap};

/// Compilation always starts from this state.
pub const ROOT_STATE: State = 0;

/// Explicit compilation context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Reject any catalog cycle reachable from the root instead of
    /// truncating the back edge.
    pub strict_cycles: bool,
}

/// A compiled graph of which states lead to which, where every reachable
/// pair of states is associated with the ordered list of single-step
/// transitions needed to get from one to the other.
///
/// Several transitions can collapse into one sampling interval, so a state
/// change observed between two snapshots may stand for a list of events.
/// The graph is immutable once built and can be shared across decodes.
#[derive(Debug, Clone)]
pub struct TransitionGraph {
    /// Direct catalog edges. Nodes are states, edge weights transition ids.
    /// Edge indices follow catalog insertion order.
    pub graph: DiGraph<State, TransitionId>,

    /// Lookup from state to its node in `graph`.
    pub state_index: HashMap<State, NodeIndex>,

    /// (source, destination) -> transitions along the last walk explored.
    paths: HashMap<(State, State), Vec<TransitionId>>,

    /// destination -> every state that reaches it, in discovery order.
    predecessors: HashMap<State, Vec<State>>,

    /// Length of the first discovery chain from the root to each state.
    depth: HashMap<State, usize>,

    /// Back edges dropped during compilation.
    truncated: Vec<(State, State)>,
}

impl TransitionGraph {
    /// Build and compile with lenient cycle handling.
    pub fn build(catalog: &TransitionCatalog) -> Result<Self> {
        Self::build_with(catalog, CompileOptions::default())
    }

    pub fn build_with(catalog: &TransitionCatalog, options: CompileOptions) -> Result<Self> {
        let mut graph = Self {
            graph: DiGraph::new(),
            state_index: HashMap::new(),
            paths: HashMap::new(),
            predecessors: HashMap::new(),
            depth: HashMap::new(),
            truncated: Vec::new(),
        };

        for entry in catalog.iter() {
            let from = graph.node_for(entry.from);
            let to = graph.node_for(entry.to);
            graph.graph.add_edge(from, to, entry.id);
            graph.paths.insert((entry.from, entry.to), vec![entry.id]);
        }

        graph.compile(options)?;

        for &(from, to) in &graph.truncated {
            tracing::warn!(
                "Catalog edge {} -> {} closes a cycle and was not extended",
                from,
                to
            );
        }
        tracing::debug!(
            "Compiled transition graph: {} states, {} paths",
            graph.graph.node_count(),
            graph.paths.len()
        );
        Ok(graph)
    }

    fn node_for(&mut self, state: State) -> NodeIndex {
        if let Some(&idx) = self.state_index.get(&state) {
            return idx;
        }
        let idx = self.graph.add_node(state);
        self.state_index.insert(state, idx);
        idx
    }

    /// Direct successors of a state in catalog order.
    fn successors(&self, state: State) -> Vec<(State, TransitionId)> {
        let Some(&idx) = self.state_index.get(&state) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self.graph.edges(idx).collect();
        edges.sort_by_key(|edge| edge.id());
        edges
            .into_iter()
            .map(|edge| (self.graph[edge.target()], *edge.weight()))
            .collect()
    }

    /// Adds an edge from every reachable pair of states, where the edge
    /// carries the transitions needed to go from one to the other.
    fn compile(&mut self, options: CompileOptions) -> Result<()> {
        self.predecessors.insert(ROOT_STATE, vec![ROOT_STATE]);
        self.depth.insert(ROOT_STATE, 0);
        let mut stack = vec![ROOT_STATE];
        self.branch(ROOT_STATE, &mut stack, options)
    }

    fn branch(
        &mut self,
        current: State,
        stack: &mut Vec<State>,
        options: CompileOptions,
    ) -> Result<()> {
        for (next, transition) in self.successors(current) {
            if stack.contains(&next) {
                if options.strict_cycles {
                    return Err(Error::configuration(format!(
                        "catalog edge {} -> {} closes a cycle reachable from state {}",
                        current, next, ROOT_STATE
                    )));
                }
                if !self.truncated.contains(&(current, next)) {
                    self.truncated.push((current, next));
                }
                continue;
            }

            // Ancestors strictly before `current`; the direct edge is already known.
            // The walk being explored replaces whatever an earlier walk stored.
            for &ancestor in &stack[..stack.len() - 1] {
                let Some(prefix) = self.paths.get(&(ancestor, current)) else {
                    continue;
                };
                let mut path = prefix.clone();
                path.push(transition);
                self.paths.insert((ancestor, next), path);
            }

            stack.push(next);
            self.depth.entry(next).or_insert(stack.len() - 1);
            let known = self.predecessors.entry(next).or_default();
            for &state in stack.iter() {
                if !known.contains(&state) {
                    known.push(state);
                }
            }

            self.branch(next, stack, options)?;
            stack.pop();
        }
        Ok(())
    }

    /// Transitions that take a unit from `from` to `to` within one step.
    pub fn transitions(&self, from: State, to: State) -> Result<&[TransitionId]> {
        if from == to {
            return Ok(&[]);
        }
        self.paths
            .get(&(from, to))
            .map(Vec::as_slice)
            .ok_or_else(|| Error::not_found(format!("no path from state {} to state {}", from, to)))
    }

    /// States that could have preceded `state`, itself included.
    pub fn possible_previous_states(&self, state: State) -> Result<&[State]> {
        self.predecessors
            .get(&state)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::not_found(format!("state {} is not reachable from the root", state)))
    }

    /// The most advanced of several candidate states: deepest first
    /// discovery, then smallest state id.
    pub fn maximal_state(&self, candidates: impl IntoIterator<Item = State>) -> Result<State> {
        let mut best: Option<(usize, State)> = None;
        for state in candidates {
            let depth = *self
                .depth
                .get(&state)
                .ok_or_else(|| Error::not_found(format!("state {} has no discovery depth", state)))?;
            best = match best {
                Some((best_depth, best_state))
                    if best_depth > depth || (best_depth == depth && best_state <= state) =>
                {
                    Some((best_depth, best_state))
                }
                _ => Some((depth, state)),
            };
        }
        best.map(|(_, state)| state)
            .ok_or_else(|| Error::not_found("empty candidate set"))
    }

    /// Discovery depth of a state reachable from the root
    pub fn depth(&self, state: State) -> Option<usize> {
        self.depth.get(&state).copied()
    }

    /// Whether the catalog holds the direct edge `from -> to`
    pub fn is_direct(&self, from: State, to: State) -> bool {
        match (self.state_index.get(&from), self.state_index.get(&to)) {
            (Some(&a), Some(&b)) => self.graph.contains_edge(a, b),
            _ => false,
        }
    }

    /// Back edges dropped during lenient compilation
    pub fn truncated_edges(&self) -> &[(State, State)] {
        &self.truncated
    }

    /// All compiled (source, destination) pairs, sorted
    pub fn compiled_pairs(&self) -> Vec<(State, State)> {
        let mut pairs: Vec<_> = self.paths.keys().copied().collect();
        pairs.sort_unstable();
        pairs
    }

    /// All states known to the catalog, sorted
    pub fn states(&self) -> BTreeSet<State> {
        self.state_index.keys().copied().collect()
    }

    /// Export the catalog edges to DOT format for Graphviz
    pub fn to_dot(&self) -> String {
        let mut dot = "digraph TransitionGraph {\n".to_string();
        dot.push_str("  rankdir=LR;\n");
        dot.push_str("  node [shape=circle];\n\n");

        for state in self.states() {
            let style = if state == ROOT_STATE {
                ", style=filled, fillcolor=\"lightblue\""
            } else {
                ""
            };
            dot.push_str(&format!("  s{} [label=\"{}\"{}];\n", state, state, style));
        }

        dot.push('\n');

        for edge in self.graph.edge_references() {
            let from = self.graph[edge.source()];
            let to = self.graph[edge.target()];
            let dashed = if self.truncated.contains(&(from, to)) {
                ", style=dashed"
            } else {
                ""
            };
            dot.push_str(&format!(
                "  s{} -> s{} [label=\"{}\"{}];\n",
                from,
                to,
                edge.weight(),
                dashed
            ));
        }

        dot.push_str("}\n");
        dot
    }

    /// Get graph statistics
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            states: self.graph.node_count(),
            direct_edges: self.graph.edge_count(),
            compiled_paths: self.paths.len(),
            truncated_edges: self.truncated.len(),
            max_depth: self.depth.values().copied().max().unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphStats {
    pub states: usize,
    pub direct_edges: usize,
    pub compiled_paths: usize,
    pub truncated_edges: usize,
    pub max_depth: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naadsm_graph() -> TransitionGraph {
        TransitionGraph::build(&TransitionCatalog::naadsm()).unwrap()
    }

    #[test]
    fn test_linear_chain_transitions() {
        let graph = naadsm_graph();
        assert_eq!(graph.transitions(0, 1).unwrap(), &[0]);
        assert_eq!(graph.transitions(0, 2).unwrap(), &[0, 1]);
        assert_eq!(graph.transitions(0, 3).unwrap(), &[0, 1, 2]);
        assert_eq!(graph.transitions(4, 0).unwrap(), &[4]);
        assert_eq!(graph.transitions(1, 3).unwrap(), &[1, 2]);
        assert_eq!(graph.transitions(0, 4).unwrap(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_possible_previous_states() {
        let graph = naadsm_graph();
        assert_eq!(graph.possible_previous_states(0).unwrap(), &[0]);
        assert_eq!(graph.possible_previous_states(1).unwrap(), &[0, 1]);
        assert_eq!(graph.possible_previous_states(2).unwrap(), &[0, 1, 2]);
        assert_eq!(graph.possible_previous_states(3).unwrap(), &[0, 1, 2, 3]);
        assert_eq!(graph.possible_previous_states(4).unwrap(), &[0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_concatenation_along_walk() {
        let graph = naadsm_graph();
        for s in 0..5u32 {
            for m in s..5 {
                for d in m..5 {
                    if s == d {
                        continue;
                    }
                    let mut joined = graph.transitions(s, m).unwrap().to_vec();
                    joined.extend_from_slice(graph.transitions(m, d).unwrap());
                    assert_eq!(graph.transitions(s, d).unwrap(), joined.as_slice());
                }
            }
        }
    }

    #[test]
    fn test_unconnected_pair_not_found() {
        let graph = naadsm_graph();
        // The back edge 4 -> 0 is never extended past 0.
        let err = graph.transitions(4, 1).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(graph.transitions(2, 0).is_err());
        assert!(graph.possible_previous_states(9).is_err());
    }

    #[test]
    fn test_cycle_truncated_and_recorded() {
        let graph = naadsm_graph();
        assert_eq!(graph.truncated_edges(), &[(4, 0)]);
        assert!(graph.is_direct(4, 0));
        assert!(!graph.is_direct(0, 2));
    }

    #[test]
    fn test_strict_cycles_rejects_naadsm_catalog() {
        let options = CompileOptions { strict_cycles: true };
        let err = TransitionGraph::build_with(&TransitionCatalog::naadsm(), options).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let acyclic = TransitionCatalog::from_entries([(0, 1, 0), (1, 2, 1)]).unwrap();
        assert!(TransitionGraph::build_with(&acyclic, options).is_ok());
    }

    #[test]
    fn test_shortcut_replaced_by_longer_walk() {
        let catalog = TransitionCatalog::from_entries([(0, 1, 0), (1, 2, 1), (0, 2, 2)]).unwrap();
        let graph = TransitionGraph::build(&catalog).unwrap();

        assert_eq!(graph.transitions(0, 1).unwrap(), &[0]);
        assert_eq!(graph.transitions(1, 2).unwrap(), &[1]);
        assert_eq!(graph.transitions(0, 2).unwrap(), &[0, 1]);
        assert!(graph.is_direct(0, 2));

        let mut joined = graph.transitions(0, 1).unwrap().to_vec();
        joined.extend_from_slice(graph.transitions(1, 2).unwrap());
        assert_eq!(graph.transitions(0, 2).unwrap(), joined.as_slice());
    }

    #[test]
    fn test_branching_catalog_paths() {
        // 0 -> 1 -> 3 -> 4 with shortcuts 0 -> 3 and 0 -> 4
        let catalog =
            TransitionCatalog::from_entries([(0, 1, 0), (1, 3, 1), (3, 4, 3), (0, 3, 5), (0, 4, 6)])
                .unwrap();
        let graph = TransitionGraph::build(&catalog).unwrap();

        assert_eq!(graph.transitions(0, 3).unwrap(), &[0, 1]);
        assert_eq!(graph.transitions(0, 4).unwrap(), &[0, 1, 3]);
        assert_eq!(graph.transitions(1, 4).unwrap(), &[1, 3]);
        assert_eq!(graph.transitions(3, 4).unwrap(), &[3]);
        assert_eq!(graph.possible_previous_states(3).unwrap(), &[0, 1, 3]);
        assert_eq!(graph.possible_previous_states(4).unwrap(), &[0, 1, 3, 4]);
        assert_eq!(graph.depth(4), Some(3));
    }

    #[test]
    fn test_predecessors_collect_every_route() {
        let catalog =
            TransitionCatalog::from_entries([(0, 1, 0), (1, 3, 1), (0, 2, 2), (2, 3, 3)]).unwrap();
        let graph = TransitionGraph::build(&catalog).unwrap();

        assert_eq!(graph.possible_previous_states(3).unwrap(), &[0, 1, 3, 2]);
        // Last explored walk wins.
        assert_eq!(graph.transitions(0, 3).unwrap(), &[2, 3]);
        assert_eq!(graph.transitions(1, 3).unwrap(), &[1]);
        assert_eq!(graph.transitions(2, 3).unwrap(), &[3]);
    }

    #[test]
    fn test_maximal_state() {
        let graph = naadsm_graph();
        assert_eq!(graph.maximal_state([0, 1, 2]).unwrap(), 2);
        assert_eq!(graph.maximal_state([3, 0]).unwrap(), 3);
        assert_eq!(graph.maximal_state([0]).unwrap(), 0);
        assert!(graph.maximal_state(Vec::new()).is_err());
        assert!(graph.maximal_state([1, 9]).is_err());
    }

    #[test]
    fn test_maximal_state_ties_pick_smallest() {
        let catalog = TransitionCatalog::from_entries([(0, 2, 0), (0, 1, 1)]).unwrap();
        let graph = TransitionGraph::build(&catalog).unwrap();
        assert_eq!(graph.maximal_state([2, 1]).unwrap(), 1);
        assert_eq!(graph.maximal_state([0, 2]).unwrap(), 2);
    }

    #[test]
    fn test_empty_catalog() {
        let graph = TransitionGraph::build(&TransitionCatalog::new()).unwrap();
        assert_eq!(graph.possible_previous_states(0).unwrap(), &[0]);
        assert!(graph.transitions(0, 0).unwrap().is_empty());
        assert!(graph.transitions(0, 1).is_err());
        assert_eq!(graph.stats().compiled_paths, 0);
    }

    #[test]
    fn test_build_is_idempotent() {
        let a = naadsm_graph();
        let b = naadsm_graph();
        assert_eq!(a.compiled_pairs(), b.compiled_pairs());
        for (s, d) in a.compiled_pairs() {
            assert_eq!(a.transitions(s, d).unwrap(), b.transitions(s, d).unwrap());
        }
        for state in a.states() {
            assert_eq!(
                a.possible_previous_states(state).unwrap(),
                b.possible_previous_states(state).unwrap()
            );
        }
    }

    #[test]
    fn test_to_dot_output() {
        let dot = naadsm_graph().to_dot();
        assert!(dot.contains("digraph TransitionGraph"));
        assert!(dot.contains("s0 -> s1 [label=\"0\"]"));
        assert!(dot.contains("s4 -> s0 [label=\"4\", style=dashed]"));
    }

    #[test]
    fn test_graph_stats() {
        let stats = naadsm_graph().stats();
        assert_eq!(stats.states, 5);
        assert_eq!(stats.direct_edges, 5);
        // 4 + 3 + 2 + 1 forward pairs plus the back edge
        assert_eq!(stats.compiled_paths, 11);
        assert_eq!(stats.truncated_edges, 1);
        assert_eq!(stats.max_depth, 4);
    }
}
