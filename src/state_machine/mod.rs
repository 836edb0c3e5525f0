//! State machine module - Compile transition catalogs into reachability graphs

use crate::Result;

pub mod analyzer;
pub mod catalog;
pub mod graph;

// Re-export key types
pub use catalog::{CatalogEntry, State, TransitionCatalog, TransitionId};
pub use graph::{CompileOptions, GraphStats, ROOT_STATE, TransitionGraph};

/// Build a transition graph from a catalog
pub fn build_transition_graph(
    catalog: &TransitionCatalog,
    options: CompileOptions,
) -> Result<TransitionGraph> {
    TransitionGraph::build_with(catalog, options)
}
