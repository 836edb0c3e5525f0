//! Transition catalog representation
//!
//! A catalog lists the direct (single-step) transitions between disease
//! states. It need not be transitively closed; the graph computes the closure.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Disease/observation state of a unit
pub type State = u32;

/// Identifier of a single-step transition
pub type TransitionId = u32;

/// One direct edge of the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub from: State,
    pub to: State,
    pub id: TransitionId,
}

/// On-disk form of a catalog file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    transition: Vec<CatalogEntry>,
}

/// Ordered mapping from (source, destination) to transition id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionCatalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<(State, State), TransitionId>,
}

impl TransitionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The NAADSM disease-progression table used when no catalog is configured.
    pub fn naadsm() -> Self {
        let mut catalog = Self::new();
        for (from, to, id) in [(0, 1, 0), (1, 2, 1), (2, 3, 2), (3, 4, 3), (4, 0, 4)] {
            catalog.entries.push(CatalogEntry { from, to, id });
            catalog.index.insert((from, to), id);
        }
        catalog
    }

    /// Adds a direct edge. A pair may only be given once.
    pub fn insert(&mut self, from: State, to: State, id: TransitionId) -> Result<()> {
        if from == to {
            return Err(Error::configuration(format!(
                "self transition {} -> {} is not allowed",
                from, to
            )));
        }
        if let Some(existing) = self.index.get(&(from, to)) {
            return Err(Error::configuration(format!(
                "duplicate edge {} -> {} (ids {} and {})",
                from, to, existing, id
            )));
        }
        self.entries.push(CatalogEntry { from, to, id });
        self.index.insert((from, to), id);
        Ok(())
    }

    /// Builds a catalog from (source, destination, id) triples.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (State, State, TransitionId)>,
    ) -> Result<Self> {
        let mut catalog = Self::new();
        for (from, to, id) in entries {
            catalog.insert(from, to, id)?;
        }
        Ok(catalog)
    }

    /// Transition id of a direct edge
    pub fn get(&self, from: State, to: State) -> Option<TransitionId> {
        self.index.get(&(from, to)).copied()
    }

    /// Edges in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a catalog from TOML text:
    ///
    /// ```toml
    /// [[transition]]
    /// from = 0
    /// to = 1
    /// id = 0
    /// ```
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(contents)?;
        Self::from_entries(file.transition.into_iter().map(|e| (e.from, e.to, e.id)))
    }

    /// Load a catalog file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let contents = std::fs::read_to_string(&path)?;
        let file: CatalogFile = toml::from_str(&contents).map_err(|e| Error::CatalogParse {
            file: path.clone(),
            message: e.to_string(),
        })?;
        tracing::debug!("Loaded {} catalog edges from {:?}", file.transition.len(), path);
        Self::from_entries(file.transition.into_iter().map(|e| (e.from, e.to, e.id)))
    }

    /// Render as TOML text accepted by [`TransitionCatalog::from_toml_str`]
    pub fn to_toml_string(&self) -> Result<String> {
        let file = CatalogFile {
            transition: self.entries.clone(),
        };
        toml::to_string(&file).map_err(|e| Error::configuration(e.to_string()))
    }
}
