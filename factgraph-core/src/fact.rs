//! Materialized fact instances.

use crate::dictionary::FactDefinition;
use factgraph_path::Path;
use std::sync::Arc;

/// A fact instance: one concrete path bound to its matching definition.
///
/// Instances are created lazily the first time a path resolves, cached for
/// the life of the graph, and never mutated. The parent relationship is a
/// path computation, not an owning edge.
#[derive(Debug)]
pub struct Fact {
    path: Path,
    def: Arc<FactDefinition>,
}

impl Fact {
    pub(crate) fn new(path: Path, def: Arc<FactDefinition>) -> Self {
        Self { path, def }
    }

    /// The concrete path this instance lives at.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The definition this instance was materialized from.
    pub fn definition(&self) -> &Arc<FactDefinition> {
        &self.def
    }
}
