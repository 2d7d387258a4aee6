//! The explicit evaluation context threaded through every `force`.

use crate::dictionary::FactDefinition;
use crate::error::EvalError;
use crate::expr::{DepRef, Evaluated};
use crate::graph::Graph;
use crate::value::Value;
use chrono::NaiveDate;
use factgraph_path::Path;
use std::sync::Arc;

/// Everything an expression needs to evaluate: the graph (for dependency
/// resolution and the store) and the owning fact's identity.
///
/// The owner definition is absent when the owner is a synthetic position,
/// e.g. a collection member being tested by a `Filter` predicate.
pub(crate) struct EvalContext<'g> {
    graph: &'g Graph,
    owner_path: Path,
    owner_def: Option<Arc<FactDefinition>>,
}

impl<'g> EvalContext<'g> {
    pub(crate) fn new(
        graph: &'g Graph,
        owner_path: Path,
        owner_def: Option<Arc<FactDefinition>>,
    ) -> Self {
        Self {
            graph,
            owner_path,
            owner_def,
        }
    }

    /// The graph being evaluated against.
    pub(crate) fn graph(&self) -> &'g Graph {
        self.graph
    }

    /// The owning fact's concrete path.
    pub(crate) fn owner_path(&self) -> &Path {
        &self.owner_path
    }

    /// The owning fact's definition, when the owner is a declared fact.
    pub(crate) fn owner_def(&self) -> Option<&Arc<FactDefinition>> {
        self.owner_def.as_ref()
    }

    /// Resolves and evaluates a dependency reference against the owner.
    pub(crate) fn dep(&self, dep: &DepRef) -> Result<Evaluated, EvalError> {
        self.graph.eval_path(&dep.path, &self.owner_path)
    }

    /// The stored value at the owner's path, if any.
    pub(crate) fn stored(&self) -> Option<Value> {
        self.graph.stored_value(&self.owner_path)
    }

    /// The evaluation date: pinned if the graph was built with one,
    /// otherwise the system clock.
    pub(crate) fn today(&self) -> NaiveDate {
        self.graph.today()
    }

    /// A derived context owned by another position (used by collection
    /// predicates, which evaluate with each member as the current fact).
    pub(crate) fn for_position(
        &self,
        owner_path: Path,
        owner_def: Option<Arc<FactDefinition>>,
    ) -> EvalContext<'g> {
        EvalContext {
            graph: self.graph,
            owner_path,
            owner_def,
        }
    }
}
