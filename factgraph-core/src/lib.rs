//! Core evaluation engine for the fact graph.
//!
//! A **fact graph** is a declarative rule system: a domain expert defines
//! named *facts*, either writable inputs or values derived through an
//! expression tree, and a [`Graph`] instantiated from that [`Dictionary`] answers
//! reads with lazy, memoized evaluation and three-state completeness.
//!
//! ```rust
//! use factgraph_core::{
//!     Computed, Dictionary, FactDefinition, Graph, MigrationRegistry, Value, ValueKind,
//! };
//! use factgraph_core::expr::Expr;
//! use factgraph_core::value::Dollar;
//!
//! let mut builder = Dictionary::builder();
//! builder
//!     .add(FactDefinition::writable("/income".parse().unwrap(), ValueKind::Dollar))
//!     .add(FactDefinition::writable("/bonus".parse().unwrap(), ValueKind::Dollar))
//!     .add(FactDefinition::derived(
//!         "/total".parse().unwrap(),
//!         ValueKind::Dollar,
//!         Expr::Add(vec![
//!             Expr::dep("/income".parse().unwrap()),
//!             Expr::dep("/bonus".parse().unwrap()),
//!         ]),
//!     ));
//! let dictionary = builder.freeze().unwrap();
//!
//! let registry = MigrationRegistry::empty();
//! let mut graph = Graph::new(dictionary, &registry);
//! graph.set("/income", Value::Dollar(Dollar::from_cents(50_000))).unwrap();
//! graph.set("/bonus", Value::Dollar(Dollar::from_cents(5_000))).unwrap();
//! assert_eq!(
//!     graph.get("/total").unwrap(),
//!     Computed::Complete(Value::Dollar(Dollar::from_cents(55_000)))
//! );
//! ```
//!
//! Reads resolve paths (wildcards expand against live collection
//! membership), materialize fact instances on demand, and memoize results
//! per concrete path; any write invalidates the whole result cache. A
//! graph is single-threaded; the frozen dictionary is freely shareable.

#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::result_large_err,
    clippy::enum_glob_use,
    clippy::needless_pass_by_value,
    clippy::similar_names,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::cast_possible_truncation,
    clippy::wildcard_imports
)]
#![cfg_attr(test, allow(clippy::too_many_lines))]

pub mod dictionary;
pub mod error;
pub mod expr;
pub mod fact;
pub mod graph;
pub mod limits;
pub mod migrate;
pub mod result;
pub mod store;
pub mod value;

mod explain;

pub use dictionary::{Dictionary, DictionaryBuilder, FactDefinition, FactSource, Meta};
pub use error::{DictionaryError, EvalError, GraphError, StoreError, ValueError};
pub use fact::Fact;
pub use graph::Graph;
pub use limits::{Limit, LimitKind, LimitReport, LimitViolation, Severity};
pub use migrate::{Migration, MigrationRegistry};
pub use result::{Computed, MaybeVec};
pub use store::{Store, StoreDiff};
pub use value::{Value, ValueKind};

pub use factgraph_path::{MemberId, Path, PathError, Segment};
