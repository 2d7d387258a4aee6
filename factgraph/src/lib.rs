//! Fact graph rule engine.
//!
//! This facade re-exports the core engine ([`factgraph_core`]) and the
//! path model ([`factgraph_path`]), and hosts the [`boundary`] adapter
//! that embedding services drive with structured requests.
//!
//! The XML fact-dictionary parser is an external collaborator: it reads
//! the dictionary named by the [`boundary::DICTIONARY_PATH_VAR`]
//! environment variable and produces [`FactDefinition`]s through a
//! [`DictionaryBuilder`].

#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc
)]

pub mod boundary;

pub use factgraph_path as path;

pub use factgraph_core::{
    expr, limits, migrate, result, value, Computed, Dictionary, DictionaryBuilder,
    DictionaryError, EvalError,
    Fact, FactDefinition, FactSource, Graph, GraphError, Limit, LimitKind, LimitReport,
    LimitViolation, MaybeVec, MemberId, Meta, Migration, MigrationRegistry, Path, PathError,
    Segment, Severity, Store, StoreDiff, StoreError, Value, ValueError, ValueKind,
};
