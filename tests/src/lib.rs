//! Shared fixtures for the integration suite: small dictionaries covering
//! the engine's surface, and shorthand constructors.

use factgraph::expr::{EnumOption, Expr, SwitchCase};
use factgraph::value::Dollar;
use factgraph::{
    Dictionary, FactDefinition, Graph, Limit, LimitKind, MigrationRegistry, Path, Severity,
    Value, ValueKind,
};
use std::sync::Arc;

/// Parses a path, panicking on fixture typos.
pub fn path(s: &str) -> Path {
    s.parse().unwrap()
}

/// A dollar value from cents.
pub fn dollar(cents: i64) -> Value {
    Value::Dollar(Dollar::from_cents(cents))
}

/// A graph over `dictionary` with an empty, migration-free store.
pub fn graph(dictionary: Arc<Dictionary>) -> Graph {
    Graph::new(dictionary, &MigrationRegistry::empty())
}

/// `/income` + `/bonus` writables, `/total` derived as their sum.
pub fn income_dictionary() -> Arc<Dictionary> {
    let mut builder = Dictionary::builder();
    builder
        .add(FactDefinition::writable(path("/income"), ValueKind::Dollar))
        .add(FactDefinition::writable(path("/bonus"), ValueKind::Dollar))
        .add(FactDefinition::derived(
            path("/total"),
            ValueKind::Dollar,
            Expr::Add(vec![
                Expr::dep(path("/income")),
                Expr::dep(path("/bonus")),
            ]),
        ));
    builder.freeze().unwrap()
}

/// Collection `/exp` with per-member `amount`, plus `/sum`, `/n`, a filter
/// and a find over it.
pub fn expenses_dictionary() -> Arc<Dictionary> {
    let mut builder = Dictionary::builder();
    builder
        .add(FactDefinition::collection(path("/exp")))
        .add(FactDefinition::writable(
            path("/exp/*/amount"),
            ValueKind::Dollar,
        ))
        .add(FactDefinition::derived(
            path("/sum"),
            ValueKind::Dollar,
            Expr::CollectionSum(Box::new(Expr::dep(path("/exp/*/amount")))),
        ))
        .add(FactDefinition::derived(
            path("/n"),
            ValueKind::Int,
            Expr::Count(Box::new(Expr::dep(path("/exp")))),
        ))
        .add(FactDefinition::derived(
            path("/big"),
            ValueKind::Collection,
            Expr::Filter {
                collection: path("/exp"),
                predicate: Box::new(Expr::GreaterOrEqual(
                    Box::new(Expr::dep(path("amount"))),
                    Box::new(Expr::constant(dollar(20_000))),
                )),
            },
        ))
        .add(FactDefinition::derived(
            path("/first-big"),
            ValueKind::Str,
            Expr::Find {
                collection: path("/exp"),
                predicate: Box::new(Expr::GreaterOrEqual(
                    Box::new(Expr::dep(path("amount"))),
                    Box::new(Expr::constant(dollar(20_000))),
                )),
            },
        ));
    builder.freeze().unwrap()
}

/// `/age` with a zero placeholder and min/max limits, `/label` switching on
/// adulthood.
pub fn age_dictionary() -> Arc<Dictionary> {
    let mut builder = Dictionary::builder();
    builder
        .add(
            FactDefinition::writable(path("/age"), ValueKind::Int)
                .with_placeholder(Expr::constant(Value::Int(0)))
                .with_limit(Limit::new(
                    LimitKind::Min,
                    Severity::Error,
                    Expr::constant(Value::Int(0)),
                ))
                .with_limit(Limit::new(
                    LimitKind::Max,
                    Severity::Error,
                    Expr::constant(Value::Int(150)),
                )),
        )
        .add(FactDefinition::derived(
            path("/label"),
            ValueKind::Str,
            Expr::Switch(vec![
                SwitchCase::new(
                    Expr::GreaterOrEqual(
                        Box::new(Expr::dep(path("/age"))),
                        Box::new(Expr::constant(Value::Int(18))),
                    ),
                    Expr::constant(Value::Str("adult".into())),
                ),
                SwitchCase::new(
                    Expr::constant(Value::Bool(true)),
                    Expr::constant(Value::Str("minor".into())),
                ),
            ]),
        ));
    builder.freeze().unwrap()
}

/// An enum writable backed by a conditional option set.
pub fn status_dictionary() -> Arc<Dictionary> {
    let mut builder = Dictionary::builder();
    builder
        .add(FactDefinition::writable(
            path("/joint-allowed"),
            ValueKind::Bool,
        ))
        .add(FactDefinition::derived(
            path("/status-options"),
            ValueKind::MultiEnum,
            Expr::EnumOptions(vec![
                EnumOption::fixed("single"),
                EnumOption::when(Expr::dep(path("/joint-allowed")), "joint"),
            ]),
        ))
        .add(
            FactDefinition::writable(path("/status"), ValueKind::Enum)
                .with_options(path("/status-options")),
        );
    builder.freeze().unwrap()
}
