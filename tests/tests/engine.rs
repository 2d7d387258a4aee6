//! End-to-end scenarios over live graphs.

use factgraph::expr::Expr;
use factgraph::value::{Collection, EnumValue};
use factgraph::{
    Computed, Dictionary, EvalError, FactDefinition, Graph, GraphError, Limit, LimitKind,
    Migration, MigrationRegistry, Severity, Value, ValueKind,
};
use tests::{dollar, expenses_dictionary, graph, income_dictionary, path, status_dictionary};

#[test]
fn adds_two_writables_and_loses_completeness_on_delete() {
    let mut g = graph(income_dictionary());
    g.set("/income", dollar(50_000)).unwrap();
    g.set("/bonus", dollar(5_000)).unwrap();
    assert_eq!(g.get("/total").unwrap(), Computed::Complete(dollar(55_000)));

    assert!(g.delete("/bonus").unwrap());
    assert_eq!(g.get("/total").unwrap(), Computed::Incomplete);
    assert_eq!(g.get("/income").unwrap(), Computed::Complete(dollar(50_000)));
}

#[test]
fn collection_sum_skips_incomplete_members() {
    let mut g = graph(expenses_dictionary());
    g.add_member("/exp", "a").unwrap();
    g.add_member("/exp", "b").unwrap();
    g.set("/exp/#a/amount", dollar(10_000)).unwrap();
    g.set("/exp/#b/amount", dollar(25_000)).unwrap();
    assert_eq!(g.get("/sum").unwrap(), Computed::Complete(dollar(35_000)));
    assert_eq!(g.get("/n").unwrap(), Computed::Complete(Value::Int(2)));

    // an unwritten member is skipped by the sum but visible in the vector
    g.add_member("/exp", "c").unwrap();
    assert_eq!(g.get("/sum").unwrap(), Computed::Complete(dollar(35_000)));
    let vector = g.get_vect("/exp/*/amount").unwrap();
    assert_eq!(vector.len(), 3);
    assert_eq!(
        vector.iter().filter(|c| c.has_value()).count(),
        2,
        "exactly one member is unwritten"
    );
}

#[test]
fn duplicate_members_are_rejected_and_removal_cascades() {
    let mut g = graph(expenses_dictionary());
    g.add_member("/exp", "a").unwrap();
    assert!(matches!(
        g.add_member("/exp", "a"),
        Err(GraphError::Value(_))
    ));

    g.set("/exp/#a/amount", dollar(100)).unwrap();
    g.remove_member("/exp", "a").unwrap();
    assert!(g.store().get(&path("/exp/#a/amount")).is_none());
    assert!(matches!(
        g.get("/exp/#a/amount"),
        Err(GraphError::UnknownPath { .. })
    ));
    assert!(matches!(
        g.remove_member("/exp", "a"),
        Err(GraphError::UnknownPath { .. })
    ));
}

#[test]
fn filter_and_find_evaluate_with_member_context() {
    let mut g = graph(expenses_dictionary());
    g.add_member("/exp", "a").unwrap();
    g.add_member("/exp", "b").unwrap();
    g.set("/exp/#a/amount", dollar(10_000)).unwrap();
    g.set("/exp/#b/amount", dollar(25_000)).unwrap();

    let mut expected = Collection::new();
    expected.add("b".parse().unwrap()).unwrap();
    assert_eq!(
        g.get("/big").unwrap(),
        Computed::Complete(Value::Collection(expected))
    );
    assert_eq!(
        g.get("/first-big").unwrap(),
        Computed::Complete(Value::Str("b".into()))
    );
}

#[test]
fn find_is_incomplete_while_an_earlier_member_is_undecided() {
    let mut g = graph(expenses_dictionary());
    g.add_member("/exp", "mystery").unwrap();
    g.add_member("/exp", "b").unwrap();
    g.set("/exp/#b/amount", dollar(25_000)).unwrap();
    // the unwritten first member could itself be the first match
    assert_eq!(g.get("/first-big").unwrap(), Computed::Incomplete);
}

#[test]
fn placeholder_flows_through_switch() {
    let mut g = graph(tests::age_dictionary());
    assert_eq!(g.get("/age").unwrap(), Computed::Placeholder(Value::Int(0)));
    assert_eq!(
        g.get("/label").unwrap(),
        Computed::Placeholder(Value::Str("minor".into()))
    );

    g.set("/age", Value::Int(30)).unwrap();
    assert_eq!(g.get("/age").unwrap(), Computed::Complete(Value::Int(30)));
    assert_eq!(
        g.get("/label").unwrap(),
        Computed::Complete(Value::Str("adult".into()))
    );
}

#[test]
fn limits_report_from_set_and_save() {
    let mut g = graph(tests::age_dictionary());
    let report = g.set("/age", Value::Int(200)).unwrap();
    assert!(!report.ok);
    assert_eq!(report.violations.len(), 1);
    assert_eq!(report.violations[0].limit, "max");
    assert_eq!(report.violations[0].path, "/age");

    // the value is stored anyway so save can re-report the aggregate
    assert_eq!(g.get("/age").unwrap(), Computed::Complete(Value::Int(200)));
    let report = g.save().unwrap();
    assert!(!report.ok);
    assert_eq!(report.violations.len(), 1);

    let report = g.set("/age", Value::Int(40)).unwrap();
    assert!(report.ok);
    assert!(g.save().unwrap().ok);
}

#[test]
fn dynamic_match_bounds_check_and_uncompilable_patterns_are_fatal() {
    let mut builder = Dictionary::builder();
    builder
        .add(FactDefinition::writable(path("/pattern"), ValueKind::Str))
        .add(
            FactDefinition::writable(path("/code"), ValueKind::Str).with_limit(Limit::new(
                LimitKind::Match,
                Severity::Error,
                Expr::dep(path("/pattern")),
            )),
        );
    let mut g = graph(builder.freeze().unwrap());

    // with the bound unwritten the limit cannot fire
    assert!(g.set("/code", Value::Str("abc".into())).unwrap().ok);

    g.set("/pattern", Value::Str("^[A-Z]+$".into())).unwrap();
    let report = g.set("/code", Value::Str("abc".into())).unwrap();
    assert!(!report.ok);
    assert_eq!(report.violations[0].limit, "match");
    assert!(g.set("/code", Value::Str("ABC".into())).unwrap().ok);

    // a pattern that only appears at evaluation time and does not compile
    // is a dictionary bug, not a silent pass
    g.set("/pattern", Value::Str("[".into())).unwrap();
    assert!(matches!(
        g.set("/code", Value::Str("ABC".into())),
        Err(GraphError::Eval(EvalError::InvalidPattern { .. }))
    ));
}

#[test]
fn overrides_shadow_stored_values() {
    let mut builder = Dictionary::builder();
    builder
        .add(FactDefinition::writable(path("/exempt"), ValueKind::Bool))
        .add(
            FactDefinition::writable(path("/due"), ValueKind::Dollar).with_override(
                Expr::dep(path("/exempt")),
                Expr::constant(dollar(0)),
            ),
        );
    let mut g = graph(builder.freeze().unwrap());

    g.set("/due", dollar(12_345)).unwrap();
    assert_eq!(g.get("/due").unwrap(), Computed::Complete(dollar(12_345)));

    g.set("/exempt", Value::Bool(true)).unwrap();
    assert_eq!(g.get("/due").unwrap(), Computed::Complete(dollar(0)));

    g.set("/exempt", Value::Bool(false)).unwrap();
    assert_eq!(g.get("/due").unwrap(), Computed::Complete(dollar(12_345)));
}

#[test]
fn enum_membership_is_an_intrinsic_limit() {
    let mut g = graph(status_dictionary());
    let options = path("/status-options");

    let report = g
        .set("/status", Value::Enum(EnumValue::new(options.clone(), "single")))
        .unwrap();
    assert!(report.ok, "{:?}", report.violations);

    // "joint" is only an option once /joint-allowed is known true
    let report = g
        .set("/status", Value::Enum(EnumValue::new(options.clone(), "joint")))
        .unwrap();
    assert!(!report.ok);
    assert_eq!(report.violations[0].limit, "enum-options");

    g.set("/joint-allowed", Value::Bool(true)).unwrap();
    let report = g
        .set("/status", Value::Enum(EnumValue::new(options, "joint")))
        .unwrap();
    assert!(report.ok, "{:?}", report.violations);
}

#[test]
fn shape_mismatch_is_fatal_not_incomplete() {
    let mut builder = Dictionary::builder();
    builder
        .add(FactDefinition::collection(path("/a")))
        .add(FactDefinition::writable(path("/a/*/x"), ValueKind::Int))
        .add(FactDefinition::collection(path("/b")))
        .add(FactDefinition::writable(path("/b/*/y"), ValueKind::Int))
        .add(FactDefinition::derived(
            path("/mismatch"),
            ValueKind::Int,
            Expr::Add(vec![
                Expr::dep(path("/a/*/x")),
                Expr::dep(path("/b/*/y")),
            ]),
        ));
    let mut g = graph(builder.freeze().unwrap());
    for id in ["m1", "m2"] {
        g.add_member("/a", id).unwrap();
    }
    for id in ["n1", "n2", "n3"] {
        g.add_member("/b", id).unwrap();
    }
    assert!(matches!(
        g.get("/mismatch"),
        Err(GraphError::Eval(EvalError::ShapeMismatch { left: 2, right: 3 }))
    ));
}

#[test]
fn evaluation_cycles_are_detected() {
    let mut builder = Dictionary::builder();
    builder
        .add(FactDefinition::derived(
            path("/x"),
            ValueKind::Int,
            Expr::dep(path("/y")),
        ))
        .add(FactDefinition::derived(
            path("/y"),
            ValueKind::Int,
            Expr::dep(path("/x")),
        ));
    let g = graph(builder.freeze().unwrap());
    assert!(matches!(
        g.get("/x"),
        Err(GraphError::Eval(EvalError::Cycle { .. }))
    ));
}

#[test]
fn migrations_run_on_load_and_the_counter_advances() {
    fn rename(mut facts: factgraph::migrate::JsonMap) -> factgraph::migrate::JsonMap {
        if let Some(value) = facts.remove("/old") {
            facts.insert("/new".to_string(), value);
        }
        facts
    }

    let mut builder = Dictionary::builder();
    builder.add(FactDefinition::writable(path("/new"), ValueKind::Dollar));
    let dictionary = builder.freeze().unwrap();

    let registry = MigrationRegistry::new(vec![Migration {
        number: 1,
        name: "rename-old-to-new",
        run: rename,
    }])
    .unwrap();

    let blob = r#"{"facts": {"/old": {"$type": "dollar", "item": 100}}, "migrations": 0}"#;
    let g = Graph::load(dictionary, blob, &registry).unwrap();
    assert_eq!(g.get("/new").unwrap(), Computed::Complete(dollar(100)));
    assert!(g.to_json(false).contains("\"migrations\":1"));
}

#[test]
fn cached_reads_match_fresh_recomputation() {
    let mut g = graph(income_dictionary());
    g.set("/income", dollar(100)).unwrap();
    g.set("/bonus", dollar(200)).unwrap();

    // memoized second read
    assert_eq!(g.get("/total").unwrap(), g.get("/total").unwrap());

    // every write invalidates: the cached result never goes stale
    g.set("/bonus", dollar(300)).unwrap();
    assert_eq!(g.get("/total").unwrap(), Computed::Complete(dollar(400)));

    let mut fresh = graph(income_dictionary());
    fresh.set("/income", dollar(100)).unwrap();
    fresh.set("/bonus", dollar(300)).unwrap();
    assert_eq!(fresh.get("/total").unwrap(), g.get("/total").unwrap());
}

#[test]
fn type_and_path_errors_surface_at_the_boundary() {
    let mut g = graph(income_dictionary());
    assert!(matches!(
        g.set("/income", Value::Int(5)),
        Err(GraphError::TypeMismatch { .. })
    ));
    assert!(matches!(
        g.set("/total", dollar(1)),
        Err(GraphError::NotWritable { .. })
    ));
    assert!(matches!(
        g.set("/nope", dollar(1)),
        Err(GraphError::UnknownPath { .. })
    ));
    assert!(matches!(
        g.get("/nope"),
        Err(GraphError::UnknownPath { .. })
    ));
    assert!(matches!(
        g.set("/exp/*/amount", dollar(1)),
        Err(GraphError::AbstractPath { .. }) | Err(GraphError::UnknownPath { .. })
    ));
}

#[test]
fn pinned_today_drives_date_arithmetic() {
    let mut builder = Dictionary::builder();
    builder.add(FactDefinition::derived(
        path("/next-payday"),
        ValueKind::Day,
        Expr::AddPayrollMonths {
            date: Box::new(Expr::Today),
            months: Box::new(Expr::constant(Value::Int(1))),
        },
    ));
    let g = graph(builder.freeze().unwrap())
        .with_today(chrono::NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
    assert_eq!(
        g.get("/next-payday").unwrap(),
        Computed::Complete(Value::Day(
            chrono::NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        ))
    );
}

#[test]
fn explain_renders_the_derivation_tree() {
    let mut g = graph(income_dictionary());
    g.set("/income", dollar(50_000)).unwrap();
    let trace = g.explain("/total").unwrap();
    assert!(trace.contains("/total = Incomplete [derived]"), "{trace}");
    assert!(trace.contains("Add(/income, /bonus)"), "{trace}");
    assert!(trace.contains("/income = Complete(500.00) [writable]"), "{trace}");
    assert!(trace.contains("/bonus = Incomplete [writable]"), "{trace}");
}

#[test]
fn reset_clears_the_store_but_keeps_the_dictionary() {
    let mut g = graph(income_dictionary());
    g.set("/income", dollar(1)).unwrap();
    g.reset();
    assert!(g.store().is_empty());
    assert_eq!(g.get("/income").unwrap(), Computed::Incomplete);
}
