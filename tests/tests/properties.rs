//! Property tests for the engine's universally quantified laws.

use factgraph::expr::Expr;
use factgraph::migrate::{JsonMap, Migration, MigrationRegistry};
use factgraph::result::{vectorize2, Computed, MaybeVec};
use factgraph::value::Dollar;
use factgraph::{Dictionary, FactDefinition, Store, Value, ValueKind};
use proptest::prelude::*;
use serde_json::json;
use tests::{graph, path};

fn computed() -> impl Strategy<Value = Computed<i64>> {
    prop_oneof![
        any::<i32>().prop_map(|n| Computed::Complete(i64::from(n))),
        any::<i32>().prop_map(|n| Computed::Placeholder(i64::from(n))),
        Just(Computed::Incomplete),
    ]
}

fn multiple(len: usize) -> impl Strategy<Value = MaybeVec<Computed<i64>>> {
    (
        proptest::collection::vec(computed(), len),
        proptest::bool::ANY,
    )
        .prop_map(|(items, complete)| MaybeVec::Multiple { items, complete })
}

fn operand(len: usize) -> impl Strategy<Value = MaybeVec<Computed<i64>>> {
    prop_oneof![computed().prop_map(MaybeVec::Single), multiple(len)]
}

proptest! {
    /// Vectorization shape law: all-`Single` in, `Single` out; any
    /// `Multiple(n)` in, `Multiple(n)` out with the flags ANDed.
    #[test]
    fn vectorize_shape_and_completeness(
        (a, b) in (1usize..5).prop_flat_map(|len| (operand(len), multiple(len)))
    ) {
        let out = vectorize2(&a, &b, |x, y| {
            Computed::Complete(x.wrapping_add(*y))
        }).unwrap();
        let MaybeVec::Multiple { items, complete } = &out else {
            panic!("a multiple input must produce a multiple output");
        };
        prop_assert_eq!(Some(items.len()), b.multiplicity());
        prop_assert_eq!(*complete, a.is_enumerated() && b.is_enumerated());
    }

    /// All-`Single` inputs produce a `Single` output.
    #[test]
    fn vectorize_singles_stay_single(a in computed(), b in computed()) {
        let out = vectorize2(
            &MaybeVec::Single(a),
            &MaybeVec::Single(b),
            |x, y| Computed::Complete(x.wrapping_add(*y)),
        )
        .unwrap();
        prop_assert!(matches!(out, MaybeVec::Single(_)));
    }

    /// Elementwise results follow the combining rule exactly.
    #[test]
    fn vectorize_elementwise_rule(a in computed(), b in computed()) {
        let out = vectorize2(
            &MaybeVec::Single(a),
            &MaybeVec::Single(b),
            |x, y| Computed::Complete(x.wrapping_add(*y)),
        )
        .unwrap();
        let MaybeVec::Single(o) = out else { panic!("single expected") };
        match (a, b) {
            (Computed::Incomplete, _) | (_, Computed::Incomplete) => {
                prop_assert_eq!(o, Computed::Incomplete);
            }
            (Computed::Placeholder(_), _) | (_, Computed::Placeholder(_)) => {
                prop_assert!(matches!(o, Computed::Placeholder(_)));
            }
            _ => prop_assert!(o.is_complete()),
        }
    }

    /// Store round-trip: `from_json(to_json(S)) ≡ S`.
    #[test]
    fn store_round_trip(entries in proptest::collection::btree_map(0usize..5, any::<i32>(), 0..5)) {
        let mut builder = Dictionary::builder();
        for i in 0..5 {
            builder.add(FactDefinition::writable(
                path(&format!("/p{i}")),
                ValueKind::Dollar,
            ));
        }
        let dictionary = builder.freeze().unwrap();
        let registry = MigrationRegistry::empty();

        let mut store = Store::new(&registry);
        for (i, cents) in &entries {
            store.put(
                &path(&format!("/p{i}")),
                Value::Dollar(Dollar::from_cents(i64::from(*cents))),
            );
        }
        let back = Store::from_json(&store.to_json(true), &registry, &dictionary).unwrap();
        prop_assert_eq!(back, store);
    }

    /// Short-circuit `All`/`Any` agree with the strict fold whenever every
    /// operand is complete.
    #[test]
    fn short_circuit_agrees_with_fold(values in proptest::collection::vec(any::<bool>(), 1..5)) {
        let mut builder = Dictionary::builder();
        let mut deps = Vec::new();
        for i in 0..values.len() {
            builder.add(FactDefinition::writable(
                path(&format!("/b{i}")),
                ValueKind::Bool,
            ));
            deps.push(Expr::dep(path(&format!("/b{i}"))));
        }
        builder.add(FactDefinition::derived(
            path("/all"),
            ValueKind::Bool,
            Expr::All(deps.clone()),
        ));
        builder.add(FactDefinition::derived(
            path("/any"),
            ValueKind::Bool,
            Expr::Any(deps),
        ));
        let mut g = graph(builder.freeze().unwrap());
        for (i, value) in values.iter().enumerate() {
            g.set(&format!("/b{i}"), Value::Bool(*value)).unwrap();
        }
        prop_assert_eq!(
            g.get("/all").unwrap(),
            Computed::Complete(Value::Bool(values.iter().all(|v| *v)))
        );
        prop_assert_eq!(
            g.get("/any").unwrap(),
            Computed::Complete(Value::Bool(values.iter().any(|v| *v)))
        );
    }

    /// `All` decides on a complete false even when later operands are
    /// missing; `Any` symmetrically on a complete true.
    #[test]
    fn short_circuit_dominates_missing_data(decisive in proptest::bool::ANY) {
        let mut builder = Dictionary::builder();
        for name in ["/first", "/second"] {
            builder.add(FactDefinition::writable(path(name), ValueKind::Bool));
        }
        builder.add(FactDefinition::derived(
            path("/all"),
            ValueKind::Bool,
            Expr::All(vec![Expr::dep(path("/first")), Expr::dep(path("/second"))]),
        ));
        builder.add(FactDefinition::derived(
            path("/any"),
            ValueKind::Bool,
            Expr::Any(vec![Expr::dep(path("/first")), Expr::dep(path("/second"))]),
        ));
        let mut g = graph(builder.freeze().unwrap());
        // /second stays unwritten throughout
        g.set("/first", Value::Bool(!decisive)).unwrap();
        if decisive {
            // first = false settles the conjunction alone
            prop_assert_eq!(
                g.get("/all").unwrap(),
                Computed::Complete(Value::Bool(false))
            );
            prop_assert_eq!(g.get("/any").unwrap(), Computed::Incomplete);
        } else {
            // first = true settles the disjunction alone
            prop_assert_eq!(
                g.get("/any").unwrap(),
                Computed::Complete(Value::Bool(true))
            );
            prop_assert_eq!(g.get("/all").unwrap(), Computed::Incomplete);
        }
    }

    /// Migration split-application equals direct application.
    #[test]
    fn migration_monotonicity(values in proptest::collection::btree_map("[a-z]{1,6}", any::<i32>(), 0..6)) {
        fn bump(mut facts: JsonMap) -> JsonMap {
            for (_, tagged) in facts.iter_mut() {
                if let Some(item) = tagged.get_mut("item") {
                    if let Some(n) = item.as_i64() {
                        *item = json!(n.wrapping_add(1));
                    }
                }
            }
            facts
        }
        fn drop_zero(mut facts: JsonMap) -> JsonMap {
            facts.retain(|_, tagged| tagged["item"] != json!(0));
            facts
        }
        let full = MigrationRegistry::new(vec![
            Migration { number: 1, name: "bump", run: bump },
            Migration { number: 2, name: "drop-zero", run: drop_zero },
        ]).unwrap();
        let head = MigrationRegistry::new(vec![
            Migration { number: 1, name: "bump", run: bump },
        ]).unwrap();

        let mut facts = JsonMap::new();
        for (name, value) in &values {
            facts.insert(
                format!("/{name}"),
                json!({"$type": "int", "item": value}),
            );
        }
        let direct = full.apply_pending(facts.clone(), 0).unwrap();
        let split = full
            .apply_pending(head.apply_pending(facts, 0).unwrap(), 1)
            .unwrap();
        prop_assert_eq!(direct, split);
    }
}
