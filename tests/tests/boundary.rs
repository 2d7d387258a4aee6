//! Boundary adapter round-trips: wire-shaped requests over a session.

use factgraph::boundary::{ErrorKind, Request, Response, Session, Write};
use factgraph::MigrationRegistry;
use serde_json::json;
use tests::{expenses_dictionary, graph, income_dictionary};

fn session(dictionary: std::sync::Arc<factgraph::Dictionary>) -> Session {
    Session::new(graph(dictionary), MigrationRegistry::empty())
}

#[test]
fn list_describe_and_deps() {
    let mut s = session(income_dictionary());
    let Response::Paths { paths } = s.dispatch(Request::ListPaths) else {
        panic!("expected paths");
    };
    assert_eq!(paths.len(), 3);
    assert!(paths.contains(&"/total".to_string()));

    let Response::Fact { info } = s.dispatch(Request::DescribeFact {
        path: "/total".into(),
    }) else {
        panic!("expected fact info");
    };
    assert!(!info.writable);
    assert_eq!(info.type_tag, factgraph::ValueKind::Dollar);

    let Response::Deps { deps } = s.dispatch(Request::ForwardDeps {
        path: "/total".into(),
    }) else {
        panic!("expected deps");
    };
    assert_eq!(deps.len(), 2);

    let Response::Deps { deps } = s.dispatch(Request::ReverseDeps {
        path: "/income".into(),
    }) else {
        panic!("expected deps");
    };
    assert_eq!(deps[0].path, "/total");
}

#[test]
fn set_coerces_json_through_declared_types() {
    let mut s = session(income_dictionary());
    let Response::Outcome { ok, violations } = s.dispatch(Request::Set {
        path: "/income".into(),
        value: json!(50_000),
    }) else {
        panic!("expected outcome");
    };
    assert!(ok);
    assert!(violations.is_empty());

    let Response::Value { value, complete } = s.dispatch(Request::Get {
        path: "/income".into(),
    }) else {
        panic!("expected value");
    };
    assert!(complete);
    assert_eq!(value, Some(json!(50_000)));

    // incomplete facts answer with no value
    let Response::Value { value, complete } = s.dispatch(Request::Get {
        path: "/total".into(),
    }) else {
        panic!("expected value");
    };
    assert!(!complete);
    assert_eq!(value, None);
}

#[test]
fn batch_set_applies_in_order_and_reports_per_item() {
    let mut s = session(income_dictionary());
    let Response::Outcomes { results } = s.dispatch(Request::BatchSet {
        writes: vec![
            Write {
                path: "/income".into(),
                value: json!(100),
            },
            Write {
                path: "/bogus".into(),
                value: json!(1),
            },
            Write {
                path: "/bonus".into(),
                value: json!(200),
            },
        ],
    }) else {
        panic!("expected outcomes");
    };
    assert_eq!(results.len(), 3);
    assert!(results[0].ok);
    assert!(!results[1].ok);
    assert!(results[1].error.is_some());
    assert!(results[2].ok, "later writes proceed past failures");

    let Response::Value { value, .. } = s.dispatch(Request::Get {
        path: "/total".into(),
    }) else {
        panic!("expected value");
    };
    assert_eq!(value, Some(json!(300)));
}

#[test]
fn snapshot_load_diff_round_trip() {
    let mut s = session(income_dictionary());
    s.dispatch(Request::Set {
        path: "/income".into(),
        value: json!(100),
    });
    let Response::State { state } = s.dispatch(Request::Snapshot) else {
        panic!("expected state");
    };

    s.dispatch(Request::Set {
        path: "/bonus".into(),
        value: json!(50),
    });
    let Response::DiffResult { added, removed, changed } = s.dispatch(Request::Diff {
        state: state.clone(),
    }) else {
        panic!("expected diff");
    };
    assert_eq!(added, vec!["/bonus"]);
    assert!(removed.is_empty());
    assert!(changed.is_empty());

    assert!(matches!(
        s.dispatch(Request::Load { state }),
        Response::Done
    ));
    let Response::Value { value, .. } = s.dispatch(Request::Get {
        path: "/bonus".into(),
    }) else {
        panic!("expected value");
    };
    assert_eq!(value, None, "the loaded snapshot predates /bonus");
}

#[test]
fn collection_operations_and_reset() {
    let mut s = session(expenses_dictionary());
    assert!(matches!(
        s.dispatch(Request::AddMember {
            path: "/exp".into(),
            member: "a".into(),
        }),
        Response::Done
    ));
    s.dispatch(Request::Set {
        path: "/exp/#a/amount".into(),
        value: json!(100),
    });
    let Response::Value { value, .. } = s.dispatch(Request::Get {
        path: "/sum".into(),
    }) else {
        panic!("expected value");
    };
    assert_eq!(value, Some(json!(100)));

    assert!(matches!(
        s.dispatch(Request::RemoveMember {
            path: "/exp".into(),
            member: "a".into(),
        }),
        Response::Done
    ));
    assert!(matches!(s.dispatch(Request::Reset), Response::Done));
    assert!(s.graph().store().is_empty());
}

#[test]
fn errors_map_to_the_public_taxonomy() {
    let mut s = session(income_dictionary());
    let cases = [
        (
            Request::Get {
                path: "/missing".into(),
            },
            ErrorKind::UnknownPath,
        ),
        (
            Request::Get {
                path: "//bad".into(),
            },
            ErrorKind::Parse,
        ),
        (
            Request::Set {
                path: "/total".into(),
                value: json!(1),
            },
            ErrorKind::TypeMismatch,
        ),
        (
            Request::Set {
                path: "/income".into(),
                value: json!("not-cents"),
            },
            ErrorKind::InvalidValue,
        ),
    ];
    for (request, expected) in cases {
        match s.dispatch(request) {
            Response::Error { kind, .. } => assert_eq!(kind, expected),
            other => panic!("expected error, got {other:?}"),
        }
    }
}

#[test]
fn requests_round_trip_through_serde() {
    let wire = r#"{"op": "set", "path": "/income", "value": 100}"#;
    let request: Request = serde_json::from_str(wire).unwrap();
    assert!(matches!(request, Request::Set { .. }));

    let response = Response::Value {
        value: Some(json!(100)),
        complete: true,
    };
    let rendered = serde_json::to_value(&response).unwrap();
    assert_eq!(rendered["result"], "value");
    assert_eq!(rendered["complete"], true);
}
