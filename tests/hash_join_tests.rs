//! Hash-join correctness, ordering-violation, and probe-replacement tests.

use std::sync::Arc;

use tupleflow::core::error::Error;
use tupleflow::core::id::LinkId;
use tupleflow::core::schema::{Attribute, AttributeType, Schema};
use tupleflow::core::tuple::{FieldValue, Tuple};
use tupleflow::exec::drive_join;
use tupleflow::operators::join::{HashJoin, HashJoinConfig};
use tupleflow::operators::traits::Operator;

const INNER: LinkId = LinkId::new(1);
const OUTER: LinkId = LinkId::new(2);

fn str_schema(names: &[&str]) -> Arc<Schema> {
    Arc::new(
        Schema::new(
            names
                .iter()
                .map(|n| Attribute::new(*n, AttributeType::String))
                .collect(),
        )
        .unwrap(),
    )
}

fn row(schema: &Arc<Schema>, values: &[&str]) -> Tuple {
    Tuple::new(
        Arc::clone(schema),
        values
            .iter()
            .map(|v| FieldValue::Str(v.to_string()))
            .collect(),
    )
    .unwrap()
}

fn join_op(outer_schema: &Arc<Schema>, inner_schema: &Arc<Schema>) -> HashJoin {
    let mut op = HashJoin::new(HashJoinConfig {
        inner_link: INNER,
        inner_key: 0,
        outer_key: 1,
        outer_schema: Arc::clone(outer_schema),
        inner_schema: Arc::clone(inner_schema),
    });
    op.initialize().unwrap();
    op
}

fn strings(tuple: &Tuple) -> Vec<String> {
    tuple
        .values()
        .iter()
        .map(|v| match v {
            FieldValue::Str(s) => s.clone(),
            other => panic!("expected string, got {other:?}"),
        })
        .collect()
}

#[test]
fn join_emits_bucket_in_arrival_order_and_drops_unmatched_outer() {
    let inner_schema = str_schema(&["ikey", "ival"]);
    let outer_schema = str_schema(&["oval", "okey"]);
    let mut op = join_op(&outer_schema, &inner_schema);

    let inner = vec![
        row(&inner_schema, &["k1", "a"]),
        row(&inner_schema, &["k1", "b"]),
        row(&inner_schema, &["k2", "c"]),
    ];
    let outer = vec![
        row(&outer_schema, &["x", "k1"]),
        row(&outer_schema, &["y", "k3"]),
    ];

    let out = drive_join(&mut op, INNER, inner, OUTER, outer).unwrap();
    let out: Vec<Vec<String>> = out.iter().map(strings).collect();
    assert_eq!(
        out,
        vec![
            vec!["x".to_string(), "k1".into(), "k1".into(), "a".into()],
            vec!["x".to_string(), "k1".into(), "k1".into(), "b".into()],
        ]
    );
    op.dispose().unwrap();
}

#[test]
fn output_schema_is_outer_then_inner() {
    let inner_schema = str_schema(&["ikey", "ival"]);
    let outer_schema = str_schema(&["oval", "okey"]);
    let op = join_op(&outer_schema, &inner_schema);
    let schema = op.output_schema().unwrap();
    let names: Vec<&str> = schema.attributes().iter().map(|a| a.name()).collect();
    assert_eq!(names, vec!["oval", "okey", "ikey", "ival"]);
}

#[test]
fn probe_before_build_complete_is_fatal() {
    let inner_schema = str_schema(&["ikey", "ival"]);
    let outer_schema = str_schema(&["oval", "okey"]);
    let mut op = join_op(&outer_schema, &inner_schema);

    op.on_upstream_changed(INNER);
    op.accept(row(&inner_schema, &["k1", "a"])).unwrap();

    // Outer tuple arrives before the inner link signaled exhaustion.
    op.on_upstream_changed(OUTER);
    let err = op.accept(row(&outer_schema, &["x", "k1"])).unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
}

#[test]
fn build_accept_after_inner_exhaustion_is_fatal() {
    let inner_schema = str_schema(&["ikey", "ival"]);
    let outer_schema = str_schema(&["oval", "okey"]);
    let mut op = join_op(&outer_schema, &inner_schema);

    op.on_upstream_changed(INNER);
    op.accept(row(&inner_schema, &["k1", "a"])).unwrap();
    op.on_upstream_exhausted(INNER).unwrap();

    let err = op.accept(row(&inner_schema, &["k2", "b"])).unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
}

#[test]
fn accept_before_any_upstream_changed_is_fatal() {
    let inner_schema = str_schema(&["ikey", "ival"]);
    let outer_schema = str_schema(&["oval", "okey"]);
    let mut op = join_op(&outer_schema, &inner_schema);

    let err = op.accept(row(&inner_schema, &["k1", "a"])).unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
}

// Documented legacy behavior: a new outer tuple replaces a partially drained
// match set, and the undrained remainder is lost. Asserted on purpose so a
// future "fix" shows up as a test change.
#[test]
fn new_outer_tuple_discards_partially_drained_match_set() {
    let inner_schema = str_schema(&["ikey", "ival"]);
    let outer_schema = str_schema(&["oval", "okey"]);
    let mut op = join_op(&outer_schema, &inner_schema);

    op.on_upstream_changed(INNER);
    op.accept(row(&inner_schema, &["k1", "a"])).unwrap();
    op.accept(row(&inner_schema, &["k1", "b"])).unwrap();
    op.accept(row(&inner_schema, &["k2", "c"])).unwrap();
    op.on_upstream_exhausted(INNER).unwrap();

    op.on_upstream_changed(OUTER);
    op.accept(row(&outer_schema, &["x", "k1"])).unwrap();

    // Drain only the first of the two k1 matches.
    assert!(op.has_next().unwrap());
    let first = op.next().unwrap();
    assert_eq!(strings(&first), vec!["x", "k1", "k1", "a"]);

    // The replacement probe wins; ("x","k1","k1","b") is silently gone.
    op.accept(row(&outer_schema, &["z", "k2"])).unwrap();
    let mut rest = Vec::new();
    while op.has_next().unwrap() {
        rest.push(strings(&op.next().unwrap()));
    }
    assert_eq!(rest, vec![vec!["z".to_string(), "k2".into(), "k2".into(), "c".into()]]);
}

#[test]
fn next_without_pending_match_is_a_protocol_error() {
    let inner_schema = str_schema(&["ikey", "ival"]);
    let outer_schema = str_schema(&["oval", "okey"]);
    let mut op = join_op(&outer_schema, &inner_schema);

    op.on_upstream_changed(INNER);
    op.on_upstream_exhausted(INNER).unwrap();
    op.on_upstream_changed(OUTER);
    op.accept(row(&outer_schema, &["x", "k1"])).unwrap();

    assert!(!op.has_next().unwrap());
    let err = op.next().unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
}
