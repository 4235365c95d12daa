//! End-to-end pipelines: partitioned scan, filter/project chains, join, the
//! two-stage count split, and sink writers.

use std::collections::HashMap;
use std::io::Write as _;
use std::sync::Arc;

use tupleflow::core::id::LinkId;
use tupleflow::core::prelude::EngineConfig;
use tupleflow::core::schema::{Attribute, AttributeType, Schema};
use tupleflow::core::tuple::{FieldValue, Tuple};
use tupleflow::exec::{
    drive_join, drive_unary, partition_tuples, run_scan_partitioned, run_two_stage_aggregate,
};
use tupleflow::io::source::{ByteSource, FsSource, MemSource};
use tupleflow::io::writers::csv::CsvWriter;
use tupleflow::io::writers::jsonl::JsonlWriter;
use tupleflow::operators::filter::{CmpOp, Filter, FilterConfig};
use tupleflow::operators::group_by::{AggregateKind, GroupBy, GroupByConfig};
use tupleflow::operators::join::{HashJoin, HashJoinConfig};
use tupleflow::operators::project::{Project, ProjectConfig};
use tupleflow::operators::traits::Operator;

fn people_schema() -> Arc<Schema> {
    Arc::new(
        Schema::new(vec![
            Attribute::new("id", AttributeType::Long),
            Attribute::new("name", AttributeType::String),
            Attribute::new("age", AttributeType::Long),
        ])
        .unwrap(),
    )
}

fn write_people_csv(rows: usize) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    for i in 0..rows {
        writeln!(file, "{},person{},{}", i, i, 20 + (i % 50)).expect("write row");
    }
    file.flush().expect("flush");
    file
}

fn config(workers: usize) -> EngineConfig {
    EngineConfig {
        read_chunk_bytes: 256,
        max_parallel_workers: workers,
    }
}

#[test]
fn partitioned_scan_matches_sequential_scan() {
    let file = write_people_csv(500);
    let source: Arc<dyn ByteSource> = Arc::new(FsSource::new(file.path()));
    let schema = people_schema();

    let sequential: Vec<Tuple> =
        run_scan_partitioned(Arc::clone(&source), &schema, b',', None, &config(1))
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
    let partitioned: Vec<Tuple> =
        run_scan_partitioned(Arc::clone(&source), &schema, b',', None, &config(3))
            .unwrap()
            .into_iter()
            .flatten()
            .collect();

    assert_eq!(sequential.len(), 500);
    assert_eq!(sequential, partitioned);
}

#[test]
fn scan_filter_project_chain() {
    let file = write_people_csv(100);
    let source: Arc<dyn ByteSource> = Arc::new(FsSource::new(file.path()));
    let schema = people_schema();
    let link = LinkId::new(1);

    let scanned: Vec<Tuple> =
        run_scan_partitioned(Arc::clone(&source), &schema, b',', None, &config(2))
            .unwrap()
            .into_iter()
            .flatten()
            .collect();

    let mut filter = Filter::new(FilterConfig {
        input_schema: Arc::clone(&schema),
        attribute: Some("age".to_string()),
        op: CmpOp::Lt,
        literal: FieldValue::Long(25),
    });
    filter.initialize().unwrap();
    let young = drive_unary(&mut filter, link, scanned).unwrap();
    filter.dispose().unwrap();

    // Ages cycle 20..70, so ages 20..25 survive: 5 of every 50.
    assert_eq!(young.len(), 10);

    let mut project = Project::new(ProjectConfig {
        input_schema: Arc::clone(&schema),
        columns: vec!["name".to_string()],
        literals: vec![],
    });
    project.initialize().unwrap();
    let names = drive_unary(&mut project, link, young).unwrap();
    project.dispose().unwrap();

    assert_eq!(names.len(), 10);
    assert_eq!(names[0].schema().len(), 1);
    assert!(matches!(names[0].get(0), Some(FieldValue::Str(_))));
}

#[test]
fn scan_join_pipeline_over_two_sources() {
    let users = MemSource::new(&b"1,alice\n2,bob\n3,carol\n"[..]);
    let orders = MemSource::new(&b"101,1\n102,1\n103,3\n104,9\n"[..]);

    let user_schema = Arc::new(
        Schema::new(vec![
            Attribute::new("uid", AttributeType::Long),
            Attribute::new("name", AttributeType::String),
        ])
        .unwrap(),
    );
    let order_schema = Arc::new(
        Schema::new(vec![
            Attribute::new("oid", AttributeType::Long),
            Attribute::new("user", AttributeType::Long),
        ])
        .unwrap(),
    );

    let users_src: Arc<dyn ByteSource> = Arc::new(users);
    let orders_src: Arc<dyn ByteSource> = Arc::new(orders);
    let user_rows: Vec<Tuple> =
        run_scan_partitioned(users_src, &user_schema, b',', None, &config(1))
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
    let order_rows: Vec<Tuple> =
        run_scan_partitioned(orders_src, &order_schema, b',', None, &config(1))
            .unwrap()
            .into_iter()
            .flatten()
            .collect();

    let inner_link = LinkId::new(1);
    let outer_link = LinkId::new(2);
    // Inner/build side: users keyed on uid. Outer/probe side: orders keyed
    // on the user column.
    let mut join = HashJoin::new(HashJoinConfig {
        inner_link,
        inner_key: 0,
        outer_key: 1,
        outer_schema: Arc::clone(&order_schema),
        inner_schema: Arc::clone(&user_schema),
    });
    join.initialize().unwrap();
    let joined = drive_join(&mut join, inner_link, user_rows, outer_link, order_rows).unwrap();
    join.dispose().unwrap();

    // Orders 101, 102 (alice) and 103 (carol) match; 104 has no user.
    assert_eq!(joined.len(), 3);
    let names: Vec<&FieldValue> = joined.iter().map(|t| t.get(3).unwrap()).collect();
    assert_eq!(
        names,
        vec![
            &FieldValue::Str("alice".into()),
            &FieldValue::Str("alice".into()),
            &FieldValue::Str("carol".into()),
        ]
    );
}

// The full two-stage count topology: partitioned scan → per-partition
// one-per-row normalization → local sums → a single global sum.
#[test]
fn partitioned_two_stage_count_by_key() {
    let file = write_people_csv(200);
    let source: Arc<dyn ByteSource> = Arc::new(FsSource::new(file.path()));
    let schema = people_schema();

    let partitions =
        run_scan_partitioned(Arc::clone(&source), &schema, b',', None, &config(4)).unwrap();

    // Normalize each partition to (age, one) rows.
    let link = LinkId::new(1);
    let mut normalized = Vec::new();
    for part in partitions {
        let mut project = Project::new(ProjectConfig {
            input_schema: Arc::clone(&schema),
            columns: vec!["age".to_string()],
            literals: vec![("one".to_string(), FieldValue::Long(1))],
        });
        project.initialize().unwrap();
        normalized.push(drive_unary(&mut project, link, part).unwrap());
        project.dispose().unwrap();
    }

    let agg_schema = Arc::new(
        Schema::new(vec![
            Attribute::new("age", AttributeType::Long),
            Attribute::new("one", AttributeType::Long),
        ])
        .unwrap(),
    );
    let make_group_by = || {
        GroupBy::new(GroupByConfig {
            input_schema: Arc::clone(&agg_schema),
            key: 0,
            value: 1,
            kind: AggregateKind::Count,
        })
    };
    let locals: Vec<Box<dyn Operator>> = (0..normalized.len())
        .map(|_| Box::new(make_group_by()) as Box<dyn Operator>)
        .collect();
    let mut global = make_group_by();

    let counts = run_two_stage_aggregate(
        normalized,
        locals,
        &mut global,
        LinkId::new(2),
        LinkId::new(3),
    )
    .unwrap();

    let counts: HashMap<i64, i64> = counts
        .iter()
        .map(|t| {
            let key = t.get(0).unwrap().as_i64().unwrap();
            let count = t.get(1).unwrap().as_i64().unwrap();
            (key, count)
        })
        .collect();

    // 200 rows over 50 ages: exactly 4 per age.
    assert_eq!(counts.len(), 50);
    assert!(counts.values().all(|&c| c == 4));
}

#[test]
fn hash_partitioning_keeps_equal_keys_together() {
    let schema = people_schema();
    let rows: Vec<Tuple> = (0..60)
        .map(|i| {
            Tuple::new(
                Arc::clone(&schema),
                vec![
                    FieldValue::Long(i),
                    FieldValue::Str(format!("p{i}")),
                    FieldValue::Long(i % 5),
                ],
            )
            .unwrap()
        })
        .collect();

    let parts = partition_tuples(rows, 2, 4).unwrap();
    assert_eq!(parts.iter().map(Vec::len).sum::<usize>(), 60);

    // Every age lands in exactly one partition.
    let mut owner: HashMap<i64, usize> = HashMap::new();
    for (idx, part) in parts.iter().enumerate() {
        for tuple in part {
            let age = tuple.get(2).unwrap().as_i64().unwrap();
            let prev = owner.insert(age, idx);
            assert!(
                prev.map_or(true, |p| p == idx),
                "age {age} split across partitions"
            );
        }
    }
}

#[test]
fn csv_writer_renders_header_and_rows() {
    let schema = people_schema();
    let rows = vec![
        Tuple::new(
            Arc::clone(&schema),
            vec![
                FieldValue::Long(1),
                FieldValue::Str("alice".into()),
                FieldValue::Long(30),
            ],
        )
        .unwrap(),
        Tuple::new(
            Arc::clone(&schema),
            vec![FieldValue::Long(2), FieldValue::Null, FieldValue::Long(41)],
        )
        .unwrap(),
    ];

    let mut buf = Vec::new();
    {
        let mut writer = CsvWriter::to_writer(&mut buf);
        for row in &rows {
            writer.write_tuple(row).unwrap();
        }
        writer.flush().unwrap();
    }

    let text = String::from_utf8(buf).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines, vec!["id,name,age", "1,alice,30", "2,,41"]);
}

#[test]
fn jsonl_writer_round_trips_through_serde() {
    let schema = people_schema();
    let rows = vec![
        Tuple::new(
            Arc::clone(&schema),
            vec![
                FieldValue::Long(1),
                FieldValue::Str("alice".into()),
                FieldValue::Long(30),
            ],
        )
        .unwrap(),
        Tuple::new(
            Arc::clone(&schema),
            vec![FieldValue::Long(2), FieldValue::Null, FieldValue::Long(41)],
        )
        .unwrap(),
    ];

    let mut buf = Vec::new();
    {
        let mut writer = JsonlWriter::to_writer(&mut buf);
        for row in &rows {
            writer.write_tuple(row).unwrap();
        }
        writer.flush().unwrap();
    }

    let lines: Vec<serde_json::Value> = String::from_utf8(buf)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["name"], serde_json::json!("alice"));
    assert_eq!(lines[0]["age"], serde_json::json!(30));
    assert_eq!(lines[1]["name"], serde_json::Value::Null);
}
