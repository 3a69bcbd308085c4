//! Selection Invariant Tests
//!
//! - Regular selection emits project(row) for every row passing the filter,
//!   in input order
//! - Range selection is confined to [low, high] and emits in key order

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use relops::executor::{ExecutorErrorCode, RangeSelection, RegularSelection};
use relops::index::IndexedTable;
use relops::record::{AttType, AttValue, Record, Schema};
use relops::storage::Table;

// =============================================================================
// Test Utilities
// =============================================================================

fn keyed_table(keys: &[i64], page_size: usize) -> Table {
    let schema = Arc::new(Schema::from_pairs([
        ("key", AttType::Int),
        ("label", AttType::String),
    ]));
    let mut table = Table::new("keys", schema.clone(), page_size);
    for k in keys {
        let rec = Record::from_values(
            schema.clone(),
            vec![AttValue::Int(*k), AttValue::String(format!("row{}", k))],
        )
        .unwrap();
        table.append_record(&rec).unwrap();
    }
    table
}

fn key_output() -> Table {
    Table::new(
        "out",
        Arc::new(Schema::from_pairs([("key", AttType::Int)])),
        4096,
    )
}

fn ints(table: &Table) -> Vec<i64> {
    table
        .rows()
        .unwrap()
        .into_iter()
        .map(|r| match r.att(0).unwrap() {
            AttValue::Int(i) => *i,
            other => panic!("unexpected value {}", other),
        })
        .collect()
}

// =============================================================================
// Regular Selection
// =============================================================================

#[test]
fn test_regular_selection_preserves_input_order() {
    let mut keys: Vec<i64> = (0..200).collect();
    keys.shuffle(&mut StdRng::seed_from_u64(5));
    let input = keyed_table(&keys, 256);
    assert!(input.page_count() > 1);

    let mut out = key_output();
    let summary = RegularSelection::new(&input, &mut out, "< ([key], int[50])", &["[key]"])
        .unwrap()
        .run()
        .unwrap();

    let expected: Vec<i64> = keys.iter().copied().filter(|k| *k < 50).collect();
    assert_eq!(ints(&out), expected);
    assert_eq!(summary.rows_scanned, 200);
    assert_eq!(summary.rows_emitted, 50);
}

#[test]
fn test_projection_evaluates_expressions() {
    let input = keyed_table(&[1, 2, 3], 4096);
    let mut out = Table::new(
        "out",
        Arc::new(Schema::from_pairs([
            ("label", AttType::String),
            ("scaled", AttType::Double),
        ])),
        4096,
    );
    RegularSelection::new(
        &input,
        &mut out,
        "bool[true]",
        &["[label]", "/ ([key], int[2])"],
    )
    .unwrap()
    .run()
    .unwrap();

    let rows = out.rows().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].att(0).unwrap(), &AttValue::String("row1".into()));
    assert_eq!(rows[0].att(1).unwrap(), &AttValue::Double(0.5));
    assert_eq!(rows[2].att(1).unwrap(), &AttValue::Double(1.5));
}

#[test]
fn test_unknown_attribute_is_fatal() {
    let input = keyed_table(&[1], 4096);
    let mut out = key_output();
    let err = RegularSelection::new(&input, &mut out, "[nope]", &["[key]"])
        .err()
        .unwrap();
    assert_eq!(err.code(), ExecutorErrorCode::RelInvalidExpression);
    assert!(err.is_fatal());
}

// =============================================================================
// Range Selection
// =============================================================================

#[test]
fn test_range_selection_example() {
    let mut keys: Vec<i64> = (1..=100).collect();
    keys.shuffle(&mut StdRng::seed_from_u64(17));
    let indexed = IndexedTable::build(keyed_table(&keys, 512), "key").unwrap();

    let mut out = key_output();
    let summary = RangeSelection::new(
        &indexed,
        &mut out,
        &AttValue::Int(10),
        &AttValue::Int(20),
        "bool[true]",
        &["[key]"],
    )
    .unwrap()
    .run()
    .unwrap();

    assert_eq!(summary.rows_emitted, 11);
    assert_eq!(ints(&out), (10..=20).collect::<Vec<_>>());
}

#[test]
fn test_range_output_confined_to_bounds() {
    let keys: Vec<i64> = (0..60).map(|i| (i * 7) % 31).collect();
    let indexed = IndexedTable::build(keyed_table(&keys, 256), "key").unwrap();

    let mut out = key_output();
    RangeSelection::new(
        &indexed,
        &mut out,
        &AttValue::Int(5),
        &AttValue::Int(12),
        "!= ([key], int[8])",
        &["[key]"],
    )
    .unwrap()
    .run()
    .unwrap();

    let got = ints(&out);
    let mut expected: Vec<i64> = keys
        .iter()
        .copied()
        .filter(|k| (5..=12).contains(k) && *k != 8)
        .collect();
    expected.sort();
    assert_eq!(got, expected);
}

#[test]
fn test_inverted_range_is_empty() {
    let indexed = IndexedTable::build(keyed_table(&[1, 2, 3], 4096), "key").unwrap();
    let mut out = key_output();
    let summary = RangeSelection::new(
        &indexed,
        &mut out,
        &AttValue::Int(3),
        &AttValue::Int(1),
        "bool[true]",
        &["[key]"],
    )
    .unwrap()
    .run()
    .unwrap();
    assert_eq!(summary.rows_scanned, 0);
    assert!(out.is_empty());
}
