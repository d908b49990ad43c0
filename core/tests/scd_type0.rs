//! Type 0 (append-only) integration tests.
//!
//! 1. First run loads every source key
//! 2. Existing rows are never rewritten, even when the source changed
//! 3. A second run with the same snapshot is a no-op
//! 4. A snapshot without a key column is rejected

use scd_core::{
    error::EtlError,
    policy::scd_type0,
    record::{Attributes, DimensionRow, Snapshot, SourceRecord},
};

fn customer(id: i64, name: &str, status: &str) -> SourceRecord {
    SourceRecord::new(
        id,
        Attributes {
            name: Some(name.into()),
            loyalty_status: Some(status.into()),
            ..Attributes::default()
        },
    )
}

#[test]
fn first_run_appends_every_key() {
    let snapshot = Snapshot::from_records(vec![
        customer(1, "Ann", "Gold"),
        customer(2, "Bob", "Silver"),
    ]);

    let dim = scd_type0(Vec::new(), &snapshot).unwrap();

    assert_eq!(dim.len(), 2);
    assert_eq!(dim[0], DimensionRow::from(&snapshot.records()[0]));
    assert_eq!(dim[1].customer_id, 2);
}

#[test]
fn existing_rows_are_never_updated() {
    let first = Snapshot::from_records(vec![customer(1, "Ann", "Gold")]);
    let dim = scd_type0(Vec::new(), &first).unwrap();

    let second = Snapshot::from_records(vec![
        customer(1, "Ann Smith", "Platinum"),
        customer(3, "Cid", "Bronze"),
    ]);
    let dim = scd_type0(dim, &second).unwrap();

    assert_eq!(dim.len(), 2);
    assert_eq!(dim[0].attrs.name.as_deref(), Some("Ann"));
    assert_eq!(dim[0].attrs.loyalty_status.as_deref(), Some("Gold"));
    assert_eq!(dim[1].customer_id, 3);
}

#[test]
fn rerun_with_same_snapshot_adds_nothing() {
    let snapshot = Snapshot::from_records(vec![
        customer(1, "Ann", "Gold"),
        customer(2, "Bob", "Silver"),
        customer(3, "Cid", "Gold"),
    ]);

    let once = scd_type0(Vec::new(), &snapshot).unwrap();
    let twice = scd_type0(once.clone(), &snapshot).unwrap();

    assert_eq!(once, twice, "second run must not change the dimension");
}

#[test]
fn missing_key_column_is_a_schema_error() {
    let snapshot = Snapshot::new(["name", "loyalty_status"], vec![customer(1, "Ann", "Gold")]);

    let err = scd_type0(Vec::new(), &snapshot).unwrap_err();

    assert!(
        matches!(&err, EtlError::MissingColumn { column, .. } if column == "customer_id"),
        "unexpected error: {err}"
    );
}

#[test]
fn duplicate_source_key_fails_the_run() {
    let snapshot = Snapshot::from_records(vec![customer(4, "Dee", "Gold"), customer(4, "Dee", "Silver")]);

    let err = scd_type0(Vec::new(), &snapshot).unwrap_err();

    assert!(matches!(err, EtlError::DuplicateKey { customer_id: 4, .. }));
}
