//! Type 2 (row versioning) integration tests.
//!
//! Covers the Gold → Platinum end-to-end scenario, current-row uniqueness
//! across many runs, and the null comparison rules.

use chrono::NaiveDate;
use scd_core::{
    error::EtlError,
    policy::scd_type2,
    record::{Attributes, Snapshot, SourceRecord, TrackedAttr, VersionedRow},
};
use std::collections::HashMap;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

fn customer(id: i64, name: &str, status: &str) -> SourceRecord {
    SourceRecord {
        customer_id: id,
        attrs: Attributes {
            name: Some(name.into()),
            loyalty_status: Some(status.into()),
            ..Attributes::default()
        },
        registration_date: NaiveDate::from_ymd_opt(2024, 1, 1),
    }
}

fn assert_one_current_row_per_key(rows: &[VersionedRow]) {
    let mut current: HashMap<i64, usize> = HashMap::new();
    for r in rows {
        assert!(r.is_well_formed(), "row {r:?} has inconsistent validity fields");
        if r.is_current {
            *current.entry(r.customer_id).or_default() += 1;
        }
    }
    for r in rows {
        assert_eq!(
            current.get(&r.customer_id).copied(),
            Some(1),
            "customer {} must have exactly one current row",
            r.customer_id
        );
    }
}

#[test]
fn first_sighting_then_change_closes_and_reopens() {
    let all = TrackedAttr::ALL;

    let run1 = Snapshot::from_records(vec![customer(1, "A", "Gold")]);
    let dim = scd_type2(Vec::new(), &run1, &all, day(1)).unwrap();

    assert_eq!(dim.len(), 1);
    assert_eq!(dim[0].start_date, day(1));
    assert_eq!(dim[0].end_date, None);
    assert!(dim[0].is_current);

    let run2 = Snapshot::from_records(vec![customer(1, "A", "Platinum")]);
    let dim = scd_type2(dim, &run2, &all, day(2)).unwrap();

    assert_eq!(dim.len(), 2);
    assert_eq!(dim[0].end_date, Some(day(2)));
    assert!(!dim[0].is_current);
    assert_eq!(dim[0].attrs.loyalty_status.as_deref(), Some("Gold"));

    assert!(dim[1].is_current);
    assert_eq!(dim[1].start_date, day(2));
    assert_eq!(dim[1].end_date, None);
    assert_eq!(dim[1].attrs.loyalty_status.as_deref(), Some("Platinum"));
}

#[test]
fn unchanged_keys_are_untouched() {
    let all = TrackedAttr::ALL;
    let snapshot = Snapshot::from_records(vec![customer(1, "A", "Gold"), customer(2, "B", "Silver")]);

    let dim = scd_type2(Vec::new(), &snapshot, &all, day(1)).unwrap();
    let again = scd_type2(dim.clone(), &snapshot, &all, day(5)).unwrap();

    assert_eq!(dim, again);
}

#[test]
fn exactly_one_current_row_after_many_runs() {
    let all = TrackedAttr::ALL;
    let tiers = ["Bronze", "Silver", "Silver", "Gold", "Platinum", "Gold"];
    let mut dim = Vec::new();

    for (i, tier) in tiers.iter().enumerate() {
        let snapshot = Snapshot::from_records(vec![
            customer(1, "A", tier),
            customer(2, "B", "Silver"),
        ]);
        dim = scd_type2(dim, &snapshot, &all, day(i as u32 + 1)).unwrap();
        assert_one_current_row_per_key(&dim);
    }

    // Bronze, Silver, Gold, Platinum, Gold for key 1; one row for key 2.
    assert_eq!(dim.iter().filter(|r| r.customer_id == 1).count(), 5);
    assert_eq!(dim.iter().filter(|r| r.customer_id == 2).count(), 1);
}

#[test]
fn closed_rows_keep_their_original_end_date() {
    let all = TrackedAttr::ALL;
    let mut dim = Vec::new();
    for (d, tier) in [(1, "Bronze"), (2, "Silver"), (3, "Gold")] {
        let snapshot = Snapshot::from_records(vec![customer(1, "A", tier)]);
        dim = scd_type2(dim, &snapshot, &all, day(d)).unwrap();
    }

    let ends: Vec<Option<NaiveDate>> = dim.iter().map(|r| r.end_date).collect();
    assert_eq!(ends, vec![Some(day(2)), Some(day(3)), None]);
}

#[test]
fn null_to_null_is_not_a_change() {
    let all = TrackedAttr::ALL;
    let snapshot = Snapshot::from_records(vec![customer(1, "A", "Gold")]);
    assert!(snapshot.records()[0].attrs.phone.is_none());

    let dim = scd_type2(Vec::new(), &snapshot, &all, day(1)).unwrap();
    let dim = scd_type2(dim, &snapshot, &all, day(2)).unwrap();

    assert_eq!(dim.len(), 1, "null phone on both sides must not version the row");
}

#[test]
fn value_to_null_is_a_change() {
    let all = TrackedAttr::ALL;
    let run1 = Snapshot::from_records(vec![customer(1, "A", "Gold")]);
    let dim = scd_type2(Vec::new(), &run1, &all, day(1)).unwrap();

    let mut cleared = customer(1, "A", "Gold");
    cleared.attrs.name = None;
    let dim = scd_type2(dim, &Snapshot::from_records(vec![cleared]), &all, day(2)).unwrap();

    assert_eq!(dim.len(), 2);
    assert_eq!(dim[1].attrs.name, None);
}

#[test]
fn untracked_changes_do_not_version() {
    let only_status = [TrackedAttr::LoyaltyStatus];
    let run1 = Snapshot::from_records(vec![customer(1, "A", "Gold")]);
    let dim = scd_type2(Vec::new(), &run1, &only_status, day(1)).unwrap();

    let run2 = Snapshot::from_records(vec![customer(1, "A. Renamed", "Gold")]);
    let dim = scd_type2(dim, &run2, &only_status, day(2)).unwrap();

    assert_eq!(dim.len(), 1);
    assert_eq!(dim[0].attrs.name.as_deref(), Some("A"));
}

#[test]
fn missing_tracked_column_is_a_schema_error() {
    let snapshot = Snapshot::new(
        ["customer_id", "name", "email", "phone", "address"],
        vec![customer(1, "A", "Gold")],
    );

    let err = scd_type2(Vec::new(), &snapshot, &TrackedAttr::ALL, day(1)).unwrap_err();

    assert!(matches!(&err, EtlError::MissingColumn { column, .. } if column == "loyalty_status"));
}

#[test]
fn two_current_rows_in_stored_state_are_rejected() {
    let attrs = customer(1, "A", "Gold").attrs;
    let dim = vec![
        VersionedRow::opened(1, attrs.clone(), day(1)),
        VersionedRow::opened(1, attrs, day(2)),
    ];
    let snapshot = Snapshot::from_records(vec![customer(1, "A", "Gold")]);

    let err = scd_type2(dim, &snapshot, &TrackedAttr::ALL, day(3)).unwrap_err();

    assert!(matches!(err, EtlError::DuplicateKey { customer_id: 1, .. }));
}

#[test]
fn current_row_with_end_date_is_rejected() {
    let mut bad = VersionedRow::opened(1, customer(1, "A", "Gold").attrs, day(1));
    bad.end_date = Some(day(2));
    let snapshot = Snapshot::from_records(vec![customer(1, "A", "Gold")]);

    let err = scd_type2(vec![bad], &snapshot, &TrackedAttr::ALL, day(3)).unwrap_err();

    assert!(matches!(err, EtlError::Validation { .. }));
}
