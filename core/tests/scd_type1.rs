//! Type 1 (overwrite) integration tests, including the promotion rule.

use scd_core::{
    error::EtlError,
    policy::{scd_type1, Type1Options},
    promotion::{KeyedTierPromotion, NoPromotion},
    record::{Attributes, DimensionRow, Snapshot, SourceRecord},
};

fn customer(id: i64, email: &str, status: &str) -> SourceRecord {
    SourceRecord::new(
        id,
        Attributes {
            email: Some(email.into()),
            loyalty_status: Some(status.into()),
            ..Attributes::default()
        },
    )
}

fn row(id: i64, email: &str, status: &str) -> DimensionRow {
    DimensionRow::from(&customer(id, email, status))
}

#[test]
fn latest_source_values_replace_dimension_values() {
    let dim = vec![row(2, "old@x.io", "Silver")];
    let snapshot = Snapshot::from_records(vec![customer(2, "new@x.io", "Gold")]);

    let out = scd_type1(dim, &snapshot, &NoPromotion, Type1Options::default()).unwrap();

    assert_eq!(out, vec![row(2, "new@x.io", "Gold")]);
}

#[test]
fn designated_key_is_promoted_whatever_the_case() {
    let rule = KeyedTierPromotion::default();
    for status in ["gold", "Gold", "GOLD"] {
        let snapshot = Snapshot::from_records(vec![customer(1, "a@x.io", status)]);
        let out = scd_type1(Vec::new(), &snapshot, &rule, Type1Options::default()).unwrap();
        assert_eq!(
            out[0].attrs.loyalty_status.as_deref(),
            Some("Diamond"),
            "status {status} should be promoted"
        );
    }
}

#[test]
fn other_keys_and_other_tiers_are_left_alone() {
    let rule = KeyedTierPromotion::default();
    let snapshot = Snapshot::from_records(vec![
        customer(1, "a@x.io", "Silver"),
        customer(2, "b@x.io", "gold"),
    ]);

    let out = scd_type1(Vec::new(), &snapshot, &rule, Type1Options::default()).unwrap();

    assert_eq!(out[0].attrs.loyalty_status.as_deref(), Some("Silver"));
    assert_eq!(out[1].attrs.loyalty_status.as_deref(), Some("gold"));
}

#[test]
fn rows_absent_from_source_are_dropped_by_default() {
    let dim = vec![row(1, "a@x.io", "Gold"), row(9, "gone@x.io", "Bronze")];
    let snapshot = Snapshot::from_records(vec![customer(1, "a@x.io", "Gold")]);

    let out = scd_type1(dim, &snapshot, &NoPromotion, Type1Options::default()).unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].customer_id, 1);
}

#[test]
fn retain_absent_keys_keeps_stale_rows_first() {
    let dim = vec![row(9, "gone@x.io", "Bronze"), row(1, "a@x.io", "Gold")];
    let snapshot = Snapshot::from_records(vec![customer(1, "b@x.io", "Gold")]);
    let options = Type1Options { retain_absent_keys: true };

    let out = scd_type1(dim, &snapshot, &NoPromotion, options).unwrap();

    let keys: Vec<i64> = out.iter().map(|r| r.customer_id).collect();
    assert_eq!(keys, vec![9, 1]);
    assert_eq!(out[1].attrs.email.as_deref(), Some("b@x.io"));
}

#[test]
fn promotion_rule_needs_loyalty_status_column() {
    let snapshot = Snapshot::new(["customer_id", "email"], vec![customer(1, "a@x.io", "gold")]);

    let err = scd_type1(
        Vec::new(),
        &snapshot,
        &KeyedTierPromotion::default(),
        Type1Options::default(),
    )
    .unwrap_err();

    assert!(matches!(&err, EtlError::MissingColumn { column, .. } if column == "loyalty_status"));
}
