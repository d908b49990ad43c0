//! Change detection: the comparison primitive shared by Types 2, 3 and 4.
//!
//! Null rules (explicit, never left to a library default):
//!   - null  vs null   → equal
//!   - null  vs value  → different
//!   - value vs value  → equal iff the text matches exactly
//!
//! A source key with no current dimension row is `New`. A key whose
//! tracked attributes all compare equal is `Unchanged`. Anything else is
//! `Changed`. Untracked attributes never count.

use crate::{
    error::{EtlError, EtlResult},
    record::{Attributes, Snapshot, SourceRecord, TrackedAttr},
    types::CustomerId,
};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    New,
    Changed,
    Unchanged,
}

pub fn values_equal(new: Option<&str>, old: Option<&str>) -> bool {
    match (new, old) {
        (None, None)       => true,
        (Some(a), Some(b)) => a == b,
        _                  => false,
    }
}

pub fn changed_attributes(
    new: &Attributes,
    old: &Attributes,
    tracked: &[TrackedAttr],
) -> Vec<TrackedAttr> {
    tracked
        .iter()
        .copied()
        .filter(|&a| !values_equal(new.get(a), old.get(a)))
        .collect()
}

pub fn attributes_differ(new: &Attributes, old: &Attributes, tracked: &[TrackedAttr]) -> bool {
    tracked
        .iter()
        .any(|&a| !values_equal(new.get(a), old.get(a)))
}

/// Index of the rows that take part in comparison, keyed by customer.
///
/// Two entries for one key means the stored dimension already violates
/// the one-current-row invariant; that fails the whole invocation.
pub fn index_by_key<'a, I>(operation: &str, rows: I) -> EtlResult<HashMap<CustomerId, &'a Attributes>>
where
    I: IntoIterator<Item = (CustomerId, &'a Attributes)>,
{
    let mut index = HashMap::new();
    for (customer_id, attrs) in rows {
        if index.insert(customer_id, attrs).is_some() {
            return Err(EtlError::DuplicateKey {
                operation: operation.to_string(),
                customer_id,
            });
        }
    }
    Ok(index)
}

/// Classification of every snapshot record, in snapshot order.
#[derive(Debug)]
pub struct ChangeSet<'a> {
    pub entries: Vec<(&'a SourceRecord, ChangeKind)>,
}

impl<'a> ChangeSet<'a> {
    /// Records that need a fresh current row (new or changed).
    pub fn needing_insert(&self) -> impl Iterator<Item = &'a SourceRecord> + '_ {
        self.entries
            .iter()
            .filter(|(_, k)| *k != ChangeKind::Unchanged)
            .map(|(r, _)| *r)
    }

    pub fn changed_keys(&self) -> impl Iterator<Item = CustomerId> + '_ {
        self.entries
            .iter()
            .filter(|(_, k)| *k == ChangeKind::Changed)
            .map(|(r, _)| r.customer_id)
    }
}

/// Left outer join of the snapshot onto `current`, classifying each key.
pub fn detect_changes<'a>(
    snapshot: &'a Snapshot,
    current: &HashMap<CustomerId, &Attributes>,
    tracked: &[TrackedAttr],
) -> ChangeSet<'a> {
    let entries = snapshot
        .records()
        .iter()
        .map(|record| {
            let kind = match current.get(&record.customer_id) {
                None => ChangeKind::New,
                Some(old) if attributes_differ(&record.attrs, old, tracked) => ChangeKind::Changed,
                Some(_) => ChangeKind::Unchanged,
            };
            (record, kind)
        })
        .collect();
    ChangeSet { entries }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(name: Option<&str>, status: Option<&str>) -> Attributes {
        Attributes {
            name: name.map(str::to_string),
            loyalty_status: status.map(str::to_string),
            ..Attributes::default()
        }
    }

    #[test]
    fn null_rules_are_explicit() {
        assert!(values_equal(None, None));
        assert!(!values_equal(Some("a"), None));
        assert!(!values_equal(None, Some("a")));
        assert!(values_equal(Some("a"), Some("a")));
        assert!(!values_equal(Some("a"), Some("A")));
    }

    #[test]
    fn nulls_on_both_sides_do_not_flag_a_change() {
        let old = attrs(None, Some("Gold"));
        let new = attrs(None, Some("Gold"));
        assert!(!attributes_differ(&new, &old, &TrackedAttr::ALL));
    }

    #[test]
    fn untracked_attribute_is_ignored() {
        let old = attrs(Some("Ann"), Some("Gold"));
        let new = attrs(Some("Anne"), Some("Gold"));
        assert!(!attributes_differ(&new, &old, &[TrackedAttr::LoyaltyStatus]));
        assert_eq!(
            changed_attributes(&new, &old, &TrackedAttr::ALL),
            vec![TrackedAttr::Name]
        );
    }

    #[test]
    fn classifies_new_changed_and_unchanged() {
        let stored_1 = attrs(Some("A"), Some("Gold"));
        let stored_2 = attrs(Some("B"), Some("Silver"));
        let current = index_by_key("test", vec![(1, &stored_1), (2, &stored_2)]).unwrap();

        let snapshot = Snapshot::from_records(vec![
            SourceRecord::new(1, attrs(Some("A"), Some("Gold"))),
            SourceRecord::new(2, attrs(Some("B"), Some("Gold"))),
            SourceRecord::new(3, attrs(Some("C"), None)),
        ]);
        let changes = detect_changes(&snapshot, &current, &TrackedAttr::ALL);

        let kinds: Vec<ChangeKind> = changes.entries.iter().map(|(_, k)| *k).collect();
        assert_eq!(
            kinds,
            vec![ChangeKind::Unchanged, ChangeKind::Changed, ChangeKind::New]
        );
        assert_eq!(changes.changed_keys().collect::<Vec<_>>(), vec![2]);
        assert_eq!(changes.needing_insert().count(), 2);
    }

    #[test]
    fn duplicate_index_key_is_rejected() {
        let a = attrs(Some("A"), None);
        let err = index_by_key("test", vec![(7, &a), (7, &a)]).unwrap_err();
        assert!(matches!(err, EtlError::DuplicateKey { customer_id: 7, .. }));
    }
}
