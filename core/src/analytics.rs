//! Analytical views over the source snapshot.
//!
//! Both views read the snapshot, never the dimension tables, and are
//! stateless.

use crate::{
    error::{EtlError, EtlResult},
    record::{LoyaltySummaryRow, Snapshot, SourceRecord, TrackedAttr, REGISTRATION_DATE_COLUMN},
    types::{CustomerId, KEY_COLUMN},
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Customers ordered by registration date, oldest first. Ties keep
/// snapshot order; rows without a date go last.
pub fn sort_by_registration_date(snapshot: &Snapshot) -> EtlResult<Vec<SourceRecord>> {
    require(snapshot, REGISTRATION_DATE_COLUMN)?;

    let mut rows = snapshot.records().to_vec();
    rows.sort_by(|a, b| match (a.registration_date, b.registration_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None)    => Ordering::Less,
        (None, Some(_))    => Ordering::Greater,
        (None, None)       => Ordering::Equal,
    });
    Ok(rows)
}

/// Distinct customers per loyalty status, ordered by status.
/// Customers with no status are not counted.
pub fn aggregate_by_loyalty(snapshot: &Snapshot) -> EtlResult<Vec<LoyaltySummaryRow>> {
    require(snapshot, TrackedAttr::LoyaltyStatus.column())?;
    require(snapshot, KEY_COLUMN)?;

    let mut groups: BTreeMap<&str, BTreeSet<CustomerId>> = BTreeMap::new();
    for record in snapshot.records() {
        if let Some(status) = record.attrs.loyalty_status.as_deref() {
            groups.entry(status).or_default().insert(record.customer_id);
        }
    }

    Ok(groups
        .into_iter()
        .map(|(status, customers)| LoyaltySummaryRow {
            loyalty_status:  status.to_string(),
            total_customers: customers.len() as i64,
        })
        .collect())
}

fn require(snapshot: &Snapshot, column: &str) -> EtlResult<()> {
    if snapshot.has_column(column) {
        Ok(())
    } else {
        Err(EtlError::Validation {
            message: format!("Missing '{column}' column."),
        })
    }
}
