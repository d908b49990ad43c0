//! Type 4: live table of current rows plus an append-only history table.
//!
//! Classification matches Type 2. A changed key's current row is copied
//! into history (closed today), removed from the live table and replaced
//! by a fresh current row. New keys only get a live row. Unchanged keys
//! never reach history.

use crate::{
    compare::{detect_changes, index_by_key},
    error::{EtlError, EtlResult},
    record::{HistoryRow, Snapshot, TrackedAttr, VersionedRow},
};
use chrono::NaiveDate;
use std::collections::HashSet;

const OPERATION: &str = "scd_type4";

#[derive(Debug, Clone, PartialEq)]
pub struct Type4Output {
    pub dimension: Vec<VersionedRow>,
    pub history:   Vec<HistoryRow>,
}

pub fn scd_type4(
    dim: Vec<VersionedRow>,
    history: Vec<HistoryRow>,
    snapshot: &Snapshot,
    tracked: &[TrackedAttr],
    today: NaiveDate,
) -> EtlResult<Type4Output> {
    snapshot.require_tracked(OPERATION, tracked)?;
    snapshot.ensure_unique_keys(OPERATION)?;

    if let Some(closed) = dim.iter().find(|r| !r.is_current || r.end_date.is_some()) {
        return Err(EtlError::Validation {
            message: format!(
                "{OPERATION}: live table holds a closed row for customer {}",
                closed.customer_id
            ),
        });
    }

    let (changed, inserts): (HashSet<_>, Vec<VersionedRow>) = {
        let current = index_by_key(OPERATION, dim.iter().map(|r| (r.customer_id, &r.attrs)))?;
        let changes = detect_changes(snapshot, &current, tracked);
        let changed = changes.changed_keys().collect();
        let inserts = changes
            .needing_insert()
            .map(|record| VersionedRow::opened(record.customer_id, record.attrs.clone(), today))
            .collect();
        (changed, inserts)
    };

    let mut history = history;
    let archived_before = history.len();
    let mut dimension = Vec::with_capacity(dim.len() + inserts.len());
    for row in dim {
        if changed.contains(&row.customer_id) {
            log::debug!("{OPERATION}: moving customer {} to history", row.customer_id);
            history.push(row.closed_copy(today));
        } else {
            dimension.push(row);
        }
    }
    let inserted = inserts.len();
    dimension.extend(inserts);

    log::info!(
        "{OPERATION}: {} live rows, {} archived, {} inserted, {} history rows",
        dimension.len(),
        history.len() - archived_before,
        inserted,
        history.len()
    );
    Ok(Type4Output { dimension, history })
}
