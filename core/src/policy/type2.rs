//! Type 2: full history through row versioning.
//!
//! Per key, a row is either current (`is_current`, no end date) or closed.
//!   absent              → insert a current row starting today
//!   current + changed   → close it today, insert a new current row
//!   current + unchanged → leave it alone
//! Closed rows are never touched again and never take part in comparison.

use crate::{
    compare::{detect_changes, index_by_key, ChangeKind},
    error::{EtlError, EtlResult},
    record::{Snapshot, TrackedAttr, VersionedRow},
};
use chrono::NaiveDate;
use std::collections::HashMap;

const OPERATION: &str = "scd_type2";

pub fn scd_type2(
    dim: Vec<VersionedRow>,
    snapshot: &Snapshot,
    tracked: &[TrackedAttr],
    today: NaiveDate,
) -> EtlResult<Vec<VersionedRow>> {
    snapshot.require_tracked(OPERATION, tracked)?;
    snapshot.ensure_unique_keys(OPERATION)?;
    check_validity_flags(&dim)?;

    let mut out = dim;

    // Position of each key's current row in `out`.
    let positions: HashMap<_, usize> = out
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_current)
        .map(|(i, r)| (r.customer_id, i))
        .collect();

    let inserts: Vec<(ChangeKind, VersionedRow)> = {
        let current = index_by_key(
            OPERATION,
            out.iter().filter(|r| r.is_current).map(|r| (r.customer_id, &r.attrs)),
        )?;
        let changes = detect_changes(snapshot, &current, tracked);
        changes
            .entries
            .iter()
            .filter(|(_, kind)| *kind != ChangeKind::Unchanged)
            .map(|(record, kind)| {
                (*kind, VersionedRow::opened(record.customer_id, record.attrs.clone(), today))
            })
            .collect()
    };

    let mut closed = 0usize;
    for (kind, row) in &inserts {
        if *kind == ChangeKind::Changed {
            if let Some(&i) = positions.get(&row.customer_id) {
                out[i].close(today);
                closed += 1;
                log::debug!("{OPERATION}: closed current row for customer {}", row.customer_id);
            }
        }
    }

    let inserted = inserts.len();
    out.extend(inserts.into_iter().map(|(_, row)| row));

    log::info!(
        "{OPERATION}: {} rows, {} versions closed, {} inserted",
        out.len(),
        closed,
        inserted
    );
    Ok(out)
}

/// A stored row whose flag and end date disagree cannot be reconciled.
fn check_validity_flags(rows: &[VersionedRow]) -> EtlResult<()> {
    match rows.iter().find(|r| !r.is_well_formed()) {
        Some(bad) => Err(EtlError::Validation {
            message: format!(
                "{OPERATION}: customer {} has is_current={} with end_date={:?}",
                bad.customer_id, bad.is_current, bad.end_date
            ),
        }),
        None => Ok(()),
    }
}
