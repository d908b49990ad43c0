use crate::{
    error::EtlResult,
    record::{DimensionRow, Snapshot},
    types::KEY_COLUMN,
};
use std::collections::HashSet;

const OPERATION: &str = "scd_type0";

/// Append source rows whose key is not yet in `dim`. Existing rows are
/// returned exactly as given, in their original order.
pub fn scd_type0(dim: Vec<DimensionRow>, snapshot: &Snapshot) -> EtlResult<Vec<DimensionRow>> {
    snapshot.require_columns(OPERATION, &[KEY_COLUMN])?;
    snapshot.ensure_unique_keys(OPERATION)?;

    let mut seen: HashSet<_> = dim.iter().map(|r| r.customer_id).collect();
    let mut out = dim;
    let before = out.len();

    for record in snapshot.records() {
        if seen.insert(record.customer_id) {
            out.push(DimensionRow::from(record));
        }
    }

    log::info!("{OPERATION}: {} existing, {} appended", before, out.len() - before);
    Ok(out)
}
