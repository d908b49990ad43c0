//! Type 3: one generation of history in `<attr>_prev` shadow columns.

use crate::{
    compare::{changed_attributes, index_by_key},
    error::EtlResult,
    record::{Attributes, ShadowRow, Snapshot, TrackedAttr},
};

const OPERATION: &str = "scd_type3";

/// Rebuild the Type 3 table from the snapshot.
///
/// For a key already in `dim`, each tracked attribute whose old value was
/// non-null and differs from the new one keeps the old value in its
/// shadow column; every other shadow is cleared. New keys start with all
/// shadows null. Only snapshot keys appear in the result.
pub fn scd_type3(
    dim: Vec<ShadowRow>,
    snapshot: &Snapshot,
    tracked: &[TrackedAttr],
) -> EtlResult<Vec<ShadowRow>> {
    snapshot.require_tracked(OPERATION, tracked)?;
    snapshot.ensure_unique_keys(OPERATION)?;

    let previous = index_by_key(OPERATION, dim.iter().map(|r| (r.customer_id, &r.attrs)))?;

    let mut shadowed = 0usize;
    let out: Vec<ShadowRow> = snapshot
        .records()
        .iter()
        .map(|record| {
            let mut prev = Attributes::default();
            if let Some(old) = previous.get(&record.customer_id) {
                for attr in changed_attributes(&record.attrs, old, tracked) {
                    if let Some(old_value) = old.get(attr) {
                        prev.set(attr, Some(old_value.to_string()));
                        shadowed += 1;
                    }
                }
            }
            ShadowRow {
                customer_id: record.customer_id,
                attrs: record.attrs.clone(),
                prev,
            }
        })
        .collect();

    let dropped = dim.len().saturating_sub(
        out.iter().filter(|r| previous.contains_key(&r.customer_id)).count(),
    );
    if dropped > 0 {
        log::warn!("{OPERATION}: {dropped} dimension rows absent from the source snapshot not carried forward");
    }
    log::info!("{OPERATION}: {} rows, {} shadow values recorded", out.len(), shadowed);
    Ok(out)
}
