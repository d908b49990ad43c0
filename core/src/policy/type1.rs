use crate::{
    error::EtlResult,
    promotion::PromotionRule,
    record::{DimensionRow, Snapshot},
    types::KEY_COLUMN,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const OPERATION: &str = "scd_type1";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Type1Options {
    /// Keep dimension rows whose key is missing from the snapshot.
    /// Off by default: the Type 1 table mirrors the source.
    #[serde(default)]
    pub retain_absent_keys: bool,
}

/// Overwrite every source key with its latest values after running
/// `rule` over the incoming rows.
///
/// With the default options the result holds exactly the snapshot's
/// keys. With `retain_absent_keys` the absent rows come first, untouched,
/// followed by the incoming rows.
pub fn scd_type1(
    dim: Vec<DimensionRow>,
    snapshot: &Snapshot,
    rule: &dyn PromotionRule,
    options: Type1Options,
) -> EtlResult<Vec<DimensionRow>> {
    snapshot.require_columns(OPERATION, &[KEY_COLUMN])?;
    snapshot.require_columns(OPERATION, &rule.required_columns())?;
    snapshot.ensure_unique_keys(OPERATION)?;

    let mut promoted = 0usize;
    let incoming: Vec<DimensionRow> = snapshot
        .records()
        .iter()
        .map(|record| {
            let mut row = DimensionRow::from(record);
            if rule.apply(row.customer_id, &mut row.attrs) {
                log::debug!("{OPERATION}: {} promoted customer {}", rule.name(), row.customer_id);
                promoted += 1;
            }
            row
        })
        .collect();

    let source_keys: HashSet<_> = incoming.iter().map(|r| r.customer_id).collect();
    let absent: Vec<DimensionRow> = dim
        .into_iter()
        .filter(|r| !source_keys.contains(&r.customer_id))
        .collect();

    let mut out = Vec::with_capacity(incoming.len() + absent.len());
    if options.retain_absent_keys {
        out.extend(absent);
    } else if !absent.is_empty() {
        log::warn!(
            "{OPERATION}: dropping {} dimension rows absent from the source snapshot",
            absent.len()
        );
    }
    out.extend(incoming);

    log::info!("{OPERATION}: {} rows, {} promoted by {}", out.len(), promoted, rule.name());
    Ok(out)
}
