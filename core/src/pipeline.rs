//! The pipeline run: extract once, reconcile five ways, load everything.
//!
//! EXECUTION ORDER (fixed):
//!   0. Extract the source snapshot      (failure aborts the run)
//!   1. Type 0                           → dim_scd0
//!   2. Type 1                           → dim_scd1
//!   3. Type 2                           → dim_scd2
//!   4. Type 3                           → dim_scd3
//!   5. Type 4                           → dim_scd4, history_scd4 (one transaction)
//!   6. Sort by registration date        → sorted_customers
//!   7. Count by loyalty status          → loyalty_summary
//!
//! RULES:
//!   - Every stage reads the same snapshot and the same run date.
//!   - A stage reads its own prior table, reconciles, and writes; it
//!     never sees another stage's output.
//!   - A failing stage is reported and skipped; later stages still run.

use crate::{
    analytics::{aggregate_by_loyalty, sort_by_registration_date},
    clock::RunClock,
    config::EtlConfig,
    error::{EtlError, EtlResult},
    policy::{scd_type0, scd_type1, scd_type2, scd_type3, scd_type4},
    record::{DimensionRow, HistoryRow, ShadowRow, VersionedRow},
    source::SourceReader,
    store::{RunStatus, TableRow, TableStore},
    types::{
        format_date, RunId, DIM_SCD0, DIM_SCD1, DIM_SCD2, DIM_SCD3, DIM_SCD4, HISTORY_SCD4,
        LOYALTY_SUMMARY, SORTED_CUSTOMERS,
    },
};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableWrite {
    pub table: &'static str,
    pub rows:  usize,
}

#[derive(Debug)]
pub struct StageReport {
    pub stage:   &'static str,
    pub outcome: Result<Vec<TableWrite>, EtlError>,
}

#[derive(Debug)]
pub struct PipelineReport {
    pub run_id:      RunId,
    pub run_date:    NaiveDate,
    pub source_rows: usize,
    pub stages:      Vec<StageReport>,
}

impl PipelineReport {
    pub fn succeeded(&self) -> bool {
        self.stages.iter().all(|s| s.outcome.is_ok())
    }

    pub fn failed_stages(&self) -> impl Iterator<Item = &StageReport> {
        self.stages.iter().filter(|s| s.outcome.is_err())
    }

    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == name)
    }

    /// Rows written to `table`, if its stage succeeded.
    pub fn rows_written(&self, table: &str) -> Option<usize> {
        self.stages
            .iter()
            .filter_map(|s| s.outcome.as_ref().ok())
            .flatten()
            .find(|w| w.table == table)
            .map(|w| w.rows)
    }

    pub fn status(&self) -> RunStatus {
        let failed = self.failed_stages().count();
        if failed == 0 {
            RunStatus::Completed
        } else if failed == self.stages.len() {
            RunStatus::Failed
        } else {
            RunStatus::Partial
        }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id:      self.run_id.clone(),
            run_date:    format_date(self.run_date),
            source_rows: self.source_rows,
            status:      self.status(),
            stages: self
                .stages
                .iter()
                .map(|s| StageSummary {
                    stage:  s.stage,
                    tables: s.outcome.as_ref().map(Clone::clone).unwrap_or_default(),
                    error:  s.outcome.as_ref().err().map(ToString::to_string),
                })
                .collect(),
        }
    }
}

/// Serializable end-of-run view of a report.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id:      RunId,
    pub run_date:    String,
    pub source_rows: usize,
    pub status:      RunStatus,
    pub stages:      Vec<StageSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageSummary {
    pub stage:  &'static str,
    pub tables: Vec<TableWrite>,
    pub error:  Option<String>,
}

/// Run every stage once against one extracted snapshot.
///
/// Returns `Err` only when the run cannot start (run log unavailable) or
/// extraction fails; in that case nothing has been written. Stage
/// failures are inside the returned report.
pub fn run_pipeline<R, S>(
    reader: &R,
    store: &S,
    config: &EtlConfig,
    clock: &RunClock,
) -> EtlResult<PipelineReport>
where
    R: SourceReader + ?Sized,
    S: TableStore,
{
    store.begin_run(clock)?;
    log::info!("Run {} starting for {}", clock.run_id, clock.today_text());

    let snapshot = match reader.read_current_snapshot() {
        Ok(s) => s,
        Err(e) => {
            log::error!("Extraction failed, aborting run {}: {e}", clock.run_id);
            if let Err(log_err) = store.finish_run(clock, RunStatus::Failed) {
                log::warn!("Could not record failed run: {log_err}");
            }
            return Err(e);
        }
    };

    let tracked = config.tracked();
    let today = clock.today();
    let rule = config.promotion_rule();
    let mut stages = Vec::with_capacity(7);

    stages.push(run_stage("scd_type0", || {
        let dim = store.read_table::<DimensionRow>(DIM_SCD0)?;
        let out = scd_type0(dim, &snapshot)?;
        Ok(vec![load(store, DIM_SCD0, &out)?])
    }));

    stages.push(run_stage("scd_type1", || {
        let dim = store.read_table::<DimensionRow>(DIM_SCD1)?;
        let out = scd_type1(dim, &snapshot, rule.as_ref(), config.type1)?;
        Ok(vec![load(store, DIM_SCD1, &out)?])
    }));

    stages.push(run_stage("scd_type2", || {
        let dim = store.read_table::<VersionedRow>(DIM_SCD2)?;
        let out = scd_type2(dim, &snapshot, &tracked, today)?;
        Ok(vec![load(store, DIM_SCD2, &out)?])
    }));

    stages.push(run_stage("scd_type3", || {
        let dim = store.read_table::<ShadowRow>(DIM_SCD3)?;
        let out = scd_type3(dim, &snapshot, &tracked)?;
        Ok(vec![load(store, DIM_SCD3, &out)?])
    }));

    stages.push(run_stage("scd_type4", || {
        let dim = store.read_table::<VersionedRow>(DIM_SCD4)?;
        let history = store.read_table::<HistoryRow>(HISTORY_SCD4)?;
        let out = scd_type4(dim, history, &snapshot, &tracked, today)?;
        // Both tables commit together or not at all.
        let tables = [
            (DIM_SCD4, out.dimension.as_slice()),
            (HISTORY_SCD4, out.history.as_slice()),
        ];
        let written = store.write_tables(&tables)?;
        Ok(tables
            .iter()
            .zip(written)
            .map(|(&(table, _), rows)| TableWrite { table, rows })
            .collect())
    }));

    stages.push(run_stage("sort_by_registration_date", || {
        let sorted = sort_by_registration_date(&snapshot)?;
        Ok(vec![load(store, SORTED_CUSTOMERS, &sorted)?])
    }));

    stages.push(run_stage("aggregate_by_loyalty", || {
        let summary = aggregate_by_loyalty(&snapshot)?;
        Ok(vec![load(store, LOYALTY_SUMMARY, &summary)?])
    }));

    let report = PipelineReport {
        run_id:      clock.run_id.clone(),
        run_date:    today,
        source_rows: snapshot.len(),
        stages,
    };

    let status = report.status();
    store.finish_run(clock, status)?;
    log::info!("Run {} finished: {}", clock.run_id, status.as_str());
    Ok(report)
}

fn run_stage(
    stage: &'static str,
    body: impl FnOnce() -> EtlResult<Vec<TableWrite>>,
) -> StageReport {
    let outcome = body();
    if let Err(e) = &outcome {
        log::warn!("Stage {stage} failed: {e}");
    }
    StageReport { stage, outcome }
}

fn load<S: TableStore, R: TableRow>(
    store: &S,
    table: &'static str,
    rows: &[R],
) -> EtlResult<TableWrite> {
    let rows = store.write_table(table, rows)?;
    Ok(TableWrite { table, rows })
}
