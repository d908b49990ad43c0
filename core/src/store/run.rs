use super::SqliteTableStore;
use crate::{
    clock::RunClock,
    error::{EtlError, EtlResult},
};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    /// Some stages failed; the others were written.
    Partial,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running   => "running",
            RunStatus::Completed => "completed",
            RunStatus::Partial   => "partial",
            RunStatus::Failed    => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running"   => Some(RunStatus::Running),
            "completed" => Some(RunStatus::Completed),
            "partial"   => Some(RunStatus::Partial),
            "failed"    => Some(RunStatus::Failed),
            _           => None,
        }
    }
}

impl SqliteTableStore {
    // ── Run log ────────────────────────────────────────────────────

    pub fn insert_run(&self, clock: &RunClock, version: &str) -> EtlResult<()> {
        self.conn.execute(
            "INSERT INTO etl_run (run_id, run_date, version, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                clock.run_id,
                clock.today_text(),
                version,
                RunStatus::Running.as_str()
            ],
        )?;
        Ok(())
    }

    pub fn update_run_status(&self, run_id: &str, status: RunStatus) -> EtlResult<()> {
        let finished = status != RunStatus::Running;
        self.conn.execute(
            "UPDATE etl_run SET status = ?1, finished = ?2 WHERE run_id = ?3",
            params![status.as_str(), finished, run_id],
        )?;
        Ok(())
    }

    pub fn run_status(&self, run_id: &str) -> EtlResult<Option<RunStatus>> {
        let status: Option<String> = self
            .conn
            .query_row(
                "SELECT status FROM etl_run WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        status
            .map(|s| {
                RunStatus::parse(&s).ok_or_else(|| EtlError::Validation {
                    message: format!("unknown run status '{s}' for run {run_id}"),
                })
            })
            .transpose()
    }

    pub fn run_count(&self) -> EtlResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM etl_run", [], |row| row.get(0))?)
    }
}
