//! Run clock: fixes "today" once per pipeline run.
//!
//! Every policy receives the same date so closing and opening dates
//! within one run always agree.

use crate::types::{format_date, RunId};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunClock {
    pub run_id:   RunId,
    pub run_date: NaiveDate,
}

impl RunClock {
    /// Clock for a fresh run dated with the local calendar day.
    pub fn start() -> Self {
        Self::at(Local::now().date_naive())
    }

    /// Clock pinned to a given date (replays and tests).
    pub fn at(run_date: NaiveDate) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            run_date,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.run_date
    }

    pub fn today_text(&self) -> String {
        format_date(self.run_date)
    }
}
