//! Typed rows for the customer dimension.
//!
//! Every table the pipeline reads or writes has one row type here.
//! Attribute values are nullable text; a null is `None`, never `""`.

use crate::{
    error::{EtlError, EtlResult},
    types::{CustomerId, KEY_COLUMN},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

pub const REGISTRATION_DATE_COLUMN: &str = "registration_date";

// ── Tracked attributes ─────────────────────────────────────────────

/// A customer attribute whose change drives SCD handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedAttr {
    Name,
    Email,
    Phone,
    Address,
    LoyaltyStatus,
}

impl TrackedAttr {
    pub const ALL: [TrackedAttr; 5] = [
        TrackedAttr::Name,
        TrackedAttr::Email,
        TrackedAttr::Phone,
        TrackedAttr::Address,
        TrackedAttr::LoyaltyStatus,
    ];

    pub fn column(self) -> &'static str {
        match self {
            TrackedAttr::Name          => "name",
            TrackedAttr::Email         => "email",
            TrackedAttr::Phone         => "phone",
            TrackedAttr::Address       => "address",
            TrackedAttr::LoyaltyStatus => "loyalty_status",
        }
    }

    /// Shadow column holding the superseded value (Type 3).
    pub fn prev_column(self) -> &'static str {
        match self {
            TrackedAttr::Name          => "name_prev",
            TrackedAttr::Email         => "email_prev",
            TrackedAttr::Phone         => "phone_prev",
            TrackedAttr::Address       => "address_prev",
            TrackedAttr::LoyaltyStatus => "loyalty_status_prev",
        }
    }
}

/// The five customer attributes carried by every dimension row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub name:           Option<String>,
    pub email:          Option<String>,
    pub phone:          Option<String>,
    pub address:        Option<String>,
    pub loyalty_status: Option<String>,
}

impl Attributes {
    pub fn get(&self, attr: TrackedAttr) -> Option<&str> {
        match attr {
            TrackedAttr::Name          => self.name.as_deref(),
            TrackedAttr::Email         => self.email.as_deref(),
            TrackedAttr::Phone         => self.phone.as_deref(),
            TrackedAttr::Address       => self.address.as_deref(),
            TrackedAttr::LoyaltyStatus => self.loyalty_status.as_deref(),
        }
    }

    pub fn set(&mut self, attr: TrackedAttr, value: Option<String>) {
        let slot = match attr {
            TrackedAttr::Name          => &mut self.name,
            TrackedAttr::Email         => &mut self.email,
            TrackedAttr::Phone         => &mut self.phone,
            TrackedAttr::Address       => &mut self.address,
            TrackedAttr::LoyaltyStatus => &mut self.loyalty_status,
        };
        *slot = value;
    }
}

// ── Source side ────────────────────────────────────────────────────

/// One customer as extracted from the source at the start of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub customer_id:       CustomerId,
    #[serde(flatten)]
    pub attrs:             Attributes,
    pub registration_date: Option<NaiveDate>,
}

impl SourceRecord {
    pub fn new(customer_id: CustomerId, attrs: Attributes) -> Self {
        Self {
            customer_id,
            attrs,
            registration_date: None,
        }
    }
}

/// The full materialized source for one run, plus the columns the
/// source actually produced. Column presence drives schema errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    columns: BTreeSet<String>,
    records: Vec<SourceRecord>,
}

impl Snapshot {
    pub fn new<I, S>(columns: I, records: Vec<SourceRecord>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            records,
        }
    }

    /// Snapshot whose source produced every known column.
    pub fn from_records(records: Vec<SourceRecord>) -> Self {
        let columns = std::iter::once(KEY_COLUMN)
            .chain(TrackedAttr::ALL.iter().map(|a| a.column()))
            .chain(std::iter::once(REGISTRATION_DATE_COLUMN));
        Self::new(columns, records)
    }

    pub fn records(&self) -> &[SourceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    pub fn require_columns(&self, operation: &str, columns: &[&str]) -> EtlResult<()> {
        match columns.iter().find(|c| !self.has_column(c)) {
            Some(missing) => Err(EtlError::missing_column(operation, missing)),
            None => Ok(()),
        }
    }

    /// Key plus every tracked attribute must be present.
    pub fn require_tracked(&self, operation: &str, tracked: &[TrackedAttr]) -> EtlResult<()> {
        self.require_columns(operation, &[KEY_COLUMN])?;
        let columns: Vec<&str> = tracked.iter().map(|a| a.column()).collect();
        self.require_columns(operation, &columns)
    }

    pub fn ensure_unique_keys(&self, operation: &str) -> EtlResult<()> {
        let mut seen = HashSet::with_capacity(self.records.len());
        for record in &self.records {
            if !seen.insert(record.customer_id) {
                return Err(EtlError::DuplicateKey {
                    operation:   operation.to_string(),
                    customer_id: record.customer_id,
                });
            }
        }
        Ok(())
    }
}

// ── Dimension side ─────────────────────────────────────────────────

/// Type 0 / Type 1 row: key plus attributes, no history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionRow {
    pub customer_id: CustomerId,
    #[serde(flatten)]
    pub attrs:       Attributes,
}

impl From<&SourceRecord> for DimensionRow {
    fn from(r: &SourceRecord) -> Self {
        Self {
            customer_id: r.customer_id,
            attrs:       r.attrs.clone(),
        }
    }
}

/// Type 2 / Type 4 row with a validity interval.
///
/// A current row has `is_current = true` and no `end_date`.
/// A closed row has `is_current = false` and an `end_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedRow {
    pub customer_id: CustomerId,
    #[serde(flatten)]
    pub attrs:       Attributes,
    pub start_date:  NaiveDate,
    pub end_date:    Option<NaiveDate>,
    pub is_current:  bool,
}

/// Type 4 history rows share the versioned layout.
pub type HistoryRow = VersionedRow;

impl VersionedRow {
    /// Fresh current row starting `today`.
    pub fn opened(customer_id: CustomerId, attrs: Attributes, today: NaiveDate) -> Self {
        Self {
            customer_id,
            attrs,
            start_date: today,
            end_date: None,
            is_current: true,
        }
    }

    pub fn close(&mut self, today: NaiveDate) {
        self.end_date = Some(today);
        self.is_current = false;
    }

    /// Copy of this row as it stood when it stopped being current.
    pub fn closed_copy(&self, today: NaiveDate) -> Self {
        let mut copy = self.clone();
        copy.close(today);
        copy
    }

    pub fn is_well_formed(&self) -> bool {
        self.is_current == self.end_date.is_none()
    }
}

/// Type 3 row: current attributes plus one generation of prior values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowRow {
    pub customer_id: CustomerId,
    pub attrs:       Attributes,
    pub prev:        Attributes,
}

// ── Analytics ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoyaltySummaryRow {
    pub loyalty_status:  String,
    pub total_customers: i64,
}
