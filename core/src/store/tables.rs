//! Table layouts for every persisted row type.

use super::row::{ColumnDef, RowReader, SqlType, TableRow};
use super::value::{date_value, flag_value, text_value};
use crate::{
    error::EtlResult,
    record::{
        Attributes, DimensionRow, LoyaltySummaryRow, ShadowRow, SourceRecord, TrackedAttr,
        VersionedRow, REGISTRATION_DATE_COLUMN,
    },
    types::KEY_COLUMN,
};
use rusqlite::types::Value;

const KEY: ColumnDef = ColumnDef::required(KEY_COLUMN, SqlType::Integer);

fn attribute_columns() -> impl Iterator<Item = ColumnDef> {
    TrackedAttr::ALL
        .into_iter()
        .map(|a| ColumnDef::nullable(a.column(), SqlType::Text))
}

fn prev_columns() -> impl Iterator<Item = ColumnDef> {
    TrackedAttr::ALL
        .into_iter()
        .map(|a| ColumnDef::nullable(a.prev_column(), SqlType::Text))
}

fn validity_columns() -> [ColumnDef; 3] {
    [
        ColumnDef::required("start_date", SqlType::Text),
        ColumnDef::nullable("end_date", SqlType::Text),
        ColumnDef::required("is_current", SqlType::Integer),
    ]
}

fn attribute_values(attrs: &Attributes) -> impl Iterator<Item = Value> + '_ {
    TrackedAttr::ALL.into_iter().map(move |a| text_value(attrs.get(a)))
}

// ── Type 0 / Type 1 ────────────────────────────────────────────────

impl TableRow for DimensionRow {
    fn columns() -> Vec<ColumnDef> {
        std::iter::once(KEY).chain(attribute_columns()).collect()
    }

    fn from_row(row: &RowReader<'_, '_>) -> EtlResult<Self> {
        Ok(Self {
            customer_id: row.key(KEY_COLUMN)?,
            attrs:       row.attributes()?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        std::iter::once(Value::Integer(self.customer_id))
            .chain(attribute_values(&self.attrs))
            .collect()
    }
}

// ── Type 2 / Type 4 / history ──────────────────────────────────────

impl TableRow for VersionedRow {
    fn columns() -> Vec<ColumnDef> {
        std::iter::once(KEY)
            .chain(attribute_columns())
            .chain(validity_columns())
            .collect()
    }

    fn from_row(row: &RowReader<'_, '_>) -> EtlResult<Self> {
        Ok(Self {
            customer_id: row.key(KEY_COLUMN)?,
            attrs:       row.attributes()?,
            start_date:  row.required_date("start_date")?,
            end_date:    row.date("end_date")?,
            is_current:  row.flag("is_current")?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        std::iter::once(Value::Integer(self.customer_id))
            .chain(attribute_values(&self.attrs))
            .chain([
                date_value(Some(self.start_date)),
                date_value(self.end_date),
                flag_value(self.is_current),
            ])
            .collect()
    }
}

// ── Type 3 ─────────────────────────────────────────────────────────

impl TableRow for ShadowRow {
    fn columns() -> Vec<ColumnDef> {
        std::iter::once(KEY)
            .chain(attribute_columns())
            .chain(prev_columns())
            .collect()
    }

    fn from_row(row: &RowReader<'_, '_>) -> EtlResult<Self> {
        Ok(Self {
            customer_id: row.key(KEY_COLUMN)?,
            attrs:       row.attributes()?,
            prev:        row.prev_attributes()?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        std::iter::once(Value::Integer(self.customer_id))
            .chain(attribute_values(&self.attrs))
            .chain(attribute_values(&self.prev))
            .collect()
    }
}

// ── Analytics outputs ──────────────────────────────────────────────

impl TableRow for SourceRecord {
    fn columns() -> Vec<ColumnDef> {
        std::iter::once(KEY)
            .chain(attribute_columns())
            .chain(std::iter::once(ColumnDef::nullable(
                REGISTRATION_DATE_COLUMN,
                SqlType::Text,
            )))
            .collect()
    }

    fn from_row(row: &RowReader<'_, '_>) -> EtlResult<Self> {
        Ok(Self {
            customer_id:       row.key(KEY_COLUMN)?,
            attrs:             row.attributes()?,
            registration_date: row.date(REGISTRATION_DATE_COLUMN)?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        std::iter::once(Value::Integer(self.customer_id))
            .chain(attribute_values(&self.attrs))
            .chain(std::iter::once(date_value(self.registration_date)))
            .collect()
    }
}

impl TableRow for LoyaltySummaryRow {
    fn columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::required("loyalty_status", SqlType::Text),
            ColumnDef::required("total_customers", SqlType::Integer),
        ]
    }

    fn from_row(row: &RowReader<'_, '_>) -> EtlResult<Self> {
        Ok(Self {
            loyalty_status:  row.required_text("loyalty_status")?,
            total_customers: row.integer("total_customers")?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.loyalty_status.clone()),
            Value::Integer(self.total_customers),
        ]
    }
}
