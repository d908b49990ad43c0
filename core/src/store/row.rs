//! Row schema contract between typed records and SQLite tables.

use super::value;
use crate::{
    error::{EtlError, EtlResult},
    record::{Attributes, TrackedAttr},
    types::CustomerId,
};
use chrono::NaiveDate;
use rusqlite::types::{Value, ValueRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    Text,
}

impl SqlType {
    pub fn as_sql(self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Text    => "TEXT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name:     &'static str,
    pub sql_type: SqlType,
    pub not_null: bool,
}

impl ColumnDef {
    pub const fn required(name: &'static str, sql_type: SqlType) -> Self {
        Self { name, sql_type, not_null: true }
    }

    pub const fn nullable(name: &'static str, sql_type: SqlType) -> Self {
        Self { name, sql_type, not_null: false }
    }
}

/// A record type persisted as one table row.
///
/// `columns()` is both the CREATE TABLE schema on write and the set of
/// columns that must exist on read.
pub trait TableRow: Sized {
    fn columns() -> Vec<ColumnDef>;

    fn from_row(row: &RowReader<'_, '_>) -> EtlResult<Self>;

    /// Values in `columns()` order.
    fn to_values(&self) -> Vec<Value>;
}

/// Named, typed access to one result row, with errors that say where a
/// bad value sits.
pub struct RowReader<'r, 's> {
    row:     &'r rusqlite::Row<'s>,
    columns: &'r [String],
    table:   &'r str,
    index:   usize,
}

impl<'r, 's> RowReader<'r, 's> {
    pub fn new(row: &'r rusqlite::Row<'s>, columns: &'r [String], table: &'r str, index: usize) -> Self {
        Self { row, columns, table, index }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    fn convert<T>(
        &self,
        column: &str,
        f: impl FnOnce(ValueRef<'_>) -> Result<T, String>,
    ) -> EtlResult<T> {
        let pos = self
            .position(column)
            .ok_or_else(|| EtlError::missing_column(self.table, column))?;
        let raw = self.row.get_ref(pos)?;
        f(raw).map_err(|detail| EtlError::MalformedValue {
            table:  self.table.to_string(),
            column: column.to_string(),
            row:    self.index,
            detail,
        })
    }

    pub fn key(&self, column: &str) -> EtlResult<CustomerId> {
        self.convert(column, value::to_key)
    }

    pub fn integer(&self, column: &str) -> EtlResult<i64> {
        self.convert(column, value::to_integer)
    }

    pub fn text(&self, column: &str) -> EtlResult<Option<String>> {
        self.convert(column, value::to_text)
    }

    pub fn required_text(&self, column: &str) -> EtlResult<String> {
        self.convert(column, |v| value::to_text(v)?.ok_or_else(|| "unexpected null".to_string()))
    }

    pub fn date(&self, column: &str) -> EtlResult<Option<NaiveDate>> {
        self.convert(column, value::to_date)
    }

    pub fn required_date(&self, column: &str) -> EtlResult<NaiveDate> {
        self.convert(column, |v| value::to_date(v)?.ok_or_else(|| "unexpected null".to_string()))
    }

    pub fn flag(&self, column: &str) -> EtlResult<bool> {
        self.convert(column, value::to_flag)
    }

    /// Null when the column is not in the result at all.
    pub fn text_if_present(&self, column: &str) -> EtlResult<Option<String>> {
        if self.has_column(column) {
            self.text(column)
        } else {
            Ok(None)
        }
    }

    pub fn date_if_present(&self, column: &str) -> EtlResult<Option<NaiveDate>> {
        if self.has_column(column) {
            self.date(column)
        } else {
            Ok(None)
        }
    }

    pub fn attributes(&self) -> EtlResult<Attributes> {
        self.collect_attributes(|a| a.column(), false)
    }

    pub fn attributes_if_present(&self) -> EtlResult<Attributes> {
        self.collect_attributes(|a| a.column(), true)
    }

    pub fn prev_attributes(&self) -> EtlResult<Attributes> {
        self.collect_attributes(|a| a.prev_column(), false)
    }

    fn collect_attributes(
        &self,
        column_of: impl Fn(TrackedAttr) -> &'static str,
        lenient: bool,
    ) -> EtlResult<Attributes> {
        let mut attrs = Attributes::default();
        for attr in TrackedAttr::ALL {
            let column = column_of(attr);
            let value = if lenient {
                self.text_if_present(column)?
            } else {
                self.text(column)?
            };
            attrs.set(attr, value);
        }
        Ok(attrs)
    }
}
