//! Source extraction: yields the full current customer snapshot.
//!
//! The reader reports exactly the columns the source produced; the
//! policies and analytics decide which of them they require.

use crate::{
    config::SourceConfig,
    error::{EtlError, EtlResult},
    record::{Snapshot, SourceRecord, REGISTRATION_DATE_COLUMN},
    store::{quote_identifier, RowReader},
    types::KEY_COLUMN,
};
use rusqlite::{Connection, OpenFlags};

pub trait SourceReader {
    fn read_current_snapshot(&self) -> EtlResult<Snapshot>;
}

/// An already materialized snapshot reads as itself.
impl SourceReader for Snapshot {
    fn read_current_snapshot(&self) -> EtlResult<Snapshot> {
        Ok(self.clone())
    }
}

/// Runs `SELECT *` against the configured source table.
pub struct SqliteSourceReader {
    conn:  Connection,
    table: String,
}

impl SqliteSourceReader {
    /// Open the source database read-only. A missing file is a
    /// connectivity error, not an empty source.
    pub fn open(config: &SourceConfig) -> EtlResult<Self> {
        let conn = Connection::open_with_flags(
            &config.database,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI,
        )
        .map_err(|e| EtlError::Source {
            message: format!("cannot open source database {}: {e}", config.database),
        })?;
        Ok(Self::from_connection(conn, &config.table))
    }

    pub fn from_connection(conn: Connection, table: &str) -> Self {
        Self {
            conn,
            table: table.to_string(),
        }
    }
}

impl SourceReader for SqliteSourceReader {
    fn read_current_snapshot(&self) -> EtlResult<Snapshot> {
        let table = quote_identifier(&self.table)?;
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {table}"))
            .map_err(|e| EtlError::Source {
                message: format!("cannot query source table {}: {e}", self.table),
            })?;

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        // A source without keys is unusable for every stage.
        if !columns.iter().any(|c| c == KEY_COLUMN) {
            return Err(EtlError::Source {
                message: format!("source table {} has no {KEY_COLUMN} column", self.table),
            });
        }

        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let reader = RowReader::new(row, &columns, &self.table, records.len());
            records.push(SourceRecord {
                customer_id:       reader.key(KEY_COLUMN)?,
                attrs:             reader.attributes_if_present()?,
                registration_date: reader.date_if_present(REGISTRATION_DATE_COLUMN)?,
            });
        }

        log::info!("Extracted {} rows from source table {}", records.len(), self.table);
        Ok(Snapshot::new(columns, records))
    }
}
