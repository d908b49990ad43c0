//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the target database.
//! Policies receive rows and return rows; they never execute SQL.
//!
//! Tables are written with full-replace semantics: `write_tables` drops,
//! recreates and refills every named table inside one transaction.

mod row;
mod run;
mod tables;
pub(crate) mod value;

pub use row::{ColumnDef, RowReader, SqlType, TableRow};
pub use run::RunStatus;

use crate::{
    clock::RunClock,
    config::TargetConfig,
    error::{EtlError, EtlResult},
};
use rusqlite::{params, params_from_iter, Connection};

/// Persists and retrieves named tables of typed rows.
pub trait TableStore {
    /// Every row of `name`, in insertion order. Empty when the table
    /// does not exist yet.
    fn read_table<R: TableRow>(&self, name: &str) -> EtlResult<Vec<R>>;

    /// Replace the whole contents of every listed table, all or nothing.
    /// Returns the rows written per table, in order.
    fn write_tables<R: TableRow>(&self, tables: &[(&str, &[R])]) -> EtlResult<Vec<usize>>;

    /// Replace the whole contents of `name` with `rows`.
    fn write_table<R: TableRow>(&self, name: &str, rows: &[R]) -> EtlResult<usize> {
        Ok(self.write_tables(&[(name, rows)])?.iter().sum())
    }

    fn begin_run(&self, _clock: &RunClock) -> EtlResult<()> {
        Ok(())
    }

    fn finish_run(&self, _clock: &RunClock, _status: RunStatus) -> EtlResult<()> {
        Ok(())
    }
}

pub struct SqliteTableStore {
    conn: Connection,
}

impl SqliteTableStore {
    pub fn open(path: &str) -> EtlResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )
        .map_err(|e| EtlError::Config {
            message: format!("cannot open target database {path}: {e}"),
        })?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        if let Err(e) = conn.execute_batch("PRAGMA journal_mode=WAL;") {
            log::debug!("{path}: WAL journal mode not enabled: {e}");
        }
        Ok(Self { conn })
    }

    pub fn from_config(config: &TargetConfig) -> EtlResult<Self> {
        Self::open(&config.database)
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> EtlResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> EtlResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    pub fn table_exists(&self, name: &str) -> EtlResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn table_columns(&self, name: &str) -> EtlResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt
            .query_map(params![name], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    pub fn row_count(&self, name: &str) -> EtlResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(name)?);
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }
}

impl TableStore for SqliteTableStore {
    fn read_table<R: TableRow>(&self, name: &str) -> EtlResult<Vec<R>> {
        let table = quote_identifier(name)?;
        if !self.table_exists(name)? {
            log::info!("{name}: table not found, starting empty");
            return Ok(Vec::new());
        }

        let present = self.table_columns(name)?;
        let wanted: Vec<String> = R::columns().iter().map(|c| c.name.to_string()).collect();
        if let Some(missing) = wanted.iter().find(|c| !present.contains(c)) {
            return Err(EtlError::missing_column(&format!("read_table({name})"), missing));
        }

        let select_list = wanted
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<EtlResult<Vec<_>>>()?
            .join(", ");
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {select_list} FROM {table} ORDER BY rowid"))?;
        let mut rows = stmt.query([])?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let reader = RowReader::new(row, &wanted, name, out.len());
            out.push(R::from_row(&reader)?);
        }
        log::debug!("{name}: read {} rows", out.len());
        Ok(out)
    }

    fn write_tables<R: TableRow>(&self, tables: &[(&str, &[R])]) -> EtlResult<Vec<usize>> {
        // Dropping the transaction on error rolls every table back.
        let tx = self.conn.unchecked_transaction()?;
        let mut written = Vec::with_capacity(tables.len());
        for (name, rows) in tables {
            written.push(replace_table(&tx, name, rows)?);
        }
        tx.commit()?;

        for ((name, _), rows) in tables.iter().zip(&written) {
            log::info!("Loaded {name}: {rows} rows");
        }
        Ok(written)
    }

    fn begin_run(&self, clock: &RunClock) -> EtlResult<()> {
        self.insert_run(clock, env!("CARGO_PKG_VERSION"))
    }

    fn finish_run(&self, clock: &RunClock, status: RunStatus) -> EtlResult<()> {
        self.update_run_status(&clock.run_id, status)
    }
}

/// Drop, recreate and fill one table on `conn`. The caller owns the
/// transaction.
fn replace_table<R: TableRow>(conn: &Connection, name: &str, rows: &[R]) -> EtlResult<usize> {
    let table = quote_identifier(name)?;
    let columns = R::columns();

    let mut defs = Vec::with_capacity(columns.len());
    let mut names = Vec::with_capacity(columns.len());
    for c in &columns {
        let ident = quote_identifier(c.name)?;
        let not_null = if c.not_null { " NOT NULL" } else { "" };
        defs.push(format!("{ident} {}{not_null}", c.sql_type.as_sql()));
        names.push(ident);
    }
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();

    conn.execute_batch(&format!(
        "DROP TABLE IF EXISTS {table};
         CREATE TABLE {table} ({});",
        defs.join(", ")
    ))?;
    let mut insert = conn.prepare(&format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        names.join(", "),
        placeholders.join(", ")
    ))?;
    for row in rows {
        insert.execute(params_from_iter(row.to_values()))?;
    }
    Ok(rows.len())
}

/// Quote a table or column name. Only `[A-Za-z0-9_]` names are accepted.
pub(crate) fn quote_identifier(name: &str) -> EtlResult<String> {
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(format!("\"{name}\""))
    } else {
        Err(EtlError::Validation {
            message: format!("invalid table or column name '{name}'"),
        })
    }
}
