//! Shared primitive types used across the entire pipeline.

use chrono::NaiveDate;

/// The business key of a customer row.
pub type CustomerId = i64;

/// The canonical run identifier.
pub type RunId = String;

/// Date format for every date persisted by the store.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Name of the key column in source and dimension tables.
pub const KEY_COLUMN: &str = "customer_id";

// Persisted table names. The table store must honor these.
pub const DIM_SCD0: &str = "dim_scd0";
pub const DIM_SCD1: &str = "dim_scd1";
pub const DIM_SCD2: &str = "dim_scd2";
pub const DIM_SCD3: &str = "dim_scd3";
pub const DIM_SCD4: &str = "dim_scd4";
pub const HISTORY_SCD4: &str = "history_scd4";
pub const SORTED_CUSTOMERS: &str = "sorted_customers";
pub const LOYALTY_SUMMARY: &str = "loyalty_summary";

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
