use crate::types::CustomerId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Source error: {message}")]
    Source { message: String },

    #[error("{operation}: missing required column '{column}'")]
    MissingColumn { operation: String, column: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Malformed value in {table}.{column} (row {row}): {detail}")]
    MalformedValue {
        table:  String,
        column: String,
        row:    usize,
        detail: String,
    },

    #[error("{operation}: duplicate key customer_id={customer_id}")]
    DuplicateKey { operation: String, customer_id: CustomerId },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EtlError {
    pub fn missing_column(operation: &str, column: &str) -> Self {
        EtlError::MissingColumn {
            operation: operation.to_string(),
            column:    column.to_string(),
        }
    }

    /// True for errors that abort the whole run rather than one stage.
    /// A source table with no key column is reported as `Source`.
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(self, EtlError::Config { .. } | EtlError::Source { .. })
    }
}

pub type EtlResult<T> = Result<T, EtlError>;
