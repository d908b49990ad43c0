//! scd-core: slowly changing dimension reconciliation for the customer
//! dimension, plus the extract/load collaborators around it.
//!
//! The policies in `policy` are pure functions over typed rows. The
//! `source` and `store` modules are the only code that touches SQLite,
//! and `pipeline` wires one run together.

pub mod analytics;
pub mod clock;
pub mod compare;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod policy;
pub mod promotion;
pub mod record;
pub mod source;
pub mod store;
pub mod types;

pub use error::{EtlError, EtlResult};
