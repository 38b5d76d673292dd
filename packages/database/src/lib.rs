#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! `DuckDB` storage for property sale records.
//!
//! [`sales_db`] owns the `apartment_sales` table: schema creation, upserts,
//! and loading records back for in-memory aggregation. [`queries`] pushes
//! the same aggregations down into single grouped SQL statements so large
//! stores never have to be materialised.

pub mod paths;
pub mod queries;
pub mod sales_db;

use price_map_aggregate::AggregateError;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// `DuckDB` query error.
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    /// Filesystem error while preparing the database location.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Request rejected before any query ran.
    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}
