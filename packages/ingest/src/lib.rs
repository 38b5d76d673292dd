#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Import of exported sale listings into the `DuckDB` sale store.
//!
//! Each CSV row becomes one [`SaleRecord`]. The base grid cell is computed
//! here, once per record, from the configured [`GridConfig`]; nothing
//! downstream recomputes it.

pub mod parse;

use std::io::Read;
use std::path::Path;
use std::time::Instant;

use chrono::NaiveDate;
use duckdb::Connection;
use price_map_database::DbError;
use price_map_database::sales_db;
use price_map_grid::GridConfig;
use price_map_sale_models::{SaleRecord, UNDEFINED_MUNICIPALITY};
use serde::Deserialize;

/// Number of records written per upsert batch.
pub const IMPORT_BATCH_SIZE: usize = 5_000;

/// Errors that can occur during import.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Writing to the sale store failed.
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// A row could not be turned into a sale record.
    #[error("Line {line}: {message}")]
    Row {
        /// 1-based line number in the input.
        line: u64,
        /// Description of what went wrong.
        message: String,
    },
}

/// One row of a listing export. Every column is text as displayed on the
/// listing page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SaleRow {
    /// Listing identifier.
    pub id: String,
    /// Property type label.
    pub property_type: String,
    /// Sale date, `YYYY-MM-DD`.
    pub sale_date: String,
    /// Municipality name.
    pub municipality: String,
    /// Descriptive area name.
    pub neighborhood: String,
    /// Street address.
    pub address: String,
    /// Latitude in degrees.
    pub latitude: Option<f64>,
    /// Longitude in degrees.
    pub longitude: Option<f64>,
    /// Sale-type label.
    pub sale_type: String,
    /// Sale price display text.
    pub price: String,
    /// Living area display text.
    pub area: String,
    /// Room count display text.
    pub rooms: String,
    /// Floor display text.
    pub floor: String,
}

impl SaleRow {
    /// Converts the row into a record, computing its base cell with `grid`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Row`] if the identifier or sale date is
    /// missing or malformed.
    pub fn into_record(self, grid: &GridConfig, line: u64) -> Result<SaleRecord, IngestError> {
        let id: i64 = self.id.trim().parse().map_err(|e| IngestError::Row {
            line,
            message: format!("Invalid id {:?}: {e}", self.id),
        })?;

        let sale_date =
            NaiveDate::parse_from_str(self.sale_date.trim(), "%Y-%m-%d").map_err(|e| {
                IngestError::Row {
                    line,
                    message: format!("Invalid sale date {:?}: {e}", self.sale_date),
                }
            })?;

        let municipality = match self.municipality.trim() {
            "" => UNDEFINED_MUNICIPALITY.to_string(),
            name => name.to_string(),
        };

        let mut record = SaleRecord {
            id,
            property_type: self.property_type.trim().to_string(),
            sale_date,
            municipality,
            neighborhood: self.neighborhood.trim().to_string(),
            address: self.address.trim().to_string(),
            latitude: self.latitude,
            longitude: self.longitude,
            sale_type: self.sale_type.trim().to_string(),
            price: parse::parse_price(&self.price),
            area_sqm: parse::parse_area_sqm(&self.area),
            rooms: parse::parse_rooms(&self.rooms),
            floor: parse::parse_floor(&self.floor),
            base_cell: None,
        };
        record.base_cell = record
            .location()
            .and_then(|loc| grid.base_cell(loc.latitude, loc.longitude));

        Ok(record)
    }
}

/// Outcome of an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Data rows read from the input.
    pub read: u64,
    /// Rows rejected as malformed.
    pub skipped: u64,
    /// Rows without a usable location (stored without a base cell).
    pub unlocated: u64,
    /// Rows written to the store.
    pub written: u64,
}

/// Reads sale records from CSV.
///
/// With `strict`, the first malformed row aborts the read; otherwise
/// malformed rows are logged and skipped.
///
/// # Errors
///
/// Returns [`IngestError`] if the CSV cannot be parsed, or on a malformed
/// row in strict mode.
pub fn read_sales<R: Read>(
    reader: R,
    grid: &GridConfig,
    strict: bool,
) -> Result<(Vec<SaleRecord>, ImportSummary), IngestError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let mut summary = ImportSummary::default();
    let mut records = Vec::new();

    for result in csv_reader.deserialize::<SaleRow>() {
        summary.read += 1;
        // Header is line 1.
        let line = summary.read + 1;

        let parsed = result
            .map_err(IngestError::from)
            .and_then(|row| row.into_record(grid, line));

        match parsed {
            Ok(record) => {
                if record.base_cell.is_none() {
                    summary.unlocated += 1;
                }
                records.push(record);
            }
            Err(e) if !strict => {
                log::warn!("Skipping row: {e}");
                summary.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    Ok((records, summary))
}

/// Imports a CSV file into the sale store.
///
/// # Errors
///
/// Returns [`IngestError`] if the file cannot be read, a row is malformed
/// in strict mode, or the store rejects a batch.
pub fn import_csv(
    conn: &Connection,
    path: &Path,
    grid: &GridConfig,
    strict: bool,
) -> Result<ImportSummary, IngestError> {
    let start = Instant::now();
    log::info!("Importing sales from {}", path.display());

    let file = std::fs::File::open(path)?;
    let (records, mut summary) = read_sales(std::io::BufReader::new(file), grid, strict)?;

    for batch in records.chunks(IMPORT_BATCH_SIZE) {
        summary.written += sales_db::upsert_sales(conn, batch)?;
        log::debug!("Wrote {} of {} records", summary.written, records.len());
    }

    log::info!(
        "Imported {} sales ({} skipped, {} unlocated) in {:.1}s",
        summary.written,
        summary.skipped,
        summary.unlocated,
        start.elapsed().as_secs_f64()
    );

    Ok(summary)
}
