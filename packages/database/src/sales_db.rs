//! The `apartment_sales` table.
//!
//! One row per observed sale, keyed by the listing identifier. Base grid
//! coordinates are stored alongside the position (`grid_x`, `grid_y`) and
//! are `NULL` for records without a usable location.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use duckdb::Connection;
use price_map_grid_models::CellKey;
use price_map_sale_models::{SaleRecord, UNDEFINED_MUNICIPALITY};

use crate::DbError;

/// Number of rows per INSERT chunk.
const CHUNK_SIZE: usize = 1_000;

/// Columns in insert and select order.
const COLUMNS: &str = "id, property_type, sale_date, municipality, neighborhood, address, \
                       latitude, longitude, sale_type, price, area_sqm, rooms, floor, \
                       grid_x, grid_y";

const ROW_PLACEHOLDERS: &str = "(?, ?, CAST(? AS DATE), ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

const PARAMS_PER_ROW: usize = 15;

/// Opens (or creates) the sale store at `path` and ensures the schema
/// exists.
///
/// # Errors
///
/// Returns [`DbError`] if the parent directory, connection, or schema
/// creation fails.
pub fn open(path: &Path) -> Result<Connection, DbError> {
    if let Some(parent) = path.parent() {
        crate::paths::ensure_dir(parent)?;
    }

    let conn = Connection::open(path)?;
    create_schema(&conn)?;

    log::info!("Opened sale store at {}", path.display());

    Ok(conn)
}

/// Opens an empty in-memory sale store.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open_in_memory() -> Result<Connection, DbError> {
    let conn = Connection::open_in_memory()?;
    create_schema(&conn)?;
    Ok(conn)
}

/// Opens an existing sale store without write access.
///
/// # Errors
///
/// Returns [`DbError`] if the file cannot be opened.
pub fn open_read_only(path: &Path) -> Result<Connection, DbError> {
    let config = duckdb::Config::default().access_mode(duckdb::AccessMode::ReadOnly)?;
    Ok(Connection::open_with_flags(path, config)?)
}

fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS apartment_sales (
            id BIGINT NOT NULL PRIMARY KEY,
            property_type TEXT NOT NULL,
            sale_date DATE NOT NULL,
            municipality TEXT NOT NULL,
            neighborhood TEXT NOT NULL,
            address TEXT NOT NULL,
            latitude DOUBLE,
            longitude DOUBLE,
            sale_type TEXT NOT NULL,
            price BIGINT,
            area_sqm DOUBLE,
            rooms DOUBLE,
            floor DOUBLE,
            grid_x INTEGER,
            grid_y INTEGER
        );",
    )?;

    Ok(())
}

/// Inserts or replaces a batch of sales by identifier.
///
/// Later occurrences of an identifier within the batch win. Municipality
/// labels are stored trimmed, with blank labels stored as
/// [`UNDEFINED_MUNICIPALITY`]. Returns the number of rows written.
///
/// # Errors
///
/// Returns [`DbError`] if any database operation fails.
pub fn upsert_sales(conn: &Connection, sales: &[SaleRecord]) -> Result<u64, DbError> {
    if sales.is_empty() {
        return Ok(0);
    }

    let mut last_seen: BTreeMap<i64, usize> = BTreeMap::new();
    for (i, sale) in sales.iter().enumerate() {
        last_seen.insert(sale.id, i);
    }
    let deduped: Vec<&SaleRecord> = sales
        .iter()
        .enumerate()
        .filter(|(i, sale)| last_seen.get(&sale.id) == Some(i))
        .map(|(_, sale)| sale)
        .collect();

    if deduped.len() < sales.len() {
        log::info!(
            "Deduplicated upsert batch: {} -> {} rows",
            sales.len(),
            deduped.len(),
        );
    }

    let mut total = 0u64;

    for chunk in deduped.chunks(CHUNK_SIZE) {
        let placeholders = vec![ROW_PLACEHOLDERS; chunk.len()].join(", ");
        let sql = format!("INSERT OR REPLACE INTO apartment_sales ({COLUMNS}) VALUES {placeholders}");

        let mut stmt = conn.prepare(&sql)?;
        let mut idx = 1usize;

        for sale in chunk {
            let date = sale.sale_date.format("%Y-%m-%d").to_string();
            let grid_x = sale.base_cell.map(|c| c.cell_x);
            let grid_y = sale.base_cell.map(|c| c.cell_y);

            stmt.raw_bind_parameter(idx, sale.id)?;
            stmt.raw_bind_parameter(idx + 1, &sale.property_type)?;
            stmt.raw_bind_parameter(idx + 2, date)?;
            stmt.raw_bind_parameter(idx + 3, sale.municipality_label())?;
            stmt.raw_bind_parameter(idx + 4, &sale.neighborhood)?;
            stmt.raw_bind_parameter(idx + 5, &sale.address)?;
            stmt.raw_bind_parameter(idx + 6, sale.latitude)?;
            stmt.raw_bind_parameter(idx + 7, sale.longitude)?;
            stmt.raw_bind_parameter(idx + 8, &sale.sale_type)?;
            stmt.raw_bind_parameter(idx + 9, sale.price)?;
            stmt.raw_bind_parameter(idx + 10, sale.area_sqm)?;
            stmt.raw_bind_parameter(idx + 11, sale.rooms)?;
            stmt.raw_bind_parameter(idx + 12, sale.floor)?;
            stmt.raw_bind_parameter(idx + 13, grid_x)?;
            stmt.raw_bind_parameter(idx + 14, grid_y)?;

            idx += PARAMS_PER_ROW;
        }

        let rows = stmt.raw_execute()?;
        total += u64::try_from(rows).unwrap_or(0);
    }

    Ok(total)
}

/// Loads every stored sale, ordered by identifier.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a stored date cannot be
/// parsed.
pub fn load_sales(conn: &Connection) -> Result<Vec<SaleRecord>, DbError> {
    let sql = format!(
        "SELECT {} FROM apartment_sales ORDER BY id",
        COLUMNS.replacen("sale_date", "CAST(sale_date AS VARCHAR)", 1)
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;

    let mut sales = Vec::new();
    while let Some(row) = rows.next()? {
        let sale_date: String = row.get(2)?;
        let grid_x: Option<i32> = row.get(13)?;
        let grid_y: Option<i32> = row.get(14)?;

        sales.push(SaleRecord {
            id: row.get(0)?,
            property_type: row.get(1)?,
            sale_date: parse_date(&sale_date)?,
            municipality: row.get(3)?,
            neighborhood: row.get(4)?,
            address: row.get(5)?,
            latitude: row.get(6)?,
            longitude: row.get(7)?,
            sale_type: row.get(8)?,
            price: row.get(9)?,
            area_sqm: row.get(10)?,
            rooms: row.get(11)?,
            floor: row.get(12)?,
            base_cell: grid_x.zip(grid_y).map(|(x, y)| CellKey::new(x, y)),
        });
    }

    log::debug!("Loaded {} sales", sales.len());

    Ok(sales)
}

/// Returns the number of stored sales.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn sale_count(conn: &Connection) -> Result<u64, DbError> {
    let mut stmt = conn.prepare("SELECT COUNT(*) FROM apartment_sales")?;
    let count: i64 = stmt.query_row([], |row| row.get(0))?;
    u64::try_from(count).map_err(|e| DbError::Conversion {
        message: format!("Negative row count {count}: {e}"),
    })
}

/// Returns the earliest and latest stored sale dates, or `None` if the
/// store is empty.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a stored date cannot be
/// parsed.
pub fn sale_date_range(conn: &Connection) -> Result<Option<(NaiveDate, NaiveDate)>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT CAST(MIN(sale_date) AS VARCHAR), CAST(MAX(sale_date) AS VARCHAR)
         FROM apartment_sales",
    )?;
    let (min, max): (Option<String>, Option<String>) =
        stmt.query_row([], |row| Ok((row.get(0)?, row.get(1)?)))?;

    match (min, max) {
        (Some(min), Some(max)) => Ok(Some((parse_date(&min)?, parse_date(&max)?))),
        _ => Ok(None),
    }
}

pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| DbError::Conversion {
        message: format!("Invalid sale date {s:?}: {e}"),
    })
}
