//! Aggregations evaluated inside `DuckDB`.
//!
//! Each function here returns the same result as its in-memory counterpart
//! in `price_map_aggregate` over the records of the store, but filters and
//! groups with a single SQL statement instead of loading every record.

use duckdb::Connection;
use geo::Coord;
use price_map_aggregate::AggregateError;
use price_map_aggregate::filter::SaleFilter;
use price_map_aggregate::region::convex_hull;
use price_map_aggregate_models::{
    BoundingBox, CellStats, MunicipalityStats, PriceSummary, RegionPolygon,
};
use price_map_grid_models::{CellKey, CellScale};
use price_map_sale_models::UNDEFINED_MUNICIPALITY;

use crate::DbError;

/// Rows with a usable position.
const LOCATED: &str = "latitude BETWEEN -90 AND 90 \
                       AND longitude BETWEEN -180 AND 180 \
                       AND NOT (latitude = 0 AND longitude = 0)";

/// Builds the WHERE fragments and bound parameters selecting the sales
/// `filter` accepts.
fn build_sale_filters(filter: &SaleFilter) -> (Vec<String>, Vec<String>) {
    let mut frags = vec![
        "price IS NOT NULL".to_string(),
        "area_sqm IS NOT NULL".to_string(),
        "isfinite(area_sqm)".to_string(),
        "area_sqm > 0".to_string(),
    ];
    let mut params = Vec::new();

    let labels: Vec<&str> = filter.accepted().labels().collect();
    if labels.is_empty() {
        frags.push("FALSE".to_string());
    } else {
        let placeholders = vec!["?"; labels.len()].join(", ");
        frags.push(format!("sale_type IN ({placeholders})"));
        params.extend(labels.into_iter().map(str::to_string));
    }

    let range = filter.range();
    if let Some(from) = range.from_date() {
        frags.push("sale_date > CAST(? AS DATE)".to_string());
        params.push(from.format("%Y-%m-%d").to_string());
    }
    if let Some(to) = range.to_date() {
        frags.push("sale_date < CAST(? AS DATE)".to_string());
        params.push(to.format("%Y-%m-%d").to_string());
    }

    (frags, params)
}

fn prepare_bound<'conn>(
    conn: &'conn Connection,
    sql: &str,
    params: &[String],
) -> Result<duckdb::Statement<'conn>, DbError> {
    let mut stmt = conn.prepare(sql)?;
    for (i, param) in params.iter().enumerate() {
        stmt.raw_bind_parameter(i + 1, param)?;
    }
    stmt.raw_execute()?;
    Ok(stmt)
}

/// Per-cell statistics at `cell_scale` over the sales `filter` accepts.
///
/// Results are ordered by cell key.
///
/// # Errors
///
/// Returns [`DbError::Aggregate`] for a scale outside the accepted bound,
/// without querying, or [`DbError`] if the query fails.
pub fn grid_stats(
    conn: &Connection,
    filter: &SaleFilter,
    cell_scale: i64,
) -> Result<Vec<CellStats>, DbError> {
    let scale = CellScale::new(cell_scale).map_err(AggregateError::from)?;
    let divisor = scale.value();

    let (mut frags, params) = build_sale_filters(filter);
    frags.push("grid_x IS NOT NULL AND grid_y IS NOT NULL".to_string());
    let where_clause = frags.join(" AND ");

    let sql = format!(
        "SELECT cell_x, cell_y, COUNT(*), AVG(ppa), MIN(ppa), MAX(ppa)
         FROM (
             SELECT CAST(floor(grid_x / {divisor}.0) AS INTEGER) AS cell_x,
                    CAST(floor(grid_y / {divisor}.0) AS INTEGER) AS cell_y,
                    CAST(price AS DOUBLE) / area_sqm AS ppa
             FROM apartment_sales
             WHERE {where_clause}
         )
         GROUP BY cell_x, cell_y
         ORDER BY cell_x, cell_y"
    );

    let mut stmt = prepare_bound(conn, &sql, &params)?;
    let mut rows = stmt.raw_query();

    let mut cells = Vec::new();
    while let Some(row) = rows.next()? {
        let count: i64 = row.get(2)?;
        cells.push(CellStats {
            key: CellKey::new(row.get(0)?, row.get(1)?),
            count: u64::try_from(count).map_err(|e| DbError::Conversion {
                message: format!("Negative cell count {count}: {e}"),
            })?,
            price_per_area: Some(PriceSummary {
                average: row.get(3)?,
                min: row.get(4)?,
                max: row.get(5)?,
            }),
        });
    }

    log::debug!("Grid query at scale {scale} returned {} cells", cells.len());

    Ok(cells)
}

/// Average price-per-area per municipality over the sales `filter`
/// accepts. Blank labels are grouped under [`UNDEFINED_MUNICIPALITY`].
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn average_by_municipality(
    conn: &Connection,
    filter: &SaleFilter,
) -> Result<MunicipalityStats, DbError> {
    let (frags, filter_params) = build_sale_filters(filter);
    let where_clause = frags.join(" AND ");

    let sql = format!(
        "SELECT COALESCE(NULLIF(trim(municipality), ''), ?) AS label,
                AVG(CAST(price AS DOUBLE) / area_sqm)
         FROM apartment_sales
         WHERE {where_clause}
         GROUP BY label
         ORDER BY label"
    );

    let mut params = vec![UNDEFINED_MUNICIPALITY.to_string()];
    params.extend(filter_params);

    let mut stmt = prepare_bound(conn, &sql, &params)?;
    let mut rows = stmt.raw_query();

    let mut stats = MunicipalityStats::new();
    while let Some(row) = rows.next()? {
        let label: String = row.get(0)?;
        let average: f64 = row.get(1)?;
        stats.insert(label, average);
    }

    Ok(stats)
}

/// Extent of all located sales.
///
/// # Errors
///
/// Returns [`DbError::Aggregate`] with [`AggregateError::EmptyDataset`] if
/// no sale is located, or [`DbError`] if the query fails.
pub fn bounding_box(conn: &Connection) -> Result<BoundingBox, DbError> {
    let sql = format!(
        "SELECT MIN(latitude), MIN(longitude), MAX(latitude), MAX(longitude)
         FROM apartment_sales
         WHERE {LOCATED}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let extent: [Option<f64>; 4] = stmt.query_row([], |row| {
        Ok([row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?])
    })?;

    match extent {
        [Some(min_lat), Some(min_lng), Some(max_lat), Some(max_lng)] => Ok(BoundingBox {
            min_lat,
            min_lng,
            max_lat,
            max_lng,
        }),
        _ => Err(AggregateError::EmptyDataset.into()),
    }
}

/// Convex outline of all located sales.
///
/// The hull itself is computed in memory from the located positions only.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn region_polygon(conn: &Connection) -> Result<RegionPolygon, DbError> {
    let sql = format!("SELECT longitude, latitude FROM apartment_sales WHERE {LOCATED}");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;

    let mut points = Vec::new();
    while let Some(row) = rows.next()? {
        points.push(Coord {
            x: row.get(0)?,
            y: row.get(1)?,
        });
    }

    Ok(convex_hull(points))
}
