//! HTTP handler functions for the price map API.
//!
//! Store queries are blocking, so each one runs on the Actix blocking
//! thread pool with a pooled connection.

use actix_web::{HttpResponse, web};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use price_map_aggregate::AggregateError;
use price_map_aggregate::filter::SaleFilter;
use price_map_aggregate::region::to_geojson;
use price_map_aggregate_models::{CellStats, DateRange};
use price_map_database::{DbError, queries};
use price_map_grid::GridConfig;
use price_map_grid_models::CellScale;
use price_map_server_models::{
    ApiError, ApiGridCell, ApiHealth, DateRangeParams, GridQueryParams, GridSqmPricesRequest,
};

use crate::{AppState, DuckDbPool};

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/PropertyListing/AvgSqmPriceByMunicipality`
///
/// Average price per square meter of final-price sales per municipality.
pub async fn avg_sqm_price_by_municipality(
    state: web::Data<AppState>,
    params: web::Query<DateRangeParams>,
) -> HttpResponse {
    let filter = match date_range(*params) {
        Ok(range) => SaleFilter::municipality(range),
        Err(response) => return response,
    };

    match with_connection(&state, move |conn| {
        queries::average_by_municipality(conn, &filter)
    })
    .await
    {
        Ok(stats) => HttpResponse::Ok().json(stats),
        Err(e) => error_response(&e, "Failed to query municipality averages"),
    }
}

/// `GET /api/PropertyListing/BoundingBox`
///
/// Extent of all located sales; 404 when there are none.
pub async fn bounding_box(state: web::Data<AppState>) -> HttpResponse {
    match with_connection(&state, queries::bounding_box).await {
        Ok(bbox) => HttpResponse::Ok().json(bbox),
        Err(e) => error_response(&e, "Failed to query bounding box"),
    }
}

/// `GET /api/PropertyListing/Polygon`
///
/// Convex outline of all located sales as a `GeoJSON` geometry; 404 when
/// there are none.
pub async fn polygon(state: web::Data<AppState>) -> HttpResponse {
    match with_connection(&state, queries::region_polygon).await {
        Ok(outline) => to_geojson(&outline).map_or_else(
            || HttpResponse::NotFound().json(ApiError::new("No polygon could be generated.")),
            |geometry| HttpResponse::Ok().json(geometry),
        ),
        Err(e) => error_response(&e, "Failed to compute polygon"),
    }
}

/// `POST /api/PropertyListing/GridSqmPrices`
///
/// Per-cell statistics at a cell scale. The body is either a bare integer
/// scale or `{"cellScale", "fromDate", "toDate"}`.
pub async fn grid_sqm_prices(
    state: web::Data<AppState>,
    body: web::Json<GridSqmPricesRequest>,
) -> HttpResponse {
    let params = GridQueryParams::from(body.into_inner());

    match grid_stats(&state, params).await {
        Ok(cells) => {
            let cells: Vec<ApiGridCell> = cells.into_iter().map(ApiGridCell::from).collect();
            HttpResponse::Ok().json(cells)
        }
        Err(response) => response,
    }
}

/// `GET /api/PropertyListing/GridCells`
///
/// Same statistics as `GridSqmPrices`, as a `GeoJSON` `FeatureCollection`
/// of cell rectangles.
pub async fn grid_cells(
    state: web::Data<AppState>,
    params: web::Query<GridQueryParams>,
) -> HttpResponse {
    let params = *params;
    let cells = match grid_stats(&state, params).await {
        Ok(cells) => cells,
        Err(response) => return response,
    };

    // Validated by `grid_stats`.
    let Ok(scale) = CellScale::new(params.cell_scale) else {
        return bad_request("Invalid cell scale");
    };

    let features = match cells
        .into_iter()
        .map(|cell| cell_feature(&state.grid, cell, scale))
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(features) => features,
        Err(e) => {
            log::error!("Failed to build grid cell features: {e}");
            return HttpResponse::InternalServerError()
                .json(ApiError::new("Failed to build grid cell features"));
        }
    };

    HttpResponse::Ok().json(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

/// Builds the `GeoJSON` feature for one cell: its rectangle at `scale` with
/// the cell statistics as properties.
fn cell_feature(
    grid: &GridConfig,
    cell: CellStats,
    scale: CellScale,
) -> Result<Feature, serde_json::Error> {
    let rect = grid.cell_bounds(cell.key, scale);
    let properties: JsonObject =
        serde_json::from_value(serde_json::to_value(ApiGridCell::from(cell))?)?;

    Ok(Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::from(&rect.to_polygon()))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    })
}

async fn grid_stats(
    state: &web::Data<AppState>,
    params: GridQueryParams,
) -> Result<Vec<CellStats>, HttpResponse> {
    let range = date_range(params.date_range())?;
    if let Err(e) = CellScale::new(params.cell_scale) {
        return Err(bad_request(&e.to_string()));
    }

    let filter = SaleFilter::grid(range);
    with_connection(state, move |conn| {
        queries::grid_stats(conn, &filter, params.cell_scale)
    })
    .await
    .map_err(|e| error_response(&e, "Failed to query grid statistics"))
}

/// Validates the request's date window.
fn date_range(params: DateRangeParams) -> Result<DateRange, HttpResponse> {
    DateRange::new(params.from_date, params.to_date).map_err(|e| bad_request(&e.to_string()))
}

/// Runs `query` with a pooled connection on the blocking thread pool.
async fn with_connection<T, F>(state: &web::Data<AppState>, query: F) -> Result<T, DbError>
where
    T: Send + 'static,
    F: FnOnce(&duckdb::Connection) -> Result<T, DbError> + Send + 'static,
{
    let pool: std::sync::Arc<DuckDbPool> = state.pool.clone();
    web::block(move || {
        let conn = pool.acquire();
        query(&conn)
    })
    .await
    .map_err(|e| DbError::Conversion {
        message: format!("Blocking task failed: {e}"),
    })?
}

fn bad_request(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiError::new(message))
}

/// Maps a store error to an HTTP response.
fn error_response(e: &DbError, context: &str) -> HttpResponse {
    match e {
        DbError::Aggregate(
            err @ (AggregateError::InvalidScale(_) | AggregateError::InvalidDateRange(_)),
        ) => bad_request(&err.to_string()),
        DbError::Aggregate(err @ AggregateError::EmptyDataset) => {
            HttpResponse::NotFound().json(ApiError::new(err.to_string()))
        }
        _ => {
            log::error!("{context}: {e}");
            HttpResponse::InternalServerError().json(ApiError::new(context))
        }
    }
}
