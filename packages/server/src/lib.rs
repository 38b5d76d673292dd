#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the price map.
//!
//! Serves municipality averages, the dataset extent and outline, and
//! per-cell statistics at a requested cell scale from a read-only `DuckDB`
//! sale store. Every request recomputes its result from the store.

mod handlers;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use price_map_database::{DbError, paths, sales_db};
use price_map_grid::GridConfig;

/// Environment variable with the number of pooled read connections.
pub const POOL_SIZE_ENV: &str = "PRICE_MAP_DB_POOL_SIZE";

/// Pool size used when [`POOL_SIZE_ENV`] is unset or invalid.
pub const DEFAULT_POOL_SIZE: usize = 4;

/// Simple round-robin pool of read-only `DuckDB` connections.
///
/// `duckdb::Connection` is `Send` but not `Sync`, so each connection is
/// wrapped in a `Mutex`. The pool hands out connections round-robin via
/// an atomic counter, allowing concurrent queries on different
/// connections.
pub struct DuckDbPool {
    connections: Vec<Mutex<duckdb::Connection>>,
    next: AtomicUsize,
}

impl DuckDbPool {
    /// Opens `size` read-only connections (at least one) to the sale store
    /// at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if any connection fails to open.
    pub fn open(path: &Path, size: usize) -> Result<Self, DbError> {
        let connections = (0..size.max(1))
            .map(|_| sales_db::open_read_only(path).map(Mutex::new))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            connections,
            next: AtomicUsize::new(0),
        })
    }

    /// Acquires the next connection from the pool (round-robin).
    ///
    /// Connections are only read through, so a connection whose previous
    /// holder panicked is still handed out.
    pub fn acquire(&self) -> MutexGuard<'_, duckdb::Connection> {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.connections.len();
        self.connections[idx]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Shared application state.
pub struct AppState {
    /// Pool of read-only connections to the sale store.
    pub pool: Arc<DuckDbPool>,
    /// Grid used to turn cell keys back into rectangles.
    pub grid: GridConfig,
}

/// Server settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Sale store location.
    pub db_path: PathBuf,
    /// Interface to bind.
    pub bind_addr: String,
    /// Port to bind.
    pub port: u16,
    /// Number of pooled read connections.
    pub pool_size: usize,
}

impl ServerConfig {
    /// Reads `PRICE_MAP_DB`, `BIND_ADDR`, `PORT`, and
    /// `PRICE_MAP_DB_POOL_SIZE`, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let pool_size = std::env::var(POOL_SIZE_ENV)
            .ok()
            .and_then(|p| p.parse().ok())
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_POOL_SIZE);

        Self {
            db_path: paths::db_path(),
            bind_addr,
            port,
            pool_size,
        }
    }
}

/// Registers the API routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .service(
                web::scope("/PropertyListing")
                    .route(
                        "/AvgSqmPriceByMunicipality",
                        web::get().to(handlers::avg_sqm_price_by_municipality),
                    )
                    .route("/BoundingBox", web::get().to(handlers::bounding_box))
                    .route("/Polygon", web::get().to(handlers::polygon))
                    .route("/GridSqmPrices", web::post().to(handlers::grid_sqm_prices))
                    .route("/GridCells", web::get().to(handlers::grid_cells)),
            ),
    );
}

/// Starts the price map API server.
///
/// Creates the sale store if it does not exist yet, opens the read pool,
/// and starts the Actix-Web HTTP server. This is a regular async function;
/// the caller is responsible for providing the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the store cannot be opened, the
/// grid config cannot be loaded, or the HTTP server fails to bind or
/// encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = ServerConfig::from_env();
    let grid = GridConfig::from_env().map_err(std::io::Error::other)?;

    if !config.db_path.exists() {
        log::info!("Creating empty sale store at {}", config.db_path.display());
        drop(sales_db::open(&config.db_path).map_err(std::io::Error::other)?);
    }

    log::info!(
        "Opening {} read connection(s) to {}...",
        config.pool_size,
        config.db_path.display()
    );
    let pool = DuckDbPool::open(&config.db_path, config.pool_size).map_err(std::io::Error::other)?;

    let state = web::Data::new(AppState {
        pool: Arc::new(pool),
        grid,
    });

    let ServerConfig {
        bind_addr, port, ..
    } = config;

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
