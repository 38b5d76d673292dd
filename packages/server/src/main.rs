#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Price map API server binary.
//!
//! Reads its settings from `PRICE_MAP_DB`, `PRICE_MAP_DB_POOL_SIZE`,
//! `PRICE_MAP_GRID_CONFIG`, `BIND_ADDR`, and `PORT`.

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    price_map_server::run_server().await
}
