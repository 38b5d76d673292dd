//! Location of the sale store on disk.

use std::path::{Path, PathBuf};

/// Environment variable naming the `DuckDB` file.
pub const DB_PATH_ENV: &str = "PRICE_MAP_DB";

/// Store location used when [`DB_PATH_ENV`] is unset.
pub const DEFAULT_DB_PATH: &str = "data/price_map.duckdb";

/// Returns the configured store path.
///
/// Reads [`DB_PATH_ENV`], falling back to [`DEFAULT_DB_PATH`] relative to
/// the working directory.
#[must_use]
pub fn db_path() -> PathBuf {
    std::env::var(DB_PATH_ENV)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_DB_PATH), PathBuf::from)
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.as_os_str().is_empty() && !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
