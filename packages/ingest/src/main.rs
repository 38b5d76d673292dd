#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the sale import tool.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use price_map_aggregate::Snapshot;
use price_map_aggregate_models::DateRange;
use price_map_database::{paths, sales_db};
use price_map_grid::GridConfig;

#[derive(Parser)]
#[command(name = "price_map_ingest", about = "Property sale import tool")]
struct Cli {
    /// `DuckDB` file to use (overrides `PRICE_MAP_DB`)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import sales from a CSV export
    Import {
        /// CSV file with one sale per row
        csv: PathBuf,
        /// Abort on the first malformed row instead of skipping it
        #[arg(long)]
        strict: bool,
    },
    /// Print an overview of the stored sales
    Summary {
        /// Only count sales after this date (exclusive, `YYYY-MM-DD`)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Only count sales before this date (exclusive, `YYYY-MM-DD`)
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Print per-cell statistics at a cell scale
    Grid {
        /// Cell scale, 1-20
        #[arg(long, default_value = "1")]
        scale: i64,
        /// Only count sales after this date (exclusive, `YYYY-MM-DD`)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Only count sales before this date (exclusive, `YYYY-MM-DD`)
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let db_path = cli.db.unwrap_or_else(paths::db_path);

    match cli.command {
        Commands::Import { csv, strict } => {
            let grid = GridConfig::from_env()?;
            let conn = sales_db::open(&db_path)?;
            let summary = price_map_ingest::import_csv(&conn, &csv, &grid, strict)?;
            println!(
                "Read {} rows, wrote {}, skipped {}, {} without location",
                summary.read, summary.written, summary.skipped, summary.unlocated
            );
        }
        Commands::Summary { from, to } => {
            let range = DateRange::new(from, to)?;
            print_summary(&db_path, range)?;
        }
        Commands::Grid { scale, from, to } => {
            let range = DateRange::new(from, to)?;
            let conn = sales_db::open(&db_path)?;
            let records = sales_db::load_sales(&conn)?;
            let cells = Snapshot::new(&records).grid_stats(scale, range)?;

            println!(
                "{:>8} {:>8} {:>6} {:>10} {:>10} {:>10}",
                "X", "Y", "COUNT", "AVG", "MIN", "MAX"
            );
            for cell in &cells {
                if let Some(ppa) = cell.price_per_area {
                    println!(
                        "{:>8} {:>8} {:>6} {:>10.0} {:>10.0} {:>10.0}",
                        cell.key.cell_x, cell.key.cell_y, cell.count, ppa.average, ppa.min, ppa.max
                    );
                }
            }
            println!("{} cells at scale {scale}", cells.len());
        }
    }

    Ok(())
}

fn print_summary(db_path: &Path, range: DateRange) -> Result<(), Box<dyn std::error::Error>> {
    let conn = sales_db::open(db_path)?;
    let records = sales_db::load_sales(&conn)?;
    let snapshot = Snapshot::new(&records);

    println!("Sales: {}", sales_db::sale_count(&conn)?);

    if let Some((first, last)) = sales_db::sale_date_range(&conn)? {
        println!("Sale dates: {first} to {last}");
    }

    match snapshot.bounding_box() {
        Ok(bbox) => println!(
            "Extent: {:.5},{:.5} to {:.5},{:.5}",
            bbox.min_lat, bbox.min_lng, bbox.max_lat, bbox.max_lng
        ),
        Err(e) => println!("Extent: {e}"),
    }

    println!();
    println!("{:<30} AVG PRICE/M²", "MUNICIPALITY");
    println!("{}", "-".repeat(44));
    for (municipality, average) in snapshot.average_by_municipality(range) {
        println!("{municipality:<30} {average:>12.0}");
    }

    Ok(())
}
