use std::path::PathBuf;

use anyhow::{Context, Result};

use matchday_features::config::{self, arg_value};
use matchday_features::logging::init_tracing;
use matchday_features::store;
use matchday_features::table::load_table;

const DEFAULT_DB_PATH: &str = "data/matches.sqlite";

fn main() -> Result<()> {
    config::load_dotenv();
    init_tracing();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let input = arg_value(&args, "--input")
        .map(PathBuf::from)
        .context("usage: store_ingest --input <table> [--db <sqlite>]")?;
    let db_path = arg_value(&args, "--db")
        .or_else(|| std::env::var("APP_MATCH_DB").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

    let table = load_table(&input)?;
    let mut conn = store::open_db(&db_path)?;
    let source = input.display().to_string();
    let summary = store::upsert_matches(&mut conn, &db_path, &table.records, &source)?;

    println!("Match store ingest complete");
    println!("DB: {}", summary.db_path.display());
    println!("Run: {}", summary.run_id);
    println!(
        "Rows: seen={} inserted={} updated={} skipped={}",
        summary.rows_seen, summary.inserted, summary.updated, table.skipped_rows
    );
    println!("Matches stored: {}", summary.total_matches);
    if table.winner_mismatches > 0 || table.invalid_scores > 0 {
        println!(
            "  anomalies: winner_mismatches={} invalid_scores={}",
            table.winner_mismatches, table.invalid_scores
        );
    }

    Ok(())
}
