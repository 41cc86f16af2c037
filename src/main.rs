use std::path::PathBuf;

use anyhow::{Context, Result};

use matchday_features::config::{self, EngineConfig, arg_value};
use matchday_features::export::write_output;
use matchday_features::features::assemble_table;
use matchday_features::logging::init_tracing;
use matchday_features::output::build_output_table;
use matchday_features::table::load_table;

fn main() -> Result<()> {
    config::load_dotenv();
    init_tracing();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let input = arg_value(&args, "--input")
        .map(PathBuf::from)
        .context("usage: matchday_features --input <table> [--output <file>]")?;
    let output = arg_value(&args, "--output").map(PathBuf::from);

    let mut cfg = EngineConfig::from_env();
    cfg.apply_args(&args);

    let table = load_table(&input)?;
    let run = assemble_table(&table, &cfg);
    run.report.log();

    let report = &run.report;
    println!("Feature run complete");
    println!("Input: {}", input.display());
    println!(
        "Rows: read={} featured={} excluded={} skipped={}",
        report.rows_read,
        report.rows_featured,
        report.excluded.len(),
        report.skipped_rows
    );
    println!(
        "Kickoff: missing={} unparseable={}",
        report.missing_kickoff, report.unparseable_kickoff
    );
    println!(
        "Results: commits={} incomplete={} winner_mismatches={} invalid_scores={}",
        report.commits, report.incomplete_matches, report.winner_mismatches, report.invalid_scores
    );
    for season in &run.seasons {
        let leader = season
            .final_standings
            .rows()
            .first()
            .map(|row| format!("{} ({} pts)", row.team, row.points))
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "season {}: matches={} commits={} incomplete={} leader={}",
            season.season, season.matches, season.commits, season.incomplete, leader
        );
    }

    if let Some(output) = output {
        let out_table = build_output_table(&table.records, &run);
        let export = write_output(&output, &out_table, &run.seasons)?;
        println!(
            "Wrote {} rows x {} columns to {} ({:?})",
            export.rows,
            export.columns,
            output.display(),
            export.format
        );
    }

    Ok(())
}
