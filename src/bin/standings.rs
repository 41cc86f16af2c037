use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDateTime;

use matchday_features::config::{self, EngineConfig, arg_value};
use matchday_features::features::standings_before;
use matchday_features::logging::init_tracing;
use matchday_features::match_record::{MatchRecord, parse_kickoff};
use matchday_features::season::SeasonKey;
use matchday_features::table::load_table;

fn main() -> Result<()> {
    config::load_dotenv();
    init_tracing();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let input = arg_value(&args, "--input")
        .map(PathBuf::from)
        .context("usage: standings --input <table> [--season <year>] [--until <date>]")?;
    let until = match arg_value(&args, "--until") {
        Some(raw) => Some(parse_kickoff(&raw).ok_or_else(|| anyhow!("unparseable --until {raw}"))?),
        None => None,
    };

    let mut cfg = EngineConfig::from_env();
    cfg.apply_args(&args);
    let key = cfg.season_key();

    let table = load_table(&input)?;
    let season = match arg_value(&args, "--season") {
        Some(raw) => raw
            .parse::<i32>()
            .with_context(|| format!("invalid --season {raw}"))?,
        None => latest_season(&table.records, &key, until)
            .ok_or_else(|| anyhow!("no dated matches in {}", input.display()))?,
    };

    let standings = standings_before(&table.records, &key, season, until);
    match until {
        Some(cutoff) => println!("Season {season} standings before {cutoff}"),
        None => println!("Season {season} standings"),
    }
    println!(
        "{:>4}  {:<28} {:>3} {:>3} {:>3} {:>3} {:>4} {:>4} {:>5} {:>4}",
        "#", "Team", "P", "W", "D", "L", "GF", "GA", "GD", "Pts"
    );
    for row in standings.rows() {
        println!(
            "{:>4}  {:<28} {:>3} {:>3} {:>3} {:>3} {:>4} {:>4} {:>+5} {:>4}",
            row.rank,
            row.team,
            row.played(),
            row.wins,
            row.draws,
            row.losses,
            row.goals_for,
            row.goals_against,
            row.goal_difference,
            row.points
        );
    }
    if standings.is_empty() {
        println!("(no completed matches)");
    }
    Ok(())
}

/// Season of the latest dated match, optionally before `until`.
fn latest_season(
    records: &[MatchRecord],
    key: &dyn SeasonKey,
    until: Option<NaiveDateTime>,
) -> Option<i32> {
    records
        .iter()
        .filter_map(|r| r.kickoff)
        .filter(|k| until.is_none_or(|u| *k < u))
        .max()
        .map(|k| key.season_of(k))
}
