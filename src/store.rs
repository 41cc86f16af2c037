//! SQLite match store.
//!
//! Matches are keyed by kickoff and team pair, so re-ingesting an updated
//! export refreshes scores instead of duplicating fixtures. Load order is
//! first-ingest order.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, params};
use tracing::info;

use crate::match_record::MatchRecord;
use crate::table::{ContractRow, DateCell, MatchTable};

#[derive(Debug, Clone)]
pub struct StoreIngestSummary {
    pub db_path: PathBuf,
    pub run_id: i64,
    pub rows_seen: usize,
    pub inserted: usize,
    pub updated: usize,
    pub total_matches: usize,
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS matches (
            match_key TEXT PRIMARY KEY,
            match_date TEXT NULL,
            season INTEGER NULL,
            round TEXT NULL,
            stadium TEXT NULL,
            home_team TEXT NOT NULL,
            guest_team TEXT NOT NULL,
            score_home_team INTEGER NULL,
            score_guest_team INTEGER NULL,
            winning_team TEXT NULL,
            source TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_matches_date ON matches(match_date);
        CREATE INDEX IF NOT EXISTS idx_matches_season ON matches(season);

        CREATE TABLE IF NOT EXISTS ingest_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            finished_at TEXT NULL,
            source TEXT NOT NULL,
            rows_seen INTEGER NOT NULL,
            inserted INTEGER NOT NULL,
            updated INTEGER NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

/// Natural key of a fixture. Undated fixtures fall back to season and round.
pub fn match_key(record: &MatchRecord) -> String {
    let when = record.kickoff_text().unwrap_or_else(|| {
        format!(
            "season={}/round={}",
            record
                .fallback_season
                .map(|s| s.to_string())
                .unwrap_or_default(),
            record.round.as_deref().unwrap_or_default()
        )
    });
    format!("{when}|{}|{}", record.home_team, record.away_team)
}

pub fn upsert_matches(
    conn: &mut Connection,
    db_path: &Path,
    records: &[MatchRecord],
    source: &str,
) -> Result<StoreIngestSummary> {
    let started_at = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO ingest_runs(started_at, finished_at, source, rows_seen, inserted, updated)
         VALUES (?1, NULL, ?2, ?3, 0, 0)",
        params![started_at, source, records.len() as i64],
    )
    .context("insert ingest run")?;
    let run_id = conn.last_insert_rowid();

    let before = count_matches(conn)?;
    let tx = conn.transaction().context("begin ingest transaction")?;
    for record in records {
        upsert_match(&tx, record, source)?;
    }
    tx.commit().context("commit ingest transaction")?;
    let total_matches = count_matches(conn)?;

    let inserted = total_matches.saturating_sub(before);
    let updated = records.len().saturating_sub(inserted);
    conn.execute(
        "UPDATE ingest_runs SET finished_at = ?1, inserted = ?2, updated = ?3 WHERE run_id = ?4",
        params![
            Utc::now().to_rfc3339(),
            inserted as i64,
            updated as i64,
            run_id
        ],
    )
    .context("update ingest run")?;

    info!(run_id, inserted, updated, total_matches, "store ingest finished");
    Ok(StoreIngestSummary {
        db_path: db_path.to_path_buf(),
        run_id,
        rows_seen: records.len(),
        inserted,
        updated,
        total_matches,
    })
}

fn upsert_match(tx: &rusqlite::Transaction<'_>, record: &MatchRecord, source: &str) -> Result<()> {
    tx.execute(
        r#"
        INSERT INTO matches (
            match_key, match_date, season, round, stadium,
            home_team, guest_team, score_home_team, score_guest_team,
            winning_team, source, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        ON CONFLICT(match_key) DO UPDATE SET
            match_date = excluded.match_date,
            season = excluded.season,
            round = excluded.round,
            stadium = excluded.stadium,
            score_home_team = excluded.score_home_team,
            score_guest_team = excluded.score_guest_team,
            winning_team = excluded.winning_team,
            source = excluded.source,
            updated_at = excluded.updated_at
        "#,
        params![
            match_key(record),
            record.kickoff_text(),
            record.fallback_season,
            record.round,
            record.stadium,
            record.home_team,
            record.away_team,
            record.home_goals,
            record.away_goals,
            record.result.map(|r| r.as_winning_team()),
            source,
            Utc::now().to_rfc3339(),
        ],
    )
    .with_context(|| format!("upsert match {}", match_key(record)))?;
    Ok(())
}

fn count_matches(conn: &Connection) -> Result<usize> {
    let n = conn
        .query_row("SELECT COUNT(*) FROM matches", [], |row| row.get::<_, i64>(0))
        .context("count matches")?;
    Ok(usize::try_from(n).unwrap_or_default())
}

/// Loads every stored match as a table, in first-ingest order.
pub fn load_matches(conn: &Connection) -> Result<MatchTable> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT match_date, home_team, guest_team, score_home_team, score_guest_team,
                   winning_team, season, round, stadium
            FROM matches
            ORDER BY rowid ASC
            "#,
        )
        .context("prepare load matches query")?;

    let rows = stmt
        .query_map([], |row| {
            Ok(ContractRow {
                match_date: row
                    .get::<_, Option<String>>(0)?
                    .map_or(DateCell::Missing, DateCell::Text),
                home_team: row.get(1)?,
                guest_team: row.get(2)?,
                score_home_team: row.get(3)?,
                score_guest_team: row.get(4)?,
                winning_team: row.get(5)?,
                season: row.get(6)?,
                round: row.get(7)?,
                stadium: row.get(8)?,
            })
        })
        .context("query load matches")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode match row")?);
    }
    Ok(MatchTable::from_rows(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn undated_key_uses_season_and_round() {
        let mut record = MatchRecord::scheduled(0, None, "A", "B");
        record.fallback_season = Some(2024);
        record.round = Some("Rodada 3".to_string());
        assert_eq!(match_key(&record), "season=2024/round=Rodada 3|A|B");

        let kickoff = NaiveDate::from_ymd_opt(2024, 4, 13)
            .unwrap()
            .and_hms_opt(18, 30, 0)
            .unwrap();
        let played = MatchRecord::played(1, kickoff, "A", "B", 1, 0);
        assert_eq!(match_key(&played), "2024-04-13T18:30:00|A|B");
    }
}
