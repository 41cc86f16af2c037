//! Loading match tables into [`MatchRecord`]s.
//!
//! Accepts the cleaned contract layout (`match_date`, `home_team`,
//! `guest_team`, `score_home_team`, `score_guest_team`, `winning_team`) from
//! JSON, Parquet or the SQLite store, plus the raw scrape layout where the
//! score is a single `"2 x 1"` string.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDateTime};
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{FeatureError, FeatureResult};
use crate::match_record::{MatchRecord, Outcome, parse_kickoff, parse_score_pair};
use crate::store;

pub const REQUIRED_COLUMNS: [&str; 6] = [
    "match_date",
    "home_team",
    "guest_team",
    "score_home_team",
    "score_guest_team",
    "winning_team",
];

const RAW_COLUMNS: [&str; 4] = ["date", "home_team", "score", "guest_team"];

#[derive(Debug, Clone, PartialEq)]
pub enum DateCell {
    Missing,
    Text(String),
    Timestamp(NaiveDateTime),
}

/// One row of the input contract before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractRow {
    pub match_date: DateCell,
    pub home_team: Option<String>,
    pub guest_team: Option<String>,
    pub score_home_team: Option<i64>,
    pub score_guest_team: Option<i64>,
    pub winning_team: Option<String>,
    pub season: Option<i32>,
    pub round: Option<String>,
    pub stadium: Option<String>,
}

impl ContractRow {
    fn empty() -> Self {
        Self {
            match_date: DateCell::Missing,
            home_team: None,
            guest_team: None,
            score_home_team: None,
            score_guest_team: None,
            winning_team: None,
            season: None,
            round: None,
            stadium: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MatchTable {
    pub records: Vec<MatchRecord>,
    /// Rows whose `winning_team` disagreed with the goals.
    pub winner_mismatches: usize,
    /// Negative goal counts, treated as missing.
    pub invalid_scores: usize,
    /// Rows dropped for lacking a team name.
    pub skipped_rows: usize,
}

impl MatchTable {
    /// Validates rows into records; `match_id` is the row position.
    pub fn from_rows(rows: Vec<ContractRow>) -> Self {
        let mut table = MatchTable::default();
        for (idx, row) in rows.into_iter().enumerate() {
            if let Some(record) = table.convert_row(idx, row) {
                table.records.push(record);
            }
        }
        table
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn convert_row(&mut self, match_id: usize, row: ContractRow) -> Option<MatchRecord> {
        let (Some(home_team), Some(away_team)) = (non_empty(row.home_team), non_empty(row.guest_team))
        else {
            debug!(match_id, "row without team names skipped");
            self.skipped_rows += 1;
            return None;
        };

        let (kickoff, kickoff_raw) = match row.match_date {
            DateCell::Missing => (None, None),
            DateCell::Timestamp(dt) => (Some(dt), None),
            DateCell::Text(raw) => match parse_kickoff(&raw) {
                Some(dt) => (Some(dt), None),
                None if is_blank(&raw) => (None, None),
                None => (None, Some(raw)),
            },
        };

        let home_goals = self.goal_count(row.score_home_team);
        let away_goals = self.goal_count(row.score_guest_team);
        let result = match (home_goals, away_goals) {
            (Some(h), Some(a)) => Some(Outcome::from_goals(h, a)),
            _ => None,
        };

        if let Some(raw) = row.winning_team.as_deref().filter(|w| !is_blank(w)) {
            let declared = Outcome::parse_winning_team(raw);
            if declared != result {
                debug!(match_id, raw, ?result, "winning_team disagrees with score");
                self.winner_mismatches += 1;
            }
        }

        Some(MatchRecord {
            match_id,
            fallback_season: row.season,
            kickoff,
            kickoff_raw,
            home_team,
            away_team,
            home_goals,
            away_goals,
            result,
            round: row.round.filter(|r| !is_blank(r)),
            stadium: row.stadium.filter(|s| !is_blank(s)),
        })
    }

    fn goal_count(&mut self, raw: Option<i64>) -> Option<u32> {
        let raw = raw?;
        match u32::try_from(raw) {
            Ok(goals) => Some(goals),
            Err(_) => {
                self.invalid_scores += 1;
                None
            }
        }
    }
}

/// Loads a table by file extension: `.json`, `.parquet`, or a SQLite store
/// (`.sqlite`, `.sqlite3`, `.db`).
pub fn load_table(path: &Path) -> Result<MatchTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    let table = match ext.as_str() {
        "json" => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("read {}", path.display()))?;
            parse_json_table(&raw).with_context(|| format!("parse {}", path.display()))?
        }
        "parquet" => read_parquet_table(path)?,
        "sqlite" | "sqlite3" | "db" => {
            let conn = store::open_db(path)?;
            store::load_matches(&conn)?
        }
        other => {
            return Err(anyhow!(
                "unsupported input extension `{other}` for {}",
                path.display()
            ));
        }
    };
    info!(
        path = %path.display(),
        rows = table.len(),
        skipped = table.skipped_rows,
        "loaded match table"
    );
    Ok(table)
}

/// Parses a JSON table. Accepted layouts:
/// - an array of row objects;
/// - a document store dump `{"matches": {"1": {..}, "2": {..}}}`;
/// - raw scrape output nested as `{year: {round: [row, ..]}}`.
pub fn parse_json_table(raw: &str) -> FeatureResult<MatchTable> {
    let value: Value = serde_json::from_str(raw.trim())?;
    let objects = json_row_objects(value)?;
    let mut rows = Vec::with_capacity(objects.len());
    for (idx, (year, obj)) in objects.iter().enumerate() {
        rows.push(json_row(idx, obj, *year)?);
    }
    Ok(MatchTable::from_rows(rows))
}

fn json_row_objects(value: Value) -> FeatureResult<Vec<(Option<i32>, Map<String, Value>)>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| match item {
                Value::Object(obj) => Ok((None, obj)),
                _ => Err(FeatureError::UnsupportedLayout(format!(
                    "row {idx} is not an object"
                ))),
            })
            .collect(),
        Value::Object(mut top) => {
            if let Some(Value::Object(docs)) = top.remove("matches") {
                let mut docs: Vec<(String, Value)> = docs.into_iter().collect();
                docs.sort_by_key(|(id, _)| id.parse::<u64>().unwrap_or(u64::MAX));
                return Ok(docs
                    .into_iter()
                    .filter_map(|(_, doc)| match doc {
                        Value::Object(obj) => Some((None, obj)),
                        _ => None,
                    })
                    .collect());
            }
            let mut out = Vec::new();
            for (year_key, rounds) in top {
                let year = year_key.trim().parse::<i32>().ok();
                let Value::Object(rounds) = rounds else {
                    return Err(FeatureError::UnsupportedLayout(format!(
                        "expected rounds object under `{year_key}`"
                    )));
                };
                let mut rounds: Vec<(String, Value)> = rounds.into_iter().collect();
                rounds.sort_by_key(|(round, _)| round.trim().parse::<u64>().unwrap_or(u64::MAX));
                for (_, matches) in rounds {
                    let Value::Array(matches) = matches else {
                        continue;
                    };
                    out.extend(matches.into_iter().filter_map(|m| match m {
                        Value::Object(obj) => Some((year, obj)),
                        _ => None,
                    }));
                }
            }
            Ok(out)
        }
        _ => Err(FeatureError::UnsupportedLayout(
            "expected a JSON array or object".to_string(),
        )),
    }
}

fn json_row(idx: usize, obj: &Map<String, Value>, year: Option<i32>) -> FeatureResult<ContractRow> {
    let missing_contract = REQUIRED_COLUMNS.iter().find(|c| !obj.contains_key(**c));
    let Some(missing) = missing_contract else {
        return Ok(json_contract_row(obj, year));
    };
    if RAW_COLUMNS.iter().all(|c| obj.contains_key(*c)) {
        return Ok(json_raw_row(obj, year));
    }
    Err(FeatureError::MissingRequiredColumn {
        column: (*missing).to_string(),
        row: Some(idx),
    })
}

fn json_contract_row(obj: &Map<String, Value>, year: Option<i32>) -> ContractRow {
    let mut row = ContractRow::empty();
    row.match_date = json_date(obj.get("match_date"));
    row.home_team = obj.get("home_team").and_then(as_text);
    row.guest_team = obj.get("guest_team").and_then(as_text);
    row.score_home_team = obj.get("score_home_team").and_then(as_i64_any);
    row.score_guest_team = obj.get("score_guest_team").and_then(as_i64_any);
    row.winning_team = obj.get("winning_team").and_then(as_text);
    row.season = json_season(obj).or(year);
    row.round = obj.get("round").and_then(as_text);
    row.stadium = obj.get("stadium").and_then(as_text);
    row
}

fn json_raw_row(obj: &Map<String, Value>, year: Option<i32>) -> ContractRow {
    let mut row = ContractRow::empty();
    row.match_date = json_date(obj.get("date"));
    row.home_team = obj.get("home_team").and_then(as_text);
    row.guest_team = obj.get("guest_team").and_then(as_text);
    if let Some((home, away)) = obj
        .get("score")
        .and_then(|v| v.as_str())
        .and_then(parse_score_pair)
    {
        row.score_home_team = Some(i64::from(home));
        row.score_guest_team = Some(i64::from(away));
    }
    row.season = json_season(obj).or(year);
    row.round = obj.get("round").and_then(as_text);
    row.stadium = obj.get("stadium").and_then(as_text);
    row
}

fn json_season(obj: &Map<String, Value>) -> Option<i32> {
    obj.get("season")
        .or_else(|| obj.get("year"))
        .and_then(as_i64_any)
        .and_then(|v| i32::try_from(v).ok())
}

fn json_date(value: Option<&Value>) -> DateCell {
    match value {
        None | Some(Value::Null) => DateCell::Missing,
        Some(Value::String(s)) => DateCell::Text(s.clone()),
        // pandas writes datetimes to JSON as epoch milliseconds.
        Some(Value::Number(n)) => match n.as_i64() {
            Some(ms) => epoch_date(ms.div_euclid(1_000), ms.rem_euclid(1_000) * 1_000_000),
            None => DateCell::Text(n.to_string()),
        },
        Some(other) => DateCell::Text(other.to_string()),
    }
}

fn as_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn as_i64_any(v: &Value) -> Option<i64> {
    if let Some(n) = v.as_i64() {
        return Some(n);
    }
    if let Some(f) = v.as_f64() {
        return (f.is_finite() && f.fract() == 0.0).then_some(f as i64);
    }
    v.as_str()?.trim().parse::<i64>().ok()
}

/// Reads the contract columns from a Parquet file, failing fast when the
/// schema lacks one of them.
pub fn read_parquet_table(path: &Path) -> Result<MatchTable> {
    let file = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = SerializedFileReader::new(file).context("open parquet reader")?;
    let columns: Vec<String> = reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    if let Some(missing) = REQUIRED_COLUMNS
        .iter()
        .find(|required| !columns.iter().any(|c| c == *required))
    {
        return Err(FeatureError::MissingRequiredColumn {
            column: (*missing).to_string(),
            row: None,
        }
        .into());
    }

    let iter = reader.get_row_iter(None).context("iterate parquet rows")?;
    let mut rows = Vec::new();
    for (idx, row) in iter.enumerate() {
        let row = row.with_context(|| format!("decode parquet row {idx}"))?;
        let mut out = ContractRow::empty();
        for (name, field) in row.get_column_iter() {
            match name.as_str() {
                "match_date" => out.match_date = field_date(field),
                "home_team" => out.home_team = field_text(field),
                "guest_team" => out.guest_team = field_text(field),
                "score_home_team" => out.score_home_team = field_i64(field),
                "score_guest_team" => out.score_guest_team = field_i64(field),
                "winning_team" => out.winning_team = field_text(field),
                "season" | "year" => {
                    out.season = out
                        .season
                        .or_else(|| field_i64(field).and_then(|v| i32::try_from(v).ok()))
                }
                "round" => out.round = field_text(field),
                "stadium" => out.stadium = field_text(field),
                _ => {}
            }
        }
        rows.push(out);
    }
    Ok(MatchTable::from_rows(rows))
}

fn field_text(field: &Field) -> Option<String> {
    match field {
        Field::Null => None,
        Field::Str(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn field_i64(field: &Field) -> Option<i64> {
    match field {
        Field::Byte(v) => Some(i64::from(*v)),
        Field::Short(v) => Some(i64::from(*v)),
        Field::Int(v) => Some(i64::from(*v)),
        Field::Long(v) => Some(*v),
        Field::UByte(v) => Some(i64::from(*v)),
        Field::UShort(v) => Some(i64::from(*v)),
        Field::UInt(v) => Some(i64::from(*v)),
        Field::ULong(v) => i64::try_from(*v).ok(),
        Field::Float(v) => whole_number(f64::from(*v)),
        Field::Double(v) => whole_number(*v),
        Field::Str(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn whole_number(v: f64) -> Option<i64> {
    (v.is_finite() && v.fract() == 0.0).then_some(v as i64)
}

fn field_date(field: &Field) -> DateCell {
    match field {
        Field::Null => DateCell::Missing,
        Field::Str(s) => DateCell::Text(s.clone()),
        Field::TimestampMillis(ms) => {
            epoch_date(ms.div_euclid(1_000), ms.rem_euclid(1_000) * 1_000_000)
        }
        Field::TimestampMicros(us) => {
            epoch_date(us.div_euclid(1_000_000), us.rem_euclid(1_000_000) * 1_000)
        }
        Field::Date(days) => epoch_date(i64::from(*days) * 86_400, 0),
        // Nanosecond timestamps surface as plain INT64.
        Field::Long(ns) => epoch_date(ns.div_euclid(1_000_000_000), ns.rem_euclid(1_000_000_000)),
        other => DateCell::Text(other.to_string()),
    }
}

fn epoch_date(secs: i64, nanos: i64) -> DateCell {
    match u32::try_from(nanos)
        .ok()
        .and_then(|n| DateTime::from_timestamp(secs, n))
    {
        Some(dt) => DateCell::Timestamp(dt.naive_utc()),
        None => DateCell::Text(format!("{secs}.{nanos:09}")),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn is_blank(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null")
}
