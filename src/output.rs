//! Column-oriented view of a feature run, shared by every exporter.

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::features::{FeatureRow, FeatureRun, SideFeatures};
use crate::match_record::MatchRecord;

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
    Bool(Vec<Option<bool>>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Int(v) => v.len(),
            ColumnValues::Float(v) => v.len(),
            ColumnValues::Text(v) => v.len(),
            ColumnValues::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: ColumnValues,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputTable {
    pub columns: Vec<Column>,
    pub rows: usize,
}

impl OutputTable {
    pub fn column(&self, name: &str) -> Option<&ColumnValues> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.values)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    fn push(&mut self, name: impl Into<String>, values: ColumnValues) {
        debug_assert_eq!(values.len(), self.rows);
        self.columns.push(Column {
            name: name.into(),
            values,
        });
    }
}

/// Serializes as an array of row objects keyed by column name.
impl Serialize for OutputTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows))?;
        for row in 0..self.rows {
            seq.serialize_element(&RowView { table: self, row })?;
        }
        seq.end()
    }
}

struct RowView<'a> {
    table: &'a OutputTable,
    row: usize,
}

impl Serialize for RowView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.table.columns.len()))?;
        for column in &self.table.columns {
            let row = self.row;
            match &column.values {
                ColumnValues::Int(v) => map.serialize_entry(&column.name, &v[row])?,
                ColumnValues::Float(v) => map.serialize_entry(&column.name, &v[row])?,
                ColumnValues::Text(v) => map.serialize_entry(&column.name, &v[row])?,
                ColumnValues::Bool(v) => map.serialize_entry(&column.name, &v[row])?,
            }
        }
        map.end()
    }
}

/// Builds the enriched table: contract columns, season, calendar columns,
/// per-side features, then home-minus-guest differences.
pub fn build_output_table(records: &[MatchRecord], run: &FeatureRun) -> OutputTable {
    let rows: Vec<(&MatchRecord, &FeatureRow)> = run
        .rows
        .iter()
        .map(|row| (&records[row.record_pos], row))
        .collect();
    let mut out = OutputTable {
        columns: Vec::new(),
        rows: rows.len(),
    };

    let text = |f: &dyn Fn(&MatchRecord) -> Option<String>| {
        ColumnValues::Text(rows.iter().map(|(rec, _)| f(rec)).collect())
    };
    out.push("match_date", text(&|r| r.kickoff_text()));
    out.push("home_team", text(&|r| Some(r.home_team.clone())));
    out.push("guest_team", text(&|r| Some(r.away_team.clone())));
    out.push(
        "score_home_team",
        ColumnValues::Int(rows.iter().map(|(r, _)| r.home_goals.map(i64::from)).collect()),
    );
    out.push(
        "score_guest_team",
        ColumnValues::Int(rows.iter().map(|(r, _)| r.away_goals.map(i64::from)).collect()),
    );
    out.push(
        "winning_team",
        text(&|r| r.result.map(|o| o.as_winning_team().to_string())),
    );
    out.push("round", text(&|r| r.round.clone()));
    out.push("stadium", text(&|r| r.stadium.clone()));
    out.push(
        "season",
        ColumnValues::Int(rows.iter().map(|(_, f)| Some(i64::from(f.season))).collect()),
    );
    out.push(
        "is_weekend",
        ColumnValues::Bool(
            rows.iter()
                .map(|(_, f)| f.calendar.map(|c| c.is_weekend))
                .collect(),
        ),
    );
    out.push(
        "match_period",
        ColumnValues::Text(
            rows.iter()
                .map(|(_, f)| f.calendar.map(|c| c.period.as_str().to_string()))
                .collect(),
        ),
    );
    out.push(
        "day_of_week",
        ColumnValues::Text(
            rows.iter()
                .map(|(_, f)| f.calendar.map(|c| c.day_of_week().to_string()))
                .collect(),
        ),
    );

    let n = run.form_window;
    let homes: Vec<SideFeatures> = rows.iter().map(|(_, f)| f.home).collect();
    push_side(&mut out, "home_team", n, &homes);
    let guests: Vec<SideFeatures> = rows.iter().map(|(_, f)| f.guest).collect();
    push_side(&mut out, "guest_team", n, &guests);

    let int = |f: &dyn Fn(&FeatureRow) -> i64| {
        ColumnValues::Int(rows.iter().map(|(_, row)| Some(f(row))).collect())
    };
    let float = |f: &dyn Fn(&FeatureRow) -> f64| {
        ColumnValues::Float(rows.iter().map(|(_, row)| Some(f(row))).collect())
    };
    out.push(
        "position_difference",
        ColumnValues::Int(rows.iter().map(|(_, f)| f.diff.position).collect()),
    );
    out.push(
        format!("goal_difference_last_{n}_difference"),
        int(&|f| f.diff.goal_difference_last_n),
    );
    out.push("goal_scored_difference", int(&|f| f.diff.goals_scored));
    out.push("goal_conceded_difference", int(&|f| f.diff.goals_conceded));
    out.push("goal_difference_difference", int(&|f| f.diff.goal_difference));
    out.push("points_difference", int(&|f| f.diff.points));
    out.push("wins_difference", int(&|f| f.diff.wins));
    out.push("draws_difference", int(&|f| f.diff.draws));
    out.push("losses_difference", int(&|f| f.diff.losses));
    out.push("wins_pct_difference", float(&|f| f.diff.wins_pct));
    out.push("draws_pct_difference", float(&|f| f.diff.draws_pct));
    out.push("losses_pct_difference", float(&|f| f.diff.losses_pct));
    out
}

fn push_side(out: &mut OutputTable, prefix: &str, n: usize, sides: &[SideFeatures]) {
    let int = |f: &dyn Fn(&SideFeatures) -> i64| {
        ColumnValues::Int(sides.iter().map(|s| Some(f(s))).collect())
    };
    let float = |f: &dyn Fn(&SideFeatures) -> f64| {
        ColumnValues::Float(sides.iter().map(|s| Some(f(s))).collect())
    };

    out.push(format!("{prefix}_wins_last_{n}"), int(&|s| s.form.wins.into()));
    out.push(format!("{prefix}_draws_last_{n}"), int(&|s| s.form.draws.into()));
    out.push(format!("{prefix}_loses_last_{n}"), int(&|s| s.form.losses.into()));
    out.push(
        format!("{prefix}_goals_scored_last_{n}"),
        int(&|s| s.form.goals_scored.into()),
    );
    out.push(
        format!("{prefix}_goals_conceded_last_{n}"),
        int(&|s| s.form.goals_conceded.into()),
    );
    out.push(
        format!("{prefix}_goal_difference_last_{n}"),
        int(&|s| s.form.goal_difference()),
    );
    out.push(
        format!("{prefix}_current_position"),
        ColumnValues::Int(sides.iter().map(|s| s.position.map(i64::from)).collect()),
    );
    out.push(format!("{prefix}_points"), int(&|s| s.season.points.into()));
    out.push(format!("{prefix}_goals_scored"), int(&|s| s.season.goals_for.into()));
    out.push(
        format!("{prefix}_goals_conceded"),
        int(&|s| s.season.goals_against.into()),
    );
    out.push(
        format!("{prefix}_goal_difference"),
        int(&|s| s.season.goal_difference()),
    );
    out.push(format!("{prefix}_wins_so_far"), int(&|s| s.season.wins.into()));
    out.push(format!("{prefix}_draws_so_far"), int(&|s| s.season.draws.into()));
    out.push(format!("{prefix}_losses_so_far"), int(&|s| s.season.losses.into()));
    out.push(format!("{prefix}_wins_pct_so_far"), float(&|s| s.season.wins_pct()));
    out.push(format!("{prefix}_draws_pct_so_far"), float(&|s| s.season.draws_pct()));
    out.push(
        format!("{prefix}_losses_pct_so_far"),
        float(&|s| s.season.losses_pct()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::features::assemble;
    use chrono::NaiveDate;

    #[test]
    fn column_names_track_the_window() {
        let kickoff = NaiveDate::from_ymd_opt(2024, 4, 13)
            .unwrap()
            .and_hms_opt(18, 30, 0)
            .unwrap();
        let records = vec![MatchRecord::played(0, kickoff, "A", "B", 1, 0)];
        let cfg = EngineConfig {
            form_window: 3,
            ..EngineConfig::default()
        };
        let run = assemble(&records, &cfg);
        let table = build_output_table(&records, &run);
        let names = table.column_names();
        assert!(names.contains(&"home_team_wins_last_3"));
        assert!(names.contains(&"guest_team_loses_last_3"));
        assert!(names.contains(&"goal_difference_last_3_difference"));
        assert!(!names.iter().any(|n| n.contains("last_5")));
        assert_eq!(table.rows, 1);
        assert_eq!(
            table.column("home_team_current_position"),
            Some(&ColumnValues::Int(vec![None]))
        );
        assert_eq!(
            table.column("day_of_week"),
            Some(&ColumnValues::Text(vec![Some("Saturday".to_string())]))
        );
        assert_eq!(
            table.column("winning_team"),
            Some(&ColumnValues::Text(vec![Some("home".to_string())]))
        );
    }

    #[test]
    fn serializes_rows_in_column_order() {
        let table = OutputTable {
            columns: vec![
                Column {
                    name: "home_team".to_string(),
                    values: ColumnValues::Text(vec![Some("A".to_string()), Some("B".to_string())]),
                },
                Column {
                    name: "position_difference".to_string(),
                    values: ColumnValues::Int(vec![None, Some(-2)]),
                },
                Column {
                    name: "wins_pct_difference".to_string(),
                    values: ColumnValues::Float(vec![Some(0.5), Some(0.0)]),
                },
                Column {
                    name: "is_weekend".to_string(),
                    values: ColumnValues::Bool(vec![Some(true), None]),
                },
            ],
            rows: 2,
        };
        let rows = serde_json::to_value(&table).unwrap();
        assert_eq!(
            rows,
            serde_json::json!([
                {"home_team": "A", "position_difference": null, "wins_pct_difference": 0.5, "is_weekend": true},
                {"home_team": "B", "position_difference": -2, "wins_pct_difference": 0.0, "is_weekend": null},
            ])
        );
    }
}
