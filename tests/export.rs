use std::fs;
use std::path::PathBuf;

use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field;

use matchday_features::config::EngineConfig;
use matchday_features::export::{OutputFormat, write_output};
use matchday_features::features::assemble_table;
use matchday_features::output::build_output_table;
use matchday_features::table::{MatchTable, load_table, read_parquet_table};

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("matchday_features_export_{}", std::process::id()));
    fs::create_dir_all(&dir).expect("scratch dir");
    let path = dir.join(name);
    let _ = fs::remove_file(&path);
    path
}

fn contract_table() -> MatchTable {
    load_table(&fixture_path("contract_matches.json")).expect("fixture should load")
}

#[test]
fn parquet_output_reads_back_as_input() {
    let table = contract_table();
    let cfg = EngineConfig::default();
    let run = assemble_table(&table, &cfg);
    let output = build_output_table(&table.records, &run);
    let path = scratch("features.parquet");

    let report = write_output(&path, &output, &run.seasons).expect("write parquet");
    assert_eq!(report.format, OutputFormat::Parquet);
    assert_eq!(report.rows, 8);

    let reader = SerializedFileReader::new(fs::File::open(&path).expect("open")).expect("reader");
    assert_eq!(reader.metadata().file_metadata().num_rows(), 8);
    let mut positions = Vec::new();
    for row in reader.get_row_iter(None).expect("rows") {
        let row = row.expect("decode row");
        for (name, field) in row.get_column_iter() {
            if name == "home_team_current_position" {
                positions.push(match field {
                    Field::Long(v) => Some(*v),
                    Field::Null => None,
                    other => panic!("unexpected position field {other:?}"),
                });
            }
        }
    }
    assert_eq!(
        positions,
        vec![None, Some(2), Some(2), None, None, None, Some(4), None]
    );

    // The contract columns survive, so the file is itself a valid input.
    let reread = read_parquet_table(&path).expect("reread parquet");
    assert_eq!(reread.len(), 8);
    let rerun = assemble_table(&reread, &cfg);
    assert_eq!(rerun.report.commits, run.report.commits);
    assert_eq!(rerun.report.incomplete_matches, run.report.incomplete_matches);
}

#[test]
fn workbook_carries_final_standings() {
    let table = contract_table();
    let run = assemble_table(&table, &EngineConfig::default());
    let output = build_output_table(&table.records, &run);
    let path = scratch("features.xlsx");

    let report = write_output(&path, &output, &run.seasons).expect("write workbook");
    assert_eq!(report.format, OutputFormat::Xlsx);
    // Three teams in 2023, four in 2024.
    assert_eq!(report.standings_rows, 7);
    assert!(fs::metadata(&path).expect("workbook exists").len() > 0);
}

#[test]
fn json_output_has_nullable_columns() {
    let table = contract_table();
    let run = assemble_table(&table, &EngineConfig::default());
    let output = build_output_table(&table.records, &run);
    let path = scratch("features.json");

    write_output(&path, &output, &run.seasons).expect("write json");
    let raw = fs::read_to_string(&path).expect("read json");
    let rows: Vec<serde_json::Value> = serde_json::from_str(&raw).expect("valid json");
    assert_eq!(rows.len(), 8);
    assert!(rows[0]["position_difference"].is_null());
    assert_eq!(rows[0]["season"], 2023);
    assert_eq!(rows[0]["match_period"], "afternoon");
    assert_eq!(rows[2]["home_team_points"], 1);
    assert_eq!(rows[2]["position_difference"], 1);
    // The undated fixture has no calendar columns.
    assert!(rows[6]["day_of_week"].is_null());
    assert_eq!(rows[7]["winning_team"], "guest");
}

#[test]
fn unsupported_output_is_rejected() {
    let table = contract_table();
    let run = assemble_table(&table, &EngineConfig::default());
    let output = build_output_table(&table.records, &run);
    let err = write_output(&scratch("features.csv"), &output, &run.seasons).expect_err("csv");
    assert!(err.to_string().contains("unsupported output extension"));
}
