use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use parquet::basic::Compression;
use parquet::data_type::{BoolType, ByteArray, ByteArrayType, DoubleType, Int64Type};
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::parser::parse_message_type;
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use tracing::info;

use crate::features::SeasonSummary;
use crate::output::{ColumnValues, OutputTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Parquet,
    Xlsx,
    Json,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "parquet" => Some(OutputFormat::Parquet),
            "xlsx" => Some(OutputFormat::Xlsx),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportReport {
    pub format: OutputFormat,
    pub rows: usize,
    pub columns: usize,
    pub standings_rows: usize,
}

/// Writes the enriched table, choosing the format from the extension.
/// Only the workbook carries the final standings.
pub fn write_output(
    path: &Path,
    table: &OutputTable,
    seasons: &[SeasonSummary],
) -> Result<ExportReport> {
    let format = OutputFormat::from_path(path)
        .ok_or_else(|| anyhow!("unsupported output extension for {}", path.display()))?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let standings_rows = match format {
        OutputFormat::Parquet => {
            write_parquet(path, table)?;
            0
        }
        OutputFormat::Json => {
            write_json(path, table)?;
            0
        }
        OutputFormat::Xlsx => write_workbook(path, table, seasons)?,
    };
    info!(
        path = %path.display(),
        ?format,
        rows = table.rows,
        columns = table.columns.len(),
        "wrote feature table"
    );
    Ok(ExportReport {
        format,
        rows: table.rows,
        columns: table.columns.len(),
        standings_rows,
    })
}

/// One OPTIONAL column per output column, a single row group.
pub fn write_parquet(path: &Path, table: &OutputTable) -> Result<()> {
    let schema = Arc::new(
        parse_message_type(&parquet_message_type(table)).context("build parquet schema")?,
    );
    let props = Arc::new(
        WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build(),
    );
    let file = fs::File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer =
        SerializedFileWriter::new(file, schema, props).context("open parquet writer")?;

    let mut row_group = writer.next_row_group().context("start row group")?;
    let mut columns = table.columns.iter();
    while let Some(mut col_writer) = row_group.next_column().context("next column")? {
        let column = columns
            .next()
            .ok_or_else(|| anyhow!("parquet schema has more columns than the table"))?;
        let written = match &column.values {
            ColumnValues::Int(values) => {
                let (data, defs) = split_nulls(values, |v| *v);
                col_writer
                    .typed::<Int64Type>()
                    .write_batch(&data, Some(&defs), None)
            }
            ColumnValues::Float(values) => {
                let (data, defs) = split_nulls(values, |v| *v);
                col_writer
                    .typed::<DoubleType>()
                    .write_batch(&data, Some(&defs), None)
            }
            ColumnValues::Bool(values) => {
                let (data, defs) = split_nulls(values, |v| *v);
                col_writer
                    .typed::<BoolType>()
                    .write_batch(&data, Some(&defs), None)
            }
            ColumnValues::Text(values) => {
                let (data, defs) = split_nulls(values, |v| ByteArray::from(v.as_str()));
                col_writer
                    .typed::<ByteArrayType>()
                    .write_batch(&data, Some(&defs), None)
            }
        };
        written.with_context(|| format!("write column {}", column.name))?;
        col_writer
            .close()
            .with_context(|| format!("close column {}", column.name))?;
    }
    row_group.close().context("close row group")?;
    writer.close().context("close parquet writer")?;
    Ok(())
}

fn parquet_message_type(table: &OutputTable) -> String {
    let mut message = String::from("message match_features {\n");
    for column in &table.columns {
        let physical = match column.values {
            ColumnValues::Int(_) => "INT64",
            ColumnValues::Float(_) => "DOUBLE",
            ColumnValues::Bool(_) => "BOOLEAN",
            ColumnValues::Text(_) => "BYTE_ARRAY",
        };
        let annotation = if matches!(column.values, ColumnValues::Text(_)) {
            " (UTF8)"
        } else {
            ""
        };
        message.push_str(&format!(
            "  OPTIONAL {physical} {}{annotation};\n",
            column.name
        ));
    }
    message.push('}');
    message
}

/// Present values plus definition levels (1 present, 0 null).
fn split_nulls<T, U>(values: &[Option<T>], convert: impl Fn(&T) -> U) -> (Vec<U>, Vec<i16>) {
    let mut data = Vec::with_capacity(values.len());
    let mut defs = Vec::with_capacity(values.len());
    for value in values {
        match value {
            Some(v) => {
                data.push(convert(v));
                defs.push(1);
            }
            None => defs.push(0),
        }
    }
    (data, defs)
}

pub fn write_json(path: &Path, table: &OutputTable) -> Result<()> {
    let body = serde_json::to_string_pretty(table).context("serialize feature rows")?;
    fs::write(path, body).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// `Features` sheet plus a `Standings` sheet with every season's final
/// table. Returns the number of standings rows written.
pub fn write_workbook(
    path: &Path,
    table: &OutputTable,
    seasons: &[SeasonSummary],
) -> Result<usize> {
    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Features")?;
        write_feature_sheet(sheet, table)?;
    }
    let standings_rows;
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Standings")?;
        standings_rows = write_standings_sheet(sheet, seasons)?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    Ok(standings_rows)
}

fn write_feature_sheet(sheet: &mut Worksheet, table: &OutputTable) -> Result<()> {
    for (col_idx, column) in table.columns.iter().enumerate() {
        let col = col_idx as u16;
        sheet
            .write_string(0, col, &column.name)
            .with_context(|| format!("write header {}", column.name))?;
        for row in 0..table.rows {
            let at = row as u32 + 1;
            write_cell(sheet, at, col, &column.values, row)
                .with_context(|| format!("write cell ({at},{col})"))?;
        }
    }
    Ok(())
}

fn write_cell(
    sheet: &mut Worksheet,
    at: u32,
    col: u16,
    values: &ColumnValues,
    row: usize,
) -> Result<(), XlsxError> {
    match values {
        ColumnValues::Int(v) => {
            if let Some(x) = v[row] {
                sheet.write_number(at, col, x as f64)?;
            }
        }
        ColumnValues::Float(v) => {
            if let Some(x) = v[row] {
                sheet.write_number(at, col, x)?;
            }
        }
        ColumnValues::Bool(v) => {
            if let Some(x) = v[row] {
                sheet.write_boolean(at, col, x)?;
            }
        }
        ColumnValues::Text(v) => {
            if let Some(x) = &v[row] {
                sheet.write_string(at, col, x)?;
            }
        }
    }
    Ok(())
}

fn write_standings_sheet(sheet: &mut Worksheet, seasons: &[SeasonSummary]) -> Result<usize> {
    let header = [
        "Season", "Rank", "Team", "Played", "Points", "Wins", "Draws", "Losses", "Goals For",
        "Goals Against", "Goal Difference",
    ];
    for (col, name) in header.iter().enumerate() {
        sheet.write_string(0, col as u16, *name)?;
    }
    let mut at = 1u32;
    for summary in seasons {
        for row in summary.final_standings.rows() {
            let numbers = [
                f64::from(summary.season),
                f64::from(row.rank),
            ];
            for (col, value) in numbers.iter().enumerate() {
                sheet.write_number(at, col as u16, *value)?;
            }
            sheet.write_string(at, 2, &row.team)?;
            let tail = [
                f64::from(row.played()),
                f64::from(row.points),
                f64::from(row.wins),
                f64::from(row.draws),
                f64::from(row.losses),
                f64::from(row.goals_for),
                f64::from(row.goals_against),
                row.goal_difference as f64,
            ];
            for (offset, value) in tail.iter().enumerate() {
                sheet
                    .write_number(at, 3 + offset as u16, *value)
                    .with_context(|| format!("write standings row {at}"))?;
            }
            at += 1;
        }
    }
    Ok(at as usize - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Column;

    #[test]
    fn format_follows_extension() {
        assert_eq!(
            OutputFormat::from_path(Path::new("out/features.PARQUET")),
            Some(OutputFormat::Parquet)
        );
        assert_eq!(
            OutputFormat::from_path(Path::new("features.xlsx")),
            Some(OutputFormat::Xlsx)
        );
        assert_eq!(OutputFormat::from_path(Path::new("features.csv")), None);
    }

    #[test]
    fn message_type_marks_every_column_optional() {
        let table = OutputTable {
            columns: vec![
                Column {
                    name: "home_team".to_string(),
                    values: ColumnValues::Text(vec![Some("A".to_string())]),
                },
                Column {
                    name: "position_difference".to_string(),
                    values: ColumnValues::Int(vec![None]),
                },
            ],
            rows: 1,
        };
        let message = parquet_message_type(&table);
        assert!(message.contains("OPTIONAL BYTE_ARRAY home_team (UTF8);"));
        assert!(message.contains("OPTIONAL INT64 position_difference;"));
        assert!(parse_message_type(&message).is_ok());
    }

    #[test]
    fn nulls_become_definition_levels() {
        let (data, defs) = split_nulls(&[Some(3i64), None, Some(-1)], |v| *v);
        assert_eq!(data, vec![3, -1]);
        assert_eq!(defs, vec![1, 0, 1]);
    }
}
