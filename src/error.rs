use thiserror::Error;

/// Structural failures that abort a feature run.
///
/// Per-match anomalies (missing or unparseable kickoff, incomplete scores,
/// inconsistent `winning_team`) never surface here: they are handled in place
/// and counted in the run report.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("input table is missing required column `{column}`{}", at_row(.row))]
    MissingRequiredColumn { column: String, row: Option<usize> },

    #[error("unsupported table layout: {0}")]
    UnsupportedLayout(String),

    #[error("invalid json input: {0}")]
    Json(#[from] serde_json::Error),
}

fn at_row(row: &Option<usize>) -> String {
    row.map(|r| format!(" (row {r})")).unwrap_or_default()
}

pub type FeatureResult<T> = std::result::Result<T, FeatureError>;
