// Output files: joined and unmatched CSVs per job, plus a JSON run summary.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use rosterlink_core::{Reconciliation, MISSING_SENTINEL};
use serde::{Deserialize, Serialize};

pub const SCRAPED_NAME_COLUMN: &str = "Scraped Name";
pub const SCORE_COLUMN: &str = "Score";
pub const BEST_SCORE_COLUMN: &str = "Best Score";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error writing {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("failed to serialize summary to {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub name: String,
    pub threshold: u8,
    pub roster_players: usize,
    pub key_collisions: usize,
    pub pages_loaded: usize,
    pub pages_failed: usize,
    pub scraped: usize,
    pub matched: usize,
    pub unmatched: usize,
    /// Canonical players matched by more than one scraped record.
    pub repeat_matches: usize,
    pub by_position: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_at: String,
    pub jobs: Vec<JobSummary>,
}

// ---------------------------------------------------------------------------
// Layout of the CSV outputs
// ---------------------------------------------------------------------------

/// Column names a job's outputs are written with.
#[derive(Debug, Clone)]
pub struct OutputColumns<'a> {
    pub name_column: &'a str,
    pub attribute_columns: &'a [String],
    pub value_columns: &'a [String],
}

fn format_amount(amount: Option<f64>) -> String {
    match amount {
        Some(v) => v.to_string(),
        None => MISSING_SENTINEL.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Writer-based functions (private, enable testing without temp files)
// ---------------------------------------------------------------------------

fn write_joined_to<W: Write>(
    w: W,
    result: &Reconciliation,
    columns: &OutputColumns<'_>,
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(w);

    let mut header: Vec<&str> = vec![columns.name_column];
    header.extend(columns.attribute_columns.iter().map(String::as_str));
    header.push(SCRAPED_NAME_COLUMN);
    header.push(SCORE_COLUMN);
    header.extend(columns.value_columns.iter().map(String::as_str));
    writer.write_record(&header)?;

    for row in &result.joined {
        let mut record: Vec<String> = vec![row.player.name.clone()];
        for column in columns.attribute_columns {
            record.push(row.player.attribute(column).unwrap_or("").to_string());
        }
        record.push(row.scraped_name.clone());
        record.push(row.score.to_string());
        for column in columns.value_columns {
            record.push(format_amount(row.value(column)));
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_unmatched_to<W: Write>(
    w: W,
    result: &Reconciliation,
    columns: &OutputColumns<'_>,
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(w);

    let mut header: Vec<&str> = vec![SCRAPED_NAME_COLUMN];
    header.extend(columns.value_columns.iter().map(String::as_str));
    header.push(BEST_SCORE_COLUMN);
    writer.write_record(&header)?;

    for miss in &result.unmatched {
        let mut record: Vec<String> = vec![miss.record.name.clone()];
        for column in columns.value_columns {
            let raw = miss
                .record
                .values
                .iter()
                .find(|v| &v.column == column)
                .map(|v| v.raw.as_str())
                .unwrap_or(MISSING_SENTINEL);
            record.push(raw.to_string());
        }
        record.push(
            miss.best_score
                .map(|s| s.to_string())
                .unwrap_or_else(|| MISSING_SENTINEL.to_string()),
        );
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Public path-based writers
// ---------------------------------------------------------------------------

fn create(path: &Path) -> Result<std::fs::File, OutputError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| OutputError::Io {
            path: parent.display().to_string(),
            source: e,
        })?;
    }
    std::fs::File::create(path).map_err(|e| OutputError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

/// Write joined rows: canonical name and attributes, then the scraped name
/// and score, then each value column as a parsed amount.
pub fn write_joined(
    path: &Path,
    result: &Reconciliation,
    columns: &OutputColumns<'_>,
) -> Result<(), OutputError> {
    let file = create(path)?;
    write_joined_to(file, result, columns).map_err(|e| OutputError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

/// Write unmatched records with their raw values and best score.
pub fn write_unmatched(
    path: &Path,
    result: &Reconciliation,
    columns: &OutputColumns<'_>,
) -> Result<(), OutputError> {
    let file = create(path)?;
    write_unmatched_to(file, result, columns).map_err(|e| OutputError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

pub fn write_summary(path: &Path, summary: &RunSummary) -> Result<(), OutputError> {
    let mut file = create(path)?;
    let json = serde_json::to_string_pretty(summary).map_err(|e| OutputError::Json {
        path: path.display().to_string(),
        source: e,
    })?;
    file.write_all(json.as_bytes()).map_err(|e| OutputError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
