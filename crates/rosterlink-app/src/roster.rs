// Canonical roster loading.
//
// Reads a roster CSV (one row per player, header row required). The name
// column is the join key; every other column is carried through as an
// attribute in header order.

use crate::config::RosterConfig;
use rosterlink_core::{CanonicalPlayer, MISSING_SENTINEL};
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Roster {
    /// Attribute column names, in file order, excluding the name column.
    pub attribute_columns: Vec<String>,
    pub players: Vec<CanonicalPlayer>,
    /// Rows dropped by the minutes filter.
    pub filtered_out: usize,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("column '{column}' not found in {path}")]
    MissingColumn { path: String, column: String },

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn clean_cell(cell: &str) -> String {
    let cell = cell.trim();
    if cell == MISSING_SENTINEL {
        String::new()
    } else {
        cell.to_string()
    }
}

/// Minutes as printed by stat sites, e.g. "1,234".
fn parse_minutes(cell: &str) -> Option<f64> {
    let cleaned: String = cell.chars().filter(|c| *c != ',').collect();
    cleaned.trim().parse::<f64>().ok().filter(|m| m.is_finite())
}

// ---------------------------------------------------------------------------
// Reader-based loader (private, enables testing without temp files)
// ---------------------------------------------------------------------------

fn load_roster_from_reader<R: Read>(
    rdr: R,
    source: &str,
    config: &RosterConfig,
) -> Result<Roster, RosterError> {
    let csv_err = |e: csv::Error| RosterError::Csv {
        path: source.to_string(),
        source: e,
    };

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(rdr);
    let headers = reader.headers().map_err(csv_err)?.clone();
    let name_idx = headers
        .iter()
        .position(|h| h.trim() == config.name_column)
        .ok_or_else(|| RosterError::MissingColumn {
            path: source.to_string(),
            column: config.name_column.clone(),
        })?;

    let minutes_idx = match config.min_minutes {
        Some(_) => Some(
            headers
                .iter()
                .position(|h| h.trim() == config.minutes_column)
                .ok_or_else(|| RosterError::MissingColumn {
                    path: source.to_string(),
                    column: config.minutes_column.clone(),
                })?,
        ),
        None => None,
    };

    let attribute_columns: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != name_idx)
        .map(|(_, h)| h.trim().to_string())
        .collect();

    let mut players = Vec::new();
    let mut filtered_out = 0;
    for result in reader.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("skipping malformed roster row in {}: {}", source, e);
                continue;
            }
        };

        let name = clean_cell(record.get(name_idx).unwrap_or(""));
        if name.is_empty() {
            warn!("skipping roster row without a player name in {}", source);
            continue;
        }

        if let (Some(limit), Some(idx)) = (config.min_minutes, minutes_idx) {
            let minutes = record.get(idx).and_then(parse_minutes);
            if !minutes.is_some_and(|m| m > limit) {
                filtered_out += 1;
                continue;
            }
        }

        let mut player = CanonicalPlayer::new(name);
        for (i, header) in headers.iter().enumerate() {
            if i == name_idx {
                continue;
            }
            player = player.with_attribute(header.trim(), clean_cell(record.get(i).unwrap_or("")));
        }
        players.push(player);
    }

    if players.is_empty() {
        return Err(RosterError::Validation(format!(
            "roster {} produced zero players ({} filtered by minutes)",
            source, filtered_out
        )));
    }

    info!(
        "loaded {} roster players from {} ({} filtered by minutes)",
        players.len(),
        source,
        filtered_out
    );

    Ok(Roster {
        attribute_columns,
        players,
        filtered_out,
    })
}

// ---------------------------------------------------------------------------
// Public path-based loader
// ---------------------------------------------------------------------------

/// Load the canonical roster described by `config`, resolving a relative
/// `config.path` against `base_dir`.
pub fn load_roster(base_dir: &Path, config: &RosterConfig) -> Result<Roster, RosterError> {
    let path = base_dir.join(&config.path);
    let file = std::fs::File::open(&path).map_err(|e| RosterError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_roster_from_reader(file, &path.display().to_string(), config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
