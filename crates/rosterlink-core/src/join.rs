// Reconciled join: partitions scraped records into joined rows (scraped values
// plus canonical attributes) and unmatched records.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::amount::parse_amount;
use crate::index::{CandidateIndex, CanonicalPlayer};
use crate::matcher::{FuzzyMatcher, MatchOutcome, MatchResult};
use crate::normalize::NameNormalizer;
use crate::position::Position;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One named value cell from a scraped page, e.g. `("Price", "€20M")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedValue {
    pub column: String,
    pub raw: String,
}

/// A scraped name and its value cells, in page order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedRecord {
    pub name: String,
    pub values: Vec<ScrapedValue>,
}

impl ScrapedRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }

    pub fn with_value(mut self, column: impl Into<String>, raw: impl Into<String>) -> Self {
        self.values.push(ScrapedValue {
            column: column.into(),
            raw: raw.into(),
        });
        self
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// A scraped value with its parsed amount (`None` when unparseable).
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedValue {
    pub column: String,
    pub raw: String,
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub player: CanonicalPlayer,
    pub scraped_name: String,
    pub score: u8,
    pub values: Vec<ParsedValue>,
}

impl JoinedRow {
    /// Parsed amount for a value column.
    pub fn value(&self, column: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|v| v.column == column)
            .and_then(|v| v.amount)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmatchedRecord {
    pub record: ScrapedRecord,
    pub best_score: Option<u8>,
}

/// Disjoint partition of one batch of scraped records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    pub joined: Vec<JoinedRow>,
    pub unmatched: Vec<UnmatchedRecord>,
}

impl Reconciliation {
    pub fn total(&self) -> usize {
        self.joined.len() + self.unmatched.len()
    }

    pub fn matched_count(&self) -> usize {
        self.joined.len()
    }

    pub fn unmatched_count(&self) -> usize {
        self.unmatched.len()
    }

    /// Number of canonical players that more than one scraped record matched.
    pub fn repeat_matches(&self) -> usize {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for row in &self.joined {
            *seen.entry(row.player.name.as_str()).or_default() += 1;
        }
        seen.values().filter(|&&n| n > 1).count()
    }

    /// Joined-row counts by primary position, read from `position_column`.
    pub fn position_counts(&self, position_column: &str) -> BTreeMap<Position, usize> {
        let mut counts = BTreeMap::new();
        for row in &self.joined {
            let position = Position::primary(row.player.attribute(position_column).unwrap_or(""));
            *counts.entry(position).or_default() += 1;
        }
        counts
    }

    /// Stable reorder of joined rows into GK, DF, MF, FW, Other buckets.
    pub fn order_by_position(&mut self, position_column: &str) {
        self.joined.sort_by_key(|row| {
            Position::primary(row.player.attribute(position_column).unwrap_or(""))
        });
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Borrows the read-only pieces of a linkage job and applies them to batches
/// of scraped records.
pub struct Reconciler<'a> {
    index: &'a CandidateIndex,
    normalizer: &'a NameNormalizer,
    matcher: &'a FuzzyMatcher,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        index: &'a CandidateIndex,
        normalizer: &'a NameNormalizer,
        matcher: &'a FuzzyMatcher,
    ) -> Self {
        Self {
            index,
            normalizer,
            matcher,
        }
    }

    /// Normalize and match a single scraped name.
    pub fn match_name(&self, scraped_name: &str) -> MatchResult {
        let query = self.normalizer.normalize(scraped_name);
        self.matcher.find(scraped_name, &query, self.index)
    }

    /// Route every record to exactly one of `joined` or `unmatched`, keeping
    /// input order within each.
    pub fn reconcile<I>(&self, records: I) -> Reconciliation
    where
        I: IntoIterator<Item = ScrapedRecord>,
    {
        let mut out = Reconciliation::default();
        for record in records {
            let result = self.match_name(&record.name);
            match result.outcome {
                MatchOutcome::Accepted { key, score, .. } => {
                    let Some(player) = self.index.get(&key) else {
                        out.unmatched.push(UnmatchedRecord {
                            record,
                            best_score: Some(score),
                        });
                        continue;
                    };
                    debug!("matched '{}' -> '{}' ({})", record.name, player.name, score);
                    let values = record
                        .values
                        .into_iter()
                        .map(|v| ParsedValue {
                            amount: parse_amount(&v.raw),
                            column: v.column,
                            raw: v.raw,
                        })
                        .collect();
                    out.joined.push(JoinedRow {
                        player: player.clone(),
                        scraped_name: record.name,
                        score,
                        values,
                    });
                }
                MatchOutcome::Rejected { best_score } => {
                    debug!("no match for '{}' (best {:?})", record.name, best_score);
                    out.unmatched.push(UnmatchedRecord { record, best_score });
                }
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
