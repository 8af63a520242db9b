// Player-name normalization: maps a raw name to a short matching key.
//
// The key is only ever used for comparison. Both sides of a linkage (roster
// and scraped pages) must go through the same `NameNormalizer`.

use std::collections::{HashMap, HashSet};

/// Literal used by the data sources for a missing cell.
pub const MISSING_SENTINEL: &str = "N/A";

// ---------------------------------------------------------------------------
// Shortening rule
// ---------------------------------------------------------------------------

/// Generic rule applied when no exception entry matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortenRule {
    /// Keep the first `n` whitespace-separated tokens.
    LeadingTokens(usize),
    /// Keep the first and last token when the name has three or more tokens.
    FirstLast,
}

impl Default for ShortenRule {
    fn default() -> Self {
        ShortenRule::LeadingTokens(2)
    }
}

impl ShortenRule {
    fn apply(self, tokens: &[&str]) -> String {
        match self {
            ShortenRule::LeadingTokens(n) => tokens[..tokens.len().min(n.max(1))].join(" "),
            ShortenRule::FirstLast => {
                if tokens.len() >= 3 {
                    format!("{} {}", tokens[0], tokens[tokens.len() - 1])
                } else {
                    tokens.join(" ")
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Exception table
// ---------------------------------------------------------------------------

/// Hand-curated name pairs that the generic rule gets wrong.
///
/// Both sides are cleaned like normalizer input, so `"Manuel  Ugarte Ribeiro "`
/// hits the `"Manuel Ugarte Ribeiro"` entry. Every configured output is also
/// treated as an already-normalized key. When an output is itself a key, the
/// entries are followed to the end of the chain; a cycle resolves to its
/// smallest member.
#[derive(Debug, Clone, Default)]
pub struct ExceptionTable {
    entries: HashMap<String, String>,
    outputs: HashSet<String>,
}

impl ExceptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, raw: &str, normalized: &str) {
        let normalized = clean(normalized);
        if let Some(previous) = self.entries.insert(clean(raw), normalized.clone()) {
            if !self.entries.values().any(|v| *v == previous) {
                self.outputs.remove(&previous);
            }
        }
        self.outputs.insert(normalized);
    }

    fn is_output(&self, cleaned: &str) -> bool {
        self.outputs.contains(cleaned)
    }

    /// Final name for an exception key, or `None` when `cleaned` is not a key.
    fn resolve(&self, cleaned: &str) -> Option<String> {
        let mut current = self.entries.get(cleaned)?;
        let mut path: Vec<&str> = vec![cleaned];
        while let Some(next) = self.entries.get(current) {
            if let Some(start) = path.iter().position(|seen| *seen == current.as_str()) {
                let cycle = &path[start..];
                return cycle.iter().min().map(|name| name.to_string());
            }
            path.push(current);
            current = next;
        }
        Some(current.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries as `(raw, normalized)` pairs, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for ExceptionTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = ExceptionTable::new();
        for (raw, normalized) in iter {
            table.insert(raw.as_ref(), normalized.as_ref());
        }
        table
    }
}

// ---------------------------------------------------------------------------
// Normalizer
// ---------------------------------------------------------------------------

/// Pure, deterministic name normalizer: exception table first, then the
/// generic shortening rule.
#[derive(Debug, Clone, Default)]
pub struct NameNormalizer {
    rule: ShortenRule,
    exceptions: ExceptionTable,
}

impl NameNormalizer {
    pub fn new(rule: ShortenRule) -> Self {
        Self {
            rule,
            exceptions: ExceptionTable::new(),
        }
    }

    pub fn with_exceptions(mut self, exceptions: ExceptionTable) -> Self {
        self.exceptions = exceptions;
        self
    }

    /// Normalize a raw name into its matching key.
    ///
    /// Returns an empty string for blank input and for the missing-value
    /// sentinel. A single comma is read as "Last, First" ordering; any other
    /// commas are treated as spaces. The result is a fixed point:
    /// `normalize(normalize(x)) == normalize(x)`.
    pub fn normalize(&self, raw: &str) -> String {
        let cleaned = clean(raw);
        if cleaned.is_empty() || cleaned == MISSING_SENTINEL {
            return String::new();
        }
        if let Some(exception) = self.exceptions.resolve(&cleaned) {
            return exception;
        }
        if self.exceptions.is_output(&cleaned) {
            return cleaned;
        }
        let tokens: Vec<&str> = cleaned.split(' ').collect();
        let shortened = self.rule.apply(&tokens);
        // A shortened name can land on an exception key.
        self.exceptions.resolve(&shortened).unwrap_or(shortened)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Reorder "Last, First", drop remaining commas, trim and collapse runs of
/// whitespace to a single space.
fn clean(raw: &str) -> String {
    reorder_last_first(raw)
        .replace(',', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `"Salah, Mohamed"` -> `"Mohamed Salah"`. Anything other than exactly one
/// comma with text on both sides is returned unchanged.
fn reorder_last_first(raw: &str) -> String {
    let mut parts = raw.split(',');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(last), Some(first), None) if !last.trim().is_empty() && !first.trim().is_empty() => {
            format!("{} {}", first.trim(), last.trim())
        }
        _ => raw.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
