// Candidate index: normalized roster keys plus a reverse lookup to the full
// canonical player.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::normalize::NameNormalizer;
use crate::similarity;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A roster entry. Attributes are carried through the join untouched, in the
/// order the roster supplied them.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalPlayer {
    pub name: String,
    pub attributes: Vec<(String, String)>,
}

impl CanonicalPlayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((column.into(), value.into()));
        self
    }

    /// Look up an attribute by column name.
    pub fn attribute(&self, column: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }
}

/// Two roster players that normalized to the same key. Only `kept` is
/// reachable through the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCollision {
    pub key: String,
    pub kept: String,
    pub dropped: String,
}

/// One searchable key.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub key: String,
    pub tokens: Vec<String>,
    pub player: CanonicalPlayer,
}

/// Read-only lookup structure built once per run from the canonical roster.
#[derive(Debug, Clone, Default)]
pub struct CandidateIndex {
    entries: Vec<Entry>,
    by_key: HashMap<String, usize>,
    collisions: Vec<KeyCollision>,
}

impl CandidateIndex {
    /// Normalize every player's name and index it. On duplicate keys the
    /// first-seen player wins; later ones are recorded in `collisions()`.
    /// Players whose name normalizes to an empty key are skipped.
    pub fn build<I>(players: I, normalizer: &NameNormalizer) -> Self
    where
        I: IntoIterator<Item = CanonicalPlayer>,
    {
        let mut index = CandidateIndex::default();
        for player in players {
            let key = normalizer.normalize(&player.name);
            if key.is_empty() {
                debug!("skipping roster entry with empty name key: {:?}", player.name);
                continue;
            }
            if let Some(&existing) = index.by_key.get(&key) {
                let kept = &index.entries[existing].player.name;
                warn!(
                    "roster key collision on '{}': keeping '{}', dropping '{}'",
                    key, kept, player.name
                );
                index.collisions.push(KeyCollision {
                    key,
                    kept: kept.clone(),
                    dropped: player.name,
                });
                continue;
            }
            index.by_key.insert(key.clone(), index.entries.len());
            index.entries.push(Entry {
                tokens: similarity::tokens(&key),
                key,
                player,
            });
        }
        index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reverse lookup from a normalized key to the canonical player.
    pub fn get(&self, key: &str) -> Option<&CanonicalPlayer> {
        self.by_key.get(key).map(|&i| &self.entries[i].player)
    }

    pub fn collisions(&self) -> &[KeyCollision] {
        &self.collisions
    }

    pub(crate) fn entries(&self) -> &[Entry] {
        &self.entries
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
