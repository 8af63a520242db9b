// Fuzzy matcher: best-candidate search over a `CandidateIndex` with a
// per-call-site acceptance threshold.

use std::fmt;

use thiserror::Error;

use crate::index::CandidateIndex;
use crate::similarity;

// ---------------------------------------------------------------------------
// Threshold
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
#[error("similarity threshold must be within 0..=100, got {0}")]
pub struct ThresholdError(pub u32);

/// Minimum accepted similarity score, 0..=100 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Threshold(u8);

impl Threshold {
    pub fn new(value: u32) -> Result<Self, ThresholdError> {
        if value > 100 {
            return Err(ThresholdError(value));
        }
        Ok(Threshold(value as u8))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// A score equal to the threshold is accepted.
    pub fn accepts(self, score: u8) -> bool {
        score >= self.0
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Match result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Accepted {
        key: String,
        canonical_name: String,
        score: u8,
    },
    /// No candidate reached the threshold. `best_score` is the highest score
    /// seen, or `None` when there was nothing to compare (empty name or empty
    /// index).
    Rejected { best_score: Option<u8> },
}

/// Outcome of matching one scraped name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub scraped_name: String,
    pub outcome: MatchOutcome,
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        matches!(self.outcome, MatchOutcome::Accepted { .. })
    }

    pub fn matched_name(&self) -> Option<&str> {
        match &self.outcome {
            MatchOutcome::Accepted { canonical_name, .. } => Some(canonical_name),
            MatchOutcome::Rejected { .. } => None,
        }
    }

    /// Score of the accepted candidate; `None` when rejected.
    pub fn score(&self) -> Option<u8> {
        match self.outcome {
            MatchOutcome::Accepted { score, .. } => Some(score),
            MatchOutcome::Rejected { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyMatcher {
    threshold: Threshold,
    expand_initials: bool,
}

impl FuzzyMatcher {
    /// Matcher with initial expansion enabled.
    pub fn new(threshold: Threshold) -> Self {
        Self {
            threshold,
            expand_initials: true,
        }
    }

    pub fn with_initial_expansion(mut self, enabled: bool) -> Self {
        self.expand_initials = enabled;
        self
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    /// Score a normalized query against a normalized candidate key.
    pub fn score(&self, query: &str, candidate: &str) -> u8 {
        self.score_tokens(&similarity::tokens(query), &similarity::tokens(candidate))
    }

    fn score_tokens(&self, query: &[String], candidate: &[String]) -> u8 {
        if self.expand_initials {
            let expanded = similarity::expand_initials(query, candidate);
            similarity::token_sort_ratio_tokens(&expanded, candidate)
        } else {
            similarity::token_sort_ratio_tokens(query, candidate)
        }
    }

    /// Highest-scoring key for `query`, ignoring the threshold. Ties go to the
    /// key seen first in index order.
    pub fn best_candidate<'a>(&self, query: &str, index: &'a CandidateIndex) -> Option<(&'a str, u8)> {
        let query_tokens = similarity::tokens(query);
        if query_tokens.is_empty() {
            return None;
        }
        let mut best: Option<(&'a str, u8)> = None;
        for entry in index.entries() {
            let score = self.score_tokens(&query_tokens, &entry.tokens);
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((entry.key.as_str(), score));
            }
        }
        best
    }

    /// Match a normalized `query` (derived from `scraped_name`) against the
    /// index and apply the threshold.
    pub fn find(&self, scraped_name: &str, query: &str, index: &CandidateIndex) -> MatchResult {
        let outcome = match self.best_candidate(query, index) {
            Some((key, score)) if self.threshold.accepts(score) => {
                let canonical_name = index
                    .get(key)
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| key.to_string());
                MatchOutcome::Accepted {
                    key: key.to_string(),
                    canonical_name,
                    score,
                }
            }
            Some((_, score)) => MatchOutcome::Rejected {
                best_score: Some(score),
            },
            None => MatchOutcome::Rejected { best_score: None },
        };
        MatchResult {
            scraped_name: scraped_name.to_string(),
            outcome,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::CanonicalPlayer;
    use crate::normalize::{NameNormalizer, ShortenRule};

    fn index_of(names: &[&str]) -> CandidateIndex {
        CandidateIndex::build(
            names.iter().map(|n| CanonicalPlayer::new(*n)),
            &NameNormalizer::new(ShortenRule::LeadingTokens(2)),
        )
    }

    fn matcher(threshold: u32) -> FuzzyMatcher {
        FuzzyMatcher::new(Threshold::new(threshold).unwrap())
    }

    #[test]
    fn threshold_rejects_above_100() {
        assert_eq!(Threshold::new(101), Err(ThresholdError(101)));
        assert!(Threshold::new(100).is_ok());
        assert!(Threshold::new(0).is_ok());
    }

    #[test]
    fn exact_name_accepted() {
        let index = index_of(&["Mohamed Salah", "Bukayo Saka"]);
        let result = matcher(85).find("Bukayo Saka", "Bukayo Saka", &index);
        assert_eq!(result.matched_name(), Some("Bukayo Saka"));
        assert_eq!(result.score(), Some(100));
    }

    #[test]
    fn accepted_name_is_full_canonical_name() {
        let index = index_of(&["Lionel Andrés Messi"]);
        let result = matcher(85).find("Lionel Andres", "Lionel Andres", &index);
        assert_eq!(result.matched_name(), Some("Lionel Andrés Messi"));
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        let index = index_of(&["Mohammed Salah"]);
        let score = matcher(0).score("Mohamed Salah", "Mohammed Salah");
        assert!(score > 0 && score < 100);

        let at = matcher(score as u32).find("Mohamed Salah", "Mohamed Salah", &index);
        assert!(at.is_match());
        assert_eq!(at.score(), Some(score));

        let above = matcher(score as u32 + 1).find("Mohamed Salah", "Mohamed Salah", &index);
        assert!(!above.is_match());
        assert_eq!(
            above.outcome,
            MatchOutcome::Rejected {
                best_score: Some(score)
            }
        );
    }

    #[test]
    fn ties_go_to_first_in_index_order() {
        let index = index_of(&["Ben White", "Ben Whyte", "Ben Whitr"]);
        let m = matcher(0);
        // "Ben Whitx" shares 8 of 9 chars with both "Ben White" and "Ben Whitr".
        assert_eq!(m.score("Ben Whitx", "Ben White"), 89);
        assert_eq!(m.score("Ben Whitx", "Ben Whitr"), 89);
        assert_eq!(m.score("Ben Whitx", "Ben Whyte"), 78);
        let (key, _) = m.best_candidate("Ben Whitx", &index).unwrap();
        assert_eq!(key, "Ben White");

        let twins = index_of(&["Tom Ab", "Tom Ac"]);
        let (key, _) = m.best_candidate("Tom Ax", &twins).unwrap();
        assert_eq!(key, "Tom Ab");
    }

    #[test]
    fn empty_query_is_no_match() {
        let index = index_of(&["Mohamed Salah"]);
        let result = matcher(0).find("", "", &index);
        assert_eq!(result.outcome, MatchOutcome::Rejected { best_score: None });
    }

    #[test]
    fn empty_index_is_no_match() {
        let index = index_of(&[]);
        let result = matcher(0).find("Mohamed Salah", "Mohamed Salah", &index);
        assert!(!result.is_match());
        assert_eq!(result.score(), None);
    }

    #[test]
    fn initial_expansion_matches_abbreviated_first_name() {
        let index = index_of(&["Mohamed Salah"]);
        let result = matcher(85).find("M. Salah", "M. Salah", &index);
        assert_eq!(result.matched_name(), Some("Mohamed Salah"));
        assert_eq!(result.score(), Some(100));
    }

    #[test]
    fn initial_expansion_can_be_disabled() {
        let index = index_of(&["Mohamed Salah"]);
        let m = matcher(85).with_initial_expansion(false);
        let result = m.find("M. Salah", "M. Salah", &index);
        assert!(!result.is_match());
        assert_eq!(result.score(), Some(70));
    }

    #[test]
    fn longer_first_name_scores_by_shared_chars() {
        let m = matcher(80).with_initial_expansion(false);
        assert_eq!(m.score("Matty Cash", "Matthew Cash"), 82);

        let index = index_of(&["Matthew Cash"]);
        let result = m.find("Matty Cash", "Matty Cash", &index);
        assert_eq!(result.matched_name(), Some("Matthew Cash"));
        assert_eq!(result.score(), Some(82));
    }
}
