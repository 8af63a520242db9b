// Name reconciliation engine: links noisy scraped player names to a canonical
// roster by approximate string similarity.
//
// Pure crate: callers hand in already-loaded records and get back a
// partition of joined rows and unmatched records. No file or network I/O.

pub mod amount;
pub mod index;
pub mod join;
pub mod matcher;
pub mod normalize;
pub mod position;
pub mod similarity;

pub use amount::parse_amount;
pub use index::{CandidateIndex, CanonicalPlayer, KeyCollision};
pub use join::{
    JoinedRow, ParsedValue, Reconciler, Reconciliation, ScrapedRecord, ScrapedValue,
    UnmatchedRecord,
};
pub use matcher::{FuzzyMatcher, MatchOutcome, MatchResult, Threshold, ThresholdError};
pub use normalize::{ExceptionTable, NameNormalizer, ShortenRule, MISSING_SENTINEL};
pub use position::Position;
