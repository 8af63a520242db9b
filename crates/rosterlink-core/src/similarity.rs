// Token-sort similarity scoring.
//
// Strings are pre-processed (case and diacritics folded, punctuation turned
// into spaces), their tokens sorted alphabetically and rejoined, and the two
// results compared with the Indel ratio 2*M / (|a| + |b|), where M is the
// length of their longest common subsequence. Scores are integers in 0..=100,
// rounded half to even.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Fold a string for comparison: strip diacritics, lowercase, replace
/// non-alphanumerics with spaces and collapse whitespace.
pub(crate) fn process(s: &str) -> String {
    let folded: String = s.nfd().filter(|c| !is_combining_mark(*c)).collect();
    folded
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Processed tokens of `s`, in original order.
pub(crate) fn tokens(s: &str) -> Vec<String> {
    process(s).split_whitespace().map(str::to_string).collect()
}

/// Plain similarity of two strings as an integer percentage, counted in
/// chars. Either side being empty scores 0.
pub fn ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    percent_half_even(2 * lcs_len(&a, &b), a.len() + b.len())
}

/// Token-sort ratio over already-processed token lists.
pub(crate) fn token_sort_ratio_tokens(a: &[String], b: &[String]) -> u8 {
    ratio(&sorted_join(a), &sorted_join(b))
}

/// Token-sort ratio of two raw strings. Word order does not affect the score.
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    token_sort_ratio_tokens(&tokens(a), &tokens(b))
}

/// Replace single-letter query tokens (initials) with the candidate token they
/// abbreviate.
///
/// Candidate tokens that already appear verbatim in the query are reserved
/// first, so `"s salah"` against `"salah sam"` expands to `"sam salah"`.
pub(crate) fn expand_initials(query: &[String], candidate: &[String]) -> Vec<String> {
    let mut used = vec![false; candidate.len()];
    for token in query.iter().filter(|t| !is_initial(t)) {
        if let Some(i) = (0..candidate.len()).find(|&i| !used[i] && candidate[i] == *token) {
            used[i] = true;
        }
    }

    query
        .iter()
        .map(|token| {
            let Some(initial) = token.chars().next().filter(|_| is_initial(token)) else {
                return token.clone();
            };
            let found = (0..candidate.len()).find(|&i| {
                !used[i] && candidate[i].chars().count() > 1 && candidate[i].starts_with(initial)
            });
            match found {
                Some(i) => {
                    used[i] = true;
                    candidate[i].clone()
                }
                None => token.clone(),
            }
        })
        .collect()
}

/// Longest common subsequence length, one DP row at a time.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut row = vec![0usize; b.len() + 1];
    for ca in a {
        let mut diag = 0;
        for (j, cb) in b.iter().enumerate() {
            let up = row[j + 1];
            row[j + 1] = if ca == cb { diag + 1 } else { up.max(row[j]) };
            diag = up;
        }
    }
    row[b.len()]
}

/// `100 * part / whole` rounded half to even. `part <= whole`.
fn percent_half_even(part: usize, whole: usize) -> u8 {
    let scaled = 100 * part;
    let (q, r) = (scaled / whole, scaled % whole);
    let rounded = if 2 * r > whole || (2 * r == whole && q % 2 == 1) { q + 1 } else { q };
    rounded as u8
}

fn is_initial(token: &str) -> bool {
    token.chars().count() == 1
}

fn sorted_join(tokens: &[String]) -> String {
    let mut sorted: Vec<&str> = tokens.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
