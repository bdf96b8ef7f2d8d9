//! Typo-tolerant fuzzy scoring of one query against one candidate string.
//!
//! Ordered subsequence match with bonuses for contiguous runs, token starts,
//! camelCase boundaries and early positions. A query that is not fully
//! consumed gets a second chance through a single-edit Levenshtein check
//! against sliding windows of the candidate.

/// Largest edit distance the typo fallback accepts.
const MAX_TYPO_DISTANCE: usize = 1;
const BASE_MATCH: f64 = 10.0;
const CONTIGUOUS_BONUS: f64 = 8.0;
const TOKEN_START_BONUS: f64 = 12.0;
const CAMEL_BONUS: f64 = 8.0;
const EARLY_POSITIONS: usize = 6;
const TYPO_PENALTY_PER_EDIT: f64 = 14.0;
const TYPO_FLAT_PENALTY: f64 = 20.0;
const LENGTH_PENALTY: f64 = 0.15;

/// Score `query` against `candidate`.
///
/// Returns `0.0` for an empty query, `f64::NEG_INFINITY` for an empty
/// candidate or when no close match exists.
pub fn score(query: &str, candidate: &str) -> f64 {
    let needle: Vec<char> = query.trim().chars().map(fold_char).collect();
    if needle.is_empty() {
        return 0.0;
    }

    let original: Vec<char> = candidate.chars().collect();
    if original.is_empty() {
        return f64::NEG_INFINITY;
    }
    let hay: Vec<char> = original.iter().copied().map(fold_char).collect();

    let mut total = 0.0;
    let mut consumed = 0;
    let mut last_match: Option<usize> = None;
    let mut run = 0u32;

    for (i, &c) in hay.iter().enumerate() {
        if consumed == needle.len() {
            break;
        }
        if c != needle[consumed] {
            continue;
        }

        total += BASE_MATCH;

        if i > 0 && last_match == Some(i - 1) {
            run += 1;
            total += CONTIGUOUS_BONUS + f64::from(run);
        } else {
            run = 0;
        }

        if i == 0 || is_separator(original[i - 1]) {
            total += TOKEN_START_BONUS;
        }

        if i > 0 && original[i].is_uppercase() && original[i - 1].is_lowercase() {
            total += CAMEL_BONUS;
        }

        if i < EARLY_POSITIONS {
            total += (EARLY_POSITIONS - i) as f64;
        }

        last_match = Some(i);
        consumed += 1;
    }

    if consumed < needle.len() {
        return match min_window_distance(&hay, &needle, MAX_TYPO_DISTANCE) {
            Some(distance) => {
                let partial = (total - distance as f64 * TYPO_PENALTY_PER_EDIT).max(0.0);
                // Nothing left after the edit penalty is not a close match
                if partial > 0.0 {
                    partial - TYPO_FLAT_PENALTY
                } else {
                    f64::NEG_INFINITY
                }
            }
            None => f64::NEG_INFINITY,
        };
    }

    total - LENGTH_PENALTY * hay.len().saturating_sub(needle.len()) as f64
}

fn fold_char(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '_' | '-' | '.' | '/')
}

/// Smallest edit distance between `needle` and any window of `hay` that is
/// `needle.len() + max_distance` long (clipped at the end), or `None` when
/// every window needs more than `max_distance` edits.
fn min_window_distance(hay: &[char], needle: &[char], max_distance: usize) -> Option<usize> {
    let window = needle.len() + max_distance;
    let mut best: Option<usize> = None;

    for start in 0..hay.len() {
        let end = (start + window).min(hay.len());
        if let Some(d) = bounded_levenshtein(&hay[start..end], needle, max_distance) {
            best = Some(best.map_or(d, |b| b.min(d)));
            if d == 0 {
                break;
            }
        }
    }

    best
}

/// Levenshtein distance, or `None` as soon as every cell of a row exceeds
/// `max_distance`.
fn bounded_levenshtein(a: &[char], b: &[char], max_distance: usize) -> Option<usize> {
    let mut row: Vec<usize> = (0..=b.len()).collect();

    for i in 1..=a.len() {
        let mut diagonal = row[0];
        row[0] = i;
        let mut row_min = row[0];

        for j in 1..=b.len() {
            let above = row[j];
            let cost = usize::from(a[i - 1] != b[j - 1]);
            row[j] = (row[j] + 1).min(row[j - 1] + 1).min(diagonal + cost);
            diagonal = above;
            row_min = row_min.min(row[j]);
        }

        if row_min > max_distance {
            return None;
        }
    }

    let distance = row[b.len()];
    (distance <= max_distance).then_some(distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_query_is_neutral() {
        assert_eq!(score("", "Firefox"), 0.0);
        assert_eq!(score("   ", "Firefox"), 0.0);
    }

    #[test]
    fn test_empty_candidate_never_matches() {
        assert_eq!(score("fire", ""), f64::NEG_INFINITY);
    }

    #[test]
    fn test_short_ordered_query_scores_strongly() {
        assert!(score("chr", "Google Chrome") > 20.0);
    }

    #[test]
    fn test_typo_beats_unrelated() {
        let typo = score("crome", "Google Chrome");
        let unrelated = score("crome", "Terminal");
        assert!(typo > unrelated);
        assert_eq!(unrelated, f64::NEG_INFINITY);
    }

    #[test]
    fn test_single_substitution_is_tolerated() {
        // "firafox" is not a subsequence of "firefox" but is one edit away
        let s = score("firafox", "firefox");
        assert!(s.is_finite());
        assert!(s < score("firefox", "firefox"));
    }

    #[test]
    fn test_two_edits_are_rejected() {
        assert_eq!(score("fxrxfox", "firefox"), f64::NEG_INFINITY);
    }

    #[test]
    fn test_single_letter_absent_from_candidate_never_matches() {
        // Every candidate ends in a one-character window one edit from "q"
        assert_eq!(score("q", "Firefox"), f64::NEG_INFINITY);
        assert_eq!(score("q", "x"), f64::NEG_INFINITY);
    }

    #[test]
    fn test_exact_prefix_beats_scattered() {
        assert!(score("term", "Terminal") > score("term", "The Remote Machine"));
    }

    #[test]
    fn test_token_start_bonus() {
        // 'r' at a token start vs 'r' mid-word
        assert!(score("r", "x ranking") > score("r", "xxranking"));
    }

    #[test]
    fn test_camel_case_boundary_bonus() {
        assert!(score("b", "fooBar") > score("b", "foobar"));
        // Uppercase after uppercase is not a boundary
        assert_eq!(score("b", "FOOBAR"), score("b", "foobar"));
    }

    #[test]
    fn test_case_insensitive() {
        let lower = score("fire", "firefox");
        assert_eq!(score("FIRE", "firefox"), lower);
        // All-caps has no lowercase->uppercase boundary, so no camel bonus
        assert_eq!(score("fire", "FIREFOX"), lower);
    }

    #[test]
    fn test_dispersed_matches_in_long_text_score_non_positive() {
        let filler = "m".repeat(130);
        let candidate = format!("{filler}x{filler}y{filler}z");
        assert!(score("xyz", &candidate) <= 0.0);
    }

    #[test]
    fn test_contiguous_run_accumulates() {
        // f(10+12+6) i(10+9+5) r(10+10+4) e(10+11+3) = 100, no length penalty
        assert_eq!(score("fire", "fire"), 100.0);
    }

    proptest! {
        #[test]
        fn prop_appending_noise_never_raises_score(
            q in "[a-z]{1,6}",
            prefix in "[a-z ]{0,12}",
            noise in "[a-z0-9 ]{1,24}",
        ) {
            let candidate = format!("{prefix}{q}");
            let base = score(&q, &candidate);
            prop_assert!(base.is_finite());
            let noisy = format!("{}{}", candidate, noise);
            prop_assert!(base >= score(&q, &noisy));
        }

        #[test]
        fn prop_empty_query_is_zero(c in "[A-Za-z0-9 ]{1,32}") {
            prop_assert_eq!(score("", &c), 0.0);
        }

        #[test]
        fn prop_empty_candidate_is_negative_infinity(q in "[a-z]{1,12}") {
            prop_assert_eq!(score(&q, ""), f64::NEG_INFINITY);
        }
    }
}
