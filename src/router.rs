//! Query router: classifies raw input into a search mode plus the query the
//! providers should see.
//!
//! Precedence is fixed: explicit prefixes first, then content heuristics
//! (math, currency, timezone phrasing), then the default `all` mode.

use std::sync::OnceLock;

use regex::Regex;

use crate::model::{Route, SearchMode};
use crate::timezone_lookup;

/// Prefixes that select a mode outright, matched case-insensitively.
const PREFIX_ROUTES: &[(&str, SearchMode)] = &[
    ("w ", SearchMode::Windows),
    ("a ", SearchMode::Apps),
    ("f ", SearchMode::Files),
    (":emoji ", SearchMode::Emoji),
    ("emoji ", SearchMode::Emoji),
    ("tz ", SearchMode::Timezone),
    ("timezone ", SearchMode::Timezone),
    ("weather ", SearchMode::Weather),
    ("wx ", SearchMode::Weather),
];

/// Single-character sigils; the remainder is left-trimmed.
const SIGIL_ROUTES: &[(char, SearchMode)] = &[
    ('$', SearchMode::Currency),
    ('=', SearchMode::Calculator),
    ('>', SearchMode::Actions),
];

const WEATHER_SUFFIX: &str = " weather";
const TIME_SUFFIX: &str = " time";
const TIME_PREFIXES: &[&str] = &["time in ", "now in ", "time "];

fn math_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9+\-*/().\s%]+$").expect("valid math regex"))
}

fn currency_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\d+(?:\.\d+)?\s*[a-z]{3}\s+to\s+[a-z]{3}$").expect("valid currency regex")
    })
}

/// Route raw input to a mode and normalized query.
pub fn route(raw_query: &str) -> Route {
    let q = raw_query.trim_start();

    for (prefix, mode) in PREFIX_ROUTES {
        if let Some(rest) = strip_prefix_ignore_case(q, prefix) {
            let rest = rest.trim_start();
            return match mode {
                SearchMode::Weather => Route::new(*mode, strip_leading_in(rest)),
                _ => Route::new(*mode, rest),
            };
        }
    }

    if let Some(location) = strip_suffix_ignore_case(q.trim_end(), WEATHER_SUFFIX) {
        let location = strip_leading_in(location.trim());
        if location.chars().count() >= 2 {
            return Route::new(SearchMode::Weather, location);
        }
    }

    for (sigil, mode) in SIGIL_ROUTES {
        if let Some(rest) = q.strip_prefix(*sigil) {
            return Route::new(*mode, rest.trim_start());
        }
    }

    let trimmed = q.trim();

    if looks_like_math(trimmed) {
        return Route::new(SearchMode::Calculator, trimmed);
    }

    if currency_regex().is_match(trimmed) {
        return Route::new(SearchMode::Currency, trimmed);
    }

    if let Some(place) = timezone_phrase(trimmed) {
        return Route::new(SearchMode::Timezone, place);
    }

    Route::new(SearchMode::All, q)
}

/// Math heuristic: calculator characters only, with at least one digit.
pub fn looks_like_math(query: &str) -> bool {
    query.chars().any(|c| c.is_ascii_digit()) && math_regex().is_match(query)
}

fn timezone_phrase(query: &str) -> Option<&str> {
    for prefix in TIME_PREFIXES {
        if let Some(rest) = strip_prefix_ignore_case(query, prefix) {
            let rest = rest.trim();
            if !rest.is_empty() {
                return Some(rest);
            }
        }
    }

    if let Some(rest) = strip_suffix_ignore_case(query, TIME_SUFFIX) {
        let rest = rest.trim();
        if !rest.is_empty() {
            return Some(rest);
        }
    }

    timezone_lookup::has_exact_token(query).then_some(query)
}

fn strip_leading_in(location: &str) -> &str {
    strip_prefix_ignore_case(location, "in ")
        .map(str::trim_start)
        .unwrap_or(location)
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &s[prefix.len()..])
}

fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    let cut = s.len().checked_sub(suffix.len())?;
    let tail = s.get(cut..)?;
    tail.eq_ignore_ascii_case(suffix).then(|| &s[..cut])
}
