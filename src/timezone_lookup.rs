//! Timezone lookup table.
//!
//! Built once per process from a static alias table plus every IANA zone
//! known to `chrono-tz` (full normalized name and trailing city segment).
//! Used by the router's exact-token check and by the timezone provider.

use std::collections::HashSet;
use std::sync::OnceLock;

use chrono::Utc;
use chrono_tz::Tz;

/// Hand-picked abbreviations and city names that are not IANA segments.
const TIMEZONE_ALIASES: &[(&str, &str)] = &[
    ("utc", "UTC"),
    ("gmt", "Europe/London"),
    ("bst", "Europe/London"),
    ("cet", "Europe/Paris"),
    ("cest", "Europe/Paris"),
    ("eet", "Europe/Athens"),
    ("pst", "America/Los_Angeles"),
    ("pdt", "America/Los_Angeles"),
    ("sf", "America/Los_Angeles"),
    ("san_francisco", "America/Los_Angeles"),
    ("seattle", "America/Los_Angeles"),
    ("mst", "America/Denver"),
    ("mdt", "America/Denver"),
    ("cst", "America/Chicago"),
    ("cdt", "America/Chicago"),
    ("est", "America/New_York"),
    ("edt", "America/New_York"),
    ("nyc", "America/New_York"),
    ("ist", "Asia/Kolkata"),
    ("india", "Asia/Kolkata"),
    ("mumbai", "Asia/Kolkata"),
    ("delhi", "Asia/Kolkata"),
    ("jst", "Asia/Tokyo"),
    ("kst", "Asia/Seoul"),
    ("sgt", "Asia/Singapore"),
    ("hkt", "Asia/Hong_Kong"),
    ("beijing", "Asia/Shanghai"),
    ("aest", "Australia/Sydney"),
    ("aedt", "Australia/Sydney"),
    ("nzst", "Pacific/Auckland"),
    ("brt", "America/Sao_Paulo"),
];

/// Normalize a user token: trim, lowercase, whitespace runs become `_`.
pub fn normalize_token(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Query form that compares against both aliases and normalized IANA names.
fn query_token(value: &str) -> String {
    normalize_token(value).replace('/', "_")
}

fn normalize_iana(iana: &str) -> String {
    iana.trim().to_lowercase().replace('/', "_")
}

#[derive(Debug, Clone)]
struct TimezoneEntry {
    alias: String,
    iana: String,
    iana_lower: String,
    normalized_iana: String,
}

#[derive(Debug, Default)]
struct Lookup {
    entries: Vec<TimezoneEntry>,
    exact_tokens: HashSet<String>,
}

impl Lookup {
    fn build() -> Self {
        let mut lookup = Lookup::default();
        let mut seen = HashSet::new();

        for (alias, iana) in TIMEZONE_ALIASES {
            lookup.add(alias, iana, &mut seen);
        }

        for tz in chrono_tz::TZ_VARIANTS.iter() {
            let iana = tz.name();
            let normalized = normalize_iana(iana);
            lookup.add(&normalized, iana, &mut seen);

            if let Some(city) = iana.rsplit('/').next().map(normalize_token) {
                if city.chars().count() >= 2 {
                    lookup.add(&city, iana, &mut seen);
                }
            }
        }

        lookup
    }

    fn add(&mut self, alias: &str, iana: &str, seen: &mut HashSet<String>) {
        let alias = normalize_token(alias);
        let normalized_iana = normalize_iana(iana);
        if alias.is_empty() || normalized_iana.is_empty() {
            return;
        }
        let iana_lower = iana.to_lowercase();
        if !seen.insert(format!("{}:{}", alias, iana_lower)) {
            return;
        }

        self.exact_tokens.insert(alias.clone());
        self.exact_tokens.insert(normalized_iana.clone());
        self.entries.push(TimezoneEntry {
            alias,
            iana: iana.to_string(),
            iana_lower,
            normalized_iana,
        });
    }
}

static LOOKUP: OnceLock<Lookup> = OnceLock::new();

fn lookup() -> &'static Lookup {
    LOOKUP.get_or_init(Lookup::build)
}

/// A zone matched by alias, city or IANA name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimezoneMatch {
    pub alias: String,
    pub iana: String,
}

/// Whether `query` is exactly a known alias, city token or IANA name.
pub fn has_exact_token(query: &str) -> bool {
    let token = query_token(query);
    !token.is_empty() && lookup().exact_tokens.contains(&token)
}

/// Substring matches for `query`, exact matches first, then by alias,
/// one row per IANA zone.
pub fn find_matches(query: &str) -> Vec<TimezoneMatch> {
    let token = query_token(query);
    if token.is_empty() {
        return Vec::new();
    }
    let iana_token = token.replace('_', "/");

    let mut matches: Vec<&TimezoneEntry> = lookup()
        .entries
        .iter()
        .filter(|e| {
            e.alias.contains(&token)
                || e.normalized_iana.contains(&token)
                || e.iana_lower.contains(&iana_token)
        })
        .collect();

    let is_exact = |e: &TimezoneEntry| e.alias == token || e.normalized_iana == token;
    matches.sort_by(|a, b| {
        is_exact(b)
            .cmp(&is_exact(a))
            .then_with(|| a.alias.cmp(&b.alias))
    });

    let mut seen = HashSet::new();
    matches
        .into_iter()
        .filter(|e| seen.insert(e.iana_lower.clone()))
        .map(|e| TimezoneMatch {
            alias: e.alias.clone(),
            iana: e.iana.clone(),
        })
        .collect()
}

/// Current wall-clock time in `iana` as `HH:MM:SS`, if the zone is known.
pub fn format_zone_time(iana: &str) -> Option<String> {
    let tz: Tz = iana.parse().ok()?;
    Some(Utc::now().with_timezone(&tz).format("%H:%M:%S").to_string())
}
