//! Emoji picker over a small built-in keyword table.

use super::Provider;
use crate::model::{ResultItem, ResultKind, SearchMode};

const MAX_ROWS: usize = 12;
const MIN_TERM_CHARS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmojiEntry {
    pub glyph: &'static str,
    pub name: &'static str,
    pub keywords: &'static [&'static str],
}

pub const EMOJI_TABLE: &[EmojiEntry] = &[
    EmojiEntry { glyph: "😀", name: "grinning face", keywords: &["smile", "happy", "face", "grin"] },
    EmojiEntry { glyph: "😂", name: "face with tears of joy", keywords: &["laugh", "lol", "funny", "tears"] },
    EmojiEntry { glyph: "😍", name: "smiling face with heart eyes", keywords: &["love", "heart", "eyes"] },
    EmojiEntry { glyph: "👍", name: "thumbs up", keywords: &["thumbs", "up", "approve", "yes"] },
    EmojiEntry { glyph: "🙏", name: "folded hands", keywords: &["thanks", "please", "pray"] },
    EmojiEntry { glyph: "🔥", name: "fire", keywords: &["hot", "lit", "flame"] },
    EmojiEntry { glyph: "✅", name: "check mark", keywords: &["done", "success", "check"] },
    EmojiEntry { glyph: "🎉", name: "party popper", keywords: &["party", "celebrate", "celebration"] },
    EmojiEntry { glyph: "🚀", name: "rocket", keywords: &["launch", "ship", "speed"] },
    EmojiEntry { glyph: "💡", name: "light bulb", keywords: &["idea", "inspiration", "tip"] },
];

fn search_term(query: &str) -> String {
    let q = query.trim().to_lowercase();
    [":emoji ", "emoji "]
        .iter()
        .find_map(|prefix| q.strip_prefix(prefix).map(|rest| rest.trim().to_string()))
        .unwrap_or(q)
}

fn entry_score(entry: &EmojiEntry, term: &str) -> u32 {
    let mut score = 0;
    if entry.name == term {
        score += 1000;
    }
    if entry.keywords.contains(&term) {
        score += 800;
    }
    if entry.name.starts_with(term) {
        score += 300;
    }
    let haystack = format!("{} {}", entry.name, entry.keywords.join(" "));
    if haystack.contains(term) {
        score += 100;
    }
    score
}

/// Matching entries, best first; ties broken by name.
pub fn search(query: &str) -> Vec<&'static EmojiEntry> {
    let term = search_term(query);
    if term.chars().count() < MIN_TERM_CHARS {
        return Vec::new();
    }

    let mut ranked: Vec<(u32, &'static EmojiEntry)> = EMOJI_TABLE
        .iter()
        .map(|entry| (entry_score(entry, &term), entry))
        .filter(|(score, _)| *score > 0)
        .collect();
    ranked.sort_by(|(sa, a), (sb, b)| sb.cmp(sa).then_with(|| a.name.cmp(b.name)));
    ranked.into_iter().map(|(_, entry)| entry).collect()
}

#[derive(Debug, Default)]
pub struct EmojiProvider;

impl EmojiProvider {
    pub fn new() -> Self {
        EmojiProvider
    }
}

impl Provider for EmojiProvider {
    fn name(&self) -> &str {
        "emoji"
    }

    fn results(&mut self, query: &str, mode: SearchMode) -> anyhow::Result<Vec<ResultItem>> {
        if !matches!(mode, SearchMode::All | SearchMode::Emoji) {
            return Ok(Vec::new());
        }

        Ok(search(query)
            .into_iter()
            .take(MAX_ROWS)
            .map(|entry| {
                ResultItem::new(
                    ResultKind::Emoji,
                    format!("{} {}", entry.glyph, entry.name),
                    entry.keywords.join(", "),
                )
                .with_id(format!("emoji:{}", entry.glyph))
                .with_copy_text(entry.glyph)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glyphs(query: &str) -> Vec<&'static str> {
        search(query).into_iter().map(|e| e.glyph).collect()
    }

    #[test]
    fn test_exact_name_outranks_keyword() {
        // "fire" is a name; nothing else mentions it
        assert_eq!(glyphs("fire"), vec!["🔥"]);
        // "face" is a keyword of 😀 and a substring of two other names
        let face = glyphs("face");
        assert_eq!(face[0], "😀");
        assert_eq!(face.len(), 3);
    }

    #[test]
    fn test_ties_break_by_name() {
        // "he" only hits substrings, so every match scores the same
        let names: Vec<_> = search("he").into_iter().map(|e| e.name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_prefix_and_short_terms() {
        assert_eq!(glyphs(":emoji rocket"), vec!["🚀"]);
        assert_eq!(glyphs("emoji party"), vec!["🎉"]);
        assert!(glyphs("r").is_empty());
        assert!(glyphs(":emoji ").is_empty());
        assert!(glyphs("zzz").is_empty());
    }

    #[test]
    fn test_provider_rows() {
        let mut provider = EmojiProvider::new();
        let rows = provider.results("rocket", SearchMode::Emoji).unwrap();
        assert_eq!(rows[0].primary_text, "🚀 rocket");
        assert_eq!(rows[0].secondary_text, "launch, ship, speed");
        assert_eq!(rows[0].id.as_deref(), Some("emoji:🚀"));
        assert!(provider.results("rocket", SearchMode::Files).unwrap().is_empty());
    }
}
