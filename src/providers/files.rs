//! File results over entries supplied by the host's indexer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::web_search::UrlOpener;
use super::Provider;
use crate::error::ResultExt;
use crate::model::{ResultItem, ResultKind, SearchMode};

const DEFAULT_MAX_FILE_ROWS: usize = 12;

/// One indexed file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
}

pub type FileLoader = Box<dyn FnMut() -> anyhow::Result<Vec<FileEntry>> + Send>;

fn compact(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Lexical score of `query` against a file name and path; `<= 0` means no
/// match.
pub fn score_file_match(query: &str, name: &str, path: &str) -> f64 {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return 0.0;
    }
    let name = name.to_lowercase();
    let path = path.to_lowercase();

    let mut score = 0.0;
    if name == q {
        score += 120.0;
    }
    if name.starts_with(&q) {
        score += 70.0;
    }
    if name.contains(&q) {
        score += 45.0;
    }
    if path.contains(&q) {
        score += 20.0;
    }
    let compact_query = compact(&q);
    if !compact_query.is_empty() && compact(&name).contains(&compact_query) {
        score += 20.0;
    }

    let extra = name.chars().count().saturating_sub(q.chars().count());
    score - extra as f64 * 0.1
}

/// Best matching entries, score descending then name ascending.
pub fn filter_entries<'a>(entries: &'a [FileEntry], query: &str, limit: usize) -> Vec<&'a FileEntry> {
    let mut scored: Vec<(f64, &FileEntry)> = entries
        .iter()
        .map(|entry| (score_file_match(query, &entry.name, &entry.path), entry))
        .filter(|(score, _)| score.is_finite() && *score > 0.0)
        .collect();
    scored.sort_by(|(sa, a), (sb, b)| sb.total_cmp(sa).then_with(|| a.name.cmp(&b.name)));
    scored.into_iter().take(limit).map(|(_, entry)| entry).collect()
}

pub struct FilesProvider {
    entries: Vec<FileEntry>,
    loader: Option<FileLoader>,
    opener: Option<UrlOpener>,
    max_rows: usize,
}

impl Default for FilesProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FilesProvider {
    pub fn new() -> Self {
        FilesProvider {
            entries: Vec::new(),
            loader: None,
            opener: None,
            max_rows: DEFAULT_MAX_FILE_ROWS,
        }
    }

    pub fn with_loader(mut self, loader: FileLoader) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn with_opener(mut self, opener: UrlOpener) -> Self {
        self.opener = Some(opener);
        self
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows.max(1);
        self
    }

    pub fn set_entries(&mut self, entries: Vec<FileEntry>) {
        self.entries = entries;
    }

    fn row(&self, entry: &FileEntry) -> ResultItem {
        let mut row = ResultItem::new(ResultKind::File, entry.name.clone(), entry.path.clone())
            .with_id(format!("file:{}", entry.path))
            .with_search_text(format!("{} {}", entry.name, entry.path));
        if let Some(opener) = &self.opener {
            let opener = Arc::clone(opener);
            let path = entry.path.clone();
            row = row.with_execute(Arc::new(move || opener(&path)));
        }
        row
    }
}

impl Provider for FilesProvider {
    fn name(&self) -> &str {
        "files"
    }

    fn results(&mut self, query: &str, mode: SearchMode) -> anyhow::Result<Vec<ResultItem>> {
        if !matches!(mode, SearchMode::All | SearchMode::Files) || query.trim().is_empty() {
            return Ok(Vec::new());
        }
        if self.entries.is_empty() {
            self.refresh();
        }

        Ok(filter_entries(&self.entries, query, self.max_rows)
            .into_iter()
            .map(|entry| self.row(entry))
            .collect())
    }

    fn refresh(&mut self) {
        if let Some(loader) = self.loader.as_mut() {
            if let Some(entries) = loader().warn_on_err() {
                self.entries = entries;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn entry(name: &str, path: &str) -> FileEntry {
        FileEntry {
            name: name.into(),
            path: path.into(),
        }
    }

    #[test]
    fn test_score_components() {
        // exact + prefix + contains + path + compact
        assert_eq!(score_file_match("notes.md", "notes.md", "/home/u/notes.md"), 275.0);
        // prefix + contains + path + compact, minus 0.1 per extra char
        let prefix = score_file_match("rep", "report.pdf", "/docs/report.pdf");
        assert!((prefix - (70.0 + 45.0 + 20.0 + 20.0 - 0.7)).abs() < 1e-9);
        // only the directory matches
        let dir_only = score_file_match("docs", "a.txt", "/docs/a.txt");
        assert!((dir_only - 19.9).abs() < 1e-9);
        assert_eq!(score_file_match("   ", "a", "/a"), 0.0);
    }

    #[test]
    fn test_compact_forms_match_across_separators() {
        let score = score_file_match("my-report", "my_report.txt", "/x/my_report.txt");
        assert!(score > 0.0);
        assert!(score_file_match("zzz", "a.txt", "/a.txt") <= 0.0);
    }

    #[test]
    fn test_filter_orders_by_score_then_name() {
        let entries = vec![
            entry("b-report.txt", "/d/b-report.txt"),
            entry("report.txt", "/d/report.txt"),
            entry("a-report.txt", "/d/a-report.txt"),
            entry("unrelated.txt", "/d/unrelated.txt"),
        ];
        let names: Vec<_> = filter_entries(&entries, "report", 10)
            .into_iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["report.txt", "a-report.txt", "b-report.txt"]);
        assert_eq!(filter_entries(&entries, "report", 1).len(), 1);
    }

    #[test]
    fn test_provider_loads_lazily_and_builds_rows() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let mut files = FilesProvider::new().with_loader(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec![entry("todo.txt", "/home/u/todo.txt")])
        }));

        assert!(files.results("", SearchMode::Files).unwrap().is_empty());
        assert_eq!(loads.load(Ordering::SeqCst), 0);

        let rows = files.results("todo", SearchMode::Files).unwrap();
        assert_eq!(rows[0].primary_text, "todo.txt");
        assert_eq!(rows[0].secondary_text, "/home/u/todo.txt");
        assert_eq!(rows[0].id.as_deref(), Some("file:/home/u/todo.txt"));
        assert!(rows[0].execute.is_none());

        files.results("todo", SearchMode::All).unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(files.results("todo", SearchMode::Emoji).unwrap().is_empty());
    }

    #[test]
    fn test_failed_refresh_keeps_entries() {
        let mut files = FilesProvider::new()
            .with_loader(Box::new(|| -> anyhow::Result<Vec<FileEntry>> {
                anyhow::bail!("index unavailable")
            }));
        files.set_entries(vec![entry("keep.txt", "/keep.txt")]);
        files.refresh();
        assert_eq!(files.results("keep", SearchMode::Files).unwrap().len(), 1);
    }
}
