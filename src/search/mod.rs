//! Full-text search over the rendered document
//!
//! The index is rebuilt from scratch on every content-ready event. Queries
//! score every entry; ranking is a stable sort, so equal scores keep index
//! order.

mod history;

use std::fmt;

pub use history::{MAX_HISTORY, SearchHistory};

use crate::document::{ContentBlock, Document};
use crate::navigation::NavigationPanel;
use crate::storage::Persistence;
use crate::templates::TemplateCatalog;

/// Shortest query that runs a search, in characters
pub const MIN_QUERY_CHARS: usize = 2;

/// Most results returned
pub const MAX_RESULTS: usize = 20;

/// Shortest paragraph or list item that gets indexed, in characters
pub const MIN_CONTENT_CHARS: usize = 20;

/// Characters of context on each side of a preview match
const PREVIEW_CONTEXT: usize = 50;

/// What an entry was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Navigation,
    Heading,
    Content,
    Code,
    Template,
}

impl EntryKind {
    /// Score multiplier
    pub fn weight(self) -> f64 {
        match self {
            EntryKind::Navigation => 1.5,
            EntryKind::Heading => 1.3,
            EntryKind::Template => 1.2,
            EntryKind::Code => 1.0,
            EntryKind::Content => 0.8,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EntryKind::Navigation => "Navigation",
            EntryKind::Heading => "Heading",
            EntryKind::Content => "Content",
            EntryKind::Code => "Code",
            EntryKind::Template => "Template",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where activating a result leads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryTarget {
    /// A heading id
    Section(String),
    /// A template id
    Template(String),
    /// Content before the first heading
    Top,
}

/// One searchable item
#[derive(Debug, Clone, PartialEq)]
pub struct SearchEntry {
    pub kind: EntryKind,
    pub title: String,
    /// Full text
    pub content: String,
    pub target: EntryTarget,
    /// Title of the nearest preceding heading
    pub context: Option<String>,
}

/// A scored entry
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub entry: SearchEntry,
    pub score: f64,
}

/// Index statistics
#[derive(Debug, Clone, PartialEq)]
pub struct SearchStats {
    pub index_size: usize,
    pub last_query: Option<String>,
    pub result_count: usize,
    pub history: Vec<String>,
}

/// In-memory scored index
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    entries: Vec<SearchEntry>,
    last_query: Option<String>,
    result_count: usize,
}

impl SearchIndex {
    /// Index navigation entries, headings, text, code and templates
    pub fn build(document: &Document, nav: &NavigationPanel, templates: &TemplateCatalog) -> Self {
        let mut entries = Vec::new();

        for node in nav.nodes() {
            entries.push(SearchEntry {
                kind: EntryKind::Navigation,
                title: node.title.clone(),
                content: node.title.clone(),
                target: EntryTarget::Section(node.id.clone()),
                context: None,
            });
        }

        for section in &document.sections {
            entries.push(SearchEntry {
                kind: EntryKind::Heading,
                title: section.title.clone(),
                content: section.title.clone(),
                target: EntryTarget::Section(section.id.clone()),
                context: None,
            });
        }

        for (index, block) in document.blocks.iter().enumerate() {
            let heading = document.heading_before(index);
            let context = heading.map(|h| h.title.clone());
            let target =
                heading.map_or(EntryTarget::Top, |h| EntryTarget::Section(h.id.clone()));

            let text_entry = |text: &str| {
                let text = text.trim();
                (text.chars().count() >= MIN_CONTENT_CHARS).then(|| SearchEntry {
                    kind: EntryKind::Content,
                    title: context.clone().unwrap_or_else(|| "Content".to_string()),
                    content: text.to_string(),
                    target: target.clone(),
                    context: context.clone(),
                })
            };

            match block {
                ContentBlock::Paragraph(text) | ContentBlock::Blockquote(text) => {
                    entries.extend(text_entry(text));
                }
                ContentBlock::UnorderedList(items) | ContentBlock::OrderedList(items) => {
                    entries.extend(items.iter().filter_map(|item| text_entry(item)));
                }
                ContentBlock::Checklist(items) => {
                    entries.extend(items.iter().filter_map(|item| text_entry(&item.text)));
                }
                ContentBlock::Code(code) => {
                    let text = code.code.trim();
                    if !text.is_empty() {
                        entries.push(SearchEntry {
                            kind: EntryKind::Code,
                            title: context
                                .as_ref()
                                .map_or_else(|| "Code block".to_string(), |c| format!("{c} - code")),
                            content: text.to_string(),
                            target: target.clone(),
                            context: context.clone(),
                        });
                    }
                }
                _ => {}
            }
        }

        for template in templates.iter() {
            entries.push(SearchEntry {
                kind: EntryKind::Template,
                title: template.title.clone(),
                content: format!("{} {} {}", template.title, template.description, template.body),
                target: EntryTarget::Template(template.id.clone()),
                context: None,
            });
        }

        tracing::debug!(entries = entries.len(), "Search index built");
        Self { entries, last_query: None, result_count: 0 }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[SearchEntry] {
        &self.entries
    }

    /// Rank entries for a query
    ///
    /// Queries shorter than [`MIN_QUERY_CHARS`] return nothing.
    pub fn search(&self, query: &str, templates: &TemplateCatalog) -> Vec<SearchResult> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            return Vec::new();
        }

        let query_lower = query.to_lowercase();
        let words: Vec<&str> = query_lower.split_whitespace().collect();

        let mut results: Vec<SearchResult> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let usage = match &entry.target {
                    EntryTarget::Template(id) => templates.usage(id),
                    _ => 0,
                };
                let score = score_entry(entry, &query_lower, &words, usage);
                (score > 0.0).then(|| SearchResult { entry: entry.clone(), score })
            })
            .collect();

        // Stable: equal scores keep index order
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(MAX_RESULTS);
        results
    }

    /// Search and record the query in the history
    ///
    /// Short queries clear the results and leave the history alone.
    pub fn perform(
        &mut self,
        query: &str,
        templates: &TemplateCatalog,
        history: &mut SearchHistory,
        persistence: &mut Persistence,
    ) -> Vec<SearchResult> {
        if query.trim().chars().count() < MIN_QUERY_CHARS {
            self.result_count = 0;
            return Vec::new();
        }

        let results = self.search(query, templates);
        tracing::debug!(query, results = results.len(), "Search");

        self.last_query = Some(query.trim().to_string());
        self.result_count = results.len();
        history.record(query, persistence);
        results
    }

    pub fn stats(&self, history: &SearchHistory) -> SearchStats {
        SearchStats {
            index_size: self.entries.len(),
            last_query: self.last_query.clone(),
            result_count: self.result_count,
            history: history.entries().to_vec(),
        }
    }
}

/// Relevance of one entry
pub fn score_entry(entry: &SearchEntry, query_lower: &str, words: &[&str], usage: u64) -> f64 {
    let title = entry.title.to_lowercase();
    let content = entry.content.to_lowercase();
    let mut score = 0.0;

    if title == query_lower {
        score += 100.0;
    } else if title.contains(query_lower) {
        score += 50.0;
    } else {
        score += 20.0 * words.iter().filter(|w| title.contains(**w)).count() as f64;
    }

    if content.contains(query_lower) {
        score += 30.0;
    } else {
        score += 5.0 * words.iter().map(|w| content.matches(*w).count()).sum::<usize>() as f64;
    }

    score *= entry.kind.weight();
    score + 2.0 * usage as f64
}

/// Snippet of an entry around the first match of `query`
///
/// Template entries preview their description instead.
pub fn preview(entry: &SearchEntry, query: &str, templates: &TemplateCatalog) -> Option<String> {
    if let EntryTarget::Template(id) = &entry.target {
        return templates.get(id).map(|t| t.description.clone());
    }

    let fold = |c: char| c.to_lowercase().next().unwrap_or(c);
    let content: Vec<char> = entry.content.chars().collect();
    let folded: Vec<char> = content.iter().copied().map(fold).collect();
    let needle: Vec<char> = query.trim().chars().map(fold).collect();

    if needle.is_empty() || needle.len() > folded.len() {
        return None;
    }
    let index = folded.windows(needle.len()).position(|w| w == needle.as_slice())?;

    let start = index.saturating_sub(PREVIEW_CONTEXT);
    let end = (index + needle.len() + PREVIEW_CONTEXT).min(content.len());

    let mut snippet = String::new();
    if start > 0 {
        snippet.push_str("...");
    }
    snippet.extend(&content[start..end]);
    if end < content.len() {
        snippet.push_str("...");
    }
    Some(snippet)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::document::ContentRenderer;
    use crate::storage::keys;

    const DOC: &str = "# Guide

## Installation

Install the command line tool with your package manager of choice.

```bash
npm install -g the-tool
```

## Usage

- Run the tool inside your project directory to start a session.
";

    fn fixture() -> (SearchIndex, TemplateCatalog) {
        let rendered = ContentRenderer::default().render(DOC);
        let persistence = Persistence::in_memory();
        let mut nav = NavigationPanel::new();
        nav.rebuild(&rendered.document, &persistence);
        let templates = TemplateCatalog::builtin();
        (SearchIndex::build(&rendered.document, &nav, &templates), templates)
    }

    fn entry(kind: EntryKind, title: &str, content: &str) -> SearchEntry {
        SearchEntry {
            kind,
            title: title.into(),
            content: content.into(),
            target: EntryTarget::Top,
            context: None,
        }
    }

    #[test]
    fn index_covers_every_kind() {
        let (index, templates) = fixture();
        let count = |kind| index.entries().iter().filter(|e| e.kind == kind).count();

        assert_eq!(count(EntryKind::Navigation), 2);
        assert_eq!(count(EntryKind::Heading), 3);
        assert_eq!(count(EntryKind::Content), 2);
        assert_eq!(count(EntryKind::Code), 1);
        assert_eq!(count(EntryKind::Template), templates.iter().count());
    }

    #[test]
    fn code_entries_carry_heading_context() {
        let (index, _) = fixture();
        let code = index.entries().iter().find(|e| e.kind == EntryKind::Code).unwrap();
        assert_eq!(code.title, "Installation - code");
        assert_eq!(code.target, EntryTarget::Section("installation".into()));
    }

    #[test]
    fn scoring_matches_weights() {
        let e = entry(EntryKind::Heading, "Installation", "Installation");
        // exact title (100) + content substring (30), times 1.3
        assert!((score_entry(&e, "installation", &["installation"], 0) - 169.0).abs() < 1e-9);

        let e = entry(EntryKind::Content, "Usage", "run run run");
        // no title match, no full-content match, three word hits
        assert!((score_entry(&e, "run fast", &["run", "fast"], 0) - 12.0).abs() < 1e-9);
    }

    #[test]
    fn usage_bonus_applies_without_a_match() {
        let e = entry(EntryKind::Template, "Bug report", "Bug report");
        assert_eq!(score_entry(&e, "zzz", &["zzz"], 0), 0.0);
        assert_eq!(score_entry(&e, "zzz", &["zzz"], 3), 6.0);
        assert!(score_entry(&e, "bug", &["bug"], 10) > score_entry(&e, "bug", &["bug"], 0));
    }

    #[test]
    fn used_templates_surface_for_any_query() {
        let (index, mut templates) = fixture();
        let mut persistence = Persistence::in_memory();
        let usage: std::collections::BTreeMap<&str, u64> = [("tool-dev-quick", 3)].into();
        persistence.set(keys::TEMPLATE_USAGE, &usage);
        templates.load_usage(&persistence);

        let results = index.search("zzz", &templates);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entry.target, EntryTarget::Template("tool-dev-quick".into()));
        assert_eq!(results[0].score, 6.0);
    }

    #[test]
    fn short_query_yields_nothing_and_keeps_history() {
        let (mut index, templates) = fixture();
        let mut persistence = Persistence::in_memory();
        let mut history = SearchHistory::default();

        assert!(index.perform("i", &templates, &mut history, &mut persistence).is_empty());
        assert!(history.entries().is_empty());
        assert_eq!(persistence.get::<Vec<String>>(keys::SEARCHES), None);
    }

    #[test]
    fn perform_records_history() {
        let (mut index, templates) = fixture();
        let mut persistence = Persistence::in_memory();
        let mut history = SearchHistory::default();

        let results = index.perform("install", &templates, &mut history, &mut persistence);
        assert!(!results.is_empty());
        assert_eq!(results[0].entry.kind, EntryKind::Navigation);
        assert_eq!(history.entries(), ["install"]);
        assert_eq!(index.stats(&history).result_count, results.len());
    }

    #[test]
    fn equal_scores_keep_index_order() {
        let mut index = SearchIndex::default();
        index.entries = vec![
            entry(EntryKind::Content, "alpha", "same text here"),
            entry(EntryKind::Content, "beta", "same text here"),
            entry(EntryKind::Content, "gamma", "same text here"),
        ];

        let titles: Vec<_> = index
            .search("same text", &TemplateCatalog::builtin())
            .into_iter()
            .map(|r| r.entry.title)
            .collect();
        assert_eq!(titles, ["alpha", "beta", "gamma"]);
    }

    #[test]
    fn results_are_capped() {
        let mut index = SearchIndex::default();
        index.entries = (0..30).map(|i| entry(EntryKind::Content, &format!("t{i}"), "needle")).collect();
        assert_eq!(index.search("needle", &TemplateCatalog::builtin()).len(), MAX_RESULTS);
    }

    #[test]
    fn preview_windows_the_match() {
        let templates = TemplateCatalog::builtin();
        let long = format!("{}MATCH{}", "a".repeat(80), "b".repeat(80));
        let e = entry(EntryKind::Content, "t", &long);

        let snippet = preview(&e, "match", &templates).unwrap();
        assert_eq!(snippet, format!("...{}MATCH{}...", "a".repeat(50), "b".repeat(50)));
        assert_eq!(preview(&e, "absent", &templates), None);
    }

    #[test]
    fn preview_handles_multibyte_text() {
        let templates = TemplateCatalog::builtin();
        let e = entry(EntryKind::Content, "t", "上下文管理专精");
        assert_eq!(preview(&e, "管理", &templates).as_deref(), Some("上下文管理专精"));
    }

    #[test]
    fn template_preview_is_description() {
        let templates = TemplateCatalog::builtin();
        let mut e = entry(EntryKind::Template, "t", "x");
        e.target = EntryTarget::Template("bug-report".into());
        assert_eq!(preview(&e, "x", &templates).as_deref(), Some("Structured problem report"));
    }
}
