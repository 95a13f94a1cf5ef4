//! Heading id generation

use std::collections::{HashMap, HashSet};

/// Maximum length of a generated id, in characters
pub const MAX_SLUG_CHARS: usize = 50;

/// Id used when a heading produces an empty slug
const FALLBACK_ID: &str = "section";

/// Built-in heading text to id table for the tutorial's chapters
///
/// Keeps bookmarks and stored progress valid across edits of the heading
/// wording elsewhere in the document.
const BUILTIN_IDS: &[(&str, &str)] = &[
    ("第1章：5分钟快速入门", "chapter-1"),
    ("第2章：完整提问流程", "chapter-2"),
    ("第3章：上下文管理专精", "chapter-3"),
    ("第4章：2025新功能应用", "chapter-4"),
    ("第5章：实用工具箱", "chapter-5"),
    ("第6章：进阶实战练习", "chapter-6"),
];

/// Turn heading text into a URL-safe id
///
/// Letters and digits of any script are kept (lowercased); every other run of
/// characters becomes a single `-`. The result never starts or ends with `-`
/// and is at most [`MAX_SLUG_CHARS`] characters long.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_separator = false;
    let mut len = 0;

    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_separator && len > 0 {
                if len + 1 >= MAX_SLUG_CHARS {
                    break;
                }
                slug.push('-');
                len += 1;
            }
            pending_separator = false;
            for lower in c.to_lowercase() {
                if len >= MAX_SLUG_CHARS {
                    break;
                }
                slug.push(lower);
                len += 1;
            }
            if len >= MAX_SLUG_CHARS {
                break;
            }
        } else {
            pending_separator = true;
        }
    }

    slug
}

/// Curated heading text to id lookup
#[derive(Debug, Clone)]
pub struct CuratedIds {
    map: HashMap<String, String>,
}

impl Default for CuratedIds {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CuratedIds {
    /// The built-in table
    pub fn builtin() -> Self {
        let map = BUILTIN_IDS.iter().map(|(text, id)| (text.to_string(), id.to_string())).collect();
        Self { map }
    }

    /// An empty table
    pub fn empty() -> Self {
        Self { map: HashMap::new() }
    }

    /// Add entries, overriding built-in ones with the same text
    pub fn extend<I, K, V>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.map.extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
    }

    /// Look up the id for heading text (surrounding whitespace ignored)
    pub fn get(&self, text: &str) -> Option<&str> {
        self.map.get(text.trim()).map(String::as_str)
    }
}

/// Assigns ids to the headings of one render pass
///
/// Explicit and curated ids are used verbatim. Generated ids that collide
/// with an id already handed out get a `-2`, `-3`, ... suffix. A generated
/// id can still match an explicit or curated id of a later heading; lookups
/// then resolve to the last heading registered under that id.
#[derive(Debug)]
pub struct HeadingIds<'a> {
    curated: &'a CuratedIds,
    used: HashSet<String>,
}

impl<'a> HeadingIds<'a> {
    pub fn new(curated: &'a CuratedIds) -> Self {
        Self { curated, used: HashSet::new() }
    }

    /// Id for a heading with the given text and optional explicit id
    pub fn assign(&mut self, text: &str, explicit: Option<&str>) -> String {
        if let Some(id) = explicit.filter(|id| !id.is_empty()) {
            self.used.insert(id.to_string());
            return id.to_string();
        }

        if let Some(id) = self.curated.get(text) {
            self.used.insert(id.to_string());
            return id.to_string();
        }

        let mut base = slugify(text);
        if base.is_empty() {
            base = FALLBACK_ID.to_string();
        }

        let mut candidate = base.clone();
        let mut n = 2;
        while self.used.contains(&candidate) {
            tracing::debug!(id = %base, "Heading id collision, adding suffix");
            candidate = format!("{base}-{n}");
            n += 1;
        }

        self.used.insert(candidate.clone());
        candidate
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn slug_basic() {
        assert_eq!(slugify("Getting Started"), "getting-started");
        assert_eq!(slugify("  Hello, World!  "), "hello-world");
    }

    #[test]
    fn slug_keeps_source_script() {
        assert_eq!(slugify("第3章 上下文管理"), "第3章-上下文管理");
        assert_eq!(slugify("Ünïcode Tëxt"), "ünïcode-tëxt");
    }

    #[test]
    fn slug_collapses_separator_runs() {
        assert_eq!(slugify("a -- b __ c"), "a-b-c");
    }

    #[test]
    fn slug_of_punctuation_is_empty() {
        assert_eq!(slugify("!!! ???"), "");
    }

    #[test]
    fn slug_is_capped() {
        let long = "word ".repeat(40);
        let slug = slugify(&long);
        assert!(slug.chars().count() <= MAX_SLUG_CHARS);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn curated_id_wins_over_slug() {
        let curated = CuratedIds::builtin();
        let mut ids = HeadingIds::new(&curated);
        assert_eq!(ids.assign("第1章：5分钟快速入门", None), "chapter-1");
    }

    #[test]
    fn explicit_id_wins_over_curated() {
        let curated = CuratedIds::builtin();
        let mut ids = HeadingIds::new(&curated);
        assert_eq!(ids.assign("第1章：5分钟快速入门", Some("intro")), "intro");
    }

    #[test]
    fn extended_table_overrides() {
        let mut curated = CuratedIds::empty();
        curated.extend([("Setup", "install")]);
        let mut ids = HeadingIds::new(&curated);
        assert_eq!(ids.assign("  Setup ", None), "install");
    }

    #[test]
    fn generated_collisions_get_suffix() {
        let curated = CuratedIds::empty();
        let mut ids = HeadingIds::new(&curated);
        assert_eq!(ids.assign("Example", None), "example");
        assert_eq!(ids.assign("Example", None), "example-2");
        assert_eq!(ids.assign("Example!", None), "example-3");
    }

    #[test]
    fn empty_slug_uses_fallback() {
        let curated = CuratedIds::empty();
        let mut ids = HeadingIds::new(&curated);
        assert_eq!(ids.assign("???", None), "section");
        assert_eq!(ids.assign("!!!", None), "section-2");
    }

    proptest! {
        #[test]
        fn slug_is_deterministic(text in "\\PC{0,120}") {
            prop_assert_eq!(slugify(&text), slugify(&text));
        }

        #[test]
        fn slug_has_no_edge_separator_and_is_bounded(text in "\\PC{0,120}") {
            let slug = slugify(&text);
            prop_assert!(!slug.starts_with('-'));
            prop_assert!(!slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
            prop_assert!(slug.chars().count() <= MAX_SLUG_CHARS);
        }
    }
}
