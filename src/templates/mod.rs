//! Prompt template library
//!
//! A static catalog of parameterized prompts. Usage counts are the only
//! mutable part; they are stored per template id and merged back on load.

mod builtin;

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clipboard::code::TEMPLATE_KIND;
use crate::clipboard::{ClipboardError, ClipboardService, CopyReceipt};
use crate::notify::Notifications;
use crate::storage::{Persistence, keys};

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\[\]\n]+)\]").unwrap());

/// Template category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Startup,
    Problem,
    Advanced,
    NewFeatures,
}

impl Category {
    pub const ALL: [Category; 4] =
        [Category::Startup, Category::Problem, Category::Advanced, Category::NewFeatures];

    pub fn label(self) -> &'static str {
        match self {
            Category::Startup => "Project kickoff",
            Category::Problem => "Problem solving",
            Category::Advanced => "Advanced collaboration",
            Category::NewFeatures => "New features",
        }
    }

    /// Identifier used in storage and commands
    pub fn key(self) -> &'static str {
        match self {
            Category::Startup => "startup",
            Category::Problem => "problem",
            Category::Advanced => "advanced",
            Category::NewFeatures => "new-features",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }

    /// Next category, wrapping around
    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        let i = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(i + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Template priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Sort rank, higher first
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }
}

/// A prompt template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub id: String,
    pub category: Category,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub usage: u64,
    pub body: String,
}

impl Template {
    /// Distinct placeholder names in order of first appearance
    pub fn placeholders(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for caps in PLACEHOLDER_RE.captures_iter(&self.body) {
            if let Some(m) = caps.get(1) {
                if !seen.contains(&m.as_str()) {
                    seen.push(m.as_str());
                }
            }
        }
        seen
    }

    fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self.body.to_lowercase().contains(needle)
    }
}

/// Errors that can occur when using a template
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Unknown template '{0}'")]
    NotFound(String),

    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
}

/// Summary numbers for the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateStats {
    pub total: usize,
    pub by_category: BTreeMap<Category, usize>,
    pub total_usage: u64,
    /// Most used template id, once anything has been used
    pub most_used: Option<String>,
}

/// The template library
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: Vec<Template>,
    /// Stored counts for ids not in the catalog, kept on save
    unknown_usage: BTreeMap<String, u64>,
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TemplateCatalog {
    /// The built-in catalog with zero usage
    pub fn builtin() -> Self {
        let templates = builtin::BUILTIN
            .iter()
            .map(|t| Template {
                id: t.id.to_string(),
                category: t.category,
                title: t.title.to_string(),
                description: t.description.to_string(),
                priority: t.priority,
                usage: 0,
                body: t.body.to_string(),
            })
            .collect();
        Self { templates, unknown_usage: BTreeMap::new() }
    }

    /// Merge stored usage counts by template id
    pub fn load_usage(&mut self, persistence: &Persistence) {
        let mut stored: BTreeMap<String, u64> =
            persistence.get(keys::TEMPLATE_USAGE).unwrap_or_default();

        for template in &mut self.templates {
            template.usage = stored.remove(&template.id).unwrap_or(0);
        }
        self.unknown_usage = stored;
    }

    fn save_usage(&self, persistence: &mut Persistence) {
        let mut usage = self.unknown_usage.clone();
        usage.extend(self.templates.iter().map(|t| (t.id.clone(), t.usage)));
        persistence.set(keys::TEMPLATE_USAGE, &usage);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn usage(&self, id: &str) -> u64 {
        self.get(id).map_or(0, |t| t.usage)
    }

    /// Templates of a category, by priority then usage
    pub fn list(&self, category: Category) -> Vec<&Template> {
        let mut list: Vec<&Template> =
            self.templates.iter().filter(|t| t.category == category).collect();
        sort_by_priority(&mut list);
        list
    }

    /// Case-insensitive substring filter over title, description and body
    ///
    /// An empty term lists the category (or everything without one).
    pub fn filter(&self, category: Option<Category>, term: &str) -> Vec<&Template> {
        let needle = term.trim().to_lowercase();
        let mut list: Vec<&Template> = self
            .templates
            .iter()
            .filter(|t| category.is_none_or(|c| t.category == c))
            .filter(|t| needle.is_empty() || t.matches(&needle))
            .collect();
        sort_by_priority(&mut list);
        list
    }

    /// Copy a template body and count the use
    pub fn copy(
        &mut self,
        id: &str,
        clipboard: &mut ClipboardService,
        persistence: &mut Persistence,
        notifications: &mut Notifications,
    ) -> Result<CopyReceipt, TemplateError> {
        let index = self
            .templates
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| TemplateError::NotFound(id.to_string()))?;

        let receipt =
            clipboard.copy(&self.templates[index].body, TEMPLATE_KIND, persistence, notifications)?;

        self.templates[index].usage += 1;
        self.save_usage(persistence);
        tracing::info!(template = id, usage = self.templates[index].usage, "Template used");

        Ok(receipt)
    }

    /// Top `limit` templates by priority then usage
    pub fn recommended(&self, limit: usize) -> Vec<&Template> {
        let mut list: Vec<&Template> = self.templates.iter().collect();
        sort_by_priority(&mut list);
        list.truncate(limit);
        list
    }

    pub fn stats(&self) -> TemplateStats {
        let mut by_category = BTreeMap::new();
        for template in &self.templates {
            *by_category.entry(template.category).or_insert(0) += 1;
        }

        let most_used = self
            .templates
            .iter()
            .filter(|t| t.usage > 0)
            .max_by_key(|t| (t.usage, Reverse(t.id.as_str())))
            .map(|t| t.id.clone());

        TemplateStats {
            total: self.templates.len(),
            by_category,
            total_usage: self.templates.iter().map(|t| t.usage).sum(),
            most_used,
        }
    }
}

fn sort_by_priority(list: &mut [&Template]) {
    list.sort_by_key(|t| (Reverse(t.priority.rank()), Reverse(t.usage)));
}
