//! Content model for a rendered document
//!
//! A document is an ordered list of content blocks. Headings carry the stable
//! id shared by the content view, the navigation tree and the search index.

use serde::{Deserialize, Serialize};

/// A fully parsed document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// Display title (first level-1 heading)
    pub title: String,
    /// Content blocks in order
    pub blocks: Vec<ContentBlock>,
    /// Headings in document order
    pub sections: Vec<Section>,
}

impl Document {
    /// Build a document from blocks, deriving title and sections
    pub fn from_blocks(blocks: Vec<ContentBlock>) -> Self {
        let sections: Vec<Section> = blocks
            .iter()
            .enumerate()
            .filter_map(|(block, b)| match b {
                ContentBlock::Heading { level, text, id } => {
                    Some(Section { id: id.clone(), title: text.clone(), level: *level, block })
                }
                _ => None,
            })
            .collect();

        let title = sections
            .iter()
            .find(|s| s.level == 1)
            .or_else(|| sections.first())
            .map_or_else(|| "Untitled".to_string(), |s| s.title.clone());

        Self { title, blocks, sections }
    }

    /// Find a section by id; with duplicate ids the last one wins
    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().rev().find(|s| s.id == id)
    }

    /// The nearest heading at or before a block
    pub fn heading_before(&self, block: usize) -> Option<&Section> {
        self.sections.iter().take_while(|s| s.block <= block).last()
    }

    /// All checklist items in document order
    pub fn checklist(&self) -> impl Iterator<Item = &ChecklistItem> {
        self.blocks.iter().flat_map(|b| match b {
            ContentBlock::Checklist(items) => items.as_slice(),
            _ => &[],
        })
    }

    /// Word count across all blocks
    pub fn word_count(&self) -> usize {
        self.blocks.iter().map(ContentBlock::word_count).sum()
    }
}

/// A heading, identifying both a content position and a navigation entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Unique, URL-safe id
    pub id: String,
    /// Heading text
    pub title: String,
    /// Heading level (1-6)
    pub level: u8,
    /// Index of the heading block in [`Document::blocks`]
    pub block: usize,
}

/// A block of content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContentBlock {
    /// A heading (level 1-6)
    Heading { level: u8, text: String, id: String },
    /// A paragraph of text
    Paragraph(String),
    /// A code block with optional language annotation
    Code(CodeBlock),
    /// An unordered list
    UnorderedList(Vec<String>),
    /// An ordered list
    OrderedList(Vec<String>),
    /// A task list whose items are manual checkpoints
    Checklist(Vec<ChecklistItem>),
    /// A blockquote
    Blockquote(String),
    /// An image reference, loaded lazily by HTML consumers
    Image { alt: String, src: String },
    /// A horizontal rule
    HorizontalRule,
    /// A table
    Table(Table),
}

impl ContentBlock {
    /// Estimate word count for this block
    pub fn word_count(&self) -> usize {
        match self {
            ContentBlock::Heading { text, .. } => text.split_whitespace().count(),
            ContentBlock::Paragraph(text) | ContentBlock::Blockquote(text) => {
                text.split_whitespace().count()
            }
            ContentBlock::Code(code) => code.code.split_whitespace().count() / 3,
            ContentBlock::UnorderedList(items) | ContentBlock::OrderedList(items) => {
                items.iter().map(|s| s.split_whitespace().count()).sum()
            }
            ContentBlock::Checklist(items) => {
                items.iter().map(|i| i.text.split_whitespace().count()).sum()
            }
            ContentBlock::Image { .. } | ContentBlock::HorizontalRule => 0,
            ContentBlock::Table(table) => table.word_count(),
        }
    }
}

/// A code block with language annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    /// The actual code content
    pub code: String,
    /// Language from the fence info string
    pub language: Option<String>,
}

impl CodeBlock {
    /// Create a new code block
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into(), language: None }
    }

    /// Set the language
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// One `- [ ]` entry of a task list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    /// Checkpoint id (`manual-checkpoint-{n}`, numbered in document order)
    pub id: String,
    /// Item text
    pub text: String,
    /// Checked state written in the source
    pub checked: bool,
}

/// A table structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Header row
    pub headers: Vec<String>,
    /// Data rows
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Create a new table
    pub fn new(headers: Vec<String>) -> Self {
        Self { headers, rows: Vec::new() }
    }

    /// Word count for the table
    pub fn word_count(&self) -> usize {
        let header_words: usize = self.headers.iter().map(|s| s.split_whitespace().count()).sum();
        let row_words: usize =
            self.rows.iter().flat_map(|row| row.iter().map(|s| s.split_whitespace().count())).sum();
        header_words + row_words
    }
}
