//! Table of contents panel
//!
//! Builds the collapsible tree from the document headings and keeps its
//! highlight in step with [`SectionObserver`].

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use super::observer::{Activation, SectionObserver};
use crate::document::Document;
use crate::storage::{Persistence, keys};

/// Deepest heading level shown in the tree
pub const MAX_NAV_LEVEL: u8 = 3;

/// One entry of the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavNode {
    pub id: String,
    pub title: String,
    pub level: u8,
    /// Nesting depth (0 for chapters)
    pub depth: usize,
    /// Index of the parent node
    pub parent: Option<usize>,
    pub has_children: bool,
}

/// A node as currently displayed
#[derive(Debug, Clone, Copy)]
pub struct VisibleEntry<'a> {
    pub index: usize,
    pub node: &'a NavNode,
    pub expanded: bool,
    pub active: bool,
    pub bookmarked: bool,
}

/// Navigation tree with persisted expansion state and bookmarks
#[derive(Debug, Clone, Default)]
pub struct NavigationPanel {
    nodes: Vec<NavNode>,
    /// Stored expanded flags, keyed by node id
    expanded: HashMap<String, bool>,
    /// Ancestors opened to reveal the active entry; not persisted
    forced: HashSet<String>,
    active: Option<String>,
    bookmarks: Vec<String>,
    /// Selected row in the visible list
    pub selected: usize,
    /// First visible row
    pub scroll_offset: usize,
    /// Rows available (updated on render)
    pub visible_height: usize,
}

impl NavigationPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the tree for a document and restore persisted state
    pub fn rebuild(&mut self, document: &Document, persistence: &Persistence) {
        let mut sections: Vec<_> =
            document.sections.iter().filter(|s| s.level <= MAX_NAV_LEVEL).collect();

        // A lone leading H1 is the document title, not a chapter
        let h1_count = sections.iter().filter(|s| s.level == 1).count();
        if sections.len() > 1 && h1_count == 1 && sections[0].level == 1 {
            sections.remove(0);
        }

        let base = sections.iter().map(|s| s.level).min().unwrap_or(1);
        let mut nodes: Vec<NavNode> = Vec::with_capacity(sections.len());
        let mut stack: Vec<usize> = Vec::new();

        for section in sections {
            while let Some(&top) = stack.last() {
                if nodes[top].level < section.level {
                    break;
                }
                stack.pop();
            }

            let parent = stack.last().copied();
            if let Some(p) = parent {
                nodes[p].has_children = true;
            }

            nodes.push(NavNode {
                id: section.id.clone(),
                title: section.title.clone(),
                level: section.level,
                depth: stack.len().min(usize::from(section.level - base)),
                parent,
                has_children: false,
            });
            stack.push(nodes.len() - 1);
        }

        tracing::debug!(nodes = nodes.len(), "Navigation tree built");
        self.nodes = nodes;
        self.forced.clear();
        self.selected = 0;
        self.scroll_offset = 0;
        self.restore(persistence);
    }

    /// Reload expansion state and bookmarks from persistence
    pub fn restore(&mut self, persistence: &Persistence) {
        self.expanded = persistence.get(keys::SECTION_STATES).unwrap_or_default();
        self.bookmarks = persistence.get(keys::BOOKMARKS).unwrap_or_default();
    }

    pub fn nodes(&self) -> &[NavNode] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&NavNode> {
        self.index_of(id).map(|i| &self.nodes[i])
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    /// Top-level entries
    pub fn chapters(&self) -> impl Iterator<Item = &NavNode> {
        self.nodes.iter().filter(|n| n.parent.is_none())
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Whether a node shows its children (expanded unless stored otherwise)
    pub fn is_expanded(&self, id: &str) -> bool {
        self.forced.contains(id) || self.expanded.get(id).copied().unwrap_or(true)
    }

    /// Flip a node's expanded flag and persist the whole map
    ///
    /// Returns the new state, or `None` for leaves and unknown ids.
    pub fn toggle(&mut self, id: &str, persistence: &mut Persistence) -> Option<bool> {
        let node = self.node(id)?;
        if !node.has_children {
            return None;
        }

        let expanded = !self.is_expanded(id);
        self.forced.remove(id);
        self.expanded.insert(id.to_string(), expanded);
        persistence.set(keys::SECTION_STATES, &self.expanded);
        tracing::debug!(section = id, expanded, "Toggled section");

        self.clamp_selection();
        Some(expanded)
    }

    /// Toggle the selected node
    pub fn toggle_selected(&mut self, persistence: &mut Persistence) -> Option<bool> {
        let id = self.selected_id()?.to_string();
        self.toggle(&id, persistence)
    }

    fn ancestors_open(&self, mut index: usize) -> bool {
        while let Some(parent) = self.nodes[index].parent {
            if !self.is_expanded(&self.nodes[parent].id) {
                return false;
            }
            index = parent;
        }
        true
    }

    /// Nodes currently displayed, in order
    pub fn visible_entries(&self) -> Vec<VisibleEntry<'_>> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| self.ancestors_open(*i))
            .map(|(index, node)| VisibleEntry {
                index,
                node,
                expanded: self.is_expanded(&node.id),
                active: self.active.as_deref() == Some(node.id.as_str()),
                bookmarked: self.is_bookmarked(&node.id),
            })
            .collect()
    }

    fn visible_position(&self, id: &str) -> Option<usize> {
        self.visible_entries().iter().position(|e| e.node.id == id)
    }

    /// Reflect an observer activation
    ///
    /// Collapsed ancestors of the new entry are opened. The panel only
    /// scrolls when the activation allows it.
    pub fn apply_activation(&mut self, activation: &Activation) {
        self.active = Some(activation.current.clone());

        if let Some(mut index) = self.index_of(&activation.current) {
            while let Some(parent) = self.nodes[index].parent {
                let parent_id = self.nodes[parent].id.clone();
                if !self.is_expanded(&parent_id) {
                    self.forced.insert(parent_id);
                }
                index = parent;
            }
        }

        if activation.scroll_panel {
            self.reveal_active();
        }
    }

    /// Scroll so that the active entry is on screen
    pub fn reveal_active(&mut self) {
        let Some(position) = self.active.clone().and_then(|id| self.visible_position(&id)) else {
            return;
        };

        if position < self.scroll_offset {
            self.scroll_offset = position;
        }
        let visible = self.visible_height.max(1);
        if position >= self.scroll_offset + visible {
            self.scroll_offset = position + 1 - visible;
        }
    }

    /// Navigate to a section: explicit navigation plus "last viewed"
    pub fn navigate(
        &mut self,
        id: &str,
        observer: &mut SectionObserver,
        persistence: &mut Persistence,
        now: Instant,
    ) -> Activation {
        let activation = observer.navigate_to(id, now);
        persistence.set(keys::ACTIVE_SECTION, id);
        self.apply_activation(&activation);

        if let Some(position) = self.visible_position(id) {
            self.selected = position;
            self.ensure_selection_visible();
        }
        activation
    }

    /// Navigate to the selected entry
    pub fn activate_selected(
        &mut self,
        observer: &mut SectionObserver,
        persistence: &mut Persistence,
        now: Instant,
    ) -> Option<Activation> {
        let id = self.selected_id()?.to_string();
        Some(self.navigate(&id, observer, persistence, now))
    }

    /// Section id stored as last viewed, if it still exists
    pub fn last_viewed(&self, persistence: &Persistence) -> Option<String> {
        let id: String = persistence.get(keys::ACTIVE_SECTION)?;
        self.node(&id).is_some().then_some(id)
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.visible_entries().get(self.selected).map(|e| e.node.id.as_str())
    }

    pub fn move_selection(&mut self, delta: isize) {
        let len = self.visible_entries().len();
        if len == 0 {
            self.selected = 0;
            return;
        }
        self.selected = self.selected.saturating_add_signed(delta).min(len - 1);
        self.ensure_selection_visible();
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
        self.ensure_selection_visible();
    }

    pub fn select_last(&mut self) {
        self.selected = self.visible_entries().len().saturating_sub(1);
        self.ensure_selection_visible();
    }

    fn clamp_selection(&mut self) {
        let len = self.visible_entries().len();
        self.selected = self.selected.min(len.saturating_sub(1));
        self.ensure_selection_visible();
    }

    /// Ensure the selected item is visible by adjusting scroll offset
    pub fn ensure_selection_visible(&mut self) {
        if self.selected < self.scroll_offset {
            self.scroll_offset = self.selected;
        }
        let visible = self.visible_height;
        if visible > 0 && self.selected >= self.scroll_offset + visible {
            self.scroll_offset = self.selected + 1 - visible;
        }
    }

    pub fn bookmarks(&self) -> &[String] {
        &self.bookmarks
    }

    pub fn is_bookmarked(&self, id: &str) -> bool {
        self.bookmarks.iter().any(|b| b == id)
    }

    /// Add or remove a bookmark; returns whether it is now bookmarked
    pub fn toggle_bookmark(&mut self, id: &str, persistence: &mut Persistence) -> bool {
        let bookmarked = if let Some(pos) = self.bookmarks.iter().position(|b| b == id) {
            self.bookmarks.remove(pos);
            false
        } else {
            self.bookmarks.push(id.to_string());
            true
        };
        persistence.set(keys::BOOKMARKS, &self.bookmarks);
        bookmarked
    }
}
