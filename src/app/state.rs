//! Application state definitions

use std::time::{Duration, Instant};

use ratatui::text::Line;

use crate::config::Config;
use crate::document::Document;
use crate::navigation::{NavigationPanel, SectionObserver};
use crate::notify::Notifications;
use crate::progress::ProgressTracker;
use crate::search::{SearchHistory, SearchIndex, SearchResult};
use crate::storage::Persistence;
use crate::templates::{Category, TemplateCatalog};

/// Which screen is currently displayed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    /// Document load in flight
    Loading { source: String },
    /// Document load failed
    Error { message: String, retryable: bool },
    Reader,
}

/// Which panel receives movement keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Panel {
    Navigation,
    #[default]
    Content,
}

/// A code block's position in the laid out content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeAnchor {
    /// Index into `Document::blocks`
    pub block: usize,
    /// First and one-past-last line
    pub start: usize,
    pub end: usize,
}

/// Content laid out for one width
#[derive(Debug, Clone, Default)]
pub struct ContentLayout {
    pub width: usize,
    pub lines: Vec<Line<'static>>,
    /// Heading ids with their line, in document order
    pub headings: Vec<(String, usize)>,
    pub code_blocks: Vec<CodeAnchor>,
}

impl ContentLayout {
    pub fn heading_line(&self, id: &str) -> Option<usize> {
        // last registration wins, as for id lookup
        self.headings.iter().rev().find(|(h, _)| h == id).map(|(_, line)| *line)
    }
}

/// Eased programmatic scroll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollAnimation {
    pub from: usize,
    pub to: usize,
    pub started: Instant,
    pub duration: Duration,
}

impl ScrollAnimation {
    /// Scroll offset at `now`
    pub fn position(&self, now: Instant) -> usize {
        if self.duration.is_zero() {
            return self.to;
        }
        let t = (now.saturating_duration_since(self.started).as_secs_f64()
            / self.duration.as_secs_f64())
        .clamp(0.0, 1.0);
        // ease-in-out cubic
        let eased = if t < 0.5 { 4.0 * t * t * t } else { 1.0 - (-2.0 * t + 2.0).powi(3) / 2.0 };
        let delta = self.to as f64 - self.from as f64;
        (self.from as f64 + delta * eased).round().max(0.0) as usize
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started) >= self.duration
    }
}

/// State for content rendering
#[derive(Debug, Clone, Default)]
pub struct ContentState {
    /// Current scroll position (lines from top)
    pub scroll_offset: usize,
    /// Total rendered lines (updated on render)
    pub total_lines: usize,
    /// Visible height in lines (updated on render)
    pub visible_height: usize,
    /// Cached layout, rebuilt when the width changes or it is invalidated
    pub layout: Option<ContentLayout>,
    pub animation: Option<ScrollAnimation>,
    /// Heading to scroll to once a layout exists
    pub pending_target: Option<String>,
    /// Geometry the last visibility batch was measured with
    pub last_measured: Option<(usize, usize, usize)>,
}

impl ContentState {
    /// Get the maximum allowed scroll offset
    pub fn max_scroll(&self) -> usize {
        self.total_lines.saturating_sub(self.visible_height / 2)
    }

    /// Clamp scroll offset to valid range
    pub fn clamp_scroll(&mut self) {
        self.scroll_offset = self.scroll_offset.min(self.max_scroll());
    }

    /// Reader-driven scroll; cancels any animation
    pub fn scroll_by(&mut self, delta: isize) {
        self.animation = None;
        self.scroll_offset = self.scroll_offset.saturating_add_signed(delta);
        self.clamp_scroll();
    }

    pub fn scroll_to(&mut self, line: usize) {
        self.animation = None;
        self.scroll_offset = line;
        self.clamp_scroll();
    }

    /// Start an eased scroll toward `target`
    pub fn animate_to(&mut self, target: usize, now: Instant, duration: Duration) {
        let target = target.min(self.max_scroll());
        self.animation =
            Some(ScrollAnimation { from: self.scroll_offset, to: target, started: now, duration });
    }

    /// Advance the animation; returns true while one is running
    pub fn step_animation(&mut self, now: Instant) -> bool {
        let Some(animation) = self.animation else {
            return false;
        };
        self.scroll_offset = animation.position(now);
        if animation.is_finished(now) {
            self.animation = None;
        }
        true
    }

    pub fn heading_line(&self, id: &str) -> Option<usize> {
        self.layout.as_ref()?.heading_line(id)
    }

    /// Force a relayout on the next draw
    pub fn invalidate(&mut self) {
        self.layout = None;
    }

    /// Whether the viewport moved since the last visibility batch
    pub fn needs_measure(&self) -> bool {
        self.layout.is_some()
            && self.last_measured
                != Some((self.scroll_offset, self.total_lines, self.visible_height))
    }

    pub fn mark_measured(&mut self) {
        self.last_measured = Some((self.scroll_offset, self.total_lines, self.visible_height));
    }

    /// Topmost code block that is at least partly on screen
    pub fn code_block_in_view(&self) -> Option<usize> {
        let layout = self.layout.as_ref()?;
        let top = self.scroll_offset;
        let bottom = top + self.visible_height.max(1);
        layout
            .code_blocks
            .iter()
            .find(|anchor| anchor.end > top && anchor.start < bottom)
            .map(|anchor| anchor.block)
    }
}

/// Search overlay
#[derive(Debug, Clone, Default)]
pub struct SearchOverlay {
    pub query: String,
    pub results: Vec<SearchResult>,
    pub selected: usize,
}

/// Template browser overlay
#[derive(Debug, Clone, Default)]
pub struct TemplateOverlay {
    /// `None` shows every category
    pub category: Option<Category>,
    pub filter: String,
    pub selected: usize,
}

impl TemplateOverlay {
    /// Cycle through all categories, then back to "all"
    pub fn next_category(&mut self) {
        self.category = match self.category {
            None => Some(Category::ALL[0]),
            Some(c) if c == Category::ALL[Category::ALL.len() - 1] => None,
            Some(c) => Some(c.next()),
        };
        self.selected = 0;
    }
}

/// Progress overlay
#[derive(Debug, Clone, Default)]
pub struct ProgressOverlay {
    /// Row across chapters, then manual checkpoints
    pub selected: usize,
}

/// Modal panel drawn above the reader
#[derive(Debug, Clone)]
pub enum Overlay {
    Search(SearchOverlay),
    Templates(TemplateOverlay),
    Progress(ProgressOverlay),
    Help,
}

/// Command line mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommandMode {
    #[default]
    Normal,
    /// Accepting : commands
    Command,
}

/// State for the command line input
#[derive(Debug, Clone, Default)]
pub struct CommandLineState {
    pub mode: CommandMode,
    pub input: String,
    /// Cursor position in characters
    pub cursor: usize,
    /// Status/error message to display (when not in input mode)
    pub message: Option<String>,
    pub is_error: bool,
    pub history: Vec<String>,
    pub history_index: Option<usize>,
}

impl CommandLineState {
    const MAX_HISTORY: usize = 100;

    pub fn enter_command_mode(&mut self) {
        self.mode = CommandMode::Command;
        self.input.clear();
        self.cursor = 0;
        self.message = None;
        self.history_index = None;
    }

    pub fn exit_input_mode(&mut self) {
        self.mode = CommandMode::Normal;
        self.input.clear();
        self.cursor = 0;
    }

    pub fn set_message(&mut self, msg: impl Into<String>) {
        self.message = Some(msg.into());
        self.is_error = false;
    }

    pub fn set_error(&mut self, msg: impl Into<String>) {
        self.message = Some(msg.into());
        self.is_error = true;
    }

    fn byte_index(&self, char_idx: usize) -> usize {
        self.input.char_indices().nth(char_idx).map_or(self.input.len(), |(i, _)| i)
    }

    fn char_count(&self) -> usize {
        self.input.chars().count()
    }

    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.input.insert(at, c);
        self.cursor += 1;
    }

    /// Delete character before cursor
    pub fn delete_char(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_index(self.cursor);
            self.input.remove(at);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.char_count());
    }

    pub fn is_input_mode(&self) -> bool {
        self.mode == CommandMode::Command
    }

    pub fn add_to_history(&mut self, cmd: String) {
        if cmd.is_empty() || self.history.last() == Some(&cmd) {
            return;
        }
        if self.history.len() >= Self::MAX_HISTORY {
            self.history.remove(0);
        }
        self.history.push(cmd);
    }

    pub fn history_up(&mut self) {
        if self.history.is_empty() {
            return;
        }
        let index = match self.history_index {
            None => self.history.len() - 1,
            Some(i) => i.saturating_sub(1),
        };
        self.history_index = Some(index);
        self.input = self.history[index].clone();
        self.cursor = self.char_count();
    }

    pub fn history_down(&mut self) {
        let Some(i) = self.history_index else {
            return;
        };
        if i + 1 < self.history.len() {
            self.history_index = Some(i + 1);
            self.input = self.history[i + 1].clone();
        } else {
            self.history_index = None;
            self.input.clear();
        }
        self.cursor = self.char_count();
    }
}

/// Full application state
#[derive(Debug)]
pub struct AppState {
    pub screen: Screen,
    pub document: Option<Document>,
    pub observer: SectionObserver,
    pub navigation: NavigationPanel,
    pub content: ContentState,
    pub focused_panel: Panel,
    pub show_navigation: bool,
    pub overlay: Option<Overlay>,
    pub command_line: CommandLineState,
    pub notifications: Notifications,
    pub progress: ProgressTracker,
    pub templates: TemplateCatalog,
    pub search: SearchIndex,
    pub history: SearchHistory,
    /// Global copy count, mirrored from the clipboard service
    pub copies: u64,
}

impl AppState {
    pub fn new(config: &Config, persistence: &Persistence, now: Instant) -> Self {
        let mut templates = TemplateCatalog::builtin();
        templates.load_usage(persistence);

        Self {
            screen: Screen::Loading { source: String::new() },
            document: None,
            observer: SectionObserver::new(config.scroll_suppression()),
            navigation: NavigationPanel::new(),
            content: ContentState::default(),
            focused_panel: Panel::default(),
            show_navigation: true,
            overlay: None,
            command_line: CommandLineState::default(),
            notifications: Notifications::new(config.toast_duration(), config.achievement_duration()),
            progress: ProgressTracker::load(persistence, config.session_tick(), now),
            templates,
            search: SearchIndex::default(),
            history: SearchHistory::load(persistence),
            copies: 0,
        }
    }

    /// Section currently shown as active
    pub fn current_section(&self) -> Option<&str> {
        self.observer.current()
    }
}
