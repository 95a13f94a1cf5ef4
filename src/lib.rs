//! Docent - a terminal reader for long-form technical guides
//!
//! Docent renders a markdown guide into a navigable reader: a section tree
//! that follows your scrolling, full-text search, copyable code blocks and
//! prompt templates, and progress tracking that survives restarts.

pub mod app;
pub mod clipboard;
pub mod config;
pub mod document;
pub mod events;
pub mod navigation;
pub mod notify;
pub mod progress;
pub mod search;
pub mod storage;
pub mod syntax;
pub mod templates;
pub mod theme;
pub mod ui;

pub use app::App;
pub use config::Config;
pub use theme::Theme;
