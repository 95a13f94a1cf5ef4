//! UI rendering components

pub mod command_line;
pub mod content;
pub mod layout;
pub mod main_screen;
pub mod navigation;
pub mod notifications;
pub mod overlays;

use ratatui::Frame;

use crate::app::state::{AppState, Screen};
use crate::theme::Theme;

/// Main draw function
pub fn draw(frame: &mut Frame, state: &mut AppState, theme: &Theme) {
    match &state.screen {
        Screen::Loading { source } => {
            let message = format!("Loading {source}...");
            layout::draw_message(frame, "docent", &message, None, theme);
        }
        Screen::Error { message, retryable } => {
            let hint = if *retryable { Some("Press r to retry, Ctrl-c to quit") } else { None };
            layout::draw_message(frame, "Could not load document", message, hint, theme);
        }
        Screen::Reader => {}
    }
    if state.screen == Screen::Reader {
        main_screen::draw(frame, state, theme);
    }

    if let Some(overlay) = &state.overlay {
        overlays::draw(frame, frame.area(), overlay, state, theme);
    }

    notifications::draw(frame, frame.area(), &state.notifications, theme);
}
