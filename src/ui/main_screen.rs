//! Reader screen: navigation panel, content and command line

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
};

use super::{command_line, content, navigation};
use crate::app::state::{AppState, Panel};
use crate::theme::Theme;

/// Minimum width for the navigation panel
const NAVIGATION_MIN_WIDTH: u16 = 24;

/// Draw the reader screen
pub fn draw(frame: &mut Frame, state: &mut AppState, theme: &Theme) {
    let area = frame.area();

    // Split vertically: main area and command line
    let vertical_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    let main_area = vertical_chunks[0];
    let command_area = vertical_chunks[1];

    let chunks = create_layout(main_area, state.show_navigation);

    let mut panel_index = 0;
    if state.show_navigation {
        let focused = state.focused_panel == Panel::Navigation;
        navigation::draw(frame, chunks[panel_index], state, theme, focused);
        panel_index += 1;
    }

    let focused = state.focused_panel == Panel::Content;
    content::draw(frame, chunks[panel_index], state, theme, focused);

    command_line::draw(frame, command_area, state, theme);
}

/// Create the panel rects for the main area
fn create_layout(area: Rect, show_navigation: bool) -> Vec<Rect> {
    let mut constraints = Vec::new();

    // Navigation panel (left): 25% width, min 24 cols
    if show_navigation {
        let width = (area.width / 4).max(NAVIGATION_MIN_WIDTH);
        constraints.push(Constraint::Length(width));
    }

    // Content panel: flexible
    constraints.push(Constraint::Min(30));

    Layout::default().direction(Direction::Horizontal).constraints(constraints).split(area).to_vec()
}
