//! Command line UI component

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::app::state::{AppState, CommandMode};
use crate::theme::Theme;

/// Draw the command line at the bottom of the screen
pub fn draw(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let command_line = &state.command_line;

    let (text, style) = match command_line.mode {
        CommandMode::Normal => match command_line.message {
            Some(ref msg) => {
                let color = if command_line.is_error { theme.error } else { theme.fg_muted };
                (msg.clone(), Style::default().fg(color))
            }
            None => (
                String::from("Press : for commands, / to search, ? for help"),
                Style::default().fg(theme.fg_muted),
            ),
        },
        CommandMode::Command => {
            (format!(":{}", command_line.input), Style::default().fg(theme.accent_primary))
        }
    };

    let line = if command_line.is_input_mode() {
        build_line_with_cursor(&text, command_line.cursor + 1, style, theme) // +1 for prefix
    } else {
        Line::from(Span::styled(text, style))
    };

    let status = status_text(state);
    let status_width = status.chars().count() as u16;
    let [left, right] =
        Layout::horizontal([Constraint::Min(1), Constraint::Length(status_width)]).areas(area);

    frame.render_widget(Paragraph::new(line), left);
    frame.render_widget(
        Paragraph::new(Span::styled(status, Style::default().fg(theme.fg_secondary))),
        right,
    );
}

/// Current section and overall chapter progress
fn status_text(state: &AppState) -> String {
    let percent = state.progress.stats(state.copies).chapters.percent;
    let section = state
        .current_section()
        .and_then(|id| state.document.as_ref()?.section(id))
        .map(|s| s.title.as_str());

    match section {
        Some(title) => format!(" {title} · {percent}% "),
        None => format!(" {percent}% "),
    }
}

/// Build a line with a visible cursor
fn build_line_with_cursor(
    text: &str,
    cursor_pos: usize,
    base_style: Style,
    theme: &Theme,
) -> Line<'static> {
    let chars: Vec<char> = text.chars().collect();
    let mut spans = Vec::new();

    if cursor_pos > 0 {
        let before: String = chars.iter().take(cursor_pos).collect();
        spans.push(Span::styled(before, base_style));
    }

    // Cursor character (or space if at end)
    let cursor_char = chars.get(cursor_pos).copied().unwrap_or(' ');
    let cursor_style =
        Style::default().fg(theme.bg_primary).bg(theme.fg_primary).add_modifier(Modifier::BOLD);
    spans.push(Span::styled(cursor_char.to_string(), cursor_style));

    if cursor_pos + 1 < chars.len() {
        let after: String = chars.iter().skip(cursor_pos + 1).collect();
        spans.push(Span::styled(after, base_style));
    }

    Line::from(spans)
}
