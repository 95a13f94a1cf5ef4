//! Section navigation tree

use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::app::state::AppState;
use crate::navigation::VisibleEntry;
use crate::progress::{ProgressTracker, SectionStatus};
use crate::theme::Theme;

/// Draw the navigation tree
pub fn draw(frame: &mut Frame, area: Rect, state: &mut AppState, theme: &Theme, focused: bool) {
    let border_color = if focused { theme.border_focused } else { theme.border };

    let block = Block::default()
        .title(" Sections ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .style(Style::default().bg(theme.bg_primary));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Update visible height for scroll calculations
    state.navigation.visible_height = inner.height as usize;

    let entries = state.navigation.visible_entries();
    if entries.is_empty() {
        let msg = Paragraph::new("No sections")
            .style(Style::default().fg(theme.fg_muted))
            .wrap(Wrap { trim: true });
        frame.render_widget(msg, inner);
        return;
    }

    let width = inner.width as usize;
    let selected = state.navigation.selected;
    let lines: Vec<Line> = entries
        .iter()
        .enumerate()
        .skip(state.navigation.scroll_offset)
        .take(inner.height as usize)
        .map(|(position, entry)| {
            entry_line(entry, &state.progress, theme, position == selected && focused, width)
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), inner);
}

/// Render one tree row
fn entry_line(
    entry: &VisibleEntry<'_>,
    progress: &ProgressTracker,
    theme: &Theme,
    selected: bool,
    width: usize,
) -> Line<'static> {
    let node = entry.node;
    let indent = "  ".repeat(node.depth);
    let expand_icon = match (node.has_children, entry.expanded) {
        (false, _) => " ",
        (true, true) => "▼",
        (true, false) => "▶",
    };
    let status = progress.section_status(&node.id);
    let marker = if entry.bookmarked { " ★" } else { "" };

    let prefix = format!("{indent}{expand_icon} {} ", status.icon());
    let title_width =
        width.saturating_sub(prefix.chars().count() + marker.chars().count()).max(1);
    let title = truncate(&node.title, title_width);

    if selected {
        let style =
            Style::default().fg(theme.bg_primary).bg(theme.accent_primary).add_modifier(Modifier::BOLD);
        return Line::from(Span::styled(format!("{prefix}{title}{marker}"), style));
    }

    let title_style = if entry.active {
        Style::default().fg(theme.active_link).add_modifier(Modifier::BOLD)
    } else if node.depth == 0 {
        Style::default().fg(theme.fg_primary)
    } else {
        Style::default().fg(theme.fg_secondary)
    };
    let status_color = match status {
        SectionStatus::NotStarted => theme.fg_muted,
        SectionStatus::Visited => theme.info,
        SectionStatus::Completed => theme.success,
    };

    Line::from(vec![
        Span::styled(format!("{indent}{expand_icon} "), Style::default().fg(theme.fg_muted)),
        Span::styled(format!("{} ", status.icon()), Style::default().fg(status_color)),
        Span::styled(title, title_style),
        Span::styled(marker, Style::default().fg(theme.bookmark)),
    ])
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let cut: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{cut}…")
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::navigation::NavNode;
    use crate::storage::Persistence;

    fn node(depth: usize, has_children: bool) -> NavNode {
        NavNode {
            id: "setup".into(),
            title: "Setup and installation".into(),
            level: 2,
            depth,
            parent: None,
            has_children,
        }
    }

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn tracker() -> ProgressTracker {
        ProgressTracker::load(&Persistence::in_memory(), Duration::from_secs(60), Instant::now())
    }

    #[test]
    fn row_shows_expand_status_and_bookmark() {
        let node = node(0, true);
        let entry =
            VisibleEntry { index: 0, node: &node, expanded: false, active: false, bookmarked: true };
        let line = entry_line(&entry, &tracker(), &Theme::default(), false, 40);
        assert_eq!(text(&line), "▶ ○ Setup and installation ★");
    }

    #[test]
    fn nested_rows_are_indented() {
        let node = node(2, false);
        let entry =
            VisibleEntry { index: 0, node: &node, expanded: false, active: false, bookmarked: false };
        let line = entry_line(&entry, &tracker(), &Theme::default(), false, 40);
        assert!(text(&line).starts_with("      ○ Setup"));
    }

    #[test]
    fn visited_sections_show_status() {
        let mut persistence = Persistence::in_memory();
        let mut progress = tracker();
        progress.mark_section_visited("setup", &mut persistence);

        let node = node(0, false);
        let entry =
            VisibleEntry { index: 0, node: &node, expanded: false, active: true, bookmarked: false };
        let line = entry_line(&entry, &progress, &Theme::default(), false, 40);
        assert!(text(&line).contains(SectionStatus::Visited.icon()));
    }

    #[test]
    fn long_titles_are_truncated() {
        let node = node(0, false);
        let entry =
            VisibleEntry { index: 0, node: &node, expanded: false, active: false, bookmarked: false };
        let line = entry_line(&entry, &tracker(), &Theme::default(), true, 14);
        assert_eq!(text(&line), "  ○ Setup and…");
    }

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("abcdef", 4), "abc…");
    }
}
