//! Modal overlays: search, templates, progress and help

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use super::layout::centered_rect;
use crate::app::state::{AppState, Overlay, ProgressOverlay, SearchOverlay, TemplateOverlay};
use crate::progress::{SectionStatus, Tally};
use crate::search;
use crate::templates::Category;
use crate::theme::Theme;

/// Draw the active overlay above the reader
pub fn draw(frame: &mut Frame, area: Rect, overlay: &Overlay, state: &AppState, theme: &Theme) {
    match overlay {
        Overlay::Search(search) => draw_search(frame, area, search, state, theme),
        Overlay::Templates(browser) => draw_templates(frame, area, browser, state, theme),
        Overlay::Progress(panel) => draw_progress(frame, area, panel, state, theme),
        Overlay::Help => draw_help(frame, area, theme),
    }
}

/// Clear the area and draw the overlay frame; returns the inner area
fn overlay_frame(frame: &mut Frame, area: Rect, title: &str, theme: &Theme) -> Rect {
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(format!(" {title} "))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border_focused))
        .style(Style::default().bg(theme.bg_secondary));

    let inner = block.inner(area);
    frame.render_widget(block, area);
    inner
}

fn row_style(selected: bool, theme: &Theme) -> Style {
    if selected {
        Style::default().fg(theme.bg_primary).bg(theme.accent_primary).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.fg_primary)
    }
}

/// Rows `start..` so that `selected` stays inside `height`
fn window_start(selected: usize, height: usize) -> usize {
    if height == 0 { 0 } else { selected.saturating_sub(height - 1) }
}

fn draw_search(frame: &mut Frame, area: Rect, search: &SearchOverlay, state: &AppState, theme: &Theme) {
    let inner = overlay_frame(frame, centered_rect(70, 70, area), "Search", theme);
    let [input_area, list_area, preview_area, hint_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(3),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(inner);

    let input = Line::from(vec![
        Span::styled("/", Style::default().fg(theme.info)),
        Span::styled(search.query.clone(), Style::default().fg(theme.fg_primary)),
        Span::styled(" ", Style::default().bg(theme.cursor)),
    ]);
    frame.render_widget(Paragraph::new(input), input_area);

    let height = list_area.height as usize;
    let start = window_start(search.selected, height);

    if search.query.is_empty() {
        let history = state.history.entries();
        let lines: Vec<Line> = if history.is_empty() {
            vec![Line::from(Span::styled("Type to search", Style::default().fg(theme.fg_muted)))]
        } else {
            history
                .iter()
                .enumerate()
                .skip(start)
                .take(height)
                .map(|(i, q)| {
                    let style = row_style(i == search.selected, theme);
                    Line::from(Span::styled(format!("  ↺ {q}"), style))
                })
                .collect()
        };
        frame.render_widget(Paragraph::new(lines), list_area);
    } else if search.results.is_empty() {
        let msg = Paragraph::new("No results").style(Style::default().fg(theme.fg_muted));
        frame.render_widget(msg, list_area);
    } else {
        let lines: Vec<Line> = search
            .results
            .iter()
            .enumerate()
            .skip(start)
            .take(height)
            .map(|(i, result)| {
                let selected = i == search.selected;
                let mut spans = vec![Span::styled(
                    format!("{:<10} ", result.entry.kind.label()),
                    Style::default().fg(theme.fg_muted),
                )];
                spans.push(Span::styled(result.entry.title.clone(), row_style(selected, theme)));
                if let Some(context) = &result.entry.context {
                    spans.push(Span::styled(format!("  {context}"), Style::default().fg(theme.fg_muted)));
                }
                Line::from(spans)
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), list_area);

        let snippet = search
            .results
            .get(search.selected)
            .and_then(|r| search::preview(&r.entry, &search.query, &state.templates));
        if let Some(snippet) = snippet {
            let preview = Paragraph::new(snippet)
                .style(Style::default().fg(theme.fg_secondary))
                .wrap(Wrap { trim: true });
            frame.render_widget(preview, preview_area);
        }
    }

    let hint = Paragraph::new("↑↓ select · Enter open · Esc close")
        .style(Style::default().fg(theme.fg_muted));
    frame.render_widget(hint, hint_area);
}

fn category_tabs(current: Option<Category>, theme: &Theme) -> Line<'static> {
    let tab = |label: &'static str, active: bool| {
        let style = if active {
            Style::default().fg(theme.bg_primary).bg(theme.accent_secondary)
        } else {
            Style::default().fg(theme.fg_muted)
        };
        Span::styled(format!(" {label} "), style)
    };

    let mut spans = vec![tab("All", current.is_none())];
    for category in Category::ALL {
        spans.push(tab(category.label(), current == Some(category)));
    }
    Line::from(spans)
}

fn draw_templates(
    frame: &mut Frame,
    area: Rect,
    browser: &TemplateOverlay,
    state: &AppState,
    theme: &Theme,
) {
    let inner = overlay_frame(frame, centered_rect(80, 80, area), "Templates", theme);
    let [tabs_area, filter_area, body_area, hint_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(2),
        Constraint::Min(3),
        Constraint::Length(1),
    ])
    .areas(inner);
    let [list_area, preview_area] =
        Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)]).areas(body_area);

    frame.render_widget(Paragraph::new(category_tabs(browser.category, theme)), tabs_area);

    let filter = Line::from(vec![
        Span::styled("Filter: ", Style::default().fg(theme.fg_muted)),
        Span::styled(browser.filter.clone(), Style::default().fg(theme.fg_primary)),
    ]);
    frame.render_widget(Paragraph::new(filter), filter_area);

    let templates = state.templates.filter(browser.category, &browser.filter);
    if templates.is_empty() {
        let msg = Paragraph::new("No matching templates").style(Style::default().fg(theme.fg_muted));
        frame.render_widget(msg, list_area);
    } else {
        let height = list_area.height as usize;
        let lines: Vec<Line> = templates
            .iter()
            .enumerate()
            .skip(window_start(browser.selected, height))
            .take(height)
            .map(|(i, t)| {
                let usage = if t.usage > 0 { format!(" ×{}", t.usage) } else { String::new() };
                Line::from(vec![
                    Span::styled(t.title.clone(), row_style(i == browser.selected, theme)),
                    Span::styled(usage, Style::default().fg(theme.fg_muted)),
                ])
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), list_area);
    }

    if let Some(template) = templates.get(browser.selected) {
        let mut lines = vec![
            Line::from(Span::styled(
                template.description.clone(),
                Style::default().fg(theme.accent_secondary),
            )),
            Line::from(""),
        ];
        lines.extend(
            template
                .body
                .lines()
                .map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(theme.fg_secondary)))),
        );
        let preview = Paragraph::new(lines)
            .block(Block::default().borders(Borders::LEFT).border_style(Style::default().fg(theme.border)))
            .wrap(Wrap { trim: false });
        frame.render_widget(preview, preview_area);
    }

    let hint = Paragraph::new("Tab category · type to filter · Enter copy · Esc close")
        .style(Style::default().fg(theme.fg_muted));
    frame.render_widget(hint, hint_area);
}

fn tally_line(label: &str, tally: &Tally, theme: &Theme) -> Line<'static> {
    const BAR_WIDTH: usize = 20;
    let filled = (tally.percent as usize * BAR_WIDTH).div_ceil(100).min(BAR_WIDTH);

    Line::from(vec![
        Span::styled(format!("{label:<12}"), Style::default().fg(theme.fg_secondary)),
        Span::styled("█".repeat(filled), Style::default().fg(theme.success)),
        Span::styled("░".repeat(BAR_WIDTH - filled), Style::default().fg(theme.bg_tertiary)),
        Span::styled(
            format!(" {}/{} ({}%)", tally.completed, tally.total, tally.percent),
            Style::default().fg(theme.fg_primary),
        ),
    ])
}

fn format_duration(ms: u64) -> String {
    let minutes = ms / 60_000;
    if minutes >= 60 { format!("{}h {}m", minutes / 60, minutes % 60) } else { format!("{minutes}m") }
}

fn draw_progress(
    frame: &mut Frame,
    area: Rect,
    panel: &ProgressOverlay,
    state: &AppState,
    theme: &Theme,
) {
    let inner = overlay_frame(frame, centered_rect(70, 80, area), "Progress", theme);
    let progress = &state.progress;
    let stats = progress.stats(state.copies);

    let mut lines = vec![
        tally_line("Chapters", &stats.chapters, theme),
        tally_line("Checkpoints", &stats.checkpoints, theme),
        Line::from(Span::styled(
            format!(
                "Copies: {}   Time: {}",
                stats.copies,
                format_duration(stats.session_time_ms)
            ),
            Style::default().fg(theme.fg_secondary),
        )),
        Line::from(""),
        Line::from(Span::styled("Chapters", Style::default().fg(theme.accent_primary))),
    ];

    let chapters = progress.chapters();
    for (i, chapter) in chapters.iter().enumerate() {
        let status = progress.section_status(&chapter.id);
        let color = if status == SectionStatus::Completed { theme.success } else { theme.fg_muted };
        lines.push(Line::from(vec![
            Span::styled(format!("  {} ", status.icon()), Style::default().fg(color)),
            Span::styled(chapter.title.clone(), row_style(panel.selected == i, theme)),
        ]));
    }

    let manual = progress.manual_checkpoints();
    if !manual.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Checklist", Style::default().fg(theme.accent_primary))));
        for (i, item) in manual.iter().enumerate() {
            let done = progress.is_checkpoint_completed(&item.id);
            let (icon, color) = if done { ("☑", theme.success) } else { ("☐", theme.fg_muted) };
            lines.push(Line::from(vec![
                Span::styled(format!("  {icon} "), Style::default().fg(color)),
                Span::styled(item.text.clone(), row_style(panel.selected == chapters.len() + i, theme)),
            ]));
        }
    }

    let [body_area, hint_area] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(inner);

    // keep the selected row on screen; the header block is 5 lines
    let selected_line = 5 + panel.selected + usize::from(panel.selected >= chapters.len()) * 2;
    let scroll = window_start(selected_line, body_area.height as usize) as u16;
    frame.render_widget(Paragraph::new(lines).scroll((scroll, 0)), body_area);

    let hint = Paragraph::new("Enter complete/toggle · e export · Esc close")
        .style(Style::default().fg(theme.fg_muted));
    frame.render_widget(hint, hint_area);
}

const HELP: &[(&str, &str)] = &[
    ("j / k", "Scroll or move selection"),
    ("g / G", "Top / bottom"),
    ("Ctrl-d / Ctrl-u", "Half page down / up"),
    ("n / N", "Next / previous section"),
    ("h / l / Tab", "Focus sections / content"),
    ("Enter", "Open selected section"),
    ("Space", "Expand or collapse"),
    ("[", "Toggle section panel"),
    ("/", "Search"),
    ("t", "Templates"),
    ("p", "Progress"),
    ("y", "Copy code block in view"),
    ("b", "Bookmark section"),
    ("m", "Mark chapter complete"),
    ("x", "Dismiss notification"),
    (":", "Command (goto, search, reset-progress, q)"),
    ("Ctrl-c", "Quit"),
];

fn draw_help(frame: &mut Frame, area: Rect, theme: &Theme) {
    let inner = overlay_frame(frame, centered_rect(60, 70, area), "Help", theme);

    let mut lines: Vec<Line> = HELP
        .iter()
        .map(|(key, desc)| {
            Line::from(vec![
                Span::styled(format!("{key:>16}  "), Style::default().fg(theme.accent_secondary)),
                Span::styled(*desc, Style::default().fg(theme.fg_primary)),
            ])
        })
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Esc to close", Style::default().fg(theme.fg_muted))));

    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Left), inner);
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn window_keeps_selection_visible() {
        assert_eq!(window_start(0, 5), 0);
        assert_eq!(window_start(4, 5), 0);
        assert_eq!(window_start(7, 5), 3);
        assert_eq!(window_start(3, 0), 0);
    }

    #[test]
    fn durations_format() {
        assert_eq!(format_duration(59_000), "0m");
        assert_eq!(format_duration(5 * 60_000), "5m");
        assert_eq!(format_duration(125 * 60_000), "2h 5m");
    }

    #[test]
    fn tabs_mark_the_active_category() {
        let theme = Theme::default();
        let line = category_tabs(None, &theme);
        assert_eq!(line.spans.len(), Category::ALL.len() + 1);
        assert_eq!(line.spans[0].style.bg, Some(theme.accent_secondary));
    }

    #[test]
    fn tally_bar_fills_by_percent() {
        let theme = Theme::default();
        let tally = Tally { total: 4, visited: 2, completed: 2, percent: 50 };
        let line = tally_line("Chapters", &tally, &theme);
        assert_eq!(line.spans[1].content.chars().count(), 10);
        assert_eq!(line.spans[3].content, " 2/4 (50%)");
    }
}
