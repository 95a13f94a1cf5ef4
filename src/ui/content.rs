//! Content panel: document layout and rendering

use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::app::state::{AppState, CodeAnchor, ContentLayout, ContentState};
use crate::clipboard::code::language_label;
use crate::document::{ChecklistItem, CodeBlock, ContentBlock, Document, Table};
use crate::progress::ProgressTracker;
use crate::syntax;
use crate::theme::Theme;

/// Draw the content panel
pub fn draw(frame: &mut Frame, area: Rect, state: &mut AppState, theme: &Theme, focused: bool) {
    let border_color = if focused { theme.border_focused } else { theme.border };

    let title = state
        .current_section()
        .and_then(|id| state.document.as_ref()?.section(id))
        .map_or_else(|| " Content ".to_string(), |s| format!(" {} ", s.title));

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .style(Style::default().bg(theme.bg_primary));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(document) = state.document.as_ref() else {
        return;
    };

    // Reserve 1 column for scrollbar
    let content_width = inner.width.saturating_sub(2) as usize;
    let content_area =
        Rect { x: inner.x, y: inner.y, width: inner.width.saturating_sub(1), height: inner.height };
    let scrollbar_x = inner.x + inner.width.saturating_sub(1);

    state.content.visible_height = inner.height as usize;
    ensure_layout(&mut state.content, document, &state.progress, theme, content_width);

    let content = &state.content;
    let Some(layout) = content.layout.as_ref() else {
        return;
    };

    let visible: Vec<Line> = layout
        .lines
        .iter()
        .skip(content.scroll_offset)
        .take(content.visible_height)
        .cloned()
        .collect();
    frame.render_widget(Paragraph::new(visible), content_area);

    draw_scrollbar(
        frame,
        scrollbar_x,
        inner.y,
        inner.height,
        content.scroll_offset,
        content.total_lines,
        theme,
    );
}

/// Lay out the document unless the cached layout already fits `width`
pub fn ensure_layout(
    content: &mut ContentState,
    document: &Document,
    progress: &ProgressTracker,
    theme: &Theme,
    width: usize,
) {
    let stale = content.layout.as_ref().is_none_or(|layout| layout.width != width);
    if stale {
        let layout = layout_document(document, progress, theme, width);
        content.total_lines = layout.lines.len();
        content.layout = Some(layout);
        content.last_measured = None;
    }
    content.clamp_scroll();
}

/// Draw a scrollbar indicator
fn draw_scrollbar(
    frame: &mut Frame,
    x: u16,
    y: u16,
    height: u16,
    scroll_offset: usize,
    total_lines: usize,
    theme: &Theme,
) {
    if total_lines == 0 || height == 0 {
        return;
    }

    let height = height as usize;

    let visible_ratio = (height as f64 / total_lines as f64).min(1.0);
    let thumb_height = ((height as f64 * visible_ratio).ceil() as usize).max(1);

    let max_scroll = total_lines.saturating_sub(height / 2);
    let scroll_ratio = if total_lines <= height || max_scroll == 0 {
        0.0
    } else {
        scroll_offset as f64 / max_scroll as f64
    };
    let thumb_top = ((height - thumb_height) as f64 * scroll_ratio).round() as usize;

    for i in 0..height {
        let on_thumb = i >= thumb_top && i < thumb_top + thumb_height;
        let (ch, style) = if on_thumb {
            ("█", Style::default().fg(theme.accent_secondary))
        } else {
            ("░", Style::default().fg(theme.bg_tertiary))
        };

        frame.render_widget(
            Paragraph::new(ch).style(style),
            Rect { x, y: y.saturating_add(i as u16), width: 1, height: 1 },
        );
    }
}

/// Lay out every block, recording heading and code positions
pub fn layout_document(
    document: &Document,
    progress: &ProgressTracker,
    theme: &Theme,
    width: usize,
) -> ContentLayout {
    let mut layout = ContentLayout { width, ..Default::default() };
    let lines = &mut layout.lines;

    for (index, block) in document.blocks.iter().enumerate() {
        match block {
            ContentBlock::Heading { level, text, id } => {
                // the heading text sits after one spacer line
                layout.headings.push((id.clone(), lines.len() + 1));
                render_heading(lines, *level, text, theme);
            }
            ContentBlock::Paragraph(text) => render_paragraph(lines, text, theme, width),
            ContentBlock::Code(code) => {
                let start = lines.len();
                render_code_block(lines, code, theme);
                // trailing spacer is not part of the block
                layout.code_blocks.push(CodeAnchor { block: index, start, end: lines.len() - 1 });
            }
            ContentBlock::UnorderedList(items) => render_unordered_list(lines, items, theme, width),
            ContentBlock::OrderedList(items) => render_ordered_list(lines, items, theme, width),
            ContentBlock::Checklist(items) => render_checklist(lines, items, progress, theme, width),
            ContentBlock::Blockquote(text) => render_blockquote(lines, text, theme, width),
            ContentBlock::HorizontalRule => render_horizontal_rule(lines, theme, width),
            ContentBlock::Image { alt, .. } => render_image(lines, alt, theme),
            ContentBlock::Table(table) => render_table(lines, table, theme, width),
        }
    }

    layout
}

fn render_heading(lines: &mut Vec<Line<'static>>, level: u8, text: &str, theme: &Theme) {
    let (base_style, code_color, prefix) = match level {
        1 => (
            Style::default()
                .fg(theme.accent_primary)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            theme.syntax_keyword,
            "",
        ),
        2 => (
            Style::default().fg(theme.accent_secondary).add_modifier(Modifier::BOLD),
            theme.syntax_function,
            "",
        ),
        3 => (Style::default().fg(theme.info).add_modifier(Modifier::BOLD), theme.syntax_keyword, "  "),
        _ => (
            Style::default().fg(theme.fg_secondary).add_modifier(Modifier::BOLD),
            theme.syntax_keyword,
            "    ",
        ),
    };

    let mut spans: Vec<Span<'static>> = Vec::new();
    if !prefix.is_empty() {
        spans.push(Span::styled(prefix, base_style));
    }

    // `code` parts of a heading get their own color
    for (i, part) in text.split('`').enumerate() {
        if part.is_empty() {
            continue;
        }
        let style = if i % 2 == 1 {
            Style::default().fg(code_color).add_modifier(Modifier::BOLD)
        } else {
            base_style
        };
        spans.push(Span::styled(part.to_string(), style));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(spans));
    if level <= 2 {
        lines.push(Line::from(""));
    }
}

fn render_paragraph(lines: &mut Vec<Line<'static>>, text: &str, theme: &Theme, width: usize) {
    let spans = parse_inline_formatting(text, theme);
    lines.extend(wrap_spans(spans, width.saturating_sub(2)));
    lines.push(Line::from(""));
}

/// Parse inline markdown formatting into styled spans
fn parse_inline_formatting(text: &str, theme: &Theme) -> Vec<Span<'static>> {
    let plain = Style::default().fg(theme.fg_primary);
    let mut spans = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current = String::new();

    let flush = |current: &mut String, spans: &mut Vec<Span<'static>>| {
        if !current.is_empty() {
            spans.push(Span::styled(std::mem::take(current), plain));
        }
    };

    while let Some(c) = chars.next() {
        match c {
            '`' => {
                flush(&mut current, &mut spans);
                let code: String = chars.by_ref().take_while(|&next| next != '`').collect();
                spans.push(Span::styled(
                    code,
                    Style::default().fg(theme.syntax_string).bg(theme.bg_secondary),
                ));
            }
            '*' | '_' => {
                let is_double = chars.peek() == Some(&c);
                if is_double {
                    chars.next();
                }

                let mut content = String::new();
                let mut found_end = false;
                while let Some(next) = chars.next() {
                    if next == c {
                        if !is_double {
                            found_end = true;
                            break;
                        }
                        if chars.peek() == Some(&c) {
                            chars.next();
                            found_end = true;
                            break;
                        }
                    }
                    content.push(next);
                }

                if found_end {
                    flush(&mut current, &mut spans);
                    let modifier = if is_double { Modifier::BOLD } else { Modifier::ITALIC };
                    spans.push(Span::styled(content, plain.add_modifier(modifier)));
                } else {
                    // Not a valid marker, treat as literal
                    current.push(c);
                    if is_double {
                        current.push(c);
                    }
                    current.push_str(&content);
                }
            }
            '[' => {
                let link_text: String = chars.by_ref().take_while(|&next| next != ']').collect();
                if chars.peek() == Some(&'(') {
                    chars.next();
                    // url is dropped; the terminal shows the text only
                    chars.by_ref().take_while(|&next| next != ')').for_each(drop);
                    flush(&mut current, &mut spans);
                    spans.push(Span::styled(
                        link_text,
                        Style::default().fg(theme.accent_secondary).add_modifier(Modifier::UNDERLINED),
                    ));
                } else {
                    current.push('[');
                    current.push_str(&link_text);
                    current.push(']');
                }
            }
            _ => current.push(c),
        }
    }

    flush(&mut current, &mut spans);

    if spans.is_empty() {
        spans.push(Span::raw(""));
    }

    spans
}

/// Wrap styled spans into lines while preserving formatting
fn wrap_spans(spans: Vec<Span<'static>>, width: usize) -> Vec<Line<'static>> {
    if width == 0 {
        return vec![Line::from(spans)];
    }

    let mut lines = Vec::new();
    let mut current_line: Vec<Span<'static>> = Vec::new();
    let mut current_width = 0;

    for span in spans {
        let style = span.style;

        for word in span.content.split_inclusive(char::is_whitespace) {
            let word_len = textwrap::core::display_width(word);

            if current_width + word_len > width && current_width > 0 {
                lines.push(Line::from(std::mem::take(&mut current_line)));
                current_width = 0;
            }

            current_line.push(Span::styled(word.to_string(), style));
            current_width += word_len;
        }
    }

    if !current_line.is_empty() {
        lines.push(Line::from(current_line));
    }

    if lines.is_empty() {
        lines.push(Line::from(""));
    }

    lines
}

fn render_code_block(lines: &mut Vec<Line<'static>>, code: &CodeBlock, theme: &Theme) {
    let label = code
        .language
        .as_deref()
        .map(|lang| language_label(lang).map_or_else(|| lang.to_string(), str::to_string))
        .unwrap_or_else(|| "code".to_string());

    lines.push(Line::from(vec![
        Span::styled("┌─ ", Style::default().fg(theme.border)),
        Span::styled(label, Style::default().fg(theme.info)),
        Span::styled(" ─ ", Style::default().fg(theme.border)),
        Span::styled("y copy", Style::default().fg(theme.fg_muted)),
    ]));

    for highlighted in syntax::highlight_block(&code.code, code.language.as_deref(), theme) {
        let mut spans = vec![Span::styled("│ ", Style::default().fg(theme.border))];
        spans.extend(highlighted);
        lines.push(Line::from(spans));
    }

    lines.push(Line::from(Span::styled("└──────", Style::default().fg(theme.border))));
    lines.push(Line::from(""));
}

/// Items with a hanging indent after `prefix`
fn render_prefixed_items<'a>(
    lines: &mut Vec<Line<'static>>,
    items: impl Iterator<Item = (Span<'static>, &'a str)>,
    indent: usize,
    theme: &Theme,
    width: usize,
) {
    let content_width = width.saturating_sub(indent);

    for (prefix, item) in items {
        let wrapped = wrap_spans(parse_inline_formatting(item, theme), content_width);
        let mut prefix = Some(prefix);
        for line in wrapped {
            let lead = prefix.take().unwrap_or_else(|| Span::raw(" ".repeat(indent)));
            let mut spans = vec![lead];
            spans.extend(line.spans);
            lines.push(Line::from(spans));
        }
    }
    lines.push(Line::from(""));
}

fn render_unordered_list(lines: &mut Vec<Line<'static>>, items: &[String], theme: &Theme, width: usize) {
    let bullet = Style::default().fg(theme.accent_secondary);
    let items = items.iter().map(|item| (Span::styled("  • ", bullet), item.as_str()));
    render_prefixed_items(lines, items, 4, theme, width);
}

fn render_ordered_list(lines: &mut Vec<Line<'static>>, items: &[String], theme: &Theme, width: usize) {
    let number = Style::default().fg(theme.accent_secondary);
    let items = items
        .iter()
        .enumerate()
        .map(|(i, item)| (Span::styled(format!("{:>3}. ", i + 1), number), item.as_str()));
    render_prefixed_items(lines, items, 5, theme, width);
}

fn render_checklist(
    lines: &mut Vec<Line<'static>>,
    items: &[ChecklistItem],
    progress: &ProgressTracker,
    theme: &Theme,
    width: usize,
) {
    let items = items.iter().map(|item| {
        let prefix = if progress.is_checkpoint_completed(&item.id) {
            Span::styled("  ☑ ", Style::default().fg(theme.success))
        } else {
            Span::styled("  ☐ ", Style::default().fg(theme.fg_muted))
        };
        (prefix, item.text.as_str())
    });
    render_prefixed_items(lines, items, 4, theme, width);
}

fn render_blockquote(lines: &mut Vec<Line<'static>>, text: &str, theme: &Theme, width: usize) {
    let muted: Vec<Span<'static>> = parse_inline_formatting(text, theme)
        .into_iter()
        .map(|s| Span::styled(s.content.into_owned(), s.style.fg(theme.fg_muted)))
        .collect();

    for line in wrap_spans(muted, width.saturating_sub(4)) {
        let mut spans = vec![Span::styled("  │ ", Style::default().fg(theme.accent_primary))];
        spans.extend(line.spans);
        lines.push(Line::from(spans));
    }
    lines.push(Line::from(""));
}

fn render_horizontal_rule(lines: &mut Vec<Line<'static>>, theme: &Theme, width: usize) {
    let rule_width = width.saturating_sub(4).min(32);
    lines.push(Line::from(Span::styled("─".repeat(rule_width), Style::default().fg(theme.border))));
    lines.push(Line::from(""));
}

fn render_image(lines: &mut Vec<Line<'static>>, alt: &str, theme: &Theme) {
    let alt = if alt.is_empty() { "image" } else { alt };
    lines.push(Line::from(Span::styled(format!("[Image: {alt}]"), Style::default().fg(theme.fg_muted))));
    lines.push(Line::from(""));
}

/// Column widths that share `width` evenly, minus the column gaps
fn column_widths(columns: usize, width: usize) -> Vec<usize> {
    let gaps = 2 * columns.saturating_sub(1) + 2;
    let each = (width.saturating_sub(gaps) / columns.max(1)).max(6);
    vec![each; columns]
}

fn render_table(lines: &mut Vec<Line<'static>>, table: &Table, theme: &Theme, width: usize) {
    let columns = table.headers.len().max(table.rows.iter().map(Vec::len).max().unwrap_or(0));
    if columns == 0 {
        return;
    }
    let widths = column_widths(columns, width);

    lines.push(Line::from(""));

    if !table.headers.is_empty() {
        let header_bg = theme.accent_secondary;
        let mut spans: Vec<Span<'static>> = Vec::new();
        for (i, header) in table.headers.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled("  ", Style::default().bg(header_bg)));
            }
            spans.push(Span::styled(
                pad_or_truncate(&header.replace('`', ""), widths[i]),
                Style::default().fg(theme.bg_primary).bg(header_bg).add_modifier(Modifier::BOLD),
            ));
        }
        lines.push(Line::from(spans));
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let row_bg = if row_idx % 2 == 0 { theme.bg_secondary } else { theme.bg_primary };

        let mut cells: Vec<Vec<String>> = (0..columns)
            .map(|i| {
                let cell = row.get(i).map_or("", String::as_str);
                wrap_cell_text(&cell.replace('`', ""), widths[i])
            })
            .collect();
        let height = cells.iter().map(Vec::len).max().unwrap_or(1);
        for cell in &mut cells {
            cell.resize(height, String::new());
        }

        for line_idx in 0..height {
            let mut spans: Vec<Span<'static>> = Vec::new();
            for (col_idx, cell) in cells.iter().enumerate() {
                if col_idx > 0 {
                    spans.push(Span::styled("  ", Style::default().bg(row_bg)));
                }
                let fg = if col_idx == 0 { theme.syntax_keyword } else { theme.fg_primary };
                spans.push(Span::styled(
                    pad_or_truncate(&cell[line_idx], widths[col_idx]),
                    Style::default().fg(fg).bg(row_bg),
                ));
            }
            lines.push(Line::from(spans));
        }
    }

    lines.push(Line::from(""));
}

/// Pad string to width or truncate with ellipsis
fn pad_or_truncate(s: &str, width: usize) -> String {
    let char_count = s.chars().count();
    if char_count > width {
        let truncated: String = s.chars().take(width.saturating_sub(1)).collect();
        format!("{truncated}…")
    } else {
        format!("{s:width$}")
    }
}

/// Wrap cell text to a column width
fn wrap_cell_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 || text.trim().is_empty() {
        return vec![text.trim().to_string()];
    }
    textwrap::wrap(text, textwrap::Options::new(width).break_words(true))
        .into_iter()
        .map(|line| line.into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::document::ContentRenderer;
    use crate::storage::Persistence;

    fn tracker() -> ProgressTracker {
        ProgressTracker::load(&Persistence::in_memory(), Duration::from_secs(60), Instant::now())
    }

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn pad_or_truncate_pads_and_cuts() {
        assert_eq!(pad_or_truncate("hi", 5), "hi   ");
        assert_eq!(pad_or_truncate("hello", 5), "hello");
        assert_eq!(pad_or_truncate("hello world", 5), "hell…");
    }

    #[test]
    fn wrap_cell_text_splits_long_cells() {
        assert_eq!(wrap_cell_text("short", 10), vec!["short"]);
        assert!(wrap_cell_text("this is a very long text", 10).len() > 1);
        assert_eq!(wrap_cell_text("", 10), vec![""]);
    }

    #[test]
    fn parse_inline_code() {
        let theme = Theme::default();
        let spans = parse_inline_formatting("hello `code` world", &theme);
        let parts: Vec<&str> = spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(parts, vec!["hello ", "code", " world"]);
    }

    #[test]
    fn parse_inline_bold_and_link() {
        let theme = Theme::default();
        let spans = parse_inline_formatting("a **b** [c](http://x) d", &theme);
        let parts: Vec<&str> = spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(parts, vec!["a ", "b", " ", "c", " d"]);
        assert!(spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn unmatched_marker_is_literal() {
        let theme = Theme::default();
        let spans = parse_inline_formatting("2 * 3", &theme);
        let text: String = spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "2 * 3");
    }

    #[test]
    fn wrap_spans_respects_width() {
        let spans = vec![Span::raw("one two three four five six")];
        let lines = wrap_spans(spans, 10);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line_text(line).trim_end().chars().count() <= 10);
        }
    }

    #[test]
    fn layout_records_heading_and_code_positions() {
        let theme = Theme::default();
        let rendered = ContentRenderer::default()
            .render("# Title\n\nText.\n\n## Setup\n\n```bash\nnpm i\nnpm test\n```\n");
        let layout = layout_document(&rendered.document, &tracker(), &theme, 60);

        let (id, line) = &layout.headings[1];
        assert_eq!(id, "setup");
        assert_eq!(line_text(&layout.lines[*line]), "Setup");

        let code = layout.code_blocks[0];
        assert_eq!(code.end - code.start, 4);
        assert!(line_text(&layout.lines[code.start]).contains("Bash"));
        assert_eq!(line_text(&layout.lines[code.start + 1]), "│ npm i");
    }

    #[test]
    fn checklist_reflects_progress() {
        let theme = Theme::default();
        let rendered = ContentRenderer::default().render("- [ ] first\n- [ ] second\n");
        let mut persistence = Persistence::in_memory();
        let mut progress = tracker();
        progress.toggle_manual_checkpoint("manual-checkpoint-1", &mut persistence);

        let layout = layout_document(&rendered.document, &progress, &theme, 60);
        let texts: Vec<String> = layout.lines.iter().map(line_text).collect();
        assert!(texts.contains(&"  ☐ first".to_string()));
        assert!(texts.contains(&"  ☑ second".to_string()));
    }

    #[test]
    fn ensure_layout_caches_per_width() {
        let theme = Theme::default();
        let rendered = ContentRenderer::default().render("# A\n\nSome text here.\n");
        let progress = tracker();
        let mut content = ContentState { visible_height: 10, ..Default::default() };

        ensure_layout(&mut content, &rendered.document, &progress, &theme, 40);
        let total = content.total_lines;
        assert!(total > 0);
        content.mark_measured();

        ensure_layout(&mut content, &rendered.document, &progress, &theme, 40);
        assert!(!content.needs_measure());

        ensure_layout(&mut content, &rendered.document, &progress, &theme, 20);
        assert_eq!(content.layout.as_ref().map(|l| l.width), Some(20));
        assert!(content.needs_measure());
    }

    #[test]
    fn table_columns_share_width() {
        assert_eq!(column_widths(2, 40), vec![18, 18]);
        assert_eq!(column_widths(10, 20), vec![6; 10]);
    }
}
