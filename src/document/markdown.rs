//! Markdown event handling
//!
//! Turns a pulldown-cmark event stream into the content model. Heading ids
//! are expected to be assigned on the events before they reach this parser.

use once_cell::sync::Lazy;
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Tag, TagEnd};
use regex::Regex;

use super::model::{ChecklistItem, CodeBlock, ContentBlock, Table};

/// Runs of three or more blank lines
static BLANK_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Parser options shared by the HTML and block passes
pub fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
}

/// Normalize raw document text before parsing
///
/// Line endings become `\n`, every ATX heading outside a fenced code block is
/// preceded by a blank line, and runs of blank lines are collapsed to one.
pub fn preprocess(raw: &str) -> String {
    let text = raw.replace("\r\n", "\n").replace('\r', "\n");

    let mut out = String::with_capacity(text.len() + 64);
    let mut fence: Option<&str> = None;
    let mut previous_blank = true;

    for line in text.split('\n') {
        let trimmed = line.trim_start();

        match fence {
            Some(marker) => {
                if trimmed.starts_with(marker) {
                    fence = None;
                }
            }
            None => {
                if trimmed.starts_with("```") {
                    fence = Some("```");
                } else if trimmed.starts_with("~~~") {
                    fence = Some("~~~");
                } else if is_atx_heading(trimmed) && !previous_blank {
                    out.push('\n');
                }
            }
        }

        out.push_str(line);
        out.push('\n');
        previous_blank = line.trim().is_empty();
    }

    BLANK_RUN_RE.replace_all(out.trim_end_matches('\n'), "\n\n").into_owned() + "\n"
}

fn is_atx_heading(line: &str) -> bool {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    (1..=6).contains(&hashes) && line[hashes..].starts_with([' ', '\t'])
}

pub fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Build content blocks from an event stream
// Parser loops inherently branch a lot
#[allow(clippy::cognitive_complexity)]
pub fn parse_events<'a>(events: impl IntoIterator<Item = Event<'a>>) -> Vec<ContentBlock> {
    let mut blocks = Vec::new();

    let mut current_text = String::new();
    let mut in_code_block = false;
    let mut code_language: Option<String> = None;
    let mut code_content = String::new();

    let mut list_depth = 0usize;
    let mut list_items: Vec<(String, Option<bool>)> = Vec::new();
    let mut list_ordered = false;
    let mut current_list_item = String::new();
    let mut current_task: Option<bool> = None;
    let mut checkpoint_counter = 0usize;

    let mut in_blockquote = false;
    let mut blockquote_content = String::new();

    let mut in_table = false;
    let mut table_headers: Vec<String> = Vec::new();
    let mut table_rows: Vec<Vec<String>> = Vec::new();
    let mut current_row: Vec<String> = Vec::new();
    let mut current_cell = String::new();

    let mut heading: Option<(u8, String)> = None;
    let mut image: Option<(String, String)> = None;

    for event in events {
        match event {
            Event::Start(Tag::Heading { level, id, .. }) => {
                flush_text(&mut current_text, &mut blocks);
                let id = id.map(|id| id.to_string()).unwrap_or_default();
                heading = Some((heading_level_to_u8(level), id));
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, id)) = heading.take() {
                    let mut text = std::mem::take(&mut current_text).trim().to_string();
                    // an empty heading still owns an id in the HTML
                    if text.is_empty() {
                        text = id.clone();
                    }
                    if !text.is_empty() {
                        blocks.push(ContentBlock::Heading { level, text, id });
                    }
                }
            }

            Event::Start(Tag::Paragraph) => {}
            Event::End(TagEnd::Paragraph) => {
                if in_blockquote {
                    blockquote_content.push_str(&current_text);
                    blockquote_content.push('\n');
                    current_text.clear();
                } else if list_depth > 0 {
                    current_list_item.push_str(&current_text);
                    current_text.clear();
                } else {
                    flush_text(&mut current_text, &mut blocks);
                }
            }

            Event::Start(Tag::CodeBlock(kind)) => {
                flush_text(&mut current_text, &mut blocks);
                in_code_block = true;
                code_language = match kind {
                    CodeBlockKind::Fenced(info) => {
                        info.split_whitespace().next().map(str::to_string)
                    }
                    CodeBlockKind::Indented => None,
                };
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                let code = std::mem::take(&mut code_content);
                let mut code_block = CodeBlock::new(code.trim_end());
                if let Some(lang) = code_language.take() {
                    code_block = code_block.with_language(lang);
                }
                blocks.push(ContentBlock::Code(code_block));
            }

            // Nested lists are flattened into their outermost list
            Event::Start(Tag::List(first_item)) => {
                if list_depth == 0 {
                    flush_text(&mut current_text, &mut blocks);
                    list_ordered = first_item.is_some();
                    list_items.clear();
                } else {
                    finish_item(&mut current_list_item, &mut current_task, &mut list_items);
                }
                list_depth += 1;
            }
            Event::End(TagEnd::List(_)) => {
                list_depth = list_depth.saturating_sub(1);
                if list_depth == 0 {
                    let items = std::mem::take(&mut list_items);
                    push_list(items, list_ordered, &mut checkpoint_counter, &mut blocks);
                }
            }

            Event::Start(Tag::Item) => {
                current_list_item.clear();
                current_task = None;
            }
            Event::End(TagEnd::Item) => {
                current_list_item.push_str(&std::mem::take(&mut current_text));
                finish_item(&mut current_list_item, &mut current_task, &mut list_items);
            }
            Event::TaskListMarker(checked) => {
                current_task = Some(checked);
            }

            Event::Start(Tag::BlockQuote(_)) => {
                flush_text(&mut current_text, &mut blocks);
                in_blockquote = true;
                blockquote_content.clear();
            }
            Event::End(TagEnd::BlockQuote(_)) => {
                in_blockquote = false;
                let content = std::mem::take(&mut blockquote_content).trim().to_string();
                if !content.is_empty() {
                    blocks.push(ContentBlock::Blockquote(content));
                }
            }

            Event::Start(Tag::Table(_)) => {
                flush_text(&mut current_text, &mut blocks);
                in_table = true;
                table_headers.clear();
                table_rows.clear();
            }
            Event::End(TagEnd::Table) => {
                in_table = false;
                let mut table = Table::new(std::mem::take(&mut table_headers));
                table.rows = std::mem::take(&mut table_rows);
                blocks.push(ContentBlock::Table(table));
            }
            Event::Start(Tag::TableHead) | Event::Start(Tag::TableRow) => {
                current_row.clear();
            }
            // Header cells come directly inside TableHead, without a TableRow
            Event::End(TagEnd::TableHead) => {
                if !current_row.is_empty() {
                    table_headers = std::mem::take(&mut current_row);
                }
            }
            Event::End(TagEnd::TableRow) => {
                if !current_row.is_empty() {
                    table_rows.push(std::mem::take(&mut current_row));
                }
            }
            Event::Start(Tag::TableCell) => {
                current_cell.clear();
            }
            Event::End(TagEnd::TableCell) => {
                current_row.push(std::mem::take(&mut current_cell).trim().to_string());
            }

            Event::Start(Tag::Image { dest_url, .. }) => {
                flush_text(&mut current_text, &mut blocks);
                image = Some((String::new(), dest_url.to_string()));
            }
            Event::End(TagEnd::Image) => {
                if let Some((alt, src)) = image.take() {
                    blocks.push(ContentBlock::Image { alt, src });
                }
            }

            Event::Rule => {
                flush_text(&mut current_text, &mut blocks);
                blocks.push(ContentBlock::HorizontalRule);
            }

            Event::Text(text) => {
                if in_code_block {
                    code_content.push_str(&text);
                } else if let Some((alt, _)) = image.as_mut() {
                    alt.push_str(&text);
                } else if in_table {
                    current_cell.push_str(&text);
                } else if list_depth > 0 && heading.is_none() {
                    current_list_item.push_str(&text);
                } else if in_blockquote {
                    blockquote_content.push_str(&text);
                } else {
                    current_text.push_str(&text);
                }
            }

            Event::Code(code) => {
                let target = if in_table {
                    &mut current_cell
                } else if list_depth > 0 {
                    &mut current_list_item
                } else if in_blockquote {
                    &mut blockquote_content
                } else {
                    &mut current_text
                };
                target.push('`');
                target.push_str(&code);
                target.push('`');
            }

            Event::SoftBreak | Event::HardBreak => {
                if in_code_block {
                    code_content.push('\n');
                } else if list_depth > 0 {
                    current_list_item.push(' ');
                } else if in_blockquote {
                    blockquote_content.push('\n');
                } else {
                    current_text.push(' ');
                }
            }

            // Raw HTML is kept in the HTML output only
            Event::Html(_) | Event::InlineHtml(_) => {}

            _ => {}
        }
    }

    flush_text(&mut current_text, &mut blocks);
    blocks
}

fn flush_text(text: &mut String, blocks: &mut Vec<ContentBlock>) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        blocks.push(ContentBlock::Paragraph(trimmed.to_string()));
    }
    text.clear();
}

fn finish_item(
    item: &mut String,
    task: &mut Option<bool>,
    items: &mut Vec<(String, Option<bool>)>,
) {
    let text = std::mem::take(item).trim().to_string();
    if !text.is_empty() {
        items.push((text, task.take()));
    }
}

fn push_list(
    items: Vec<(String, Option<bool>)>,
    ordered: bool,
    checkpoint_counter: &mut usize,
    blocks: &mut Vec<ContentBlock>,
) {
    if items.is_empty() {
        return;
    }

    if items.iter().any(|(_, task)| task.is_some()) {
        let checklist = items
            .into_iter()
            .map(|(text, task)| {
                let id = format!("manual-checkpoint-{}", *checkpoint_counter);
                *checkpoint_counter += 1;
                ChecklistItem { id, text, checked: task.unwrap_or(false) }
            })
            .collect();
        blocks.push(ContentBlock::Checklist(checklist));
    } else {
        let texts = items.into_iter().map(|(text, _)| text).collect();
        if ordered {
            blocks.push(ContentBlock::OrderedList(texts));
        } else {
            blocks.push(ContentBlock::UnorderedList(texts));
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use pulldown_cmark::Parser;

    use super::*;

    fn parse(markdown: &str) -> Vec<ContentBlock> {
        parse_events(Parser::new_ext(markdown, parser_options()))
    }

    #[test]
    fn preprocess_normalizes_line_endings() {
        assert_eq!(preprocess("a\r\nb\rc"), "a\nb\nc\n");
    }

    #[test]
    fn preprocess_separates_headings() {
        assert_eq!(preprocess("text\n## Heading\nbody"), "text\n\n## Heading\nbody\n");
    }

    #[test]
    fn preprocess_leaves_code_fences_alone() {
        let src = "```bash\necho hi\n# comment\n```\n";
        assert_eq!(preprocess(src), src);
    }

    #[test]
    fn preprocess_collapses_blank_runs() {
        assert_eq!(preprocess("a\n\n\n\n\nb"), "a\n\nb\n");
    }

    #[test]
    fn preprocess_ignores_hash_without_space() {
        assert_eq!(preprocess("text\n#hashtag"), "text\n#hashtag\n");
    }

    #[test]
    fn parse_heading_and_paragraph() {
        let blocks = parse("# Title {#intro}\n\nSome text here.");
        assert_eq!(
            blocks,
            vec![
                ContentBlock::Heading { level: 1, text: "Title".into(), id: "intro".into() },
                ContentBlock::Paragraph("Some text here.".into()),
            ]
        );
    }

    #[test]
    fn parse_code_block_language() {
        let blocks = parse("```rust title=x\nfn main() {}\n```");
        assert_eq!(
            blocks,
            vec![ContentBlock::Code(CodeBlock::new("fn main() {}").with_language("rust"))]
        );
    }

    #[test]
    fn parse_task_list_as_checklist() {
        let blocks = parse("- [ ] first\n- [x] second\n\nText\n\n- [ ] third");
        let ids: Vec<_> = blocks
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Checklist(items) => Some(items.clone()),
                _ => None,
            })
            .flatten()
            .map(|i| (i.id, i.checked))
            .collect();

        assert_eq!(
            ids,
            vec![
                ("manual-checkpoint-0".to_string(), false),
                ("manual-checkpoint-1".to_string(), true),
                ("manual-checkpoint-2".to_string(), false),
            ]
        );
    }

    #[test]
    fn parse_nested_list_flattens() {
        let blocks = parse("- one\n  - nested\n- two");
        assert_eq!(
            blocks,
            vec![ContentBlock::UnorderedList(vec!["one".into(), "nested".into(), "two".into()])]
        );
    }

    #[test]
    fn parse_table() {
        let blocks = parse("| A | B |\n|---|---|\n| 1 | 2 |");
        match &blocks[0] {
            ContentBlock::Table(t) => {
                assert_eq!(t.headers, vec!["A", "B"]);
                assert_eq!(t.rows, vec![vec!["1".to_string(), "2".to_string()]]);
            }
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn parse_image_alt_text() {
        let blocks = parse("![diagram](img/flow.png)");
        assert_eq!(
            blocks,
            vec![ContentBlock::Image { alt: "diagram".into(), src: "img/flow.png".into() }]
        );
    }
}
