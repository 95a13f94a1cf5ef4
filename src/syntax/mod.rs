//! Syntax highlighting for code blocks using syntect
//!
//! Blocks are highlighted as a whole so multi-line constructs (block
//! comments, heredocs, strings) keep their state from one line to the next.

use once_cell::sync::Lazy;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};

use crate::theme::Theme;

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);

static THEME_SET: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);

/// syntect theme whose colors sit well on the code background
const SYNTECT_THEME: &str = "base16-ocean.dark";

/// Map fence info names to syntect syntax names
fn normalize_language(lang: &str) -> &str {
    // "rust,ignore" and similar
    let base = lang.split(',').next().unwrap_or(lang).trim();

    match base.to_lowercase().as_str() {
        "sh" | "bash" | "shell" | "zsh" | "console" | "terminal" => "Bourne Again Shell (bash)",
        "js" | "javascript" | "jsx" | "node" => "JavaScript",
        "ts" | "typescript" | "tsx" => "TypeScript",
        "py" | "python" | "python3" => "Python",
        "rs" | "rust" => "Rust",
        "go" | "golang" => "Go",
        "json" | "jsonc" => "JSON",
        "yaml" | "yml" => "YAML",
        "toml" => "TOML",
        "md" | "markdown" => "Markdown",
        "html" | "htm" => "HTML",
        "css" => "CSS",
        "sql" => "SQL",
        "java" => "Java",
        "c" => "C",
        "cpp" | "c++" => "C++",
        "diff" | "patch" => "Diff",
        "dockerfile" | "docker" => "Dockerfile",
        "makefile" | "make" => "Makefile",
        "xml" => "XML",
        _ => base,
    }
}

fn find_syntax(language: Option<&str>) -> Option<&'static SyntaxReference> {
    let lang = language?;
    let normalized = normalize_language(lang);

    SYNTAX_SET
        .find_syntax_by_name(normalized)
        .or_else(|| SYNTAX_SET.find_syntax_by_extension(&normalized.to_lowercase()))
        .or_else(|| SYNTAX_SET.find_syntax_by_token(lang))
}

fn to_ratatui(style: syntect::highlighting::Style, theme: &Theme) -> Style {
    let fg = style.foreground;
    let mut out = Style::default().fg(Color::Rgb(fg.r, fg.g, fg.b)).bg(theme.bg_secondary);

    if style.font_style.contains(FontStyle::BOLD) {
        out = out.add_modifier(Modifier::BOLD);
    }
    if style.font_style.contains(FontStyle::ITALIC) {
        out = out.add_modifier(Modifier::ITALIC);
    }
    if style.font_style.contains(FontStyle::UNDERLINE) {
        out = out.add_modifier(Modifier::UNDERLINED);
    }
    out
}

/// Highlight a code block, one span list per source line
pub fn highlight_block(code: &str, language: Option<&str>, theme: &Theme) -> Vec<Vec<Span<'static>>> {
    let syntax = find_syntax(language);
    let syntect_theme = THEME_SET.themes.get(SYNTECT_THEME);

    let (Some(syntax), Some(syntect_theme)) = (syntax, syntect_theme) else {
        return code.lines().map(|line| plain_line(line, theme)).collect();
    };

    let mut highlighter = HighlightLines::new(syntax, syntect_theme);
    code.lines()
        .map(|line| {
            // syntect's newline syntaxes expect the terminator
            let with_newline = format!("{line}\n");
            match highlighter.highlight_line(&with_newline, &SYNTAX_SET) {
                Ok(ranges) => ranges
                    .into_iter()
                    .filter_map(|(style, text)| {
                        let text = text.trim_end_matches('\n');
                        (!text.is_empty()).then(|| Span::styled(text.to_string(), to_ratatui(style, theme)))
                    })
                    .collect(),
                Err(e) => {
                    tracing::debug!(error = %e, "Highlighting failed, using plain text");
                    plain_line(line, theme)
                }
            }
        })
        .collect()
}

/// Unhighlighted line; comment lines are dimmed
fn plain_line(line: &str, theme: &Theme) -> Vec<Span<'static>> {
    let trimmed = line.trim_start();
    let fg = if trimmed.starts_with('#') || trimmed.starts_with("//") {
        theme.syntax_comment
    } else {
        theme.fg_primary
    };
    vec![Span::styled(line.to_string(), Style::default().fg(fg).bg(theme.bg_secondary))]
}

pub fn is_language_supported(language: &str) -> bool {
    find_syntax(Some(language)).is_some()
}
