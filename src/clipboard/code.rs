//! Code block helpers for copying

use once_cell::sync::Lazy;
use regex::Regex;

use crate::templates::Category;

/// Copy kind recorded for prompt templates
pub const TEMPLATE_KIND: &str = "Template";

/// Copy kind recorded for code without a known language
pub const PLAIN_KIND: &str = "Code";

/// Phrases that only appear in the tutorial's prompt templates
const TEMPLATE_KEYWORDS: &[&str] = &[
    "[项目类型]",
    "[解决的核心问题]",
    "[用户群体]",
    "[功能描述]",
    "[技术栈]",
    "[需求描述]",
    "我想开发",
    "请担任",
    "请帮我分析",
    "项目背景：",
    "基本情况：",
    "限制条件：",
    "Act as",
    "Project background:",
    "Constraints:",
];

/// Bracketed placeholders such as `[project type]`
static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\[\]\n]{2,40}\]").unwrap());

/// Normalize code text before it is copied
///
/// Leading and trailing newlines are removed and tabs become four spaces.
pub fn clean_code_text(text: &str) -> String {
    text.trim_start_matches('\n').trim_end_matches('\n').replace('\t', "    ")
}

/// Display name for a fence language
pub fn language_label(language: &str) -> Option<&'static str> {
    let label = match language.trim().to_lowercase().as_str() {
        "javascript" | "js" => "JavaScript",
        "typescript" | "ts" => "TypeScript",
        "html" => "HTML",
        "css" => "CSS",
        "json" => "JSON",
        "markdown" | "md" => "Markdown",
        "bash" | "sh" => "Bash",
        "shell" | "console" => "Shell",
        "yaml" | "yml" => "YAML",
        "xml" => "XML",
        "python" | "py" => "Python",
        "rust" | "rs" => "Rust",
        "toml" => "TOML",
        _ => return None,
    };
    Some(label)
}

/// Whether a code block is a prompt template rather than code
pub fn looks_like_template(text: &str) -> bool {
    if TEMPLATE_KEYWORDS.iter().any(|k| text.contains(k)) {
        return true;
    }
    // Two or more placeholders outside of array-like syntax
    PLACEHOLDER_RE
        .find_iter(text)
        .filter(|m| !m.as_str()[1..].starts_with(|c: char| c.is_ascii_digit() || c == '"'))
        .count()
        >= 2
}

/// Template category guessed from its text
pub fn template_category(text: &str) -> Category {
    if text.contains("我想开发") || text.contains("I want to build") {
        Category::Startup
    } else if text.contains("问题描述：") || text.contains("错误信息：") || text.contains("Error message:")
    {
        Category::Problem
    } else if text.contains("技术选型") || text.contains("架构设计") || text.contains("architecture")
    {
        Category::Advanced
    } else if ["Agent", "IDE", "Memory"].iter().any(|k| text.contains(k)) {
        Category::NewFeatures
    } else {
        Category::Startup
    }
}

/// Usage kind a code block is counted under
pub fn copy_kind(text: &str, language: Option<&str>) -> String {
    if looks_like_template(text) {
        return TEMPLATE_KIND.to_string();
    }
    language.and_then(language_label).unwrap_or(PLAIN_KIND).to_string()
}
