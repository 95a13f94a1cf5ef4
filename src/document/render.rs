//! Markdown to HTML rendering with heading ids

use once_cell::sync::Lazy;
use pulldown_cmark::{CowStr, Event, Parser, Tag, TagEnd, html};
use regex::{Captures, Regex};

use super::markdown::{parse_events, parser_options, preprocess};
use super::model::Document;
use super::slug::{CuratedIds, HeadingIds};
use crate::config::Config;

/// 1x1 transparent SVG shown until a lazy image is loaded
pub const LAZY_PLACEHOLDER: &str = "data:image/svg+xml,%3Csvg xmlns='http://www.w3.org/2000/svg' width='1' height='1'%3E%3C/svg%3E";

static TABLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<table\b[^>]*>.*?</table>").unwrap());

static IMG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<img([^>]*?)\ssrc="([^"]*)"([^>]*?)\s*/?>"#).unwrap());

static EXTERNAL_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<a\s+href="(https?://[^"]*)"([^>]*)>"#).unwrap());

/// Output of a render pass
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    /// Post-processed HTML
    pub html: String,
    /// Block model built from the same event stream
    pub document: Document,
}

/// Converts markdown into HTML and the block model
#[derive(Debug, Clone, Default)]
pub struct ContentRenderer {
    curated: CuratedIds,
}

impl ContentRenderer {
    pub fn new(curated: CuratedIds) -> Self {
        Self { curated }
    }

    /// Renderer using the built-in id table plus configured overrides
    pub fn from_config(config: &Config) -> Self {
        let mut curated = CuratedIds::builtin();
        curated.extend(config.heading_ids.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self::new(curated)
    }

    /// Render raw markdown
    pub fn render(&self, raw: &str) -> RenderedDocument {
        let text = preprocess(raw);
        let mut events: Vec<Event<'_>> = Parser::new_ext(&text, parser_options()).collect();

        assign_heading_ids(&mut events, &self.curated);

        let document = Document::from_blocks(parse_events(events.iter().cloned()));

        let mut raw_html = String::with_capacity(text.len() * 3 / 2);
        html::push_html(&mut raw_html, events.into_iter());

        tracing::debug!(
            sections = document.sections.len(),
            blocks = document.blocks.len(),
            "Rendered document"
        );

        RenderedDocument { html: postprocess_html(&raw_html), document }
    }
}

/// Give every heading event an id
pub fn assign_heading_ids(events: &mut [Event<'_>], curated: &CuratedIds) {
    let mut ids = HeadingIds::new(curated);

    for i in 0..events.len() {
        let explicit = match &events[i] {
            Event::Start(Tag::Heading { id, .. }) => id.as_ref().map(|id| id.to_string()),
            _ => continue,
        };

        let text = heading_text(&events[i + 1..]);
        let id = ids.assign(&text, explicit.as_deref());

        if let Event::Start(Tag::Heading { id: slot, .. }) = &mut events[i] {
            *slot = Some(CowStr::from(id));
        }
    }
}

/// Plain text of a heading, up to its end tag
fn heading_text(events: &[Event<'_>]) -> String {
    let mut text = String::new();
    for event in events {
        match event {
            Event::End(TagEnd::Heading(_)) => break,
            Event::Text(t) | Event::Code(t) => text.push_str(t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            _ => {}
        }
    }
    text
}

/// Apply the HTML rewrites for the browser output
///
/// Tables are wrapped for horizontal scrolling, images load lazily and
/// absolute links open in a new browsing context.
pub fn postprocess_html(html: &str) -> String {
    let html = TABLE_RE.replace_all(html, r#"<div class="table-wrapper">${0}</div>"#);

    let html = IMG_RE.replace_all(&html, |caps: &Captures| {
        let src = &caps[2];
        if src.starts_with("data:") {
            return caps[0].to_string();
        }
        format!(
            r#"<img{} src="{}" data-src="{}" loading="lazy"{} />"#,
            &caps[1], LAZY_PLACEHOLDER, src, &caps[3]
        )
    });

    let html = EXTERNAL_LINK_RE.replace_all(&html, |caps: &Captures| {
        let attrs = &caps[2];
        if attrs.contains("target=") {
            return caps[0].to_string();
        }
        format!(r#"<a href="{}"{} target="_blank" rel="noopener noreferrer">"#, &caps[1], attrs)
    });

    html.into_owned()
}
