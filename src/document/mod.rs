//! Document loading and rendering
//!
//! A document is fetched as markdown, rendered to HTML, and parsed into the
//! block model that the terminal view lays out.

pub mod fetch;
pub mod markdown;
pub mod model;
pub mod render;
pub mod slug;

pub use fetch::{DocumentSource, FetchError, fetch_document, http_client};
pub use model::{ChecklistItem, CodeBlock, ContentBlock, Document, Section, Table};
pub use render::{ContentRenderer, RenderedDocument};
pub use slug::{CuratedIds, slugify};
