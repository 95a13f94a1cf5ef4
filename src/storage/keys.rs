//! Persistent key space

/// Id of the section the reader last navigated to
pub const ACTIVE_SECTION: &str = "active-section";

/// Map of navigation node id to expanded flag
pub const SECTION_STATES: &str = "section-states";

/// Bookmarked section ids
pub const BOOKMARKS: &str = "bookmarks";

/// Total successful copies
pub const COPY_COUNT: &str = "copy-count";

/// Successful copies per content kind
pub const COPY_USAGE: &str = "copy-usage";

/// Template usage counts keyed by template id
pub const TEMPLATE_USAGE: &str = "template-usage";

/// Checkpoint records keyed by checkpoint id
pub const CHECKPOINTS: &str = "checkpoints";

/// Section progress records keyed by section id
pub const CHAPTERS: &str = "chapters";

/// Accumulated reading time in milliseconds
pub const SESSION_TIME: &str = "session-time";

/// Recent search queries, most recent first
pub const SEARCHES: &str = "searches";
