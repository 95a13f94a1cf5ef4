//! Clipboard access with a terminal fallback and usage counters

pub mod code;

use std::collections::BTreeMap;
use std::io::{self, Write};

use crossterm::execute;
use crossterm::style::Print;
use thiserror::Error;

use crate::notify::Notifications;
use crate::storage::{Persistence, keys};

/// Largest payload sent through OSC 52; many terminals drop longer ones
pub const OSC52_MAX_BYTES: usize = 100_000;

/// Errors that can occur when copying
#[derive(Debug, Error)]
pub enum ClipboardError {
    /// No clipboard on this platform or session
    #[error("Clipboard is not available")]
    Unavailable,

    /// The platform clipboard rejected the text
    #[error("Clipboard error: {0}")]
    Platform(String),

    /// Writing the escape sequence failed
    #[error("Terminal write failed: {0}")]
    Io(#[from] io::Error),

    /// Payload exceeds what the backend accepts
    #[error("Text too large to copy ({size} bytes, limit {limit})")]
    TooLarge { size: usize, limit: usize },

    /// Nothing to copy
    #[error("Nothing to copy")]
    Empty,

    /// Every backend failed; carries the last failure
    #[error("Copy failed: {0}")]
    AllBackendsFailed(Box<ClipboardError>),
}

/// A way of putting text on the clipboard
pub trait ClipboardBackend {
    /// Short name used in logs and receipts
    fn name(&self) -> &'static str;

    /// Replace the clipboard contents
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// The platform clipboard
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    /// Connect to the platform clipboard; absent when there is none
    pub fn new() -> Self {
        let inner = match arboard::Clipboard::new() {
            Ok(clipboard) => Some(clipboard),
            Err(e) => {
                tracing::debug!(error = %e, "System clipboard unavailable");
                None
            }
        };
        Self { inner }
    }
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardBackend for SystemClipboard {
    fn name(&self) -> &'static str {
        "system"
    }

    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let clipboard = self.inner.as_mut().ok_or(ClipboardError::Unavailable)?;
        clipboard.set_text(text.to_string()).map_err(|e| ClipboardError::Platform(e.to_string()))
    }
}

/// Clipboard write through the terminal's OSC 52 escape sequence
pub struct Osc52Clipboard<W: Write> {
    out: W,
}

impl<W: Write> Osc52Clipboard<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl Osc52Clipboard<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

/// Escape sequence that sets the clipboard to `text`
pub fn osc52_sequence(text: &str) -> String {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;

    let encoded = STANDARD.encode(text.as_bytes());
    format!("\x1b]52;c;{encoded}\x1b\\")
}

impl<W: Write> ClipboardBackend for Osc52Clipboard<W> {
    fn name(&self) -> &'static str {
        "osc52"
    }

    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let sequence = osc52_sequence(text);
        if sequence.len() > OSC52_MAX_BYTES {
            return Err(ClipboardError::TooLarge { size: sequence.len(), limit: OSC52_MAX_BYTES });
        }
        execute!(self.out, Print(sequence))?;
        Ok(())
    }
}

/// Result of a successful copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyReceipt {
    /// Global copy count after this copy
    pub total: u64,
    /// Kind the copy was counted under
    pub kind: String,
    /// Backend that accepted the text
    pub backend: &'static str,
}

/// Snapshot of the copy counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyStatistics {
    pub total: u64,
    pub by_kind: BTreeMap<String, u64>,
    /// Most copied kind
    pub favorite: Option<String>,
}

/// Copies text and keeps the persisted usage counters
pub struct ClipboardService {
    primary: Box<dyn ClipboardBackend>,
    fallback: Option<Box<dyn ClipboardBackend>>,
    count: u64,
    usage: BTreeMap<String, u64>,
}

impl std::fmt::Debug for ClipboardService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipboardService")
            .field("primary", &self.primary.name())
            .field("fallback", &self.fallback.as_ref().map(|b| b.name()))
            .field("count", &self.count)
            .field("usage", &self.usage)
            .finish()
    }
}

impl ClipboardService {
    pub fn new(
        primary: Box<dyn ClipboardBackend>,
        fallback: Option<Box<dyn ClipboardBackend>>,
    ) -> Self {
        Self { primary, fallback, count: 0, usage: BTreeMap::new() }
    }

    /// System clipboard with the OSC 52 fallback
    pub fn for_terminal() -> Self {
        Self::new(Box::new(SystemClipboard::new()), Some(Box::new(Osc52Clipboard::stdout())))
    }

    /// Load counters from persistence
    pub fn load(&mut self, persistence: &Persistence) {
        self.count = persistence.get(keys::COPY_COUNT).unwrap_or(0);
        self.usage = persistence.get(keys::COPY_USAGE).unwrap_or_default();
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn usage(&self, kind: &str) -> u64 {
        self.usage.get(kind).copied().unwrap_or(0)
    }

    /// Copy `text`, counting it under `kind`
    ///
    /// Counters only move when some backend accepted the text. Both outcomes
    /// queue a notification.
    pub fn copy(
        &mut self,
        text: &str,
        kind: &str,
        persistence: &mut Persistence,
        notifications: &mut Notifications,
    ) -> Result<CopyReceipt, ClipboardError> {
        let backend = match self.write(text) {
            Ok(backend) => backend,
            Err(e) => {
                tracing::warn!(kind, error = %e, "Copy failed");
                notifications.error("Copy failed", "Select the text and copy it manually");
                return Err(e);
            }
        };

        self.count += 1;
        *self.usage.entry(kind.to_string()).or_insert(0) += 1;
        persistence.set(keys::COPY_COUNT, &self.count);
        persistence.set(keys::COPY_USAGE, &self.usage);

        tracing::info!(kind, backend, total = self.count, "Copied to clipboard");
        notifications.success(format!("{kind} copied"), format!("{} characters", text.chars().count()));

        Ok(CopyReceipt { total: self.count, kind: kind.to_string(), backend })
    }

    fn write(&mut self, text: &str) -> Result<&'static str, ClipboardError> {
        if text.is_empty() {
            return Err(ClipboardError::Empty);
        }

        let primary_error = match self.primary.set_text(text) {
            Ok(()) => return Ok(self.primary.name()),
            Err(e) => e,
        };
        tracing::debug!(backend = self.primary.name(), error = %primary_error, "Trying fallback");

        let Some(fallback) = self.fallback.as_mut() else {
            return Err(ClipboardError::AllBackendsFailed(Box::new(primary_error)));
        };

        match fallback.set_text(text) {
            Ok(()) => Ok(fallback.name()),
            Err(e) => Err(ClipboardError::AllBackendsFailed(Box::new(e))),
        }
    }

    pub fn statistics(&self) -> CopyStatistics {
        let favorite = self
            .usage
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(kind, _)| kind.clone());
        CopyStatistics { total: self.count, by_kind: self.usage.clone(), favorite }
    }

    /// Forget all counters
    pub fn reset(&mut self, persistence: &mut Persistence) {
        self.count = 0;
        self.usage.clear();
        persistence.remove(keys::COPY_COUNT);
        persistence.remove(keys::COPY_USAGE);
    }
}
