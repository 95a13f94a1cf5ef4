//! Transient on-screen notifications

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Maximum number of notifications kept at once
const MAX_VISIBLE: usize = 4;

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
    Info,
    Warning,
    Achievement,
}

impl Level {
    /// Short glyph shown before the title
    pub fn icon(self) -> &'static str {
        match self {
            Level::Success => "✓",
            Level::Error => "✗",
            Level::Info => "i",
            Level::Warning => "!",
            Level::Achievement => "★",
        }
    }
}

/// A single notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub title: String,
    pub message: String,
    pub created: Instant,
    pub expires: Instant,
}

/// Queue of live notifications, newest last
#[derive(Debug, Clone)]
pub struct Notifications {
    items: VecDeque<Notification>,
    duration: Duration,
    achievement_duration: Duration,
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new(Duration::from_millis(3000), Duration::from_millis(5000))
    }
}

impl Notifications {
    pub fn new(duration: Duration, achievement_duration: Duration) -> Self {
        Self { items: VecDeque::new(), duration, achievement_duration }
    }

    /// Queue a notification
    pub fn push(&mut self, level: Level, title: impl Into<String>, message: impl Into<String>) {
        let created = Instant::now();
        let lifetime =
            if level == Level::Achievement { self.achievement_duration } else { self.duration };
        let notification = Notification {
            level,
            title: title.into(),
            message: message.into(),
            created,
            expires: created + lifetime,
        };

        tracing::debug!(?level, title = %notification.title, "Notification");
        self.items.push_back(notification);
        while self.items.len() > MAX_VISIBLE {
            self.items.pop_front();
        }
    }

    pub fn success(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.push(Level::Success, title, message);
    }

    pub fn error(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.push(Level::Error, title, message);
    }

    pub fn info(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.push(Level::Info, title, message);
    }

    pub fn warning(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.push(Level::Warning, title, message);
    }

    pub fn achievement(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.push(Level::Achievement, title, message);
    }

    /// Drop expired notifications; returns true if anything was removed
    pub fn prune(&mut self, now: Instant) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.expires > now);
        self.items.len() != before
    }

    /// Manually dismiss the newest notification
    pub fn dismiss_latest(&mut self) -> Option<Notification> {
        self.items.pop_back()
    }

    /// Live notifications, oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Notification> {
        self.items.iter()
    }

    /// Count of live notifications at a level
    pub fn count(&self, level: Level) -> usize {
        self.items.iter().filter(|n| n.level == level).count()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_iterate_in_order() {
        let mut n = Notifications::default();
        n.success("Copied", "42 chars");
        n.error("Copy failed", "select manually");

        let titles: Vec<_> = n.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, ["Copied", "Copy failed"]);
        assert_eq!(n.count(Level::Error), 1);
    }

    #[test]
    fn prune_removes_expired_only() {
        let mut n = Notifications::new(Duration::from_millis(100), Duration::from_secs(10));
        n.info("short", "");
        n.achievement("long", "");

        let later = Instant::now() + Duration::from_secs(1);
        assert!(n.prune(later));
        assert_eq!(n.len(), 1);
        assert_eq!(n.count(Level::Achievement), 1);
    }

    #[test]
    fn dismiss_latest_pops_newest() {
        let mut n = Notifications::default();
        n.info("first", "");
        n.info("second", "");

        assert_eq!(n.dismiss_latest().unwrap().title, "second");
        assert_eq!(n.len(), 1);
    }

    #[test]
    fn queue_is_bounded() {
        let mut n = Notifications::default();
        for i in 0..10 {
            n.info(format!("n{i}"), "");
        }
        assert_eq!(n.len(), MAX_VISIBLE);
        assert_eq!(n.iter().last().unwrap().title, "n9");
    }
}
