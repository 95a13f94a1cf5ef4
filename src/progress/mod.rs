//! Learning progress tracking
//!
//! Records which sections were visited, which checkpoints were completed and
//! how long the reader has spent in the document. Milestones and chapter
//! completion raise one-shot achievements; a milestone counts as fired once
//! its key exists in the checkpoint map.

use std::collections::BTreeMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::document::ChecklistItem;
use crate::notify::Notifications;
use crate::storage::{Persistence, keys};

/// Copy counts that raise an achievement
pub const COPY_MILESTONES: [u64; 5] = [1, 5, 10, 20, 50];

/// Checkpoint key recording that every chapter was completed
pub const ALL_CHAPTERS_KEY: &str = "all-chapters";

/// Unix time in milliseconds
fn timestamp() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_millis() as i64)
}

/// Visit and completion state of a section or checkpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProgressRecord {
    pub visited: bool,
    pub visited_at: Option<i64>,
    pub completed: bool,
    pub completed_at: Option<i64>,
    /// Set for records that are not content positions (`milestone`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ProgressRecord {
    fn visited_now() -> Self {
        Self { visited: true, visited_at: Some(timestamp()), ..Default::default() }
    }

    fn complete(&mut self) {
        self.completed = true;
        self.completed_at = Some(timestamp());
    }
}

/// Coarse status of a section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionStatus {
    NotStarted,
    Visited,
    Completed,
}

impl SectionStatus {
    pub fn icon(self) -> &'static str {
        match self {
            SectionStatus::NotStarted => "○",
            SectionStatus::Visited => "◐",
            SectionStatus::Completed => "●",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SectionStatus::NotStarted => "Not started",
            SectionStatus::Visited => "Visited",
            SectionStatus::Completed => "Completed",
        }
    }
}

/// Totals and percentages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub total: usize,
    pub visited: usize,
    pub completed: usize,
    /// Completed share, rounded percent
    pub percent: u8,
}

impl Tally {
    fn new(total: usize, visited: usize, completed: usize) -> Self {
        let percent =
            if total == 0 { 0 } else { ((completed * 100 + total / 2) / total).min(100) as u8 };
        Self { total, visited, completed, percent }
    }
}

/// Snapshot for the progress panel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LearningStats {
    pub chapters: Tally,
    pub checkpoints: Tally,
    pub copies: u64,
    pub session_time_ms: u64,
}

/// Everything the tracker knows, for export
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressExport {
    pub exported_at: i64,
    pub stats: LearningStats,
    pub chapters: BTreeMap<String, ProgressRecord>,
    pub checkpoints: BTreeMap<String, ProgressRecord>,
    pub session_time_ms: u64,
}

/// A chapter as shown in the progress panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub id: String,
    pub title: String,
}

/// Derives and persists progress from reader activity
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    sections: BTreeMap<String, ProgressRecord>,
    checkpoints: BTreeMap<String, ProgressRecord>,
    session_ms: u64,
    chapters: Vec<Chapter>,
    manual: Vec<ChecklistItem>,
    tick_interval: Duration,
    /// Instant up to which session time has been counted
    counted_until: Instant,
}

impl ProgressTracker {
    /// Load stored progress; session time counts from `now`
    pub fn load(persistence: &Persistence, tick_interval: Duration, now: Instant) -> Self {
        Self {
            sections: persistence.get(keys::CHAPTERS).unwrap_or_default(),
            checkpoints: persistence.get(keys::CHECKPOINTS).unwrap_or_default(),
            session_ms: persistence.get(keys::SESSION_TIME).unwrap_or(0),
            chapters: Vec::new(),
            manual: Vec::new(),
            tick_interval,
            counted_until: now,
        }
    }

    /// Chapters that count toward overall completion
    pub fn set_chapters(&mut self, chapters: impl IntoIterator<Item = Chapter>) {
        self.chapters = chapters.into_iter().collect();
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    /// Checklist items the reader can tick off
    pub fn set_manual_checkpoints(&mut self, items: impl IntoIterator<Item = ChecklistItem>) {
        self.manual = items.into_iter().collect();
    }

    pub fn manual_checkpoints(&self) -> &[ChecklistItem] {
        &self.manual
    }

    fn save_sections(&self, persistence: &mut Persistence) {
        persistence.set(keys::CHAPTERS, &self.sections);
    }

    fn save_checkpoints(&self, persistence: &mut Persistence) {
        persistence.set(keys::CHECKPOINTS, &self.checkpoints);
    }

    /// Record a section becoming current
    pub fn on_section_activated(&mut self, id: &str, persistence: &mut Persistence) {
        self.mark_section_visited(id, persistence);
        if id.contains("checkpoint") {
            self.mark_checkpoint_visited(id, persistence);
        }
    }

    /// Returns true the first time a section is visited
    pub fn mark_section_visited(&mut self, id: &str, persistence: &mut Persistence) -> bool {
        match self.sections.get_mut(id) {
            Some(record) if record.visited => return false,
            Some(record) => {
                record.visited = true;
                record.visited_at = Some(timestamp());
            }
            None => {
                self.sections.insert(id.to_string(), ProgressRecord::visited_now());
            }
        }
        self.save_sections(persistence);
        tracing::debug!(section = id, "Section visited");
        true
    }

    pub fn mark_checkpoint_visited(&mut self, id: &str, persistence: &mut Persistence) -> bool {
        if self.checkpoints.contains_key(id) {
            return false;
        }
        self.checkpoints.insert(id.to_string(), ProgressRecord::visited_now());
        self.save_checkpoints(persistence);
        true
    }

    pub fn mark_checkpoint_completed(&mut self, id: &str, persistence: &mut Persistence) {
        self.checkpoints.entry(id.to_string()).or_default().complete();
        self.save_checkpoints(persistence);
        tracing::info!(checkpoint = id, "Checkpoint completed");
    }

    /// Flip a checklist checkpoint; returns whether it is now completed
    pub fn toggle_manual_checkpoint(&mut self, id: &str, persistence: &mut Persistence) -> bool {
        let done = self.checkpoints.get(id).is_some_and(|r| r.completed);
        if done {
            if let Some(record) = self.checkpoints.get_mut(id) {
                record.completed = false;
                record.completed_at = None;
            }
            self.save_checkpoints(persistence);
            false
        } else {
            self.mark_checkpoint_completed(id, persistence);
            true
        }
    }

    pub fn is_checkpoint_completed(&self, id: &str) -> bool {
        self.checkpoints.get(id).is_some_and(|r| r.completed)
    }

    /// Mark a chapter completed
    ///
    /// Returns false if it already was. Completing the last open chapter also
    /// raises the one-shot overall achievement.
    pub fn mark_chapter_completed(
        &mut self,
        id: &str,
        persistence: &mut Persistence,
        notifications: &mut Notifications,
    ) -> bool {
        let record = self.sections.entry(id.to_string()).or_default();
        if record.completed {
            return false;
        }
        if !record.visited {
            record.visited = true;
            record.visited_at = Some(timestamp());
        }
        record.complete();
        self.save_sections(persistence);

        let title = self.chapters.iter().find(|c| c.id == id).map_or(id, |c| c.title.as_str());
        notifications.achievement("Chapter complete", format!("Finished \"{title}\""));
        tracing::info!(chapter = id, "Chapter completed");

        self.check_overall_completion(persistence, notifications);
        true
    }

    fn check_overall_completion(
        &mut self,
        persistence: &mut Persistence,
        notifications: &mut Notifications,
    ) {
        if self.chapters.is_empty() || self.checkpoints.contains_key(ALL_CHAPTERS_KEY) {
            return;
        }
        let all_done = self
            .chapters
            .iter()
            .all(|c| self.sections.get(&c.id).is_some_and(|r| r.completed));
        if !all_done {
            return;
        }

        let mut record = ProgressRecord::visited_now();
        record.complete();
        record.kind = Some("milestone".to_string());
        record.description = Some("Completed every chapter".to_string());
        self.checkpoints.insert(ALL_CHAPTERS_KEY.to_string(), record);
        self.save_checkpoints(persistence);

        notifications.achievement("Guide complete", "Every chapter is done");
    }

    /// React to a new global copy count; returns the milestones fired
    pub fn on_copy_count(
        &mut self,
        total: u64,
        persistence: &mut Persistence,
        notifications: &mut Notifications,
    ) -> Vec<u64> {
        let mut fired = Vec::new();

        for milestone in COPY_MILESTONES {
            let key = format!("copy-{milestone}");
            if total < milestone || self.checkpoints.contains_key(&key) {
                continue;
            }

            let mut record = ProgressRecord::visited_now();
            record.complete();
            record.kind = Some("milestone".to_string());
            record.description = Some(format!("Copied {milestone} blocks"));
            self.checkpoints.insert(key, record);

            notifications.achievement("Copy milestone", format!("{milestone} blocks copied"));
            tracing::info!(milestone, "Copy milestone reached");
            fired.push(milestone);
        }

        if !fired.is_empty() {
            self.save_checkpoints(persistence);
        }
        fired
    }

    /// Count whole elapsed intervals of reading time
    ///
    /// Returns true when time was added.
    pub fn tick(&mut self, now: Instant, persistence: &mut Persistence) -> bool {
        let elapsed = now.saturating_duration_since(self.counted_until);
        let interval = self.tick_interval.max(Duration::from_millis(1));
        let ticks = elapsed.as_millis() / interval.as_millis();
        if ticks == 0 {
            return false;
        }

        let added = interval * ticks as u32;
        self.session_ms += added.as_millis() as u64;
        self.counted_until += added;
        persistence.set(keys::SESSION_TIME, &self.session_ms);
        true
    }

    /// Count the remaining uncounted time (on exit)
    pub fn flush(&mut self, now: Instant, persistence: &mut Persistence) {
        let elapsed = now.saturating_duration_since(self.counted_until);
        self.session_ms += elapsed.as_millis() as u64;
        self.counted_until = now;
        persistence.set(keys::SESSION_TIME, &self.session_ms);
    }

    pub fn session_time(&self) -> Duration {
        Duration::from_millis(self.session_ms)
    }

    pub fn section_status(&self, id: &str) -> SectionStatus {
        match self.sections.get(id) {
            Some(r) if r.completed => SectionStatus::Completed,
            Some(r) if r.visited => SectionStatus::Visited,
            _ => SectionStatus::NotStarted,
        }
    }

    pub fn stats(&self, copies: u64) -> LearningStats {
        let chapter_records = self.chapters.iter().filter_map(|c| self.sections.get(&c.id));
        let (visited, completed) = chapter_records
            .fold((0, 0), |(v, c), r| (v + usize::from(r.visited), c + usize::from(r.completed)));

        let checkpoints_done = self.checkpoints.values().filter(|r| r.completed).count();

        LearningStats {
            chapters: Tally::new(self.chapters.len(), visited, completed),
            checkpoints: Tally::new(self.checkpoints.len(), self.checkpoints.len(), checkpoints_done),
            copies,
            session_time_ms: self.session_ms,
        }
    }

    pub fn export(&self, copies: u64) -> ProgressExport {
        ProgressExport {
            exported_at: timestamp(),
            stats: self.stats(copies),
            chapters: self.sections.clone(),
            checkpoints: self.checkpoints.clone(),
            session_time_ms: self.session_ms,
        }
    }

    /// Forget all progress
    pub fn reset(&mut self, now: Instant, persistence: &mut Persistence) {
        self.sections.clear();
        self.checkpoints.clear();
        self.session_ms = 0;
        self.counted_until = now;
        persistence.remove(keys::CHECKPOINTS);
        persistence.remove(keys::CHAPTERS);
        persistence.remove(keys::SESSION_TIME);
        tracing::info!("Progress reset");
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::notify::Level;

    fn tracker(persistence: &Persistence, now: Instant) -> ProgressTracker {
        let mut t = ProgressTracker::load(persistence, Duration::from_secs(60), now);
        t.set_chapters([
            Chapter { id: "chapter-1".into(), title: "Quick start".into() },
            Chapter { id: "chapter-2".into(), title: "Full workflow".into() },
        ]);
        t
    }

    #[test]
    fn section_visit_is_recorded_once() {
        let mut persistence = Persistence::in_memory();
        let mut t = tracker(&persistence, Instant::now());

        assert!(t.mark_section_visited("chapter-1", &mut persistence));
        assert!(!t.mark_section_visited("chapter-1", &mut persistence));
        assert_eq!(t.section_status("chapter-1"), SectionStatus::Visited);

        let stored: BTreeMap<String, ProgressRecord> = persistence.get(keys::CHAPTERS).unwrap();
        assert!(stored["chapter-1"].visited);
    }

    #[test]
    fn checkpoint_headings_are_tracked() {
        let mut persistence = Persistence::in_memory();
        let mut t = tracker(&persistence, Instant::now());

        t.on_section_activated("checkpoint-basics", &mut persistence);
        t.on_section_activated("chapter-2", &mut persistence);

        let stats = t.stats(0);
        assert_eq!(stats.checkpoints.total, 1);
        assert_eq!(stats.checkpoints.completed, 0);
    }

    #[test]
    fn copy_milestone_fires_once() {
        let mut persistence = Persistence::in_memory();
        let mut notifications = Notifications::default();
        let mut t = tracker(&persistence, Instant::now());

        assert_eq!(t.on_copy_count(1, &mut persistence, &mut notifications), vec![1]);
        assert_eq!(t.on_copy_count(4, &mut persistence, &mut notifications), Vec::<u64>::new());
        assert_eq!(t.on_copy_count(5, &mut persistence, &mut notifications), vec![5]);
        assert_eq!(t.on_copy_count(6, &mut persistence, &mut notifications), Vec::<u64>::new());
        assert_eq!(notifications.count(Level::Achievement), 2);

        let reloaded = tracker(&persistence, Instant::now());
        let mut again = reloaded;
        assert!(again.on_copy_count(7, &mut persistence, &mut notifications).is_empty());
    }

    #[test]
    fn copy_jump_fires_every_crossed_milestone() {
        let mut persistence = Persistence::in_memory();
        let mut t = tracker(&persistence, Instant::now());
        let fired = t.on_copy_count(12, &mut persistence, &mut Notifications::default());
        assert_eq!(fired, vec![1, 5, 10]);
    }

    #[test]
    fn chapter_completion_and_overall_achievement() {
        let mut persistence = Persistence::in_memory();
        let mut notifications = Notifications::default();
        let mut t = tracker(&persistence, Instant::now());

        assert!(t.mark_chapter_completed("chapter-1", &mut persistence, &mut notifications));
        assert!(!t.mark_chapter_completed("chapter-1", &mut persistence, &mut notifications));
        assert!(!t.is_checkpoint_completed(ALL_CHAPTERS_KEY));

        t.mark_chapter_completed("chapter-2", &mut persistence, &mut notifications);
        assert!(t.is_checkpoint_completed(ALL_CHAPTERS_KEY));
        // two chapters plus the overall one
        assert_eq!(notifications.count(Level::Achievement), 3);

        let stats = t.stats(0);
        assert_eq!(stats.chapters.completed, 2);
        assert_eq!(stats.chapters.percent, 100);
    }

    #[test]
    fn manual_checkpoint_toggles() {
        let mut persistence = Persistence::in_memory();
        let mut t = tracker(&persistence, Instant::now());

        assert!(t.toggle_manual_checkpoint("manual-checkpoint-0", &mut persistence));
        assert!(t.is_checkpoint_completed("manual-checkpoint-0"));
        assert!(!t.toggle_manual_checkpoint("manual-checkpoint-0", &mut persistence));
        assert!(!t.is_checkpoint_completed("manual-checkpoint-0"));
    }

    #[test]
    fn session_time_counts_whole_ticks_then_flushes_rest() {
        let mut persistence = Persistence::in_memory();
        let start = Instant::now();
        let mut t = tracker(&persistence, start);

        assert!(!t.tick(start + Duration::from_secs(59), &mut persistence));
        assert!(t.tick(start + Duration::from_secs(130), &mut persistence));
        assert_eq!(t.session_time(), Duration::from_secs(120));

        t.flush(start + Duration::from_secs(135), &mut persistence);
        assert_eq!(t.session_time(), Duration::from_secs(135));
        assert_eq!(persistence.get::<u64>(keys::SESSION_TIME), Some(135_000));
    }

    #[test]
    fn reset_clears_everything() {
        let mut persistence = Persistence::in_memory();
        let now = Instant::now();
        let mut t = tracker(&persistence, now);
        t.mark_section_visited("chapter-1", &mut persistence);
        t.flush(now + Duration::from_secs(5), &mut persistence);

        t.reset(now, &mut persistence);
        assert_eq!(t.section_status("chapter-1"), SectionStatus::NotStarted);
        assert_eq!(t.session_time(), Duration::ZERO);
        assert_eq!(persistence.get::<u64>(keys::SESSION_TIME), None);
    }

    #[test]
    fn export_serializes() {
        let persistence = Persistence::in_memory();
        let t = tracker(&persistence, Instant::now());
        let json = serde_json::to_value(t.export(3)).unwrap();
        assert_eq!(json["stats"]["copies"], 3);
        assert_eq!(json["stats"]["chapters"]["total"], 2);
    }

    #[test]
    fn tally_rounds_percent() {
        assert_eq!(Tally::new(3, 3, 1).percent, 33);
        assert_eq!(Tally::new(3, 3, 2).percent, 67);
        assert_eq!(Tally::new(0, 0, 0).percent, 0);
    }
}
