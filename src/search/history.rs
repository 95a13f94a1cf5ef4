//! Recent search queries

use crate::storage::{Persistence, keys};

/// Number of queries remembered
pub const MAX_HISTORY: usize = 10;

/// Most-recent-first list of distinct queries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchHistory {
    queries: Vec<String>,
}

impl SearchHistory {
    pub fn load(persistence: &Persistence) -> Self {
        let mut queries: Vec<String> = persistence.get(keys::SEARCHES).unwrap_or_default();
        queries.truncate(MAX_HISTORY);
        Self { queries }
    }

    /// Move `query` to the front, dropping duplicates and the overflow
    pub fn record(&mut self, query: &str, persistence: &mut Persistence) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }
        self.queries.retain(|q| q != query);
        self.queries.insert(0, query.to_string());
        self.queries.truncate(MAX_HISTORY);
        persistence.set(keys::SEARCHES, &self.queries);
    }

    pub fn entries(&self) -> &[String] {
        &self.queries
    }

    pub fn clear(&mut self, persistence: &mut Persistence) {
        self.queries.clear();
        persistence.remove(keys::SEARCHES);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn record_dedupes_and_caps() {
        let mut persistence = Persistence::in_memory();
        let mut history = SearchHistory::default();

        for i in 0..12 {
            history.record(&format!("query {i}"), &mut persistence);
        }
        history.record("query 5", &mut persistence);

        assert_eq!(history.entries().len(), MAX_HISTORY);
        assert_eq!(history.entries()[0], "query 5");
        assert_eq!(history.entries().iter().filter(|q| *q == "query 5").count(), 1);

        let reloaded = SearchHistory::load(&persistence);
        assert_eq!(reloaded, history);
    }

    #[test]
    fn blank_queries_are_not_recorded() {
        let mut persistence = Persistence::in_memory();
        let mut history = SearchHistory::default();
        history.record("   ", &mut persistence);
        assert!(history.entries().is_empty());
        assert_eq!(persistence.get::<Vec<String>>(keys::SEARCHES), None);
    }
}
