use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::HistoryEntry;
use crate::store::{self, KeyValueStore, HISTORY_KEY};

pub const MAX_HISTORY: usize = 50;

/// Most-recent-first log of past searches, unique by query text.
#[derive(Debug, Default)]
pub struct SearchHistory {
    entries: Vec<HistoryEntry>,
}

impl SearchHistory {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let mut entries: Vec<HistoryEntry> = store::load_collection(store, HISTORY_KEY);
        entries.truncate(MAX_HISTORY);
        SearchHistory { entries }
    }

    pub fn record(
        &mut self,
        store: &mut dyn KeyValueStore,
        query: &str,
        result_count: u32,
        now: DateTime<Utc>,
    ) {
        self.entries.retain(|entry| entry.query != query);
        self.entries.insert(
            0,
            HistoryEntry {
                query: query.to_string(),
                result_count,
                timestamp: now,
            },
        );
        self.entries.truncate(MAX_HISTORY);
        store::save_collection(store, HISTORY_KEY, &self.entries);
        debug!("recorded search {:?} ({} results)", query, result_count);
    }

    pub fn clear(&mut self, store: &mut dyn KeyValueStore) {
        self.entries.clear();
        store::remove_collection(store, HISTORY_KEY);
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
