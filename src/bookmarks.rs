use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::{Bookmark, Paper};
use crate::store::{self, KeyValueStore, BOOKMARKS_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggled {
    Added,
    Removed,
}

/// Saved papers, keyed by paper id, in insertion order.
#[derive(Debug, Default)]
pub struct Bookmarks {
    items: Vec<Bookmark>,
}

impl Bookmarks {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let mut items: Vec<Bookmark> = store::load_collection(store, BOOKMARKS_KEY);
        // Older data may carry duplicates; the first occurrence wins.
        let mut seen = std::collections::HashSet::new();
        items.retain(|b| seen.insert(b.paper.id.clone()));
        Bookmarks { items }
    }

    pub fn toggle(&mut self, store: &mut dyn KeyValueStore, paper: &Paper, now: DateTime<Utc>) -> Toggled {
        let toggled = match self.items.iter().position(|b| b.paper.id == paper.id) {
            Some(index) => {
                self.items.remove(index);
                Toggled::Removed
            }
            None => {
                self.items.push(Bookmark {
                    paper: paper.clone(),
                    bookmarked_at: now,
                });
                Toggled::Added
            }
        };
        store::save_collection(store, BOOKMARKS_KEY, &self.items);
        debug!("bookmark {} {:?}", paper.id, toggled);
        toggled
    }

    pub fn clear(&mut self, store: &mut dyn KeyValueStore) {
        self.items.clear();
        store::remove_collection(store, BOOKMARKS_KEY);
    }

    pub fn contains(&self, paper_id: &str) -> bool {
        self.items.iter().any(|b| b.paper.id == paper_id)
    }

    pub fn get(&self, index: usize) -> Option<&Bookmark> {
        self.items.get(index)
    }

    pub fn items(&self) -> &[Bookmark] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}
