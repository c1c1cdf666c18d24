//! Short-lived memo of image search results keyed by `query_max_size`.
//!
//! Scraped results change slowly and the upstream throttles bursts, so a
//! repeated lookup inside the TTL is served from here.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::images::ImageResult;

/// Bounded map from search key to the results of that search.
///
/// Holds at most `max_entries` keys. When full, stale keys go first and the
/// least recently stored key after that. A capacity of zero stores nothing.
pub struct ImageCache {
    entries: Mutex<HashMap<String, Stored>>,
    ttl: Duration,
    max_entries: usize,
}

struct Stored {
    results: Vec<ImageResult>,
    at: Instant,
}

impl Stored {
    fn fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.duration_since(self.at) < ttl
    }
}

impl ImageCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            max_entries,
        }
    }

    /// Results stored for `key` within the last `ttl`. A stale hit is
    /// dropped on the way out.
    pub fn get(&self, key: &str) -> Option<Vec<ImageResult>> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some(stored) if stored.fresh(self.ttl, Instant::now()) => Some(stored.results.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store results for `key`, replacing any previous value.
    pub fn put(&self, key: String, results: Vec<ImageResult>) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if !entries.contains_key(&key) && !self.make_room(&mut entries) {
            return;
        }
        entries.insert(
            key,
            Stored {
                results,
                at: Instant::now(),
            },
        );
    }

    /// Frees one slot if the map is full. False when no slot can exist.
    fn make_room(&self, entries: &mut HashMap<String, Stored>) -> bool {
        if self.max_entries == 0 {
            return false;
        }
        if entries.len() < self.max_entries {
            return true;
        }
        let now = Instant::now();
        entries.retain(|_, stored| stored.fresh(self.ttl, now));
        if entries.len() >= self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, stored)| stored.at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }
        true
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
