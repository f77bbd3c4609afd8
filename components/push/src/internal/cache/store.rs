/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::clock::Clock;
use super::fetch::Response;
use super::rule::{CacheRule, Expiration};

struct Entry {
    response: Response,
    stored_at: i64,
    last_used: u64,
}

/// One bounded cache. Expired entries and LRU overflow are purged whenever
/// the cache is touched.
pub struct NamedCache {
    expiration: Expiration,
    entries: HashMap<String, Entry>,
    tick: u64,
}

impl NamedCache {
    pub fn new(expiration: Expiration) -> Self {
        Self {
            expiration,
            entries: HashMap::new(),
            tick: 0,
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    pub fn lookup(&mut self, key: &str, now: i64) -> Option<Response> {
        self.purge(now);
        let tick = self.next_tick();
        let entry = self.entries.get_mut(key)?;
        entry.last_used = tick;
        Some(entry.response.clone())
    }

    pub fn store(&mut self, key: &str, response: Response, now: i64) {
        let last_used = self.next_tick();
        self.entries.insert(
            key.to_string(),
            Entry {
                response,
                stored_at: now,
                last_used,
            },
        );
        self.purge(now);
    }

    fn purge(&mut self, now: i64) {
        let max_age = self.expiration.max_age.as_secs() as i64;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_sub(entry.stored_at) <= max_age);
        while self.entries.len() > self.expiration.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
        let purged = before.saturating_sub(self.entries.len());
        if purged > 0 {
            log::trace!("purged {} cache entries", purged);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

/// All named caches of the worker, created on first use.
pub struct CacheStorage {
    caches: Mutex<HashMap<String, NamedCache>>,
    clock: Arc<dyn Clock>,
}

impl CacheStorage {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            caches: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub fn lookup(&self, rule: &CacheRule, key: &str) -> Option<Response> {
        let now = self.clock.now_epoch_seconds();
        let mut caches = self.caches.lock();
        caches
            .entry(rule.cache_name.clone())
            .or_insert_with(|| NamedCache::new(rule.expiration))
            .lookup(key, now)
    }

    pub fn store(&self, rule: &CacheRule, key: &str, response: Response) {
        let now = self.clock.now_epoch_seconds();
        let mut caches = self.caches.lock();
        caches
            .entry(rule.cache_name.clone())
            .or_insert_with(|| NamedCache::new(rule.expiration))
            .store(key, response, now);
    }

    /// Number of entries currently held by `cache_name`, without purging.
    pub fn len(&self, cache_name: &str) -> usize {
        self.caches.lock().get(cache_name).map_or(0, NamedCache::len)
    }

    pub fn contains(&self, cache_name: &str, key: &str) -> bool {
        self.caches
            .lock()
            .get(cache_name)
            .is_some_and(|cache| cache.contains(key))
    }

    pub fn clear(&self) {
        self.caches.lock().clear();
    }
}
