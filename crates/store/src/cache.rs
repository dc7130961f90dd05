/*
 * SPDX-FileCopyrightText: 2024 MailProbe Contributors
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use std::sync::Arc;

use lru_cache::LruCache;
use parking_lot::Mutex;

use crate::TermRecord;

/// In-memory LRU over the hot slice of the term table.
///
/// The cache is owned by the store handle and shared between clones; the
/// mutex is held only for the duration of one cache operation. Entries are
/// refreshed from committed data only, so the cache never gets ahead of
/// the database.
#[derive(Clone)]
pub struct TermCache {
    inner: Arc<Mutex<LruCache<String, TermRecord, ahash::RandomState>>>,
    capacity: usize,
}

impl TermCache {
    pub fn with_capacity(capacity: usize) -> Self {
        TermCache {
            inner: Arc::new(Mutex::new(LruCache::with_hasher(
                capacity.max(1),
                ahash::RandomState::new(),
            ))),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, term: &str) -> Option<TermRecord> {
        self.inner.lock().get_mut(term).map(|entry| *entry)
    }

    pub fn insert(&self, term: String, record: TermRecord) {
        self.inner.lock().insert(term, record);
    }

    pub fn remove(&self, term: &str) {
        self.inner.lock().remove(term);
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
