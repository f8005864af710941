//! Domain Context Cache
//!
//! Concurrent compute-once cache keyed by file path and modification time.
//! A changed modification time invalidates the entry in place.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use crate::types::DomainContext;

/// Cache statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
}

impl CacheStats {
    /// Cache hit rate (0.0 - 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct CachedContext {
    modified: Option<SystemTime>,
    context: Arc<DomainContext>,
}

#[derive(Default)]
pub struct DomainCache {
    entries: DashMap<String, CachedContext>,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl DomainCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached context for `(path, modified)` or compute it.
    ///
    /// The shard lock is held while `compute` runs, so concurrent callers
    /// for the same key wait for the first computation instead of repeating it.
    pub fn get_or_compute<F>(
        &self,
        path: &str,
        modified: Option<SystemTime>,
        compute: F,
    ) -> Arc<DomainContext>
    where
        F: FnOnce() -> DomainContext,
    {
        match self.entries.entry(path.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().modified == modified && modified.is_some() {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Arc::clone(&entry.get().context);
                }
                self.invalidations.fetch_add(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                let context = Arc::new(compute());
                entry.insert(CachedContext {
                    modified,
                    context: Arc::clone(&context),
                });
                context
            }
            Entry::Vacant(entry) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                let context = Arc::new(compute());
                entry.insert(CachedContext {
                    modified,
                    context: Arc::clone(&context),
                });
                context
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
