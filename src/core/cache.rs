//! LRU cache for access decisions
//!
//! Decisions are keyed by the canonical inquiry form, so equal inquiries share an
//! entry no matter how they were built. Only successful decisions are cached;
//! a failure is denied and recomputed next time.
//!
//! The cache is not invalidated on storage writes. Call
//! [`AllowanceCache::invalidate`] after changing policies.

use crate::error::Result;
use crate::guard::{report, Guard};
use crate::inquiry::Inquiry;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Storage for cached decisions
pub trait AllowanceCacheBackend: Send + Sync {
    fn get(&self, key: &str) -> Option<bool>;

    fn set(&self, key: String, allowed: bool);

    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries kept
    fn capacity(&self) -> usize;
}

/// Bounded backend evicting the least recently used decision
pub struct LruCacheBackend {
    entries: Mutex<LruCache<String, bool>>,
}

impl LruCacheBackend {
    /// Create a backend holding up to `capacity` decisions (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        LruCacheBackend {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }
}

impl AllowanceCacheBackend for LruCacheBackend {
    fn get(&self, key: &str) -> Option<bool> {
        self.entries.lock().get(key).copied()
    }

    fn set(&self, key: String, allowed: bool) {
        self.entries.lock().put(key, allowed);
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheInfo {
    pub hits: u64,
    pub misses: u64,
    pub capacity: usize,
    pub size: usize,
}

/// Memoizes decisions per inquiry
pub struct AllowanceCache {
    backend: Box<dyn AllowanceCacheBackend>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl AllowanceCache {
    /// Create an LRU-backed cache with given capacity
    pub fn new(capacity: usize) -> Self {
        Self::with_backend(LruCacheBackend::new(capacity))
    }

    pub fn with_backend<B: AllowanceCacheBackend + 'static>(backend: B) -> Self {
        AllowanceCache {
            backend: Box::new(backend),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cached decision for `inquiry`, computing and storing it on a miss
    ///
    /// Errors from `compute` are returned and leave the cache untouched.
    pub fn get_or_compute<F>(&self, inquiry: &Inquiry, compute: F) -> Result<bool>
    where
        F: FnOnce() -> Result<bool>,
    {
        let key = inquiry.to_json_sorted();
        if let Some(allowed) = self.backend.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(allowed);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let allowed = compute()?;
        self.backend.set(key, allowed);
        Ok(allowed)
    }

    pub fn info(&self) -> CacheInfo {
        CacheInfo {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            capacity: self.backend.capacity(),
            size: self.backend.len(),
        }
    }

    /// Drop all cached decisions and reset the counters
    pub fn invalidate(&self) {
        self.backend.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        debug!("Allowance cache invalidated");
    }

    pub fn len(&self) -> usize {
        self.backend.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backend.is_empty()
    }
}

/// A [`Guard`] whose decisions are memoized
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use warden::{CachedGuard, Effect, Guard, Inquiry, MemoryStorage, Policy, RegexChecker, Storage};
///
/// let storage = Arc::new(MemoryStorage::new());
/// storage
///     .add(
///         Policy::new("1")
///             .with_subjects(["<.*>"])
///             .with_actions(["read"])
///             .with_resources(["<.*>"])
///             .with_effect(Effect::Allow),
///     )
///     .unwrap();
///
/// let guard = CachedGuard::new(Guard::new(storage, RegexChecker::new()), 100);
/// let inquiry = Inquiry::new("alice", "read", "books");
///
/// assert!(guard.is_allowed(&inquiry));
/// assert!(guard.is_allowed(&inquiry));
/// assert_eq!(guard.cache().info().hits, 1);
/// ```
pub struct CachedGuard {
    guard: Guard,
    cache: AllowanceCache,
}

impl CachedGuard {
    pub fn new(guard: Guard, capacity: usize) -> Self {
        CachedGuard {
            guard,
            cache: AllowanceCache::new(capacity),
        }
    }

    pub fn with_backend<B: AllowanceCacheBackend + 'static>(guard: Guard, backend: B) -> Self {
        CachedGuard {
            guard,
            cache: AllowanceCache::with_backend(backend),
        }
    }

    /// Is the inquiry allowed? Failures are logged and denied, never cached.
    pub fn is_allowed(&self, inquiry: &Inquiry) -> bool {
        report(inquiry, self.is_allowed_silent(inquiry))
    }

    pub fn is_allowed_silent(&self, inquiry: &Inquiry) -> Result<bool> {
        self.cache
            .get_or_compute(inquiry, || self.guard.is_allowed_silent(inquiry))
    }

    pub fn cache(&self) -> &AllowanceCache {
        &self.cache
    }

    pub fn guard(&self) -> &Guard {
        &self.guard
    }
}
