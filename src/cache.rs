/*!
 * Subtitle caching functionality.
 *
 * A TTL-aware key/value store for parsed tracks and provider search results.
 * The cache never performs I/O; it only stores values and does freshness
 * arithmetic. Clones share the same underlying storage.
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use log::debug;
use parking_lot::RwLock;

/// Default lifetime of cached provider search results
pub const DEFAULT_SEARCH_TTL: Duration = Duration::from_secs(10 * 60);

/// A cached value with its insertion time and lifetime
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// The cached value
    pub value: T,

    /// When the entry was stored
    pub cached_at: Instant,

    /// Lifetime; `None` keeps the entry until it is invalidated
    pub ttl: Option<Duration>,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, ttl: Option<Duration>) -> Self {
        Self {
            value,
            cached_at: Instant::now(),
            ttl,
        }
    }

    /// An entry is fresh while its age does not exceed the TTL
    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Instant::now())
    }

    pub fn is_fresh_at(&self, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => now.saturating_duration_since(self.cached_at) <= ttl,
            None => true,
        }
    }
}

/// Cache statistics snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
    pub hit_rate: f64,
}

/// TTL based store keyed by request fingerprint or subtitle URL
pub struct SubtitleCache<T> {
    /// Internal cache storage
    entries: Arc<RwLock<HashMap<String, CacheEntry<T>>>>,

    /// Lifetime applied by `put`
    default_ttl: Option<Duration>,

    hits: Arc<AtomicUsize>,
    misses: Arc<AtomicUsize>,

    /// Whether caching is enabled
    enabled: bool,
}

impl<T: Clone> SubtitleCache<T> {
    /// Create a cache whose entries expire after `default_ttl`
    pub fn new(default_ttl: Option<Duration>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            default_ttl,
            hits: Arc::new(AtomicUsize::new(0)),
            misses: Arc::new(AtomicUsize::new(0)),
            enabled: true,
        }
    }

    /// Cache for search results (10 minute TTL)
    pub fn for_search_results() -> Self {
        Self::new(Some(DEFAULT_SEARCH_TTL))
    }

    /// Cache for parsed tracks, kept for the session unless cleared
    pub fn for_session() -> Self {
        Self::new(None)
    }

    /// Enable or disable the cache
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Get a fresh value; expired entries are evicted on the way
    pub fn get(&self, key: &str) -> Option<T> {
        if !self.enabled {
            return None;
        }

        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if entry.is_fresh() => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!("Cache hit for '{}'", truncate_text(key, 60));
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    debug!("Cache miss for '{}'", truncate_text(key, 60));
                    return None;
                }
            }
        }

        // Stale: evict unless someone refreshed it in between
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|entry| !entry.is_fresh()) {
            entries.remove(key);
            debug!("Cache entry expired for '{}'", truncate_text(key, 60));
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a value with the default TTL
    pub fn put(&self, key: impl Into<String>, value: T) {
        self.put_with_ttl(key, value, self.default_ttl);
    }

    /// Store a value with an explicit TTL
    pub fn put_with_ttl(&self, key: impl Into<String>, value: T, ttl: Option<Duration>) {
        if !self.enabled {
            return;
        }
        let key = key.into();
        debug!("Cached entry for '{}'", truncate_text(&key, 60));
        self.entries.write().insert(key, CacheEntry::new(value, ttl));
    }

    /// Remove one entry
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Clear every entry and reset statistics
    pub fn clear_all(&self) {
        self.entries.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        debug!("Subtitle cache cleared");
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh_at(now));
        before - entries.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().get(key).is_some_and(CacheEntry::is_fresh)
    }

    /// Number of stored entries, fresh or not
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            hits,
            misses,
            entries: self.len(),
            hit_rate: if total > 0 { hits as f64 / total as f64 } else { 0.0 },
        }
    }
}

impl<T> Clone for SubtitleCache<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            default_ttl: self.default_ttl,
            hits: self.hits.clone(),
            misses: self.misses.clone(),
            enabled: self.enabled,
        }
    }
}

impl<T> std::fmt::Debug for SubtitleCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubtitleCache")
            .field("entries", &self.entries.read().len())
            .field("default_ttl", &self.default_ttl)
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Truncate text to a maximum length with ellipsis
fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    }
}
