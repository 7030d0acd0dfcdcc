use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use lru::LruCache;
use sha2::{Digest, Sha256};

/// Bump when the cached value format or prompt changes.
const CACHE_VERSION: u32 = 1;

pub const DEFAULT_MAX_ENTRIES: usize = 2000;
pub const DEFAULT_TTL: Duration = Duration::from_millis(600_000);

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            ttl: DEFAULT_TTL,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

/// A cached provider result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedTranslation {
    pub text: String,
    pub detected_source_lang: Option<String>,
}

struct Entry {
    value: CachedTranslation,
    inserted_at: Instant,
}

/// Process-wide translation cache: LRU-bounded, with a fixed TTL per entry.
///
/// The lock is only held for map operations, never across an await. Two
/// concurrent misses on one key may both call the provider; the later insert
/// wins.
pub struct TranslationCache {
    entries: Mutex<LruCache<String, Entry>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl TranslationCache {
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl: config.ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Build the cache key for `(version, source, target, text)`.
    /// A missing source language is keyed as `auto`.
    pub fn key(source_lang: Option<&str>, target_lang: &str, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(CACHE_VERSION.to_be_bytes());
        hasher.update(source_lang.unwrap_or("auto").to_ascii_lowercase().as_bytes());
        hasher.update([0u8]);
        hasher.update(target_lang.to_ascii_lowercase().as_bytes());
        hasher.update([0u8]);
        hasher.update(text.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn get(&self, key: &str) -> Option<CachedTranslation> {
        let mut entries = self.lock();

        let expired = entries
            .peek(key)
            .map(|entry| entry.inserted_at.elapsed() > self.ttl);
        let fresh = match expired {
            Some(false) => entries.get(key).map(|entry| entry.value.clone()),
            Some(true) => {
                entries.pop(key);
                None
            }
            None => None,
        };

        match fresh {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, key: String, value: CachedTranslation) {
        let entry = Entry {
            value,
            inserted_at: Instant::now(),
        };
        let mut entries = self.lock();
        if let Some((evicted_key, _)) = entries.push(key.clone(), entry) {
            if evicted_key != key {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.lock().len(),
        }
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    // The cache is advisory: a poisoned lock still holds a usable map.
    fn lock(&self) -> MutexGuard<'_, LruCache<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
