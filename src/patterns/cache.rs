//! Process-wide, thread-safe cache of compiled regexes (§4.1).
//!
//! The cache is the sole path by which any component obtains a compiled
//! matcher. Entries are immutable once inserted; compilation happens
//! outside the lock so concurrent misses for distinct keys never serialize
//! on each other, and a double-checked insert collapses a compile race for
//! the same key down to one winner.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use regex::Regex;

use crate::core::config::PatternCacheConfig;
use crate::core::errors::{HardGatesError, Result};

/// Compile flags affecting how a pattern is interpreted. Part of the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CompileFlags {
    /// Case-insensitive matching.
    pub case_insensitive: bool,
    /// `.` matches newlines.
    pub dot_matches_new_line: bool,
}

/// A compiled regex plus the declared weight its pattern entry carried.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    /// Source regex text, kept for reporting.
    pub source: String,
    /// The compiled matcher.
    pub regex: Arc<Regex>,
    /// Declared weight from the catalog entry this pattern came from.
    pub weight: f64,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct CacheKey {
    source: String,
    flags: CompileFlags,
}

struct Entry {
    pattern: Arc<Regex>,
    approx_bytes: usize,
    last_used: u64,
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of entries currently resident.
    pub size: usize,
    /// Cumulative cache hits.
    pub hits: u64,
    /// Cumulative cache misses.
    pub misses: u64,
    /// Approximate memory estimate, in bytes, using byte-counted heuristics.
    pub memory_estimate_bytes: usize,
    /// Cumulative evictions due to the LRU bound.
    pub evictions: u64,
}

/// Thread-safe, keyed cache of compiled regexes with an LRU eviction bound.
pub struct PatternCache {
    entries: RwLock<std::collections::HashMap<CacheKey, Entry>>,
    config: PatternCacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    clock: AtomicU64,
}

impl PatternCache {
    /// Construct a new cache with the given sizing configuration.
    pub fn new(config: PatternCacheConfig) -> Self {
        Self {
            entries: RwLock::new(std::collections::HashMap::new()),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            clock: AtomicU64::new(0),
        }
    }

    /// Get or compile the regex for `(source, flags)`. Returns a compiled
    /// matcher either way; the cache never returns a differently-compiled
    /// matcher for the same key within this cache's lifetime.
    pub fn get_or_compile(
        &self,
        source: &str,
        flags: CompileFlags,
    ) -> Result<Arc<Regex>> {
        let key = CacheKey {
            source: source.to_string(),
            flags,
        };

        if let Some(hit) = self.try_read(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(hit);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let regex = Self::compile(source, flags)
            .map_err(|e| HardGatesError::invalid_pattern(source, e.to_string()))?;
        let regex = Arc::new(regex);

        let mut guard = self.entries.write();
        // Double-checked insert: another thread may have won the race while
        // we compiled without holding the lock.
        if let Some(existing) = guard.get_mut(&key) {
            existing.last_used = self.tick();
            return Ok(existing.pattern.clone());
        }

        let approx_bytes = source.len() + std::mem::size_of::<Regex>();
        guard.insert(
            key,
            Entry {
                pattern: regex.clone(),
                approx_bytes,
                last_used: self.tick(),
            },
        );
        self.evict_if_needed(&mut guard);
        Ok(regex)
    }

    fn try_read(&self, key: &CacheKey) -> Option<Arc<Regex>> {
        let guard = self.entries.read();
        let entry = guard.get(key)?;
        Some(entry.pattern.clone())
    }

    fn compile(source: &str, flags: CompileFlags) -> std::result::Result<Regex, regex::Error> {
        regex::RegexBuilder::new(source)
            .case_insensitive(flags.case_insensitive)
            .dot_matches_new_line(flags.dot_matches_new_line)
            .build()
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    fn evict_if_needed(&self, guard: &mut std::collections::HashMap<CacheKey, Entry>) {
        let total_bytes: usize = guard.values().map(|e| e.approx_bytes).sum();
        let over_count = guard.len() > self.config.max_entries;
        let over_memory = total_bytes > self.config.max_memory_bytes;
        if !over_count && !over_memory {
            return;
        }

        let mut by_recency: Vec<(CacheKey, u64)> = guard
            .iter()
            .map(|(k, e)| (k.clone(), e.last_used))
            .collect();
        by_recency.sort_by_key(|(_, last_used)| *last_used);

        let mut bytes = total_bytes;
        for (key, _) in by_recency {
            let should_stop = guard.len() <= self.config.max_entries && bytes <= self.config.max_memory_bytes;
            if should_stop {
                break;
            }
            if let Some(entry) = guard.remove(&key) {
                bytes = bytes.saturating_sub(entry.approx_bytes);
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Snapshot current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let guard = self.entries.read();
        CacheStats {
            size: guard.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            memory_estimate_bytes: guard.values().map(|e| e.approx_bytes).sum(),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

/// Hash a `(source, flags)` pair into a stable 64-bit key, useful for
/// logging and for external callers that want a compact identity without
/// holding the source string.
pub fn cache_key_hash(source: &str, flags: CompileFlags) -> u64 {
    let mut hasher = DefaultHasher::new();
    source.hash(&mut hasher);
    flags.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_same_compiled_matcher_for_repeated_calls() {
        let cache = PatternCache::new(PatternCacheConfig::default());
        let flags = CompileFlags::default();
        let a = cache.get_or_compile("password", flags).unwrap();
        let b = cache.get_or_compile("password", flags).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn distinguishes_flags_as_part_of_the_key() {
        let cache = PatternCache::new(PatternCacheConfig::default());
        let a = cache
            .get_or_compile(
                "abc",
                CompileFlags {
                    case_insensitive: false,
                    ..Default::default()
                },
            )
            .unwrap();
        let b = cache
            .get_or_compile(
                "abc",
                CompileFlags {
                    case_insensitive: true,
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let cache = PatternCache::new(PatternCacheConfig::default());
        let err = cache.get_or_compile("(unclosed", CompileFlags::default());
        assert!(err.is_err());
    }

    #[test]
    fn eviction_bounds_entry_count() {
        let cache = PatternCache::new(PatternCacheConfig {
            max_entries: 2,
            max_memory_bytes: usize::MAX,
        });
        cache.get_or_compile("a", CompileFlags::default()).unwrap();
        cache.get_or_compile("b", CompileFlags::default()).unwrap();
        cache.get_or_compile("c", CompileFlags::default()).unwrap();
        assert!(cache.stats().size <= 2);
        assert!(cache.stats().evictions >= 1);
    }

    #[test]
    fn hit_and_miss_counters_advance() {
        let cache = PatternCache::new(PatternCacheConfig::default());
        cache.get_or_compile("x", CompileFlags::default()).unwrap();
        cache.get_or_compile("x", CompileFlags::default()).unwrap();
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }
}
