//! Memoization store for name digests.
//!
//! Entries are bucketed by a cheap 64-bit pre-hash of the name. Every bucket
//! keeps the original string next to its digest and a hit is only trusted
//! once the string compares equal, so two names sharing a pre-hash can never
//! be handed each other's digest.

use super::Digest;
use parking_lot::RwLock;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
struct CacheEntry {
    text: Box<str>,
    digest: Digest,
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached names
    pub entries: usize,
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that had to compute the digest
    pub misses: u64,
}

/// Thread-safe name -> digest cache
#[derive(Debug, Default)]
pub struct DigestCache {
    buckets: RwLock<HashMap<u64, Vec<CacheEntry>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl DigestCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixed-key pre-hash, stable across runs
    fn pre_hash(text: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        hasher.finish()
    }

    fn lookup(buckets: &HashMap<u64, Vec<CacheEntry>>, key: u64, text: &str) -> Option<Digest> {
        buckets
            .get(&key)?
            .iter()
            .find(|entry| &*entry.text == text)
            .map(|entry| entry.digest)
    }

    /// Returns the cached digest for `text`, if any
    pub fn get(&self, text: &str) -> Option<Digest> {
        let key = Self::pre_hash(text);
        Self::lookup(&self.buckets.read(), key, text)
    }

    /// Returns the cached digest or computes, stores and returns it
    ///
    /// `compute` runs outside the lock; concurrent misses on the same name may
    /// both compute, but only the first result is stored.
    pub fn get_or_insert_with(&self, text: &str, compute: impl FnOnce(&str) -> Digest) -> Digest {
        let key = Self::pre_hash(text);

        if let Some(digest) = Self::lookup(&self.buckets.read(), key, text) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return digest;
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let digest = compute(text);

        let mut buckets = self.buckets.write();
        let bucket = buckets.entry(key).or_default();
        match bucket.iter().find(|entry| &*entry.text == text) {
            Some(existing) => existing.digest,
            None => {
                bucket.push(CacheEntry {
                    text: text.into(),
                    digest,
                });
                digest
            }
        }
    }

    /// Number of cached names
    pub fn len(&self) -> usize {
        self.buckets.read().values().map(Vec::len).sum()
    }

    /// Returns true if nothing has been cached yet
    pub fn is_empty(&self) -> bool {
        self.buckets.read().is_empty()
    }

    /// Lookups answered from the cache so far
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Lookups that had to compute the digest so far
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Returns the current counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits(),
            misses: self.misses(),
        }
    }

    /// Drops every entry and resets the counters
    pub fn clear(&self) {
        self.buckets.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    #[cfg(test)]
    fn insert_with_key(&self, key: u64, text: &str, digest: Digest) {
        self.buckets
            .write()
            .entry(key)
            .or_default()
            .push(CacheEntry {
                text: text.into(),
                digest,
            });
    }
}
