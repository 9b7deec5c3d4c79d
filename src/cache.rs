//! Concurrent summary cache
//!
//! Path-keyed store for [`FileSummary`] values, the single source of truth
//! the dependency graph is derived from. Reads are lock-free per shard;
//! writers are expected to be partitioned by path (the pipeline never runs
//! two workers against the same file), so no global lock exists.
//!
//! The cache owns no lifetime policy of its own: callers create one, pass
//! it around by `Arc`, and decide if and where snapshots are persisted via
//! [`SummaryCache::to_writer`] / [`SummaryCache::from_reader`].

use std::io::{Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use thiserror::Error;

use crate::summary::FileSummary;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Snapshot format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Lookup counters since construction (or last [`SummaryCache::reset_stats`])
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Concurrent path-keyed summary store
#[derive(Debug, Default)]
pub struct SummaryCache {
    entries: DashMap<String, FileSummary>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SummaryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure read. Never computes, never counts toward hit/miss stats;
    /// only [`Extractor::get_or_compute`](crate::extract::Extractor::get_or_compute)
    /// lookups do.
    pub fn get(&self, path: &str) -> Option<FileSummary> {
        self.entries.get(path).map(|entry| entry.value().clone())
    }

    /// Unconditional overwrite
    pub fn insert(&self, summary: FileSummary) {
        self.entries.insert(summary.path.clone(), summary);
    }

    pub fn remove(&self, path: &str) -> Option<FileSummary> {
        self.entries.remove(path).map(|(_, summary)| summary)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn reset_stats(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Serialize all entries as JSON, sorted by path for stable output.
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), CacheError> {
        let mut summaries: Vec<FileSummary> =
            self.entries.iter().map(|entry| entry.value().clone()).collect();
        summaries.sort_by(|a, b| a.path.cmp(&b.path));
        serde_json::to_writer_pretty(writer, &summaries)?;
        Ok(())
    }

    /// Rebuild a cache from a snapshot written by [`Self::to_writer`].
    /// Stats start at zero.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CacheError> {
        let summaries: Vec<FileSummary> = serde_json::from_reader(reader)?;
        let cache = Self::new();
        for summary in summaries {
            cache.insert(summary);
        }
        Ok(cache)
    }
}
