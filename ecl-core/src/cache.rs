#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::Arc;

use crate::diagnostics::Diagnostic;
use crate::fingerprint::Fingerprint;
use crate::table::EnumClassTable;

#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    pub table: Arc<EnumClassTable>,
    /// Replayed on a hit so a cached table reports the same records.
    pub diagnostics: Vec<Diagnostic>,
}

/// Resolved tables kept across `check_program` calls of one checker.
///
/// Entries are keyed by enum-class name and only served when the input
/// fingerprint matches, so editing a declaration (or anything it includes)
/// misses and overwrites the stale entry.
#[derive(Debug, Default)]
pub struct TableCache {
    entries: HashMap<String, CacheEntry>,
    hits: usize,
    misses: usize,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str, fingerprint: Fingerprint) -> Option<&CacheEntry> {
        self.entries
            .get(name)
            .filter(|entry| entry.fingerprint == fingerprint)
    }

    pub fn insert(&mut self, name: impl Into<String>, entry: CacheEntry) {
        self.entries.insert(name.into(), entry);
    }

    pub fn invalidate(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }

    pub(crate) fn record(&mut self, hit: bool) {
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
