//! Per-query record of entries already visited.

use std::collections::HashSet;

use super::entry::EntryFingerprint;

#[derive(Debug, Default)]
pub struct DedupLedger {
    seen: HashSet<EntryFingerprint>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, fingerprint: &EntryFingerprint) -> bool {
        self.seen.contains(fingerprint)
    }

    /// Returns false if the fingerprint was already recorded.
    pub fn record(&mut self, fingerprint: EntryFingerprint) -> bool {
        self.seen.insert(fingerprint)
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
