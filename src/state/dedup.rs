//! Deduplication index shared by every worker

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Set of record keys already present in the record sink
///
/// This is the single authority on whether a record is new. The set only
/// grows. A membership check and the matching insert happen under one lock,
/// so two workers seeing the same key at the same time cannot both win.
#[derive(Debug, Default)]
pub struct DedupIndex {
    keys: Mutex<HashSet<String>>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds keys known from earlier runs, returning how many were new
    pub fn seed<I>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let mut set = self.lock();
        keys.into_iter().filter(|key| set.insert(key.clone())).count()
    }

    /// Claims a key for emission
    ///
    /// Returns `true` exactly once per key for the lifetime of the index.
    pub fn try_claim(&self, key: &str) -> bool {
        let mut set = self.lock();
        if set.contains(key) {
            return false;
        }
        set.insert(key.to_string())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // The set has no invariant a panicking holder could break.
    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
