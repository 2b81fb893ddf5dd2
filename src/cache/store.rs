//! In-memory store of cache entries plus the fetch sequence allocator.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use chrono::Utc;
use tracing::debug;

use super::entry::{CacheEntry, FetchStatus};
use crate::error::FetchError;

/// Key-to-entry map with at most one entry per key.
///
/// The store also owns the monotonic sequence counter that orders fetches:
/// `begin` stamps the entry with a fresh sequence, and `complete` applies a
/// result only while its sequence is still the entry's latest, so a slow
/// response can never overwrite a newer one.
///
/// Entries are never evicted; the store lives exactly as long as the
/// session that created it.
#[derive(Debug)]
pub struct CacheStore<K, V> {
  entries: HashMap<K, CacheEntry<V>>,
  next_seq: u64,
}

impl<K, V> CacheStore<K, V>
where
  K: Eq + Hash + Clone + Debug,
{
  pub fn new() -> Self {
    Self {
      entries: HashMap::new(),
      next_seq: 0,
    }
  }

  pub fn get(&self, key: &K) -> Option<&CacheEntry<V>> {
    self.entries.get(key)
  }

  /// Replace whatever is under `key`.
  pub fn put(&mut self, key: K, entry: CacheEntry<V>) {
    self.entries.insert(key, entry);
  }

  /// Drop the entry under `key`; the next access fetches from scratch.
  pub fn invalidate(&mut self, key: &K) {
    self.entries.remove(key);
  }

  /// Mark `key` as Loading and allocate the sequence number for the fetch
  /// about to start. Previously fetched data survives, which is what lets
  /// a stale value keep rendering during revalidation.
  pub fn begin(&mut self, key: K) -> u64 {
    self.next_seq += 1;
    let seq = self.next_seq;
    let entry = self.entries.entry(key).or_default();
    entry.status = FetchStatus::Loading;
    entry.seq = seq;
    seq
  }

  /// Apply a completed fetch. Returns false, leaving the entry untouched,
  /// when the result is superseded: a newer fetch was issued for this key
  /// after the completed one started, and the newer one wins regardless of
  /// arrival order.
  pub fn complete(&mut self, key: &K, seq: u64, result: Result<V, FetchError>) -> bool {
    let Some(entry) = self.entries.get_mut(key) else {
      debug!(?key, seq, "completion for an invalidated key discarded");
      return false;
    };
    if entry.seq != seq {
      debug!(?key, seq, latest = entry.seq, "superseded completion discarded");
      return false;
    }

    match result {
      Ok(data) => {
        entry.data = Some(data);
        entry.status = FetchStatus::Success;
        entry.error = None;
        entry.fetched_at = Some(Utc::now());
      }
      Err(err) => {
        entry.status = FetchStatus::Error;
        entry.error = Some(err);
      }
    }
    true
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl<K, V> Default for CacheStore<K, V>
where
  K: Eq + Hash + Clone + Debug,
{
  fn default() -> Self {
    Self::new()
  }
}
