use chrono::{DateTime, Utc};

use crate::error::FetchError;

/// Fetch lifecycle of a cache entry.
///
/// Transitions are Idle -> Loading -> {Success, Error}; a re-fetch of the
/// same key re-enters Loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStatus {
  #[default]
  Idle,
  Loading,
  Success,
  Error,
}

/// A single cached fetch result and its lifecycle state.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
  /// Last successfully fetched value. Retained while a revalidation is in
  /// flight so the boundary can keep rendering it.
  pub data: Option<V>,
  pub status: FetchStatus,
  /// Error of the most recent failed fetch, cleared on the next success.
  pub error: Option<FetchError>,
  /// When `data` was fetched.
  pub fetched_at: Option<DateTime<Utc>>,
  /// Sequence number of the latest fetch issued for this key. Completions
  /// carrying an older sequence are discarded by the store.
  pub(crate) seq: u64,
}

impl<V> Default for CacheEntry<V> {
  fn default() -> Self {
    Self {
      data: None,
      status: FetchStatus::Idle,
      error: None,
      fetched_at: None,
      seq: 0,
    }
  }
}

impl<V> CacheEntry<V> {
  pub fn is_loading(&self) -> bool {
    self.status == FetchStatus::Loading
  }

  pub fn is_success(&self) -> bool {
    self.status == FetchStatus::Success
  }

  pub fn is_error(&self) -> bool {
    self.status == FetchStatus::Error
  }

  /// Whether the entry's data has outlived the staleness window. Only a
  /// settled Success can be stale; Loading and Error entries are handled
  /// by their own paths.
  pub fn is_stale(&self, stale_after: chrono::Duration) -> bool {
    match self.status {
      FetchStatus::Success => self
        .fetched_at
        .map(|t| Utc::now() - t > stale_after)
        .unwrap_or(true),
      _ => false,
    }
  }
}
