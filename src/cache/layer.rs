//! Cache layer that orchestrates the store with network fetching.
//!
//! Fetches run as spawned tasks and report back over a channel; nothing
//! here blocks the caller. A UI drives the layer from its event loop:
//!
//! ```ignore
//! let client = client.clone();
//! let mut comments = CacheLayer::new(CacheStore::new(), move |post_id: &u64| {
//!   let client = client.clone();
//!   let post_id = *post_id;
//!   Box::pin(async move { client.comments_for(post_id).await })
//! });
//!
//! comments.ensure(7);
//!
//! // In the event loop tick
//! if !comments.poll().is_empty() {
//!   // State changed, trigger re-render
//! }
//! ```

use chrono::Duration;
use futures::future::BoxFuture;
use std::fmt::Debug;
use std::hash::Hash;
use tokio::sync::mpsc;
use tracing::debug;

use super::entry::{CacheEntry, FetchStatus};
use super::store::CacheStore;
use crate::error::FetchError;

/// Factory producing the fetch future for a key.
type FetchFn<K, V> = Box<dyn Fn(&K) -> BoxFuture<'static, Result<V, FetchError>> + Send + Sync>;

struct Completion<K, V> {
  key: K,
  seq: u64,
  result: Result<V, FetchError>,
}

/// Keyed fetch coordination over a [`CacheStore`].
///
/// `ensure` is the read path a view calls on navigation: fresh entries are
/// served as-is, stale entries keep rendering while a revalidation runs,
/// and in-flight keys are joined rather than fetched twice. `poll` applies
/// completed fetches and is where superseded responses get dropped.
pub struct CacheLayer<K, V> {
  store: CacheStore<K, V>,
  fetcher: FetchFn<K, V>,
  tx: mpsc::UnboundedSender<Completion<K, V>>,
  rx: mpsc::UnboundedReceiver<Completion<K, V>>,
  /// How long before a fetched value is considered stale.
  stale_after: Duration,
}

impl<K, V> CacheLayer<K, V>
where
  K: Eq + Hash + Clone + Debug + Send + 'static,
  V: Send + 'static,
{
  /// Create a layer over an explicit store.
  ///
  /// The store's lifetime is the session's: build it at startup, drop the
  /// layer (and the store with it) at teardown.
  pub fn new<F>(store: CacheStore<K, V>, fetcher: F) -> Self
  where
    F: Fn(&K) -> BoxFuture<'static, Result<V, FetchError>> + Send + Sync + 'static,
  {
    let (tx, rx) = mpsc::unbounded_channel();
    Self {
      store,
      fetcher: Box::new(fetcher),
      tx,
      rx,
      stale_after: Duration::milliseconds(2_000),
    }
  }

  /// Set the staleness window for cached values.
  pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
    self.stale_after = stale_after;
    self
  }

  /// Make sure `key` has a usable entry: serve the cached value when it is
  /// fresh, attach to an in-flight fetch when one is running, and start a
  /// fetch otherwise. A stale value is served immediately while its
  /// revalidation runs in the background.
  pub fn ensure(&mut self, key: K) {
    let start = match self.store.get(&key) {
      // Attach to the in-flight fetch instead of duplicating it.
      Some(entry) if entry.is_loading() => false,
      Some(entry) if entry.is_success() => entry.is_stale(self.stale_after),
      // Absent, Idle, or Error: navigation (re-)attempts the fetch.
      _ => true,
    };

    if start {
      self.start(key);
    } else {
      debug!(?key, "cache hit");
    }
  }

  /// Background fill for `key`: fetch only when nothing usable is cached.
  /// Unlike [`CacheLayer::ensure`], a failed entry is left alone, so a
  /// prefetch never turns into a retry loop. Navigating to the key does.
  pub fn prefetch(&mut self, key: K) {
    let start = match self.store.get(&key) {
      None => true,
      Some(entry) => match entry.status {
        FetchStatus::Idle => true,
        FetchStatus::Success => entry.is_stale(self.stale_after),
        FetchStatus::Loading | FetchStatus::Error => false,
      },
    };

    if start {
      debug!(?key, "prefetch");
      self.start(key);
    }
  }

  /// Start a fetch for `key` regardless of what is cached. User-initiated
  /// retry and refresh go through here.
  pub fn refetch(&mut self, key: K) {
    self.start(key);
  }

  /// Drain completed fetches into the store and return the keys whose
  /// entries changed. Superseded completions change nothing and are
  /// dropped on the floor here.
  pub fn poll(&mut self) -> Vec<K> {
    let mut changed = Vec::new();
    while let Ok(done) = self.rx.try_recv() {
      if self.store.complete(&done.key, done.seq, done.result) {
        changed.push(done.key);
      }
    }
    changed
  }

  pub fn get(&self, key: &K) -> Option<&CacheEntry<V>> {
    self.store.get(key)
  }

  /// The cached value under `key`, whatever its entry's status.
  pub fn data(&self, key: &K) -> Option<&V> {
    self.store.get(key).and_then(|e| e.data.as_ref())
  }

  pub fn invalidate(&mut self, key: &K) {
    self.store.invalidate(key)
  }

  pub fn store(&self) -> &CacheStore<K, V> {
    &self.store
  }

  fn start(&mut self, key: K) {
    let seq = self.store.begin(key.clone());
    let future = (self.fetcher)(&key);
    let tx = self.tx.clone();
    debug!(?key, seq, "fetch started");
    tokio::spawn(async move {
      // A closed channel means the session is gone; nothing to deliver to.
      let _ = tx.send(Completion {
        key,
        seq,
        result: future.await,
      });
    });
  }
}
