//! Page navigation over a cached, paginated collection.

use chrono::Duration;
use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::api::types::Page;
use crate::cache::{CacheEntry, CacheLayer, CacheStore, FetchStatus};
use crate::error::FetchError;

/// Page coordinator for one paginated resource.
///
/// Owns the page cache for the resource, the current page index (1-based),
/// and the per-view selection. Navigation serves cached pages immediately,
/// revalidating stale ones in the background, and the adjacent next page is
/// prefetched as soon as the active page has loaded, so paging forward
/// usually lands on a warm cache.
///
/// Per page the lifecycle is Idle -> Loading -> {Loaded, Failed}; a failed
/// page stays failed until the user navigates back to it or calls
/// [`Pager::refetch`]. Nothing retries on its own.
pub struct Pager<T> {
  resource: String,
  layer: CacheLayer<u32, Page<T>>,
  page_size: u32,
  current: u32,
  /// Highest page this pager may navigate to, when known: a configured
  /// bound, or learned from a response's total count or missing next
  /// indicator.
  last_page: Option<u32>,
  selected: Option<T>,
}

impl<T> Pager<T>
where
  T: Clone + Send + 'static,
{
  /// Create a pager for `resource` over an explicit store. Nothing is
  /// fetched until the first [`Pager::set_page`] call.
  pub fn new<F>(
    resource: impl Into<String>,
    store: CacheStore<u32, Page<T>>,
    page_size: u32,
    fetcher: F,
  ) -> Self
  where
    F: Fn(u32) -> BoxFuture<'static, Result<Page<T>, FetchError>> + Send + Sync + 'static,
  {
    let layer = CacheLayer::new(store, move |page: &u32| fetcher(*page));
    Self {
      resource: resource.into(),
      layer,
      page_size,
      current: 1,
      last_page: None,
      selected: None,
    }
  }

  /// Seed the page bound for collections whose size is known up front.
  pub fn with_max_page(mut self, max_page: Option<u32>) -> Self {
    self.last_page = max_page;
    self
  }

  /// Set the staleness window for cached pages.
  pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
    self.layer = self.layer.with_stale_after(stale_after);
    self
  }

  /// Navigate to `page` (1-based). Requests below 1 or beyond the last
  /// known page are rejected as no-ops. Changing the page clears the
  /// selection.
  pub fn set_page(&mut self, page: u32) {
    if page < 1 {
      warn!(resource = %self.resource, page, "page below 1 rejected");
      return;
    }
    if let Some(last) = self.last_page {
      if page > last {
        warn!(resource = %self.resource, page, last, "page beyond last rejected");
        return;
      }
    }

    if page != self.current {
      self.selected = None;
      self.current = page;
    }
    self.layer.ensure(page);

    // Already loaded from cache: the load completion that would schedule
    // the prefetch happened long ago, so schedule it here instead.
    if self.status() == FetchStatus::Success && self.has_next_page() {
      self.maybe_prefetch(page + 1);
    }
  }

  /// Advance one page; rejected at the last known page.
  pub fn next_page(&mut self) {
    if !self.has_next_page() {
      warn!(resource = %self.resource, page = self.current, "next page rejected at boundary");
      return;
    }
    self.set_page(self.current + 1);
  }

  /// Go back one page; rejected at page 1.
  pub fn prev_page(&mut self) {
    if self.current <= 1 {
      return;
    }
    self.set_page(self.current - 1);
  }

  /// Apply completed fetches. When the active page has just loaded and a
  /// further page exists, its prefetch starts here. Returns true when any
  /// entry changed (the repaint signal).
  pub fn poll(&mut self) -> bool {
    let changed = self.layer.poll();
    for page in &changed {
      self.note_loaded(*page);
    }
    !changed.is_empty()
  }

  /// Learn what a freshly loaded page tells us: the collection bound, and
  /// whether to warm the adjacent page.
  fn note_loaded(&mut self, page: u32) {
    let (has_next, count) = match self.layer.get(&page) {
      Some(entry) if entry.status == FetchStatus::Success => match entry.data.as_ref() {
        Some(data) => (data.has_next, data.page_count(self.page_size)),
        None => return,
      },
      _ => return,
    };

    if let Some(count) = count {
      self.clamp_last_page(count);
    } else if !has_next {
      self.clamp_last_page(page);
    }

    // Prefetch stays adjacent to where the user is: only the active page
    // warms its neighbor, otherwise one load would cascade through the
    // whole collection.
    if page == self.current && has_next {
      self.maybe_prefetch(page + 1);
    }
  }

  /// Warm `page` unless it lies beyond the known bound.
  fn maybe_prefetch(&mut self, page: u32) {
    if self.last_page.is_some_and(|last| page > last) {
      return;
    }
    debug!(resource = %self.resource, page, "warming adjacent page");
    self.layer.prefetch(page);
  }

  fn clamp_last_page(&mut self, bound: u32) {
    self.last_page = Some(match self.last_page {
      Some(last) => last.min(bound),
      None => bound,
    });
  }

  pub fn current_page(&self) -> u32 {
    self.current
  }

  /// Items of the current page; empty while nothing has loaded yet. During
  /// a revalidation this still returns the previous data.
  pub fn items(&self) -> &[T] {
    self
      .layer
      .data(&self.current)
      .map(|p| p.items.as_slice())
      .unwrap_or(&[])
  }

  /// Fetch status of the current page.
  pub fn status(&self) -> FetchStatus {
    self
      .layer
      .get(&self.current)
      .map(|e| e.status)
      .unwrap_or(FetchStatus::Idle)
  }

  pub fn is_loading(&self) -> bool {
    self.status() == FetchStatus::Loading
  }

  /// Error of the current page, if its last fetch failed.
  pub fn error(&self) -> Option<&FetchError> {
    self.layer.get(&self.current).and_then(|e| e.error.as_ref())
  }

  /// Whether the current page's last response indicated a further page.
  /// False until the current page has data.
  pub fn has_next_page(&self) -> bool {
    self
      .layer
      .data(&self.current)
      .map(|p| p.has_next)
      .unwrap_or(false)
  }

  /// Highest known page, once a bound has been configured or learned.
  pub fn last_page(&self) -> Option<u32> {
    self.last_page
  }

  /// User-initiated reload of the current page.
  pub fn refetch(&mut self) {
    self.layer.refetch(self.current);
  }

  /// Drop a page's cache entry; the next navigation to it fetches fresh.
  pub fn invalidate(&mut self, page: u32) {
    self.layer.invalidate(&page);
  }

  /// The cache entry for `page`, if any fetch has touched it.
  pub fn entry(&self, page: u32) -> Option<&CacheEntry<Page<T>>> {
    self.layer.get(&page)
  }

  /// Select an item of the current page. Cleared by page changes.
  pub fn select(&mut self, item: T) {
    self.selected = Some(item);
  }

  pub fn selected(&self) -> Option<&T> {
    self.selected.as_ref()
  }

  pub fn clear_selection(&mut self) {
    self.selected = None;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::{Arc, Mutex};
  use std::time::Duration as StdDuration;

  /// Pager over a fake 25-item collection served 10 per page, counting
  /// fetches per page.
  fn collection_pager(calls: Arc<Mutex<HashMap<u32, u32>>>) -> Pager<u64> {
    Pager::new("posts", CacheStore::new(), 10, move |page| {
      let calls = calls.clone();
      Box::pin(async move {
        *calls.lock().unwrap().entry(page).or_insert(0) += 1;
        let start = (page - 1) * 10;
        let items: Vec<u64> = (start..25.min(start + 10)).map(u64::from).collect();
        Ok(Page {
          items,
          total: Some(25),
          has_next: page * 10 < 25,
        })
      })
    })
  }

  async fn settle(pager: &mut Pager<u64>) {
    for _ in 0..10 {
      tokio::time::sleep(StdDuration::from_millis(10)).await;
      pager.poll();
    }
  }

  #[tokio::test]
  async fn pages_through_a_25_item_collection() {
    let calls = Arc::new(Mutex::new(HashMap::new()));
    let mut pager = collection_pager(calls.clone());

    pager.set_page(1);
    settle(&mut pager).await;
    assert_eq!(pager.items().len(), 10);
    assert!(pager.has_next_page());
    assert_eq!(pager.last_page(), Some(3));

    pager.set_page(2);
    settle(&mut pager).await;
    assert_eq!(pager.items().len(), 10);
    assert!(pager.has_next_page());

    pager.set_page(3);
    settle(&mut pager).await;
    assert_eq!(pager.items().len(), 5);
    assert!(!pager.has_next_page());

    // Boundary: page 3 is the end, forward navigation is a no-op.
    pager.next_page();
    assert_eq!(pager.current_page(), 3);
    pager.set_page(4);
    assert_eq!(pager.current_page(), 3);
  }

  #[tokio::test]
  async fn page_zero_is_rejected() {
    let calls = Arc::new(Mutex::new(HashMap::new()));
    let mut pager = collection_pager(calls.clone());

    pager.set_page(1);
    settle(&mut pager).await;
    pager.set_page(0);
    assert_eq!(pager.current_page(), 1);
    pager.prev_page();
    assert_eq!(pager.current_page(), 1);
  }

  #[tokio::test]
  async fn loading_a_page_prefetches_the_next() {
    let calls = Arc::new(Mutex::new(HashMap::new()));
    let mut pager = collection_pager(calls.clone());

    pager.set_page(1);
    settle(&mut pager).await;

    // Page 2 arrived in cache without any navigation.
    let entry = pager.entry(2).expect("page 2 prefetched");
    assert!(entry.is_success());
    assert_eq!(calls.lock().unwrap().get(&2), Some(&1));
    assert_eq!(pager.current_page(), 1);

    // Page 3 was not touched: prefetch stays adjacent to the user.
    assert!(pager.entry(3).is_none());
  }

  #[tokio::test]
  async fn revisiting_a_page_hits_the_cache() {
    let calls = Arc::new(Mutex::new(HashMap::new()));
    let mut pager = collection_pager(calls.clone());

    pager.set_page(1);
    settle(&mut pager).await;
    pager.set_page(2);
    settle(&mut pager).await;
    pager.set_page(1);
    settle(&mut pager).await;

    assert_eq!(calls.lock().unwrap().get(&1), Some(&1));
  }

  #[tokio::test]
  async fn page_change_clears_selection() {
    let calls = Arc::new(Mutex::new(HashMap::new()));
    let mut pager = collection_pager(calls.clone());

    pager.set_page(1);
    settle(&mut pager).await;
    pager.select(7);
    assert_eq!(pager.selected(), Some(&7));

    // Same page keeps it, navigation clears it.
    pager.set_page(1);
    assert_eq!(pager.selected(), Some(&7));
    pager.set_page(2);
    assert_eq!(pager.selected(), None);
  }

  #[tokio::test]
  async fn configured_bound_rejects_overshoot() {
    let calls = Arc::new(Mutex::new(HashMap::new()));
    let mut pager = collection_pager(calls.clone()).with_max_page(Some(2));

    pager.set_page(5);
    assert_eq!(pager.current_page(), 1);
    assert!(calls.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn failed_page_surfaces_error_and_navigation_retries() {
    let attempts = Arc::new(AtomicU32::new(0));
    let mut pager: Pager<u64> = Pager::new("posts", CacheStore::new(), 10, {
      let attempts = attempts.clone();
      move |page| {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
          if attempt == 0 {
            Err(FetchError::Server {
              status: 500,
              detail: "boom".to_string(),
            })
          } else {
            Ok(Page {
              items: vec![page as u64],
              total: None,
              has_next: false,
            })
          }
        })
      }
    });

    pager.set_page(1);
    settle(&mut pager).await;
    assert_eq!(pager.status(), FetchStatus::Error);
    assert!(matches!(pager.error(), Some(FetchError::Server { status: 500, .. })));

    // No auto-retry happened while polling.
    assert_eq!(attempts.load(Ordering::SeqCst), 1);

    // Navigating back to the page re-attempts.
    pager.set_page(1);
    settle(&mut pager).await;
    assert_eq!(pager.status(), FetchStatus::Success);
    assert_eq!(pager.items(), &[1]);
  }
}
