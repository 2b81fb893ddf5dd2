//! Infinite feed over a cursor-style collection.
//!
//! Some collections do not expose page numbers at all: each response hands
//! out the absolute URL of the next page, or null at the end. The feed
//! accumulates those pages in arrival order, which is what an
//! infinite-scroll boundary renders.

use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use url::Url;

use crate::api::types::FeedPage;
use crate::cache::FetchStatus;
use crate::error::FetchError;

type FeedFetchFn<T> = Box<dyn Fn(Url) -> BoxFuture<'static, Result<FeedPage<T>, FetchError>> + Send + Sync>;

struct Completion<T> {
  seq: u64,
  result: Result<FeedPage<T>, FetchError>,
}

/// Accumulating loader for next-URL collections.
///
/// At most one fetch runs at a time: `load_more` is a no-op while loading
/// and once the feed is exhausted. `refresh` starts over from the initial
/// URL; a fetch still in flight from before the refresh belongs to an older
/// sequence and its result is dropped when it lands.
pub struct Feed<T> {
  initial: Url,
  fetcher: FeedFetchFn<T>,
  pages: Vec<FeedPage<T>>,
  status: FetchStatus,
  error: Option<FetchError>,
  seq: u64,
  tx: mpsc::UnboundedSender<Completion<T>>,
  rx: mpsc::UnboundedReceiver<Completion<T>>,
}

impl<T> Feed<T>
where
  T: Send + 'static,
{
  pub fn new<F>(initial: Url, fetcher: F) -> Self
  where
    F: Fn(Url) -> BoxFuture<'static, Result<FeedPage<T>, FetchError>> + Send + Sync + 'static,
  {
    let (tx, rx) = mpsc::unbounded_channel();
    Self {
      initial,
      fetcher: Box::new(fetcher),
      pages: Vec::new(),
      status: FetchStatus::Idle,
      error: None,
      seq: 0,
      tx,
      rx,
    }
  }

  /// Whether a further page exists: true before anything has loaded, and
  /// thereafter exactly when the last page carried a next cursor.
  pub fn has_more(&self) -> bool {
    match self.pages.last() {
      None => true,
      Some(page) => page.next.is_some(),
    }
  }

  /// Fetch the next page. No-op while a fetch is in flight or the feed is
  /// exhausted.
  pub fn load_more(&mut self) {
    if self.status == FetchStatus::Loading {
      return;
    }
    if !self.has_more() {
      debug!("feed exhausted");
      return;
    }

    let url = match self.pages.last() {
      None => self.initial.clone(),
      Some(page) => {
        // has_more() said the cursor exists
        let raw = page.next.as_deref().unwrap_or_default();
        match Url::parse(raw) {
          Ok(url) => url,
          Err(e) => {
            warn!(cursor = raw, error = %e, "unparseable next cursor, stopping feed");
            return;
          }
        }
      }
    };

    self.start(url);
  }

  /// Drop accumulated pages and refetch from the initial URL.
  pub fn refresh(&mut self) {
    self.pages.clear();
    self.error = None;
    self.start(self.initial.clone());
  }

  /// Apply completed fetches. Returns true when the feed changed.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;
    while let Ok(done) = self.rx.try_recv() {
      if done.seq != self.seq {
        debug!(seq = done.seq, latest = self.seq, "superseded feed page discarded");
        continue;
      }
      match done.result {
        Ok(page) => {
          debug!(
            results = page.results.len(),
            more = page.next.is_some(),
            "feed page loaded"
          );
          self.pages.push(page);
          self.status = FetchStatus::Success;
          self.error = None;
        }
        Err(err) => {
          self.status = FetchStatus::Error;
          self.error = Some(err);
        }
      }
      changed = true;
    }
    changed
  }

  /// All loaded items, in page order.
  pub fn items(&self) -> impl Iterator<Item = &T> {
    self.pages.iter().flat_map(|p| p.results.iter())
  }

  pub fn pages(&self) -> &[FeedPage<T>] {
    &self.pages
  }

  /// Collection size as reported by the most recent page, if any.
  pub fn total_count(&self) -> Option<u32> {
    self.pages.last().map(|p| p.count)
  }

  pub fn is_loading(&self) -> bool {
    self.status == FetchStatus::Loading
  }

  pub fn status(&self) -> FetchStatus {
    self.status
  }

  pub fn error(&self) -> Option<&FetchError> {
    self.error.as_ref()
  }

  fn start(&mut self, url: Url) {
    self.seq += 1;
    let seq = self.seq;
    self.status = FetchStatus::Loading;
    let future = (self.fetcher)(url);
    let tx = self.tx.clone();
    tokio::spawn(async move {
      let _ = tx.send(Completion {
        seq,
        result: future.await,
      });
    });
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;
  use std::time::Duration as StdDuration;

  fn feed_page(results: Vec<u32>, next: Option<&str>) -> FeedPage<u32> {
    FeedPage {
      count: 5,
      next: next.map(String::from),
      previous: None,
      results,
    }
  }

  /// Two-page feed: the initial URL links to /two, /two ends the feed.
  fn two_page_feed(calls: Arc<AtomicU32>) -> Feed<u32> {
    let initial = Url::parse("http://feed.test/one").unwrap();
    Feed::new(initial, move |url: Url| {
      calls.fetch_add(1, Ordering::SeqCst);
      Box::pin(async move {
        if url.path() == "/one" {
          Ok(feed_page(vec![1, 2, 3], Some("http://feed.test/two")))
        } else {
          Ok(feed_page(vec![4, 5], None))
        }
      })
    })
  }

  async fn settle(feed: &mut Feed<u32>) {
    for _ in 0..10 {
      tokio::time::sleep(StdDuration::from_millis(10)).await;
      feed.poll();
    }
  }

  #[tokio::test]
  async fn follows_next_cursors_to_the_end() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut feed = two_page_feed(calls.clone());
    assert!(feed.has_more());

    feed.load_more();
    settle(&mut feed).await;
    assert_eq!(feed.items().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    assert!(feed.has_more());

    feed.load_more();
    settle(&mut feed).await;
    assert_eq!(feed.items().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
    assert!(!feed.has_more());
    assert_eq!(feed.total_count(), Some(5));

    // Exhausted: further load_more calls fetch nothing.
    feed.load_more();
    settle(&mut feed).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn load_more_while_loading_is_a_noop() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut feed = two_page_feed(calls.clone());

    feed.load_more();
    feed.load_more();
    settle(&mut feed).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(feed.pages().len(), 1);
  }

  #[tokio::test]
  async fn refresh_discards_the_in_flight_page() {
    let calls = Arc::new(AtomicU32::new(0));
    let initial = Url::parse("http://feed.test/one").unwrap();
    let mut feed = Feed::new(initial, {
      let calls = calls.clone();
      move |_url: Url| {
        let call = calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
          if call == 0 {
            // The pre-refresh fetch resolves late.
            tokio::time::sleep(StdDuration::from_millis(80)).await;
            Ok(feed_page(vec![1], None))
          } else {
            Ok(feed_page(vec![9], None))
          }
        })
      }
    });

    feed.load_more();
    feed.refresh();
    tokio::time::sleep(StdDuration::from_millis(120)).await;
    feed.poll();

    // Only the post-refresh generation survived.
    assert_eq!(feed.items().copied().collect::<Vec<_>>(), vec![9]);
    assert_eq!(feed.pages().len(), 1);
  }

  #[tokio::test]
  async fn error_is_surfaced_and_retry_is_manual() {
    let calls = Arc::new(AtomicU32::new(0));
    let initial = Url::parse("http://feed.test/one").unwrap();
    let mut feed = Feed::new(initial, {
      let calls = calls.clone();
      move |_url: Url| {
        let call = calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
          if call == 0 {
            Err(FetchError::Network {
              detail: "unreachable".to_string(),
            })
          } else {
            Ok(feed_page(vec![1], None))
          }
        })
      }
    });

    feed.load_more();
    settle(&mut feed).await;
    assert_eq!(feed.status(), FetchStatus::Error);
    assert!(feed.error().is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // The user clicks again.
    feed.load_more();
    settle(&mut feed).await;
    assert_eq!(feed.status(), FetchStatus::Success);
    assert_eq!(feed.items().copied().collect::<Vec<_>>(), vec![1]);
  }
}
