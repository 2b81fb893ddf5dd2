//! Wire types for the paginated demo API.

use serde::Deserialize;

/// A post in the listing collection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
  pub user_id: u64,
  pub id: u64,
  pub title: String,
  #[serde(default)]
  pub body: Option<String>,
}

/// A comment attached to a post.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
  pub post_id: u64,
  pub id: u64,
  pub name: String,
  pub email: String,
  pub body: String,
}

/// One fetched page of a paginated collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
  /// Items on this page, in server order.
  pub items: Vec<T>,
  /// Total items across all pages, when the server exposes it.
  pub total: Option<u32>,
  /// Whether the response indicated a further page.
  pub has_next: bool,
}

impl<T> Page<T> {
  /// Number of pages implied by the server's total count, when it sent one.
  /// An empty collection still has page 1.
  pub fn page_count(&self, page_size: u32) -> Option<u32> {
    match self.total {
      Some(total) if page_size > 0 => Some(total.div_ceil(page_size).max(1)),
      _ => None,
    }
  }
}

/// A page of a cursor-style collection: each response carries the absolute
/// URL of the next page, or null at the end of the feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedPage<T> {
  pub count: u32,
  pub next: Option<String>,
  pub previous: Option<String>,
  pub results: Vec<T>,
}
