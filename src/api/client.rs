//! HTTP client for the demo REST API.
//! Maps responses into typed results and derives the next-page indicator
//! from response headers.

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use tracing::{debug, warn};
use url::Url;

use super::types::{Comment, FeedPage, Page, Post};
use crate::config::Config;
use crate::error::{ConfigError, FetchError};

const USER_AGENT: &str = concat!("flipbook/", env!("CARGO_PKG_VERSION"));

/// Client for the paginated demo API.
///
/// All reads are idempotent GETs. Nothing here retries; retry policy
/// belongs to the caller (in practice: the user navigating or clicking
/// again).
#[derive(Debug, Clone)]
pub struct ApiClient {
  http: Client,
  posts_url: Url,
  comments_url: Url,
  page_size: u32,
}

impl ApiClient {
  pub fn new(config: &Config) -> Result<Self, ConfigError> {
    config.validate()?;

    // validate() has checked both URLs parse
    let posts_url = Url::parse(&config.api.posts_url).map_err(|e| ConfigError::Invalid {
      field: "api.posts_url",
      detail: e.to_string(),
    })?;
    let comments_url = Url::parse(&config.api.comments_url).map_err(|e| ConfigError::Invalid {
      field: "api.comments_url",
      detail: e.to_string(),
    })?;

    let http = Client::builder()
      .user_agent(USER_AGENT)
      .build()
      .map_err(|e| ConfigError::Invalid {
        field: "http client",
        detail: e.to_string(),
      })?;

    Ok(Self {
      http,
      posts_url,
      comments_url,
      page_size: config.page_size,
    })
  }

  /// Fetch one page (1-based) of the posts collection.
  pub async fn list_page(&self, page: u32) -> Result<Page<Post>, FetchError> {
    let response = self
      .http
      .get(self.posts_url.clone())
      .query(&[
        ("_limit", self.page_size.to_string()),
        ("_page", page.to_string()),
      ])
      .send()
      .await
      .map_err(network_error)?;

    // Read the paging headers before the body consumes the response.
    let total = total_count(&response);
    let link_next = link_has_next(&response);

    let response = check_status(response).await?;
    let items: Vec<Post> = decode(response).await?;

    let mut seen = HashSet::with_capacity(items.len());
    for post in &items {
      if !seen.insert(post.id) {
        warn!(id = post.id, page, "duplicate item id within a page");
      }
    }

    // Prefer the explicit next link; fall back to the total-count bound.
    // Neither present means the server claims no further page.
    let has_next = match link_next {
      Some(next) => next,
      None => match total {
        Some(total) => u64::from(page) * u64::from(self.page_size) < u64::from(total),
        None => false,
      },
    };

    debug!(page, items = items.len(), has_next, "fetched posts page");
    Ok(Page {
      items,
      total,
      has_next,
    })
  }

  /// Fetch the comments attached to one post.
  pub async fn comments_for(&self, post_id: u64) -> Result<Vec<Comment>, FetchError> {
    let response = self
      .http
      .get(self.comments_url.clone())
      .query(&[("postId", post_id.to_string())])
      .send()
      .await
      .map_err(network_error)?;

    let response = check_status(response).await?;
    let comments: Vec<Comment> = decode(response).await?;
    debug!(post_id, comments = comments.len(), "fetched comments");
    Ok(comments)
  }

  /// Delete a post. The demo backend answers with an echo and forgets;
  /// the body is ignored either way.
  pub async fn delete_post(&self, id: u64) -> Result<(), FetchError> {
    let response = self
      .http
      .delete(self.entity_url(id))
      .send()
      .await
      .map_err(network_error)?;

    check_status(response).await.map(drop)
  }

  /// Patch a post's title. Like deletes, the echo body is ignored.
  pub async fn update_post(&self, id: u64, title: &str) -> Result<(), FetchError> {
    let response = self
      .http
      .patch(self.entity_url(id))
      .json(&serde_json::json!({ "title": title }))
      .send()
      .await
      .map_err(network_error)?;

    check_status(response).await.map(drop)
  }

  /// Fetch one page of a cursor-style collection by absolute URL.
  pub async fn feed_page<T: DeserializeOwned>(&self, url: &Url) -> Result<FeedPage<T>, FetchError> {
    let response = self
      .http
      .get(url.clone())
      .send()
      .await
      .map_err(network_error)?;

    let response = check_status(response).await?;
    decode(response).await
  }

  fn entity_url(&self, id: u64) -> String {
    format!("{}/{}", self.posts_url.as_str().trim_end_matches('/'), id)
  }
}

fn network_error(e: reqwest::Error) -> FetchError {
  FetchError::Network {
    detail: e.to_string(),
  }
}

/// `X-Total-Count`, as json-server reports it on paginated listings.
fn total_count(response: &Response) -> Option<u32> {
  response
    .headers()
    .get("x-total-count")
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.parse().ok())
}

/// Whether an RFC 8288 `Link` header names a `rel="next"` target.
/// None when the server sent no `Link` header at all.
fn link_has_next(response: &Response) -> Option<bool> {
  let raw = response
    .headers()
    .get(reqwest::header::LINK)?
    .to_str()
    .ok()?;
  Some(raw.split(',').any(|part| part.contains("rel=\"next\"")))
}

async fn check_status(response: Response) -> Result<Response, FetchError> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }

  match status {
    StatusCode::NOT_FOUND => Err(FetchError::NotFound {
      url: response.url().to_string(),
    }),
    s if s.is_server_error() => Err(FetchError::Server {
      status: s.as_u16(),
      detail: response.text().await.unwrap_or_default(),
    }),
    s => Err(FetchError::Unexpected {
      status: s.as_u16(),
      detail: response.text().await.unwrap_or_default(),
    }),
  }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, FetchError> {
  let status = response.status().as_u16();
  let bytes = response.bytes().await.map_err(network_error)?;
  serde_json::from_slice(&bytes).map_err(|e| FetchError::Unexpected {
    status,
    detail: format!("malformed response body: {e}"),
  })
}
