//! One user session over the demo API: posts paging, comments for the
//! selected post, and mutation tracking behind a single poll.

use std::sync::Arc;

use crate::api::client::ApiClient;
use crate::api::types::{Comment, Post};
use crate::cache::{CacheEntry, CacheLayer, CacheStore};
use crate::config::Config;
use crate::error::{ConfigError, MutationError};
use crate::mutation::{MutationKind, Mutations};
use crate::pager::Pager;

/// Title written by update mutations. The demo backend echoes the patch
/// and forgets it, so the payload is a fixed marker rather than user input.
const UPDATED_TITLE: &str = "updated title";

/// Everything a list/detail view needs for one session.
///
/// The stores live exactly as long as the session: built here, dropped
/// with it. Construction is passive; the first [`Session::set_page`] call
/// starts the initial fetch.
pub struct Session {
  client: Arc<ApiClient>,
  posts: Pager<Post>,
  comments: CacheLayer<u64, Vec<Comment>>,
  mutations: Mutations,
}

impl Session {
  pub fn new(config: &Config) -> Result<Self, ConfigError> {
    let client = Arc::new(ApiClient::new(config)?);

    let posts = {
      let client = Arc::clone(&client);
      Pager::new("posts", CacheStore::new(), config.page_size, move |page| {
        let client = Arc::clone(&client);
        Box::pin(async move { client.list_page(page).await })
      })
      .with_max_page(config.max_page)
      .with_stale_after(config.stale_after())
    };

    let comments = {
      let client = Arc::clone(&client);
      CacheLayer::new(CacheStore::new(), move |post_id: &u64| {
        let client = Arc::clone(&client);
        let post_id = *post_id;
        Box::pin(async move { client.comments_for(post_id).await })
      })
      .with_stale_after(config.stale_after())
    };

    let mutations = {
      let client = Arc::clone(&client);
      Mutations::new(move |kind, target| {
        let client = Arc::clone(&client);
        Box::pin(async move {
          match kind {
            MutationKind::Delete => client.delete_post(target).await,
            MutationKind::Update => client.update_post(target, UPDATED_TITLE).await,
          }
        })
      })
    };

    Ok(Self {
      client,
      posts,
      comments,
      mutations,
    })
  }

  /// Navigate the post listing; see [`Pager::set_page`].
  pub fn set_page(&mut self, page: u32) {
    self.posts.set_page(page);
  }

  pub fn next_page(&mut self) {
    self.posts.next_page();
  }

  pub fn prev_page(&mut self) {
    self.posts.prev_page();
  }

  /// Select a post and make sure its comments are cached (or being
  /// fetched). The selection clears on the next page change; the cached
  /// comments stay.
  pub fn select_post(&mut self, post: Post) {
    self.comments.ensure(post.id);
    self.posts.select(post);
  }

  /// Comments entry for the selected post, if one is selected and its
  /// fetch has started.
  pub fn selected_comments(&self) -> Option<&CacheEntry<Vec<Comment>>> {
    let post = self.posts.selected()?;
    self.comments.get(&post.id)
  }

  /// Issue a delete for a post. Rejected while one is already pending for
  /// the same id.
  pub fn delete_post(&mut self, id: u64) -> Result<(), MutationError> {
    self.mutations.mutate(MutationKind::Delete, id)
  }

  /// Issue a title update for a post. Rejected while one is already
  /// pending for the same id.
  pub fn update_post(&mut self, id: u64) -> Result<(), MutationError> {
    self.mutations.mutate(MutationKind::Update, id)
  }

  /// Drain all coordinators. Returns true when anything changed, which is
  /// the view's signal to repaint.
  pub fn poll(&mut self) -> bool {
    let posts = self.posts.poll();
    let comments = !self.comments.poll().is_empty();
    let mutations = self.mutations.poll();
    posts || comments || mutations
  }

  pub fn posts(&self) -> &Pager<Post> {
    &self.posts
  }

  pub fn comments(&self) -> &CacheLayer<u64, Vec<Comment>> {
    &self.comments
  }

  pub fn mutations(&self) -> &Mutations {
    &self.mutations
  }

  /// The underlying client, for flows the session does not wrap (e.g.
  /// building a [`Feed`](crate::feed::Feed) over a cursor endpoint).
  pub fn client(&self) -> &ApiClient {
    &self.client
  }
}
