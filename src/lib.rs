//! Client-side page cache coordination for REST list/detail UIs.
//!
//! flipbook keeps a session-lifetime, in-memory cache of paginated fetches
//! and coordinates the flows around it: serve-then-revalidate for stale
//! pages, background prefetch of the adjacent page, discard of superseded
//! responses, and per-target mutation feedback. Rendering is someone
//! else's job; every coordinator here is a poll-driven state machine that
//! a UI ticks from its event loop.
//!
//! ```ignore
//! let config = Config::load(None)?;
//! let mut session = Session::new(&config)?;
//! session.set_page(1);
//!
//! // In the event loop tick
//! if session.poll() {
//!   // State changed, repaint from session.posts()
//! }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod feed;
pub mod mutation;
pub mod pager;
pub mod session;

pub use api::client::ApiClient;
pub use api::types::{Comment, FeedPage, Page, Post};
pub use cache::{CacheEntry, CacheLayer, CacheStore, FetchStatus};
pub use config::{ApiConfig, Config};
pub use error::{ConfigError, FetchError, MutationError};
pub use feed::Feed;
pub use mutation::{MutationKind, MutationRecord, MutationStatus, Mutations};
pub use pager::Pager;
pub use session::Session;
