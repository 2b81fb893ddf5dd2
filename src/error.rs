//! Typed errors for fetching, mutating, and configuration.

use thiserror::Error;

/// Errors surfaced by the HTTP fetcher.
///
/// Cache entries and mutation records hold onto the error that produced
/// them, so variants capture transport detail as owned strings and the
/// whole enum is `Clone`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
  /// Transport-level failure: unreachable host, timeout, broken connection.
  #[error("network error: {detail}")]
  Network { detail: String },

  /// The requested resource does not exist (HTTP 404).
  #[error("not found: {url}")]
  NotFound { url: String },

  /// The server failed (HTTP 5xx).
  #[error("server error {status}: {detail}")]
  Server { status: u16, detail: String },

  /// Any other non-success response, and bodies that fail to parse.
  #[error("unexpected response ({status}): {detail}")]
  Unexpected { status: u16, detail: String },
}

/// Rejection of a mutation that cannot start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
  /// A mutation for this target is still in flight.
  #[error("a mutation for target {target} is already pending")]
  Busy { target: u64 },
}

/// Errors while locating, reading, or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("config file not found: {0}")]
  NotFound(String),

  #[error("failed to read {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse {path}: {source}")]
  Parse {
    path: String,
    #[source]
    source: serde_yaml::Error,
  },

  #[error("invalid {field}: {detail}")]
  Invalid { field: &'static str, detail: String },
}
