use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  pub api: ApiConfig,
  /// Items requested per page.
  pub page_size: u32,
  /// Hard upper bound on the page index, for collections whose size is
  /// known up front. None lets responses alone decide the boundary.
  pub max_page: Option<u32>,
  /// How long a fetched page stays fresh before the next access
  /// revalidates it in the background.
  pub stale_after_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  pub posts_url: String,
  pub comments_url: String,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      api: ApiConfig::default(),
      page_size: 10,
      max_page: Some(10),
      stale_after_ms: 2_000,
    }
  }
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      posts_url: "https://jsonplaceholder.typicode.com/posts".to_string(),
      comments_url: "https://jsonplaceholder.typicode.com/comments".to_string(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./flipbook.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/flipbook/config.yaml
  /// 4. ~/.config/flipbook/config.yaml
  ///
  /// With no file anywhere the defaults apply (the public demo endpoints),
  /// so a session can start without any setup.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(ConfigError::NotFound(p.display().to_string()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("flipbook.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("flipbook").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
      path: path.display().to_string(),
      source: e,
    })?;

    let config: Config = serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
      path: path.display().to_string(),
      source: e,
    })?;

    config.validate()?;
    Ok(config)
  }

  /// Check field-level constraints a YAML file can violate.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.page_size == 0 {
      return Err(ConfigError::Invalid {
        field: "page_size",
        detail: "must be at least 1".to_string(),
      });
    }
    if let Some(max) = self.max_page {
      if max == 0 {
        return Err(ConfigError::Invalid {
          field: "max_page",
          detail: "pages are 1-based; use null for no bound".to_string(),
        });
      }
    }
    for (field, raw) in [
      ("api.posts_url", &self.api.posts_url),
      ("api.comments_url", &self.api.comments_url),
    ] {
      Url::parse(raw).map_err(|e| ConfigError::Invalid {
        field,
        detail: format!("{raw}: {e}"),
      })?;
    }
    Ok(())
  }

  /// Staleness window as a duration.
  pub fn stale_after(&self) -> chrono::Duration {
    chrono::Duration::milliseconds(self.stale_after_ms as i64)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_point_at_demo_endpoints() {
    let config = Config::default();
    assert_eq!(config.page_size, 10);
    assert_eq!(config.max_page, Some(10));
    assert_eq!(config.stale_after_ms, 2_000);
    assert!(config.api.posts_url.ends_with("/posts"));
    assert!(config.validate().is_ok());
  }

  #[test]
  fn partial_yaml_fills_in_defaults() {
    let config: Config = serde_yaml::from_str("page_size: 25\n").unwrap();
    assert_eq!(config.page_size, 25);
    assert_eq!(config.stale_after_ms, 2_000);
    assert!(config.api.comments_url.ends_with("/comments"));
  }

  #[test]
  fn zero_page_size_is_rejected() {
    let config: Config = serde_yaml::from_str("page_size: 0\n").unwrap();
    assert!(matches!(
      config.validate(),
      Err(ConfigError::Invalid { field: "page_size", .. })
    ));
  }

  #[test]
  fn bad_url_is_rejected() {
    let config: Config = serde_yaml::from_str("api:\n  posts_url: not a url\n").unwrap();
    assert!(config.validate().is_err());
  }

  #[test]
  fn load_reads_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flipbook.yaml");
    std::fs::write(&path, "page_size: 5\nmax_page: 3\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.page_size, 5);
    assert_eq!(config.max_page, Some(3));
  }

  #[test]
  fn load_missing_explicit_path_errors() {
    let err = Config::load(Some(Path::new("/nonexistent/flipbook.yaml"))).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
  }
}
