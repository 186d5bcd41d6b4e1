use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cache::DEFAULT_TTL_SECS;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  /// Custom title for header (defaults to the API host if not set)
  pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base url of the MediCure API, e.g. "https://api.medicure.example/v1"
  pub url: String,
  /// Id of the signed-in user, as issued by the identity provider
  pub user_id: String,
  /// Per-request timeout
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// How long a fetched resource stays fresh
  #[serde(default = "default_ttl_secs")]
  pub ttl_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      ttl_secs: default_ttl_secs(),
    }
  }
}

fn default_timeout_secs() -> u64 {
  30
}

/// Longest accepted cache ttl: one week.
const MAX_TTL_SECS: u64 = 7 * 24 * 60 * 60;

fn default_ttl_secs() -> u64 {
  DEFAULT_TTL_SECS as u64
}

impl CacheConfig {
  pub fn ttl(&self) -> chrono::Duration {
    chrono::Duration::seconds(self.ttl_secs as i64)
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./medicure.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/medicure/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/medicure/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("medicure.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("medicure").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))?;

    if config.cache.ttl_secs == 0 {
      return Err(eyre!("cache.ttl_secs must be greater than zero"));
    }
    if config.cache.ttl_secs > MAX_TTL_SECS {
      return Err(eyre!(
        "cache.ttl_secs must be at most {} (one week), got {}",
        MAX_TTL_SECS,
        config.cache.ttl_secs
      ));
    }
    if config.api.user_id.trim().is_empty() {
      return Err(eyre!("api.user_id must not be empty"));
    }

    Ok(config)
  }

  /// Get the access token issued by the identity provider.
  ///
  /// Checks MEDICURE_ACCESS_TOKEN first, then MEDICURE_TOKEN as fallback.
  pub fn get_access_token() -> Result<String> {
    std::env::var("MEDICURE_ACCESS_TOKEN")
      .or_else(|_| std::env::var("MEDICURE_TOKEN"))
      .map_err(|_| {
        eyre!("Access token not found. Set MEDICURE_ACCESS_TOKEN or MEDICURE_TOKEN environment variable.")
      })
  }

  /// Default location of the log file.
  pub fn default_log_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("medicure").join("medicure.log"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = Config::parse(
      "api:\n  url: https://api.medicure.example/v1\n  user_id: u-42\n",
    )
    .unwrap();

    assert_eq!(config.api.timeout_secs, 30);
    assert_eq!(config.cache.ttl_secs, 300);
    assert_eq!(config.cache.ttl(), chrono::Duration::minutes(5));
    assert_eq!(config.title, None);
  }

  #[test]
  fn test_full_config() {
    let config = Config::parse(
      "api:\n  url: http://localhost:8080\n  user_id: u-1\n  timeout_secs: 5\n\
       cache:\n  ttl_secs: 60\ntitle: Staging\n",
    )
    .unwrap();

    assert_eq!(config.api.timeout_secs, 5);
    assert_eq!(config.cache.ttl_secs, 60);
    assert_eq!(config.title.as_deref(), Some("Staging"));
  }

  #[test]
  fn test_zero_ttl_is_rejected() {
    let err = Config::parse(
      "api:\n  url: http://localhost\n  user_id: u-1\ncache:\n  ttl_secs: 0\n",
    )
    .unwrap_err();
    assert!(err.to_string().contains("ttl_secs"));
  }

  #[test]
  fn test_huge_ttl_is_rejected() {
    let err = Config::parse(&format!(
      "api:\n  url: http://localhost\n  user_id: u-1\ncache:\n  ttl_secs: {}\n",
      u64::MAX
    ))
    .unwrap_err();
    assert!(err.to_string().contains("at most"));

    let config = Config::parse(&format!(
      "api:\n  url: http://localhost\n  user_id: u-1\ncache:\n  ttl_secs: {}\n",
      MAX_TTL_SECS
    ))
    .unwrap();
    assert_eq!(config.cache.ttl(), chrono::Duration::weeks(1));
  }

  #[test]
  fn test_missing_api_section_is_rejected() {
    assert!(Config::parse("title: nothing\n").is_err());
  }

  #[test]
  fn test_missing_explicit_path() {
    let err = Config::load(Some(Path::new("/nonexistent/medicure.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }
}
