use airtable_cache::{ApiKey, FetchOptions, RetryPolicy, SnapshotConfig, DEFAULT_ENDPOINT};
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub airtable: AirtableConfig,
  /// Snapshot directory (defaults to the platform data directory)
  pub snapshot_root: Option<PathBuf>,
  #[serde(default)]
  pub load_retry: RetryPolicy,
  /// Write logs to daily files in this directory instead of stderr
  pub log_dir: Option<PathBuf>,
  /// Tables refreshed by `atcache cache`, with their fetch options
  #[serde(default)]
  pub tables: Vec<TableConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AirtableConfig {
  pub base_id: String,
  #[serde(default = "default_endpoint")]
  pub endpoint: String,
}

fn default_endpoint() -> String {
  DEFAULT_ENDPOINT.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableConfig {
  pub name: String,
  #[serde(flatten)]
  pub options: FetchOptions,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./atcache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/atcache/config.yaml
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
        "No configuration file found. Create one at ~/.config/atcache/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("atcache.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("atcache").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
    serde_yaml::from_str(contents)
  }

  /// Snapshot location and read retry policy for the library.
  pub fn snapshot_config(&self) -> SnapshotConfig {
    let config = SnapshotConfig::default().with_retry(self.load_retry);
    match &self.snapshot_root {
      Some(root) => config.with_root(root),
      None => config,
    }
  }

  /// Fetch options configured for a table, or the defaults.
  pub fn fetch_options(&self, table: &str) -> FetchOptions {
    self
      .tables
      .iter()
      .find(|t| t.name == table)
      .map(|t| t.options.clone())
      .unwrap_or_default()
  }

  /// Get the Airtable API key from environment variables.
  ///
  /// Checks ATCACHE_API_KEY first, then AIRTABLE_API_KEY as fallback.
  pub fn get_api_key() -> Result<ApiKey> {
    std::env::var("ATCACHE_API_KEY")
      .or_else(|_| std::env::var("AIRTABLE_API_KEY"))
      .map(ApiKey::new)
      .map_err(|_| {
        eyre!("Airtable API key not found. Set ATCACHE_API_KEY or AIRTABLE_API_KEY environment variable.")
      })
  }
}
