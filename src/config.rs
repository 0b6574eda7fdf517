//! Proxy configuration: version tag, application origin, store location.

use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::{Origin, Url};

/// Configuration for the offline cache proxy.
///
/// The version tag identifies the current store generation; bump it on each
/// deployment to invalidate everything cached by prior versions. The origin
/// is the application's own origin, used by the eligibility filter.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
  /// Current store generation, e.g. "app-v2".
  pub version_tag: String,
  /// The application's own origin, e.g. "https://app.example".
  #[serde(deserialize_with = "deserialize_url")]
  pub origin: Url,
  /// Where the SQLite provider keeps its database (defaults to the platform
  /// data directory when unset).
  pub store_path: Option<PathBuf>,
}

fn deserialize_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
  D: serde::Deserializer<'de>,
{
  let s = String::deserialize(deserializer)?;
  Url::parse(&s).map_err(serde::de::Error::custom)
}

impl ProxyConfig {
  /// Create a configuration programmatically.
  pub fn new(version_tag: impl Into<String>, origin: Url) -> Self {
    Self {
      version_tag: version_tag.into(),
      origin,
      store_path: None,
    }
  }

  /// The application origin requests are matched against.
  pub fn app_origin(&self) -> Origin {
    self.origin.origin()
  }

  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./cachefall.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/cachefall/config.yaml
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
        "No configuration file found. Create one at ~/.config/cachefall/config.yaml\n\
                 with at least version_tag and origin set."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("cachefall.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("cachefall").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: ProxyConfig = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }
}
