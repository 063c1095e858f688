//! # Router Configuration Module
//!
//! Explicit configuration for router construction. Everything that used
//! to be an ambient decision (is caching on? where does the trie file
//! live?) is a field here, so two routers in one process can be
//! configured independently and tests can point the cache at a
//! temporary directory.
//!
//! ## Environment Variables
//!
//! [`RouterConfig::from_env`] reads:
//!
//! ### `ROUTRIE_CACHE`
//!
//! Enables the trie cache. Accepts `1`, `true`, `yes`, `on` (any case);
//! everything else leaves caching off.
//!
//! ### `ROUTRIE_CACHE_PATH`
//!
//! Path of the cache file. Default: `routrie_trie.json` in the working
//! directory.
//!
//! ## YAML
//!
//! [`RouterConfig::from_yaml_file`] loads the same fields from a file:
//!
//! ```yaml
//! cache:
//!   enabled: true
//!   path: /var/cache/app/trie.json
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use routrie::config::RouterConfig;
//!
//! let config = RouterConfig::from_env();
//! println!("cache enabled: {}", config.cache.enabled);
//! ```

use std::env;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Trie cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether compilation goes through a [`FileTrieCache`](crate::cache::FileTrieCache)
    pub enabled: bool,
    /// Cache file location
    pub path: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: PathBuf::from("routrie_trie.json"),
        }
    }
}

/// Top-level router configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub cache: CacheConfig,
}

impl RouterConfig {
    /// Loads configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(value) = env::var("ROUTRIE_CACHE") {
            config.cache.enabled = matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        if let Ok(path) = env::var("ROUTRIE_CACHE_PATH") {
            if !path.trim().is_empty() {
                config.cache.path = PathBuf::from(path);
            }
        }
        config
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: RouterConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }
}
