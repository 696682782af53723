//! Configuration loading and root folder resolution
//!
//! Resolution order for every setting that can come from several places:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error: a warning is logged and compiled
//! defaults are used.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{Error, Result};

/// Environment variable naming the root folder
pub const ENV_ROOT_FOLDER: &str = "CATWALK_ROOT_FOLDER";
/// Environment variable naming the TOML config file
pub const ENV_CONFIG: &str = "CATWALK_CONFIG";
/// Config file name searched in the user config dir and the root folder
pub const CONFIG_FILE_NAME: &str = "catwalk.toml";
/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "catwalk.db";

/// Complete TOML configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Root folder holding the database
    pub root_folder: Option<PathBuf>,
    pub server: ServerConfig,
    pub crawl: CrawlConfig,
    pub filter: FilterConfig,
    pub review: ReviewConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5780,
        }
    }
}

/// Crawl Controller settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Start pages; each seed's host defines "same site"
    pub seeds: Vec<String>,
    /// Only pages whose path starts with this prefix are enqueued
    pub allowed_path_prefix: String,
    pub max_pages: usize,
    pub page_timeout_secs: u64,
    /// Maximum rows stored per visited page
    pub per_page_insert_cap: usize,
    pub user_agent: String,
    /// Category used when none can be derived from the page path
    pub default_category: String,
    /// Seconds between scheduled crawls; 0 turns the scheduler off
    pub schedule_interval_secs: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            seeds: vec!["https://www.harpersbazaar.com/fashion/".to_string()],
            allowed_path_prefix: "/fashion/".to_string(),
            max_pages: 50,
            page_timeout_secs: 30,
            per_page_insert_cap: 5,
            user_agent: "Mozilla/5.0 (compatible; CatwalkCrawler/0.1)".to_string(),
            default_category: "fashion".to_string(),
            schedule_interval_secs: 0,
        }
    }
}

/// Base Image Filter rules (before any learned refinements)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub fashion_keywords: Vec<String>,
    pub exclude_keywords: Vec<String>,
    /// An image wider or taller than this passes on size alone
    pub min_dimension_px: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        let fashion = [
            "fashion", "style", "runway", "trend", "look", "outfit", "model", "celebrity",
            "street", "designer", "collection", "show", "photo", "gallery", "editorial",
            "shoot", "campaign",
        ];
        let exclude = [
            "icon", "logo", "sprite", "button", "_assets", "design-tokens", "checkmark",
            "magnifying", "arrow", "close", "menu", "search", "social", "share", "badge",
            "sponsor", "advert", "banner", "header", "footer", "navigation", "sidebar",
            "placeholder", "avatar",
        ];
        Self {
            fashion_keywords: fashion.iter().map(|s| s.to_string()).collect(),
            exclude_keywords: exclude.iter().map(|s| s.to_string()).collect(),
            min_dimension_px: 200,
        }
    }
}

/// Review Session Manager settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    pub ttl_hours: i64,
    /// Maximum entries queued into one review session
    pub batch_size: i64,
    /// Base URL of the review UI; the session id is appended as a query
    pub review_url_base: String,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            ttl_hours: 6,
            batch_size: 100,
            review_url_base: "http://127.0.0.1:5780/training".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Load configuration from a file, falling back to defaults when the file
    /// does not exist. A file that exists but does not parse is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let (config, source) = Self::load(path)?;
        source.log();
        Ok(config)
    }

    /// Like [`TomlConfig::load_or_default`] but logs nothing, so the caller
    /// can report the source once its subscriber is installed
    pub fn load(path: Option<&Path>) -> Result<(Self, ConfigSource)> {
        let Some(path) = path else {
            return Ok((Self::default(), ConfigSource::Defaults));
        };

        if !path.exists() {
            return Ok((Self::default(), ConfigSource::Missing(path.to_path_buf())));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)?;
        Ok((config, ConfigSource::File(path.to_path_buf())))
    }
}

/// Where a loaded [`TomlConfig`] came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// A path was resolved but nothing exists there
    Missing(PathBuf),
    /// No path was resolved at all
    Defaults,
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded configuration from {}", path.display()),
            ConfigSource::Missing(path) => {
                warn!("Config file {} not found, using compiled defaults", path.display())
            }
            ConfigSource::Defaults => warn!("No config file found, using compiled defaults"),
        }
    }
}

/// Locate the config file: CLI → ENV → user config dir → root folder
pub fn resolve_config_path(cli_arg: Option<&Path>, root_folder: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(ENV_CONFIG) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let user_config = dirs::config_dir().map(|d| d.join("catwalk").join(CONFIG_FILE_NAME));
    if let Some(user_config) = user_config {
        if user_config.exists() {
            return Some(user_config);
        }
    }

    root_folder
        .map(|root| root.join(CONFIG_FILE_NAME))
        .filter(|p| p.exists())
}

/// Resolve the root folder: CLI → ENV → TOML → OS default
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ENV_ROOT_FOLDER) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("catwalk"))
        .unwrap_or_else(|| PathBuf::from("./catwalk_data"))
}

/// Create the root folder if missing and return the database path inside it
pub fn ensure_root_folder(root_folder: &Path) -> Result<PathBuf> {
    if !root_folder.exists() {
        std::fs::create_dir_all(root_folder)?;
        info!("Created root folder: {}", root_folder.display());
    }
    Ok(root_folder.join(DATABASE_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = TomlConfig::default();
        assert_eq!(config.crawl.max_pages, 50);
        assert_eq!(config.crawl.page_timeout_secs, 30);
        assert_eq!(config.crawl.per_page_insert_cap, 5);
        assert_eq!(config.crawl.schedule_interval_secs, 0);
        assert_eq!(config.filter.min_dimension_px, 200);
        assert_eq!(config.review.ttl_hours, 6);
        assert_eq!(config.review.batch_size, 100);
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = TomlConfig::from_toml_str(
            r#"
            [crawl]
            max_pages = 3

            [filter]
            min_dimension_px = 400
            "#,
        )
        .unwrap();

        assert_eq!(config.crawl.max_pages, 3);
        assert_eq!(config.crawl.allowed_path_prefix, "/fashion/");
        assert_eq!(config.filter.min_dimension_px, 400);
        assert!(!config.filter.fashion_keywords.is_empty());
        assert_eq!(config.server.port, 5780);
    }

    #[test]
    fn test_crawl_schedule_from_toml() {
        let config =
            TomlConfig::from_toml_str("[crawl]\nschedule_interval_secs = 3600\n").unwrap();
        assert_eq!(config.crawl.schedule_interval_secs, 3600);
        assert_eq!(config.crawl.max_pages, 50);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("[crawl\nmax_pages = ").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
