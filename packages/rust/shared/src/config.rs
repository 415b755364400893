//! Application configuration for linkpost.
//!
//! User config lives at `~/.linkpost/linkpost.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LinkpostError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "linkpost.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".linkpost";

/// Content destination used when no content locator is given.
pub const DEFAULT_CONTENT_PATH: &str = "content/post";

/// Error budget used when no error budget is given.
pub const DEFAULT_MAX_ERRORS: usize = 10;

// ---------------------------------------------------------------------------
// Config structs (matching linkpost.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Source feed settings.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Link traversal settings.
    #[serde(default)]
    pub links: LinksConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Site root that content and image paths are composed against.
    #[serde(default = "default_base_dir")]
    pub base_dir: String,

    /// Content destination relative to `base_dir`.
    #[serde(default = "default_content_path")]
    pub content_path: String,

    /// Maximum tolerated reported errors (0 = unlimited).
    #[serde(default = "default_max_errors")]
    pub max_errors: usize,

    /// Execution mode: "sequential" or "concurrent".
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Worker ceiling for concurrent mode.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Progress reporter: "silent", "summary", or "display".
    #[serde(default = "default_reporter")]
    pub reporter: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            content_path: default_content_path(),
            max_errors: default_max_errors(),
            mode: default_mode(),
            concurrency: default_concurrency(),
            reporter: default_reporter(),
        }
    }
}

fn default_base_dir() -> String {
    ".".into()
}
fn default_content_path() -> String {
    DEFAULT_CONTENT_PATH.into()
}
fn default_max_errors() -> usize {
    DEFAULT_MAX_ERRORS
}
fn default_mode() -> String {
    "concurrent".into()
}
fn default_concurrency() -> usize {
    8
}
fn default_reporter() -> String {
    "display".into()
}

/// `[feed]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Timeout for fetching the source collection.
    #[serde(default = "default_feed_timeout")]
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_feed_timeout(),
        }
    }
}

fn default_feed_timeout() -> u64 {
    30
}

/// `[links]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksConfig {
    /// Timeout for each link traversal request.
    #[serde(default = "default_link_timeout")]
    pub timeout_secs: u64,

    /// Maximum redirects followed while resolving a link.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Links matching any of these regexes are discarded.
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Remove `utm_*` query parameters from final URLs.
    #[serde(default = "default_true")]
    pub strip_tracking_params: bool,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_link_timeout(),
            max_redirects: default_max_redirects(),
            ignore_patterns: Vec::new(),
            strip_tracking_params: true,
        }
    }
}

fn default_link_timeout() -> u64 {
    15
}
fn default_max_redirects() -> usize {
    10
}
fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.linkpost/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LinkpostError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.linkpost/linkpost.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LinkpostError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        LinkpostError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LinkpostError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LinkpostError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LinkpostError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("content_path"));
        assert!(toml_str.contains("content/post"));
        assert!(toml_str.contains("strip_tracking_params"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
base_dir = "/srv/site"
mode = "sequential"

[links]
ignore_patterns = ["^https://ads\\."]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.base_dir, "/srv/site");
        assert_eq!(config.defaults.mode, "sequential");
        assert_eq!(config.defaults.max_errors, DEFAULT_MAX_ERRORS);
        assert_eq!(config.defaults.concurrency, 8);
        assert_eq!(config.links.ignore_patterns.len(), 1);
        assert_eq!(config.links.max_redirects, 10);
        assert_eq!(config.feed.timeout_secs, 30);
    }

    #[test]
    fn load_config_from_reports_parse_errors() {
        let dir = std::env::temp_dir().join(format!("linkpost-config-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("linkpost.toml");
        std::fs::write(&path, "[defaults\nbase_dir = 1").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
