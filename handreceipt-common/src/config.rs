//! Configuration loading and root folder resolution
//!
//! Missing or unreadable TOML files never stop startup: the loader logs a
//! warning and falls back to compiled defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "HANDRECEIPT_ROOT_FOLDER";

/// Database file created inside the root folder
pub const DATABASE_FILE_NAME: &str = "handreceipt.db";

/// Compiled-in defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

/// TOML configuration file contents
///
/// Every section is optional; absent keys take the serde defaults below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_folder: Option<PathBuf>,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub nsn_catalog: NsnCatalogConfig,

    #[serde(default)]
    pub import: ImportSettings,

    /// Receiving unit used when a request does not name one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<UnitDefaults>,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            port: default_port(),
            logging: LoggingConfig::default(),
            nsn_catalog: NsnCatalogConfig::default(),
            import: ImportSettings::default(),
            unit: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// NSN catalog lookup settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NsnCatalogConfig {
    /// Disable to skip enrichment entirely
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base URL of the catalog service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Per-attempt timeout
    #[serde(default = "default_nsn_timeout_secs")]
    pub timeout_secs: u64,

    /// Additional attempts after a transient failure
    #[serde(default = "default_nsn_retry_attempts")]
    pub retry_attempts: u32,

    /// Minimum spacing between outbound requests
    #[serde(default = "default_nsn_rate_limit_ms")]
    pub rate_limit_ms: u64,

    /// Catalog answers kept in memory; oldest evicted first
    #[serde(default = "default_nsn_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for NsnCatalogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: None,
            api_key: None,
            timeout_secs: default_nsn_timeout_secs(),
            retry_attempts: default_nsn_retry_attempts(),
            rate_limit_ms: default_nsn_rate_limit_ms(),
            cache_capacity: default_nsn_cache_capacity(),
        }
    }
}

/// Batch import tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSettings {
    /// Concurrent commit workers per batch
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Serial matches below this confidence are flagged for review
    #[serde(default = "default_review_threshold")]
    pub review_confidence_threshold: f64,

    /// Largest accepted batch, counted both as submitted items and as
    /// outcomes after quantity expansion
    #[serde(default = "default_max_batch_items")]
    pub max_batch_items: usize,

    /// Line quantities above this are flagged for review
    #[serde(default = "default_suspicious_quantity")]
    pub suspicious_quantity_threshold: u32,

    /// Total time a property insert may spend retrying a locked database
    #[serde(default = "default_max_lock_wait_ms")]
    pub max_lock_wait_ms: u64,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            review_confidence_threshold: default_review_threshold(),
            max_batch_items: default_max_batch_items(),
            suspicious_quantity_threshold: default_suspicious_quantity(),
            max_lock_wait_ms: default_max_lock_wait_ms(),
        }
    }
}

/// Default receiving unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitDefaults {
    pub unit_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dodaac: Option<String>,
}

fn default_port() -> u16 {
    5780
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_nsn_timeout_secs() -> u64 {
    5
}

fn default_nsn_retry_attempts() -> u32 {
    2
}

fn default_nsn_rate_limit_ms() -> u64 {
    100
}

fn default_nsn_cache_capacity() -> usize {
    10_000
}

fn default_max_workers() -> usize {
    4
}

fn default_review_threshold() -> f64 {
    0.7
}

fn default_max_batch_items() -> usize {
    1000
}

fn default_suspicious_quantity() -> u32 {
    1000
}

fn default_max_lock_wait_ms() -> u64 {
    5000
}

/// Default configuration file path (`~/.config/handreceipt/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("handreceipt").join("config.toml"))
}

/// Load and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load a TOML config file, degrading to defaults when missing or invalid
pub fn load_or_default(path: Option<&Path>) -> TomlConfig {
    let Some(path) = path else {
        warn!("No configuration directory available, using compiled defaults");
        return TomlConfig::default();
    };

    if !path.exists() {
        warn!(
            path = %path.display(),
            "Config file not found, using compiled defaults"
        );
        return TomlConfig::default();
    }

    match load_toml_config(path) {
        Ok(config) => {
            info!(path = %path.display(), "Loaded configuration");
            config
        }
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "Config file unreadable, using compiled defaults"
            );
            TomlConfig::default()
        }
    }
}

/// Write a TOML config file atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, content)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. `HANDRECEIPT_ROOT_FOLDER` environment variable
/// 3. TOML `root_folder`
/// 4. OS-dependent compiled default
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_value: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_toml(mut self, config: &TomlConfig) -> Self {
        self.toml_value = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_value {
            return path.clone();
        }

        default_root_folder()
    }
}

/// Creates the root folder and locates the database inside it
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            info!(path = %self.root_folder.display(), "Creating root folder");
            std::fs::create_dir_all(&self.root_folder)?;
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("handreceipt"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\handreceipt"))
    } else {
        dirs::data_local_dir()
            .map(|d| d.join("handreceipt"))
            .unwrap_or_else(|| PathBuf::from("./handreceipt_data"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_takes_defaults() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(config.port, 5780);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.nsn_catalog.timeout_secs, 5);
        assert_eq!(config.nsn_catalog.retry_attempts, 2);
        assert_eq!(config.nsn_catalog.cache_capacity, 10_000);
        assert_eq!(config.import.max_workers, 4);
        assert_eq!(config.import.suspicious_quantity_threshold, 1000);
        assert!((config.import.review_confidence_threshold - 0.7).abs() < f64::EPSILON);
        assert!(config.unit.is_none());
    }

    #[test]
    fn test_partial_sections_merge_with_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            [nsn_catalog]
            endpoint = "http://catalog.local"

            [unit]
            unit_name = "A CO 1-502 IN"
            "#,
        )
        .unwrap();

        assert_eq!(config.nsn_catalog.endpoint.as_deref(), Some("http://catalog.local"));
        assert!(config.nsn_catalog.enabled);
        assert_eq!(config.nsn_catalog.timeout_secs, 5);
        let unit = config.unit.unwrap();
        assert_eq!(unit.unit_name, "A CO 1-502 IN");
        assert!(unit.dodaac.is_none());
    }

    #[test]
    fn test_cli_arg_wins() {
        let resolver = RootFolderResolver::new()
            .with_cli_arg(Some(PathBuf::from("/tmp/cli")))
            .with_toml(&TomlConfig {
                root_folder: Some(PathBuf::from("/tmp/toml")),
                ..Default::default()
            });
        assert_eq!(resolver.resolve(), PathBuf::from("/tmp/cli"));
    }
}
