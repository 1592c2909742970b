//! Provider configuration

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Streaming read chunk size when none is configured
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Configuration passed to the disk provider at construction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Streaming read chunk size in bytes
    pub buffer_size: usize,

    /// Release-track tag; `"stable"` influences the legacy-watcher heuristic
    pub product_channel: String,

    pub watcher: WatcherConfig,

    /// Tri-state legacy watcher override; absent means heuristic
    pub legacy_watcher: Option<LegacyWatcherMode>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            product_channel: "stable".to_string(),
            watcher: WatcherConfig::default(),
            legacy_watcher: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Force the polling backend, either outright or for matching folders
    pub use_polling: UsePolling,

    /// Polling period in milliseconds
    pub polling_interval_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            use_polling: UsePolling::Enabled(false),
            polling_interval_ms: 5000,
        }
    }
}

/// Bool-or-glob-list polling switch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UsePolling {
    Enabled(bool),
    Globs(Vec<String>),
}

impl Default for UsePolling {
    fn default() -> Self {
        UsePolling::Enabled(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegacyWatcherMode {
    #[serde(rename = "on")]
    On,
    #[serde(rename = "off")]
    Off,
}

impl ProviderConfig {
    /// Load configuration from the platform config dir, defaulting when absent
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Self = toml::from_str(&content)?;
            tracing::info!("Configuration loaded from {:?}", config_path);
            Ok(config)
        } else {
            tracing::info!("Using default configuration");
            Ok(Self::default())
        }
    }

    /// Save configuration to the platform config dir
    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        tracing::info!("Configuration saved to {:?}", config_path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        ProjectDirs::from("com", "DiskProvider", "DiskProvider")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("./config.toml"))
    }
}
