//! Configuration Management
//!
//! Locates, loads and saves the AppDev configuration file and keeps the
//! server API key out of the serialized configuration.

use appdev_shared::{AppDevConfig, Result};
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// File name searched for during discovery
pub const CONFIG_FILE_NAME: &str = "appdev.toml";

/// Configuration manager for AppDev
pub struct ConfigManager {
    /// Current configuration
    config: AppDevConfig,

    /// Configuration file path
    config_path: Option<PathBuf>,

    /// API key (kept apart from the configuration)
    api_key: Option<SecretString>,
}

impl ConfigManager {
    /// Create a new configuration manager
    pub fn new(config: AppDevConfig) -> Self {
        let api_key = config.load_api_key();

        Self {
            config,
            config_path: None,
            api_key,
        }
    }

    /// Create configuration manager from file
    #[instrument]
    pub fn from_file<P: AsRef<Path> + std::fmt::Debug>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let config = AppDevConfig::load_from_file(path)?;

        Ok(Self {
            config_path: Some(path.to_path_buf()),
            ..Self::new(config)
        })
    }

    /// Create with automatic configuration discovery
    #[instrument]
    pub fn auto_discover() -> Result<Self> {
        for path in Self::config_search_paths() {
            if path.exists() {
                debug!("Found configuration at: {}", path.display());
                return Self::from_file(path);
            }
        }

        warn!("No configuration file found, using defaults");
        Ok(Self::new(AppDevConfig::load_with_env()?))
    }

    /// Get current configuration
    pub fn config(&self) -> &AppDevConfig {
        &self.config
    }

    /// Path the configuration was loaded from, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Take the API key, leaving none behind
    pub fn take_api_key(&mut self) -> Option<SecretString> {
        self.api_key.take()
    }

    /// Save current configuration to file
    #[instrument(skip(self))]
    pub fn save_to_file<P: AsRef<Path> + std::fmt::Debug>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        self.config.save_to_file(path)?;
        info!("Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Get configuration search paths, most specific first
    fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from(".").join(CONFIG_FILE_NAME),
            PathBuf::from("./config").join(CONFIG_FILE_NAME),
        ];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("appdev").join(CONFIG_FILE_NAME));
        }

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(format!(".{}", CONFIG_FILE_NAME)));
        }

        paths
    }
}
