//! Configuration management for AppDev

use crate::error::{ConfigError, Result};
use crate::types::SourceLanguage;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Prefix of environment variables overriding file settings
pub const ENV_PREFIX: &str = "APPDEV";

/// Main configuration structure for AppDev
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppDevConfig {
    /// Generative model settings
    pub generation: GenerationConfig,

    /// Test case synthesis settings
    pub synthesis: SynthesisConfig,

    /// Syntax checking settings
    pub debugging: DebuggingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Generative model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Base URL of the inference server
    pub endpoint: String,

    /// Model used when a language has no dedicated entry
    pub default_model: String,

    /// Language label to model name
    pub language_models: HashMap<String, String>,

    /// Model name to the server hosting it, for models not on `endpoint`
    pub model_endpoints: HashMap<String, String>,

    /// Timeout for requests in seconds
    pub timeout_seconds: u64,

    /// Environment variable holding the server API key, if any
    pub api_key_env: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080".to_string(),
            default_model: "Salesforce/codet5-base".to_string(),
            language_models: HashMap::new(),
            model_endpoints: HashMap::new(),
            timeout_seconds: 120,
            api_key_env: "APPDEV_API_KEY".to_string(),
        }
    }
}

impl GenerationConfig {
    /// Model name for a language label, case-insensitive
    pub fn model_for(&self, language: &str) -> &str {
        let language = language.trim();
        self.language_models
            .iter()
            .find(|(label, _)| label.eq_ignore_ascii_case(language))
            .map(|(_, model)| model.as_str())
            .unwrap_or(&self.default_model)
    }

    /// Server hosting `model`
    pub fn endpoint_for(&self, model: &str) -> &str {
        self.model_endpoints
            .get(model)
            .map(String::as_str)
            .unwrap_or(&self.endpoint)
    }
}

fn is_http_url(url: &str) -> bool {
    let url = url.trim();
    url.starts_with("http://") || url.starts_with("https://")
}

/// Test case synthesis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Token bound for generated tests
    pub max_length: usize,

    /// Handlebars template replacing the built-in prompt
    pub prompt_template: Option<String>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_length: 512,
            prompt_template: None,
        }
    }
}

/// Syntax checking configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebuggingConfig {
    /// Grammar used by `debug_code` and the test synthesis gate
    pub language: SourceLanguage,
}

impl Default for DebuggingConfig {
    fn default() -> Self {
        Self {
            language: SourceLanguage::Python,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when RUST_LOG is unset
    pub level: String,

    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppDevConfig {
    /// Load a TOML file, layered with `APPDEV__SECTION__KEY` environment overrides
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path).format(::config::FileFormat::Toml))
            .add_source(Self::env_source())
            .build()
            .map_err(ConfigError::from)?;

        let config: Self = settings.try_deserialize().map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults layered with environment overrides only
    pub fn load_with_env() -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(Self::env_source())
            .build()
            .map_err(ConfigError::from)?;

        let config: Self = settings.try_deserialize().map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration as TOML
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::from)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values no backend could work with
    pub fn validate(&self) -> Result<()> {
        if !is_http_url(&self.generation.endpoint) {
            return Err(ConfigError::InvalidValue {
                key: "generation.endpoint".to_string(),
                value: self.generation.endpoint.clone(),
            }
            .into());
        }

        if let Some((model, endpoint)) = self
            .generation
            .model_endpoints
            .iter()
            .find(|(_, endpoint)| !is_http_url(endpoint))
        {
            return Err(ConfigError::InvalidValue {
                key: format!("generation.model_endpoints.{}", model),
                value: endpoint.clone(),
            }
            .into());
        }

        if self.generation.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                key: "generation.timeout_seconds".to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        if self.synthesis.max_length == 0 {
            return Err(ConfigError::InvalidValue {
                key: "synthesis.max_length".to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Read the inference server API key from the configured environment variable
    pub fn load_api_key(&self) -> Option<SecretString> {
        std::env::var(&self.generation.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
            .map(SecretString::from)
    }

    fn env_source() -> ::config::Environment {
        ::config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppDevConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.debugging.language, SourceLanguage::Python);
    }

    #[test]
    fn test_model_lookup() {
        let mut config = GenerationConfig::default();
        config
            .language_models
            .insert("javascript".to_string(), "codet5-js".to_string());

        assert_eq!(config.model_for("JavaScript"), "codet5-js");
        assert_eq!(config.model_for("Go"), "Salesforce/codet5-base");
    }

    #[test]
    fn test_model_endpoint_lookup() {
        let mut config = GenerationConfig::default();
        config
            .model_endpoints
            .insert("codet5-js".to_string(), "http://gpu-2:8081".to_string());

        assert_eq!(config.endpoint_for("codet5-js"), "http://gpu-2:8081");
        assert_eq!(config.endpoint_for("Salesforce/codet5-base"), "http://localhost:8080");
    }

    #[test]
    fn test_model_endpoints_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("appdev.toml");
        std::fs::write(
            &path,
            "[generation.language_models]\njavascript = \"codet5-js\"\n\n\
             [generation.model_endpoints]\n\"codet5-js\" = \"http://gpu-2:8081\"\n",
        )
        .unwrap();

        let loaded = AppDevConfig::load_from_file(&path).unwrap();
        let model = loaded.generation.model_for("javascript");
        assert_eq!(loaded.generation.endpoint_for(model), "http://gpu-2:8081");
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("appdev.toml");

        let mut config = AppDevConfig::default();
        config.synthesis.max_length = 256;
        config.debugging.language = SourceLanguage::Go;
        config.save_to_file(&path).unwrap();

        let loaded = AppDevConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("appdev.toml");
        std::fs::write(&path, "[debugging]\nlanguage = \"rust\"\n").unwrap();

        let loaded = AppDevConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.debugging.language, SourceLanguage::Rust);
        assert_eq!(loaded.generation, GenerationConfig::default());
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = AppDevConfig::load_from_file(temp_dir.path().join("absent.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = AppDevConfig::default();
        config.synthesis.max_length = 0;
        assert!(config.validate().is_err());

        let mut config = AppDevConfig::default();
        config.generation.endpoint = "localhost:8080".to_string();
        assert!(config.validate().is_err());

        let mut config = AppDevConfig::default();
        config
            .generation
            .model_endpoints
            .insert("codet5-js".to_string(), "gpu-2:8081".to_string());
        assert!(config.validate().is_err());
    }
}
