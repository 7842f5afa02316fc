//! Error types for AppDev

use std::fmt;
use thiserror::Error;

/// Main error type for AppDev operations
#[derive(Debug, Error)]
pub enum AppDevError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {message}")]
    Template { message: String },

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Result type alias for AppDev operations
pub type Result<T> = std::result::Result<T, AppDevError>;

/// Faults raised by the generative capability, one per pipeline stage
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    #[error("Failed to load model {model}: {message}")]
    ModelLoad { model: String, message: String },

    #[error("Tokenizer failed to encode input: {message}")]
    Encode { message: String },

    #[error("Model failed to generate: {message}")]
    Generate { message: String },

    #[error("Tokenizer failed to decode output: {message}")]
    Decode { message: String },

    #[error("Model returned no output sequence")]
    EmptyOutput,

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Server error: {status_code} - {message}")]
    ServerError { status_code: u16, message: String },

    #[error("Response parsing error: {message}")]
    ResponseParsing { message: String },
}

/// Location and description of malformed input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxFault {
    pub message: String,

    /// Line number (1-based)
    pub line: usize,

    /// Column number (1-based)
    pub column: usize,
}

impl fmt::Display for SyntaxFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {}, column {})", self.message, self.line, self.column)
    }
}

/// Outcome of a failed parse.
///
/// `Syntax` means the input is malformed, `Internal` means the parser
/// itself could not do its job.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseFault {
    #[error("{0}")]
    Syntax(SyntaxFault),

    #[error("{message}")]
    Internal { message: String },
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid configuration format: {message}")]
    InvalidFormat { message: String },

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

impl From<ConfigError> for AppDevError {
    fn from(error: ConfigError) -> Self {
        AppDevError::Config {
            message: error.to_string(),
        }
    }
}

impl From<::config::ConfigError> for ConfigError {
    fn from(error: ::config::ConfigError) -> Self {
        ConfigError::InvalidFormat {
            message: error.to_string(),
        }
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(error: toml::ser::Error) -> Self {
        ConfigError::InvalidFormat {
            message: error.to_string(),
        }
    }
}
