//! Core types used throughout AppDev

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index into a model vocabulary
pub type TokenId = u32;

/// Languages the syntax checker has a grammar for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceLanguage {
    Python,
    JavaScript,
    TypeScript,
    Go,
    Rust,
}

impl SourceLanguage {
    /// Resolve a free-form language label such as "Python" or "js"
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "python" | "py" => Some(SourceLanguage::Python),
            "javascript" | "js" | "node" => Some(SourceLanguage::JavaScript),
            "typescript" | "ts" => Some(SourceLanguage::TypeScript),
            "go" | "golang" => Some(SourceLanguage::Go),
            "rust" | "rs" => Some(SourceLanguage::Rust),
            _ => None,
        }
    }

    /// Conventional unit test framework for this language
    pub fn test_framework(self) -> &'static str {
        match self {
            SourceLanguage::Python => "unittest",
            SourceLanguage::JavaScript | SourceLanguage::TypeScript => "jest",
            SourceLanguage::Go => "testing",
            SourceLanguage::Rust => "#[test]",
        }
    }
}

impl fmt::Display for SourceLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLanguage::Python => write!(f, "Python"),
            SourceLanguage::JavaScript => write!(f, "JavaScript"),
            SourceLanguage::TypeScript => write!(f, "TypeScript"),
            SourceLanguage::Go => write!(f, "Go"),
            SourceLanguage::Rust => write!(f, "Rust"),
        }
    }
}
