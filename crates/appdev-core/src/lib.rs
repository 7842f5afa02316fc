//! # AppDev Core
//!
//! Core engine for AppDev - AI application developer toolkit
//!
//! This crate wraps a pretrained sequence-to-sequence model and a set of
//! grammars behind three operations:
//! - Code generation from a natural-language description
//! - Static syntax checking of generated code
//! - Unit test synthesis for code and a description of its behavior
//!
//! Generation and synthesis are best effort: they return an empty string
//! instead of an error, and report what went wrong through `tracing`.

pub mod config;
pub mod debugging;
pub mod generation;
pub mod logging;
pub mod synthesis;

// Re-export commonly used types
pub use appdev_shared::*;

pub use crate::config::ConfigManager;
pub use crate::debugging::{
    parser_for, DebugReport, PythonParser, SourceParser, SyntaxDebugger, TreeSitterParser,
};
pub use crate::generation::{
    CodeGenerator, GenerationRequest, LlamaServerLoader, ModelHandles, ModelLoader, Seq2SeqModel,
    Tokenizer,
};
pub use crate::logging::{init_tracing, ErrorSink, TracingErrorSink};
pub use crate::synthesis::TestCaseSynthesizer;

use std::sync::Arc;
use tracing::info;

/// Main facade for AppDev
///
/// Owns the generator, debugger and synthesizer and exposes their
/// operations as one API.
pub struct AiApplicationDeveloper {
    generator: Arc<CodeGenerator>,
    debugger: Arc<SyntaxDebugger>,
    synthesizer: TestCaseSynthesizer,
    sink: Arc<dyn ErrorSink>,
    config: AppDevConfig,
}

impl AiApplicationDeveloper {
    /// Create an instance from the discovered configuration file
    pub fn new() -> Result<Self> {
        let mut manager = ConfigManager::auto_discover()?;
        if let Some(path) = manager.config_path() {
            info!("Loaded configuration from {}", path.display());
        }
        let api_key = manager.take_api_key();
        Self::build(manager.config().clone(), api_key)
    }

    /// Create an instance with custom configuration
    pub fn with_config(config: AppDevConfig) -> Result<Self> {
        config.validate()?;
        let api_key = config.load_api_key();
        Self::build(config, api_key)
    }

    fn build(config: AppDevConfig, api_key: Option<secrecy::SecretString>) -> Result<Self> {
        let loader = LlamaServerLoader::new(&config.generation, api_key)?;
        let parser = parser_for(config.debugging.language);

        info!(
            "Using inference server at {} with {} syntax checking",
            loader.endpoint(),
            config.debugging.language
        );

        Self::from_parts(config, Arc::new(loader), parser, Arc::new(TracingErrorSink))
    }

    /// Assemble an instance from explicit collaborators
    pub fn from_parts(
        config: AppDevConfig,
        loader: Arc<dyn ModelLoader>,
        parser: Arc<dyn SourceParser>,
        sink: Arc<dyn ErrorSink>,
    ) -> Result<Self> {
        let generator = Arc::new(CodeGenerator::new(loader, config.generation.clone()));
        let debugger = Arc::new(SyntaxDebugger::new(parser, Arc::clone(&sink)));
        let synthesizer = TestCaseSynthesizer::new(
            Arc::clone(&generator),
            Arc::clone(&debugger),
            config.debugging.language,
            &config.synthesis,
        )?;

        Ok(Self {
            generator,
            debugger,
            synthesizer,
            sink,
            config,
        })
    }

    /// Generate code for `description`, or an empty string if anything fails
    pub async fn generate_code(&self, description: &str, language: &str, max_length: usize) -> String {
        self.generator.generate_code(description, language, max_length).await
    }

    /// Check `code` for syntax errors and describe the outcome
    pub fn debug_code(&self, code: &str) -> String {
        self.debugger.debug_code(code)
    }

    /// Check `code` against the grammar named by `language`, such as `"js"` or `"Go"`.
    ///
    /// An unrecognised name is reported like any other checker failure.
    pub fn debug_code_as(&self, code: &str, language: &str) -> String {
        match SourceLanguage::from_label(language) {
            Some(language) => {
                SyntaxDebugger::for_language(language, Arc::clone(&self.sink)).debug_code(code)
            }
            None => {
                let report = DebugReport::Failure(format!("no grammar for language '{}'", language));
                let message = report.to_string();
                self.sink.log_error(&message);
                message
            }
        }
    }

    /// Generate tests for `code`, or an empty string if it cannot
    pub async fn create_test_cases(&self, code: &str, description: &str) -> String {
        self.synthesizer.create_test_cases(code, description).await
    }

    /// Report an error through the configured sink
    pub fn log_error(&self, message: &str) {
        self.sink.log_error(message);
    }

    /// Get current configuration
    pub fn config(&self) -> &AppDevConfig {
        &self.config
    }
}
