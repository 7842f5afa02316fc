//! Code Generation
//!
//! This module drives the external generative capability:
//! - Abstract tokenizer, model and loader interfaces
//! - Lazily loaded model handles, cached per model name
//! - The best-effort `generate_code` surface that never fails

pub mod llama;

pub use llama::LlamaServerLoader;

use appdev_shared::{GenerationConfig, GenerationError, TokenId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Result type for generative capability calls
pub type GenerationResult<T> = std::result::Result<T, GenerationError>;

/// Text to token conversion for one model vocabulary
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Tokenizer: Send + Sync {
    /// Encode text into a token sequence
    async fn encode(&self, text: &str) -> GenerationResult<Vec<TokenId>>;

    /// Decode a token sequence back into text, dropping special tokens
    async fn decode(&self, tokens: &[TokenId]) -> GenerationResult<String>;
}

/// Sequence-to-sequence model
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Seq2SeqModel: Send + Sync {
    /// Generate output sequences for `input`, producing at most `max_length` tokens each
    async fn generate(
        &self,
        input: &[TokenId],
        max_length: usize,
    ) -> GenerationResult<Vec<Vec<TokenId>>>;
}

/// Tokenizer and model loaded for one model context
#[derive(Clone)]
pub struct ModelHandles {
    pub tokenizer: Arc<dyn Tokenizer>,
    pub model: Arc<dyn Seq2SeqModel>,
}

/// Acquires model handles by name
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, model_name: &str) -> GenerationResult<ModelHandles>;
}

/// A single generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Correlates log lines of one call
    pub id: Uuid,
    pub description: String,
    pub language: String,
    pub max_length: usize,
}

impl GenerationRequest {
    pub fn new(description: impl Into<String>, language: impl Into<String>, max_length: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            language: language.into(),
            max_length,
        }
    }
}

/// Turns natural-language descriptions into source code
pub struct CodeGenerator {
    /// Loader for model handles
    loader: Arc<dyn ModelLoader>,

    /// Model selection settings
    config: GenerationConfig,

    /// Handles loaded so far, keyed by model name
    handles: RwLock<HashMap<String, ModelHandles>>,
}

impl CodeGenerator {
    /// Create a new generator. Nothing is loaded until the first call.
    pub fn new(loader: Arc<dyn ModelLoader>, config: GenerationConfig) -> Self {
        Self {
            loader,
            config,
            handles: RwLock::new(HashMap::new()),
        }
    }

    /// Generate code for a description.
    ///
    /// Any failure is logged and collapsed into an empty string.
    pub async fn generate_code(&self, description: &str, language: &str, max_length: usize) -> String {
        let request = GenerationRequest::new(description, language, max_length);

        match self.generate(&request).await {
            Ok(code) => code,
            Err(e) => {
                warn!(request_id = %request.id, "Code generation failed: {}", e);
                String::new()
            }
        }
    }

    /// Run encode, generate and decode for a request, keeping the fault detail
    #[instrument(
        skip_all,
        fields(request_id = %request.id, language = %request.language, max_length = request.max_length)
    )]
    pub async fn generate(&self, request: &GenerationRequest) -> GenerationResult<String> {
        let model_name = self.config.model_for(&request.language).to_string();
        let handles = self.acquire(&model_name).await?;

        let input = handles.tokenizer.encode(&request.description).await?;
        debug!("Encoded description into {} tokens", input.len());

        let outputs = handles.model.generate(&input, request.max_length).await?;
        let first = outputs.into_iter().next().ok_or(GenerationError::EmptyOutput)?;
        debug!("Model produced {} tokens", first.len());

        handles.tokenizer.decode(&first).await
    }

    /// Return cached handles, loading them on first use.
    ///
    /// A failed load is not cached, the next call tries again.
    async fn acquire(&self, model_name: &str) -> GenerationResult<ModelHandles> {
        let cached = self.handles.read().await.get(model_name).cloned();
        if let Some(handles) = cached {
            return Ok(handles);
        }

        info!("Loading model {}", model_name);
        let handles = self.loader.load(model_name).await?;

        self.handles
            .write()
            .await
            .entry(model_name.to_string())
            .or_insert_with(|| handles.clone());

        Ok(handles)
    }
}
