//! llama.cpp Server Backend
//!
//! Provides the generative capability over the HTTP API of a llama.cpp
//! style inference server. Tokenization, generation and detokenization
//! are separate endpoints, so each pipeline stage maps to one request.
//!
//! A llama.cpp server serves the one model it was started with and ignores
//! the `model` field of `/completion`. Models listed in
//! `generation.model_endpoints` are therefore sent to their own server;
//! every other model goes to `generation.endpoint`, which then has to be a
//! router that dispatches on `model`.

use crate::generation::{GenerationResult, ModelHandles, ModelLoader, Seq2SeqModel, Tokenizer};
use appdev_shared::{AppDevError, GenerationConfig, GenerationError, Result, TokenId};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Request payload for `/tokenize`
#[derive(Serialize, Debug)]
struct TokenizeRequest<'a> {
    content: &'a str,
    add_special: bool,
}

/// Response from `/tokenize`
#[derive(Deserialize, Debug)]
struct TokenizeResponse {
    tokens: Vec<TokenId>,
}

/// Request payload for `/detokenize`
#[derive(Serialize, Debug)]
struct DetokenizeRequest<'a> {
    tokens: &'a [TokenId],
}

/// Response from `/detokenize`
#[derive(Deserialize, Debug)]
struct DetokenizeResponse {
    content: String,
}

/// Request payload for `/completion`
#[derive(Serialize, Debug)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a [TokenId],
    n_predict: usize,
    return_tokens: bool,
    stream: bool,
}

/// Response from `/completion`
#[derive(Deserialize, Debug)]
struct CompletionResponse {
    #[serde(default)]
    tokens: Vec<TokenId>,
    #[serde(default)]
    stop: bool,
}

/// Connection shared by the tokenizer and model handles
struct ServerConnection {
    client: Client,
    endpoint: String,
    api_key: Option<Arc<SecretString>>,
}

impl ServerConnection {
    fn new(client: &Client, endpoint: &str, api_key: &Option<Arc<SecretString>>) -> Self {
        Self {
            client: client.clone(),
            endpoint: endpoint.trim().trim_end_matches('/').to_string(),
            api_key: api_key.clone(),
        }
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.post(format!("{}{}", self.endpoint, path)))
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.get(format!("{}{}", self.endpoint, path)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key.expose_secret()),
            None => request,
        }
    }

    /// Send a JSON request and decode the JSON answer
    async fn call<B, T>(&self, path: &str, body: &B) -> GenerationResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .post(path)
            .json(body)
            .send()
            .await
            .map_err(|e| GenerationError::Network {
                message: e.to_string(),
            })?;

        let response = check_status(response).await?;

        response
            .json::<T>()
            .await
            .map_err(|e| GenerationError::ResponseParsing {
                message: format!("Failed to parse {} response: {}", path, e),
            })
    }
}

/// Turn a non-success status into a server error carrying the body
async fn check_status(response: Response) -> GenerationResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    Err(GenerationError::ServerError {
        status_code: status.as_u16(),
        message,
    })
}

/// Loader that hands out handles bound to the server hosting each model
pub struct LlamaServerLoader {
    default: Arc<ServerConnection>,
    by_model: HashMap<String, Arc<ServerConnection>>,
}

impl LlamaServerLoader {
    /// Create a loader from generation settings
    pub fn new(config: &GenerationConfig, api_key: Option<SecretString>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppDevError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        let api_key = api_key.map(Arc::new);
        let by_model = config
            .model_endpoints
            .iter()
            .map(|(model, endpoint)| {
                let connection = ServerConnection::new(&client, endpoint, &api_key);
                (model.clone(), Arc::new(connection))
            })
            .collect();

        Ok(Self {
            default: Arc::new(ServerConnection::new(&client, &config.endpoint, &api_key)),
            by_model,
        })
    }

    /// Base URL for models without a dedicated server
    pub fn endpoint(&self) -> &str {
        &self.default.endpoint
    }

    /// Base URL requests for `model_name` are sent to
    pub fn endpoint_for(&self, model_name: &str) -> &str {
        &self.connection_for(model_name).endpoint
    }

    fn connection_for(&self, model_name: &str) -> &Arc<ServerConnection> {
        self.by_model.get(model_name).unwrap_or(&self.default)
    }
}

#[async_trait]
impl ModelLoader for LlamaServerLoader {
    #[instrument(skip(self))]
    async fn load(&self, model_name: &str) -> GenerationResult<ModelHandles> {
        let load_error = |message: String| GenerationError::ModelLoad {
            model: model_name.to_string(),
            message,
        };

        let connection = self.connection_for(model_name);
        let response = connection
            .get("/health")
            .send()
            .await
            .map_err(|e| load_error(e.to_string()))?;

        check_status(response)
            .await
            .map_err(|e| load_error(e.to_string()))?;

        debug!("Inference server at {} is ready", connection.endpoint);

        Ok(ModelHandles {
            tokenizer: Arc::new(LlamaTokenizer {
                connection: Arc::clone(connection),
            }),
            model: Arc::new(LlamaModel {
                connection: Arc::clone(connection),
                model_name: model_name.to_string(),
            }),
        })
    }
}

/// Tokenizer backed by `/tokenize` and `/detokenize`
pub struct LlamaTokenizer {
    connection: Arc<ServerConnection>,
}

#[async_trait]
impl Tokenizer for LlamaTokenizer {
    async fn encode(&self, text: &str) -> GenerationResult<Vec<TokenId>> {
        let request = TokenizeRequest {
            content: text,
            add_special: true,
        };

        self.connection
            .call::<_, TokenizeResponse>("/tokenize", &request)
            .await
            .map(|response| response.tokens)
            .map_err(|e| GenerationError::Encode {
                message: e.to_string(),
            })
    }

    async fn decode(&self, tokens: &[TokenId]) -> GenerationResult<String> {
        let request = DetokenizeRequest { tokens };

        self.connection
            .call::<_, DetokenizeResponse>("/detokenize", &request)
            .await
            .map(|response| response.content)
            .map_err(|e| GenerationError::Decode {
                message: e.to_string(),
            })
    }
}

/// Model backed by `/completion`
pub struct LlamaModel {
    connection: Arc<ServerConnection>,
    model_name: String,
}

#[async_trait]
impl Seq2SeqModel for LlamaModel {
    async fn generate(
        &self,
        input: &[TokenId],
        max_length: usize,
    ) -> GenerationResult<Vec<Vec<TokenId>>> {
        let request = CompletionRequest {
            model: &self.model_name,
            prompt: input,
            n_predict: max_length,
            return_tokens: true,
            stream: false,
        };

        let response = self
            .connection
            .call::<_, CompletionResponse>("/completion", &request)
            .await
            .map_err(|e| GenerationError::Generate {
                message: e.to_string(),
            })?;

        debug!("Completion finished, stop = {}", response.stop);
        Ok(vec![response.tokens])
    }
}
