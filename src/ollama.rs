//! Minimal client for the Ollama HTTP API.
//!
//! Only the three endpoints this tool needs are covered:
//!
//! | Endpoint | Use |
//! |----------|-----|
//! | `POST /api/chat` | one non-streaming multimodal chat turn |
//! | `POST /api/show` | does the configured model exist locally? |
//! | `GET /api/tags`  | list pulled models (CLI `check`) |
//!
//! Transport and HTTP failures are translated into [`KpiLensError`]
//! variants here so callers never see a raw `reqwest::Error`.

use crate::error::KpiLensError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// One chat message. `images` holds base64 strings without a data-URI prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl ChatMessage {
    pub fn user_with_images(content: impl Into<String>, images: Vec<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            images,
        }
    }
}

/// Sampling options forwarded verbatim to the model runner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<usize>,
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(default)]
    pub options: ModelOptions,
}

/// Non-streaming answer of `POST /api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub model: String,
    pub message: ChatMessage,
    #[serde(default)]
    pub done: bool,
    /// Prompt tokens evaluated (absent when the prompt was cached).
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    /// Tokens generated.
    #[serde(default)]
    pub eval_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

/// One entry of `GET /api/tags`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelTag {
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Outcome of a model availability probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum ModelStatus {
    /// The daemon answered and has the model.
    Available,
    /// The daemon answered but the model is not pulled.
    Missing,
    /// The daemon could not be reached or answered with an error.
    Unreachable(String),
}

/// HTTP client bound to one Ollama daemon.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    host: String,
    timeout_secs: u64,
}

impl OllamaClient {
    /// Create a client for `host` (e.g. `http://localhost:11434`).
    pub fn new(host: impl Into<String>, timeout_secs: u64) -> Result<Self, KpiLensError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| KpiLensError::Internal(format!("HTTP client: {}", e)))?;
        Ok(Self {
            http,
            host: host.into().trim_end_matches('/').to_string(),
            timeout_secs,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.host, path)
    }

    /// Run one non-streaming chat turn.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, KpiLensError> {
        debug!(
            "POST {} model={} messages={}",
            self.url("/api/chat"),
            request.model,
            request.messages.len()
        );
        let response = self
            .http
            .post(self.url("/api/chat"))
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let response = self.check_status(response, &request.model).await?;
        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| self.transport_error(e))
    }

    /// Probe `/api/show` for the model.
    pub async fn show(&self, model: &str) -> Result<(), KpiLensError> {
        let response = self
            .http
            .post(self.url("/api/show"))
            .json(&serde_json::json!({ "model": model }))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.check_status(response, model).await.map(|_| ())
    }

    /// List models pulled into the daemon.
    pub async fn list_models(&self) -> Result<Vec<ModelTag>, KpiLensError> {
        let response = self
            .http
            .get(self.url("/api/tags"))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = self.check_status(response, "").await?;
        let tags = response
            .json::<TagsResponse>()
            .await
            .map_err(|e| self.transport_error(e))?;
        Ok(tags.models)
    }

    /// Classify the model as available, missing, or unknowable.
    pub async fn check_model(&self, model: &str) -> ModelStatus {
        match self.show(model).await {
            Ok(()) => ModelStatus::Available,
            Err(KpiLensError::ModelNotFound { .. }) => ModelStatus::Missing,
            Err(e) => ModelStatus::Unreachable(e.to_string()),
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> KpiLensError {
        if e.is_timeout() {
            KpiLensError::InferenceTimeout {
                secs: self.timeout_secs,
            }
        } else if e.is_connect() || e.is_request() {
            KpiLensError::ServiceUnreachable {
                host: self.host.clone(),
                reason: e.to_string(),
            }
        } else {
            KpiLensError::InferenceFailed {
                status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                message: e.to_string(),
            }
        }
    }

    async fn check_status(
        &self,
        response: reqwest::Response,
        model: &str,
    ) -> Result<reqwest::Response, KpiLensError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or(body);

        if status == reqwest::StatusCode::NOT_FOUND && !model.is_empty() {
            return Err(KpiLensError::ModelNotFound {
                model: model.to_string(),
            });
        }
        Err(KpiLensError::InferenceFailed {
            status: status.as_u16(),
            message,
        })
    }
}
