//! VLM interaction: send the instruction and dashboard image, get text back.
//!
//! Prompt wording lives in [`crate::prompts`]; wire types in
//! [`crate::ollama`]. This module only assembles the request and applies the
//! retry policy.
//!
//! ## Retry Strategy
//!
//! Retries are off by default (`max_retries = 0`). When enabled, only
//! retryable errors (daemon unreachable, timeout, 5xx) are retried, with
//! exponential backoff `retry_backoff_ms * 2^(attempt-1)`.

use crate::config::AnalysisConfig;
use crate::error::KpiLensError;
use crate::ollama::{ChatMessage, ChatRequest, ModelOptions, OllamaClient};
use crate::pipeline::encode::EncodedImage;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Raw model output plus accounting.
#[derive(Debug, Clone)]
pub struct Inference {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub duration_ms: u64,
    pub retries: u32,
}

/// Build the single-turn chat request for one dashboard.
///
/// One user message carries both the instruction and the image; Ollama's
/// vision models read the image as part of that turn.
pub fn build_request(
    instruction: &str,
    image: &EncodedImage,
    config: &AnalysisConfig,
) -> ChatRequest {
    ChatRequest {
        model: config.model.clone(),
        messages: vec![ChatMessage::user_with_images(
            instruction,
            vec![image.data.clone()],
        )],
        stream: false,
        options: ModelOptions {
            temperature: Some(config.temperature),
            num_predict: Some(config.max_tokens),
        },
    }
}

/// Run the inference call, retrying transient failures.
pub async fn run_inference(
    client: &OllamaClient,
    instruction: &str,
    image: &EncodedImage,
    config: &AnalysisConfig,
) -> Result<Inference, KpiLensError> {
    let start = Instant::now();
    let request = build_request(instruction, image, config);

    let mut attempt: u32 = 0;
    loop {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "Inference retry {}/{} after {}ms",
                attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match client.chat(&request).await {
            Ok(response) => {
                let duration = start.elapsed();
                let input_tokens = response.prompt_eval_count.unwrap_or(0);
                let output_tokens = response.eval_count.unwrap_or(0);
                debug!(
                    "{} input tokens, {} output tokens, {:?}",
                    input_tokens, output_tokens, duration
                );

                if response.message.content.trim().is_empty() {
                    return Err(KpiLensError::EmptyResponse {
                        model: config.model.clone(),
                    });
                }

                return Ok(Inference {
                    content: response.message.content,
                    input_tokens,
                    output_tokens,
                    duration_ms: duration.as_millis() as u64,
                    retries: attempt,
                });
            }
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                warn!("Inference attempt {} failed — {}", attempt + 1, e);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
