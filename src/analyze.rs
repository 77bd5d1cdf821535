//! Analysis entry points.
//!
//! [`Analyzer`] owns the Ollama client and the configuration and runs one
//! dashboard through the pipeline:
//!
//! ```text
//! objective check → validate upload → prepare image → instruction
//!                 → inference → cleanup → AnalysisOutput
//! ```
//!
//! The web server keeps a single `Analyzer` for its lifetime; the CLI builds
//! one per invocation. The free functions at the bottom wrap it for callers
//! that only want a result or a report file.

use crate::config::{AnalysisConfig, ReportConfig};
use crate::error::KpiLensError;
use crate::ollama::{ModelStatus, OllamaClient};
use crate::output::{AnalysisOutput, AnalysisStats};
use crate::pipeline::input::{self, DashboardUpload};
use crate::pipeline::{encode, llm, postprocess};
use crate::prompts::{build_instruction, DEFAULT_ANALYSIS_PROMPT};
use crate::report::{self, ReportRequest};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Runs dashboard analyses against one Ollama daemon.
#[derive(Debug, Clone)]
pub struct Analyzer {
    client: OllamaClient,
    config: AnalysisConfig,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Result<Self, KpiLensError> {
        let client = OllamaClient::new(&config.ollama_host, config.api_timeout_secs)?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn client(&self) -> &OllamaClient {
        &self.client
    }

    /// Is the configured model pulled on the daemon?
    pub async fn check_model(&self) -> ModelStatus {
        self.client.check_model(&self.config.model).await
    }

    /// Analyse one uploaded dashboard against `objective`.
    ///
    /// # Errors
    /// - [`KpiLensError::EmptyObjective`] for a blank objective
    /// - upload errors (type, size, signature, decode)
    /// - inference errors from the daemon, including a reply that is empty
    ///   once cleaned up
    pub async fn analyze(
        &self,
        upload: DashboardUpload,
        objective: &str,
    ) -> Result<AnalysisOutput, KpiLensError> {
        let total_start = Instant::now();

        // ── Step 1: Validate inputs ──────────────────────────────────────
        if objective.trim().is_empty() {
            return Err(KpiLensError::EmptyObjective);
        }
        let kind = input::validate_upload(&upload, self.config.max_upload_bytes)?;
        info!(
            "Analysing '{}' ({}, {} bytes) with {}",
            upload.filename,
            kind.label(),
            upload.bytes.len(),
            self.config.model
        );

        // ── Step 2: Prepare image ────────────────────────────────────────
        let encode_start = Instant::now();
        let (image, info) = encode::prepare(upload, kind, &self.config).await?;
        let encode_duration_ms = encode_start.elapsed().as_millis() as u64;
        debug!(
            "Prepared {}x{} {} -> {}x{} JPEG in {}ms",
            info.width, info.height, info.color_mode, image.width, image.height, encode_duration_ms
        );

        // ── Step 3: Inference ────────────────────────────────────────────
        let template = self
            .config
            .prompt_template
            .as_deref()
            .unwrap_or(DEFAULT_ANALYSIS_PROMPT);
        let instruction = build_instruction(template, objective);
        let inference = llm::run_inference(&self.client, &instruction, &image, &self.config).await?;

        // ── Step 4: Cleanup + stats ──────────────────────────────────────
        let analysis = postprocess::clean_analysis(&inference.content);
        if analysis.trim().is_empty() {
            return Err(KpiLensError::EmptyResponse {
                model: self.config.model.clone(),
            });
        }
        let stats = AnalysisStats {
            input_tokens: inference.input_tokens,
            output_tokens: inference.output_tokens,
            retries: inference.retries,
            encode_duration_ms,
            llm_duration_ms: inference.duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };
        info!(
            "Analysis complete: {} chars, {} output tokens, {}ms total",
            analysis.len(),
            stats.output_tokens,
            stats.total_duration_ms
        );

        Ok(AnalysisOutput {
            analysis,
            objective: objective.to_string(),
            model: self.config.model.clone(),
            image: info,
            stats,
        })
    }

    /// Analyse an image given as a local path or HTTP(S) URL.
    pub async fn analyze_input(
        &self,
        path_or_url: &str,
        objective: &str,
    ) -> Result<AnalysisOutput, KpiLensError> {
        let upload = input::resolve_input(path_or_url, self.config.download_timeout_secs).await?;
        self.analyze(upload, objective).await
    }
}

/// Synchronous wrapper around [`Analyzer::analyze_input`].
///
/// Creates a temporary tokio runtime internally; do not call from async code.
pub fn analyze_sync(
    path_or_url: &str,
    objective: &str,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, KpiLensError> {
    let analyzer = Analyzer::new(config.clone())?;
    tokio::runtime::Runtime::new()
        .map_err(|e| KpiLensError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyzer.analyze_input(path_or_url, objective))
}

/// Analyse an image and write the PDF report to `output_path`.
///
/// Uses atomic write (temp file + rename) so a failed run never leaves a
/// truncated PDF behind.
pub async fn analyze_to_report_file(
    path_or_url: &str,
    objective: &str,
    output_path: impl AsRef<Path>,
    config: &AnalysisConfig,
    report_config: &ReportConfig,
) -> Result<AnalysisOutput, KpiLensError> {
    let analyzer = Analyzer::new(config.clone())?;
    let output = analyzer.analyze_input(path_or_url, objective).await?;
    let pdf = report::render_report(&ReportRequest::from(&output), report_config).await?;
    write_atomic(output_path.as_ref(), &pdf).await?;
    Ok(output)
}

/// Write `bytes` next to `path` under a `.tmp` name, then rename into place.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), KpiLensError> {
    let write_err = |e| KpiLensError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
