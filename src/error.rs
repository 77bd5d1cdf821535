//! Error type for the kpi-lens library.
//!
//! Every failure in the pipeline is fatal for the request that hit it: the
//! user sees a message and retries by hand. [`KpiLensError`] therefore
//! carries the user-facing wording directly in its `Display` impl so the web
//! UI and the CLI can surface it without further formatting.
//!
//! Variants are grouped by the stage that produces them. The server maps each
//! group onto an HTTP status (see [`KpiLensError::is_client_error`]) and the
//! inference stage uses [`KpiLensError::is_retryable`] to decide whether a
//! bounded retry is worthwhile.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the kpi-lens library.
#[derive(Debug, Error)]
pub enum KpiLensError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Any other failure reading a local file (a directory, an I/O fault).
    #[error("Failed to read '{path}': {source}")]
    FileReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The uploaded file has an extension other than png / jpg / jpeg.
    #[error("Unsupported file type '{filename}'. Please upload a PNG, JPG, or JPEG image.")]
    UnsupportedImageType { filename: String },

    /// The upload was empty.
    #[error("The uploaded file '{filename}' is empty.")]
    EmptyImage { filename: String },

    /// The upload exceeds the configured size limit.
    #[error("The uploaded file is {size} bytes; the limit is {limit} bytes.")]
    UploadTooLarge { size: usize, limit: usize },

    /// The bytes could not be decoded as an image of the expected kind.
    #[error("Error processing image '{filename}': {detail}")]
    ImageDecodeFailed { filename: String, detail: String },

    /// The business objective is missing or whitespace only.
    #[error("Please enter the dashboard objective to proceed with analysis.")]
    EmptyObjective,

    /// A required form field was not present in the request.
    #[error("Missing form field '{field}'")]
    MissingField { field: &'static str },

    // ── Inference-service errors ──────────────────────────────────────────
    /// The Ollama daemon could not be reached at all.
    #[error("Could not reach the inference service at {host}: {reason}\nIs `ollama serve` running?")]
    ServiceUnreachable { host: String, reason: String },

    /// The daemon is up but the model is not pulled.
    #[error("Model '{model}' not found. Please pull it using: `ollama pull {model}`")]
    ModelNotFound { model: String },

    /// The inference call exceeded `api_timeout_secs`.
    #[error("Inference timed out after {secs}s")]
    InferenceTimeout { secs: u64 },

    /// The daemon answered with a non-success status.
    #[error("An error occurred during inference (HTTP {status}): {message}")]
    InferenceFailed { status: u16, message: String },

    /// The model answered, but with nothing.
    #[error("The model '{model}' returned an empty analysis")]
    EmptyResponse { model: String },

    // ── Report errors ─────────────────────────────────────────────────────
    /// The report request itself is unusable (e.g. no analysis text).
    #[error("Cannot build report: {0}")]
    InvalidReport(String),

    /// The PDF writer failed.
    #[error("Failed to generate PDF report: {0}")]
    ReportFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl KpiLensError {
    /// Whether retrying the same inference call may succeed.
    ///
    /// Only transport failures and server-side (5xx) errors qualify; a
    /// missing model or a bad upload will fail identically every time.
    pub fn is_retryable(&self) -> bool {
        match self {
            KpiLensError::ServiceUnreachable { .. } | KpiLensError::InferenceTimeout { .. } => true,
            KpiLensError::InferenceFailed { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether the error was caused by what the user submitted.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            KpiLensError::UnsupportedImageType { .. }
                | KpiLensError::EmptyImage { .. }
                | KpiLensError::UploadTooLarge { .. }
                | KpiLensError::ImageDecodeFailed { .. }
                | KpiLensError::EmptyObjective
                | KpiLensError::MissingField { .. }
                | KpiLensError::InvalidReport(_)
                | KpiLensError::FileNotFound { .. }
                | KpiLensError::PermissionDenied { .. }
                | KpiLensError::FileReadFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_not_found_mentions_pull_command() {
        let e = KpiLensError::ModelNotFound {
            model: "qwen2.5vl:7b".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("ollama pull qwen2.5vl:7b"), "got: {msg}");
    }

    #[test]
    fn unsupported_type_display() {
        let e = KpiLensError::UnsupportedImageType {
            filename: "chart.gif".into(),
        };
        assert!(e.to_string().contains("chart.gif"));
        assert!(e.to_string().contains("PNG, JPG, or JPEG"));
    }

    #[test]
    fn retryable_classification() {
        assert!(KpiLensError::InferenceTimeout { secs: 5 }.is_retryable());
        assert!(KpiLensError::ServiceUnreachable {
            host: "http://localhost:11434".into(),
            reason: "connection refused".into(),
        }
        .is_retryable());
        assert!(KpiLensError::InferenceFailed {
            status: 503,
            message: "busy".into(),
        }
        .is_retryable());
        assert!(!KpiLensError::InferenceFailed {
            status: 400,
            message: "bad request".into(),
        }
        .is_retryable());
        assert!(!KpiLensError::ModelNotFound { model: "x".into() }.is_retryable());
        assert!(!KpiLensError::EmptyObjective.is_retryable());
    }

    #[test]
    fn client_errors_are_input_problems() {
        assert!(KpiLensError::EmptyObjective.is_client_error());
        assert!(KpiLensError::UploadTooLarge { size: 10, limit: 5 }.is_client_error());
        assert!(!KpiLensError::ModelNotFound { model: "x".into() }.is_client_error());
        assert!(!KpiLensError::Internal("boom".into()).is_client_error());
    }
}
