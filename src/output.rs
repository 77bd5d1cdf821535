//! Result types produced by an analysis.

use serde::{Deserialize, Serialize};

/// Facts about the uploaded image, shown next to the preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    /// Name the file was uploaded with.
    pub filename: String,
    /// Detected container format (`PNG` or `JPEG`).
    pub format: String,
    pub width: u32,
    pub height: u32,
    /// Colour mode of the original upload (`RGB`, `RGBA`, `L`, …).
    pub color_mode: String,
    /// Upload size in bytes.
    pub size_bytes: usize,
}

/// Timing and token accounting for one analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Retries spent on the inference call.
    pub retries: u32,
    pub encode_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything the UI needs to display an analysis and request its report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutput {
    /// Cleaned analysis text (Markdown as written by the model).
    pub analysis: String,
    /// The objective exactly as submitted.
    pub objective: String,
    /// Model tag that produced the analysis.
    pub model: String,
    pub image: ImageInfo,
    pub stats: AnalysisStats,
}

impl AnalysisOutput {
    /// Suggested download name for this analysis' PDF report.
    pub fn report_filename(&self) -> String {
        crate::report::report_filename(Some(&self.image.filename))
    }
}
