//! Configuration types for dashboard analysis and report generation.
//!
//! Analysis behaviour is controlled through [`AnalysisConfig`], built via its
//! [`AnalysisConfigBuilder`]; report look-and-feel through [`ReportConfig`].
//! Both are plain data, cheap to clone and safe to share across handler
//! tasks behind an `Arc`.

use crate::error::KpiLensError;
use crate::prompts::OBJECTIVE_PLACEHOLDER;
use serde::{Deserialize, Serialize};

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Default vision model.
pub const DEFAULT_MODEL: &str = "qwen2.5vl:7b";

/// Configuration for a dashboard analysis.
///
/// Built via [`AnalysisConfig::builder()`] or using
/// [`AnalysisConfig::default()`].
///
/// # Example
/// ```rust
/// use kpi_lens::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .ollama_host("http://127.0.0.1:11434")
///     .model("llava:13b")
///     .max_retries(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.model, "llava:13b");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Base URL of the Ollama daemon. Default: `http://localhost:11434`.
    ///
    /// A bare `host:port` (as `OLLAMA_HOST` is often set) gets `http://`
    /// prepended by the builder.
    pub ollama_host: String,

    /// Ollama model tag. Must be a vision-capable model. Default: `qwen2.5vl:7b`.
    pub model: String,

    /// Sampling temperature. Range 0.0–2.0. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the model may generate (`num_predict`). Default: 2048.
    pub max_tokens: usize,

    /// Retry attempts on a transient inference failure. Default: 0.
    ///
    /// Only transport errors, timeouts and 5xx answers are retried; see
    /// [`KpiLensError::is_retryable`].
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-inference HTTP timeout in seconds. Default: 300.
    ///
    /// Local vision models on CPU routinely need a minute or more per image.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs (CLI only) in seconds. Default: 60.
    pub download_timeout_secs: u64,

    /// Largest accepted upload in bytes. Default: 20 MiB.
    pub max_upload_bytes: usize,

    /// Longest edge of the image sent to the model, in pixels. Default: 2048.
    ///
    /// Larger uploads are downscaled with their aspect ratio preserved.
    pub max_image_dimension: u32,

    /// JPEG quality used for the transport encoding (1–100). Default: 90.
    pub jpeg_quality: u8,

    /// Custom prompt template. Must contain `{objective}`. If None, uses
    /// [`crate::prompts::DEFAULT_ANALYSIS_PROMPT`].
    pub prompt_template: Option<String>,

    /// Number of analyses the server runs at the same time. Default: 1.
    ///
    /// A single local daemon processes requests one by one anyway; extra
    /// requests wait for a free slot instead of piling up inside Ollama.
    pub concurrency: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            max_tokens: 2048,
            max_retries: 0,
            retry_backoff_ms: 500,
            api_timeout_secs: 300,
            download_timeout_secs: 60,
            max_upload_bytes: 20 * 1024 * 1024,
            max_image_dimension: 2048,
            jpeg_quality: 90,
            prompt_template: None,
            concurrency: 1,
        }
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn ollama_host(mut self, host: impl Into<String>) -> Self {
        self.config.ollama_host = normalize_host(&host.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn max_image_dimension(mut self, px: u32) -> Self {
        self.config.max_image_dimension = px.max(64);
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn prompt_template(mut self, template: impl Into<String>) -> Self {
        self.config.prompt_template = Some(template.into());
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, KpiLensError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(KpiLensError::InvalidConfig("Model name must not be empty".into()));
        }
        if reqwest::Url::parse(&c.ollama_host).is_err() {
            return Err(KpiLensError::InvalidConfig(format!(
                "Ollama host '{}' is not a valid URL",
                c.ollama_host
            )));
        }
        if c.max_tokens == 0 {
            return Err(KpiLensError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(KpiLensError::InvalidConfig("API timeout must be ≥ 1s".into()));
        }
        if c.max_upload_bytes == 0 {
            return Err(KpiLensError::InvalidConfig("Upload limit must be ≥ 1 byte".into()));
        }
        if let Some(ref t) = c.prompt_template {
            if !t.contains(OBJECTIVE_PLACEHOLDER) {
                return Err(KpiLensError::InvalidConfig(format!(
                    "Prompt template must contain the {} placeholder",
                    OBJECTIVE_PLACEHOLDER
                )));
            }
        }
        Ok(self.config)
    }
}

/// Prepend `http://` to a bare `host:port` and drop trailing slashes.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}

// ── Report branding ──────────────────────────────────────────────────────

/// An sRGB colour given as 0–255 components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandColor(pub u8, pub u8, pub u8);

impl BrandColor {
    /// `#RRGGBB` form for style sheets.
    pub fn to_css(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }

    /// Components scaled to 0.0–1.0.
    pub fn to_unit(self) -> (f32, f32, f32) {
        (
            self.0 as f32 / 255.0,
            self.1 as f32 / 255.0,
            self.2 as f32 / 255.0,
        )
    }
}

/// Text and colours stamped onto every generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Large wordmark in the page header.
    pub brand_name: String,
    /// Line under the wordmark.
    pub subtitle: String,
    /// Centred document title on the first page.
    pub title: String,
    /// Footer line; `{model}` is replaced with the model tag.
    pub footer: String,
    /// Headings, wordmark and thin accent bar.
    pub primary: BrandColor,
    /// Sub-headings, subtitle, rules and borders.
    pub accent: BrandColor,
    /// Body text.
    pub text: BrandColor,
    /// Page numbers and footer.
    pub muted: BrandColor,
    /// Header band and objective box background.
    pub background: BrandColor,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            brand_name: "I-SCORE".to_string(),
            subtitle: "KPI Dashboard Analysis Report".to_string(),
            title: "I-SCORE KPI Dashboard Analysis Report".to_string(),
            footer: "Generated by I-Score KPI Dashboard Analyzer | Powered by Ollama {model}"
                .to_string(),
            primary: BrandColor(0x4F, 0x3C, 0x8F),
            accent: BrandColor(0x45, 0xBC, 0xC3),
            text: BrandColor(0x4B, 0x49, 0x47),
            muted: BrandColor(0x49, 0x50, 0x57),
            background: BrandColor(0xF8, 0xF9, 0xFA),
        }
    }
}

impl ReportConfig {
    /// Footer text with the model tag filled in.
    pub fn footer_for(&self, model: Option<&str>) -> String {
        let model = model.unwrap_or(DEFAULT_MODEL);
        self.footer.replace("{model}", model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build() {
        let config = AnalysisConfig::builder().build().expect("defaults are valid");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.ollama_host, DEFAULT_OLLAMA_HOST);
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.concurrency, 1);
    }

    #[test]
    fn bare_host_gets_scheme() {
        let config = AnalysisConfig::builder()
            .ollama_host("127.0.0.1:11434/")
            .build()
            .unwrap();
        assert_eq!(config.ollama_host, "http://127.0.0.1:11434");
    }

    #[test]
    fn clamps_out_of_range_values() {
        let config = AnalysisConfig::builder()
            .temperature(9.0)
            .jpeg_quality(0)
            .concurrency(0)
            .max_image_dimension(1)
            .build()
            .unwrap();
        assert_eq!(config.temperature, 2.0);
        assert_eq!(config.jpeg_quality, 1);
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.max_image_dimension, 64);
    }

    #[test]
    fn rejects_template_without_placeholder() {
        let err = AnalysisConfig::builder()
            .prompt_template("Describe this dashboard.")
            .build()
            .unwrap_err();
        assert!(matches!(err, KpiLensError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_empty_model() {
        assert!(AnalysisConfig::builder().model("  ").build().is_err());
    }

    #[test]
    fn brand_color_forms() {
        assert_eq!(BrandColor(0x4F, 0x3C, 0x8F).to_css(), "#4F3C8F");
        let (r, _, _) = BrandColor(255, 0, 0).to_unit();
        assert!((r - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn footer_substitutes_model() {
        let report = ReportConfig::default();
        assert!(report.footer_for(Some("llava")).ends_with("Ollama llava"));
        assert!(report.footer_for(None).contains(DEFAULT_MODEL));
    }
}
