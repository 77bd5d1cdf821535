//! # kpi-lens
//!
//! Analyse KPI dashboard screenshots with a local vision model and export
//! the result as a branded PDF report.
//!
//! ## Why this crate?
//!
//! Dashboards are built to be looked at, not parsed. Instead of scraping the
//! BI tool behind them, this crate hands the rendered image to a vision model
//! served by [Ollama](https://ollama.com) together with the business
//! objective the dashboard exists for, and asks for a structured analyst
//! write-up: summary, KPI analysis, insights and recommendations.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PNG / JPEG + objective
//!  │
//!  ├─ 1. Input    validate type, size and signature (or load path / URL)
//!  ├─ 2. Encode   decode, flatten to RGB, cap size, JPEG → base64 (spawn_blocking)
//!  ├─ 3. VLM      one /api/chat call to the local Ollama daemon
//!  ├─ 4. Polish   deterministic cleanup of the answer
//!  └─ 5. Report   optional branded PDF (spawn_blocking)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kpi_lens::{AnalysisConfig, Analyzer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let analyzer = Analyzer::new(AnalysisConfig::default())?;
//!     let output = analyzer
//!         .analyze_input("hr_dashboard.png", "Monitor headcount by department")
//!         .await?;
//!     println!("{}", output.analysis);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `kpi-lens` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! The web server lives in the library ([`server`]) so it can be embedded
//! or tested without the binary.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod ollama;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod report;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze_sync, analyze_to_report_file, Analyzer};
pub use config::{AnalysisConfig, AnalysisConfigBuilder, BrandColor, ReportConfig};
pub use error::KpiLensError;
pub use ollama::{ModelStatus, OllamaClient};
pub use output::{AnalysisOutput, AnalysisStats, ImageInfo};
pub use pipeline::input::DashboardUpload;
pub use report::{render_report, report_filename, ReportRequest};
