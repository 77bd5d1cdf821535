//! Web UI: one HTML page plus a small JSON API.
//!
//! ```text
//! GET  /                 the page
//! GET  /api/health       daemon + model status
//! GET  /api/objectives   example objectives
//! POST /api/analyze      multipart { image, objective } → AnalysisOutput
//! POST /api/report       ReportRequest → application/pdf attachment
//! ```
//!
//! Analyses hold a permit from a semaphore sized by
//! [`AnalysisConfig::concurrency`](crate::config::AnalysisConfig::concurrency)
//! for the whole pipeline run. Extra requests queue on the permit rather
//! than inside the daemon.

pub mod error;
pub mod page;

use crate::analyze::Analyzer;
use crate::config::ReportConfig;
use crate::error::KpiLensError;
use crate::ollama::ModelStatus;
use crate::output::AnalysisOutput;
use crate::pipeline::input::DashboardUpload;
use crate::prompts::{ExampleObjective, EXAMPLE_OBJECTIVES};
use crate::report::{self, ReportRequest};
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use error::ApiError;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// Multipart framing allowance on top of the image size limit.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// State shared by all routes.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
    pub report_config: Arc<ReportConfig>,
    slots: Arc<Semaphore>,
    index: Arc<str>,
}

impl AppState {
    pub fn new(analyzer: Analyzer, report_config: ReportConfig) -> Self {
        let permits = analyzer.config().concurrency.max(1);
        let index = page::render_index(&report_config, &analyzer.config().model);
        Self {
            analyzer: Arc::new(analyzer),
            report_config: Arc::new(report_config),
            slots: Arc::new(Semaphore::new(permits)),
            index: index.into(),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.analyzer.config().max_upload_bytes + MULTIPART_OVERHEAD;
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
        .route("/api/objectives", get(objectives))
        .route("/api/analyze", post(analyze))
        .route("/api/report", post(download_report))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(state.index.to_string())
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    model: String,
    model_status: ModelStatus,
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    let model_status = state.analyzer.check_model().await;
    let status = match model_status {
        ModelStatus::Available => "ok",
        _ => "degraded",
    };
    Json(Health {
        status,
        model: state.analyzer.config().model.clone(),
        model_status,
    })
}

async fn objectives() -> Json<&'static [ExampleObjective]> {
    Json(EXAMPLE_OBJECTIVES)
}

/// POST /api/analyze — multipart form with `image` (file) and `objective`.
async fn analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisOutput>, ApiError> {
    let mut upload: Option<DashboardUpload> = None;
    let mut objective: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("image") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                debug!("Received image '{}' ({} bytes)", filename, bytes.len());
                upload = Some(DashboardUpload::new(filename, bytes.to_vec()));
            }
            Some("objective") => {
                objective = Some(field.text().await.map_err(multipart_error)?);
            }
            other => debug!("Ignoring form field {:?}", other),
        }
    }

    let upload = upload.ok_or(KpiLensError::MissingField { field: "image" })?;
    let objective = objective.ok_or(KpiLensError::MissingField { field: "objective" })?;
    if objective.trim().is_empty() {
        return Err(KpiLensError::EmptyObjective.into());
    }

    let _permit = state
        .slots
        .acquire()
        .await
        .map_err(|e| KpiLensError::Internal(format!("analysis slots closed: {}", e)))?;

    let output = state.analyzer.analyze(upload, &objective).await?;
    Ok(Json(output))
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError {
        status: e.status(),
        message: e.body_text(),
    }
}

/// POST /api/report — render the PDF for an analysis shown in the page.
async fn download_report(
    State(state): State<AppState>,
    payload: Result<Json<ReportRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let filename = report::report_filename(request.filename.as_deref());

    let pdf = report::render_report(&request, &state.report_config).await?;
    info!("Serving report '{}' ({} bytes)", filename, pdf.len());

    let disposition = format!("attachment; filename=\"{}\"", filename);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf,
    )
        .into_response())
}
