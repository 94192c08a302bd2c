// Thu Oct 15 2026 - Alex

use crate::catalog::SignatureDef;
use crate::engine::{AnalysisError, CancelToken, ServiceError};
use crate::history::AnalysisRecord;
use crate::image::ValidationError;
use crate::output::report::REPORT_FILENAME;
use crate::output::AnalysisResult;
use crate::server::AppState;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

pub const API_NAME: &str = "Discord Voice Node Offset Finder API";
const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub analysis_id: Uuid,
    #[serde(flatten)]
    pub result: AnalysisResult,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            message: message.into(),
        }),
    )
}

fn multipart_error(e: MultipartError) -> ApiError {
    let status = e.status();
    let error = if status == StatusCode::PAYLOAD_TOO_LARGE { "file_too_large" } else { "multipart_error" };
    api_error(status, error, format!("Failed to read upload: {}", e.body_text()))
}

fn validation_error(e: &ValidationError) -> ApiError {
    match e {
        ValidationError::MissingFile => api_error(StatusCode::BAD_REQUEST, "missing_file", e.to_string()),
        ValidationError::BadExtension { .. } => api_error(StatusCode::BAD_REQUEST, "invalid_file_type", e.to_string()),
        ValidationError::Oversize { .. } => api_error(StatusCode::PAYLOAD_TOO_LARGE, "file_too_large", e.to_string()),
    }
}

fn service_error(e: ServiceError) -> ApiError {
    match &e {
        ServiceError::Validation(v) => validation_error(v),
        ServiceError::Analysis(AnalysisError::Cancelled) => {
            api_error(StatusCode::GATEWAY_TIMEOUT, "analysis_timeout", "Analysis did not finish in time")
        }
        ServiceError::Analysis(_) => {
            log::error!("Analysis failed: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "analysis_error", format!("Error analyzing file: {}", e))
        }
        ServiceError::History(_) => {
            log::error!("Failed to record analysis: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "history_error", e.to_string())
        }
    }
}

// GET /api/
pub async fn root(State(state): State<AppState>) -> Json<serde_json::Value> {
    let catalog = state.service.engine().catalog();
    Json(json!({
        "message": API_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "catalog": catalog.version(),
        "signatures": catalog.count(),
    }))
}

// POST /api/analyze - multipart upload of a .node module
pub async fn analyze(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    // A request that is not multipart at all carries no file either.
    let mut multipart = multipart.map_err(|rejection| {
        log::warn!("Rejected non-multipart upload: {}", rejection.body_text());
        validation_error(&ValidationError::MissingFile)
    })?;

    let mut upload: Option<(Option<String>, Bytes)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_error)?;
        upload = Some((filename, data));
        break;
    }

    let Some((filename, data)) = upload else {
        return Err(validation_error(&ValidationError::MissingFile));
    };

    // Reject before handing anything to a worker thread.
    state.service
        .validate(filename.as_deref(), data.len())
        .map_err(|e| {
            log::warn!("Rejected upload {:?}: {}", filename, e);
            validation_error(&e)
        })?;

    log::info!("Analyzing {} ({} bytes)", filename.as_deref().unwrap_or("?"), data.len());

    let cancel = CancelToken::new();
    let service = state.service.clone();
    let task_cancel = cancel.clone();
    let mut task = tokio::task::spawn_blocking(move || service.submit(filename.as_deref(), data, &task_cancel));

    let joined = match tokio::time::timeout(state.timeout, &mut task).await {
        Ok(joined) => joined,
        Err(_) if cancel.cancel() => {
            log::warn!("Analysis exceeded {:?}, cancelled", state.timeout);
            return Err(service_error(ServiceError::Analysis(AnalysisError::Cancelled)));
        }
        // The analysis committed first; its result is already being recorded.
        Err(_) => task.await,
    };

    let outcome = joined
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, "analysis_error", format!("Analysis task failed: {}", e)))?
        .map_err(service_error)?;

    Ok(Json(AnalyzeResponse {
        analysis_id: outcome.record_id,
        result: outcome.result,
    }))
}

// GET /api/download-results - latest report as offset.txt
pub async fn download_results(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let Some(report) = state.service.latest_report() else {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            "not_found",
            "No analysis results available. Please analyze a file first.",
        ));
    };

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", REPORT_FILENAME),
            ),
        ],
        report.text,
    ))
}

// GET /api/analysis-history - newest first
pub async fn analysis_history(State(state): State<AppState>) -> Json<Vec<AnalysisRecord>> {
    Json(state.service.history().list())
}

// GET /api/signatures - the loaded catalog
pub async fn signatures(State(state): State<AppState>) -> Json<Vec<SignatureDef>> {
    let catalog = state.service.engine().catalog();
    Json(catalog.all_signatures().iter().map(SignatureDef::from).collect())
}
