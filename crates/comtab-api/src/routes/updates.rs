//! Update job endpoints.
//!
//! The dashboard submits both spreadsheets in one multipart request, gets a
//! job id back immediately, polls the status document, and downloads the
//! delta once the job succeeds. The pipeline itself runs on the tokio
//! runtime; AI or filesystem hiccups land in the job record, never in the
//! submit response.

use std::path::Path as FsPath;
use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use comtab_banks::UpdateJob;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::{AppState, JobRecord, JobStatus};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/updates", post(submit_update))
        .route("/v1/updates/:id", get(get_update))
        .route("/v1/updates/:id/download", get(download_update))
}

/// Response to a job submission.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
}

/// Job status document returned to the polling dashboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub institution: String,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// The pipeline report, present once the job succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub report: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The three multipart parts of a submission.
struct SubmitParts {
    institution: String,
    bank_file: Vec<u8>,
    internal_file: Vec<u8>,
}

async fn collect_parts(mut multipart: Multipart) -> Result<SubmitParts, AppError> {
    let mut institution = None;
    let mut bank_file = None;
    let mut internal_file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("failed to read part '{name}': {e}")))?;
        match name.as_str() {
            "institution" => {
                institution = Some(String::from_utf8_lossy(&data).trim().to_string())
            }
            "bank_file" => bank_file = Some(data.to_vec()),
            "internal_file" => internal_file = Some(data.to_vec()),
            // unknown parts are ignored so the form can grow
            _ => {}
        }
    }

    Ok(SubmitParts {
        institution: institution
            .filter(|i| !i.is_empty())
            .unwrap_or_else(|| "HOPE".to_string()),
        bank_file: bank_file
            .ok_or_else(|| AppError::Validation("missing multipart part 'bank_file'".into()))?,
        internal_file: internal_file.ok_or_else(|| {
            AppError::Validation("missing multipart part 'internal_file'".into())
        })?,
    })
}

async fn save_upload(path: &FsPath, data: &[u8]) -> Result<(), AppError> {
    tokio::fs::write(path, data)
        .await
        .map_err(|e| AppError::Internal(format!("saving upload {}: {e}", path.display())))
}

/// POST /v1/updates — submit a commissioning update job.
///
/// Accepts `institution` (text, defaults to HOPE), `bank_file` and
/// `internal_file` (both `.xlsx`). Returns 202 with the job id; the
/// pipeline runs asynchronously.
#[utoipa::path(
    post,
    path = "/v1/updates",
    request_body(content = Vec<u8>, content_type = "multipart/form-data"),
    responses(
        (status = 202, description = "Job accepted", body = SubmitResponse),
        (status = 422, description = "Missing part or unsupported institution", body = crate::error::ErrorBody),
    ),
    tag = "updates"
)]
async fn submit_update(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let parts = collect_parts(multipart).await?;
    if !comtab_banks::is_supported(&parts.institution) {
        return Err(AppError::Validation(format!(
            "unsupported institution '{}'; supported: {}",
            parts.institution,
            comtab_banks::supported_institutions().join(", ")
        )));
    }

    let id = Uuid::new_v4();
    let job_dir = state.config.data_dir.join("jobs").join(id.to_string());
    tokio::fs::create_dir_all(&job_dir)
        .await
        .map_err(|e| AppError::Internal(format!("creating job dir: {e}")))?;

    let bank_path = job_dir.join("banco.xlsx");
    let internal_path = job_dir.join("interno.xlsx");
    let output_path = job_dir.join("atualizacao.xlsx");
    save_upload(&bank_path, &parts.bank_file).await?;
    save_upload(&internal_path, &parts.internal_file).await?;

    let institution = parts.institution.trim().to_uppercase();
    state.jobs.insert(JobRecord {
        id,
        institution: institution.clone(),
        status: JobStatus::Queued,
        submitted_at: Utc::now(),
        finished_at: None,
        report: None,
        error: None,
        output_path: output_path.clone(),
    });
    tracing::info!(job_id = %id, %institution, "update job queued");

    let job = UpdateJob {
        institution,
        bank_path,
        internal_path,
        output_path,
        dictionary_path: state.config.dictionary_path.clone(),
        suggestion_log_path: state.config.suggestion_log_path.clone(),
        engine: Arc::clone(&state.engine),
    };
    let jobs = state.jobs.clone();
    let pipeline_lock = Arc::clone(&state.pipeline_lock);
    tokio::spawn(async move {
        // one run at a time: the dictionary and suggestion log are shared
        let _guard = pipeline_lock.lock().await;
        jobs.mark_running(&id);
        match comtab_banks::run_update(job).await {
            Ok(report) => {
                tracing::info!(job_id = %id, rows = report.output_rows, "update job succeeded");
                jobs.mark_succeeded(&id, report);
            }
            Err(e) => {
                tracing::error!(job_id = %id, error = %e, "update job failed");
                jobs.mark_failed(&id, e.to_string());
            }
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            job_id: id,
            status: JobStatus::Queued,
        }),
    ))
}

/// GET /v1/updates/:id — job status for the poll loop.
#[utoipa::path(
    get,
    path = "/v1/updates/{id}",
    params(("id" = Uuid, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Job status", body = JobStatusResponse),
        (status = 404, description = "Unknown job", body = crate::error::ErrorBody),
    ),
    tag = "updates"
)]
async fn get_update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobStatusResponse>, AppError> {
    let job = state
        .jobs
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("job {id} not found")))?;

    let report = match &job.report {
        Some(r) => Some(
            serde_json::to_value(r)
                .map_err(|e| AppError::Internal(format!("serializing report: {e}")))?,
        ),
        None => None,
    };
    let download_url = (job.status == JobStatus::Succeeded)
        .then(|| format!("/v1/updates/{id}/download"));

    Ok(Json(JobStatusResponse {
        job_id: job.id,
        institution: job.institution,
        status: job.status,
        submitted_at: job.submitted_at,
        finished_at: job.finished_at,
        report,
        download_url,
        error: job.error,
    }))
}

/// GET /v1/updates/:id/download — the generated delta spreadsheet.
///
/// 404 until the job succeeds; the file stays available for the lifetime
/// of the process.
#[utoipa::path(
    get,
    path = "/v1/updates/{id}/download",
    params(("id" = Uuid, Path, description = "Job ID")),
    responses(
        (status = 200, description = "Delta spreadsheet (.xlsx)"),
        (status = 404, description = "Unknown job or not finished", body = crate::error::ErrorBody),
    ),
    tag = "updates"
)]
async fn download_update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let job = state
        .jobs
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("job {id} not found")))?;
    if job.status != JobStatus::Succeeded {
        return Err(AppError::NotFound(format!(
            "job {id} has no result yet (status: {})",
            job.status.as_str()
        )));
    }

    let bytes = tokio::fs::read(&job.output_path)
        .await
        .map_err(|e| AppError::Internal(format!("reading delta spreadsheet: {e}")))?;
    let filename = format!("atualizacao-{id}.xlsx");
    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    ))
}
