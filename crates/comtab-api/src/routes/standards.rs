//! Dictionary promotion endpoint.
//!
//! The reviewer downloads the suggestion CSV, fills in the status column,
//! and posts the file back here. Approved and corrected rows enter the
//! dictionary; the save is atomic, so a failed promotion never leaves a
//! half-written dictionary behind.

use axum::extract::{Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use comtab_standard::{promote, Dictionary, PromotionReport};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/standards/promote", post(promote_standards))
}

/// What a promotion run did, plus the resulting dictionary size.
#[derive(Debug, Serialize, ToSchema)]
pub struct PromoteResponse {
    pub approved: usize,
    pub corrected: usize,
    pub skipped: usize,
    pub dictionary_entries: usize,
}

impl PromoteResponse {
    fn new(report: PromotionReport, dictionary_entries: usize) -> Self {
        Self {
            approved: report.approved,
            corrected: report.corrected,
            skipped: report.skipped,
            dictionary_entries,
        }
    }
}

/// POST /v1/standards/promote — apply a reviewed suggestion CSV.
#[utoipa::path(
    post,
    path = "/v1/standards/promote",
    request_body(content = Vec<u8>, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Promotion applied", body = PromoteResponse),
        (status = 422, description = "Missing or unreadable CSV", body = crate::error::ErrorBody),
    ),
    tag = "standards"
)]
async fn promote_standards(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PromoteResponse>, AppError> {
    let mut corrected_file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "corrected_file" {
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("failed to read part '{name}': {e}")))?;
            corrected_file = Some(data.to_vec());
        }
    }
    let data = corrected_file
        .ok_or_else(|| AppError::Validation("missing multipart part 'corrected_file'".into()))?;

    // The review CSV lands next to the job uploads so a bad promotion can
    // be inspected afterwards.
    let dir = state.config.data_dir.join("promotions");
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| AppError::Internal(format!("creating promotions dir: {e}")))?;
    let path = dir.join(format!("{}.csv", Uuid::new_v4()));
    tokio::fs::write(&path, &data)
        .await
        .map_err(|e| AppError::Internal(format!("saving review CSV: {e}")))?;

    let mut dict = Dictionary::load(&state.config.dictionary_path)
        .map_err(|e| AppError::Internal(format!("loading dictionary: {e}")))?;
    let report =
        promote(&path, &mut dict).map_err(|e| AppError::Validation(e.to_string()))?;
    dict.save(&state.config.dictionary_path)
        .map_err(|e| AppError::Internal(format!("saving dictionary: {e}")))?;

    tracing::info!(
        approved = report.approved,
        corrected = report.corrected,
        skipped = report.skipped,
        entries = dict.len(),
        "promotion applied via API"
    );
    Ok(Json(PromoteResponse::new(report, dict.len())))
}
