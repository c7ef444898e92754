//! OpenAPI spec assembly, served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "comtab API — commissioning table updater",
        description = "Compares a bank's product report against the internal commissioning table and produces the delta spreadsheet.\n\nProvides:\n- **Update jobs**: multipart submission of the two spreadsheets, async processing, status polling, delta download\n- **Standard promotion**: feed a reviewed suggestion CSV back into the standardization dictionary\n\nHealth probes (`/health/*`), `/metrics` and this document are unauthenticated.",
        license(name = "Apache-2.0")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        crate::routes::updates::submit_update,
        crate::routes::updates::get_update,
        crate::routes::updates::download_update,
        crate::routes::standards::promote_standards,
    ),
    components(schemas(
        crate::routes::updates::SubmitResponse,
        crate::routes::updates::JobStatusResponse,
        crate::routes::standards::PromoteResponse,
        crate::state::JobStatus,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "updates", description = "Commissioning update jobs"),
        (name = "standards", description = "Standardization dictionary maintenance"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(serve_openapi))
}

async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
