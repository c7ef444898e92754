//! HTTP service for the commissioning table updater.
//!
//! Route map:
//!
//! | Method | Path                        | Purpose                              |
//! |--------|-----------------------------|--------------------------------------|
//! | POST   | /v1/updates                 | submit an update job (multipart)     |
//! | GET    | /v1/updates/:id             | job status for the dashboard poll    |
//! | GET    | /v1/updates/:id/download    | generated delta spreadsheet          |
//! | POST   | /v1/standards/promote       | apply a reviewed suggestion CSV      |
//! | GET    | /health/liveness            | process is up                        |
//! | GET    | /health/readiness           | data dir writable, dictionary loads  |
//! | GET    | /metrics                    | Prometheus text format               |
//! | GET    | /openapi.json               | OpenAPI 3 document                   |

use std::collections::HashMap;

use axum::extract::{DefaultBodyLimit, Extension, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::Router;
use comtab_standard::Dictionary;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use middleware::metrics::ApiMetrics;
use state::AppState;

/// Whether to register the metrics middleware and `/metrics` endpoint.
/// Enabled unless `COMTAB_METRICS_ENABLED=false`.
fn metrics_enabled() -> bool {
    std::env::var("COMTAB_METRICS_ENABLED")
        .map(|v| v.to_lowercase() != "false")
        .unwrap_or(true)
}

/// Assemble the full application router.
///
/// Health probes, `/metrics` and `/openapi.json` sit next to the `/v1`
/// routes; there is no auth layer, the service runs on the office network.
///
/// Body size limit: 25 MiB, sized for the two spreadsheet uploads in one
/// multipart request.
pub fn app(state: AppState) -> Router {
    let metrics = ApiMetrics::new();
    let metrics_on = metrics_enabled();

    let mut api = Router::new()
        .merge(routes::updates::router())
        .merge(routes::standards::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(25 * 1024 * 1024));

    if metrics_on {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(metrics.clone()));
    }

    let api = api
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let mut unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    if metrics_on {
        unauthenticated = unauthenticated
            .route("/metrics", axum::routing::get(prometheus_metrics))
            .layer(Extension(metrics));
    }

    let unauthenticated = unauthenticated.with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// Liveness probe, 200 whenever the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe.
///
/// Checks the data directory is writable (uploads and deltas land there)
/// and the dictionary file is readable. Returns 200 "ready" or 503 with a
/// diagnostic message.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Err(e) = std::fs::create_dir_all(&state.config.data_dir) {
        tracing::warn!(error = %e, "readiness: data dir unavailable");
        return (StatusCode::SERVICE_UNAVAILABLE, "data dir unavailable").into_response();
    }
    let probe = state.config.data_dir.join(".readiness");
    if let Err(e) = std::fs::write(&probe, b"ok") {
        tracing::warn!(error = %e, "readiness: data dir not writable");
        return (StatusCode::SERVICE_UNAVAILABLE, "data dir not writable").into_response();
    }
    let _ = std::fs::remove_file(&probe);

    if let Err(e) = Dictionary::load(&state.config.dictionary_path) {
        tracing::warn!(error = %e, "readiness: dictionary unreadable");
        return (StatusCode::SERVICE_UNAVAILABLE, "dictionary unreadable").into_response();
    }

    (StatusCode::OK, "ready").into_response()
}

/// GET /metrics — Prometheus scrape endpoint.
///
/// Updates domain gauges from current state on each scrape (pull model),
/// then encodes everything in text exposition format.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    let counts: HashMap<_, _> = state.jobs.counts_by_status();
    metrics.update_jobs().reset();
    for (status, count) in &counts {
        metrics
            .update_jobs()
            .with_label_values(&[status.as_str()])
            .set(*count as f64);
    }

    if let Ok(dict) = Dictionary::load(&state.config.dictionary_path) {
        metrics.dictionary_entries().set(dict.len() as f64);
    }

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}
