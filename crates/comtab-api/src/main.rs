//! comtab API entry point.
//!
//! Binds the address from `COMTAB_LISTEN` (default `0.0.0.0:8080`) and
//! serves the router from `comtab_api::app`. Configuration comes from
//! `COMTAB_*` environment variables; see [`comtab_api::state::Config`].

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use comtab_api::state::{engine_from_env, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating data dir {}", config.data_dir.display()))?;
    tracing::info!(
        data_dir = %config.data_dir.display(),
        dictionary = %config.dictionary_path.display(),
        "configuration resolved"
    );

    let engine = engine_from_env();
    let state = AppState::new(config, engine);
    let app = comtab_api::app(state);

    let addr = std::env::var("COMTAB_LISTEN").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "comtab API listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
