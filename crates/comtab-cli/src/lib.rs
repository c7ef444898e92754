//! Subcommand implementations for the `comtab` CLI.

use std::sync::Arc;

use comtab_ai::{AiEngine, DisabledEngine, OpenAiConfig, OpenAiEngine};

pub mod promote;
pub mod update;

/// Build the AI engine from flags with environment fallback.
///
/// The key comes from `--ai-api-key` or `COMTAB_AI_API_KEY`; without one
/// the disabled engine is used and standardization runs on rules alone.
pub fn build_engine(
    base_url: Option<&str>,
    model: Option<&str>,
    api_key: Option<&str>,
) -> Arc<dyn AiEngine> {
    let key = api_key
        .map(str::to_string)
        .or_else(|| std::env::var("COMTAB_AI_API_KEY").ok())
        .filter(|k| !k.trim().is_empty());
    let key = match key {
        Some(k) => k,
        None => {
            tracing::info!("no AI key configured; running on rules alone");
            return Arc::new(DisabledEngine);
        }
    };

    let mut config = OpenAiConfig::new(
        base_url.unwrap_or("https://api.openai.com/v1"),
        key,
    );
    if let Some(model) = model {
        config.model = model.to_string();
    }
    match OpenAiEngine::new(config) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            tracing::warn!(error = %e, "AI engine unavailable; running on rules alone");
            Arc::new(DisabledEngine)
        }
    }
}
