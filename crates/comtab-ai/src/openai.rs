//! OpenAI-compatible chat-completions engine.
//!
//! One `reqwest::Client` per engine, bearer auth, JSON-object response
//! format, temperature 0. The prompts are the operational pt-BR prompts the
//! standardization team reviews; the response contract is a small JSON
//! document validated field by field. Anything that fails validation is
//! ambiguous, not an error.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::engine::{AiEngine, GuidedSelection, RawProduct, StructureExtraction};
use crate::retry::retry_send;

/// At most this many candidate agreements are offered per selection call.
const MAX_OPTIONS: usize = 15;

/// Errors constructing the engine. Runtime call failures never surface as
/// errors — they degrade to ambiguous outcomes.
#[derive(Debug, thiserror::Error)]
pub enum EngineBuildError {
    /// API key contains characters that cannot go into an HTTP header.
    #[error("engine not configured: {0}")]
    NotConfigured(String),
    /// The underlying HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Configuration for [`OpenAiEngine`].
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Base URL of the API (e.g. `https://api.openai.com/v1`).
    pub base_url: String,
    /// Bearer token.
    pub api_key: String,
    /// Model name.
    pub model: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    /// Configuration with the default model and timeout.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Chat-completions client implementing [`AiEngine`].
#[derive(Debug)]
pub struct OpenAiEngine {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl OpenAiEngine {
    /// Build an engine from configuration.
    pub fn new(config: OpenAiConfig) -> Result<Self, EngineBuildError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                .map_err(|_| {
                    EngineBuildError::NotConfigured("invalid API key characters".into())
                })?,
        );
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model,
        })
    }

    /// One chat call expected to return a JSON object.
    ///
    /// `None` on any transport, status, or parse failure — the caller maps
    /// that to an ambiguous outcome.
    async fn call_json(&self, system: &str, user: &str) -> Option<serde_json::Value> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "temperature": 0.0,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        let resp = match retry_send(|| self.client.post(&url).json(&body).send()).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(error = %e, "engine transport failure");
                return None;
            }
        };

        if !resp.status().is_success() {
            let status = resp.status();
            let excerpt = resp.text().await.unwrap_or_default();
            tracing::warn!(%status, excerpt = %excerpt.chars().take(200).collect::<String>(),
                "engine returned non-success status");
            return None;
        }

        let chat: ChatResponse = match resp.json().await {
            Ok(chat) => chat,
            Err(e) => {
                tracing::warn!(error = %e, "engine response deserialization failed");
                return None;
            }
        };

        let content = chat.choices.first()?.message.content.as_deref()?;
        match serde_json::from_str(content) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = %e, "engine content is not valid JSON");
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl AiEngine for OpenAiEngine {
    async fn guided_selection(
        &self,
        input: &RawProduct,
        options: &[String],
        context: &serde_json::Value,
    ) -> GuidedSelection {
        let options = &options[..options.len().min(MAX_OPTIONS)];
        let options_text: String = options
            .iter()
            .enumerate()
            .map(|(i, op)| format!("{}) {op}\n", i + 1))
            .collect();

        let system = "Você é um classificador extremamente rigoroso.\n\
                      Você NÃO cria texto.\n\
                      Você NÃO inventa nomes.\n\
                      Você APENAS escolhe uma opção existente.\n\
                      Se não tiver certeza, responda AMBIGUO.";

        let user = format!(
            "DADOS DE ENTRADA:\n\
             produto_raw: {}\n\
             convenio_raw: {}\n\n\
             CONTEXTO ESTRUTURAL:\n{}\n\n\
             OPÇÕES OFICIAIS (escolha exatamente UMA):\n{}\n\
             REGRAS CRÍTICAS:\n\
             - opcao_escolhida deve ser IDÊNTICA a uma das opções.\n\
             - NÃO invente UF.\n\
             - NÃO invente subproduto.\n\
             - subproduto só pode existir se estiver explicitamente no texto original.\n\n\
             FORMATO (JSON):\n\
             {{\"status\": \"OK\" | \"AMBIGUO\", \"opcao_escolhida\": \"<uma das opções>\" | null, \
             \"subproduto\": \"<texto>\" | null, \"confianca\": 0.0}}",
            input.product_raw, input.agreement_raw, context, options_text,
        );

        let Some(resp) = self.call_json(system, &user).await else {
            return GuidedSelection::Ambiguous;
        };

        let status = resp
            .get("status")
            .and_then(|v| v.as_str())
            .unwrap_or("AMBIGUO")
            .to_uppercase();
        if status != "OK" {
            return GuidedSelection::Ambiguous;
        }

        let option = resp
            .get("opcao_escolhida")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .unwrap_or("");
        // The choice must be verbatim one of the offered options.
        if option.is_empty() || !options.iter().any(|o| o == option) {
            return GuidedSelection::Ambiguous;
        }

        let subproduct = resp
            .get("subproduto")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let confidence = resp
            .get("confianca")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0)
            .clamp(0.0, 1.0);

        GuidedSelection::Chosen {
            option: option.to_string(),
            subproduct,
            confidence,
        }
    }

    async fn extract_structure(
        &self,
        input: &RawProduct,
        context: &serde_json::Value,
    ) -> StructureExtraction {
        let system = "Você é um EXTRATOR de informações.\n\
                      Você NÃO cria nomes finais.\n\
                      Você NÃO inventa dados.\n\
                      Se algo não estiver explícito no texto, retorne null.";

        let user = format!(
            "TEXTO ORIGINAL:\n\
             produto_raw: {}\n\
             convenio_raw: {}\n\n\
             CONTEXTO PRÉ-EXTRAÍDO:\n{}\n\n\
             TIPOS PERMITIDOS:\n\
             - GOV (governos estaduais)\n\
             - PREF (prefeituras / institutos municipais)\n\
             - TJ (tribunais)\n\
             - SIAPE (federal)\n\
             - OUTROS (autarquias, hospitais, etc.)\n\n\
             REGRAS CRÍTICAS:\n\
             - subproduto: SOMENTE se estiver explicitamente escrito.\n\
             - uf: SOMENTE se estiver explicitamente escrito.\n\
             - NÃO converta estado → UF.\n\
             - NÃO padronize texto.\n\
             - NÃO adivinhe.\n\n\
             FORMATO (JSON):\n\
             {{\"status\": \"OK\" | \"AMBIGUO\", \"tipo\": \"GOV\" | \"PREF\" | \"TJ\" | \"SIAPE\" | \"OUTROS\", \
             \"nome_base\": \"<texto base limpo>\" | null, \"uf\": \"<UF>\" | null, \
             \"subproduto\": \"<texto>\" | null, \"confianca\": 0.0}}",
            input.product_raw, input.agreement_raw, context,
        );

        let Some(resp) = self.call_json(system, &user).await else {
            return StructureExtraction::Ambiguous;
        };

        let status = resp
            .get("status")
            .and_then(|v| v.as_str())
            .unwrap_or("AMBIGUO")
            .to_uppercase();
        if status != "OK" {
            return StructureExtraction::Ambiguous;
        }

        let field = |name: &str| {
            resp.get(name)
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        StructureExtraction::Extracted {
            kind: field("tipo").unwrap_or_default(),
            base_name: field("nome_base"),
            uf: field("uf"),
            subproduct: field("subproduto"),
            confidence: resp
                .get("confianca")
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0)
                .clamp(0.0, 1.0),
        }
    }

    fn engine_name(&self) -> &str {
        "OpenAiEngine"
    }
}
