//! Engine trait and response types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Raw text fields handed to the engine. Nothing else about the row is
/// shared — the engine sees exactly what a human reviewer would see in the
/// bank report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawProduct {
    /// Free-text product name from the bank report.
    pub product_raw: String,
    /// Free-text agreement name from the bank report.
    pub agreement_raw: String,
}

/// Outcome of a guided selection call.
#[derive(Debug, Clone, PartialEq)]
pub enum GuidedSelection {
    /// The engine chose one of the offered options.
    Chosen {
        /// The chosen option, guaranteed to be a member of the offered list.
        option: String,
        /// Sub-product the engine saw explicitly in the text, if any.
        /// Callers must still verify it occurs in the raw text before use.
        subproduct: Option<String>,
        /// Confidence in [0, 1].
        confidence: f64,
    },
    /// The engine declined, failed, or answered something not on the list.
    Ambiguous,
}

/// Outcome of a structural extraction call.
///
/// `kind` is a raw string here; the standardization layer whitelists it.
#[derive(Debug, Clone, PartialEq)]
pub enum StructureExtraction {
    Extracted {
        /// Institutional kind label (GOV, PREF, TJ, SIAPE, OUTROS).
        kind: String,
        /// Cleaned base name, without rate or separators.
        base_name: Option<String>,
        /// UF (two-letter Brazilian state code) if explicitly present.
        uf: Option<String>,
        /// Sub-product if explicitly present in the text.
        subproduct: Option<String>,
        /// Confidence in [0, 1].
        confidence: f64,
    },
    Ambiguous,
}

/// A constrained classification engine.
///
/// Implementations must be `Send + Sync` so the service can share one behind
/// an `Arc` across jobs. Both operations are total: errors are expressed as
/// the `Ambiguous` variants, never as panics or `Result::Err`.
#[async_trait]
pub trait AiEngine: Send + Sync {
    /// Pick exactly one agreement from `options`, or decline.
    ///
    /// `context` carries pre-extracted structural hints (target signature,
    /// kind, base name, UF) serialized into the prompt.
    async fn guided_selection(
        &self,
        input: &RawProduct,
        options: &[String],
        context: &serde_json::Value,
    ) -> GuidedSelection;

    /// Extract structural signals from the raw text, or decline.
    async fn extract_structure(
        &self,
        input: &RawProduct,
        context: &serde_json::Value,
    ) -> StructureExtraction;

    /// Human-readable implementation name for logs ("OpenAiEngine", ...).
    fn engine_name(&self) -> &str;
}

/// Engine used when no API key is configured: every call is ambiguous, so
/// standardization runs on cache and rules alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledEngine;

#[async_trait]
impl AiEngine for DisabledEngine {
    async fn guided_selection(
        &self,
        _input: &RawProduct,
        _options: &[String],
        _context: &serde_json::Value,
    ) -> GuidedSelection {
        GuidedSelection::Ambiguous
    }

    async fn extract_structure(
        &self,
        _input: &RawProduct,
        _context: &serde_json::Value,
    ) -> StructureExtraction {
        StructureExtraction::Ambiguous
    }

    fn engine_name(&self) -> &str {
        "DisabledEngine"
    }
}
