//! # comtab-ai — Constrained AI Engine
//!
//! Typed client for the two — and only two — things the AI is allowed to do
//! during standardization:
//!
//! - **structural extraction**: read a raw product/agreement text and report
//!   its institutional kind, base name, UF, and explicit sub-product;
//! - **guided selection**: pick exactly one official agreement out of a list
//!   of cache-derived candidates.
//!
//! The AI never writes final standardized text, never invents agreement
//! names, and never touches the dictionary. Transport failures, malformed
//! responses, and out-of-list selections all degrade to
//! [`GuidedSelection::Ambiguous`] / [`StructureExtraction::Ambiguous`]; a
//! pipeline run must not fail because the engine is down.
//!
//! [`OpenAiEngine`] talks to an OpenAI-compatible chat-completions endpoint;
//! [`DisabledEngine`] is the no-key/no-network stand-in.

pub mod engine;
pub mod openai;
mod retry;

pub use engine::{AiEngine, DisabledEngine, GuidedSelection, RawProduct, StructureExtraction};
pub use openai::{OpenAiConfig, OpenAiEngine};
