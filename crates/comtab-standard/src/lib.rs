//! Standardization of bank product nomenclature.
//!
//! The dictionary (`ID|RATE|TERM` → approved text) is the single source of
//! final standardized names. It is fed only by seeding from the internal
//! table and by promotion of human-reviewed suggestions; rule and engine
//! output never enters it directly. Resolution walks from the dictionary
//! through signature and similarity matching down to engine-assisted
//! assembly, and everything below a dictionary hit lands in the suggestion
//! log for review.

pub mod assemble;
pub mod dictionary;
pub mod index;
pub mod normalize;
pub mod promote;
pub mod service;
pub mod signals;
pub mod suggestion_log;
pub mod validate;

pub use dictionary::{cache_key, Dictionary, DictionaryError, StandardEntry};
pub use promote::{promote, PromoteError, PromotionReport};
pub use service::{Metrics, Outcome, RawInput, StandardizationOrigin, Standardizer};
pub use suggestion_log::{Suggestion, SuggestionLog, SuggestionLogError};
