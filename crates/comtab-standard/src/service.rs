//! The standardization service: one entry point per bank row.
//!
//! Resolution order, strictest first:
//!   1. dictionary hit on `ID|RATE|TERM` (final, human-approved text)
//!   2. per-run memo of already-resolved keys
//!   3. agreement signature hit against the cache index
//!   4. a single strong similarity candidate
//!   5. guided selection among candidates, via the engine
//!   6. assembly from structural signals (rules, engine-assisted)
//!
//! Every outcome below step 1 is logged as a suggestion for human review;
//! the dictionary itself is only ever written by seeding and promotion.

use std::collections::HashMap;
use std::sync::Arc;

use comtab_ai::{AiEngine, GuidedSelection, RawProduct};
use comtab_core::parse_percent_br;
use serde::Serialize;

use crate::assemble::assemble;
use crate::dictionary::{cache_key, Dictionary, StandardEntry};
use crate::index::CacheIndex;
use crate::normalize::{extract_rate, extract_refin_rate, normalize_text};
use crate::signals;
use crate::suggestion_log::{Suggestion, SuggestionLog, SuggestionLogError};
use crate::validate::validate_entry;

/// Score at which the top candidate resolves without the engine, provided
/// the runner-up stays below [`RUNNER_UP_CEILING`].
const DIRECT_CANDIDATE_THRESHOLD: f64 = 0.85;
const RUNNER_UP_CEILING: f64 = 0.80;

/// Internal-table seeding columns. Rows without the standardization block
/// (older exports) simply contribute nothing to the dictionary.
pub mod columns {
    pub const ORIGIN_ID: &str = "Código do Produto";
    pub const RATE: &str = "Taxa";
    pub const TERM: &str = "Prazo";
    pub const PRODUCT: &str = "Produto Padronizado";
    pub const AGREEMENT: &str = "Convênio Padronizado";
    pub const FAMILY: &str = "Família Produto";
    pub const GROUP: &str = "Grupo Convênio";
}

/// One row of raw bank-report identity, as the adapters hand it over.
#[derive(Debug, Clone, Default)]
pub struct RawInput {
    pub origin_id: String,
    pub rate_raw: String,
    pub term_raw: String,
    pub product_raw: String,
    pub agreement_raw: String,
}

/// How the final text was obtained. `Ai` and `Manual` rows are flagged for
/// review in the output; `Manual` marks rows standardized by hand outside
/// the pipeline (e.g. a spreadsheet edited before re-import).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StandardizationOrigin {
    Cache,
    Rule,
    Ai,
    Manual,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub entry: StandardEntry,
    pub origin: StandardizationOrigin,
    pub confidence: f64,
    /// Effective rate after REFIN/column/text priority.
    pub rate: f64,
}

/// Counters for the job report.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Metrics {
    pub cache_queries: usize,
    pub cache_hits: usize,
    pub resolved_without_ai: usize,
    pub ai_calls: usize,
    pub guided_selections: usize,
    pub structural_extractions: usize,
    pub refin_rate_used: usize,
    pub suggestions_logged: usize,
}

pub struct Standardizer {
    engine: Arc<dyn AiEngine>,
    dict: Dictionary,
    index: CacheIndex,
    log: SuggestionLog,
    memo: HashMap<String, Outcome>,
    pub metrics: Metrics,
}

impl Standardizer {
    pub fn new(dict: Dictionary, engine: Arc<dyn AiEngine>, log: SuggestionLog) -> Self {
        let index = CacheIndex::build(&dict);
        Self {
            engine,
            dict,
            index,
            log,
            memo: HashMap::new(),
            metrics: Metrics::default(),
        }
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dict
    }

    /// Seed the dictionary from the already-standardized internal table.
    /// Returns how many keys were new. Rebuilds the index.
    pub fn seed_from_internal(&mut self, rows: &[HashMap<String, String>]) -> usize {
        let get = |row: &HashMap<String, String>, name: &str| {
            row.get(name).map(|s| s.trim().to_string()).unwrap_or_default()
        };
        let mut inserted = 0;
        for row in rows {
            let id = get(row, columns::ORIGIN_ID);
            let product = get(row, columns::PRODUCT);
            if id.is_empty() || product.is_empty() {
                continue;
            }
            let rate = parse_percent_br(&get(row, columns::RATE));
            let key = cache_key(&id, rate, &get(row, columns::TERM));
            // seeding never overwrites: promotion is the only path allowed
            // to replace an existing entry
            if self.dict.get(&key).is_some() {
                continue;
            }
            let entry = StandardEntry {
                product,
                agreement: get(row, columns::AGREEMENT),
                family: non_empty_or(get(row, columns::FAMILY), "OUTROS"),
                group: non_empty_or(get(row, columns::GROUP), "OUTROS"),
            };
            self.dict.upsert(key, entry);
            inserted += 1;
        }
        self.index = CacheIndex::build(&self.dict);
        tracing::info!(
            inserted,
            dictionary = self.dict.len(),
            "dictionary seeded from internal table"
        );
        inserted
    }

    /// Effective rate for a row: REFIN rate in the text wins, then the rate
    /// column, then the last rate mentioned in the text.
    fn effective_rate(&mut self, input: &RawInput) -> f64 {
        if let Some(refin) = extract_refin_rate(&input.product_raw) {
            self.metrics.refin_rate_used += 1;
            return refin;
        }
        let from_column = parse_percent_br(&input.rate_raw);
        if from_column > 0.0 {
            return from_column;
        }
        extract_rate(&input.product_raw).unwrap_or(0.0)
    }

    pub async fn standardize(&mut self, input: &RawInput) -> Result<Outcome, SuggestionLogError> {
        let rate = self.effective_rate(input);
        self.metrics.cache_queries += 1;

        // An empty origin id has no usable key: never consult or feed the
        // cache with it, or unrelated products would collide.
        let key = (!input.origin_id.trim().is_empty())
            .then(|| cache_key(&input.origin_id, rate, &input.term_raw));

        if let Some(key) = key.as_deref() {
            if let Some(entry) = self.dict.get(key) {
                self.metrics.cache_hits += 1;
                return Ok(Outcome {
                    entry: entry.clone(),
                    origin: StandardizationOrigin::Cache,
                    confidence: 1.0,
                    rate,
                });
            }
            if let Some(memo) = self.memo.get(key) {
                self.metrics.cache_hits += 1;
                return Ok(memo.clone());
            }
        }

        let outcome = self.resolve(input, rate).await?;
        if let Some(key) = key {
            self.memo.insert(key, outcome.clone());
        }
        self.metrics.suggestions_logged = self.log.logged();
        Ok(outcome)
    }

    async fn resolve(&mut self, input: &RawInput, rate: f64) -> Result<Outcome, SuggestionLogError> {
        let raw = RawProduct {
            product_raw: input.product_raw.clone(),
            agreement_raw: input.agreement_raw.clone(),
        };
        let raw_text = format!("{} {}", input.product_raw, input.agreement_raw);
        let target = if input.agreement_raw.trim().is_empty() {
            &input.product_raw
        } else {
            &input.agreement_raw
        };

        // 3. exact signature
        if let Some(official) = self.index.lookup_signature(target).map(str::to_string) {
            self.metrics.resolved_without_ai += 1;
            let s = signals::rule_signals(&raw);
            let entry = assemble(&s, rate, Some(&official), &self.index, &raw_text);
            return self.finish(input, rate, entry, StandardizationOrigin::Rule, 0.85, &raw_text);
        }

        // 4. one strong candidate, clearly ahead of the runner-up
        let candidates = self.index.candidates(target);
        if candidates
            .first()
            .is_some_and(|best| best.score >= DIRECT_CANDIDATE_THRESHOLD)
            && candidates.get(1).map_or(true, |second| second.score < RUNNER_UP_CEILING)
        {
            self.metrics.resolved_without_ai += 1;
            let s = signals::rule_signals(&raw);
            let entry = assemble(&s, rate, Some(&candidates[0].agreement), &self.index, &raw_text);
            return self.finish(input, rate, entry, StandardizationOrigin::Rule, 0.80, &raw_text);
        }

        // structural signals, engine-assisted if rules are inconclusive
        let engine = Arc::clone(&self.engine);
        let (mut s, used_ai) = signals::extract(engine.as_ref(), &raw).await;
        if used_ai {
            self.metrics.ai_calls += 1;
            self.metrics.structural_extractions += 1;
        }

        // 5. guided selection among candidates
        if !candidates.is_empty() {
            self.metrics.ai_calls += 1;
            self.metrics.guided_selections += 1;
            let options: Vec<String> =
                candidates.iter().map(|c| c.agreement.clone()).collect();
            let context = serde_json::json!({
                "sinais": {
                    "tipo": s.kind.as_label(),
                    "uf": s.uf,
                    "nome_base": s.base_name,
                }
            });
            let selection = engine.guided_selection(&raw, &options, &context).await;
            match selection {
                GuidedSelection::Chosen { option, subproduct, confidence }
                    if options.contains(&option) =>
                {
                    if let Some(sub) = subproduct {
                        let sub = normalize_text(&sub);
                        if !sub.is_empty() && normalize_text(&raw_text).contains(sub.as_str()) {
                            s.subproduct = Some(sub);
                        }
                    }
                    let entry = assemble(&s, rate, Some(&option), &self.index, &raw_text);
                    return self.finish(
                        input,
                        rate,
                        entry,
                        StandardizationOrigin::Ai,
                        confidence,
                        &raw_text,
                    );
                }
                _ => {
                    tracing::debug!(
                        agreement = %input.agreement_raw,
                        options = options.len(),
                        "guided selection ambiguous, assembling from signals"
                    );
                }
            }
        }

        // 6. assembly from signals
        let confidence = s.confidence;
        let entry = assemble(&s, rate, None, &self.index, &raw_text);
        self.finish(input, rate, entry, StandardizationOrigin::Ai, confidence, &raw_text)
    }

    fn finish(
        &mut self,
        input: &RawInput,
        rate: f64,
        entry: StandardEntry,
        origin: StandardizationOrigin,
        confidence: f64,
        raw_text: &str,
    ) -> Result<Outcome, SuggestionLogError> {
        let entry = validate_entry(entry, rate, &self.index, raw_text);
        // No origin id means no reviewable key: a promoted row could never
        // be looked up again, and the key `|RATE|TERM` would collide across
        // unrelated products. Such rows stay out of the log.
        if !input.origin_id.trim().is_empty() {
            self.log.log(&Suggestion {
                cache_key: cache_key(&input.origin_id, rate, &input.term_raw),
                product_raw: input.product_raw.clone(),
                agreement_raw: input.agreement_raw.clone(),
                entry: entry.clone(),
                origin: match origin {
                    StandardizationOrigin::Ai => self.engine.engine_name().to_string(),
                    _ => "REGRAS".to_string(),
                },
                confidence,
            })?;
        }
        Ok(Outcome { entry, origin, confidence, rate })
    }
}

fn non_empty_or(value: String, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value
    }
}
