//! Index derived from the dictionary at load time.
//!
//! The dictionary stores per-key entries; resolution needs to answer broader
//! questions: "which official agreement does this raw text point at?", "what
//! family/group does that agreement carry?", "how are products under that
//! agreement usually named?". The index precomputes those views so lookups
//! stay cheap per row.

use std::collections::HashMap;

use crate::dictionary::Dictionary;
use crate::normalize::{jaccard, strip_trailing_rate, tokens};

/// Minimum Jaccard score for an agreement to be offered as a candidate.
const CANDIDATE_THRESHOLD: f64 = 0.45;

/// Cap on candidates offered to guided selection.
const MAX_CANDIDATES: usize = 10;

/// An agreement candidate with its similarity score.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub agreement: String,
    pub score: f64,
}

/// Order-insensitive signature of an agreement name: sorted normalized tokens.
pub fn signature(text: &str) -> String {
    let mut toks: Vec<String> = tokens(text).into_iter().collect();
    toks.sort();
    toks.join(" ")
}

#[derive(Debug, Default)]
pub struct CacheIndex {
    /// signature → official agreement name.
    agreement_by_signature: HashMap<String, String>,
    /// official agreement → (family, group).
    meta: HashMap<String, (String, String)>,
    /// official agreement → product prefix (name minus trailing rate) → count.
    prefixes: HashMap<String, HashMap<String, usize>>,
    /// Sorted official agreements, for deterministic candidate iteration.
    agreements: Vec<String>,
}

impl CacheIndex {
    pub fn build(dict: &Dictionary) -> Self {
        let mut index = Self::default();
        for (_, entry) in dict.iter() {
            let agreement = entry.agreement.trim();
            if agreement.is_empty() {
                continue;
            }
            index
                .agreement_by_signature
                .insert(signature(agreement), agreement.to_string());
            index
                .meta
                .entry(agreement.to_string())
                .or_insert_with(|| (entry.family.clone(), entry.group.clone()));

            let prefix = strip_trailing_rate(&entry.product);
            if !prefix.is_empty() {
                *index
                    .prefixes
                    .entry(agreement.to_string())
                    .or_default()
                    .entry(prefix)
                    .or_insert(0) += 1;
            }
        }
        index.agreements = index.meta.keys().cloned().collect();
        index.agreements.sort();
        index
    }

    /// Exact signature hit: the raw agreement is the same set of tokens as a
    /// known official one, regardless of order, case, accents or separators.
    pub fn lookup_signature(&self, raw_agreement: &str) -> Option<&str> {
        self.agreement_by_signature
            .get(&signature(raw_agreement))
            .map(String::as_str)
    }

    pub fn metadata(&self, agreement: &str) -> Option<(&str, &str)> {
        self.meta
            .get(agreement)
            .map(|(f, g)| (f.as_str(), g.as_str()))
    }

    pub fn agreement_count(&self) -> usize {
        self.agreements.len()
    }

    /// Rank known agreements by token similarity against the raw text.
    /// Deterministic: score descending, then name ascending.
    pub fn candidates(&self, raw_agreement: &str) -> Vec<Candidate> {
        let raw = tokens(raw_agreement);
        let mut out: Vec<Candidate> = self
            .agreements
            .iter()
            .filter_map(|agreement| {
                let score = jaccard(&raw, &tokens(agreement));
                (score >= CANDIDATE_THRESHOLD).then(|| Candidate {
                    agreement: agreement.clone(),
                    score,
                })
            })
            .collect();
        out.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.agreement.cmp(&b.agreement))
        });
        out.truncate(MAX_CANDIDATES);
        out
    }

    /// Most common product prefix under an agreement, skipping prefixes that
    /// would leak a sub-product the raw text never mentioned (an agreement
    /// whose cached products are mostly `"GOV. SP - SPPREV"` must not stamp
    /// `SPPREV` onto a row that never said so).
    pub fn best_prefix(&self, agreement: &str, raw_text: &str) -> Option<String> {
        let counts = self.prefixes.get(agreement)?;
        let raw = tokens(raw_text);
        let agreement_toks = tokens(agreement);

        let leaks = |prefix: &str| {
            tokens(prefix)
                .iter()
                .any(|t| !agreement_toks.contains(t) && !raw.contains(t))
        };

        counts
            .iter()
            .map(|(prefix, count)| (leaks(prefix), std::cmp::Reverse(*count), prefix))
            .min()
            .filter(|(leaking, _, _)| !leaking)
            .map(|(_, _, prefix)| prefix.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::{cache_key, StandardEntry};

    fn dict_with(entries: &[(&str, &str, &str)]) -> Dictionary {
        let mut dict = Dictionary::default();
        for (i, (product, agreement, family)) in entries.iter().enumerate() {
            dict.upsert(
                cache_key(&format!("K{i}"), 2.5, "1-96"),
                StandardEntry {
                    product: product.to_string(),
                    agreement: agreement.to_string(),
                    family: family.to_string(),
                    group: "ESTADUAL".into(),
                },
            );
        }
        dict
    }

    #[test]
    fn signature_is_order_and_accent_insensitive() {
        assert_eq!(signature("GOV-SP | SPPREV"), signature("sppREV gov sp"));
        assert_ne!(signature("GOV-SP"), signature("GOV-RJ"));
    }

    #[test]
    fn lookup_signature_finds_reordered_agreement() {
        let index = CacheIndex::build(&dict_with(&[(
            "GOV. SP - 2,50%",
            "GOV-SP",
            "GOVERNOS",
        )]));
        assert_eq!(index.lookup_signature("sp gov"), Some("GOV-SP"));
        assert_eq!(index.lookup_signature("GOV-RJ"), None);
    }

    #[test]
    fn metadata_comes_from_first_entry() {
        let index = CacheIndex::build(&dict_with(&[(
            "GOV. SP - 2,50%",
            "GOV-SP",
            "GOVERNOS",
        )]));
        assert_eq!(index.metadata("GOV-SP"), Some(("GOVERNOS", "ESTADUAL")));
        assert_eq!(index.metadata("GOV-RJ"), None);
    }

    #[test]
    fn candidates_are_ranked_and_thresholded() {
        let index = CacheIndex::build(&dict_with(&[
            ("GOV. SP - 2,50%", "GOV-SP", "GOVERNOS"),
            ("GOV. RJ - 2,50%", "GOV-RJ", "GOVERNOS"),
            ("PREF. SETE LAGOAS MG - 2,50%", "PREF. SETE LAGOAS MG", "PREFEITURAS"),
        ]));
        let cands = index.candidates("GOV SP");
        assert_eq!(cands[0].agreement, "GOV-SP");
        assert!(cands[0].score > 0.99);
        // the prefeitura shares no tokens and must be filtered out
        assert!(cands.iter().all(|c| c.agreement != "PREF. SETE LAGOAS MG"));
    }

    #[test]
    fn candidates_empty_for_unrelated_text() {
        let index = CacheIndex::build(&dict_with(&[(
            "GOV. SP - 2,50%",
            "GOV-SP",
            "GOVERNOS",
        )]));
        assert!(index.candidates("TRIBUNAL JUSTICA PARANA").is_empty());
    }

    #[test]
    fn best_prefix_picks_most_frequent() {
        let index = CacheIndex::build(&dict_with(&[
            ("GOV. SP - 2,10%", "GOV-SP", "GOVERNOS"),
            ("GOV. SP - 2,50%", "GOV-SP", "GOVERNOS"),
            ("GOV SAO PAULO - 1,90%", "GOV-SP", "GOVERNOS"),
        ]));
        assert_eq!(
            index.best_prefix("GOV-SP", "GOV SP 2.50%").as_deref(),
            Some("GOV. SP")
        );
    }

    #[test]
    fn best_prefix_refuses_subproduct_leak() {
        let index = CacheIndex::build(&dict_with(&[
            ("GOV. SP - SPPREV - 2,10%", "GOV-SP", "GOVERNOS"),
            ("GOV. SP - SPPREV - 2,50%", "GOV-SP", "GOVERNOS"),
            ("GOV. SP - 1,90%", "GOV-SP", "GOVERNOS"),
        ]));
        // raw text never mentions SPPREV: the clean prefix wins despite count
        assert_eq!(
            index.best_prefix("GOV-SP", "GOV SP 2.50%").as_deref(),
            Some("GOV. SP")
        );
        // raw text does mention it: the frequent prefix is allowed
        assert_eq!(
            index.best_prefix("GOV-SP", "GOV SP SPPREV 2.50%").as_deref(),
            Some("GOV. SP - SPPREV")
        );
    }

    #[test]
    fn best_prefix_none_when_all_leak() {
        let index = CacheIndex::build(&dict_with(&[(
            "GOV. SP - SPPREV - 2,10%",
            "GOV-SP",
            "GOVERNOS",
        )]));
        assert_eq!(index.best_prefix("GOV-SP", "GOV SP 2.50%"), None);
    }
}
