//! Structural signals: institutional kind, UF, base name, sub-product.
//!
//! Rules run first and are always sufficient to produce *something*. The
//! engine is consulted only when rules are inconclusive, and its answer is
//! validated field by field before use; anything that fails validation falls
//! back to the rule extraction. A low-confidence engine answer is discarded
//! wholesale.

use comtab_ai::{AiEngine, RawProduct, StructureExtraction};
use serde::Serialize;

use crate::normalize::{find_uf_in_text, normalize_text, normalize_uf, tokens};

/// Minimum engine confidence for structural signals to be accepted.
const STRUCTURE_CONFIDENCE_FLOOR: f64 = 0.65;

/// Institutional kind of an agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InstitutionKind {
    Gov,
    Pref,
    Tj,
    Siape,
    Other,
}

impl InstitutionKind {
    pub fn as_label(self) -> &'static str {
        match self {
            Self::Gov => "GOV",
            Self::Pref => "PREF",
            Self::Tj => "TJ",
            Self::Siape => "SIAPE",
            Self::Other => "OUTROS",
        }
    }

    /// Parse an engine-provided label. Anything off the whitelist is `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match normalize_text(label).as_str() {
            "GOV" => Some(Self::Gov),
            "PREF" => Some(Self::Pref),
            "TJ" => Some(Self::Tj),
            "SIAPE" => Some(Self::Siape),
            "OUTROS" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Structural signals for one row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signals {
    pub kind: InstitutionKind,
    /// Cleaned base name (city for PREF, organ for OUTROS), normalized.
    pub base_name: Option<String>,
    pub uf: Option<String>,
    /// Sub-product, only ever set when it occurs verbatim in the raw text.
    pub subproduct: Option<String>,
    pub confidence: f64,
}

const GOV_KEYWORDS: [&str; 3] = ["GOV", "GOVERNO", "ESTADO"];
const PREF_KEYWORDS: [&str; 3] = ["PREF", "PREFEITURA", "MUNICIPIO"];
const TJ_KEYWORDS: [&str; 2] = ["TJ", "TRIBUNAL"];
const SIAPE_KEYWORDS: [&str; 2] = ["SIAPE", "FEDERAL"];

/// Tokens that carry no naming information and are dropped from base names.
const NOISE_TOKENS: [&str; 10] = [
    "GOV", "GOVERNO", "ESTADO", "PREF", "PREFEITURA", "MUNICIPIO", "TJ", "TRIBUNAL", "DE",
    "DO",
];

fn looks_like_rate(tok: &str) -> bool {
    tok.chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '%' | 'A' | 'X'))
        && tok.chars().any(|c| c.is_ascii_digit())
}

/// Deterministic extraction from keywords alone.
pub fn rule_signals(input: &RawProduct) -> Signals {
    let combined = format!("{} {}", input.product_raw, input.agreement_raw);
    let toks = tokens(&combined);

    let has = |keys: &[&str]| keys.iter().any(|k| toks.contains(*k));
    let kind = if has(&SIAPE_KEYWORDS) {
        InstitutionKind::Siape
    } else if has(&TJ_KEYWORDS) {
        InstitutionKind::Tj
    } else if has(&PREF_KEYWORDS) {
        InstitutionKind::Pref
    } else if has(&GOV_KEYWORDS) {
        InstitutionKind::Gov
    } else {
        InstitutionKind::Other
    };

    let uf = find_uf_in_text(&combined).map(str::to_string);
    let base_name = match kind {
        InstitutionKind::Pref | InstitutionKind::Other => {
            let norm = normalize_text(&input.agreement_raw);
            let name: Vec<&str> = norm
                .split_whitespace()
                .map(|t| t.trim_matches('.'))
                .filter(|t| {
                    !t.is_empty()
                        && !NOISE_TOKENS.contains(t)
                        && normalize_uf(t).is_none()
                        && !looks_like_rate(t)
                })
                .collect();
            (!name.is_empty()).then(|| name.join(" "))
        }
        _ => None,
    };

    let resolved = kind != InstitutionKind::Other
        && (kind != InstitutionKind::Gov || uf.is_some())
        && (kind != InstitutionKind::Pref || base_name.is_some());
    let confidence = if resolved { 0.70 } else { 0.50 };

    Signals { kind, base_name, uf, subproduct: None, confidence }
}

/// Extract signals, consulting the engine when rules are inconclusive.
///
/// Returns the signals and whether the engine was actually called.
pub async fn extract(engine: &dyn AiEngine, input: &RawProduct) -> (Signals, bool) {
    let rules = rule_signals(input);
    if rules.confidence >= STRUCTURE_CONFIDENCE_FLOOR {
        return (rules, false);
    }

    let context = serde_json::json!({
        "palpite_regras": {
            "tipo": rules.kind.as_label(),
            "uf": rules.uf,
        }
    });
    let extraction = engine.extract_structure(input, &context).await;
    match validate(extraction, input) {
        Some(signals) => (signals, true),
        None => {
            tracing::debug!(
                product = %input.product_raw,
                "engine structure extraction rejected, keeping rule signals"
            );
            (rules, true)
        }
    }
}

/// Validate an engine extraction field by field.
fn validate(extraction: StructureExtraction, input: &RawProduct) -> Option<Signals> {
    let StructureExtraction::Extracted { kind, base_name, uf, subproduct, confidence } =
        extraction
    else {
        return None;
    };
    if confidence < STRUCTURE_CONFIDENCE_FLOOR {
        return None;
    }
    let kind = InstitutionKind::from_label(&kind)?;
    let uf = uf.as_deref().and_then(normalize_uf).map(str::to_string);

    // A sub-product the text never mentions is an invention, not a signal.
    let raw_norm = normalize_text(&format!("{} {}", input.product_raw, input.agreement_raw));
    let subproduct = subproduct
        .map(|s| normalize_text(&s))
        .filter(|s| !s.is_empty() && raw_norm.contains(s.as_str()));

    let base_name = base_name.map(|b| normalize_text(&b)).filter(|b| !b.is_empty());

    Some(Signals { kind, base_name, uf, subproduct, confidence })
}

#[cfg(test)]
mod tests {
    use super::*;
    use comtab_ai::DisabledEngine;

    fn input(product: &str, agreement: &str) -> RawProduct {
        RawProduct {
            product_raw: product.into(),
            agreement_raw: agreement.into(),
        }
    }

    #[test]
    fn gov_with_uf_resolves_by_rules() {
        let s = rule_signals(&input("GOV SAO PAULO 2.50%", "GOV SP"));
        assert_eq!(s.kind, InstitutionKind::Gov);
        assert_eq!(s.uf.as_deref(), Some("SP"));
        assert!(s.confidence >= STRUCTURE_CONFIDENCE_FLOOR);
    }

    #[test]
    fn gov_without_uf_is_inconclusive() {
        let s = rule_signals(&input("GOVERNO MARGEM LIVRE", "GOVERNO"));
        assert_eq!(s.kind, InstitutionKind::Gov);
        assert_eq!(s.uf, None);
        assert!(s.confidence < STRUCTURE_CONFIDENCE_FLOOR);
    }

    #[test]
    fn pref_extracts_city_base_name() {
        let s = rule_signals(&input("PREF SETE LAGOAS MG 2,10%", "PREF. SETE LAGOAS"));
        assert_eq!(s.kind, InstitutionKind::Pref);
        assert_eq!(s.base_name.as_deref(), Some("SETE LAGOAS"));
        assert_eq!(s.uf.as_deref(), Some("MG"));
    }

    #[test]
    fn siape_beats_gov_keyword() {
        let s = rule_signals(&input("SIAPE GOVERNO FEDERAL", "SIAPE"));
        assert_eq!(s.kind, InstitutionKind::Siape);
    }

    #[test]
    fn unknown_text_is_other_with_low_confidence() {
        let s = rule_signals(&input("CLT PRIVADO", "EMPRESA X"));
        assert_eq!(s.kind, InstitutionKind::Other);
        assert!(s.confidence < STRUCTURE_CONFIDENCE_FLOOR);
    }

    #[tokio::test]
    async fn disabled_engine_falls_back_to_rules() {
        let engine = DisabledEngine;
        let raw = input("GOVERNO MARGEM LIVRE", "GOVERNO");
        let (s, used_ai) = extract(&engine, &raw).await;
        assert!(used_ai);
        assert_eq!(s.kind, InstitutionKind::Gov);
        assert_eq!(s.confidence, 0.50);
    }

    #[tokio::test]
    async fn conclusive_rules_skip_the_engine() {
        let engine = DisabledEngine;
        let raw = input("GOV SP 2.50%", "GOV SP");
        let (_, used_ai) = extract(&engine, &raw).await;
        assert!(!used_ai);
    }

    #[test]
    fn validate_rejects_low_confidence() {
        let raw = input("GOV SP", "GOV SP");
        let ext = StructureExtraction::Extracted {
            kind: "GOV".into(),
            base_name: None,
            uf: Some("SP".into()),
            subproduct: None,
            confidence: 0.5,
        };
        assert_eq!(validate(ext, &raw), None);
    }

    #[test]
    fn validate_rejects_unknown_kind_label() {
        let raw = input("GOV SP", "GOV SP");
        let ext = StructureExtraction::Extracted {
            kind: "ESTADUAL".into(),
            base_name: None,
            uf: Some("SP".into()),
            subproduct: None,
            confidence: 0.9,
        };
        assert_eq!(validate(ext, &raw), None);
    }

    #[test]
    fn validate_drops_invented_subproduct() {
        let raw = input("GOV SP 2.50%", "GOV SP");
        let ext = StructureExtraction::Extracted {
            kind: "GOV".into(),
            base_name: None,
            uf: Some("SP".into()),
            subproduct: Some("SPPREV".into()),
            confidence: 0.9,
        };
        let s = validate(ext, &raw).unwrap();
        assert_eq!(s.subproduct, None);
    }

    #[test]
    fn validate_keeps_subproduct_present_in_text() {
        let raw = input("GOV SP SPPREV 2.50%", "GOV SP");
        let ext = StructureExtraction::Extracted {
            kind: "GOV".into(),
            base_name: None,
            uf: Some("SP".into()),
            subproduct: Some("sppreV".into()),
            confidence: 0.9,
        };
        let s = validate(ext, &raw).unwrap();
        assert_eq!(s.subproduct.as_deref(), Some("SPPREV"));
    }

    #[test]
    fn validate_normalizes_uf_and_drops_garbage() {
        let raw = input("GOV SAO PAULO", "GOV");
        let ext = StructureExtraction::Extracted {
            kind: "GOV".into(),
            base_name: Some("São Paulo".into()),
            uf: Some("sao paulo".into()),
            subproduct: None,
            confidence: 0.9,
        };
        let s = validate(ext, &raw).unwrap();
        assert_eq!(s.uf.as_deref(), Some("SP"));
        assert_eq!(s.base_name.as_deref(), Some("SAO PAULO"));
    }
}
