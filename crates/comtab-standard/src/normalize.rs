//! Text normalization, token similarity, UF handling, and rate extraction.
//!
//! Everything that compares two pieces of bank nomenclature goes through
//! [`normalize_text`] first: accents folded (NFKD, combining marks dropped),
//! uppercased, separator characters collapsed to single spaces.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

fn rate_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{1,2}[.,]\d{2})\s*%?").expect("valid regex"))
}

fn refin_rate_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)REFIN\s*(\d{1,2}[.,]\d{2})\s*%").expect("valid regex"))
}

fn trailing_rate_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*-\s*\d{1,2}[.,]\d{2}\s*%?\s*$").expect("valid regex"))
}

/// Normalize text for comparison: fold accents, uppercase, replace
/// separator punctuation with spaces, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let folded: String = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();

    let mut out = String::with_capacity(folded.len());
    let mut last_was_space = true;
    for c in folded.chars() {
        let mapped = match c {
            '|' | '\\' | '/' | '·' | '•' | ',' | ':' | ';' | '(' | ')' | '[' | ']' | '{'
            | '}' | '-' | '_' => ' ',
            other => other,
        };
        if mapped.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            out.extend(mapped.to_uppercase());
            last_was_space = false;
        }
    }
    out.trim_end().to_string()
}

/// Token set over normalized text, for Jaccard similarity.
///
/// Edge dots are stripped so `"GOV."` and `"GOV"` compare equal while a rate
/// token like `"2.50%"` keeps its inner dot.
pub fn tokens(s: &str) -> HashSet<String> {
    normalize_text(s)
        .split_whitespace()
        .map(|t| t.trim_matches('.').to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Jaccard similarity of two token sets. Empty sets score 0.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    intersection / union
}

const UFS: [&str; 27] = [
    "AC", "AL", "AP", "AM", "BA", "CE", "DF", "ES", "GO", "MA", "MT", "MS", "MG", "PA", "PB",
    "PR", "PE", "PI", "RJ", "RN", "RS", "RO", "RR", "SC", "SP", "SE", "TO",
];

const STATE_TO_UF: [(&str, &str); 27] = [
    ("ACRE", "AC"),
    ("ALAGOAS", "AL"),
    ("AMAPA", "AP"),
    ("AMAZONAS", "AM"),
    ("BAHIA", "BA"),
    ("CEARA", "CE"),
    ("DISTRITO FEDERAL", "DF"),
    ("ESPIRITO SANTO", "ES"),
    ("GOIAS", "GO"),
    ("MARANHAO", "MA"),
    ("MATO GROSSO", "MT"),
    ("MATO GROSSO DO SUL", "MS"),
    ("MINAS GERAIS", "MG"),
    ("PARA", "PA"),
    ("PARAIBA", "PB"),
    ("PARANA", "PR"),
    ("PERNAMBUCO", "PE"),
    ("PIAUI", "PI"),
    ("RIO DE JANEIRO", "RJ"),
    ("RIO GRANDE DO NORTE", "RN"),
    ("RIO GRANDE DO SUL", "RS"),
    ("RONDONIA", "RO"),
    ("RORAIMA", "RR"),
    ("SANTA CATARINA", "SC"),
    ("SAO PAULO", "SP"),
    ("SERGIPE", "SE"),
    ("TOCANTINS", "TO"),
];

/// Normalize a UF: accepts the two-letter code or a full state name.
pub fn normalize_uf(uf: &str) -> Option<&'static str> {
    let u = normalize_text(uf);
    if let Some(code) = UFS.iter().find(|c| **c == u) {
        return Some(code);
    }
    STATE_TO_UF
        .iter()
        .find(|(state, _)| *state == u)
        .map(|(_, code)| *code)
}

/// Find a UF anywhere in free text. Explicit two-letter codes win over full
/// state names; among state names the longest match wins, so `MATO GROSSO DO
/// SUL` is never read as `MATO GROSSO`.
pub fn find_uf_in_text(text: &str) -> Option<&'static str> {
    let norm = normalize_text(text);
    for tok in norm.split_whitespace().map(|t| t.trim_matches('.')) {
        if let Some(code) = UFS.iter().find(|c| **c == tok) {
            return Some(code);
        }
    }
    let padded = format!(" {norm} ");
    STATE_TO_UF
        .iter()
        .filter(|(state, _)| padded.contains(&format!(" {state} ")))
        .max_by_key(|(state, _)| state.len())
        .map(|(_, code)| *code)
}

/// Extract the LAST rate in the text (`"... 1.49% A 2.50%"` → `2.5`).
///
/// REFIN priority is handled by the caller via [`extract_refin_rate`].
pub fn extract_rate(text: &str) -> Option<f64> {
    rate_regex()
        .captures_iter(text)
        .last()
        .and_then(|cap| cap[1].replace(',', ".").parse().ok())
}

/// Extract the rate that follows `REFIN` (`"... REFIN 1.90%"` → `1.9`).
///
/// Domain rule: in COMBO/PORT nomenclature the REFIN rate is the effective
/// one; the PORT range never defines the final rate.
pub fn extract_refin_rate(text: &str) -> Option<f64> {
    refin_rate_regex()
        .captures(text)
        .and_then(|cap| cap[1].replace(',', ".").parse().ok())
}

/// Format a rate the Brazilian way: `2.5` → `"2,50%"`.
pub fn format_rate_br(rate: f64) -> String {
    format!("{rate:.2}").replace('.', ",") + "%"
}

/// Remove a trailing `- 2,50%` rate suffix from a standardized product name.
pub fn strip_trailing_rate(product: &str) -> String {
    let stripped = trailing_rate_regex().replace(product.trim(), "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
