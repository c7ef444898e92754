//! Complement field construction from PORT/REFIN nomenclature.
//!
//! Only PORTABILIDADE gets the special complement; every other operation
//! carries just the origin id. Rates switch to comma decimals on the way
//! out, the internal table is pt-BR formatted.

use std::sync::OnceLock;

use regex::Regex;

fn port_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)PORT\s+([\d.,]+%\s*A\s*[\d.,]+%)").expect("valid regex")
    })
}

fn refin_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)REFIN\s+([\d.,]+%)").expect("valid regex"))
}

/// Extract the PORT range and REFIN rate from a bank nomenclature,
/// comma-decimal formatted. Either side may be absent.
pub fn port_and_refin(nomenclature: &str) -> (Option<String>, Option<String>) {
    let port = port_regex()
        .captures(nomenclature)
        .map(|cap| cap[1].replace('.', ","));
    let refin = refin_regex()
        .captures(nomenclature)
        .map(|cap| cap[1].replace('.', ","));
    (port, refin)
}

/// Build the Complemento cell for an open row.
pub fn build(origin_id: &str, operation: &str, nomenclature: &str) -> String {
    if !operation.eq_ignore_ascii_case("PORTABILIDADE") {
        return origin_id.to_string();
    }
    match port_and_refin(nomenclature).0 {
        Some(port) => format!("{origin_id} | TX ENTRADA {port} | OBRIGATORIO O REFIN"),
        // no PORT range found: fall back to the plain id
        None => origin_id.to_string(),
    }
}
