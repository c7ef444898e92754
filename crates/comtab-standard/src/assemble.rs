//! Assembly of a standardized entry from signals, rate and the cache index.
//!
//! House naming conventions live here: how an agreement is spelled per
//! institutional kind, which family/group each kind maps to, and how the
//! final product name is composed. When the cache already knows the
//! agreement, its own naming habits win over the generic conventions.

use crate::dictionary::StandardEntry;
use crate::index::CacheIndex;
use crate::normalize::format_rate_br;
use crate::signals::{InstitutionKind, Signals};

/// Family and agreement group per institutional kind.
pub fn family_group(kind: InstitutionKind) -> (&'static str, &'static str) {
    match kind {
        InstitutionKind::Gov => ("GOVERNOS", "ESTADUAL"),
        InstitutionKind::Pref => ("PREFEITURAS", "PREFEITURAS"),
        InstitutionKind::Tj => ("TRIBUNAIS", "TRIBUNAIS"),
        InstitutionKind::Siape => ("FEDERAL", "FEDERAL"),
        InstitutionKind::Other => ("OUTROS", "OUTROS"),
    }
}

/// Compose the official agreement name for signals the cache does not know.
pub fn compose_agreement(signals: &Signals) -> String {
    let base = signals.base_name.as_deref().unwrap_or("").trim();
    match signals.kind {
        InstitutionKind::Gov => match signals.uf.as_deref() {
            Some(uf) => format!("GOV-{uf}"),
            None => "GOV".to_string(),
        },
        InstitutionKind::Pref => {
            let mut name = format!("PREF. {base}");
            if let Some(uf) = signals.uf.as_deref() {
                name.push(' ');
                name.push_str(uf);
            }
            name.trim().to_string()
        }
        InstitutionKind::Tj => match signals.uf.as_deref() {
            Some(uf) => format!("TJ | {uf}"),
            None => "TJ".to_string(),
        },
        InstitutionKind::Siape => "SIAPE".to_string(),
        InstitutionKind::Other => {
            if base.is_empty() {
                "OUTROS".to_string()
            } else {
                base.to_string()
            }
        }
    }
}

/// Product prefix when the cache has no naming history for the agreement.
fn default_prefix(kind: InstitutionKind, agreement: &str) -> String {
    match kind {
        // agreements are "GOV-SP", products read "GOV. SP"
        InstitutionKind::Gov => agreement.replacen("GOV-", "GOV. ", 1),
        _ => agreement.to_string(),
    }
}

/// Build the full standardized entry.
///
/// `official_agreement` is set when resolution already pinned the agreement
/// (signature hit, candidate match or guided selection); `raw_text` feeds the
/// sub-product leak filter of [`CacheIndex::best_prefix`].
pub fn assemble(
    signals: &Signals,
    rate: f64,
    official_agreement: Option<&str>,
    index: &CacheIndex,
    raw_text: &str,
) -> StandardEntry {
    let agreement = match official_agreement {
        Some(a) => a.to_string(),
        None => compose_agreement(signals),
    };

    let (family, group) = index
        .metadata(&agreement)
        .map(|(f, g)| (f.to_string(), g.to_string()))
        .unwrap_or_else(|| {
            let (f, g) = family_group(signals.kind);
            (f.to_string(), g.to_string())
        });

    let mut prefix = index
        .best_prefix(&agreement, raw_text)
        .unwrap_or_else(|| default_prefix(signals.kind, &agreement));

    if let Some(sub) = signals.subproduct.as_deref() {
        if !crate::normalize::normalize_text(&prefix).contains(sub) {
            prefix = format!("{prefix} - {sub}");
        }
    }

    StandardEntry {
        product: format!("{prefix} - {}", format_rate_br(rate)),
        agreement,
        family,
        group,
    }
}
