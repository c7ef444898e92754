//! Promotion: feed reviewed suggestions back into the dictionary.
//!
//! Reads the suggestion CSV after human review. `APROVADO` rows enter the
//! dictionary as suggested; `CORRIGIDO` rows enter with the corrected fields
//! (empty corrected fields fall back to the suggested ones). Everything else
//! is left alone. Promotion overwrites existing keys: a human verdict always
//! beats whatever the dictionary held.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::dictionary::{Dictionary, StandardEntry};
use crate::normalize::normalize_text;
use crate::suggestion_log::SuggestionRecord;

#[derive(Debug, thiserror::Error)]
pub enum PromoteError {
    #[error("review CSV at {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("review CSV at {path}: row missing cache key")]
    MissingKey { path: PathBuf },
}

/// What a promotion run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PromotionReport {
    pub approved: usize,
    pub corrected: usize,
    pub skipped: usize,
}

/// Apply a reviewed CSV to the dictionary. Saving is the caller's job.
pub fn promote(path: &Path, dict: &mut Dictionary) -> Result<PromotionReport, PromoteError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .map_err(|source| PromoteError::Csv { path: path.to_path_buf(), source })?;

    let mut report = PromotionReport::default();
    for row in reader.deserialize::<SuggestionRecord>() {
        let row = row.map_err(|source| PromoteError::Csv { path: path.to_path_buf(), source })?;
        let status = normalize_text(&row.status);
        let verdict = match status.as_str() {
            "APROVADO" => Verdict::Approved,
            "CORRIGIDO" => Verdict::Corrected,
            _ => {
                report.skipped += 1;
                continue;
            }
        };
        if row.chave_cache.trim().is_empty() {
            return Err(PromoteError::MissingKey { path: path.to_path_buf() });
        }

        let pick = |corrected: &str, suggested: &str| {
            let c = corrected.trim();
            if c.is_empty() { suggested.trim().to_string() } else { c.to_string() }
        };
        let entry = match verdict {
            Verdict::Approved => StandardEntry {
                product: row.produto_sugerido.trim().to_string(),
                agreement: row.convenio_sugerido.trim().to_string(),
                family: row.familia_sugerida.trim().to_string(),
                group: row.grupo_sugerido.trim().to_string(),
            },
            Verdict::Corrected => StandardEntry {
                product: pick(&row.corrigido_produto, &row.produto_sugerido),
                agreement: pick(&row.corrigido_convenio, &row.convenio_sugerido),
                family: pick(&row.corrigido_familia, &row.familia_sugerida),
                group: pick(&row.corrigido_grupo, &row.grupo_sugerido),
            },
        };
        dict.upsert(row.chave_cache.trim().to_string(), entry);
        match verdict {
            Verdict::Approved => report.approved += 1,
            Verdict::Corrected => report.corrected += 1,
        }
    }

    tracing::info!(
        approved = report.approved,
        corrected = report.corrected,
        skipped = report.skipped,
        "promotion applied"
    );
    Ok(report)
}

#[derive(Clone, Copy)]
enum Verdict {
    Approved,
    Corrected,
}
