//! The full update orchestration: read, seed, map, diff, write, report.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use comtab_ai::AiEngine;
use comtab_core::{diff, Action};
use comtab_standard::{
    Dictionary, DictionaryError, Metrics, Standardizer, SuggestionLog, SuggestionLogError,
};
use serde::Serialize;

use crate::hope;
use crate::sheet::{Row, SheetError};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("unsupported institution: {name}")]
    UnsupportedInstitution { name: String },
    #[error(transparent)]
    Sheet(#[from] SheetError),
    #[error(transparent)]
    Dictionary(#[from] DictionaryError),
    #[error(transparent)]
    SuggestionLog(#[from] SuggestionLogError),
}

/// Everything one update run needs.
#[derive(Clone)]
pub struct UpdateJob {
    pub institution: String,
    pub bank_path: PathBuf,
    pub internal_path: PathBuf,
    pub output_path: PathBuf,
    pub dictionary_path: PathBuf,
    pub suggestion_log_path: PathBuf,
    pub engine: Arc<dyn AiEngine>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ActionCounts {
    pub open: usize,
    pub close: usize,
    pub update: usize,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CacheStats {
    pub initial: usize,
    pub new: usize,
    #[serde(rename = "final")]
    pub final_count: usize,
}

/// What the run did, returned to the API/CLI caller.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateReport {
    pub institution: String,
    pub bank_rows: usize,
    pub internal_rows: usize,
    pub output_rows: usize,
    pub actions: ActionCounts,
    pub cache: CacheStats,
    pub standardization: Metrics,
}

pub async fn run_update(job: UpdateJob) -> Result<UpdateReport, PipelineError> {
    let institution = job.institution.trim().to_uppercase();
    if institution != "HOPE" {
        return Err(PipelineError::UnsupportedInstitution { name: institution });
    }
    tracing::info!(%institution, "starting commissioning update");

    let bank_rows = hope::reader::read_bank_report(&job.bank_path)?;
    tracing::info!(rows = bank_rows.len(), "bank report loaded");
    let internal_rows = hope::reader::read_internal_table(&job.internal_path)?;
    tracing::info!(rows = internal_rows.len(), "internal table loaded");

    let dict = Dictionary::load(&job.dictionary_path)?;
    let cache_initial = dict.len();
    let mut standardizer = Standardizer::new(
        dict,
        Arc::clone(&job.engine),
        SuggestionLog::new(&job.suggestion_log_path),
    );

    let cache_new = standardizer.seed_from_internal(&internal_rows);
    if cache_new > 0 {
        standardizer.dictionary().save(&job.dictionary_path)?;
    }

    let internal_items = hope::mapper::internal_items(&internal_rows);
    tracing::info!(items = internal_items.len(), "internal items mapped");
    let bank_items = hope::mapper::bank_items(&bank_rows, &mut standardizer).await?;
    tracing::info!(items = bank_items.len(), "bank items mapped and standardized");

    let actions = diff(&internal_items, &bank_items);
    let mut counts = ActionCounts::default();
    for a in &actions {
        match a.action {
            Action::Open => counts.open += 1,
            Action::Close => counts.close += 1,
            Action::CloseOpen => counts.update += 1,
        }
    }
    tracing::info!(
        open = counts.open,
        close = counts.close,
        update = counts.update,
        "diff computed"
    );

    let today = Local::now().date_naive();
    let mut output: Vec<Row> = Vec::new();
    for action in &actions {
        match action.action {
            Action::Open => {
                if let Some(bank) = &action.bank {
                    output.push(hope::rules::open_row(bank, today));
                }
            }
            Action::Close => {
                if let Some(internal) = &action.internal {
                    output.push(hope::rules::close_row(internal, today));
                }
            }
            Action::CloseOpen => {
                // close always precedes the reopen
                if let (Some(internal), Some(bank)) = (&action.internal, &action.bank) {
                    output.push(hope::rules::close_row(internal, today));
                    output.push(hope::rules::open_row(bank, today));
                }
            }
        }
    }

    hope::writer::write_delta(&output, &job.output_path)?;
    tracing::info!(rows = output.len(), path = %job.output_path.display(), "delta spreadsheet written");

    let metrics = standardizer.metrics;
    if metrics.suggestions_logged > 0 {
        tracing::info!(
            suggestions = metrics.suggestions_logged,
            path = %job.suggestion_log_path.display(),
            "suggestions recorded for review"
        );
    }

    Ok(UpdateReport {
        institution,
        bank_rows: bank_rows.len(),
        internal_rows: internal_rows.len(),
        output_rows: output.len(),
        actions: counts,
        cache: CacheStats {
            initial: cache_initial,
            new: cache_new,
            final_count: standardizer.dictionary().len(),
        },
        standardization: metrics,
    })
}

/// Institutions the pipeline accepts, for request validation.
pub fn supported_institutions() -> &'static [&'static str] {
    &["HOPE"]
}

pub fn is_supported(institution: &str) -> bool {
    let name = institution.trim().to_uppercase();
    supported_institutions().iter().any(|i| *i == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hope::mapper::{bank_columns, internal_columns};
    use crate::sheet::write_rows;
    use comtab_ai::DisabledEngine;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    const BANK_COLS: [&str; 9] = [
        bank_columns::ORIGIN_ID,
        bank_columns::RATE,
        bank_columns::TERM_START,
        bank_columns::TERM_END,
        bank_columns::PRODUCT,
        bank_columns::AGREEMENT,
        bank_columns::CONTRACT_TYPE,
        bank_columns::BANK,
        bank_columns::COMMISSION,
    ];

    const INTERNAL_COLS: [&str; 9] = [
        "ID",
        internal_columns::INSTITUTION,
        internal_columns::PRODUCT,
        internal_columns::AGREEMENT,
        internal_columns::OPERATION,
        internal_columns::CURRENT_INSTALLMENTS,
        internal_columns::COMMISSION,
        internal_columns::BANK_TABLE_ID,
        internal_columns::END,
    ];

    fn bank_row(id: &str, product: &str, agreement: &str, commission: &str) -> Row {
        row(&[
            (bank_columns::ORIGIN_ID, id),
            (bank_columns::RATE, "2,50%"),
            (bank_columns::TERM_START, "1"),
            (bank_columns::TERM_END, "96"),
            (bank_columns::PRODUCT, product),
            (bank_columns::AGREEMENT, agreement),
            (bank_columns::CONTRACT_TYPE, "NOVO"),
            (bank_columns::BANK, "HOPE"),
            (bank_columns::COMMISSION, commission),
        ])
    }

    fn internal_row(id: &str, product: &str, agreement: &str, commission: &str) -> Row {
        row(&[
            ("ID", "77"),
            (internal_columns::INSTITUTION, "HOPE"),
            (internal_columns::PRODUCT, product),
            (internal_columns::AGREEMENT, agreement),
            (internal_columns::OPERATION, "NOVO"),
            (internal_columns::CURRENT_INSTALLMENTS, "1-96"),
            (internal_columns::COMMISSION, commission),
            (internal_columns::BANK_TABLE_ID, id),
            (internal_columns::END, ""),
        ])
    }

    fn job(dir: &std::path::Path) -> UpdateJob {
        UpdateJob {
            institution: "hope".into(),
            bank_path: dir.join("banco.xlsx"),
            internal_path: dir.join("interno.xlsx"),
            output_path: dir.join("saida.xlsx"),
            dictionary_path: dir.join("dicionario.json"),
            suggestion_log_path: dir.join("sugestoes.csv"),
            engine: Arc::new(DisabledEngine),
        }
    }

    #[tokio::test]
    async fn open_and_close_flow_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path());

        write_rows(
            &job.bank_path,
            &BANK_COLS,
            &[
                // unchanged row, present on both sides
                bank_row("1", "GOV SAO PAULO 2.50%", "GOV SP", "8,50"),
                // new on the bank side
                bank_row("2", "SIAPE MARGEM LIVRE 1.80%", "SIAPE", "10,00"),
            ],
        )
        .unwrap();
        write_rows(
            &job.internal_path,
            &INTERNAL_COLS,
            &[
                internal_row("1", "GOV. SP - 2,50%", "GOV-SP", "8,50"),
                // gone from the bank report
                internal_row("3", "GOV. RJ - 2,10%", "GOV-RJ", "7,00"),
            ],
        )
        .unwrap();

        let report = run_update(job.clone()).await.unwrap();
        assert_eq!(report.institution, "HOPE");
        assert_eq!(report.bank_rows, 2);
        assert_eq!(report.internal_rows, 2);
        assert_eq!(report.actions.open, 1);
        assert_eq!(report.actions.close, 1);
        assert_eq!(report.actions.update, 0);
        assert_eq!(report.output_rows, 2);

        let output = crate::sheet::read_rows(&job.output_path).unwrap();
        assert_eq!(output.len(), 2);
        let close = output.iter().find(|r| !r["Término"].is_empty()).unwrap();
        assert_eq!(close["Id Tabela Banco"], "3");
        let open = output.iter().find(|r| r["Término"].is_empty()).unwrap();
        assert_eq!(open["Id Tabela Banco"], "2");
        assert_eq!(open["Venda Digital"], "SIM");
    }

    #[tokio::test]
    async fn commission_change_closes_then_opens() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path());

        write_rows(
            &job.bank_path,
            &BANK_COLS,
            &[bank_row("1", "GOV SAO PAULO 2.50%", "GOV SP", "9,00")],
        )
        .unwrap();
        write_rows(
            &job.internal_path,
            &INTERNAL_COLS,
            &[internal_row("1", "GOV. SP - 2,50%", "GOV-SP", "8,50")],
        )
        .unwrap();

        let report = run_update(job.clone()).await.unwrap();
        assert_eq!(report.actions.update, 1);
        assert_eq!(report.output_rows, 2);

        // close precedes open in the written sheet
        let output = crate::sheet::read_rows(&job.output_path).unwrap();
        assert!(!output[0]["Término"].is_empty());
        assert!(output[1]["Término"].is_empty());
        assert_eq!(output[1]["% Comissão"], "9,00");
    }

    #[tokio::test]
    async fn unknown_institution_is_rejected_before_reading_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = job(dir.path());
        job.institution = "ACME".into();
        let err = run_update(job).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::UnsupportedInstitution { ref name } if name == "ACME"
        ));
    }

    #[test]
    fn institution_support_check() {
        assert!(is_supported("hope"));
        assert!(is_supported(" HOPE "));
        assert!(!is_supported("ACME"));
        assert_eq!(supported_institutions(), ["HOPE"]);
    }

    #[tokio::test]
    async fn report_serializes_with_final_cache_key() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path());
        write_rows(&job.bank_path, &BANK_COLS, &[]).unwrap();
        write_rows(&job.internal_path, &INTERNAL_COLS, &[]).unwrap();

        let report = run_update(job).await.unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["cache"]["final"], 0);
        assert_eq!(json["actions"]["open"], 0);
        assert!(json["standardization"].get("cache_queries").is_some());
    }
}
