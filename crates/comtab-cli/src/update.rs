//! `comtab update` — run the commissioning update pipeline in-process.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use comtab_banks::{run_update, UpdateJob};

use crate::build_engine;

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Institution whose report is being processed.
    #[arg(long, default_value = "HOPE")]
    pub institution: String,

    /// The bank's product report (.xlsx).
    #[arg(long)]
    pub bank_file: PathBuf,

    /// The internal commissioning table (.xlsx).
    #[arg(long)]
    pub internal_file: PathBuf,

    /// Where to write the delta spreadsheet.
    #[arg(long, default_value = "atualizacao.xlsx")]
    pub output: PathBuf,

    /// Standardization dictionary (JSON); created if missing.
    #[arg(long, default_value = "data/dicionario.json")]
    pub dictionary: PathBuf,

    /// Suggestion log for human review (CSV); appended to.
    #[arg(long, default_value = "data/sugestoes.csv")]
    pub suggestion_log: PathBuf,

    /// Chat-completions base URL.
    #[arg(long)]
    pub ai_base_url: Option<String>,

    /// Model name override.
    #[arg(long)]
    pub ai_model: Option<String>,

    /// API key; falls back to COMTAB_AI_API_KEY.
    #[arg(long)]
    pub ai_api_key: Option<String>,
}

/// Run the pipeline and print the report as JSON on stdout.
pub async fn run(args: &UpdateArgs) -> anyhow::Result<u8> {
    let engine = build_engine(
        args.ai_base_url.as_deref(),
        args.ai_model.as_deref(),
        args.ai_api_key.as_deref(),
    );
    let job = UpdateJob {
        institution: args.institution.clone(),
        bank_path: args.bank_file.clone(),
        internal_path: args.internal_file.clone(),
        output_path: args.output.clone(),
        dictionary_path: args.dictionary.clone(),
        suggestion_log_path: args.suggestion_log.clone(),
        engine: Arc::clone(&engine),
    };

    let report = run_update(job).await.context("update pipeline failed")?;
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("serializing report")?
    );
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use comtab_banks::hope::mapper::{bank_columns, internal_columns};
    use comtab_banks::sheet::write_rows;

    #[tokio::test]
    async fn runs_end_to_end_with_disabled_engine() {
        let dir = tempfile::tempdir().unwrap();
        let bank_path = dir.path().join("banco.xlsx");
        let internal_path = dir.path().join("interno.xlsx");
        write_rows(
            &bank_path,
            &[
                bank_columns::ORIGIN_ID,
                bank_columns::RATE,
                bank_columns::TERM_START,
                bank_columns::TERM_END,
                bank_columns::PRODUCT,
                bank_columns::AGREEMENT,
                bank_columns::CONTRACT_TYPE,
                bank_columns::BANK,
                bank_columns::COMMISSION,
            ],
            &[[
                (bank_columns::ORIGIN_ID, "1"),
                (bank_columns::RATE, "2,50%"),
                (bank_columns::TERM_START, "1"),
                (bank_columns::TERM_END, "96"),
                (bank_columns::PRODUCT, "GOV SAO PAULO 2.50%"),
                (bank_columns::AGREEMENT, "GOV SP"),
                (bank_columns::CONTRACT_TYPE, "NOVO"),
                (bank_columns::BANK, "HOPE"),
                (bank_columns::COMMISSION, "8,50"),
            ]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()],
        )
        .unwrap();
        write_rows(
            &internal_path,
            &[
                internal_columns::INSTITUTION,
                internal_columns::PRODUCT,
                internal_columns::AGREEMENT,
                internal_columns::OPERATION,
                internal_columns::CURRENT_INSTALLMENTS,
                internal_columns::COMMISSION,
                internal_columns::BANK_TABLE_ID,
                internal_columns::END,
            ],
            &[],
        )
        .unwrap();

        let args = UpdateArgs {
            institution: "HOPE".into(),
            bank_file: bank_path,
            internal_file: internal_path,
            output: dir.path().join("saida.xlsx"),
            dictionary: dir.path().join("dicionario.json"),
            suggestion_log: dir.path().join("sugestoes.csv"),
            ai_base_url: None,
            ai_model: None,
            ai_api_key: None,
        };
        let code = run(&args).await.unwrap();
        assert_eq!(code, 0);
        assert!(args.output.exists());
    }

    #[tokio::test]
    async fn unknown_institution_fails() {
        let dir = tempfile::tempdir().unwrap();
        let args = UpdateArgs {
            institution: "ACME".into(),
            bank_file: dir.path().join("banco.xlsx"),
            internal_file: dir.path().join("interno.xlsx"),
            output: dir.path().join("saida.xlsx"),
            dictionary: dir.path().join("dicionario.json"),
            suggestion_log: dir.path().join("sugestoes.csv"),
            ai_base_url: None,
            ai_model: None,
            ai_api_key: None,
        };
        assert!(run(&args).await.is_err());
    }
}
