//! `comtab promote` — feed a reviewed suggestion CSV into the dictionary.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use comtab_standard::{promote, Dictionary};

#[derive(Args, Debug)]
pub struct PromoteArgs {
    /// The reviewed suggestion CSV.
    #[arg(long)]
    pub corrected_file: PathBuf,

    /// Standardization dictionary (JSON) to update.
    #[arg(long, default_value = "data/dicionario.json")]
    pub dictionary: PathBuf,
}

/// Apply the review and print what happened as JSON on stdout.
pub fn run(args: &PromoteArgs) -> anyhow::Result<u8> {
    let mut dict = Dictionary::load(&args.dictionary)
        .with_context(|| format!("loading dictionary {}", args.dictionary.display()))?;
    let report = promote(&args.corrected_file, &mut dict).context("promotion failed")?;
    dict.save(&args.dictionary)
        .with_context(|| format!("saving dictionary {}", args.dictionary.display()))?;

    println!(
        "{}",
        serde_json::json!({
            "approved": report.approved,
            "corrected": report.corrected,
            "skipped": report.skipped,
            "dictionary_entries": dict.len(),
        })
    );
    Ok(0)
}
