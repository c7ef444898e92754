//! Suggestion log: semicolon-separated CSV of rows the pipeline could not
//! resolve from the dictionary alone.
//!
//! Humans review this file, mark rows `APROVADO` or `CORRIGIDO`, and the
//! promotion flow feeds the verdicts back into the dictionary. This is the
//! only bridge between engine/rule output and final standardized text.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dictionary::StandardEntry;

/// One suggestion awaiting review.
#[derive(Debug, Clone)]
pub struct Suggestion {
    pub cache_key: String,
    pub product_raw: String,
    pub agreement_raw: String,
    pub entry: StandardEntry,
    /// What produced the suggestion ("REGRAS", engine name).
    pub origin: String,
    pub confidence: f64,
}

/// CSV row shape, shared by the log writer and the promotion reader.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct SuggestionRecord {
    pub chave_cache: String,
    pub produto_original: String,
    pub convenio_original: String,
    pub produto_sugerido: String,
    pub convenio_sugerido: String,
    pub familia_sugerida: String,
    pub grupo_sugerido: String,
    pub origem: String,
    pub confianca: f64,
    pub status: String,
    #[serde(default)]
    pub corrigido_produto: String,
    #[serde(default)]
    pub corrigido_convenio: String,
    #[serde(default)]
    pub corrigido_familia: String,
    #[serde(default)]
    pub corrigido_grupo: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SuggestionLogError {
    #[error("suggestion log I/O at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("suggestion log CSV at {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Appends suggestions to a review CSV, one row per cache key per run.
#[derive(Debug)]
pub struct SuggestionLog {
    path: PathBuf,
    seen: HashSet<String>,
}

impl SuggestionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), seen: HashSet::new() }
    }

    /// Append one suggestion. Returns `false` when the key was already
    /// logged in this run.
    pub fn log(&mut self, suggestion: &Suggestion) -> Result<bool, SuggestionLogError> {
        if !self.seen.insert(suggestion.cache_key.clone()) {
            return Ok(false);
        }

        let io_err = |source| SuggestionLogError::Io { path: self.path.clone(), source };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let is_new = !self.path.exists();
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;

        let mut writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .has_headers(is_new)
            .from_writer(file);
        writer
            .serialize(SuggestionRecord {
                chave_cache: suggestion.cache_key.clone(),
                produto_original: suggestion.product_raw.clone(),
                convenio_original: suggestion.agreement_raw.clone(),
                produto_sugerido: suggestion.entry.product.clone(),
                convenio_sugerido: suggestion.entry.agreement.clone(),
                familia_sugerida: suggestion.entry.family.clone(),
                grupo_sugerido: suggestion.entry.group.clone(),
                origem: suggestion.origin.clone(),
                confianca: suggestion.confidence,
                status: "PENDENTE".into(),
                corrigido_produto: String::new(),
                corrigido_convenio: String::new(),
                corrigido_familia: String::new(),
                corrigido_grupo: String::new(),
            })
            .map_err(|source| SuggestionLogError::Csv { path: self.path.clone(), source })?;
        writer
            .flush()
            .map_err(|source| SuggestionLogError::Io { path: self.path.clone(), source })?;
        Ok(true)
    }

    /// Number of distinct suggestions logged in this run.
    pub fn logged(&self) -> usize {
        self.seen.len()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suggestion(key: &str) -> Suggestion {
        Suggestion {
            cache_key: key.into(),
            product_raw: "GOV SP 2.50%".into(),
            agreement_raw: "GOV SP".into(),
            entry: StandardEntry {
                product: "GOV. SP - 2,50%".into(),
                agreement: "GOV-SP".into(),
                family: "GOVERNOS".into(),
                group: "ESTADUAL".into(),
            },
            origin: "REGRAS".into(),
            confidence: 0.7,
        }
    }

    #[test]
    fn writes_header_once_and_dedupes_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sugestoes.csv");
        let mut log = SuggestionLog::new(&path);

        assert!(log.log(&suggestion("A|2.50|1-96")).unwrap());
        assert!(!log.log(&suggestion("A|2.50|1-96")).unwrap());
        assert!(log.log(&suggestion("B|2.50|1-96")).unwrap());
        assert_eq!(log.logged(), 2);

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3); // header + 2 rows
        assert!(lines[0].starts_with("chave_cache;produto_original"));
        assert!(lines[1].contains("PENDENTE"));
    }

    #[test]
    fn appends_without_duplicate_header_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sugestoes.csv");

        SuggestionLog::new(&path).log(&suggestion("A|2.50|1-96")).unwrap();
        SuggestionLog::new(&path).log(&suggestion("C|2.50|1-96")).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text.lines().filter(|l| l.starts_with("chave_cache")).count(),
            1
        );
        assert_eq!(text.lines().count(), 3);
    }
}
