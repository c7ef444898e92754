//! The manual dictionary: the only source of final standardized text.
//!
//! A JSON file mapping `ID|RATE|TERM` keys to approved entries. Entries get
//! in exactly two ways: seeding from the internal table of a previous cycle,
//! and promotion of human-approved suggestions. Nothing in the pipeline ever
//! writes engine output here.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One approved standardization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardEntry {
    /// Standardized product name, e.g. `"GOV. SP - 2,50%"`.
    #[serde(rename = "produto_padronizado")]
    pub product: String,
    /// Standardized agreement name, e.g. `"GOV-SP"`.
    #[serde(rename = "convenio_padronizado")]
    pub agreement: String,
    /// Product family, e.g. `"GOVERNOS"`.
    #[serde(rename = "familia_produto")]
    pub family: String,
    /// Agreement group, e.g. `"ESTADUAL"`.
    #[serde(rename = "grupo_convenio")]
    pub group: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DictionaryError {
    #[error("dictionary I/O at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("dictionary is not valid JSON at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Compose the cache key from the bank's own product identity: origin id,
/// rate and term, each normalized so formatting noise does not split keys.
/// Term drops whitespace and the `MESES` month suffix some exports carry.
pub fn cache_key(id: &str, rate: f64, term: &str) -> String {
    format!(
        "{}|{:.2}|{}",
        id.trim().to_uppercase(),
        rate,
        term.trim().to_uppercase().replace("MESES", "").replace(' ', "")
    )
}

/// In-memory dictionary, ordered by key so saves are diff-friendly.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    entries: BTreeMap<String, StandardEntry>,
}

impl Dictionary {
    /// Load from `path`. A missing file is an empty dictionary, not an
    /// error; a corrupt one loads empty with a warning, so a bad save never
    /// blocks a run (the file is rebuilt by seeding and promotion).
    pub fn load(path: &Path) -> Result<Self, DictionaryError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(DictionaryError::Io { path: path.to_path_buf(), source: e });
            }
        };
        match serde_json::from_str(&text) {
            Ok(entries) => Ok(Self { entries }),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "corrupt dictionary, starting empty");
                Ok(Self::default())
            }
        }
    }

    /// Save atomically: write to a sibling `.tmp` file, then rename over the
    /// target, so a crash mid-write never leaves a truncated dictionary.
    pub fn save(&self, path: &Path) -> Result<(), DictionaryError> {
        let io_err = |source| DictionaryError::Io { path: path.to_path_buf(), source };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| DictionaryError::Json { path: path.to_path_buf(), source: e })?;
        {
            let mut f = fs::File::create(&tmp).map_err(io_err)?;
            f.write_all(json.as_bytes()).map_err(io_err)?;
            f.sync_all().map_err(io_err)?;
        }
        fs::rename(&tmp, path).map_err(io_err)
    }

    pub fn get(&self, key: &str) -> Option<&StandardEntry> {
        self.entries.get(key)
    }

    /// Insert an entry. Returns `true` if the key was new.
    pub fn upsert(&mut self, key: String, entry: StandardEntry) -> bool {
        self.entries.insert(key, entry).is_none()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &StandardEntry)> {
        self.entries.iter()
    }
}
