//! Shared application state: configuration, the AI engine handle, and the
//! in-memory job store.
//!
//! Jobs are kept for the lifetime of the process with no eviction. This is
//! an internal back-office tool: a handful of runs per day, each record a
//! few kilobytes. Restarting the process clears the store; the dictionary
//! and suggestion log live on disk and survive.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use comtab_ai::{AiEngine, DisabledEngine, OpenAiConfig, OpenAiEngine};
use comtab_banks::UpdateReport;
use parking_lot::RwLock;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Runtime configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root for uploads and generated spreadsheets (one subdirectory per job).
    pub data_dir: PathBuf,
    /// Standardization dictionary (JSON).
    pub dictionary_path: PathBuf,
    /// Suggestion log for human review (CSV).
    pub suggestion_log_path: PathBuf,
}

impl Config {
    /// Resolve configuration from `COMTAB_*` environment variables.
    ///
    /// `COMTAB_DATA_DIR` defaults to `./data`; the dictionary and suggestion
    /// log default to files inside it unless overridden.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("COMTAB_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));
        let dictionary_path = std::env::var("COMTAB_DICTIONARY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("dicionario.json"));
        let suggestion_log_path = std::env::var("COMTAB_SUGGESTION_LOG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("sugestoes.csv"));
        Self {
            data_dir,
            dictionary_path,
            suggestion_log_path,
        }
    }
}

/// Build the AI engine from the environment.
///
/// With `COMTAB_AI_API_KEY` set, a chat-completions client pointed at
/// `COMTAB_AI_BASE_URL` (default OpenAI) using `COMTAB_AI_MODEL` if given.
/// Without a key, or if the client fails to build, the disabled engine:
/// standardization then runs on rules alone.
pub fn engine_from_env() -> Arc<dyn AiEngine> {
    let key = match std::env::var("COMTAB_AI_API_KEY") {
        Ok(k) if !k.trim().is_empty() => k,
        _ => {
            tracing::info!("COMTAB_AI_API_KEY not set; AI engine disabled");
            return Arc::new(DisabledEngine);
        }
    };
    let base_url = std::env::var("COMTAB_AI_BASE_URL")
        .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
    let mut config = OpenAiConfig::new(base_url, key);
    if let Ok(model) = std::env::var("COMTAB_AI_MODEL") {
        config.model = model;
    }
    match OpenAiEngine::new(config) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            tracing::warn!(error = %e, "AI engine unavailable; falling back to rules only");
            Arc::new(DisabledEngine)
        }
    }
}

/// Lifecycle of an update job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

/// One submitted update run.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: Uuid,
    pub institution: String,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub report: Option<UpdateReport>,
    pub error: Option<String>,
    pub output_path: PathBuf,
}

/// Thread-safe in-memory job registry.
#[derive(Clone, Default)]
pub struct JobStore {
    inner: Arc<RwLock<HashMap<Uuid, JobRecord>>>,
}

impl JobStore {
    pub fn insert(&self, record: JobRecord) {
        self.inner.write().insert(record.id, record);
    }

    pub fn get(&self, id: &Uuid) -> Option<JobRecord> {
        self.inner.read().get(id).cloned()
    }

    pub fn mark_running(&self, id: &Uuid) {
        if let Some(job) = self.inner.write().get_mut(id) {
            job.status = JobStatus::Running;
        }
    }

    pub fn mark_succeeded(&self, id: &Uuid, report: UpdateReport) {
        if let Some(job) = self.inner.write().get_mut(id) {
            job.status = JobStatus::Succeeded;
            job.finished_at = Some(Utc::now());
            job.report = Some(report);
        }
    }

    pub fn mark_failed(&self, id: &Uuid, error: String) {
        if let Some(job) = self.inner.write().get_mut(id) {
            job.status = JobStatus::Failed;
            job.finished_at = Some(Utc::now());
            job.error = Some(error);
        }
    }

    /// Job counts per status, for the metrics scrape.
    pub fn counts_by_status(&self) -> HashMap<JobStatus, usize> {
        let mut counts = HashMap::new();
        for job in self.inner.read().values() {
            *counts.entry(job.status).or_insert(0) += 1;
        }
        counts
    }
}

/// Shared application state, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub jobs: JobStore,
    pub engine: Arc<dyn AiEngine>,
    /// Held across each pipeline run. All jobs share one dictionary file
    /// and one suggestion log; two concurrent load→seed→save cycles would
    /// let the last rename discard the other run's seeded entries.
    pub pipeline_lock: Arc<tokio::sync::Mutex<()>>,
}

impl AppState {
    pub fn new(config: Config, engine: Arc<dyn AiEngine>) -> Self {
        Self {
            config: Arc::new(config),
            jobs: JobStore::default(),
            engine,
            pipeline_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: JobStatus) -> JobRecord {
        JobRecord {
            id: Uuid::new_v4(),
            institution: "HOPE".into(),
            status,
            submitted_at: Utc::now(),
            finished_at: None,
            report: None,
            error: None,
            output_path: PathBuf::from("delta.xlsx"),
        }
    }

    #[test]
    fn job_store_transitions() {
        let store = JobStore::default();
        let job = record(JobStatus::Queued);
        let id = job.id;
        store.insert(job);

        store.mark_running(&id);
        assert_eq!(store.get(&id).unwrap().status, JobStatus::Running);

        store.mark_failed(&id, "boom".into());
        let failed = store.get(&id).unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("boom"));
        assert!(failed.finished_at.is_some());
    }

    #[test]
    fn unknown_job_is_none() {
        let store = JobStore::default();
        assert!(store.get(&Uuid::new_v4()).is_none());
    }

    #[test]
    fn counts_by_status_groups_jobs() {
        let store = JobStore::default();
        store.insert(record(JobStatus::Queued));
        store.insert(record(JobStatus::Queued));
        store.insert(record(JobStatus::Failed));
        let counts = store.counts_by_status();
        assert_eq!(counts.get(&JobStatus::Queued), Some(&2));
        assert_eq!(counts.get(&JobStatus::Failed), Some(&1));
        assert_eq!(counts.get(&JobStatus::Succeeded), None);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Succeeded).unwrap(),
            "\"succeeded\""
        );
    }
}
