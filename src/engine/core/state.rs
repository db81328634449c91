use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::types::{ExportJob, JobState};

/// Schema marker written into every persisted record
pub const STATE_SCHEMA_VERSION: u32 = 1;

/// Default retention window for persisted jobs, in hours
pub const DEFAULT_RETENTION_HOURS: i64 = 24;

/// Persisted queue record, one per session scope
#[derive(Debug, Serialize, Deserialize)]
pub struct PersistedQueue {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub jobs: Vec<ExportJob>,
}

/// Get the default path for the queue state file
pub fn default_state_path() -> Result<PathBuf> {
    let config_dir = if cfg!(target_os = "macos") {
        dirs::home_dir()
            .context("Could not determine home directory")?
            .join(".config")
            .join("exportq")
    } else if cfg!(target_os = "windows") {
        dirs::config_dir()
            .context("Could not determine config directory")?
            .join("exportq")
    } else {
        // Linux and others
        dirs::config_dir()
            .context("Could not determine config directory")?
            .join("exportq")
    };

    Ok(config_dir.join("queue_state.json"))
}

/// Durable medium for the job list.
///
/// `save` is called after every queue mutation. `load` rehydrates on open
/// and owns the recovery rules whatever the medium: expired jobs are pruned
/// by `created_at`, interrupted `Processing` jobs restart as `Queued`, and
/// the result comes back in `created_at` order. Implementations apply those
/// rules via [`restore_jobs`] rather than re-deriving them.
pub trait StateStore: Send + Sync {
    /// Persist the full job list, replacing any previous record
    fn save(&self, jobs: &[ExportJob]) -> Result<()>;

    /// Rehydrate the job list as of `now`.
    ///
    /// A broken store must never block the export feature, so read and
    /// decode failures yield an empty queue instead of an error.
    fn load(&self, now: DateTime<Utc>) -> Vec<ExportJob>;
}

/// Apply the recovery rules to a freshly loaded job list: prune entries
/// older than `retention`, requeue interrupted `Processing` jobs at zero
/// progress, and sort by `created_at`.
pub fn restore_jobs(
    mut jobs: Vec<ExportJob>,
    now: DateTime<Utc>,
    retention: Duration,
) -> Vec<ExportJob> {
    // Prune first, so an expired Processing job is dropped rather than
    // requeued
    let before = jobs.len();
    jobs.retain(|job| now - job.created_at <= retention);
    if jobs.len() < before {
        debug!("pruned {} expired job(s) from queue state", before - jobs.len());
    }

    // A Processing state is only meaningful while the process that set
    // it is alive; restart these from zero
    for job in &mut jobs {
        if job.state == JobState::Processing {
            job.state = JobState::Queued;
            job.progress_pct = 0.0;
        }
    }

    jobs.sort_by_key(|job| job.created_at);
    jobs
}

/// File-backed [`StateStore`] holding one pretty-printed JSON record
#[derive(Debug, Clone)]
pub struct QueueStore {
    path: PathBuf,
    retention: Duration,
}

impl QueueStore {
    /// Open the store at the default per-user location
    pub fn open_default() -> Result<Self> {
        Ok(Self::at(default_state_path()?))
    }

    /// Open the store at an explicit path
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            retention: Duration::hours(DEFAULT_RETENTION_HOURS),
        }
    }

    /// Override the retention window
    pub fn with_retention_hours(mut self, hours: i64) -> Self {
        self.retention = Duration::hours(hours);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Serialize the full job list to disk
    pub fn save(&self, jobs: &[ExportJob]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create state directory: {}", parent.display())
            })?;
        }

        let record = PersistedQueue {
            version: STATE_SCHEMA_VERSION,
            saved_at: Utc::now(),
            jobs: jobs.to_vec(),
        };

        let json =
            serde_json::to_string_pretty(&record).context("Failed to serialize queue state")?;

        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write queue state: {}", self.path.display()))?;

        Ok(())
    }

    /// Load the job list, pruning and normalizing.
    ///
    /// An unreadable or incompatible record yields an empty queue with a
    /// warning; a broken store must never block the export feature.
    pub fn load(&self, now: DateTime<Utc>) -> Vec<ExportJob> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(
                    "could not read queue state {}: {e}; starting empty",
                    self.path.display()
                );
                return Vec::new();
            }
        };

        let record: PersistedQueue = match serde_json::from_str(&contents) {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    "could not parse queue state {}: {e}; starting empty",
                    self.path.display()
                );
                return Vec::new();
            }
        };

        if record.version != STATE_SCHEMA_VERSION {
            warn!(
                "queue state {} has schema version {} (expected {}); starting empty",
                self.path.display(),
                record.version,
                STATE_SCHEMA_VERSION
            );
            return Vec::new();
        }

        restore_jobs(record.jobs, now, self.retention)
    }

    /// Remove the persisted record, if any
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| {
                format!("Failed to remove queue state: {}", self.path.display())
            }),
        }
    }
}

impl StateStore for QueueStore {
    fn save(&self, jobs: &[ExportJob]) -> Result<()> {
        QueueStore::save(self, jobs)
    }

    fn load(&self, now: DateTime<Utc>) -> Vec<ExportJob> {
        QueueStore::load(self, now)
    }
}
