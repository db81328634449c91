use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::assets::AssetRef;

/// Progress ceiling while a job is still running. Only the terminal event
/// may take a job to 100.
pub const LIVE_PROGRESS_CAP: f64 = 99.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Processing,
    Ready,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportJob {
    pub id: Uuid,
    pub asset: AssetRef,
    pub preset_id: String,
    pub state: JobState,

    /// Percent complete. Exactly 0 while queued, below 100 while
    /// processing, exactly 100 once ready.
    pub progress_pct: f64,

    /// Enqueue time; drives promotion order and retention expiry
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub result_url: Option<String>,

    #[serde(default)]
    pub result_size_bytes: Option<u64>,

    #[serde(default)]
    pub error: Option<String>,
}

impl ExportJob {
    /// Create a new queued job
    pub fn new(asset: AssetRef, preset_id: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            asset,
            preset_id: preset_id.to_string(),
            state: JobState::Queued,
            progress_pct: 0.0,
            created_at: Utc::now(),
            result_url: None,
            result_size_bytes: None,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, JobState::Ready | JobState::Error)
    }

    /// Fold in an advisory progress value. Regressions are dropped and the
    /// value is capped below 100 so that completion can only come from the
    /// terminal transition.
    pub fn apply_progress(&mut self, pct: f64) {
        if self.state != JobState::Processing {
            return;
        }
        let clamped = pct.clamp(0.0, LIVE_PROGRESS_CAP);
        if clamped > self.progress_pct {
            self.progress_pct = clamped;
        }
    }

    /// Terminal success: record the retrievable result
    pub fn mark_ready(&mut self, url: String, size_bytes: Option<u64>) {
        self.state = JobState::Ready;
        self.progress_pct = 100.0;
        self.result_url = Some(url);
        self.result_size_bytes = size_bytes;
    }

    /// Terminal failure: keep the last observed progress for display
    pub fn mark_failed(&mut self, reason: String) {
        self.state = JobState::Error;
        self.error = Some(reason);
    }
}

/// Export error types
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("preset '{0}' not found in catalog")]
    PresetNotFound(String),

    #[error("could not resolve a download URL for '{key}': {reason}")]
    Resolution { key: String, reason: String },

    #[error("transcode provider failed: {0}")]
    Provider(String),

    #[error("queue persistence failed: {0}")]
    Persistence(String),
}
