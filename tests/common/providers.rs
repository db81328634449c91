#![allow(dead_code)] // Not every probe is used by every test binary

// Hand-driven provider for deterministic scheduling tests

use exportq::engine::{ExportJob, ProviderEvent, TranscodeHandle, TranscodeProvider};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// One transcode started by the queue, held open until the test drives it
#[derive(Clone)]
pub struct StartedTranscode {
    pub job_id: Uuid,
    pub source_url: String,
    pub events: Sender<ProviderEvent>,
    pub handle: TranscodeHandle,
}

/// Records every start and emits nothing on its own. Tests call the
/// `emit_*` methods to play the provider's side of the contract, which
/// keeps a job in Processing exactly as long as the test wants.
#[derive(Clone, Default)]
pub struct ManualProvider {
    started: Arc<Mutex<Vec<StartedTranscode>>>,
}

impl ManualProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_count(&self) -> usize {
        self.started.lock().unwrap().len()
    }

    pub fn started(&self) -> Vec<StartedTranscode> {
        self.started.lock().unwrap().clone()
    }

    pub fn last_started(&self) -> StartedTranscode {
        self.started
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no transcode has been started")
    }

    pub fn was_cancelled(&self, job_id: Uuid) -> bool {
        self.started
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.job_id == job_id)
            .map(|t| t.handle.is_cancelled())
            .unwrap_or(false)
    }

    fn events_for(&self, job_id: Uuid) -> Option<Sender<ProviderEvent>> {
        self.started
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.job_id == job_id)
            .map(|t| t.events.clone())
    }

    pub fn emit_progress(&self, job_id: Uuid, pct: f64) {
        if let Some(events) = self.events_for(job_id) {
            let _ = events.send(ProviderEvent::Progress { job_id, pct });
        }
    }

    pub fn emit_finished(&self, job_id: Uuid, url: &str, size_bytes: u64) {
        if let Some(events) = self.events_for(job_id) {
            let _ = events.send(ProviderEvent::Finished {
                job_id,
                url: url.to_string(),
                size_bytes,
            });
        }
    }

    pub fn emit_failed(&self, job_id: Uuid, reason: &str) {
        if let Some(events) = self.events_for(job_id) {
            let _ = events.send(ProviderEvent::Failed {
                job_id,
                reason: reason.to_string(),
            });
        }
    }
}

impl TranscodeProvider for ManualProvider {
    fn start(
        &self,
        job: &ExportJob,
        source_url: &str,
        events: Sender<ProviderEvent>,
    ) -> TranscodeHandle {
        let handle = TranscodeHandle::new();
        self.started.lock().unwrap().push(StartedTranscode {
            job_id: job.id,
            source_url: source_url.to_string(),
            events,
            handle: handle.clone(),
        });
        handle
    }
}
