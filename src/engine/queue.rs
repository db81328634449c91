// Export queue owner: operations, scheduling, and change notification

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, Weak};
use std::thread;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::assets::{AssetRef, AssetResolver};

use super::core::{ExportError, ExportJob, JobState, StateStore, get_preset};
use super::provider::{ProviderEvent, TranscodeHandle, TranscodeProvider};

#[cfg(feature = "dev-logging")]
use super::core::write_debug_log;

/// Full job list pushed to subscribers after every mutation
pub type QueueSnapshot = Vec<ExportJob>;

struct ActiveSlot {
    job_id: Uuid,
    handle: TranscodeHandle,
}

struct QueueState {
    /// Kept ordered by created_at: load sorts, enqueue appends
    jobs: Vec<ExportJob>,
    active: Option<ActiveSlot>,
    subscribers: Vec<Sender<QueueSnapshot>>,
    events_tx: Sender<ProviderEvent>,
    save_warning: Option<String>,
}

struct QueueInner {
    store: Box<dyn StateStore>,
    provider: Box<dyn TranscodeProvider>,
    resolver: Arc<dyn AssetResolver>,
    state: Mutex<QueueState>,
}

/// Single owner of one session's export jobs.
///
/// All mutation goes through these operations under one lock, so the
/// promotion check can never race itself into two running transcodes. At
/// most one job is `Processing` at any time; the rest wait in FIFO order by
/// `created_at`. Every mutation is persisted and pushed to subscribers.
pub struct ExportQueue {
    inner: Arc<QueueInner>,
}

impl ExportQueue {
    /// Restore the queue from the store and resume work.
    ///
    /// The store already pruned expired jobs and demoted interrupted
    /// `Processing` jobs back to `Queued`; one promotion pass here puts the
    /// oldest of those back to work.
    pub fn open(
        store: impl StateStore + 'static,
        provider: impl TranscodeProvider + 'static,
        resolver: Arc<dyn AssetResolver>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        let jobs = store.load(Utc::now());

        let inner = Arc::new(QueueInner {
            store: Box::new(store),
            provider: Box::new(provider),
            resolver,
            state: Mutex::new(QueueState {
                jobs,
                active: None,
                subscribers: Vec::new(),
                events_tx,
                save_warning: None,
            }),
        });

        spawn_dispatcher(Arc::downgrade(&inner), events_rx);

        {
            let mut state = inner.state.lock().unwrap();
            inner.promote_next(&mut state);
            inner.commit(&mut state);
        }

        Self { inner }
    }

    /// Create a job for an asset and preset.
    ///
    /// Unknown presets are a configuration error and are rejected; nothing
    /// is enqueued. The passthrough preset resolves its download URL on the
    /// spot and the job is returned already terminal. All other jobs start
    /// `Queued` and the promotion check runs before this returns, so the
    /// returned snapshot may already be `Processing`.
    pub fn enqueue(&self, asset: AssetRef, preset_id: &str) -> Result<ExportJob, ExportError> {
        let preset = get_preset(preset_id)
            .ok_or_else(|| ExportError::PresetNotFound(preset_id.to_string()))?;

        let mut state = self.inner.state.lock().unwrap();
        let mut job = ExportJob::new(asset, preset_id);

        if preset.is_passthrough() {
            // Original-file downloads resolve synchronously and never
            // occupy the transcode slot
            match self
                .inner
                .resolver
                .resolve_download_url(&job.asset.storage_key)
            {
                Ok(url) => job.mark_ready(url, None),
                Err(e) => {
                    let reason = ExportError::Resolution {
                        key: job.asset.storage_key.clone(),
                        reason: e.to_string(),
                    }
                    .to_string();
                    warn!("{reason}");
                    job.mark_failed(reason);
                }
            }
        }

        state.jobs.push(job.clone());
        self.inner.promote_next(&mut state);
        self.inner.commit(&mut state);

        // Return the post-promotion snapshot
        if let Some(current) = state.jobs.iter().find(|j| j.id == job.id) {
            job = current.clone();
        }
        Ok(job)
    }

    /// Remove a job regardless of state. Removal, not a terminal state.
    ///
    /// Cancelling the running job signals its transcode task and frees the
    /// slot before this returns; the next queued job is promoted without
    /// waiting for the task to wind down.
    pub fn cancel(&self, job_id: Uuid) -> bool {
        let mut state = self.inner.state.lock().unwrap();
        let idx = match state.jobs.iter().position(|j| j.id == job_id) {
            Some(idx) => idx,
            None => return false,
        };

        let removed = state.jobs.remove(idx);
        debug!("cancelled job {} ({})", removed.id, removed.asset.display_name);

        if state
            .active
            .as_ref()
            .map_or(false, |slot| slot.job_id == job_id)
        {
            // Free the slot now; the task sees the flag on its next tick
            if let Some(slot) = state.active.take() {
                slot.handle.cancel();
            }
        }

        self.inner.promote_next(&mut state);
        self.inner.commit(&mut state);
        true
    }

    /// Snapshot of the jobs, oldest first, optionally filtered by state
    pub fn list(&self, filter: Option<JobState>) -> Vec<ExportJob> {
        let state = self.inner.state.lock().unwrap();
        state
            .jobs
            .iter()
            .filter(|j| filter.map_or(true, |f| j.state == f))
            .cloned()
            .collect()
    }

    /// Snapshot of a single job
    pub fn get(&self, job_id: Uuid) -> Option<ExportJob> {
        let state = self.inner.state.lock().unwrap();
        state.jobs.iter().find(|j| j.id == job_id).cloned()
    }

    /// Drop every job, cancelling the running transcode if any
    pub fn clear(&self) {
        let mut state = self.inner.state.lock().unwrap();
        if let Some(slot) = state.active.take() {
            slot.handle.cancel();
        }
        state.jobs.clear();
        self.inner.commit(&mut state);
    }

    /// Receive the current job list immediately, then a fresh snapshot
    /// after every mutation
    pub fn subscribe(&self) -> Receiver<QueueSnapshot> {
        let (tx, rx) = mpsc::channel();
        let mut state = self.inner.state.lock().unwrap();
        let _ = tx.send(state.jobs.clone());
        state.subscribers.push(tx);
        rx
    }

    /// Last persistence failure, if the most recent save did not go
    /// through. Non-fatal; the next mutation retries.
    pub fn persistence_warning(&self) -> Option<String> {
        self.inner.state.lock().unwrap().save_warning.clone()
    }
}

impl QueueInner {
    /// Move the oldest queued job into the free slot. Idempotent: does
    /// nothing while a transcode is running. A job whose source cannot be
    /// resolved fails in place and the scan moves on to the next one.
    fn promote_next(&self, state: &mut QueueState) {
        while state.active.is_none() {
            // First Queued is the oldest, the vec is ordered by created_at
            let idx = match state.jobs.iter().position(|j| j.state == JobState::Queued) {
                Some(idx) => idx,
                None => break,
            };

            let storage_key = state.jobs[idx].asset.storage_key.clone();
            match self.resolver.resolve_download_url(&storage_key) {
                Ok(source_url) => {
                    state.jobs[idx].state = JobState::Processing;
                    let job = state.jobs[idx].clone();
                    info!("processing {} ({})", job.id, job.asset.display_name);

                    #[cfg(feature = "dev-logging")]
                    {
                        let _ = write_debug_log(&format!(
                            "promoted {} preset={} asset={}",
                            job.id, job.preset_id, job.asset.display_name
                        ));
                    }

                    let handle = self
                        .provider
                        .start(&job, &source_url, state.events_tx.clone());
                    state.active = Some(ActiveSlot {
                        job_id: job.id,
                        handle,
                    });
                }
                Err(e) => {
                    let reason = ExportError::Resolution {
                        key: storage_key,
                        reason: e.to_string(),
                    }
                    .to_string();
                    warn!("{reason}");
                    state.jobs[idx].mark_failed(reason);
                }
            }
        }
    }

    /// Persist and notify subscribers. Runs at the end of every mutation,
    /// with the state lock held.
    fn commit(&self, state: &mut QueueState) {
        match self.store.save(&state.jobs) {
            Ok(()) => state.save_warning = None,
            Err(e) => {
                let err = ExportError::Persistence(format!("{:#}", e));
                warn!("{err}; keeping the in-memory queue, next mutation retries");
                state.save_warning = Some(err.to_string());
            }
        }

        let snapshot = state.jobs.clone();
        state
            .subscribers
            .retain(|tx| tx.send(snapshot.clone()).is_ok());
    }

    fn apply_event(&self, event: ProviderEvent) {
        let mut state = self.state.lock().unwrap();

        match event {
            ProviderEvent::Progress { job_id, pct } => {
                let in_slot = state
                    .active
                    .as_ref()
                    .map_or(false, |slot| slot.job_id == job_id);
                if !in_slot {
                    // Straggler from a cancelled transcode
                    debug!("dropping progress for departed job {job_id}");
                    return;
                }

                if let Some(job) = state.jobs.iter_mut().find(|j| j.id == job_id) {
                    job.apply_progress(pct);
                }
                self.commit(&mut state);
            }
            ProviderEvent::Finished {
                job_id,
                url,
                size_bytes,
            } => {
                let in_slot = state
                    .active
                    .as_ref()
                    .map_or(false, |slot| slot.job_id == job_id);
                if !in_slot {
                    debug!("dropping completion for departed job {job_id}");
                    return;
                }

                state.active = None;
                if let Some(job) = state.jobs.iter_mut().find(|j| j.id == job_id) {
                    job.mark_ready(url, Some(size_bytes));
                    info!("job {} ready, {} bytes", job_id, size_bytes);

                    #[cfg(feature = "dev-logging")]
                    {
                        let _ = write_debug_log(&format!("ready {job_id} ({size_bytes} bytes)"));
                    }
                }

                self.promote_next(&mut state);
                self.commit(&mut state);
            }
            ProviderEvent::Failed { job_id, reason } => {
                let in_slot = state
                    .active
                    .as_ref()
                    .map_or(false, |slot| slot.job_id == job_id);
                if !in_slot {
                    debug!("dropping failure for departed job {job_id}");
                    return;
                }

                state.active = None;
                if let Some(job) = state.jobs.iter_mut().find(|j| j.id == job_id) {
                    warn!("{}", ExportError::Provider(reason.clone()));
                    // Reason stays verbatim for display
                    job.mark_failed(reason);
                }

                self.promote_next(&mut state);
                self.commit(&mut state);
            }
        }
    }
}

impl Drop for QueueInner {
    fn drop(&mut self) {
        if let Ok(state) = self.state.get_mut() {
            if let Some(slot) = state.active.take() {
                slot.handle.cancel();
            }
        }
    }
}

fn spawn_dispatcher(inner: Weak<QueueInner>, events: Receiver<ProviderEvent>) {
    thread::spawn(move || {
        while let Ok(event) = events.recv() {
            match inner.upgrade() {
                Some(inner) => inner.apply_event(event),
                None => break,
            }
        }
    });
}
