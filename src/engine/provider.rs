// Transcode provider seam and the simulated implementation

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use rand::Rng;
use tracing::debug;
use uuid::Uuid;

use super::core::{ExportJob, LIVE_PROGRESS_CAP, OutputContract, get_preset};

/// Message from a transcode task to the queue dispatcher
#[derive(Debug, Clone)]
pub enum ProviderEvent {
    /// Progress update while the transcode runs. Advisory; completion only
    /// comes from a terminal event.
    Progress { job_id: Uuid, pct: f64 },

    /// Transcode finished and the result is retrievable
    Finished {
        job_id: Uuid,
        url: String,
        size_bytes: u64,
    },

    /// Transcode failed
    Failed { job_id: Uuid, reason: String },
}

/// Cancellation signal for an in-flight transcode
#[derive(Debug, Clone, Default)]
pub struct TranscodeHandle {
    cancelled: Arc<AtomicBool>,
}

impl TranscodeHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the task to stop. The queue frees its slot without waiting for
    /// the task to notice.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// The actual export work, injected into the queue.
///
/// `start` must not block; the work runs on the implementation's own
/// thread. The task emits zero or more `Progress` events followed by
/// exactly one `Finished`/`Failed`, unless cancelled first, in which case
/// it may simply stop emitting.
pub trait TranscodeProvider: Send + Sync {
    fn start(
        &self,
        job: &ExportJob,
        source_url: &str,
        events: Sender<ProviderEvent>,
    ) -> TranscodeHandle;
}

/// Fallback pacing for presets without a duration hint
pub const DEFAULT_SIMULATED_DURATION: Duration = Duration::from_secs(6);

/// Timer-paced provider that interpolates progress against the preset's
/// expected duration hint. Used by the demo command and tests; real
/// transcoding backends implement the same trait.
pub struct SimulatedTranscodeProvider {
    tick: Duration,
    fail_marker: Option<String>,
}

impl SimulatedTranscodeProvider {
    pub fn new(tick: Duration) -> Self {
        Self {
            tick,
            fail_marker: None,
        }
    }

    /// Fail any job whose storage key contains `marker`, for exercising the
    /// error path
    pub fn failing_when_key_contains(mut self, marker: &str) -> Self {
        self.fail_marker = Some(marker.to_string());
        self
    }
}

impl TranscodeProvider for SimulatedTranscodeProvider {
    fn start(
        &self,
        job: &ExportJob,
        _source_url: &str,
        events: Sender<ProviderEvent>,
    ) -> TranscodeHandle {
        let handle = TranscodeHandle::new();
        let cancelled = handle.cancelled.clone();

        let job_id = job.id;
        let preset = get_preset(&job.preset_id);
        let contract = preset.map(|p| p.contract.clone());
        let target = preset
            .and_then(|p| p.expected_duration_hint)
            .unwrap_or(DEFAULT_SIMULATED_DURATION);
        let tick = self.tick;
        let inject_failure = self
            .fail_marker
            .as_ref()
            .is_some_and(|marker| job.asset.storage_key.contains(marker));

        thread::spawn(move || {
            let mut rng = rand::thread_rng();
            let steps = (target.as_millis() / tick.as_millis().max(1)).max(1);
            let increment = 100.0 / steps as f64;
            let mut pct = 0.0_f64;

            for _ in 0..steps {
                thread::sleep(tick);
                if cancelled.load(Ordering::Relaxed) {
                    debug!("simulated transcode for {job_id} cancelled");
                    return;
                }

                pct = (pct + increment * rng.gen_range(0.6..1.4)).min(LIVE_PROGRESS_CAP);
                if events.send(ProviderEvent::Progress { job_id, pct }).is_err() {
                    return;
                }
            }

            if cancelled.load(Ordering::Relaxed) {
                debug!("simulated transcode for {job_id} cancelled");
                return;
            }

            if inject_failure {
                let _ = events.send(ProviderEvent::Failed {
                    job_id,
                    reason: "simulated transcode fault (injected)".to_string(),
                });
                return;
            }

            let extension = contract.as_ref().map_or("bin", |c| c.extension());
            let size_bytes = fabricate_size(contract.as_ref(), &mut rng);
            let _ = events.send(ProviderEvent::Finished {
                job_id,
                url: format!("simulated://exports/{job_id}.{extension}"),
                size_bytes,
            });
        });

        handle
    }
}

fn fabricate_size(contract: Option<&OutputContract>, rng: &mut impl Rng) -> u64 {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    match contract {
        Some(OutputContract::Video { .. }) => rng.gen_range(20..400) * MB,
        Some(OutputContract::Image { .. }) => rng.gen_range(40..900) * KB,
        Some(OutputContract::Audio { .. }) => rng.gen_range(2..20) * MB,
        Some(OutputContract::Document { .. }) => rng.gen_range(100..4000) * KB,
        Some(OutputContract::Passthrough) | None => rng.gen_range(1..100) * MB,
    }
}
