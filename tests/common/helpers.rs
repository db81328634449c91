#![allow(dead_code)] // Not every helper is used by every test binary

use exportq::assets::{AssetKind, AssetRef, AssetResolver, ResolveError};
use exportq::engine::{ExportJob, QueueSnapshot, QueueStore};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use uuid::Uuid;

pub fn video_asset(n: u32) -> AssetRef {
    AssetRef {
        id: format!("ast_video_{n}"),
        display_name: format!("clip {n}"),
        kind: AssetKind::Video,
        storage_key: format!("proj/clips/clip_{n}.mov"),
    }
}

pub fn image_asset(n: u32) -> AssetRef {
    AssetRef {
        id: format!("ast_image_{n}"),
        display_name: format!("still {n}"),
        kind: AssetKind::Image,
        storage_key: format!("proj/stills/still_{n}.cr3"),
    }
}

pub fn document_asset(n: u32) -> AssetRef {
    AssetRef {
        id: format!("ast_doc_{n}"),
        display_name: format!("callsheet {n}"),
        kind: AssetKind::Document,
        storage_key: format!("proj/docs/callsheet_{n}.pdf"),
    }
}

/// Resolves every key under a fixed base URL, except keys containing the
/// configured deny marker
pub struct TestResolver {
    deny_marker: Option<String>,
}

impl TestResolver {
    pub fn new() -> Self {
        Self { deny_marker: None }
    }

    pub fn denying(marker: &str) -> Self {
        Self {
            deny_marker: Some(marker.to_string()),
        }
    }
}

impl AssetResolver for TestResolver {
    fn resolve_download_url(&self, storage_key: &str) -> Result<String, ResolveError> {
        if let Some(marker) = &self.deny_marker {
            if storage_key.contains(marker) {
                return Err(ResolveError::Backend {
                    key: storage_key.to_string(),
                    reason: "test backend offline".to_string(),
                });
            }
        }
        Ok(format!("https://test.local/{storage_key}"))
    }
}

/// Store rooted in a fresh temp dir. Keep the TempDir alive for the
/// duration of the test.
pub fn temp_store() -> (TempDir, QueueStore) {
    let dir = TempDir::new().expect("create temp dir");
    let store = QueueStore::at(dir.path().join("queue_state.json"));
    (dir, store)
}

/// Block until a snapshot satisfies the predicate, or panic after 5s.
/// Returns the matching snapshot.
pub fn wait_for<F>(updates: &Receiver<QueueSnapshot>, what: &str, mut pred: F) -> QueueSnapshot
where
    F: FnMut(&[ExportJob]) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match updates.recv_timeout(remaining) {
            Ok(snapshot) => {
                if pred(&snapshot) {
                    return snapshot;
                }
            }
            Err(RecvTimeoutError::Timeout) => panic!("timed out waiting for {what}"),
            Err(RecvTimeoutError::Disconnected) => {
                panic!("queue dropped while waiting for {what}")
            }
        }
    }
}

pub fn job_by_id(jobs: &[ExportJob], id: Uuid) -> &ExportJob {
    jobs.iter()
        .find(|j| j.id == id)
        .unwrap_or_else(|| panic!("job {id} missing from snapshot"))
}
