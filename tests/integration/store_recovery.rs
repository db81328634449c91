// Tests for queue persistence and crash recovery

use crate::common::helpers::*;
use crate::common::providers::ManualProvider;
use chrono::{Duration as ChronoDuration, Utc};
use exportq::engine::{ExportJob, ExportQueue, JobState, QueueStore};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_missing_state_file_starts_empty() {
    let provider = ManualProvider::new();
    let (_dir, store) = temp_store();
    assert!(!store.exists());

    let queue = ExportQueue::open(store, provider.clone(), Arc::new(TestResolver::new()));
    assert!(queue.list(None).is_empty());
    assert!(
        queue.persistence_warning().is_none(),
        "a first run has nothing to warn about"
    );
}

#[test]
fn test_corrupt_state_file_starts_empty() {
    let provider = ManualProvider::new();
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("queue_state.json");
    fs::write(&path, b"{ this is not json").expect("write garbage");

    let queue = ExportQueue::open(
        QueueStore::at(path.clone()),
        provider.clone(),
        Arc::new(TestResolver::new()),
    );
    assert!(
        queue.list(None).is_empty(),
        "unreadable state is discarded, not fatal"
    );

    // The next mutation overwrites the damage
    queue.enqueue(video_asset(1), "WEB_HD").unwrap();
    let reloaded = QueueStore::at(path).load(Utc::now());
    assert_eq!(reloaded.len(), 1);
}

#[test]
fn test_unknown_schema_version_discards_state() {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("queue_state.json");

    let job = ExportJob::new(video_asset(1), "WEB_HD");
    let raw = serde_json::json!({
        "version": 99,
        "saved_at": Utc::now(),
        "jobs": [job],
    });
    fs::write(&path, raw.to_string()).expect("write state");

    let loaded = QueueStore::at(path).load(Utc::now());
    assert!(
        loaded.is_empty(),
        "a future schema version must not be half-read"
    );
}

#[test]
fn test_version_marker_written_with_state() {
    let provider = ManualProvider::new();
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("queue_state.json");
    let queue = ExportQueue::open(
        QueueStore::at(path.clone()),
        provider.clone(),
        Arc::new(TestResolver::new()),
    );
    queue.enqueue(video_asset(1), "WEB_HD").unwrap();

    let raw = fs::read_to_string(&path).expect("state file should exist");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("state should be json");
    assert_eq!(value["version"], 1);
    assert!(value["saved_at"].is_string());
    assert_eq!(value["jobs"].as_array().map(|a| a.len()), Some(1));
}

#[test]
fn test_restart_resumes_interrupted_job() {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("queue_state.json");

    let (first_id, second_id) = {
        let provider = ManualProvider::new();
        let queue = ExportQueue::open(
            QueueStore::at(path.clone()),
            provider.clone(),
            Arc::new(TestResolver::new()),
        );
        let updates = queue.subscribe();

        let first = queue.enqueue(video_asset(1), "WEB_HD").unwrap();
        let second = queue.enqueue(video_asset(2), "WEB_HD").unwrap();
        provider.emit_progress(first.id, 57.0);
        wait_for(&updates, "progress to be persisted", |jobs| {
            job_by_id(jobs, first.id).progress_pct == 57.0
        });
        (first.id, second.id)
        // Queue dropped here with the first job still in flight
    };

    let provider = ManualProvider::new();
    let queue = ExportQueue::open(
        QueueStore::at(path),
        provider.clone(),
        Arc::new(TestResolver::new()),
    );

    let first = queue.get(first_id).expect("interrupted job survives restart");
    assert_eq!(
        first.state,
        JobState::Processing,
        "the oldest recovered job goes straight back to work"
    );
    assert_eq!(
        first.progress_pct, 0.0,
        "a restarted transcode starts over, stale progress would lie"
    );
    assert_eq!(
        queue.get(second_id).expect("waiting job survives").state,
        JobState::Queued
    );
    assert_eq!(provider.start_count(), 1);
    assert_eq!(provider.last_started().job_id, first_id);
}

#[test]
fn test_recovered_jobs_keep_results() {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("queue_state.json");
    let store = QueueStore::at(path.clone());

    let mut done = ExportJob::new(video_asset(1), "WEB_HD");
    done.created_at = Utc::now() - ChronoDuration::hours(2);
    done.mark_ready("simulated://exports/done.mp4".to_string(), Some(42_000));

    let mut failed = ExportJob::new(video_asset(2), "WEB_HD");
    failed.created_at = Utc::now() - ChronoDuration::hours(1);
    failed.mark_failed("encoder exited with code 137".to_string());

    store.save(&[done.clone(), failed.clone()]).expect("save should work");

    let provider = ManualProvider::new();
    let queue = ExportQueue::open(store, provider.clone(), Arc::new(TestResolver::new()));

    let done_back = queue.get(done.id).expect("finished job survives");
    assert_eq!(done_back.state, JobState::Ready);
    assert_eq!(done_back.result_url.as_deref(), Some("simulated://exports/done.mp4"));
    assert_eq!(done_back.result_size_bytes, Some(42_000));

    let failed_back = queue.get(failed.id).expect("failed job survives");
    assert_eq!(failed_back.state, JobState::Error);
    assert_eq!(failed_back.error.as_deref(), Some("encoder exited with code 137"));

    assert_eq!(provider.start_count(), 0, "terminal jobs are not re-run");
}

#[test]
fn test_retention_boundary() {
    let (_dir, store) = temp_store();
    let now = Utc::now();

    let mut on_edge = ExportJob::new(video_asset(1), "WEB_HD");
    on_edge.created_at = now - ChronoDuration::hours(24);

    let mut past_edge = ExportJob::new(video_asset(2), "WEB_HD");
    past_edge.created_at = now - ChronoDuration::hours(24) - ChronoDuration::seconds(1);

    store.save(&[on_edge.clone(), past_edge]).expect("save should work");

    let loaded = store.load(now);
    assert_eq!(loaded.len(), 1, "only the job past the cutoff is dropped");
    assert_eq!(loaded[0].id, on_edge.id);
}

#[test]
fn test_save_failure_is_nonfatal() {
    let provider = ManualProvider::new();
    let dir = TempDir::new().expect("create temp dir");

    // Parent of the state path is a regular file, so every save fails
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"not a directory").expect("write blocker");
    let store = QueueStore::at(blocker.join("queue_state.json"));

    let queue = ExportQueue::open(store, provider.clone(), Arc::new(TestResolver::new()));
    let job = queue
        .enqueue(video_asset(1), "WEB_HD")
        .expect("a broken disk must not block exports");

    assert_eq!(job.state, JobState::Processing);
    let warning = queue
        .persistence_warning()
        .expect("the failed save should be surfaced");
    assert!(
        warning.contains("queue persistence failed"),
        "unexpected warning text: {warning}"
    );
    assert_eq!(queue.list(None).len(), 1, "the in-memory queue keeps working");
}
