// Queue tallies and display formatting

use crate::engine::{ExportJob, JobState};

/// Per-state counts derived from a job snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub queued: usize,
    pub processing: usize,
    pub ready: usize,
    pub failed: usize,

    /// Total bytes across finished exports that reported a size
    pub result_bytes: u64,
}

impl QueueStats {
    pub fn from_jobs(jobs: &[ExportJob]) -> Self {
        let mut stats = Self::default();
        for job in jobs {
            match job.state {
                JobState::Queued => stats.queued += 1,
                JobState::Processing => stats.processing += 1,
                JobState::Ready => stats.ready += 1,
                JobState::Error => stats.failed += 1,
            }
            if let Some(size) = job.result_size_bytes {
                stats.result_bytes += size;
            }
        }
        stats
    }

    pub fn total(&self) -> usize {
        self.queued + self.processing + self.ready + self.failed
    }

    /// True once nothing is waiting or running
    pub fn all_terminal(&self) -> bool {
        self.queued == 0 && self.processing == 0
    }
}

/// Format bytes as human-readable size
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format duration in seconds as human-readable time
pub fn format_duration(seconds: f64) -> String {
    let total_secs = seconds as u64;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}
