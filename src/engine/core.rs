mod log;
mod preset;
mod state;
mod types;

pub use log::write_debug_log;
pub use preset::{ExportPreset, OutputContract, PRESETS, get_preset, presets_for_kind};
pub use state::{
    DEFAULT_RETENTION_HOURS, PersistedQueue, QueueStore, STATE_SCHEMA_VERSION, StateStore,
    default_state_path, restore_jobs,
};
pub use types::{ExportError, ExportJob, JobState, LIVE_PROGRESS_CAP};
