// Export engine - queue, scheduler, persistence, and the provider seam

pub mod core;
pub mod provider;
pub mod queue;

pub use core::*;
pub use provider::{
    DEFAULT_SIMULATED_DURATION, ProviderEvent, SimulatedTranscodeProvider, TranscodeHandle,
    TranscodeProvider,
};
pub use queue::{ExportQueue, QueueSnapshot};
