// Asset export job queue: preset catalog, FIFO scheduling, durable state

pub mod assets;
pub mod config;
pub mod engine;
pub mod stats;
