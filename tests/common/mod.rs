// Shared fixtures for integration tests

pub mod helpers;
pub mod providers;
