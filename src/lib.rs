//! LiveTrack export
//!
//! Drives the tracking portal through a fixed login → filter → export
//! workflow and stores the downloaded report under a deterministic name.
//! Exposes modules for integration testing.

pub mod cli;
pub mod config;
pub mod runner;
pub mod workflow;

pub use config::{ConfigError, ExportConfig};
pub use runner::ExportRunner;
pub use workflow::livetrack_workflow;
