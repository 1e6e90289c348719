//! Workflow orchestration layer
//!
//! Runs a fixed, declarative list of steps as a sequential state machine and
//! wraps the final download-triggering step in a bounded download capture.

pub mod capture;
pub mod errors;
pub mod executor;
pub mod types;

pub use capture::DownloadCapture;
pub use errors::FlowError;
pub use executor::{FlowExecutor, WorkflowOrchestrator};
pub use types::{FlowState, RunReport, Workflow, WorkflowNode, WorkflowState};
