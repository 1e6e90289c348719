//! Workflow execution error types

use action_primitives::{ErrorKind, StepError};
use thiserror::Error;

/// Workflow execution errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// The workflow definition is malformed; raised before any step runs
    #[error("Workflow validation failed: {0}")]
    ValidationFailed(String),

    /// A critical step failed, or the run was cancelled before a step
    #[error(transparent)]
    StepFailed(#[from] StepError),
}

impl FlowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FlowError::ValidationFailed(_) => ErrorKind::ConfigurationError,
            FlowError::StepFailed(err) => err.kind,
        }
    }

    /// Id of the step the run stopped at, if any.
    pub fn step_id(&self) -> Option<&str> {
        match self {
            FlowError::ValidationFailed(_) => None,
            FlowError::StepFailed(err) => Some(&err.step_id),
        }
    }
}
