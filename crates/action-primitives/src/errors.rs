//! Error taxonomy for workflow steps

use action_locator::LocatorError;
use cdp_adapter::{AdapterError, AdapterErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The error kinds a workflow run can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Every strategy of a target produced zero matches
    ElementNotFound,
    /// A singular-expected strategy matched more than one element
    AmbiguousMatch,
    /// A post-condition wait exceeded its bound
    ActionTimeout,
    /// No download was observed in time
    DownloadTimeout,
    /// Missing or invalid configuration, raised before any step runs
    ConfigurationError,
    /// The page rejected a dispatched primitive
    ActionFailed,
    /// The artifact could not be persisted
    ArtifactWrite,
    /// The run was aborted from outside
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ElementNotFound => "element-not-found",
            ErrorKind::AmbiguousMatch => "ambiguous-match",
            ErrorKind::ActionTimeout => "action-timeout",
            ErrorKind::DownloadTimeout => "download-timeout",
            ErrorKind::ConfigurationError => "configuration-error",
            ErrorKind::ActionFailed => "action-failed",
            ErrorKind::ArtifactWrite => "artifact-write",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single step action or wait
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Ambiguous match: {0}")]
    AmbiguousMatch(String),

    #[error("Action timeout: {0}")]
    ActionTimeout(String),

    #[error("Download timeout: {0}")]
    DownloadTimeout(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Action failed: {0}")]
    ActionFailed(String),

    #[error("Artifact write failed: {0}")]
    ArtifactWrite(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),
}

impl ActionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ActionError::ElementNotFound(_) => ErrorKind::ElementNotFound,
            ActionError::AmbiguousMatch(_) => ErrorKind::AmbiguousMatch,
            ActionError::ActionTimeout(_) => ErrorKind::ActionTimeout,
            ActionError::DownloadTimeout(_) => ErrorKind::DownloadTimeout,
            ActionError::Configuration(_) => ErrorKind::ConfigurationError,
            ActionError::ActionFailed(_) => ErrorKind::ActionFailed,
            ActionError::ArtifactWrite(_) => ErrorKind::ArtifactWrite,
            ActionError::Cancelled(_) => ErrorKind::Cancelled,
        }
    }

    /// Attach the originating step id.
    pub fn at_step(self, step_id: impl Into<String>) -> StepError {
        StepError {
            step_id: step_id.into(),
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

impl From<LocatorError> for ActionError {
    fn from(err: LocatorError) -> Self {
        let message = err.to_string();
        match err {
            LocatorError::ElementNotFound { .. } => ActionError::ElementNotFound(message),
            LocatorError::AmbiguousMatch { .. } => ActionError::AmbiguousMatch(message),
            LocatorError::InvalidTarget(_) => ActionError::Configuration(message),
            LocatorError::Query(source) => ActionError::from(source),
        }
    }
}

impl From<AdapterError> for ActionError {
    fn from(err: AdapterError) -> Self {
        let message = err.to_string();
        match err.kind {
            AdapterErrorKind::NavTimeout => ActionError::ActionTimeout(message),
            // the element vanished between resolution and dispatch
            AdapterErrorKind::TargetNotFound => ActionError::ElementNotFound(message),
            AdapterErrorKind::CdpIo
            | AdapterErrorKind::DownloadCanceled
            | AdapterErrorKind::Internal => ActionError::ActionFailed(message),
        }
    }
}

/// A failure carrying the id of the step that produced it
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("step {step_id} failed ({kind}): {message}")]
pub struct StepError {
    pub step_id: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl StepError {
    pub fn new(step_id: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn record(&self, critical: bool) -> ErrorRecord {
        ErrorRecord {
            step_id: self.step_id.clone(),
            kind: self.kind,
            message: self.message.clone(),
            critical,
        }
    }
}

/// Serializable trace of a step failure, fatal or recovered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub step_id: String,
    pub kind: ErrorKind,
    pub message: String,
    pub critical: bool,
}
