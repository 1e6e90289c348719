//! Error types for target resolution

use cdp_adapter::AdapterError;
use thiserror::Error;

/// Locator error enumeration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocatorError {
    /// Every strategy in the chain produced zero matches
    #[error("Element not found: {target} (tried {tried})")]
    ElementNotFound { target: String, tried: String },

    /// A singular-expected strategy matched more than one element
    #[error("Multiple elements match {target}: {strategy} found {count}")]
    AmbiguousMatch {
        target: String,
        strategy: String,
        count: usize,
    },

    /// The target declares no strategies
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// No strategy could be evaluated against the page
    #[error("Page query failed: {0}")]
    Query(AdapterError),
}
