//! Workflow steps - the atomic units of the export workflow
//!
//! A [`Step`] pairs a target with an action and a post-condition:
//! - four actions: fill, click, select-and-confirm, replace-and-confirm
//! - post-conditions (network idle, DOM stable) awaited with bounded timeouts
//! - a criticality flag deciding whether a failure aborts the run or is skipped
//!
//! [`StepExecutor`] applies the uniform failure policy and reports a
//! [`StepOutcome`] or a fatal [`StepError`].

pub mod errors;
pub mod executor;
mod primitives;
pub mod types;
mod waiting;

pub use errors::*;
pub use executor::*;
pub use primitives::*;
pub use types::*;
pub use waiting::*;
