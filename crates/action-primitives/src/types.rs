//! Core data types for workflow steps

use action_locator::TargetSpec;
use cdp_adapter::QueryKind;
use serde::{Deserialize, Serialize};

use crate::errors::ErrorRecord;

/// Action applied to a resolved element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepAction {
    /// Clear the element's content and write the value
    Fill(String),

    /// Primary activation
    Click,

    /// Activate, type the value, confirm with Enter
    SelectAndConfirm(String),

    /// Activate, select all existing content, type the value, confirm with Enter
    ReplaceAndConfirm(String),
}

impl StepAction {
    pub fn name(&self) -> &'static str {
        match self {
            StepAction::Fill(_) => "fill",
            StepAction::Click => "click",
            StepAction::SelectAndConfirm(_) => "select-and-confirm",
            StepAction::ReplaceAndConfirm(_) => "replace-and-confirm",
        }
    }
}

/// Settling signal awaited after the action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PostCondition {
    /// No network activity for the quiet period
    NetworkIdle,

    /// No DOM mutation for the quiet period
    DomStable,

    /// Advance immediately
    #[default]
    None,
}

/// An atomic unit of work. Immutable once built.
///
/// Steps are critical unless marked [`Step::best_effort`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    id: String,
    target: TargetSpec,
    action: StepAction,
    post_condition: PostCondition,
    critical: bool,
}

impl Step {
    pub fn new(id: impl Into<String>, target: TargetSpec, action: StepAction) -> Self {
        Self {
            id: id.into(),
            target,
            action,
            post_condition: PostCondition::None,
            critical: true,
        }
    }

    pub fn wait_for(mut self, post_condition: PostCondition) -> Self {
        self.post_condition = post_condition;
        self
    }

    /// Failures of this step are recorded and skipped instead of aborting the run.
    pub fn best_effort(mut self) -> Self {
        self.critical = false;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn target(&self) -> &TargetSpec {
        &self.target
    }

    pub fn action(&self) -> &StepAction {
        &self.action
    }

    pub fn post_condition(&self) -> PostCondition {
        self.post_condition
    }

    pub fn is_critical(&self) -> bool {
        self.critical
    }
}

/// Result of a step that did not abort the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    Completed {
        step_id: String,
        /// Strategy kind that located the element
        strategy: QueryKind,
        /// Position of that strategy in the target's chain
        position: usize,
        latency_ms: u64,
    },

    /// A best-effort step failed; the failure is recorded, not propagated
    Skipped { record: ErrorRecord },
}

impl StepOutcome {
    pub fn step_id(&self) -> &str {
        match self {
            StepOutcome::Completed { step_id, .. } => step_id,
            StepOutcome::Skipped { record } => &record.step_id,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, StepOutcome::Skipped { .. })
    }
}
