//! Core types for workflow orchestration

use action_primitives::{ErrorRecord, Step, StepError, StepOutcome};
use artifact_store::DownloadArtifact;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::errors::FlowError;

/// Workflow definition - an ordered list of nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    /// Workflow identifier
    pub id: String,

    /// Workflow name
    pub name: String,

    /// Nodes, executed strictly in order
    pub nodes: Vec<WorkflowNode>,
}

impl Workflow {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            nodes: Vec::new(),
        }
    }

    /// Append a plain step
    pub fn then(mut self, step: Step) -> Self {
        self.nodes.push(WorkflowNode::Action(step));
        self
    }

    /// Append the step that triggers the download
    pub fn capture_download(mut self, trigger: Step) -> Self {
        self.nodes.push(WorkflowNode::CaptureDownload(trigger));
        self
    }

    pub fn step_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|node| node.step().id())
    }
}

/// Workflow node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WorkflowNode {
    /// Plain step governed by its own criticality
    Action(Step),

    /// Step wrapped by download capture; always critical
    CaptureDownload(Step),
}

impl WorkflowNode {
    pub fn step(&self) -> &Step {
        match self {
            WorkflowNode::Action(step) | WorkflowNode::CaptureDownload(step) => step,
        }
    }
}

/// Orchestrator state machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowState {
    NotStarted,
    /// Executing the node at this index
    Running(usize),
    Succeeded,
    Failed(StepError),
}

impl FlowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Succeeded | FlowState::Failed(_))
    }
}

/// Progress of one run. Owned by the orchestrator for the run's duration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub cursor: usize,
    pub completed_ids: BTreeSet<String>,
    pub last_error: Option<ErrorRecord>,
}

/// Workflow run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique id of this run
    pub run_id: String,

    pub workflow_id: String,

    /// Terminal state of the run
    pub state: FlowState,

    pub progress: WorkflowState,

    /// Outcomes of every step that did not abort the run, in order
    pub outcomes: Vec<StepOutcome>,

    /// Captured artifact (at most one per run)
    pub artifact: Option<DownloadArtifact>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub latency_ms: u64,
}

impl RunReport {
    pub fn new(workflow_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            workflow_id: workflow_id.into(),
            state: FlowState::NotStarted,
            progress: WorkflowState::default(),
            outcomes: Vec::new(),
            artifact: None,
            started_at: now,
            finished_at: now,
            latency_ms: 0,
        }
    }

    /// Set finish time and calculate latency
    pub fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self.latency_ms = elapsed_ms(self.started_at, self.finished_at);
        self
    }

    pub fn succeeded(&self) -> bool {
        self.state == FlowState::Succeeded
    }

    /// Collapse into the artifact, or the single fatal error of the run.
    pub fn into_result(self) -> Result<Option<DownloadArtifact>, FlowError> {
        match self.state {
            FlowState::Succeeded => Ok(self.artifact),
            FlowState::Failed(err) => Err(FlowError::StepFailed(err)),
            FlowState::NotStarted | FlowState::Running(_) => Err(FlowError::ValidationFailed(
                format!("run {} did not reach a terminal state", self.run_id),
            )),
        }
    }
}

/// Milliseconds from `start` to `end`; zero when the wall clock stepped back.
fn elapsed_ms(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    u64::try_from((end - start).num_milliseconds()).unwrap_or(0)
}
