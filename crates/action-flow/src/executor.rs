//! Workflow orchestrator implementation

use crate::capture::DownloadCapture;
use crate::errors::FlowError;
use crate::types::*;
use action_primitives::{ErrorKind, StepError, StepExecutor, StepOutcome};
use async_trait::async_trait;
use cdp_adapter::Page;
use std::collections::HashSet;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Flow executor trait
#[async_trait]
pub trait FlowExecutor: Send + Sync {
    /// Run the workflow against `page`.
    ///
    /// Only validation failures are returned as `Err`; step failures and
    /// cancellation end the run in [`FlowState::Failed`] inside the report.
    async fn execute(
        &self,
        page: &dyn Page,
        workflow: &Workflow,
        cancel: &CancellationToken,
    ) -> Result<RunReport, FlowError>;

    /// Validate workflow structure
    fn validate_flow(&self, workflow: &Workflow) -> Result<(), FlowError>;
}

/// Sequential state machine over a workflow's nodes.
///
/// No reordering, branching or retries: node `i + 1` starts only after node
/// `i` and its post-condition have resolved.
pub struct WorkflowOrchestrator {
    executor: StepExecutor,
    capture: DownloadCapture,
}

impl WorkflowOrchestrator {
    pub fn new(executor: StepExecutor, capture: DownloadCapture) -> Self {
        Self { executor, capture }
    }

    /// Execute one node; `Err` is always fatal for the run.
    async fn execute_node(
        &self,
        page: &dyn Page,
        node: &WorkflowNode,
        report: &mut RunReport,
    ) -> Result<StepOutcome, StepError> {
        match node {
            WorkflowNode::Action(step) => self.executor.execute(page, step).await,
            WorkflowNode::CaptureDownload(trigger) => {
                let start = Instant::now();
                info!(step_id = %trigger.id(), "Capturing download");
                let (resolution, artifact) = self
                    .capture
                    .capture(page, &self.executor, trigger)
                    .await
                    .map_err(|err| {
                        let failure = err.at_step(trigger.id());
                        error!(step_id = %trigger.id(), kind = %failure.kind, "Download capture failed: {}", failure.message);
                        failure
                    })?;
                report.artifact = Some(artifact);
                Ok(StepOutcome::Completed {
                    step_id: trigger.id().to_string(),
                    strategy: resolution.strategy,
                    position: resolution.position,
                    latency_ms: start.elapsed().as_millis() as u64,
                })
            }
        }
    }
}

#[async_trait]
impl FlowExecutor for WorkflowOrchestrator {
    async fn execute(
        &self,
        page: &dyn Page,
        workflow: &Workflow,
        cancel: &CancellationToken,
    ) -> Result<RunReport, FlowError> {
        info!("Executing workflow: {} ({})", workflow.name, workflow.id);

        self.validate_flow(workflow)?;

        let mut report = RunReport::new(workflow.id.clone());
        let total = workflow.nodes.len();

        for (index, node) in workflow.nodes.iter().enumerate() {
            let step_id = node.step().id();
            report.state = FlowState::Running(index);
            report.progress.cursor = index;

            if cancel.is_cancelled() {
                warn!(step_id = %step_id, "Run cancelled before step");
                let failure = StepError::new(step_id, ErrorKind::Cancelled, "run cancelled");
                report.progress.last_error = Some(failure.record(true));
                report.state = FlowState::Failed(failure);
                return Ok(report.finish());
            }

            debug!("Executing node {}/{}: {}", index + 1, total, step_id);
            match self.execute_node(page, node, &mut report).await {
                Ok(outcome) => {
                    match &outcome {
                        StepOutcome::Completed { .. } => {
                            report.progress.completed_ids.insert(step_id.to_string());
                        }
                        StepOutcome::Skipped { record } => {
                            report.progress.last_error = Some(record.clone());
                        }
                    }
                    report.outcomes.push(outcome);
                }
                Err(failure) => {
                    report.progress.last_error = Some(failure.record(true));
                    report.state = FlowState::Failed(failure);
                    return Ok(report.finish());
                }
            }
        }

        report.progress.cursor = total;
        report.state = FlowState::Succeeded;
        info!(
            "Workflow {} succeeded ({} completed, {} skipped)",
            workflow.id,
            report.progress.completed_ids.len(),
            report.outcomes.iter().filter(|o| o.is_skipped()).count()
        );
        Ok(report.finish())
    }

    fn validate_flow(&self, workflow: &Workflow) -> Result<(), FlowError> {
        debug!("Validating workflow structure: {}", workflow.id);

        if workflow.id.is_empty() {
            return Err(FlowError::ValidationFailed(
                "Workflow ID cannot be empty".to_string(),
            ));
        }

        if workflow.nodes.is_empty() {
            return Err(FlowError::ValidationFailed(
                "Workflow must contain at least one step".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for (index, node) in workflow.nodes.iter().enumerate() {
            let step = node.step();
            if step.id().is_empty() {
                return Err(FlowError::ValidationFailed(format!(
                    "Step #{} has an empty ID",
                    index
                )));
            }
            if !seen.insert(step.id()) {
                return Err(FlowError::ValidationFailed(format!(
                    "Duplicate step ID: {}",
                    step.id()
                )));
            }
            if step.target().strategies().is_empty() {
                return Err(FlowError::ValidationFailed(format!(
                    "Step {} declares no location strategies",
                    step.id()
                )));
            }
            if matches!(node, WorkflowNode::CaptureDownload(_)) && index + 1 != workflow.nodes.len()
            {
                return Err(FlowError::ValidationFailed(format!(
                    "Download capture step {} must be the last step",
                    step.id()
                )));
            }
        }

        debug!("Workflow validation passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_locator::TargetSpec;
    use action_primitives::{PostCondition, Step, StepAction};
    use artifact_store::FixedClock;
    use cdp_adapter::fixture::{FixtureElement, FixturePage};
    use std::path::Path;
    use std::sync::Arc;

    fn click(id: &str, name: &str) -> Step {
        Step::new(
            id,
            TargetSpec::new(name).by_role("button", name),
            StepAction::Click,
        )
        .wait_for(PostCondition::NetworkIdle)
    }

    fn workflow() -> Workflow {
        Workflow::new("export", "Export")
            .then(click("listing.refresh", "refresh"))
            .then(click("filters.apply", "apply").best_effort())
            .then(click("export.actions", "actions"))
            .capture_download(click("export.download", "download"))
    }

    fn orchestrator(dir: &Path) -> WorkflowOrchestrator {
        WorkflowOrchestrator::new(
            StepExecutor::default(),
            DownloadCapture::new(dir, 1000).with_clock(Arc::new(FixedClock(1_700_000_000))),
        )
    }

    fn page_without(missing: &str) -> FixturePage {
        let buttons = [
            ("refresh", "Refresh"),
            ("apply", "Apply"),
            ("actions", "Actions"),
            ("download", "Download"),
        ];
        FixturePage::new(
            buttons
                .iter()
                .filter(|(id, _)| *id != missing)
                .map(|(id, name)| FixtureElement::button(*id, *name))
                .collect(),
        )
        .on_click_download("download", Some("report.csv"), b"a,b\n")
    }

    #[tokio::test]
    async fn test_best_effort_absence_still_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let page = page_without("apply");

        let report = orchestrator(dir.path())
            .execute(&page, &workflow(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.state, FlowState::Succeeded);
        assert_eq!(page.clicked(), vec!["refresh", "actions", "download"]);
        assert!(report.outcomes[1].is_skipped());
        assert_eq!(
            report.progress.last_error.as_ref().map(|r| r.step_id.as_str()),
            Some("filters.apply")
        );
        let artifact = report.into_result().unwrap().unwrap();
        assert_eq!(
            artifact.saved_path,
            dir.path().join("1700000000_report.csv")
        );
    }

    #[tokio::test]
    async fn test_critical_absence_stops_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let page = page_without("actions");

        let report = orchestrator(dir.path())
            .execute(&page, &workflow(), &CancellationToken::new())
            .await
            .unwrap();

        match &report.state {
            FlowState::Failed(err) => {
                assert_eq!(err.step_id, "export.actions");
                assert_eq!(err.kind, ErrorKind::ElementNotFound);
            }
            other => panic!("unexpected state: {:?}", other),
        }
        assert_eq!(report.progress.cursor, 2);
        assert!(!page.clicked().contains(&"download".to_string()));
        assert!(report.artifact.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_run_executes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let page = page_without("");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = orchestrator(dir.path())
            .execute(&page, &workflow(), &cancel)
            .await
            .unwrap();

        let err = report.into_result().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(err.step_id(), Some("listing.refresh"));
        assert!(page.actions().is_empty());
    }

    #[test]
    fn test_validation_rejects_duplicate_ids() {
        let dir = tempfile::tempdir().unwrap();
        let flow = Workflow::new("export", "Export")
            .then(click("listing.refresh", "refresh"))
            .then(click("listing.refresh", "refresh"));

        assert!(matches!(
            orchestrator(dir.path()).validate_flow(&flow),
            Err(FlowError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_validation_requires_capture_last() {
        let dir = tempfile::tempdir().unwrap();
        let flow = Workflow::new("export", "Export")
            .capture_download(click("export.download", "download"))
            .then(click("listing.refresh", "refresh"));

        assert!(orchestrator(dir.path()).validate_flow(&flow).is_err());
    }

    #[test]
    fn test_validation_rejects_empty_targets() {
        let dir = tempfile::tempdir().unwrap();
        let flow = Workflow::new("export", "Export").then(Step::new(
            "noop",
            TargetSpec::new("nothing"),
            StepAction::Click,
        ));

        assert!(orchestrator(dir.path()).validate_flow(&flow).is_err());
    }

    #[test]
    fn test_validation_failure_runs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let page = page_without("");
        let flow = Workflow::new("", "Unnamed").then(click("listing.refresh", "refresh"));

        let result = tokio_test::block_on(orchestrator(dir.path()).execute(
            &page,
            &flow,
            &CancellationToken::new(),
        ));

        assert_eq!(result.unwrap_err().kind(), ErrorKind::ConfigurationError);
        assert_eq!(page.total_queries(), 0);
    }
}
