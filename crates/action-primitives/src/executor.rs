//! Step execution with the uniform criticality policy

use action_locator::{DefaultElementResolver, ElementResolver, Resolution};
use cdp_adapter::Page;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::{
    errors::{ActionError, StepError},
    primitives::apply_action,
    types::{Step, StepOutcome},
    waiting::{DefaultWaitStrategy, WaitStrategy},
};

/// Executes single steps: resolve, act, await the post-condition.
#[derive(Clone)]
pub struct StepExecutor {
    resolver: Arc<dyn ElementResolver>,
    waits: Arc<dyn WaitStrategy>,
}

impl Default for StepExecutor {
    fn default() -> Self {
        Self::new(
            Arc::new(DefaultElementResolver::new()),
            Arc::new(DefaultWaitStrategy::default()),
        )
    }
}

impl StepExecutor {
    pub fn new(resolver: Arc<dyn ElementResolver>, waits: Arc<dyn WaitStrategy>) -> Self {
        Self { resolver, waits }
    }

    /// Run a step and apply its failure policy.
    ///
    /// Failures of critical steps are returned as a fatal [`StepError`];
    /// failures of best-effort steps become [`StepOutcome::Skipped`].
    pub async fn execute(&self, page: &dyn Page, step: &Step) -> Result<StepOutcome, StepError> {
        let start = Instant::now();
        info!(
            step_id = %step.id(),
            action = step.action().name(),
            critical = step.is_critical(),
            "Executing step"
        );

        match self.perform(page, step).await {
            Ok(resolution) => {
                let latency_ms = start.elapsed().as_millis() as u64;
                info!(
                    step_id = %step.id(),
                    strategy = %resolution.strategy,
                    latency_ms = latency_ms,
                    "Step completed"
                );
                Ok(StepOutcome::Completed {
                    step_id: step.id().to_string(),
                    strategy: resolution.strategy,
                    position: resolution.position,
                    latency_ms,
                })
            }
            Err(err) => {
                let failure = err.at_step(step.id());
                if step.is_critical() {
                    error!(step_id = %step.id(), kind = %failure.kind, "Critical step failed: {}", failure.message);
                    Err(failure)
                } else {
                    warn!(step_id = %step.id(), kind = %failure.kind, "Best-effort step skipped: {}", failure.message);
                    Ok(StepOutcome::Skipped {
                        record: failure.record(false),
                    })
                }
            }
        }
    }

    /// Resolve the target, apply the action, await the post-condition.
    ///
    /// No failure policy is applied here.
    pub async fn perform(&self, page: &dyn Page, step: &Step) -> Result<Resolution, ActionError> {
        let resolution = self.resolver.resolve(page, step.target()).await?;
        debug!(
            step_id = %step.id(),
            node = %resolution.handle.node,
            fallback = resolution.used_fallback(),
            "Target resolved"
        );

        apply_action(page, &resolution.handle, step.action()).await?;
        self.waits.wait(page, step.post_condition()).await?;
        Ok(resolution)
    }
}
