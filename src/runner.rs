//! Bootstrap and teardown around one workflow run.

use action_flow::{DownloadCapture, FlowError, FlowExecutor, RunReport, WorkflowOrchestrator};
use action_locator::DefaultElementResolver;
use action_primitives::{ActionError, DefaultWaitStrategy, StepExecutor};
use anyhow::{anyhow, Context, Result};
use artifact_store::{ArtifactStore, Clock, DownloadArtifact, FsArtifactStore, SystemClock};
use cdp_adapter::{CdpConfig, ChromiumPage, Page};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ExportConfig;
use crate::workflow::livetrack_workflow;

/// Pseudo step id reported when the initial navigation fails.
pub const NAVIGATE_STEP_ID: &str = "portal.open";

pub struct ExportRunner {
    config: ExportConfig,
    store: Arc<dyn ArtifactStore>,
    clock: Arc<dyn Clock>,
}

impl ExportRunner {
    pub fn new(config: ExportConfig) -> Self {
        Self {
            config,
            store: Arc::new(FsArtifactStore::new()),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    fn orchestrator(&self) -> WorkflowOrchestrator {
        let waits = DefaultWaitStrategy::with_timeouts(
            self.config.network_idle_timeout_ms,
            self.config.dom_stable_timeout_ms,
        );
        let executor = StepExecutor::new(
            Arc::new(DefaultElementResolver::new()),
            Arc::new(waits),
        );
        let capture = DownloadCapture::new(
            self.config.download_dir.clone(),
            self.config.download_timeout_ms,
        )
        .with_store(self.store.clone())
        .with_clock(self.clock.clone());
        WorkflowOrchestrator::new(executor, capture)
    }

    /// Create the download directory. Runs once, before any browser work.
    pub async fn prepare(&self) -> Result<()> {
        self.store
            .ensure_directory(&self.config.download_dir)
            .await
            .with_context(|| {
                format!(
                    "failed to create download directory {}",
                    self.config.download_dir.display()
                )
            })
    }

    /// Navigate `page` to the portal and run the workflow on it.
    pub async fn run_on(
        &self,
        page: &dyn Page,
        cancel: &CancellationToken,
    ) -> Result<RunReport, FlowError> {
        let url = self.config.portal_url.as_str();
        info!(url = %url, "Opening portal");
        page.navigate(url, Duration::from_millis(self.config.network_idle_timeout_ms))
            .await
            .map_err(|err| FlowError::StepFailed(ActionError::from(err).at_step(NAVIGATE_STEP_ID)))?;

        let workflow = livetrack_workflow(&self.config);
        self.orchestrator().execute(page, &workflow, cancel).await
    }

    /// Full run against a freshly launched Chromium.
    pub async fn run(&self, headless: bool, cancel: &CancellationToken) -> Result<DownloadArtifact> {
        self.prepare().await?;

        let cdp = CdpConfig {
            executable: self.config.chrome_executable.clone(),
            headless,
            ..CdpConfig::default()
        };
        let page = ChromiumPage::launch(&cdp)
            .await
            .context("failed to launch browser")?;

        let outcome = self.run_on(&page, cancel).await;

        if let Err(err) = page.close().await {
            warn!("browser shutdown failed: {}", err);
        }

        let report = outcome?;
        match serde_json::to_string(&report) {
            Ok(json) => debug!(report = %json, "Run report"),
            Err(err) => warn!("failed to serialize run report: {}", err),
        }

        report
            .into_result()?
            .ok_or_else(|| anyhow!("workflow finished without capturing a download"))
    }
}
