//! Download capture around the export-triggering step

use action_locator::Resolution;
use action_primitives::{ActionError, Step, StepExecutor};
use artifact_store::{
    artifact_file_name, suggested_name, ArtifactStore, Clock, DownloadArtifact, FsArtifactStore,
    SystemClock,
};
use cdp_adapter::Page;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

/// Arms a download listener, fires the trigger step and persists the transfer.
#[derive(Clone)]
pub struct DownloadCapture {
    store: Arc<dyn ArtifactStore>,
    clock: Arc<dyn Clock>,
    download_dir: PathBuf,
    timeout_ms: u64,
}

impl DownloadCapture {
    pub fn new(download_dir: impl Into<PathBuf>, timeout_ms: u64) -> Self {
        Self {
            store: Arc::new(FsArtifactStore::new()),
            clock: Arc::new(SystemClock),
            download_dir: download_dir.into(),
            timeout_ms,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Execute `trigger` and capture the download it starts.
    ///
    /// The listener is armed before the trigger's action is dispatched.
    pub async fn capture(
        &self,
        page: &dyn Page,
        executor: &StepExecutor,
        trigger: &Step,
    ) -> Result<(Resolution, DownloadArtifact), ActionError> {
        let mut listener = page.subscribe_downloads().await?;
        debug!(step_id = %trigger.id(), "Download listener armed");

        let resolution = executor.perform(page, trigger).await?;

        let event = match timeout(Duration::from_millis(self.timeout_ms), listener.next()).await {
            Ok(Some(event)) => event?,
            Ok(None) => {
                return Err(ActionError::ActionFailed(
                    "download source closed before a transfer completed".to_string(),
                ))
            }
            Err(_) => {
                warn!(step_id = %trigger.id(), "No download within {}ms", self.timeout_ms);
                return Err(ActionError::DownloadTimeout(format!(
                    "no download observed within {}ms",
                    self.timeout_ms
                )));
            }
        };
        drop(listener);

        let captured_at = self.clock.now_epoch_seconds();
        let suggested = suggested_name(event.suggested_filename.as_deref());
        let target = self
            .download_dir
            .join(artifact_file_name(captured_at, &suggested));

        let saved_path = self
            .store
            .write(&target, event.source)
            .await
            .map_err(|err| ActionError::ArtifactWrite(err.to_string()))?;

        info!(path = %saved_path.display(), "Download captured");
        Ok((
            resolution,
            DownloadArtifact {
                suggested_name: suggested,
                saved_path,
                captured_at_epoch_seconds: captured_at,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_locator::TargetSpec;
    use action_primitives::{ErrorKind, StepAction};
    use artifact_store::FixedClock;
    use cdp_adapter::fixture::{FixtureElement, FixturePage};

    fn download_step() -> Step {
        Step::new(
            "export.download",
            TargetSpec::new("download button")
                .by_role("button", "download")
                .singular(),
            StepAction::Click,
        )
    }

    fn capture_into(dir: &std::path::Path, timeout_ms: u64) -> DownloadCapture {
        DownloadCapture::new(dir, timeout_ms).with_clock(Arc::new(FixedClock(1_700_000_000)))
    }

    #[tokio::test]
    async fn stores_under_epoch_prefixed_name() {
        let dir = tempfile::tempdir().unwrap();
        let page = FixturePage::new(vec![FixtureElement::button("dl", "Download")])
            .on_click_download("dl", Some("report.csv"), b"id,status\n1,delivered\n");

        let (_, artifact) = capture_into(dir.path(), 1000)
            .capture(&page, &StepExecutor::default(), &download_step())
            .await
            .unwrap();

        assert_eq!(artifact.saved_path, dir.path().join("1700000000_report.csv"));
        assert_eq!(artifact.suggested_name, "report.csv");
        assert_eq!(artifact.captured_at_epoch_seconds, 1_700_000_000);
        assert_eq!(
            std::fs::read(&artifact.saved_path).unwrap(),
            b"id,status\n1,delivered\n"
        );
        assert_eq!(page.missed_downloads(), 0);
    }

    #[tokio::test]
    async fn missing_suggested_name_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let page = FixturePage::new(vec![FixtureElement::button("dl", "Download")])
            .on_click_download("dl", None, b"x");

        let (_, artifact) = capture_into(dir.path(), 1000)
            .capture(&page, &StepExecutor::default(), &download_step())
            .await
            .unwrap();

        assert_eq!(artifact.saved_path, dir.path().join("1700000000_export.csv"));
    }

    #[tokio::test]
    async fn no_transfer_is_download_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let page = FixturePage::new(vec![FixtureElement::button("dl", "Download")]);

        let err = capture_into(dir.path(), 100)
            .capture(&page, &StepExecutor::default(), &download_step())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DownloadTimeout);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn ambiguous_trigger_never_clicks() {
        let dir = tempfile::tempdir().unwrap();
        let page = FixturePage::new(vec![
            FixtureElement::button("dl-csv", "Download CSV"),
            FixtureElement::button("dl-xls", "Download XLS"),
        ]);

        let err = capture_into(dir.path(), 100)
            .capture(&page, &StepExecutor::default(), &download_step())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::AmbiguousMatch);
        assert!(page.clicked().is_empty());
    }
}
