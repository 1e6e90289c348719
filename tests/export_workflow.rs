use action_flow::FlowState;
use action_primitives::{ErrorKind, StepOutcome};
use artifact_store::FixedClock;
use cdp_adapter::fixture::{FixtureElement, FixturePage, RecordedAction};
use cdp_adapter::{AdapterErrorKind, QueryKind};
use livetrack_export::{ExportConfig, ExportRunner};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const CSV: &[u8] = b"shipment,status\nWR-1001,delivered\n";

fn runner(download_dir: &Path) -> ExportRunner {
    let env: HashMap<String, String> = [
        ("LIVETRACK_PORTAL_URL", "https://tracking.example.com/?orgname=1#livetrack"),
        ("LIVETRACK_USERNAME", "ops"),
        ("LIVETRACK_PASSWORD", "pw"),
        ("LIVETRACK_TIMEFRAME", "Last 30 days"),
        ("LIVETRACK_VIEW", "Annual"),
        ("LIVETRACK_DOWNLOAD_TIMEOUT_MS", "1000"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .chain([(
        "LIVETRACK_DOWNLOAD_DIR".to_string(),
        download_dir.display().to_string(),
    )])
    .collect();
    let config = ExportConfig::from_sources(None, Some(env)).expect("valid config");
    ExportRunner::new(config).with_clock(Arc::new(FixedClock(1_700_000_000)))
}

fn portal_controls(skip: &str) -> Vec<FixtureElement> {
    [
        FixtureElement::button("login", "Login"),
        FixtureElement::link("shipments", "Shipments"),
        FixtureElement::button("refresh", "Refresh"),
        FixtureElement::button("actions", "Actions"),
        FixtureElement::menu_item("export", "Export…"),
        FixtureElement::button("download", "Download"),
    ]
    .into_iter()
    .filter(|el| el.id != skip)
    .collect()
}

fn placeholder_portal(skip: &str) -> FixturePage {
    let mut elements = vec![
        FixtureElement::input("user").with_placeholder("Username"),
        FixtureElement::input("pass").with_placeholder("Password"),
    ];
    elements.extend(portal_controls(skip));
    FixturePage::new(elements).on_click_download("download", Some("report.csv"), CSV)
}

fn label_portal() -> FixturePage {
    let mut elements = vec![
        FixtureElement::label("user-label", "Username"),
        FixtureElement::input("user"),
        FixtureElement::label("pass-label", "Password"),
        FixtureElement::input("pass"),
    ];
    elements.extend(portal_controls(""));
    FixturePage::new(elements).on_click_download("download", Some("report.csv"), CSV)
}

fn files_in(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

fn strategy_of<'a>(outcomes: &'a [StepOutcome], id: &str) -> Option<&'a QueryKind> {
    outcomes.iter().find_map(|outcome| match outcome {
        StepOutcome::Completed {
            step_id, strategy, ..
        } if step_id == id => Some(strategy),
        _ => None,
    })
}

#[tokio::test]
async fn placeholder_login_exports_one_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner(dir.path());
    runner.prepare().await.unwrap();
    let page = placeholder_portal("");

    let report = runner
        .run_on(&page, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.state, FlowState::Succeeded);
    assert_eq!(
        strategy_of(&report.outcomes, "login.username"),
        Some(&QueryKind::Placeholder)
    );
    assert_eq!(page.value_of("user").as_deref(), Some("ops"));
    assert_eq!(page.value_of("pass").as_deref(), Some("pw"));
    assert!(matches!(
        page.actions().first(),
        Some(RecordedAction::Navigate(url)) if url.starts_with("https://tracking.example.com/")
    ));
    assert_eq!(
        page.clicked(),
        vec!["login", "shipments", "refresh", "refresh", "actions", "export", "download"]
    );

    let skipped: Vec<_> = report
        .outcomes
        .iter()
        .filter(|o| o.is_skipped())
        .map(|o| o.step_id().to_string())
        .collect();
    assert_eq!(skipped, vec!["filters.timeframe", "filters.view", "filters.rows"]);

    assert_eq!(files_in(dir.path()), vec!["1700000000_report.csv"]);
    let artifact = report.into_result().unwrap().unwrap();
    assert_eq!(std::fs::read(artifact.saved_path).unwrap(), CSV);
}

#[tokio::test]
async fn label_adjacency_fallback_still_exports() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner(dir.path());
    runner.prepare().await.unwrap();
    let page = label_portal();

    let report = runner
        .run_on(&page, &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.succeeded());
    assert_eq!(
        strategy_of(&report.outcomes, "login.username"),
        Some(&QueryKind::LabelAdjacency)
    );
    assert_eq!(
        strategy_of(&report.outcomes, "login.password"),
        Some(&QueryKind::LabelAdjacency)
    );
    assert_eq!(page.value_of("user").as_deref(), Some("ops"));
    assert_eq!(files_in(dir.path()).len(), 1);
}

#[tokio::test]
async fn missing_actions_menu_fails_at_that_step() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner(dir.path());
    runner.prepare().await.unwrap();
    let page = placeholder_portal("actions");

    let err = runner
        .run_on(&page, &CancellationToken::new())
        .await
        .unwrap()
        .into_result()
        .unwrap_err();

    assert_eq!(err.step_id(), Some("export.actions"));
    assert_eq!(err.kind(), ErrorKind::ElementNotFound);
    assert!(!page.clicked().contains(&"export".to_string()));
    assert!(files_in(dir.path()).is_empty());
}

#[tokio::test]
async fn missing_download_event_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner(dir.path());
    runner.prepare().await.unwrap();
    let mut elements = vec![FixtureElement::input("user").with_placeholder("Username")];
    elements.push(FixtureElement::input("pass").with_placeholder("Password"));
    elements.extend(portal_controls(""));
    let page = FixturePage::new(elements);

    let err = runner
        .run_on(&page, &CancellationToken::new())
        .await
        .unwrap()
        .into_result()
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "step export.download failed (download-timeout): Download timeout: no download observed within 1000ms"
    );
    assert!(files_in(dir.path()).is_empty());
}

#[tokio::test]
async fn portal_that_never_loads_fails_before_any_step() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner(dir.path());
    runner.prepare().await.unwrap();
    let page = placeholder_portal("").failing_navigation(AdapterErrorKind::NavTimeout);

    let err = runner
        .run_on(&page, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.step_id(), Some("portal.open"));
    assert_eq!(err.kind(), ErrorKind::ActionTimeout);
    assert_eq!(page.total_queries(), 0);
    assert!(matches!(
        page.actions().as_slice(),
        [RecordedAction::Navigate(url)] if url.starts_with("https://tracking.example.com/")
    ));
    assert!(files_in(dir.path()).is_empty());
}
