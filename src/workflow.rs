//! The fixed LiveTrack export workflow, expressed as data.
//!
//! Authenticate, open shipments, configure filters, trigger the export and
//! capture the download. Target chains run from semantic to structural.

use action_flow::Workflow;
use action_locator::TargetSpec;
use action_primitives::{PostCondition, Step, StepAction};

use crate::config::ExportConfig;

pub const WORKFLOW_ID: &str = "livetrack.export";

/// XPath matching an ExtJS-style anchor button whose text is `label`.
fn anchor_button(label: &str) -> String {
    format!("//a[.//span[normalize-space()='{label}'] or normalize-space()='{label}']")
}

fn username() -> TargetSpec {
    TargetSpec::new("username field")
        .by_placeholder("Username")
        .by_label("Username")
        .by_structure("//input[@name='username']")
        .by_structure("(//input[@type='text' or @type='email'])[1]")
}

fn password() -> TargetSpec {
    TargetSpec::new("password field")
        .by_placeholder("Password")
        .by_label("Password")
        .by_structure("//input[@name='password']")
        .by_structure("(//input[@type='password'])[1]")
}

fn button(description: &str, name: &str, label: &str) -> TargetSpec {
    TargetSpec::new(description)
        .by_role("button", name)
        .by_structure(anchor_button(label))
}

fn timeframe() -> TargetSpec {
    TargetSpec::new("time frame dropdown")
        .by_role("combobox", "time")
        .by_label("Time Frame")
        .by_structure(
            "//input[contains(@id,'TimeFrame') or contains(@name,'TimeFrame') or contains(@aria-label,'Time')]",
        )
}

fn view() -> TargetSpec {
    TargetSpec::new("view selector")
        .by_role("combobox", "view")
        .by_label("View")
        .by_structure(
            "//input[contains(@id,'ViewSelect') or contains(@name,'ViewSelect') or contains(@aria-label,'View')]",
        )
}

fn rows() -> TargetSpec {
    TargetSpec::new("row count field")
        .by_structure(
            "//input[contains(@id,'1000') or contains(@placeholder,'1000') or contains(@aria-label,'records') or contains(@id,'Rows')]",
        )
        .by_structure(
            "//div[contains(@id,'paging') or contains(@id,'toolbar')]//input[@type='text' or @type='number']",
        )
}

/// Build the export workflow for one run.
pub fn livetrack_workflow(cfg: &ExportConfig) -> Workflow {
    Workflow::new(WORKFLOW_ID, "LiveTrack shipments export")
        .then(Step::new(
            "login.username",
            username(),
            StepAction::Fill(cfg.username.clone()),
        ))
        .then(Step::new(
            "login.password",
            password(),
            StepAction::Fill(cfg.password.clone()),
        ))
        .then(
            Step::new("login.submit", button("login button", "login", "Login"), StepAction::Click)
                .wait_for(PostCondition::NetworkIdle),
        )
        .then(
            Step::new(
                "shipments.open",
                TargetSpec::new("shipments tab")
                    .by_role("link", "shipments")
                    .by_role("tab", "shipments")
                    .by_structure(anchor_button("Shipments")),
                StepAction::Click,
            )
            .wait_for(PostCondition::NetworkIdle),
        )
        // the portal may already default to the wanted timeframe
        .then(
            Step::new(
                "filters.timeframe",
                timeframe(),
                StepAction::SelectAndConfirm(cfg.timeframe.clone()),
            )
            .wait_for(PostCondition::DomStable)
            .best_effort(),
        )
        .then(
            Step::new(
                "listing.refresh",
                button("refresh button", "refresh", "Refresh"),
                StepAction::Click,
            )
            .wait_for(PostCondition::NetworkIdle),
        )
        .then(
            Step::new(
                "filters.view",
                view(),
                StepAction::SelectAndConfirm(cfg.view.clone()),
            )
            .wait_for(PostCondition::DomStable)
            .best_effort(),
        )
        .then(
            Step::new(
                "filters.rows",
                rows(),
                StepAction::ReplaceAndConfirm(cfg.rows.to_string()),
            )
            .wait_for(PostCondition::DomStable)
            .best_effort(),
        )
        .then(
            Step::new(
                "listing.refresh_again",
                button("refresh button", "refresh", "Refresh"),
                StepAction::Click,
            )
            .wait_for(PostCondition::NetworkIdle)
            .best_effort(),
        )
        .then(
            Step::new(
                "export.actions",
                button("actions menu", "actions", "Actions"),
                StepAction::Click,
            )
            .wait_for(PostCondition::DomStable),
        )
        .then(
            Step::new(
                "export.menu",
                TargetSpec::new("export menu item")
                    .by_role("menuitem", "export")
                    .by_structure(
                        "//a[.//span[contains(normalize-space(),'Export')] or contains(normalize-space(),'Export')]",
                    ),
                StepAction::Click,
            )
            .wait_for(PostCondition::DomStable),
        )
        .capture_download(Step::new(
            "export.download",
            TargetSpec::new("download button")
                .by_role("button", "download")
                .singular()
                .by_structure(anchor_button("Download")),
            StepAction::Click,
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_flow::WorkflowNode;
    use std::collections::HashMap;

    fn config() -> ExportConfig {
        let env: HashMap<String, String> = [
            ("LIVETRACK_PORTAL_URL", "https://tracking.example.com"),
            ("LIVETRACK_USERNAME", "ops"),
            ("LIVETRACK_PASSWORD", "pw"),
            ("LIVETRACK_TIMEFRAME", "Last 30 days"),
            ("LIVETRACK_VIEW", "Annual"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        ExportConfig::from_sources(None, Some(env)).unwrap()
    }

    #[test]
    fn steps_follow_the_fixed_order() {
        let ids: Vec<_> = livetrack_workflow(&config())
            .step_ids()
            .map(str::to_string)
            .collect();
        assert_eq!(
            ids,
            vec![
                "login.username",
                "login.password",
                "login.submit",
                "shipments.open",
                "filters.timeframe",
                "listing.refresh",
                "filters.view",
                "filters.rows",
                "listing.refresh_again",
                "export.actions",
                "export.menu",
                "export.download",
            ]
        );
    }

    #[test]
    fn only_filters_and_second_refresh_are_best_effort() {
        let workflow = livetrack_workflow(&config());
        let best_effort: Vec<_> = workflow
            .nodes
            .iter()
            .map(WorkflowNode::step)
            .filter(|step| !step.is_critical())
            .map(|step| step.id().to_string())
            .collect();
        assert_eq!(
            best_effort,
            vec![
                "filters.timeframe",
                "filters.view",
                "filters.rows",
                "listing.refresh_again"
            ]
        );
    }

    #[test]
    fn download_is_captured_and_singular() {
        let workflow = livetrack_workflow(&config());
        let Some(WorkflowNode::CaptureDownload(step)) = workflow.nodes.last() else {
            panic!("last node must capture the download");
        };
        assert!(step.target().strategies()[0].singular);
    }

    #[test]
    fn rows_are_typed_as_decimal_text() {
        let workflow = livetrack_workflow(&config());
        let rows = workflow
            .nodes
            .iter()
            .map(WorkflowNode::step)
            .find(|step| step.id() == "filters.rows")
            .unwrap();
        assert_eq!(rows.action(), &StepAction::ReplaceAndConfirm("1000".into()));
    }
}
