//! [`Page`] implementation over a Chromium instance driven by `chromiumoxide`.
//!
//! Element queries run as injected scripts (see `js/locate.js`), so a handle
//! is re-resolved by running its query again and taking the match at its
//! index. Network idleness counts in-flight requests from `Network.*` events.
//! Downloads are routed into a private staging directory and reported once the
//! browser marks the transfer completed.

use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::browser::{
    DownloadProgressState, EventDownloadProgress, EventDownloadWillBegin,
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
    DispatchMouseEventType, InsertTextParams, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, EventLoadingFailed, EventLoadingFinished,
    EventRequestWillBeSent,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page as CdpPage;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use crate::config::CdpConfig;
use crate::download::{ByteSource, DownloadEvent, DownloadListener};
use crate::error::{AdapterError, AdapterErrorKind};
use crate::network::NetworkActivity;
use crate::page::Page;
use crate::query::{ElementHandle, ElementQuery, Key};

const LOCATE_JS: &str = include_str!("js/locate.js");

const POLL_INTERVAL: Duration = Duration::from_millis(100);

const READY_STATE_JS: &str = "document.readyState";

const DOM_SNAPSHOT_JS: &str = "(() => ({ ready: document.readyState, activity: document.getElementsByTagName('*').length * 1000003 + (document.body ? document.body.innerHTML.length : 0) }))()";

#[derive(Debug, Deserialize)]
struct NodeSummary {
    tag: String,
    id: Option<String>,
    name: String,
}

#[derive(Debug, Deserialize)]
struct TargetStatus {
    status: String,
    #[serde(default)]
    count: usize,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
}

#[derive(Debug, Deserialize)]
struct ActivitySnapshot {
    ready: String,
    activity: f64,
}

/// A launched Chromium browser with a single page.
pub struct ChromiumPage {
    browser: Browser,
    page: CdpPage,
    handler: JoinHandle<()>,
    network: NetworkActivity,
    network_pump: JoinHandle<()>,
    staging: TempDir,
}

impl ChromiumPage {
    /// Launch Chromium, open a blank page and route downloads to staging.
    pub async fn launch(cfg: &CdpConfig) -> Result<Self, AdapterError> {
        let browser_cfg = cfg.browser_config()?;
        let (browser, mut handler) = Browser::launch(browser_cfg).await.map_err(|err| {
            AdapterError::new(AdapterErrorKind::Internal)
                .with_hint(format!("failed to launch chromium: {err}"))
        })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(target: "cdp-adapter", %err, "handler reported an error");
                }
            }
        });

        let staging = tempfile::Builder::new()
            .prefix("livetrack-downloads-")
            .tempdir()
            .map_err(|err| {
                AdapterError::new(AdapterErrorKind::Internal)
                    .with_hint(format!("failed to create download staging dir: {err}"))
            })?;

        let page = browser.new_page("about:blank").await?;
        let (network, network_pump) = track_network(&page).await?;

        let behavior = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::AllowAndName)
            .download_path(staging.path().to_string_lossy().to_string())
            .events_enabled(true)
            .build()
            .map_err(|err| AdapterError::new(AdapterErrorKind::Internal).with_hint(err))?;
        browser.execute(behavior).await?;

        info!(
            target: "cdp-adapter",
            headless = cfg.headless,
            staging = %staging.path().display(),
            "chromium session ready"
        );

        Ok(Self {
            browser,
            page,
            handler,
            network,
            network_pump,
            staging,
        })
    }

    /// Close the browser and stop the protocol handler.
    pub async fn close(mut self) -> Result<(), AdapterError> {
        self.browser.close().await?;
        if let Err(err) = self.browser.wait().await {
            warn!(target: "cdp-adapter", %err, "browser process did not exit cleanly");
        }
        self.network_pump.abort();
        self.handler.abort();
        Ok(())
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T, AdapterError> {
        let params = EvaluateParams::builder()
            .expression(script)
            .return_by_value(true)
            .build()
            .map_err(|err| AdapterError::new(AdapterErrorKind::Internal).with_hint(err))?;
        let result = self.page.evaluate_expression(params).await?;
        result.into_value().map_err(|err| {
            AdapterError::new(AdapterErrorKind::Internal)
                .with_hint(format!("unexpected script result: {err}"))
        })
    }

    /// Run `body` with `__matches` bound to the matches of `handle`'s query.
    async fn on_target(
        &self,
        handle: &ElementHandle,
        body: &str,
    ) -> Result<TargetStatus, AdapterError> {
        let body = format!(
            "const el = __matches[{index}];\nif (!el) {{ return {{ status: 'not-found', count: __matches.length }}; }}\nel.scrollIntoView({{ block: 'center', inline: 'center' }});\n{body}",
            index = handle.index,
        );
        let status: TargetStatus = self.eval(locate_script(&handle.query, &body)).await?;
        if status.status != "ok" {
            return Err(
                AdapterError::new(AdapterErrorKind::TargetNotFound).with_hint(format!(
                    "{} has {} match(es), wanted #{}",
                    handle.query, status.count, handle.index
                )),
            );
        }
        Ok(status)
    }

    async fn mouse(&self, kind: DispatchMouseEventType, x: f64, y: f64) -> Result<(), AdapterError> {
        let params = DispatchMouseEventParams::builder()
            .r#type(kind)
            .x(x)
            .y(y)
            .button(MouseButton::Left)
            .click_count(1)
            .build()
            .map_err(|err| AdapterError::new(AdapterErrorKind::Internal).with_hint(err))?;
        self.page.execute(params).await?;
        Ok(())
    }

    async fn key_event(
        &self,
        kind: DispatchKeyEventType,
        key: Key,
    ) -> Result<(), AdapterError> {
        let builder = DispatchKeyEventParams::builder().r#type(kind.clone());
        let builder = match key {
            Key::Enter => {
                let builder = builder
                    .key("Enter")
                    .code("Enter")
                    .windows_virtual_key_code(13)
                    .native_virtual_key_code(13);
                if kind == DispatchKeyEventType::KeyDown {
                    builder.text("\r")
                } else {
                    builder
                }
            }
            Key::SelectAll => builder
                .key("a")
                .code("KeyA")
                .modifiers(2)
                .windows_virtual_key_code(65)
                .native_virtual_key_code(65)
                .commands(vec!["selectAll".to_string()]),
        };
        let params = builder
            .build()
            .map_err(|err| AdapterError::new(AdapterErrorKind::Internal).with_hint(err))?;
        self.page.execute(params).await?;
        Ok(())
    }

    /// Poll `snapshot` until the document is complete and its activity
    /// fingerprint stayed unchanged for `quiet`.
    async fn wait_quiet(&self, snapshot: &str, quiet: Duration) -> Result<(), AdapterError> {
        let mut last: Option<f64> = None;
        let mut stable_since = Instant::now();
        loop {
            let current: ActivitySnapshot = self.eval(snapshot.to_string()).await?;
            if current.ready != "complete" || last != Some(current.activity) {
                last = Some(current.activity);
                stable_since = Instant::now();
            } else if stable_since.elapsed() >= quiet {
                return Ok(());
            }
            sleep(POLL_INTERVAL).await;
        }
    }
}

/// Subscribe to request lifecycle events, then enable the Network domain.
async fn track_network(
    page: &CdpPage,
) -> Result<(NetworkActivity, JoinHandle<()>), AdapterError> {
    let mut started = page.event_listener::<EventRequestWillBeSent>().await?;
    let mut finished = page.event_listener::<EventLoadingFinished>().await?;
    let mut failed = page.event_listener::<EventLoadingFailed>().await?;
    page.execute(NetworkEnableParams::default()).await?;

    let activity = NetworkActivity::new();
    let tracker = activity.clone();
    let pump = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(event) = started.next() => tracker.request_started(event.request_id.inner()),
                Some(event) = finished.next() => tracker.request_settled(event.request_id.inner()),
                Some(event) = failed.next() => {
                    debug!(target: "cdp-adapter", error = %event.error_text, "request failed");
                    tracker.request_settled(event.request_id.inner());
                }
                else => break,
            }
        }
    });
    Ok((activity, pump))
}

fn locate_script(query: &ElementQuery, body: &str) -> String {
    let (kind, param) = match query {
        ElementQuery::RoleAndName { role, name } => (
            "RoleAndName",
            json!({ "role": role.to_lowercase(), "name": name }),
        ),
        ElementQuery::Placeholder { text } => ("Placeholder", json!({ "value": text })),
        ElementQuery::LabelAdjacency { label } => ("LabelAdjacency", json!({ "value": label })),
        ElementQuery::Structural { pattern } => ("Structural", json!({ "value": pattern })),
    };
    format!(
        "(() => {{\n{LOCATE_JS}\nconst __matches = __ltFind({kind}, {param});\n{body}\n}})()",
        kind = json!(kind),
    )
}

#[async_trait]
impl Page for ChromiumPage {
    async fn navigate(&self, url: &str, deadline: Duration) -> Result<(), AdapterError> {
        debug!(target: "cdp-adapter", %url, "navigating");
        match timeout(deadline, self.page.goto(url)).await {
            Ok(result) => {
                result?;
                Ok(())
            }
            Err(_) => Err(AdapterError::new(AdapterErrorKind::NavTimeout)
                .with_hint(format!("{url} did not load within {}ms", deadline.as_millis()))),
        }
    }

    async fn query(&self, query: &ElementQuery) -> Result<Vec<ElementHandle>, AdapterError> {
        let body = "return __matches.map((el) => ({ tag: el.tagName.toLowerCase(), id: el.id || null, name: __ltName(el) }));";
        let nodes: Vec<NodeSummary> = self.eval(locate_script(query, body)).await?;
        Ok(nodes
            .into_iter()
            .enumerate()
            .map(|(index, node)| {
                let description = match node.id {
                    Some(id) => format!("{}#{} '{}'", node.tag, id, node.name),
                    None => format!("{} '{}'", node.tag, node.name),
                };
                ElementHandle::new(query.clone(), index, description)
            })
            .collect())
    }

    async fn fill(&self, handle: &ElementHandle, value: &str) -> Result<(), AdapterError> {
        self.on_target(
            handle,
            "el.focus();\nif (typeof el.select === 'function') { el.select(); }\nif ('value' in el) { el.value = ''; el.dispatchEvent(new Event('input', { bubbles: true })); }\nreturn { status: 'ok' };",
        )
        .await?;
        if !value.is_empty() {
            self.page.execute(InsertTextParams::new(value)).await?;
        }
        let _: serde_json::Value = self
            .eval("(() => { const el = document.activeElement; if (el) { el.dispatchEvent(new Event('change', { bubbles: true })); } return null; })()".to_string())
            .await?;
        Ok(())
    }

    async fn click(&self, handle: &ElementHandle) -> Result<(), AdapterError> {
        let target = self
            .on_target(
                handle,
                "const rect = el.getBoundingClientRect();\nreturn { status: 'ok', x: rect.left + rect.width / 2, y: rect.top + rect.height / 2 };",
            )
            .await?;
        self.mouse(DispatchMouseEventType::MouseMoved, target.x, target.y)
            .await?;
        self.mouse(DispatchMouseEventType::MousePressed, target.x, target.y)
            .await?;
        self.mouse(DispatchMouseEventType::MouseReleased, target.x, target.y)
            .await
    }

    async fn keyboard_type(&self, text: &str) -> Result<(), AdapterError> {
        self.page.execute(InsertTextParams::new(text)).await?;
        Ok(())
    }

    async fn keyboard_press(&self, key: Key) -> Result<(), AdapterError> {
        self.key_event(DispatchKeyEventType::KeyDown, key).await?;
        self.key_event(DispatchKeyEventType::KeyUp, key).await
    }

    async fn wait_for_network_idle(&self, quiet: Duration) -> Result<(), AdapterError> {
        loop {
            let ready: String = self.eval(READY_STATE_JS.to_string()).await?;
            let snapshot = self.network.snapshot();
            if ready == "complete" && snapshot.is_quiet(quiet) {
                return Ok(());
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_for_dom_stable(&self, quiet: Duration) -> Result<(), AdapterError> {
        self.wait_quiet(DOM_SNAPSHOT_JS, quiet).await
    }

    async fn subscribe_downloads(&self) -> Result<DownloadListener, AdapterError> {
        let mut begins = self
            .browser
            .event_listener::<EventDownloadWillBegin>()
            .await?;
        let mut progress = self
            .browser
            .event_listener::<EventDownloadProgress>()
            .await?;
        let staging = self.staging.path().to_path_buf();
        let (tx, listener) = DownloadListener::channel();

        let pump = tokio::spawn(async move {
            let Some(begin) = begins.next().await else {
                return;
            };
            debug!(
                target: "cdp-adapter",
                guid = %begin.guid,
                suggested = %begin.suggested_filename,
                "download started"
            );
            while let Some(update) = progress.next().await {
                if update.guid != begin.guid {
                    continue;
                }
                let outcome = match update.state {
                    DownloadProgressState::InProgress => continue,
                    DownloadProgressState::Completed => Ok(DownloadEvent {
                        suggested_filename: Some(begin.suggested_filename.clone())
                            .filter(|name| !name.is_empty()),
                        source: ByteSource::File(staging.join(&begin.guid)),
                    }),
                    DownloadProgressState::Canceled => Err(AdapterError::new(
                        AdapterErrorKind::DownloadCanceled,
                    )
                    .with_hint(format!("transfer {} was canceled", begin.guid))),
                };
                let _ = tx.send(outcome).await;
                return;
            }
        });

        Ok(listener.with_pump(pump))
    }
}
