//! Scripted in-memory page used to exercise the workflow engine without a browser.
//!
//! A [`FixturePage`] holds a flat list of elements in document order. Queries
//! are answered from element metadata, every query is counted per
//! [`QueryKind`], every dispatched primitive is recorded, and download events
//! can be scripted to fire when a given element is clicked.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::debug;

use crate::download::{ByteSource, DownloadEvent, DownloadListener, DownloadSender};
use crate::error::{AdapterError, AdapterErrorKind};
use crate::page::Page;
use crate::query::{ElementHandle, ElementQuery, Key, QueryKind};

/// One element of a fixture document.
#[derive(Debug, Clone, Default)]
pub struct FixtureElement {
    pub id: String,
    pub tag: String,
    pub role: Option<String>,
    pub name: Option<String>,
    pub placeholder: Option<String>,
    /// Visible text; used for `<label>` elements.
    pub text: Option<String>,
    /// Structural patterns (XPath expressions) this element satisfies.
    pub patterns: Vec<String>,
}

impl FixtureElement {
    pub fn new(id: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn input(id: impl Into<String>) -> Self {
        Self::new(id, "input").with_role("textbox")
    }

    pub fn button(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, "button").with_role("button").with_name(name)
    }

    pub fn link(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, "a").with_role("link").with_name(name)
    }

    pub fn menu_item(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, "a").with_role("menuitem").with_name(name)
    }

    pub fn combobox(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, "input").with_role("combobox").with_name(name)
    }

    pub fn label(id: impl Into<String>, text: impl Into<String>) -> Self {
        let mut element = Self::new(id, "label");
        element.text = Some(text.into());
        element
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn matching(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    fn is_input(&self) -> bool {
        matches!(self.tag.as_str(), "input" | "textarea" | "select")
    }
}

/// How a scripted post-condition behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settle {
    Immediately,
    Never,
}

/// A primitive dispatched against the fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedAction {
    Navigate(String),
    Fill { element: String, value: String },
    Click { element: String },
    Type(String),
    Press(Key),
}

struct ScriptedDownload {
    suggested_filename: Option<String>,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct FixtureState {
    query_counts: HashMap<QueryKind, usize>,
    actions: Vec<RecordedAction>,
    values: HashMap<String, String>,
    focused: Option<String>,
    replace_on_type: bool,
    download_tx: Option<DownloadSender>,
    downloads_on_click: HashMap<String, ScriptedDownload>,
    missed_downloads: usize,
    rejected: HashSet<String>,
    failing_queries: HashSet<QueryKind>,
    failing_navigation: Option<AdapterErrorKind>,
}

/// Scripted page; see the module docs.
pub struct FixturePage {
    elements: Vec<FixtureElement>,
    network_idle: Settle,
    dom_stable: Settle,
    state: Mutex<FixtureState>,
}

impl FixturePage {
    pub fn new(elements: Vec<FixtureElement>) -> Self {
        Self {
            elements,
            network_idle: Settle::Immediately,
            dom_stable: Settle::Immediately,
            state: Mutex::new(FixtureState::default()),
        }
    }

    pub fn with_network_idle(mut self, settle: Settle) -> Self {
        self.network_idle = settle;
        self
    }

    pub fn with_dom_stable(mut self, settle: Settle) -> Self {
        self.dom_stable = settle;
        self
    }

    /// Fire a download when `element` is clicked while a listener is armed.
    pub fn on_click_download(
        self,
        element: impl Into<String>,
        suggested_filename: Option<&str>,
        bytes: &[u8],
    ) -> Self {
        self.state.lock().downloads_on_click.insert(
            element.into(),
            ScriptedDownload {
                suggested_filename: suggested_filename.map(str::to_string),
                bytes: bytes.to_vec(),
            },
        );
        self
    }

    /// Make every primitive dispatched at `element` fail.
    pub fn rejecting(self, element: impl Into<String>) -> Self {
        self.state.lock().rejected.insert(element.into());
        self
    }

    /// Make every query of the given kinds fail as a broken session would.
    pub fn failing_queries(self, kinds: impl IntoIterator<Item = QueryKind>) -> Self {
        self.state.lock().failing_queries.extend(kinds);
        self
    }

    /// Make `navigate` fail with `kind`.
    pub fn failing_navigation(self, kind: AdapterErrorKind) -> Self {
        self.state.lock().failing_navigation = Some(kind);
        self
    }

    pub fn query_count(&self, kind: QueryKind) -> usize {
        self.state.lock().query_counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_queries(&self) -> usize {
        self.state.lock().query_counts.values().sum()
    }

    pub fn actions(&self) -> Vec<RecordedAction> {
        self.state.lock().actions.clone()
    }

    /// Ids of clicked elements, in order.
    pub fn clicked(&self) -> Vec<String> {
        self.state
            .lock()
            .actions
            .iter()
            .filter_map(|action| match action {
                RecordedAction::Click { element } => Some(element.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn value_of(&self, element: &str) -> Option<String> {
        self.state.lock().values.get(element).cloned()
    }

    /// Downloads that fired while no listener was armed.
    pub fn missed_downloads(&self) -> usize {
        self.state.lock().missed_downloads
    }

    fn matches(&self, query: &ElementQuery) -> Vec<usize> {
        match query {
            ElementQuery::RoleAndName { role, name } => {
                let needle = name.to_lowercase();
                self.positions(|el| {
                    el.role.as_deref() == Some(role.as_str())
                        && el
                            .name
                            .as_deref()
                            .is_some_and(|n| n.to_lowercase().contains(&needle))
                })
            }
            ElementQuery::Placeholder { text } => {
                let needle = text.to_lowercase();
                self.positions(|el| {
                    el.placeholder
                        .as_deref()
                        .is_some_and(|p| p.to_lowercase().contains(&needle))
                })
            }
            ElementQuery::LabelAdjacency { label } => {
                let needle = label.to_lowercase();
                let mut found: Vec<usize> = Vec::new();
                for (pos, el) in self.elements.iter().enumerate() {
                    let is_match = el.tag == "label"
                        && el
                            .text
                            .as_deref()
                            .is_some_and(|t| t.to_lowercase().contains(&needle));
                    if !is_match {
                        continue;
                    }
                    let next = self.elements[pos + 1..]
                        .iter()
                        .position(FixtureElement::is_input)
                        .map(|offset| pos + 1 + offset);
                    if let Some(next) = next {
                        if !found.contains(&next) {
                            found.push(next);
                        }
                    }
                }
                found.sort_unstable();
                found
            }
            ElementQuery::Structural { pattern } => {
                self.positions(|el| el.patterns.iter().any(|p| p == pattern))
            }
        }
    }

    fn positions(&self, predicate: impl Fn(&FixtureElement) -> bool) -> Vec<usize> {
        self.elements
            .iter()
            .enumerate()
            .filter(|(_, el)| predicate(el))
            .map(|(pos, _)| pos)
            .collect()
    }

    /// Re-run the handle's query and return the addressed element id.
    fn target(&self, handle: &ElementHandle) -> Result<String, AdapterError> {
        let positions = self.matches(&handle.query);
        let pos = positions.get(handle.index).copied().ok_or_else(|| {
            AdapterError::new(AdapterErrorKind::TargetNotFound)
                .with_hint(format!("{} has no match #{}", handle.query, handle.index))
        })?;
        let id = self.elements[pos].id.clone();
        if self.state.lock().rejected.contains(&id) {
            return Err(AdapterError::new(AdapterErrorKind::CdpIo)
                .with_hint(format!("element '{id}' rejected the action")));
        }
        Ok(id)
    }

    async fn settle(settle: Settle) {
        if settle == Settle::Never {
            futures::future::pending::<()>().await;
        }
    }
}

#[async_trait]
impl Page for FixturePage {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        state.actions.push(RecordedAction::Navigate(url.to_string()));
        match state.failing_navigation {
            Some(kind) => Err(AdapterError::new(kind).with_hint(format!(
                "{url} did not load within {}ms",
                timeout.as_millis()
            ))),
            None => Ok(()),
        }
    }

    async fn query(&self, query: &ElementQuery) -> Result<Vec<ElementHandle>, AdapterError> {
        {
            let mut state = self.state.lock();
            *state.query_counts.entry(query.kind()).or_insert(0) += 1;
            if state.failing_queries.contains(&query.kind()) {
                return Err(AdapterError::new(AdapterErrorKind::CdpIo)
                    .with_hint("browser connection closed"));
            }
        }
        Ok(self
            .matches(query)
            .into_iter()
            .enumerate()
            .map(|(index, pos)| ElementHandle::new(query.clone(), index, &self.elements[pos].id))
            .collect())
    }

    async fn fill(&self, handle: &ElementHandle, value: &str) -> Result<(), AdapterError> {
        let element = self.target(handle)?;
        let mut state = self.state.lock();
        state.values.insert(element.clone(), value.to_string());
        state.focused = Some(element.clone());
        state.actions.push(RecordedAction::Fill {
            element,
            value: value.to_string(),
        });
        Ok(())
    }

    async fn click(&self, handle: &ElementHandle) -> Result<(), AdapterError> {
        let element = self.target(handle)?;
        let mut state = self.state.lock();
        state.focused = Some(element.clone());
        state.replace_on_type = false;
        state.actions.push(RecordedAction::Click {
            element: element.clone(),
        });

        if let Some(download) = state.downloads_on_click.get(&element) {
            let event = DownloadEvent {
                suggested_filename: download.suggested_filename.clone(),
                source: ByteSource::Memory(download.bytes.clone()),
            };
            let delivered = state
                .download_tx
                .as_ref()
                .is_some_and(|tx| tx.try_send(Ok(event)).is_ok());
            if !delivered {
                debug!(element = %element, "download fired with no armed listener");
                state.missed_downloads += 1;
            }
        }
        Ok(())
    }

    async fn keyboard_type(&self, text: &str) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        if let Some(focused) = state.focused.clone() {
            let replace = std::mem::take(&mut state.replace_on_type);
            let value = state.values.entry(focused).or_default();
            if replace {
                value.clear();
            }
            value.push_str(text);
        }
        state.actions.push(RecordedAction::Type(text.to_string()));
        Ok(())
    }

    async fn keyboard_press(&self, key: Key) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        if key == Key::SelectAll {
            state.replace_on_type = true;
        }
        state.actions.push(RecordedAction::Press(key));
        Ok(())
    }

    async fn wait_for_network_idle(&self, _quiet: Duration) -> Result<(), AdapterError> {
        Self::settle(self.network_idle).await;
        Ok(())
    }

    async fn wait_for_dom_stable(&self, _quiet: Duration) -> Result<(), AdapterError> {
        Self::settle(self.dom_stable).await;
        Ok(())
    }

    async fn subscribe_downloads(&self) -> Result<DownloadListener, AdapterError> {
        let (tx, listener) = DownloadListener::channel();
        self.state.lock().download_tx = Some(tx);
        Ok(listener)
    }
}
