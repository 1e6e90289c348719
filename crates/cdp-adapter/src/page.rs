//! The page capability surface consumed by the workflow engine.

use async_trait::async_trait;
use std::time::Duration;

use crate::download::DownloadListener;
use crate::error::AdapterError;
use crate::query::{ElementHandle, ElementQuery, Key};

/// Operations the workflow engine needs from a live page.
///
/// Implementations never retry on their own; bounded waits are applied by
/// the caller around [`Page::wait_for_network_idle`] and
/// [`Page::wait_for_dom_stable`], which otherwise wait until settled.
#[async_trait]
pub trait Page: Send + Sync {
    /// Navigate to `url` and wait for the document to load.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), AdapterError>;

    /// All current matches of `query`, in document order. Must not mutate the page.
    async fn query(&self, query: &ElementQuery) -> Result<Vec<ElementHandle>, AdapterError>;

    /// Clear the element's content and write `value` into it.
    async fn fill(&self, handle: &ElementHandle, value: &str) -> Result<(), AdapterError>;

    /// Primary activation (left click) on the element.
    async fn click(&self, handle: &ElementHandle) -> Result<(), AdapterError>;

    /// Emit `text` as keyed input to the focused element.
    async fn keyboard_type(&self, text: &str) -> Result<(), AdapterError>;

    /// Press and release a single key or chord.
    async fn keyboard_press(&self, key: Key) -> Result<(), AdapterError>;

    /// Resolve once no network activity was observed for `quiet`.
    async fn wait_for_network_idle(&self, quiet: Duration) -> Result<(), AdapterError>;

    /// Resolve once the DOM stopped changing for `quiet`.
    async fn wait_for_dom_stable(&self, quiet: Duration) -> Result<(), AdapterError>;

    /// Arm a listener for downloads that begin after this call returns.
    async fn subscribe_downloads(&self) -> Result<DownloadListener, AdapterError>;
}
