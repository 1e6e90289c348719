//! Page capability surface for the LiveTrack export workflow.
//!
//! The workflow engine only talks to a [`Page`]: element queries by the four
//! location strategies, fill/click/keyboard primitives, settling waits and a
//! download subscription. Two implementations ship here:
//! - [`ChromiumPage`] drives a real Chromium instance over the DevTools protocol
//! - `fixture::FixturePage` is a scripted in-memory page for tests, behind
//!   the `fixture` feature

pub mod chromium;
pub mod config;
pub mod download;
pub mod error;
#[cfg(any(test, feature = "fixture"))]
pub mod fixture;
pub mod network;
pub mod page;
pub mod query;

pub use chromium::ChromiumPage;
pub use config::CdpConfig;
pub use download::{ByteSource, DownloadEvent, DownloadListener};
pub use error::{AdapterError, AdapterErrorKind};
pub use network::{NetworkActivity, NetworkSnapshot};
pub use page::Page;
pub use query::{ElementHandle, ElementQuery, Key, QueryKind};
