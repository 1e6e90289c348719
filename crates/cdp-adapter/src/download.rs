//! Download subscription types.

use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::AdapterError;

/// Where the bytes of a finished transfer can be read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ByteSource {
    /// Bytes held in memory.
    Memory(Vec<u8>),

    /// A file the browser already wrote to a staging location.
    File(PathBuf),
}

/// A completed browser download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadEvent {
    /// Filename suggested by the server, if any.
    pub suggested_filename: Option<String>,
    pub source: ByteSource,
}

pub(crate) type DownloadSender = mpsc::Sender<Result<DownloadEvent, AdapterError>>;

/// An armed download listener.
///
/// Downloads that start after the listener was created are delivered through
/// [`DownloadListener::next`]. Dropping the listener disarms it.
pub struct DownloadListener {
    rx: mpsc::Receiver<Result<DownloadEvent, AdapterError>>,
    pump: Option<JoinHandle<()>>,
}

impl DownloadListener {
    pub(crate) fn channel() -> (DownloadSender, Self) {
        let (tx, rx) = mpsc::channel(4);
        (tx, Self { rx, pump: None })
    }

    /// Attach the task that feeds this listener; it is aborted on drop.
    pub(crate) fn with_pump(mut self, pump: JoinHandle<()>) -> Self {
        self.pump = Some(pump);
        self
    }

    /// Wait for the next completed download. `None` means the source closed.
    pub async fn next(&mut self) -> Option<Result<DownloadEvent, AdapterError>> {
        self.rx.recv().await
    }
}

impl Drop for DownloadListener {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}
