use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A persisted download. Created once per run by the download capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadArtifact {
    /// Name suggested by the portal, after hygiene and defaulting.
    pub suggested_name: String,
    pub saved_path: PathBuf,
    pub captured_at_epoch_seconds: i64,
}
