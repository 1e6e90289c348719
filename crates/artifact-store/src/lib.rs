//! Artifact store: maps a captured download to its final path on disk.

pub mod clock;
pub mod errors;
pub mod fs;
pub mod layout;
pub mod model;

pub use clock::{Clock, FixedClock, SystemClock};
pub use errors::StoreError;
pub use fs::{ArtifactStore, FsArtifactStore};
pub use layout::{artifact_file_name, suggested_name, DEFAULT_SUGGESTED_NAME};
pub use model::DownloadArtifact;
