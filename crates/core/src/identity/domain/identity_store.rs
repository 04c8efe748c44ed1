use std::path::{Path, PathBuf};

use thiserror::Error;

use super::reference_identity::{CaptureRecord, ReferenceIdentity};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt store file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid embedding: {0}")]
    InvalidEmbedding(String),
    #[error("identity name must not be empty")]
    EmptyName,
}

/// Persisted registry of trusted identities plus the log of captured
/// unknown faces.
pub trait IdentityStore: Send {
    /// Trusted identities in registration order.
    fn references(&self) -> Result<Vec<ReferenceIdentity>, StoreError>;

    fn add_reference(
        &mut self,
        name: &str,
        embedding: Vec<f32>,
        image_path: Option<PathBuf>,
    ) -> Result<u64, StoreError>;

    /// Returns `false` if no identity had that id.
    fn remove_reference(&mut self, id: u64) -> Result<bool, StoreError>;

    fn log_capture(&mut self, image_path: &Path) -> Result<u64, StoreError>;

    /// Captures, newest first.
    fn captures(&self) -> Result<Vec<CaptureRecord>, StoreError>;
}
