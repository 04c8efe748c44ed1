use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A registered person the system should treat as trusted.
///
/// Owned by the identity store; the event pipeline only reads it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceIdentity {
    pub id: u64,
    pub name: String,
    pub embedding: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<PathBuf>,
}

/// A saved image of a face nobody recognized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub id: u64,
    pub image_path: PathBuf,
    /// Unix seconds.
    pub timestamp: u64,
}
