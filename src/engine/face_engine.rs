use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Per-image outcome of the presence check. "No face" is an expected
/// business result; engine faults travel separately as `EngineError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacePresence {
    Present,
    Absent,
}

impl FacePresence {
    pub fn is_present(self) -> bool {
        matches!(self, FacePresence::Present)
    }
}

/// Record returned by the engine's verification primitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineVerification {
    pub verified: bool,
    pub distance: f64,
    pub threshold: f64,
    pub model: String,
    pub detector_backend: String,
}

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("engine request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("engine returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),
}

/// Seam for the external face engine. Implementations take image paths, a
/// strictness flag, and report "no face" as data rather than as an error.
#[async_trait]
pub trait FaceEngine: Send + Sync {
    async fn detect_face(
        &self,
        image: &Path,
        enforce_detection: bool,
    ) -> Result<FacePresence, EngineError>;

    async fn verify_faces(
        &self,
        first: &Path,
        second: &Path,
        enforce_detection: bool,
    ) -> Result<EngineVerification, EngineError>;
}
