use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::engine::face_engine::EngineVerification;

/// Engine verification record as exposed to callers. Everything except
/// `verified` is copied through untouched; the distance/threshold semantics
/// are whatever the engine defines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub verified: bool,
    pub distance: Option<f64>,
    pub threshold: Option<f64>,
    pub model: Option<String>,
    pub detector_backend: Option<String>,
}

impl From<EngineVerification> for VerificationResult {
    fn from(verification: EngineVerification) -> Self {
        VerificationResult {
            verified: verification.verified,
            distance: Some(verification.distance),
            threshold: Some(verification.threshold),
            model: Some(verification.model),
            detector_backend: Some(verification.detector_backend),
        }
    }
}

/// Outward-facing analysis response. `verification_result` is present if and
/// only if both presence booleans are true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAnalysisResult {
    pub image1_has_face: bool,
    pub image2_has_face: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_result: Option<VerificationResult>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareFacesResult {
    pub similarity: f64,
    pub same_person: bool,
}

#[derive(Clone)]
pub struct AnalyzeSingleInput {
    pub im_bytes: Bytes,
}

#[derive(Clone)]
pub struct VerifyPairInput {
    pub first_bytes: Bytes,
    pub second_bytes: Bytes,
}

#[derive(Clone)]
pub struct CompareFacesInput {
    pub first_bytes: Bytes,
    pub second_bytes: Bytes,
}
