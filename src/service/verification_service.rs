use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::error;

use crate::config::settings::Verification as VerificationSettings;
use crate::engine::face_engine::{EngineVerification, FaceEngine, FacePresence};
use crate::error::errors::Error;
use crate::models::verification_model::{
    AnalyzeSingleInput, CompareFacesInput, CompareFacesResult, ImageAnalysisResult,
    VerificationResult, VerifyPairInput,
};
use crate::storage::transient::TransientSlot;

const VERIFICATION_COMPLETED: &str = "Face verification completed successfully.";
const NO_FACES_IN_EITHER: &str = "No faces detected in either image.";

/// Message wording for the two pair variants: the single-image endpoint
/// talks about the uploaded/comparison image, the two-upload endpoints
/// about the first/second image.
#[derive(Clone, Copy)]
enum PairWording {
    UploadedAndComparison,
    FirstAndSecond,
}

impl PairWording {
    fn first_missing(self) -> &'static str {
        match self {
            PairWording::UploadedAndComparison => "No face detected in the uploaded image.",
            PairWording::FirstAndSecond => "No face detected in the first image.",
        }
    }

    fn second_missing(self) -> &'static str {
        match self {
            PairWording::UploadedAndComparison => "No face detected in the comparison image.",
            PairWording::FirstAndSecond => "No face detected in the second image.",
        }
    }
}

#[derive(Clone)]
pub struct VerificationService {
    engine: Arc<dyn FaceEngine>,
    reference_image_path: PathBuf,
}

impl VerificationService {
    pub fn new(engine: &Arc<dyn FaceEngine>, settings: &VerificationSettings) -> Self {
        VerificationService {
            engine: Arc::clone(engine),
            reference_image_path: PathBuf::from(&settings.reference_image_path),
        }
    }

    /// Compare one uploaded image against the configured reference image.
    pub async fn analyze_single(
        &self,
        input: AnalyzeSingleInput,
    ) -> Result<ImageAnalysisResult, Error> {
        let slot = TransientSlot::materialize(&input.im_bytes)?;

        let uploaded = self.check_face(slot.path()).await?;
        let comparison = self.check_face(&self.reference_image_path).await?;

        let verification = if uploaded.is_present() && comparison.is_present() {
            Some(self.verify(slot.path(), &self.reference_image_path).await?)
        } else {
            None
        };

        Ok(assemble_response(
            uploaded,
            comparison,
            verification,
            PairWording::UploadedAndComparison,
        ))
    }

    /// Full analysis of two uploaded images.
    pub async fn verify_pair(&self, input: VerifyPairInput) -> Result<ImageAnalysisResult, Error> {
        let first = TransientSlot::materialize(&input.first_bytes)?;
        let second = TransientSlot::materialize(&input.second_bytes)?;

        // Both checks run even when the first image already failed, so the
        // response carries per-image status.
        let first_presence = self.check_face(first.path()).await?;
        let second_presence = self.check_face(second.path()).await?;

        let verification = if first_presence.is_present() && second_presence.is_present() {
            Some(self.verify(first.path(), second.path()).await?)
        } else {
            None
        };

        Ok(assemble_response(
            first_presence,
            second_presence,
            verification,
            PairWording::FirstAndSecond,
        ))
    }

    /// Bare similarity verdict for two uploaded images; both must contain a
    /// face or the request is rejected.
    pub async fn compare(&self, input: CompareFacesInput) -> Result<CompareFacesResult, Error> {
        let first = TransientSlot::materialize(&input.first_bytes)?;
        let second = TransientSlot::materialize(&input.second_bytes)?;

        let first_presence = self.check_face(first.path()).await?;
        let second_presence = self.check_face(second.path()).await?;

        if !first_presence.is_present() || !second_presence.is_present() {
            return Err(Error::validation("Both images must contain a face"));
        }

        let verification = self.verify(first.path(), second.path()).await?;

        Ok(CompareFacesResult {
            similarity: 1.0 - verification.distance,
            same_person: verification.verified,
        })
    }

    async fn check_face(&self, image: &Path) -> Result<FacePresence, Error> {
        match self.engine.detect_face(image, true).await {
            Ok(presence) => Ok(presence),
            Err(e) => {
                error!("face detection failed for {}: {e}", image.display());
                Err(Error::Detection(e))
            }
        }
    }

    async fn verify(&self, first: &Path, second: &Path) -> Result<EngineVerification, Error> {
        // Presence is already confirmed at this point, so the engine runs in
        // lenient mode.
        match self.engine.verify_faces(first, second, false).await {
            Ok(verification) => Ok(verification),
            Err(e) => {
                error!("face verification failed: {e}");
                Err(Error::Verification(e))
            }
        }
    }
}

fn assemble_response(
    first: FacePresence,
    second: FacePresence,
    verification: Option<EngineVerification>,
    wording: PairWording,
) -> ImageAnalysisResult {
    let message = match (first.is_present(), second.is_present()) {
        (true, true) => VERIFICATION_COMPLETED,
        (false, true) => wording.first_missing(),
        (true, false) => wording.second_missing(),
        (false, false) => NO_FACES_IN_EITHER,
    };

    ImageAnalysisResult {
        image1_has_face: first.is_present(),
        image2_has_face: second.is_present(),
        verification_result: verification.map(VerificationResult::from),
        message: message.to_string(),
    }
}
