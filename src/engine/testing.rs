use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::engine::face_engine::{EngineError, EngineVerification, FaceEngine, FacePresence};

/// Scripted engine double for tests: pops one detection outcome per call
/// (defaulting to `Present` when the script runs dry) and records every
/// image path it is handed, so tests can assert on slot lifecycles.
#[derive(Default)]
pub struct MockEngine {
    pub detect_outcomes: Mutex<VecDeque<Result<FacePresence, EngineError>>>,
    pub verify_outcomes: Mutex<VecDeque<Result<EngineVerification, EngineError>>>,
    pub seen_images: Mutex<Vec<PathBuf>>,
    pub verify_calls: Mutex<usize>,
}

impl MockEngine {
    pub fn scripted(outcomes: Vec<Result<FacePresence, EngineError>>) -> Self {
        MockEngine {
            detect_outcomes: Mutex::new(outcomes.into()),
            ..Default::default()
        }
    }

    pub fn sample_verification() -> EngineVerification {
        EngineVerification {
            verified: true,
            distance: 0.24,
            threshold: 0.4,
            model: "VGG-Face".to_string(),
            detector_backend: "opencv".to_string(),
        }
    }
}

#[async_trait]
impl FaceEngine for MockEngine {
    async fn detect_face(
        &self,
        image: &Path,
        _enforce_detection: bool,
    ) -> Result<FacePresence, EngineError> {
        assert!(
            image.exists(),
            "engine was handed a path that does not exist: {}",
            image.display()
        );
        self.seen_images.lock().unwrap().push(image.to_path_buf());
        self.detect_outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(FacePresence::Present))
    }

    async fn verify_faces(
        &self,
        first: &Path,
        second: &Path,
        _enforce_detection: bool,
    ) -> Result<EngineVerification, EngineError> {
        self.seen_images.lock().unwrap().push(first.to_path_buf());
        self.seen_images.lock().unwrap().push(second.to_path_buf());
        *self.verify_calls.lock().unwrap() += 1;
        self.verify_outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Self::sample_verification()))
    }
}
