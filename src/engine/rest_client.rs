use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::settings::Engine as EngineSettings;
use crate::engine::face_engine::{EngineError, EngineVerification, FaceEngine, FacePresence};

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// JSON-over-HTTP client for the co-deployed face-engine sidecar. Images
/// travel base64-encoded; the sidecar reports "no face" inside a 200 body,
/// so only non-2xx statuses become engine faults.
#[derive(Clone)]
pub struct RestFaceEngine {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct DetectRequest<'a> {
    img: &'a str,
    enforce_detection: bool,
}

#[derive(Deserialize)]
struct DetectResponse {
    face_detected: bool,
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    img1: &'a str,
    img2: &'a str,
    enforce_detection: bool,
}

#[derive(Deserialize)]
struct VerifyResponse {
    verified: bool,
    distance: f64,
    threshold: f64,
    model: String,
    detector_backend: String,
}

impl RestFaceEngine {
    pub fn new(settings: &EngineSettings) -> Result<Self, EngineError> {
        let timeout = settings
            .request_timeout_ms
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout))
            .build()?;

        Ok(RestFaceEngine {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn encode_image(&self, image: &Path) -> Result<String, EngineError> {
        let im_bytes = tokio::fs::read(image).await?;
        Ok(STANDARD.encode(im_bytes))
    }

    async fn post_json<Req, Resp>(&self, endpoint: &str, request: &Req) -> Result<Resp, EngineError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, endpoint))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Api { status, body });
        }

        Ok(response.json::<Resp>().await?)
    }
}

#[async_trait]
impl FaceEngine for RestFaceEngine {
    async fn detect_face(
        &self,
        image: &Path,
        enforce_detection: bool,
    ) -> Result<FacePresence, EngineError> {
        let img = self.encode_image(image).await?;
        let result: DetectResponse = self
            .post_json(
                "detect",
                &DetectRequest {
                    img: &img,
                    enforce_detection,
                },
            )
            .await?;

        if result.face_detected {
            Ok(FacePresence::Present)
        } else {
            Ok(FacePresence::Absent)
        }
    }

    async fn verify_faces(
        &self,
        first: &Path,
        second: &Path,
        enforce_detection: bool,
    ) -> Result<EngineVerification, EngineError> {
        let img1 = self.encode_image(first).await?;
        let img2 = self.encode_image(second).await?;
        let result: VerifyResponse = self
            .post_json(
                "verify",
                &VerifyRequest {
                    img1: &img1,
                    img2: &img2,
                    enforce_detection,
                },
            )
            .await?;

        Ok(EngineVerification {
            verified: result.verified,
            distance: result.distance,
            threshold: result.threshold,
            model: result.model,
            detector_backend: result.detector_backend,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_settings(base_url: &str) -> EngineSettings {
        EngineSettings {
            base_url: base_url.to_string(),
            request_timeout_ms: Some(500),
        }
    }

    #[test]
    fn test_base_url_loses_trailing_slash() {
        let engine = RestFaceEngine::new(&engine_settings("http://engine:5005/")).unwrap();
        assert_eq!(engine.base_url, "http://engine:5005");
    }

    #[test]
    fn test_verify_response_wire_shape() {
        let raw = r#"{
            "verified": false,
            "distance": 0.68,
            "threshold": 0.4,
            "model": "VGG-Face",
            "detector_backend": "opencv"
        }"#;

        let parsed: VerifyResponse = serde_json::from_str(raw).unwrap();
        assert!(!parsed.verified);
        assert_eq!(parsed.distance, 0.68);
        assert_eq!(parsed.detector_backend, "opencv");
    }

    #[tokio::test]
    async fn test_missing_image_surfaces_as_io_error() {
        let engine = RestFaceEngine::new(&engine_settings("http://engine:5005")).unwrap();
        let result = engine
            .detect_face(Path::new("/definitely/not/here.jpg"), true)
            .await;
        assert!(matches!(result, Err(EngineError::Io(_))));
    }
}
