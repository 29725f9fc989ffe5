use std::sync::Arc;
use std::time::Duration;

use axum::http::header;
use axum::routing::{get, IntoMakeService};
use axum::{middleware, Json, Router};
use http::{StatusCode, Uri};
use serde::{Deserialize, Serialize};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::propagate_header::PropagateHeaderLayer;
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;

use crate::config::settings::Settings;
use crate::engine::face_engine::FaceEngine;
use crate::middleware::request_id_mw::generate_request_id_mw;
use crate::response::api_response::{ApiResponseBuilder, ApiResponseResult};
use crate::routes::verification_routes::new_verification_routes;
use crate::state::verification_state::VerificationState;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;

#[derive(Clone, Serialize, Deserialize)]
struct FallbackResponse {
    message: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GreetingResponse {
    pub message: String,
}

#[derive(Clone)]
pub struct RouterState {
    engine: Arc<dyn FaceEngine>,
    settings: Settings,
}

impl RouterState {
    pub fn new(engine: Arc<dyn FaceEngine>, settings: Settings) -> Self {
        RouterState { engine, settings }
    }
}

pub fn root_routes(router_state: RouterState) -> IntoMakeService<Router> {
    app_router(router_state).into_make_service()
}

fn app_router(router_state: RouterState) -> Router {
    let verification_state = VerificationState::new(&router_state.engine, &router_state.settings);
    let verification_routes = new_verification_routes().with_state(verification_state);

    let request_timeout = router_state
        .settings
        .server
        .request_timeout
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

    Router::new()
        .route("/", get(root))
        .merge(verification_routes)
        .layer(CompressionLayer::new())
        .layer(PropagateHeaderLayer::new(header::HeaderName::from_static(
            "x-request-id",
        )))
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(generate_request_id_mw))
        .layer(TimeoutLayer::new(Duration::from_secs(request_timeout)))
        .layer(SetSensitiveHeadersLayer::new(std::iter::once(
            header::AUTHORIZATION,
        )))
        .fallback(fallback)
}

async fn fallback(uri: Uri) -> (StatusCode, Json<FallbackResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(FallbackResponse {
            message: format!("No route for {uri}"),
        }),
    )
}

async fn root() -> ApiResponseResult<GreetingResponse> {
    Ok(ApiResponseBuilder::new()
        .status_code(StatusCode::OK)
        .body(GreetingResponse {
            message: "Welcome to the Face Verification API".to_string(),
        })
        .build())
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use axum::body::Body;
    use http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::config::settings::{App, Engine, Logger, Server, Tracer, Verification};
    use crate::engine::face_engine::{EngineError, FacePresence};
    use crate::engine::testing::MockEngine;

    const BOUNDARY: &str = "face-verify-test-boundary";

    fn test_settings(reference_image_path: &str) -> Settings {
        Settings {
            environment: None,
            server: Server {
                http_port: 8000,
                request_timeout: Some(20),
            },
            logger: None::<Logger>,
            engine: Engine {
                base_url: "http://localhost:5005".to_string(),
                request_timeout_ms: None,
            },
            verification: Verification {
                reference_image_path: reference_image_path.to_string(),
            },
            tracer: Tracer {
                uri: "http://localhost:4317".to_string(),
            },
            app: App {
                name: "face-verify-svc".to_string(),
            },
        }
    }

    fn router_with(
        outcomes: Vec<Result<FacePresence, EngineError>>,
        reference_image_path: &str,
    ) -> (Router, Arc<MockEngine>) {
        let mock = Arc::new(MockEngine::scripted(outcomes));
        let engine: Arc<dyn FaceEngine> = mock.clone();
        let router = app_router(RouterState::new(engine, test_settings(reference_image_path)));
        (router, mock)
    }

    fn jpeg_bytes() -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            8,
            8,
            image::Rgb([255, 255, 255]),
        ));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)
            .unwrap();
        buf
    }

    fn png_bytes() -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            8,
            8,
            image::Rgb([0, 0, 0]),
        ));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn multipart_body(parts: &[(&str, &str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, content_type, data) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{name}.img\"\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(path: &str, parts: &[(&str, &str, &[u8])]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn reference_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&jpeg_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_greeting() {
        let (router, _mock) = router_with(vec![], "./unused.jpg");
        let response = router
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Welcome to the Face Verification API");
    }

    #[tokio::test]
    async fn test_unknown_route_falls_back_to_not_found() {
        let (router, _mock) = router_with(vec![], "./unused.jpg");
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/no-such-route")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_analyze_single_with_faces_in_both_images() {
        let reference = reference_file();
        let (router, _mock) = router_with(
            vec![Ok(FacePresence::Present), Ok(FacePresence::Present)],
            reference.path().to_str().unwrap(),
        );

        let response = router
            .oneshot(upload_request(
                "/analyze_single",
                &[("file", "image/jpeg", &jpeg_bytes())],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["image1_has_face"], true);
        assert_eq!(body["image2_has_face"], true);
        assert!(body["verification_result"]["verified"].is_boolean());
        assert_eq!(body["message"], "Face verification completed successfully.");
    }

    #[tokio::test]
    async fn test_analyze_single_engine_fault_is_server_error() {
        let reference = reference_file();
        let (router, _mock) = router_with(
            vec![Err(EngineError::Api {
                status: 500,
                body: "model unavailable".to_string(),
            })],
            reference.path().to_str().unwrap(),
        );

        let response = router
            .oneshot(upload_request(
                "/analyze_single",
                &[("file", "image/jpeg", &jpeg_bytes())],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(body["detail"]
            .as_str()
            .unwrap()
            .contains("face detection failed"));
    }

    #[tokio::test]
    async fn test_compare_faces_rejects_non_jpeg_upload() {
        let (router, mock) = router_with(vec![], "./unused.jpg");

        let response = router
            .oneshot(upload_request(
                "/compare_faces",
                &[
                    ("image1", "image/png", &png_bytes()),
                    ("image2", "image/jpeg", &jpeg_bytes()),
                ],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["detail"], "Both images must be JPEG");
        // Rejected before any engine work happened.
        assert!(mock.seen_images.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_compare_faces_rejects_missing_face() {
        let (router, _mock) = router_with(
            vec![Ok(FacePresence::Present), Ok(FacePresence::Absent)],
            "./unused.jpg",
        );

        let response = router
            .oneshot(upload_request(
                "/compare_faces",
                &[
                    ("image1", "image/jpeg", &jpeg_bytes()),
                    ("image2", "image/jpeg", &jpeg_bytes()),
                ],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["detail"], "Both images must contain a face");
    }

    #[tokio::test]
    async fn test_compare_faces_reports_similarity() {
        let (router, _mock) = router_with(
            vec![Ok(FacePresence::Present), Ok(FacePresence::Present)],
            "./unused.jpg",
        );

        let response = router
            .oneshot(upload_request(
                "/compare_faces",
                &[
                    ("image1", "image/jpeg", &jpeg_bytes()),
                    ("image2", "image/jpeg", &jpeg_bytes()),
                ],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["same_person"], true);
        assert!((body["similarity"].as_f64().unwrap() - 0.76).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_verify_faces_different_people() {
        let (router, mock) = router_with(
            vec![Ok(FacePresence::Present), Ok(FacePresence::Present)],
            "./unused.jpg",
        );
        mock.verify_outcomes.lock().unwrap().push_back(Ok({
            let mut verification = MockEngine::sample_verification();
            verification.verified = false;
            verification.distance = 0.71;
            verification
        }));

        let response = router
            .oneshot(upload_request(
                "/verify-faces/",
                &[
                    ("image1", "application/octet-stream", &jpeg_bytes()),
                    ("image2", "application/octet-stream", &jpeg_bytes()),
                ],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["verification_result"]["verified"], false);
        assert_eq!(body["message"], "Face verification completed successfully.");
    }

    #[tokio::test]
    async fn test_verify_faces_reports_missing_face_without_verification() {
        let (router, mock) = router_with(
            vec![Ok(FacePresence::Absent), Ok(FacePresence::Present)],
            "./unused.jpg",
        );

        let response = router
            .oneshot(upload_request(
                "/verify-faces/",
                &[
                    ("image1", "image/jpeg", &jpeg_bytes()),
                    ("image2", "image/jpeg", &jpeg_bytes()),
                ],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["image1_has_face"], false);
        assert_eq!(body["image2_has_face"], true);
        assert!(body.get("verification_result").is_none());
        assert_eq!(body["message"], "No face detected in the first image.");
        assert_eq!(*mock.verify_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_zero_byte_upload_is_rejected_not_fatal() {
        let (router, _mock) = router_with(vec![], "./unused.jpg");

        let response = router
            .oneshot(upload_request(
                "/verify-faces/",
                &[
                    ("image1", "image/jpeg", b""),
                    ("image2", "image/jpeg", &jpeg_bytes()),
                ],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["detail"], "image is empty");
    }

    #[tokio::test]
    async fn test_verify_faces_rejects_undecodable_payload() {
        let (router, _mock) = router_with(vec![], "./unused.jpg");

        let response = router
            .oneshot(upload_request(
                "/verify-faces/",
                &[
                    ("image1", "application/octet-stream", b"not an image at all"),
                    ("image2", "image/jpeg", &jpeg_bytes()),
                ],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["detail"]
            .as_str()
            .unwrap()
            .contains("image1 is not a decodable image"));
    }

    #[tokio::test]
    async fn test_slots_are_released_after_a_request() {
        let (router, mock) = router_with(
            vec![Ok(FacePresence::Present), Ok(FacePresence::Present)],
            "./unused.jpg",
        );

        let response = router
            .oneshot(upload_request(
                "/verify-faces/",
                &[
                    ("image1", "image/jpeg", &jpeg_bytes()),
                    ("image2", "image/jpeg", &jpeg_bytes()),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        for path in mock.seen_images.lock().unwrap().iter() {
            assert!(!path.exists(), "slot left behind: {}", path.display());
        }
    }
}
