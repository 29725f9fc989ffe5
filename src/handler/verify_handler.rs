use axum::debug_handler;
use axum::extract::{Multipart, State};
use bytes::Bytes;
use ecs_logger::extra_fields;
use http::{HeaderMap, StatusCode};
use log::{error, info};
use opentelemetry::global;
use opentelemetry::global::ObjectSafeSpan;
use opentelemetry::trace::{TraceContextExt, Tracer};

use crate::error::errors::Error;
use crate::handler::analyze_handler::request_id;
use crate::logger::logger::LoggerExtraFields;
use crate::models::verification_model::{ImageAnalysisResult, VerifyPairInput};
use crate::response::api_response::{ApiResponseBuilder, ApiResponseResult};
use crate::state::verification_state::VerificationState;

/// Permissive variant: no declared-type check, but the raw bytes must decode
/// as an image.
#[debug_handler(state = VerificationState)]
pub async fn verify_faces(
    headers: HeaderMap,
    State(state): State<VerificationState>,
    mut payload: Multipart,
) -> ApiResponseResult<ImageAnalysisResult> {
    let tracer = global::tracer(state.app_name.clone());
    let parent_ctx = opentelemetry::Context::new();
    let span = tracer
        .span_builder("face-verification")
        .start_with_context(&tracer, &parent_ctx);

    let request_id = request_id(&headers);
    let _ = extra_fields::set_extra_fields(LoggerExtraFields {
        request_id: request_id.clone(),
    });

    let child_ctx = parent_ctx.with_span(span);
    let mut child = tracer.start_with_context("marshal-request", &child_ctx);
    info!("received face verification request");

    let mut first_bytes: Bytes = Bytes::new();
    let mut second_bytes: Bytes = Bytes::new();
    while let Some(field) = payload
        .next_field()
        .await
        .map_err(|e| Error::validation(format!("failed to read multipart field: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image1" | "image2" => {
                let data = match field.bytes().await {
                    Ok(data) => data,
                    Err(e) => {
                        error!("failed to retrieve image from request: {e}");
                        return Err(Error::validation("failed to process image"));
                    }
                };
                if data.is_empty() {
                    return Err(Error::validation("image is empty"));
                }
                if let Err(e) = image::load_from_memory(&data) {
                    return Err(Error::validation(format!(
                        "{name} is not a decodable image: {e}"
                    )));
                }

                if name == "image1" {
                    first_bytes = data;
                } else {
                    second_bytes = data;
                }
            }
            _ => {}
        }
    }

    if first_bytes.is_empty() || second_bytes.is_empty() {
        return Err(Error::validation("both image1 and image2 are required"));
    }

    let input = VerifyPairInput {
        first_bytes,
        second_bytes,
    };
    child.end();

    let mut child = tracer.start_with_context("verify-images", &child_ctx);
    let result = match state.verification_service.verify_pair(input).await {
        Ok(result) => result,
        Err(e) => {
            error!("failed to verify faces: {e}");
            return Err(e);
        }
    };
    child.end();
    info!("completed face verification");

    extra_fields::clear_extra_fields();
    Ok(ApiResponseBuilder::new()
        .status_code(StatusCode::OK)
        .body(result)
        .build())
}
