use axum::debug_handler;
use axum::extract::{Multipart, State};
use bytes::Bytes;
use ecs_logger::extra_fields;
use http::{HeaderMap, StatusCode};
use log::{error, info};

use crate::error::errors::Error;
use crate::handler::analyze_handler::request_id;
use crate::logger::logger::LoggerExtraFields;
use crate::models::verification_model::{CompareFacesInput, CompareFacesResult};
use crate::response::api_response::{ApiResponseBuilder, ApiResponseResult};
use crate::state::verification_state::VerificationState;

/// Strict variant: both uploads must declare a JPEG content type before any
/// storage or detection work happens.
#[debug_handler(state = VerificationState)]
pub async fn compare_faces(
    headers: HeaderMap,
    State(state): State<VerificationState>,
    mut payload: Multipart,
) -> ApiResponseResult<CompareFacesResult> {
    let request_id = request_id(&headers);
    let _ = extra_fields::set_extra_fields(LoggerExtraFields {
        request_id: request_id.clone(),
    });

    info!("received face comparison request");

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
                let declared_jpeg = field
                    .content_type()
                    .is_some_and(|ct| ct.eq_ignore_ascii_case(mime::IMAGE_JPEG.as_ref()));
                if !declared_jpeg {
                    return Err(Error::validation("Both images must be JPEG"));
                }

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

    let input = CompareFacesInput {
        first_bytes,
        second_bytes,
    };

    let result = match state.verification_service.compare(input).await {
        Ok(result) => result,
        Err(e) => {
            error!("failed to compare faces: {e}");
            return Err(e);
        }
    };
    info!("completed face comparison");

    extra_fields::clear_extra_fields();
    Ok(ApiResponseBuilder::new()
        .status_code(StatusCode::OK)
        .body(result)
        .build())
}
