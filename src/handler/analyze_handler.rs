use axum::debug_handler;
use axum::extract::{Multipart, State};
use bytes::Bytes;
use ecs_logger::extra_fields;
use http::{HeaderMap, StatusCode};
use log::{error, info};

use crate::error::errors::Error;
use crate::logger::logger::LoggerExtraFields;
use crate::models::verification_model::{AnalyzeSingleInput, ImageAnalysisResult};
use crate::response::api_response::{ApiResponseBuilder, ApiResponseResult};
use crate::state::verification_state::VerificationState;

pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[debug_handler(state = VerificationState)]
pub async fn analyze_single(
    headers: HeaderMap,
    State(state): State<VerificationState>,
    mut payload: Multipart,
) -> ApiResponseResult<ImageAnalysisResult> {
    let request_id = request_id(&headers);
    let _ = extra_fields::set_extra_fields(LoggerExtraFields {
        request_id: request_id.clone(),
    });

    info!("received single image analysis request");

    let mut im_bytes: Bytes = Bytes::new();
    while let Some(field) = payload
        .next_field()
        .await
        .map_err(|e| Error::validation(format!("failed to read multipart field: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => match field.bytes().await {
                Ok(data) => {
                    if data.is_empty() {
                        return Err(Error::validation("image is empty"));
                    }
                    im_bytes = data;
                }
                Err(e) => {
                    error!("failed to retrieve image from request: {e}");
                    return Err(Error::validation("failed to process image"));
                }
            },
            _ => {}
        }
    }

    if im_bytes.is_empty() {
        return Err(Error::validation("missing multipart field: file"));
    }

    if let Err(e) = image::load_from_memory(&im_bytes) {
        return Err(Error::validation(format!("file is not a decodable image: {e}")));
    }

    let input = AnalyzeSingleInput { im_bytes };

    let result = match state.verification_service.analyze_single(input).await {
        Ok(result) => result,
        Err(e) => {
            error!("failed to analyze image: {e}");
            return Err(e);
        }
    };
    info!("completed single image analysis");

    extra_fields::clear_extra_fields();
    Ok(ApiResponseBuilder::new()
        .status_code(StatusCode::OK)
        .body(result)
        .build())
}
