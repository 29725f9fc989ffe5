use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde_json::json;

use crate::engine::face_engine::EngineError;

/// API error taxonomy. "No face detected" is not represented here: it is an
/// expected business outcome and lives in the response message instead.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("face detection failed: {0}")]
    Detection(#[source] EngineError),

    #[error("face verification failed: {0}")]
    Verification(#[source] EngineError),

    #[error("failed to stage uploaded image: {0}")]
    Storage(#[from] std::io::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(ValidationError {
            message: message.into(),
        })
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Detection(_) | Error::Verification(_) | Error::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let detail = self.to_string();

        (status_code, Json(json!({ "detail": detail }))).into_response()
    }
}

#[derive(thiserror::Error, Debug)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let response = Error::validation("image is empty").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_engine_faults_map_to_server_error() {
        let cause = EngineError::Api {
            status: 503,
            body: "model unavailable".to_string(),
        };
        let err = Error::Detection(cause);
        assert!(err.to_string().contains("face detection failed"));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
