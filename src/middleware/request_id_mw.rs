use axum::extract::Request;
use axum::middleware::Next;
use axum::response::IntoResponse;
use http::header;
use uuid::Uuid;

use crate::error::errors::Error;

/// Every request gets a fresh `x-request-id` before any handler runs; the
/// handlers attach it to their log records.
pub async fn generate_request_id_mw(mut req: Request, next: Next) -> Result<impl IntoResponse, Error> {
    let request_id = Uuid::new_v4().to_string();

    if let Ok(value) = header::HeaderValue::from_str(&request_id) {
        req.headers_mut()
            .insert(header::HeaderName::from_static("x-request-id"), value);
    }

    Ok(next.run(req).await)
}
