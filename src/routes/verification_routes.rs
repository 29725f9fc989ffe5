use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handler::analyze_handler::analyze_single;
use crate::handler::compare_handler::compare_faces;
use crate::handler::verify_handler::verify_faces;
use crate::state::verification_state::VerificationState;

pub fn new_verification_routes() -> Router<VerificationState> {
    Router::new()
        .route("/analyze_single", post(analyze_single))
        .route("/compare_faces", post(compare_faces))
        .route("/verify-faces/", post(verify_faces))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(
            25 * 1024 * 1024, /* 25mb */
        ))
}
