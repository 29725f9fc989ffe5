use std::sync::Arc;

use crate::config::settings::Settings;
use crate::engine::face_engine::FaceEngine;
use crate::service::verification_service::VerificationService;

#[derive(Clone)]
pub struct VerificationState {
    pub verification_service: VerificationService,
    pub app_name: String,
}

impl VerificationState {
    pub fn new(engine: &Arc<dyn FaceEngine>, settings: &Settings) -> Self {
        Self {
            verification_service: VerificationService::new(engine, &settings.verification),
            app_name: settings.app.name.clone(),
        }
    }
}
