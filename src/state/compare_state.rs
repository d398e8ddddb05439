use std::sync::Arc;

use crate::pipeline::comparison_pipeline::comparison_pipeline::FaceComparer;
use crate::service::compare_service::CompareService;

#[derive(Clone)]
pub struct CompareState {
    pub compare_service: CompareService,
}

impl CompareState {
    pub fn new(pipeline: &Arc<dyn FaceComparer>) -> Self {
        Self {
            compare_service: CompareService::new(pipeline),
        }
    }
}
