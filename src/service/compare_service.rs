use std::sync::Arc;

use log::error;

use crate::error::errors::Error;
use crate::models::compare_model::{CompareInput, CompareResultOutput};
use crate::pipeline::comparison_pipeline::comparison_pipeline::{CompareError, FaceComparer};
use crate::pipeline::module::face_comparison::similarity_percentage;

#[derive(Clone)]
pub struct CompareService {
    pipeline: Arc<dyn FaceComparer>,
}

impl CompareService {
    pub fn new(pipeline: &Arc<dyn FaceComparer>) -> Self {
        CompareService {
            pipeline: Arc::clone(pipeline),
        }
    }

    pub fn compare_faces(&self, input: CompareInput) -> Result<CompareResultOutput, Error> {
        let similarity = match self.pipeline.compare(&input.image1, &input.image2) {
            Ok(similarity) => similarity,
            Err(e) => {
                error!("failed to compare faces: {e}");
                return Err(match e {
                    CompareError::FirstImage(_) | CompareError::SecondImage(_) => {
                        Error::bad_request(e.to_string())
                    }
                    CompareError::Internal(_) => Error::server(e.to_string()),
                });
            }
        };

        Ok(CompareResultOutput {
            similarity: similarity_percentage(similarity),
            message: "Face comparison successful".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineError;

    struct StubComparer {
        result: fn() -> Result<f32, CompareError>,
    }

    impl FaceComparer for StubComparer {
        fn compare(&self, _image1: &str, _image2: &str) -> Result<f32, CompareError> {
            (self.result)()
        }
    }

    fn service(result: fn() -> Result<f32, CompareError>) -> CompareService {
        let pipeline: Arc<dyn FaceComparer> = Arc::new(StubComparer { result });
        CompareService::new(&pipeline)
    }

    fn input() -> CompareInput {
        CompareInput {
            image1: "aGVsbG8=".to_string(),
            image2: "d29ybGQ=".to_string(),
        }
    }

    #[test]
    fn test_similarity_rounded_to_percentage() {
        let result = service(|| Ok(0.87654)).compare_faces(input()).unwrap();

        assert_eq!(result.similarity, 87.65);
        assert_eq!(result.message, "Face comparison successful");
    }

    #[test]
    fn test_identical_embeddings_yield_full_score() {
        let result = service(|| Ok(1.0)).compare_faces(input()).unwrap();
        assert_eq!(result.similarity, 100.0);
    }

    #[test]
    fn test_detection_failure_maps_to_bad_request() {
        let err = service(|| Err(CompareError::SecondImage(PipelineError::NoFaceDetected)))
            .compare_faces(input())
            .unwrap_err();

        assert!(matches!(err, Error::BadRequest(_)));
        assert_eq!(err.to_string(), "Error processing second image: No face detected");
    }

    #[test]
    fn test_inference_failure_maps_to_server_error() {
        let err = service(|| {
            Err(CompareError::Internal(PipelineError::Inference(
                "session crashed".to_string(),
            )))
        })
        .compare_faces(input())
        .unwrap_err();

        assert!(matches!(err, Error::Server(_)));
    }
}
