use anyhow::Error;
use ndarray::Array3;

use crate::pipeline::model_config::config::{FaceDetectionConfig, FaceEmbeddingConfig};
use crate::pipeline::module::face_comparison::cosine_similarity;
use crate::pipeline::module::face_detection::FaceDetection;
use crate::pipeline::module::face_embedding::FaceEmbedding;
use crate::pipeline::utils::image::decode_base64_image;
use crate::pipeline::PipelineError;

/// Comparison failure, tagged with the image it originated from so the
/// response can say which input was at fault.
#[derive(thiserror::Error, Debug)]
pub enum CompareError {
    #[error("Error processing first image: {0}")]
    FirstImage(PipelineError),

    #[error("Error processing second image: {0}")]
    SecondImage(PipelineError),

    #[error("{0}")]
    Internal(PipelineError),
}

/// Seam between the web layer and the models; the service depends on this
/// rather than on the concrete pipeline.
pub trait FaceComparer: Send + Sync {
    /// Compare two base64-encoded images, returning the cosine similarity
    /// between the detected faces in [-1, 1].
    fn compare(&self, image1: &str, image2: &str) -> Result<f32, CompareError>;
}

pub struct ComparisonPipeline {
    face_detection: FaceDetection,
    face_embedding: FaceEmbedding,
}

impl ComparisonPipeline {
    /// Load both models up front. Nothing is initialized lazily, so there is
    /// no first-request race; a bad model path fails the process at startup.
    pub fn new(
        detection_model_path: &str,
        embedding_model_path: &str,
        device: &str,
    ) -> Result<Self, Error> {
        let face_detection =
            FaceDetection::new(detection_model_path, device, FaceDetectionConfig::new())?;
        let face_embedding =
            FaceEmbedding::new(embedding_model_path, device, FaceEmbeddingConfig::new())?;

        Ok(ComparisonPipeline {
            face_detection,
            face_embedding,
        })
    }

    fn detect_face(&self, data: &str) -> Result<Array3<f32>, PipelineError> {
        let image = decode_base64_image(data)?;
        self.face_detection
            .call(&image)?
            .ok_or(PipelineError::NoFaceDetected)
    }
}

impl FaceComparer for ComparisonPipeline {
    fn compare(&self, image1: &str, image2: &str) -> Result<f32, CompareError> {
        let face1 = self.detect_face(image1).map_err(CompareError::FirstImage)?;
        let face2 = self.detect_face(image2).map_err(CompareError::SecondImage)?;

        let embedding1 = self.face_embedding.call(&face1).map_err(CompareError::Internal)?;
        let embedding2 = self.face_embedding.call(&face2).map_err(CompareError::Internal)?;

        Ok(cosine_similarity(&embedding1, &embedding2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_identifies_failing_image() {
        let first = CompareError::FirstImage(PipelineError::NoFaceDetected);
        assert_eq!(
            first.to_string(),
            "Error processing first image: No face detected"
        );

        let second = CompareError::SecondImage(PipelineError::InvalidBase64(
            "Invalid padding".to_string(),
        ));
        assert_eq!(
            second.to_string(),
            "Error processing second image: Invalid base64 image data: Invalid padding"
        );
    }
}
