pub mod comparison_pipeline;
pub mod model_config;
pub mod module;
pub mod utils;

/// Failure of a single pipeline stage. Decode and detection failures are
/// client errors; inference failures are server errors.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Invalid base64 image data: {0}")]
    InvalidBase64(String),

    #[error("Unable to decode image: {0}")]
    InvalidImage(String),

    #[error("No face detected")]
    NoFaceDetected,

    #[error("model inference failed: {0}")]
    Inference(String),
}
