use std::sync::Mutex;

use anyhow::Error;
use log::info;
use ndarray::{Array1, Array3, Axis};
use ort::session::Session;
use ort::value::Value;

use crate::pipeline::model_config::config::FaceEmbeddingConfig;
use crate::pipeline::module::session::session_from_file;
use crate::pipeline::PipelineError;

/// Face embedding extractor. Takes the fixed-size face crop produced by
/// detection and returns a fixed-length feature vector.
pub struct FaceEmbedding {
    session: Mutex<Session>,
    config: FaceEmbeddingConfig,
}

impl FaceEmbedding {
    pub fn new(model_path: &str, device: &str, config: FaceEmbeddingConfig) -> Result<Self, Error> {
        let session = session_from_file(model_path, device)?;
        info!("loaded face embedding model from {model_path}");

        Ok(FaceEmbedding {
            session: Mutex::new(session),
            config,
        })
    }

    pub fn call(&self, face: &Array3<f32>) -> Result<Array1<f32>, PipelineError> {
        let input = face.clone().insert_axis(Axis(0));
        let input_tensor =
            Value::from_array(input).map_err(|e| PipelineError::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| PipelineError::Inference("embedding session poisoned".to_string()))?;
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| PipelineError::Inference(e.to_string()))?;

        let (_, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| PipelineError::Inference(format!("embedding extraction: {e}")))?;

        if data.len() != self.config.embedding_dim {
            return Err(PipelineError::Inference(format!(
                "expected {}-dim embedding, got {}",
                self.config.embedding_dim,
                data.len(),
            )));
        }

        Ok(Array1::from_vec(data.to_vec()))
    }
}
