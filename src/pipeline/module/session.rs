use anyhow::{Context, Result};
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;

/// Build an ONNX session for the given model file.
///
/// `device` is resolved once at startup from the settings; anything other than
/// a supported accelerator falls back to cpu with a warning.
pub fn session_from_file(model_path: &str, device: &str) -> Result<Session> {
    let builder = Session::builder()?.with_optimization_level(GraphOptimizationLevel::Level3)?;
    let builder = with_device(builder, device)?;

    builder
        .commit_from_file(model_path)
        .with_context(|| format!("failed to load onnx model from {model_path}"))
}

fn with_device(builder: SessionBuilder, device: &str) -> Result<SessionBuilder> {
    #[cfg(feature = "cuda")]
    if device == "cuda" {
        use ort::ep::{self, ExecutionProvider};

        let mut builder = builder;
        let ep = ep::CUDA::default();
        if ep.is_available()? {
            ep.register(&mut builder)?;
        } else {
            log::warn!("cuda device requested, onnx runtime not compiled with cuda");
        }
        return Ok(builder);
    }

    #[cfg(not(feature = "cuda"))]
    if device == "cuda" {
        log::warn!("device 'cuda' requested but built without the cuda feature, using cpu");
    }

    if device != "cpu" && device != "cuda" {
        log::warn!("unknown inference device '{device}', using cpu");
    }

    Ok(builder)
}
