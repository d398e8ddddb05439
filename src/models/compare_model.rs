use serde::{Deserialize, Serialize};

/// Request body for `/api/compare`. Fields are optional so that a missing
/// image yields the validation error rather than a deserialization failure.
#[derive(Debug, Clone, Deserialize)]
pub struct CompareRequest {
    #[serde(default)]
    pub image1: Option<String>,
    #[serde(default)]
    pub image2: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CompareInput {
    pub image1: String,
    pub image2: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompareResultOutput {
    pub similarity: f64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthOutput {
    pub status: String,
    pub message: String,
}
