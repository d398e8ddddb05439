pub mod face_comparison;
pub mod face_detection;
pub mod face_embedding;
pub mod session;
