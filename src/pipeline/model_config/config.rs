#[derive(Debug, Clone)]
pub struct FaceDetectionConfig {
    pub image_size: (usize, usize),
    pub crop_size: u32,
    pub margin: u32,
    pub min_face_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    /// Pixel whitening of the face crop. Disabled to match the upstream
    /// detector configuration, which trades it for speed.
    pub post_process: bool,
}

impl FaceDetectionConfig {
    pub fn new() -> Self {
        FaceDetectionConfig {
            image_size: (640, 640),
            crop_size: 160,
            margin: 0,
            min_face_size: 20,
            confidence_threshold: 0.5,
            iou_threshold: 0.4,
            post_process: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FaceEmbeddingConfig {
    pub image_size: (u32, u32),
    pub embedding_dim: usize,
}

impl FaceEmbeddingConfig {
    pub fn new() -> Self {
        FaceEmbeddingConfig {
            image_size: (160, 160),
            embedding_dim: 512,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_crop_matches_embedding_input() {
        let detection = FaceDetectionConfig::new();
        let embedding = FaceEmbeddingConfig::new();

        assert_eq!(detection.crop_size, embedding.image_size.0);
        assert_eq!(detection.crop_size, embedding.image_size.1);
    }
}
