use std::sync::Mutex;

use anyhow::Error;
use image::imageops::FilterType;
use image::RgbImage;
use log::info;
use ndarray::{Array3, Array4};
use ort::session::Session;
use ort::value::Value;

use crate::pipeline::model_config::config::FaceDetectionConfig;
use crate::pipeline::module::session::session_from_file;
use crate::pipeline::PipelineError;

const DETECTION_STRIDES: [usize; 3] = [8, 16, 32];
const ANCHORS_PER_CELL: usize = 2;
const PIXEL_MEAN: f32 = 127.5;
const PIXEL_STD: f32 = 128.0;

/// One detected face in original-image coordinates.
#[derive(Debug, Clone)]
pub struct FaceBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
}

impl FaceBox {
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }
}

/// SCRFD-family face detector. The anchor-free model emits per-stride score
/// and box-delta tensors which are decoded, de-letterboxed and suppressed
/// here; the best surviving face is cropped to a fixed-size tensor.
pub struct FaceDetection {
    session: Mutex<Session>,
    config: FaceDetectionConfig,
}

impl FaceDetection {
    pub fn new(model_path: &str, device: &str, config: FaceDetectionConfig) -> Result<Self, Error> {
        let session = session_from_file(model_path, device)?;

        let num_outputs = session.outputs().len();
        if num_outputs < 2 * DETECTION_STRIDES.len() {
            return Err(Error::msg(format!(
                "detection model must emit score and box tensors for {} strides, got {} outputs",
                DETECTION_STRIDES.len(),
                num_outputs,
            )));
        }
        info!("loaded face detection model from {model_path}");

        Ok(FaceDetection {
            session: Mutex::new(session),
            config,
        })
    }

    /// Detect the most prominent face and return its crop as a CHW tensor of
    /// `crop_size` x `crop_size`, or `None` when no face passes the
    /// confidence and minimum-size thresholds.
    pub fn call(&self, image: &RgbImage) -> Result<Option<Array3<f32>>, PipelineError> {
        let (input, scale) = preprocess_detection_input(image, self.config.image_size);
        let input_tensor =
            Value::from_array(input).map_err(|e| PipelineError::Inference(e.to_string()))?;

        let mut candidates = Vec::new();
        {
            let mut session = self
                .session
                .lock()
                .map_err(|_| PipelineError::Inference("detection session poisoned".to_string()))?;
            let outputs = session
                .run(ort::inputs![input_tensor])
                .map_err(|e| PipelineError::Inference(e.to_string()))?;

            // Output layout: [scores per stride..., box deltas per stride...].
            for (pos, &stride) in DETECTION_STRIDES.iter().enumerate() {
                let (_, scores) = outputs[pos]
                    .try_extract_tensor::<f32>()
                    .map_err(|e| PipelineError::Inference(format!("scores stride {stride}: {e}")))?;
                let (_, deltas) = outputs[pos + DETECTION_STRIDES.len()]
                    .try_extract_tensor::<f32>()
                    .map_err(|e| PipelineError::Inference(format!("boxes stride {stride}: {e}")))?;

                candidates.extend(decode_stride(
                    scores,
                    deltas,
                    stride,
                    self.config.image_size,
                    scale,
                    self.config.confidence_threshold,
                ));
            }
        }

        let detections = non_maximum_suppression(candidates, self.config.iou_threshold);
        let Some(best) = select_face(detections, self.config.min_face_size) else {
            return Ok(None);
        };

        let crop = crop_face(image, &best, self.config.margin, self.config.crop_size);
        Ok(Some(face_to_tensor(&crop, self.config.post_process)))
    }
}

/// Letterbox the image into the detector input (top-left anchored, black
/// padding) and normalize to a NCHW float tensor. Returns the tensor and the
/// scale needed to map detector coordinates back to the original image.
fn preprocess_detection_input(image: &RgbImage, input_size: (usize, usize)) -> (Array4<f32>, f32) {
    let (width, height) = image.dimensions();
    let (target_w, target_h) = (input_size.0 as u32, input_size.1 as u32);

    let scale = (target_w as f32 / width as f32).min(target_h as f32 / height as f32);
    let new_w = ((width as f32 * scale).round() as u32).clamp(1, target_w);
    let new_h = ((height as f32 * scale).round() as u32).clamp(1, target_h);

    let resized = image::imageops::resize(image, new_w, new_h, FilterType::Triangle);
    let mut canvas = RgbImage::new(target_w, target_h);
    image::imageops::overlay(&mut canvas, &resized, 0, 0);

    let mut tensor = Array4::<f32>::zeros((1, 3, input_size.1, input_size.0));
    for (x, y, pixel) in canvas.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (pixel[c] as f32 - PIXEL_MEAN) / PIXEL_STD;
        }
    }

    (tensor, scale)
}

/// Decode one stride level of the anchor-free detector output into boxes in
/// original-image coordinates.
fn decode_stride(
    scores: &[f32],
    deltas: &[f32],
    stride: usize,
    input_size: (usize, usize),
    scale: f32,
    threshold: f32,
) -> Vec<FaceBox> {
    let grid_w = input_size.0 / stride;
    let grid_h = input_size.1 / stride;
    let num_anchors = grid_w * grid_h * ANCHORS_PER_CELL;

    let mut boxes = Vec::new();
    for idx in 0..num_anchors {
        let score = match scores.get(idx) {
            Some(&score) => score,
            None => break,
        };
        if score <= threshold {
            continue;
        }

        let delta_off = idx * 4;
        if delta_off + 3 >= deltas.len() {
            break;
        }

        let cell = idx / ANCHORS_PER_CELL;
        let anchor_cx = ((cell % grid_w) * stride) as f32;
        let anchor_cy = ((cell / grid_w) * stride) as f32;

        // Deltas are distances from the anchor center to each box edge,
        // expressed in stride units.
        boxes.push(FaceBox {
            x1: (anchor_cx - deltas[delta_off] * stride as f32) / scale,
            y1: (anchor_cy - deltas[delta_off + 1] * stride as f32) / scale,
            x2: (anchor_cx + deltas[delta_off + 2] * stride as f32) / scale,
            y2: (anchor_cy + deltas[delta_off + 3] * stride as f32) / scale,
            score,
        });
    }

    boxes
}

fn non_maximum_suppression(mut boxes: Vec<FaceBox>, iou_threshold: f32) -> Vec<FaceBox> {
    boxes.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<FaceBox> = Vec::new();
    for candidate in boxes {
        if keep.iter().all(|kept| iou(kept, &candidate) <= iou_threshold) {
            keep.push(candidate);
        }
    }
    keep
}

/// Drop boxes smaller than the minimum face size, then keep the single
/// highest-confidence detection (single-face mode).
fn select_face(mut detections: Vec<FaceBox>, min_face_size: u32) -> Option<FaceBox> {
    let min_face = min_face_size as f32;
    detections.retain(|b| b.width() >= min_face && b.height() >= min_face);

    detections.into_iter().max_by(|a, b| {
        a.score
            .partial_cmp(&b.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}

fn iou(a: &FaceBox, b: &FaceBox) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.width() * a.height() + b.width() * b.height() - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Crop the face region (clamped to image bounds, margin split per side) and
/// resize to the square crop size.
fn crop_face(image: &RgbImage, face: &FaceBox, margin: u32, crop_size: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let half_margin = margin as f32 / 2.0;

    let x1 = (face.x1 - half_margin).floor().clamp(0.0, (width - 1) as f32) as u32;
    let y1 = (face.y1 - half_margin).floor().clamp(0.0, (height - 1) as f32) as u32;
    let x2 = (face.x2 + half_margin).ceil().clamp(0.0, width as f32) as u32;
    let y2 = (face.y2 + half_margin).ceil().clamp(0.0, height as f32) as u32;

    let crop_w = x2.saturating_sub(x1).max(1);
    let crop_h = y2.saturating_sub(y1).max(1);

    let crop = image::imageops::crop_imm(image, x1, y1, crop_w, crop_h).to_image();
    image::imageops::resize(&crop, crop_size, crop_size, FilterType::Triangle)
}

/// Convert the face crop to a CHW tensor. Whitening is applied only when
/// post-processing is enabled; otherwise raw pixel values are kept, matching
/// the detector configuration used upstream.
fn face_to_tensor(crop: &RgbImage, post_process: bool) -> Array3<f32> {
    let (width, height) = crop.dimensions();
    let mut tensor = Array3::<f32>::zeros((3, height as usize, width as usize));

    for (x, y, pixel) in crop.enumerate_pixels() {
        for c in 0..3 {
            let value = pixel[c] as f32;
            tensor[[c, y as usize, x as usize]] = if post_process {
                (value - PIXEL_MEAN) / PIXEL_STD
            } else {
                value
            };
        }
    }

    tensor
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    fn face(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> FaceBox {
        FaceBox { x1, y1, x2, y2, score }
    }

    #[test]
    fn test_iou_identical_boxes() {
        let a = face(0.0, 0.0, 100.0, 100.0, 0.9);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint_boxes() {
        let a = face(0.0, 0.0, 10.0, 10.0, 0.9);
        let b = face(50.0, 50.0, 60.0, 60.0, 0.9);
        assert!(iou(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_nms_suppresses_overlap() {
        let boxes = vec![
            face(0.0, 0.0, 100.0, 100.0, 0.9),
            face(5.0, 5.0, 105.0, 105.0, 0.8),
            face(300.0, 300.0, 350.0, 350.0, 0.7),
        ];

        let kept = non_maximum_suppression(boxes, 0.4);
        assert_eq!(kept.len(), 2);
        assert!((kept[0].score - 0.9).abs() < 1e-6);
        assert!((kept[1].score - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_decode_stride_single_anchor() {
        let input_size = (640, 640);
        let grid = (640 / 8) * (640 / 8) * ANCHORS_PER_CELL;

        let mut scores = vec![0.0f32; grid];
        scores[0] = 0.9;
        let mut deltas = vec![0.0f32; grid * 4];
        deltas[0..4].copy_from_slice(&[1.0, 1.0, 2.0, 2.0]);

        let boxes = decode_stride(&scores, &deltas, 8, input_size, 0.5, 0.5);
        assert_eq!(boxes.len(), 1);

        // Anchor center (0, 0), deltas in stride units, de-scaled by 0.5.
        let b = &boxes[0];
        assert!((b.x1 - (-16.0)).abs() < 1e-4);
        assert!((b.y1 - (-16.0)).abs() < 1e-4);
        assert!((b.x2 - 32.0).abs() < 1e-4);
        assert!((b.y2 - 32.0).abs() < 1e-4);
    }

    #[test]
    fn test_decode_stride_below_threshold() {
        let grid = (640 / 32) * (640 / 32) * ANCHORS_PER_CELL;
        let scores = vec![0.2f32; grid];
        let deltas = vec![1.0f32; grid * 4];

        let boxes = decode_stride(&scores, &deltas, 32, (640, 640), 1.0, 0.5);
        assert!(boxes.is_empty());
    }

    #[test]
    fn test_preprocess_shape_and_scale() {
        let image = RgbImage::from_pixel(320, 160, Rgb([255, 255, 255]));
        let (tensor, scale) = preprocess_detection_input(&image, (640, 640));

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert!((scale - 2.0).abs() < 1e-6);

        // Padded region (below the resized 640x320 content) is black.
        let padded = tensor[[0, 0, 639, 0]];
        assert!((padded - (0.0 - PIXEL_MEAN) / PIXEL_STD).abs() < 1e-6);
        // Content region is white.
        let content = tensor[[0, 0, 0, 0]];
        assert!((content - (255.0 - PIXEL_MEAN) / PIXEL_STD).abs() < 1e-6);
    }

    #[test]
    fn test_select_face_rejects_undersized_boxes() {
        let detections = vec![
            face(0.0, 0.0, 10.0, 10.0, 0.99),
            face(50.0, 50.0, 90.0, 65.0, 0.9), // wide enough, too short
        ];

        assert!(select_face(detections, 20).is_none());
    }

    #[test]
    fn test_select_face_keeps_highest_scoring_qualifying_box() {
        let detections = vec![
            face(0.0, 0.0, 15.0, 15.0, 0.99),
            face(50.0, 50.0, 120.0, 130.0, 0.8),
            face(200.0, 200.0, 260.0, 270.0, 0.6),
        ];

        let best = select_face(detections, 20).expect("a face above the size floor");
        assert!((best.score - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_crop_face_clamps_to_bounds() {
        let image = RgbImage::from_pixel(100, 100, Rgb([7, 7, 7]));
        let out_of_bounds = face(-20.0, -20.0, 120.0, 120.0, 0.9);

        let crop = crop_face(&image, &out_of_bounds, 0, 160);
        assert_eq!(crop.dimensions(), (160, 160));
        assert_eq!(crop.get_pixel(80, 80), &Rgb([7, 7, 7]));
    }

    #[test]
    fn test_face_to_tensor_raw_pixels() {
        let crop = RgbImage::from_pixel(4, 4, Rgb([100, 150, 200]));
        let tensor = face_to_tensor(&crop, false);

        assert_eq!(tensor.shape(), &[3, 4, 4]);
        assert_eq!(tensor[[0, 0, 0]], 100.0);
        assert_eq!(tensor[[1, 0, 0]], 150.0);
        assert_eq!(tensor[[2, 0, 0]], 200.0);
    }

    #[test]
    fn test_face_to_tensor_whitened() {
        let crop = RgbImage::from_pixel(2, 2, Rgb([128, 128, 128]));
        let tensor = face_to_tensor(&crop, true);

        let expected = (128.0 - PIXEL_MEAN) / PIXEL_STD;
        assert!((tensor[[0, 0, 0]] - expected).abs() < 1e-6);
    }
}
