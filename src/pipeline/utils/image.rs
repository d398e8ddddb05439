use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::imageops::FilterType;
use image::RgbImage;

use crate::pipeline::PipelineError;

/// Images larger than this on either axis are downscaled before detection.
pub const MAX_IMAGE_DIMENSION: u32 = 1024;

/// Decode a base64-encoded image payload into an RGB image.
///
/// Accepts an optional data-URI prefix (`data:image/jpeg;base64,...`);
/// everything up to the first comma is discarded. Whitespace anywhere in the
/// payload is ignored, so line-wrapped base64 decodes too. The decoded image
/// is converted to 3-channel RGB and proportionally downscaled with Lanczos
/// resampling when its largest dimension exceeds [`MAX_IMAGE_DIMENSION`].
pub fn decode_base64_image(data: &str) -> Result<RgbImage, PipelineError> {
    let encoded = match data.split_once(',') {
        Some((_prefix, rest)) => rest,
        None => data,
    }
    .trim();

    let decoded = if encoded.bytes().any(|b| b.is_ascii_whitespace()) {
        let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        STANDARD.decode(compact)
    } else {
        STANDARD.decode(encoded)
    };
    let im_bytes = decoded.map_err(|e| PipelineError::InvalidBase64(e.to_string()))?;

    let image = image::load_from_memory(&im_bytes)
        .map_err(|e| PipelineError::InvalidImage(e.to_string()))?;

    Ok(downscale_to_limit(image.to_rgb8(), MAX_IMAGE_DIMENSION))
}

/// Downscale preserving aspect ratio so that max(width, height) <= limit.
/// Images already within the limit are returned untouched.
pub fn downscale_to_limit(image: RgbImage, limit: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let largest = width.max(height);
    if largest <= limit {
        return image;
    }

    let ratio = limit as f32 / largest as f32;
    let new_width = ((width as f32 * ratio) as u32).max(1);
    let new_height = ((height as f32 * ratio) as u32).max(1);

    image::imageops::resize(&image, new_width, new_height, FilterType::Lanczos3)
}
