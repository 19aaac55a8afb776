//! Decoding of inbound capture payloads into model input tensors.

use crate::error::PipelineError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::imageops::FilterType;
use ndarray::Array4;

/// Side length the emotion network expects.
pub const MODEL_INPUT_SIZE: usize = 48;

/// Decode a `<mime>;base64,<data>` data-URI into a `(1, 48, 48, 1)` grayscale
/// tensor.
///
/// Pixel values are kept in the raw 0..255 range as f32, which is what the
/// network was trained on.
pub fn decode_capture(data_url: &str) -> Result<Array4<f32>, PipelineError> {
    let (_, encoded) = data_url.split_once(";base64,").ok_or_else(|| {
        PipelineError::InvalidImageInput("payload is not a base64 data-URI".to_string())
    })?;

    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|err| PipelineError::InvalidImageInput(format!("base64 decode failed: {}", err)))?;

    let img = image::load_from_memory(&bytes)
        .map_err(|err| PipelineError::InvalidImageInput(format!("image decode failed: {}", err)))?;

    if img.width() == 0 || img.height() == 0 {
        return Err(PipelineError::InvalidImageInput(
            "image has zero size".to_string(),
        ));
    }

    let gray = img
        .resize_exact(
            MODEL_INPUT_SIZE as u32,
            MODEL_INPUT_SIZE as u32,
            FilterType::Triangle,
        )
        .to_luma8();

    let mut tensor = Array4::<f32>::zeros((1, MODEL_INPUT_SIZE, MODEL_INPUT_SIZE, 1));
    for (x, y, pixel) in gray.enumerate_pixels() {
        tensor[[0, y as usize, x as usize, 0]] = pixel.0[0] as f32;
    }

    Ok(tensor)
}
