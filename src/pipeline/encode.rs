//! Image normalisation: uploaded bytes → base64 PNG wrapped in `ImageData`.
//!
//! Uploads arrive in whatever format the phone or scanner produced (JPEG,
//! PNG, WebP, GIF; RGBA, greyscale, 16-bit). Every photo is decoded, capped
//! at `max_image_pixels` on its longest edge, flattened to 8-bit RGB and
//! re-encoded as PNG, so the provider always receives one colour model and
//! one container format.

use crate::error::ExtractError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use tracing::debug;

/// Decode raw upload bytes into an image.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ExtractError> {
    if bytes.is_empty() {
        return Err(ExtractError::InvalidImage {
            detail: "empty upload".to_string(),
        });
    }
    image::load_from_memory(bytes).map_err(|e| ExtractError::InvalidImage {
        detail: e.to_string(),
    })
}

/// Downscale (never upscale) so the longest edge is at most `max_pixels`,
/// then convert to 8-bit RGB.
pub fn normalise_image(img: DynamicImage, max_pixels: u32) -> DynamicImage {
    let (w, h) = (img.width(), img.height());
    let img = if w.max(h) > max_pixels {
        debug!("Downscaling {}x{} to fit {} px", w, h, max_pixels);
        img.resize(max_pixels, max_pixels, FilterType::Lanczos3)
    } else {
        img
    };
    DynamicImage::ImageRgb8(img.to_rgb8())
}

/// Encode a normalised image as a base64 PNG ready for the model API.
///
/// `detail: "high"` lets GPT-4-class models read small print such as
/// ingredient quantities.
pub fn encode_image(img: &DynamicImage) -> Result<ImageData, ExtractError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| ExtractError::Internal(format!("PNG encoding failed: {e}")))?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

/// Decode, normalise and encode in one go.
///
/// CPU-bound; callers on an async runtime should run it in `spawn_blocking`.
pub fn prepare_upload(bytes: &[u8], max_pixels: u32) -> Result<ImageData, ExtractError> {
    let img = decode_image(bytes)?;
    encode_image(&normalise_image(img, max_pixels))
}
