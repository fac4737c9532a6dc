//! Image decoding.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces the
//! [`Frame`] a pipeline starts from. Decoded images are normalized to the
//! 8-bit layouts the native operations understand: luma, RGB or RGBA.

use crate::types::{DynamicImage, Frame, PipelineError};

/// Decode raw image bytes into an 8-bit frame.
///
/// Luma and RGB(A) images keep their channel count. Luma with alpha
/// becomes RGBA; deeper sample types are reduced to 8 bits.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<Frame, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    let img = normalize(img);
    tracing::debug!(
        width = img.width(),
        height = img.height(),
        channels = img.color().channel_count(),
        "decoded source image",
    );
    Ok(Frame::Image(img))
}

/// Convert any decoded layout to 8-bit luma, RGB or RGBA.
#[must_use]
pub fn normalize(img: DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => img,
        DynamicImage::ImageLuma16(_) => DynamicImage::ImageLuma8(img.to_luma8()),
        DynamicImage::ImageRgb16(_) | DynamicImage::ImageRgb32F(_) => {
            DynamicImage::ImageRgb8(img.to_rgb8())
        }
        _ => DynamicImage::ImageRgba8(img.to_rgba8()),
    }
}
