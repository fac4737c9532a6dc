//! Shared types for the stagehand pipeline.

use serde::{Deserialize, Serialize};

use crate::operation::OperationError;

/// Re-export `DynamicImage` so downstream crates can build and inspect
/// frames without depending on `image` directly.
pub use image::DynamicImage;

/// Re-export `GrayImage` for single-channel intermediates.
pub use image::GrayImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// A detected line segment in integer pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSegment {
    /// Start x.
    pub x1: i32,
    /// Start y.
    pub y1: i32,
    /// End x.
    pub x2: i32,
    /// End y.
    pub y2: i32,
}

impl LineSegment {
    /// Create a segment from its two end points.
    #[must_use]
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Euclidean length of the segment in pixels.
    #[must_use]
    pub fn length(&self) -> f64 {
        let dx = f64::from(self.x2 - self.x1);
        let dy = f64::from(self.y2 - self.y1);
        dx.hypot(dy)
    }
}

/// The buffer threaded from stage to stage.
///
/// Most operations map an 8-bit image with 1, 3 or 4 channels to another
/// image. Line detection produces a different result shape, which is kept
/// as [`Frame::Lines`] and can still be displayed, but is rejected as input
/// by every built-in operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// An 8-bit raster image.
    Image(DynamicImage),
    /// Line segments detected in an image of the given size.
    Lines {
        /// Size of the image the segments were detected in.
        dimensions: Dimensions,
        /// Detected segments, in detection order.
        segments: Vec<LineSegment>,
    },
}

impl Frame {
    /// Pixel dimensions of the frame.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        match self {
            Self::Image(image) => Dimensions {
                width: image.width(),
                height: image.height(),
            },
            Self::Lines { dimensions, .. } => *dimensions,
        }
    }

    /// Number of interleaved channels, or `None` for line sets.
    #[must_use]
    pub fn channel_count(&self) -> Option<u8> {
        match self {
            Self::Image(image) => Some(image.color().channel_count()),
            Self::Lines { .. } => None,
        }
    }

    /// Borrow the raster image, if this frame holds one.
    #[must_use]
    pub const fn as_image(&self) -> Option<&DynamicImage> {
        match self {
            Self::Image(image) => Some(image),
            Self::Lines { .. } => None,
        }
    }

    /// Short human-readable description of the frame's shape, used in
    /// error messages and diagnostics.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Image(image) => format!(
                "{}x{} image with {} channel(s)",
                image.width(),
                image.height(),
                image.color().channel_count(),
            ),
            Self::Lines {
                dimensions,
                segments,
            } => format!(
                "{} line segment(s) over {}x{}",
                segments.len(),
                dimensions.width,
                dimensions.height,
            ),
        }
    }

    /// Render the frame into something an image widget can show.
    ///
    /// Images are returned as-is. Line sets are drawn in white on a black
    /// canvas of the source size.
    #[must_use]
    pub fn to_display(&self) -> DynamicImage {
        match self {
            Self::Image(image) => image.clone(),
            Self::Lines {
                dimensions,
                segments,
            } => {
                let mut canvas = image::RgbImage::new(dimensions.width, dimensions.height);
                for segment in segments {
                    #[allow(clippy::cast_precision_loss)]
                    imageproc::drawing::draw_line_segment_mut(
                        &mut canvas,
                        (segment.x1 as f32, segment.y1 as f32),
                        (segment.x2 as f32, segment.y2 as f32),
                        image::Rgb([255, 255, 255]),
                    );
                }
                DynamicImage::ImageRgb8(canvas)
            }
        }
    }
}

impl From<DynamicImage> for Frame {
    fn from(image: DynamicImage) -> Self {
        Self::Image(image)
    }
}

impl From<GrayImage> for Frame {
    fn from(image: GrayImage) -> Self {
        Self::Image(DynamicImage::ImageLuma8(image))
    }
}

/// Borrowed view of an 8-bit interleaved raster.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Raster<'a> {
    pub width: u32,
    pub height: u32,
    pub channels: usize,
    pub data: &'a [u8],
}

impl Raster<'_> {
    /// Pixel count (`width * height`).
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Borrow an image as an interleaved 8-bit raster.
///
/// Only the layouts produced by [`crate::decode`] and the built-in
/// operations are supported: 8-bit luma, RGB and RGBA.
pub(crate) fn raster(image: &DynamicImage) -> Option<Raster<'_>> {
    let (channels, data): (usize, &[u8]) = match image {
        DynamicImage::ImageLuma8(buf) => (1, buf.as_raw()),
        DynamicImage::ImageRgb8(buf) => (3, buf.as_raw()),
        DynamicImage::ImageRgba8(buf) => (4, buf.as_raw()),
        _ => return None,
    };
    Some(Raster {
        width: image.width(),
        height: image.height(),
        channels,
        data,
    })
}

/// Build an image from interleaved 8-bit samples.
///
/// Returns `None` for unsupported channel counts or when `data` does not
/// match `width * height * channels`.
pub(crate) fn image_from_raw(
    width: u32,
    height: u32,
    channels: usize,
    data: Vec<u8>,
) -> Option<DynamicImage> {
    match channels {
        1 => image::GrayImage::from_raw(width, height, data).map(DynamicImage::ImageLuma8),
        3 => image::RgbImage::from_raw(width, height, data).map(DynamicImage::ImageRgb8),
        4 => image::RgbaImage::from_raw(width, height, data).map(DynamicImage::ImageRgba8),
        _ => None,
    }
}

/// Errors that can occur while building or running a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// A parameter or stage was declared with a value outside its domain.
    ///
    /// Raised while constructing parameters, stages and pipelines; never
    /// recovered from.
    #[error("invalid configuration for `{name}`: {reason}")]
    Configuration {
        /// Parameter, stage or definition the problem was found in.
        name: String,
        /// What was wrong.
        reason: String,
    },

    /// A stage's parameter list holds something that is not a parameter.
    #[error("stage `{stage}`: entry {index} is not a parameter (found {found})")]
    InvalidParameter {
        /// Name of the stage.
        stage: String,
        /// Position of the offending entry in the parameter list.
        index: usize,
        /// The offending entry, rendered as JSON.
        found: String,
    },

    /// The native operation itself failed. Passed through untouched.
    #[error(transparent)]
    Operation(#[from] OperationError),
}

impl PipelineError {
    /// Shorthand for a [`PipelineError::Configuration`].
    pub(crate) fn configuration(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
