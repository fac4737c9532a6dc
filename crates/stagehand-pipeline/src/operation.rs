//! Native operations: the functions a stage wraps.
//!
//! This module defines the [`Operation`] trait for pluggable image
//! functions and the [`OperationKind`] enum for the built-in ones, the
//! same way a strategy trait and its selector enum sit side by side.
//!
//! An operation receives the input [`Frame`] and the stage's keyword map.
//! It owns its own argument checking: unknown, missing or mistyped
//! keywords and unsupported inputs are reported as [`OperationError`],
//! which the pipeline passes through untranslated.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::kwargs::{KwargReader, Kwargs};
use crate::types::{DynamicImage, Frame, Raster};

/// Failure raised by a native operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperationError {
    /// A keyword the operation does not accept.
    #[error("{operation}() got an unexpected keyword argument `{keyword}`")]
    UnexpectedKeyword {
        /// Operation name.
        operation: String,
        /// The rejected keyword.
        keyword: String,
    },

    /// A required keyword was not supplied.
    #[error("{operation}() missing required keyword argument `{keyword}`")]
    MissingKeyword {
        /// Operation name.
        operation: String,
        /// The missing keyword.
        keyword: String,
    },

    /// A keyword was supplied with the wrong value type.
    #[error("{operation}(): keyword `{keyword}` expects {expected}, got {found}")]
    KeywordType {
        /// Operation name.
        operation: String,
        /// The offending keyword.
        keyword: String,
        /// Expected value type.
        expected: &'static str,
        /// Supplied value type.
        found: &'static str,
    },

    /// Argument values that the operation cannot work with.
    #[error("{operation}(): {message}")]
    InvalidArgument {
        /// Operation name.
        operation: String,
        /// What was wrong.
        message: String,
    },

    /// An input frame of a shape the operation does not support.
    #[error("{operation}(): unsupported input ({found}): {message}")]
    UnsupportedInput {
        /// Operation name.
        operation: String,
        /// Description of the input frame.
        found: String,
        /// What the operation needs instead.
        message: String,
    },
}

impl OperationError {
    /// Shorthand for [`OperationError::InvalidArgument`].
    pub fn invalid_argument(operation: &str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    /// Shorthand for [`OperationError::UnsupportedInput`].
    pub fn unsupported_input(operation: &str, input: &Frame, message: impl Into<String>) -> Self {
        Self::UnsupportedInput {
            operation: operation.to_string(),
            found: input.describe(),
            message: message.into(),
        }
    }
}

/// An image function callable with keyword arguments.
pub trait Operation: Send + Sync {
    /// Name used for display and diagnostics.
    fn name(&self) -> &str;

    /// Apply the operation to `input`.
    ///
    /// # Errors
    ///
    /// Returns an [`OperationError`] for rejected keywords, argument
    /// values, or input shapes.
    fn call(&self, input: &Frame, kwargs: &Kwargs) -> Result<Frame, OperationError>;
}

/// An [`Operation`] backed by a closure.
pub struct FnOperation<F> {
    name: String,
    function: F,
}

impl<F> fmt::Debug for FnOperation<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnOperation").field("name", &self.name).finish_non_exhaustive()
    }
}

impl<F> Operation for FnOperation<F>
where
    F: Fn(&Frame, &Kwargs) -> Result<Frame, OperationError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, input: &Frame, kwargs: &Kwargs) -> Result<Frame, OperationError> {
        (self.function)(input, kwargs)
    }
}

/// Wrap a closure as a named [`Operation`].
pub fn from_fn<F>(name: impl Into<String>, function: F) -> FnOperation<F>
where
    F: Fn(&Frame, &Kwargs) -> Result<Frame, OperationError> + Send + Sync,
{
    FnOperation {
        name: name.into(),
        function,
    }
}

/// The built-in native operations.
///
/// Keyword names and semantics follow the OpenCV functions of the same
/// name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// `cvtColor(code)`: color space conversion.
    CvtColor,
    /// `GaussianBlur(ksize, sigmaX, sigmaY=0)`.
    GaussianBlur,
    /// `dilate(kernel, iterations=1)` with a rectangular element.
    Dilate,
    /// `Canny(threshold1, threshold2, apertureSize=3, L2gradient=false)`.
    Canny,
    /// `HoughLinesP(rho, theta, threshold, minLineLength=0, maxLineGap=0)`.
    HoughLinesP,
}

impl OperationKind {
    /// Every built-in operation.
    pub const ALL: [Self; 5] = [
        Self::CvtColor,
        Self::GaussianBlur,
        Self::Dilate,
        Self::Canny,
        Self::HoughLinesP,
    ];

    /// Display name, matching the native function name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::CvtColor => "cvtColor",
            Self::GaussianBlur => "GaussianBlur",
            Self::Dilate => "dilate",
            Self::Canny => "Canny",
            Self::HoughLinesP => "HoughLinesP",
        }
    }

    /// The built-in operation displayed as `label`, if any.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.label() == label)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Operation for OperationKind {
    fn name(&self) -> &str {
        self.label()
    }

    #[allow(clippy::cast_precision_loss)]
    fn call(&self, input: &Frame, kwargs: &Kwargs) -> Result<Frame, OperationError> {
        let name = self.label();
        let mut args = KwargReader::new(name, kwargs);
        match *self {
            Self::CvtColor => {
                let code = args.required_int("code")?;
                args.finish()?;
                crate::color::cvt_color(input, code).map(Frame::Image)
            }
            Self::GaussianBlur => {
                let ksize = args.required_pair("ksize")?;
                let sigma_x = args.required_int("sigmaX")?;
                let sigma_y = args.int("sigmaY")?.unwrap_or(0);
                args.finish()?;
                crate::blur::gaussian_blur(input, ksize, sigma_x as f64, sigma_y as f64)
                    .map(Frame::Image)
            }
            Self::Dilate => {
                let kernel = args.required_pair("kernel")?;
                let iterations = args.int("iterations")?.unwrap_or(1);
                args.finish()?;
                crate::morphology::dilate(input, kernel, iterations).map(Frame::Image)
            }
            Self::Canny => {
                let threshold1 = args.required_int("threshold1")?;
                let threshold2 = args.required_int("threshold2")?;
                let aperture = args.int("apertureSize")?.unwrap_or(3);
                let l2 = args.boolean("L2gradient")?.unwrap_or(false);
                args.finish()?;
                crate::canny::canny(input, threshold1 as f32, threshold2 as f32, aperture, l2)
                    .map(Frame::from)
            }
            Self::HoughLinesP => {
                let rho = args.required_int("rho")?;
                let theta = args.required_int("theta")?;
                let threshold = args.required_int("threshold")?;
                let min_line_length = args.int("minLineLength")?.unwrap_or(0);
                let max_line_gap = args.int("maxLineGap")?.unwrap_or(0);
                args.finish()?;
                let options = crate::hough::HoughOptions {
                    rho: rho as f64,
                    theta: theta as f64,
                    threshold,
                    min_line_length,
                    max_line_gap,
                };
                crate::hough::hough_lines_p(input, &options)
            }
        }
    }
}

/// Borrow the input as an 8-bit raster, or report it as unsupported.
pub(crate) fn input_raster<'a>(
    operation: &str,
    input: &'a Frame,
) -> Result<Raster<'a>, OperationError> {
    input
        .as_image()
        .and_then(crate::types::raster)
        .ok_or_else(|| {
            OperationError::unsupported_input(
                operation,
                input,
                "expected an 8-bit image with 1, 3 or 4 channels",
            )
        })
}

/// Rebuild an image from interleaved samples produced by an operation.
pub(crate) fn output_image(
    operation: &str,
    width: u32,
    height: u32,
    channels: usize,
    data: Vec<u8>,
) -> Result<DynamicImage, OperationError> {
    crate::types::image_from_raw(width, height, channels, data).ok_or_else(|| {
        OperationError::invalid_argument(
            operation,
            format!("produced a buffer that does not fit {width}x{height}x{channels}"),
        )
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::param::Value;
    use crate::types::GrayImage;

    fn gray(width: u32, height: u32) -> Frame {
        Frame::from(GrayImage::from_pixel(width, height, image::Luma([128])))
    }

    #[test]
    fn labels_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for kind in OperationKind::ALL {
            assert!(seen.insert(kind.label()), "duplicate label {kind}");
            assert_eq!(OperationKind::from_label(kind.label()), Some(kind));
        }
        assert_eq!(OperationKind::from_label("erode"), None);
    }

    #[test]
    fn unknown_keyword_is_rejected() {
        let kwargs: Kwargs = [
            ("kernel", Value::Pair(3, 3)),
            ("iterations", Value::Int(1)),
            ("anchor", Value::Int(0)),
        ]
        .into_iter()
        .collect();
        let err = OperationKind::Dilate.call(&gray(4, 4), &kwargs).unwrap_err();
        assert!(matches!(
            err,
            OperationError::UnexpectedKeyword { ref keyword, .. } if keyword == "anchor"
        ));
    }

    #[test]
    fn missing_required_keyword_is_rejected() {
        let kwargs: Kwargs = [("threshold1", Value::Int(10))].into_iter().collect();
        let err = OperationKind::Canny.call(&gray(4, 4), &kwargs).unwrap_err();
        assert!(matches!(
            err,
            OperationError::MissingKeyword { ref keyword, .. } if keyword == "threshold2"
        ));
    }

    #[test]
    fn optional_keywords_take_defaults() {
        let kwargs: Kwargs = [("kernel", Value::Pair(3, 3))].into_iter().collect();
        let out = OperationKind::Dilate.call(&gray(4, 4), &kwargs).unwrap();
        assert_eq!(out, gray(4, 4));
    }

    #[test]
    fn closures_wrap_as_operations() {
        let op = from_fn("identity", |input: &Frame, _kwargs: &Kwargs| Ok(input.clone()));
        assert_eq!(op.name(), "identity");
        assert_eq!(op.call(&gray(2, 2), &Kwargs::new()).unwrap(), gray(2, 2));
    }

    #[test]
    fn serde_names_are_snake_case() {
        let json = serde_json::to_string(&OperationKind::HoughLinesP).unwrap();
        assert_eq!(json, "\"hough_lines_p\"");
        let kind: OperationKind = serde_json::from_str("\"cvt_color\"").unwrap();
        assert_eq!(kind, OperationKind::CvtColor);
    }
}
