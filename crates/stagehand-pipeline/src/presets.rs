//! Ready-made stages for the built-in operations.
//!
//! Each preset declares the parameters a user is expected to tune, with
//! the same names, defaults and ranges as the OpenCV keywords they feed.

use crate::color::{COLOR_RGB2GRAY, ColorCatalog};
use crate::operation::OperationKind;
use crate::param::Param;
use crate::pipeline::Pipeline;
use crate::stage::Stage;
use crate::types::PipelineError;

/// Names accepted by [`builtin_stage`].
pub const PRESET_NAMES: [&str; 5] = ["gray", "blur", "lines", "dilate", "edges"];

/// Stage list of the reference pipeline.
pub const REFERENCE_STAGES: [&str; 3] = ["gray", "dilate", "edges"];

/// Color conversion, defaulting to RGB to grayscale.
///
/// # Errors
///
/// Returns [`PipelineError::Configuration`] if `catalog` has no entry for
/// the grayscale code.
pub fn gray(catalog: &ColorCatalog) -> Result<Stage, PipelineError> {
    Stage::new(
        OperationKind::CvtColor,
        vec![
            Param::choice("code", COLOR_RGB2GRAY, catalog.entries().iter().cloned())?
                .with_help("Color conversion code"),
        ],
    )
}

/// Gaussian blur.
///
/// # Errors
///
/// Never fails for the built-in declarations; the `Result` mirrors the
/// other presets.
pub fn blur() -> Result<Stage, PipelineError> {
    Stage::new(
        OperationKind::GaussianBlur,
        vec![
            Param::pair("ksize", (5, 5), (1, 255), 2)?.with_help("Kernel size"),
            Param::int("sigmaX", 0, (0, 10), 1)?.with_help("Standard deviation in X"),
            Param::int("sigmaY", 0, (0, 10), 1)?.with_help("Standard deviation in Y"),
        ],
    )
}

/// Probabilistic Hough line detection.
///
/// # Errors
///
/// See [`blur`].
pub fn lines() -> Result<Stage, PipelineError> {
    Stage::new(
        OperationKind::HoughLinesP,
        vec![
            Param::int("rho", 1, (1, 10), 1)?
                .with_help("Distance resolution of the accumulator in pixels."),
            Param::int("theta", 1, (1, 10), 1)?
                .with_help("Angle resolution of the accumulator in radians."),
            Param::int("threshold", 100, (1, 1000), 1)?
                .with_help("Accumulator threshold parameter."),
            Param::int("minLineLength", 100, (1, 1000), 1)?
                .with_help("Minimum line length. Line segments shorter than this are rejected."),
            Param::int("maxLineGap", 10, (1, 1000), 1)?
                .with_help("Maximum allowed gap between points on the same line to link them."),
        ],
    )
}

/// Morphological dilation.
///
/// # Errors
///
/// See [`blur`].
pub fn dilate() -> Result<Stage, PipelineError> {
    Stage::new(
        OperationKind::Dilate,
        vec![
            Param::pair("kernel", (5, 5), (1, 255), 2)?.with_help("Kernel size"),
            Param::int("iterations", 1, (1, 10), 1)?.with_help("Number of iterations"),
        ],
    )
}

/// Canny edge detection.
///
/// # Errors
///
/// See [`blur`].
pub fn edges() -> Result<Stage, PipelineError> {
    Stage::new(
        OperationKind::Canny,
        vec![
            Param::int("apertureSize", 3, (3, 7), 2)?.with_help("Aperture size"),
            Param::int("threshold1", 100, (1, 255), 1)?.with_help("First threshold"),
            Param::int("threshold2", 200, (1, 255), 1)?.with_help("Second threshold"),
            Param::boolean("L2gradient", false).with_help("Use L2 norm for gradient calculation"),
        ],
    )
}

/// Build a preset by name.
///
/// # Errors
///
/// Returns [`PipelineError::Configuration`] for a name not in
/// [`PRESET_NAMES`].
pub fn builtin_stage(name: &str, catalog: &ColorCatalog) -> Result<Stage, PipelineError> {
    match name {
        "gray" => gray(catalog),
        "blur" => blur(),
        "lines" => lines(),
        "dilate" => dilate(),
        "edges" => edges(),
        other => Err(PipelineError::configuration(
            other,
            format!("unknown stage preset; expected one of {}", PRESET_NAMES.join(", ")),
        )),
    }
}

/// Build a pipeline from preset names, in order.
///
/// # Errors
///
/// Returns the first preset that fails to build.
pub fn pipeline_from_names<'a, I>(names: I, catalog: &ColorCatalog) -> Result<Pipeline, PipelineError>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .map(|name| builtin_stage(name, catalog))
        .collect()
}

/// The reference pipeline: grayscale, dilate, edges.
///
/// # Errors
///
/// See [`gray`].
pub fn reference_pipeline(catalog: &ColorCatalog) -> Result<Pipeline, PipelineError> {
    pipeline_from_names(REFERENCE_STAGES, catalog)
}
