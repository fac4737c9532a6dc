//! Gaussian blur (`GaussianBlur`).
//!
//! Kernel sizes and sigmas are resolved the way OpenCV resolves them:
//!
//! - `sigmaY == 0` borrows `sigmaX`;
//! - a zero kernel dimension is derived from its sigma
//!   (`round(sigma * 6 + 1) | 1`);
//! - a non-positive sigma is derived from the kernel size, and kernels of
//!   size 1, 3, 5 and 7 use fixed binomial-like coefficients.
//!
//! Each channel is padded with reflect-101 borders by the kernel radius,
//! correlated with `imageproc`'s row and column filters and cropped back.

use crate::filter::{self, Plane};
use crate::operation::{OperationError, input_raster, output_image};
use crate::types::{DynamicImage, Frame};

const NAME: &str = "GaussianBlur";

const SMALL_KERNELS: [&[f32]; 4] = [
    &[1.0],
    &[0.25, 0.5, 0.25],
    &[0.0625, 0.25, 0.375, 0.25, 0.0625],
    &[0.031_25, 0.109_375, 0.218_75, 0.281_25, 0.218_75, 0.109_375, 0.031_25],
];

/// 1-D Gaussian kernel of `size` taps, normalized to sum to one.
///
/// `size` must be odd and positive.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn gaussian_kernel(size: usize, sigma: f64) -> Vec<f32> {
    if size % 2 == 1 && size <= 7 && sigma <= 0.0 {
        return SMALL_KERNELS[size / 2].to_vec();
    }
    let half = (size as f64 - 1.0) * 0.5;
    let sigma = if sigma > 0.0 {
        sigma
    } else {
        (half - 1.0).mul_add(0.3, 0.8)
    };
    let scale = -0.5 / (sigma * sigma);
    let raw: Vec<f64> = (0..size)
        .map(|i| {
            let x = i as f64 - half;
            (scale * x * x).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.iter().map(|v| (v / sum) as f32).collect()
}

/// Resolve one kernel dimension against its sigma.
fn kernel_size(ksize: i64, sigma: f64) -> Result<usize, OperationError> {
    let ksize = if ksize == 0 && sigma > 0.0 {
        #[allow(clippy::cast_possible_truncation)]
        let derived = sigma.mul_add(6.0, 1.0).round() as i64;
        derived | 1
    } else {
        ksize
    };
    if ksize <= 0 || ksize % 2 == 0 {
        return Err(OperationError::invalid_argument(
            NAME,
            format!("kernel size must be positive and odd, got {ksize}"),
        ));
    }
    usize::try_from(ksize)
        .map_err(|_| OperationError::invalid_argument(NAME, format!("kernel size {ksize} is too large")))
}

/// Blur `input` with a `ksize = (width, height)` Gaussian kernel.
///
/// # Errors
///
/// Returns [`OperationError::InvalidArgument`] for even or negative
/// kernel sizes (or zero sizes without a sigma) and
/// [`OperationError::UnsupportedInput`] for non-image frames.
pub fn gaussian_blur(
    input: &Frame,
    ksize: (i64, i64),
    sigma_x: f64,
    sigma_y: f64,
) -> Result<DynamicImage, OperationError> {
    let sigma_y = if sigma_y <= 0.0 { sigma_x } else { sigma_y };
    let kw = kernel_size(ksize.0, sigma_x)?;
    let kh = kernel_size(ksize.1, sigma_y)?;
    let src = input_raster(NAME, input)?;

    let radius = |k: usize| {
        u32::try_from(k / 2)
            .map_err(|_| OperationError::invalid_argument(NAME, format!("kernel size {k} is too large")))
    };
    let pad = (radius(kw)?, radius(kh)?);

    let kx = gaussian_kernel(kw, sigma_x);
    let ky = gaussian_kernel(kh, sigma_y);
    let blurred: Vec<Plane> = filter::float_planes(&src, pad)
        .iter()
        .map(|plane| filter::crop(&filter::correlate(plane, &kx, &ky), pad, src.width, src.height))
        .collect();
    let out = filter::interleave(&blurred, filter::saturate);
    output_image(NAME, src.width, src.height, src.channels, out)
}
