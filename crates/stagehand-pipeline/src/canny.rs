//! Canny edge detection (`Canny`).
//!
//! Steps, without any pre-blur (callers chain `GaussianBlur` first if they
//! want one):
//!
//! 1. Sobel derivatives with an aperture of 3, 5 or 7, correlated with
//!    `imageproc`'s row and column filters (border pixels replicate). For
//!    color input, each pixel takes the gradient of whichever channel has
//!    the largest magnitude.
//! 2. Non-maximum suppression along the quantized gradient direction.
//!    Samples outside the image count as zero magnitude.
//! 3. Hysteresis: pixels above the high threshold seed edges, which grow
//!    through 8-connected pixels above the low threshold.
//!
//! The hysteresis walk checks all eight neighbours and bounds-checks each
//! one before access, so edges touching the image border are safe.

use image::GrayImage;

use crate::filter::{self, Plane};
use crate::operation::{OperationError, input_raster};
use crate::types::Frame;

const NAME: &str = "Canny";

/// `tan(22.5°)`
const TAN_22_5: f32 = 0.414_213_57;
/// `tan(67.5°)`
const TAN_67_5: f32 = 2.414_213_6;

const EDGE: u8 = 255;

/// Binomial smoothing kernel of `n` taps (`[1, 2, 1]` for 3).
fn binomial(n: usize) -> Vec<f32> {
    let mut row = vec![1.0_f32];
    for _ in 1..n {
        let mut next = vec![0.0; row.len() + 1];
        for (i, v) in row.iter().enumerate() {
            next[i] += v;
            next[i + 1] += v;
        }
        row = next;
    }
    row
}

/// Sobel derivative kernel of `n` taps (`[-1, 0, 1]` for 3).
fn derivative(n: usize) -> Vec<f32> {
    let smooth = binomial(n.saturating_sub(2).max(1));
    let mut out = vec![0.0; smooth.len() + 2];
    for (i, v) in smooth.iter().enumerate() {
        out[i] -= v;
        out[i + 2] += v;
    }
    out
}

/// Per-pixel gradient of the strongest channel.
struct Gradient {
    width: usize,
    height: usize,
    dx: Vec<f32>,
    dy: Vec<f32>,
    magnitude: Vec<f32>,
}

impl Gradient {
    fn magnitude_at(&self, x: isize, y: isize) -> f32 {
        match (usize::try_from(x), usize::try_from(y)) {
            (Ok(x), Ok(y)) if x < self.width && y < self.height => self.magnitude[y * self.width + x],
            _ => 0.0,
        }
    }
}

fn gradient(src: &crate::types::Raster<'_>, aperture: usize, l2: bool) -> Gradient {
    let deriv = derivative(aperture);
    let smooth = binomial(aperture);
    let planes = filter::float_planes(src, (0, 0));
    let gx: Vec<Plane> = planes.iter().map(|p| filter::correlate(p, &deriv, &smooth)).collect();
    let gy: Vec<Plane> = planes.iter().map(|p| filter::correlate(p, &smooth, &deriv)).collect();
    let norm = |x: f32, y: f32| if l2 { x.hypot(y) } else { x.abs() + y.abs() };

    let count = src.pixel_count();
    let mut dx = Vec::with_capacity(count);
    let mut dy = Vec::with_capacity(count);
    let mut magnitude = Vec::with_capacity(count);
    for i in 0..count {
        let (mut best, mut bx, mut by) = (-1.0_f32, 0.0, 0.0);
        for (px, py) in gx.iter().zip(&gy) {
            let (x, y) = (px.as_raw()[i], py.as_raw()[i]);
            let m = norm(x, y);
            if m > best {
                (best, bx, by) = (m, x, y);
            }
        }
        dx.push(bx);
        dy.push(by);
        magnitude.push(best.max(0.0));
    }
    Gradient {
        width: src.width as usize,
        height: src.height as usize,
        dx,
        dy,
        magnitude,
    }
}

/// Classify every pixel: 0 = suppressed, 1 = weak candidate,
/// [`EDGE`] = strong seed.
fn non_maximum_suppression(g: &Gradient, low: f32, high: f32) -> Vec<u8> {
    let mut marks = vec![0_u8; g.width * g.height];
    for y in 0..g.height {
        for x in 0..g.width {
            let i = y * g.width + x;
            let m = g.magnitude[i];
            if m <= low {
                continue;
            }
            let (xi, yi) = (
                isize::try_from(x).unwrap_or(0),
                isize::try_from(y).unwrap_or(0),
            );
            let (ax, ay) = (g.dx[i].abs(), g.dy[i].abs());
            let is_max = if ay < ax * TAN_22_5 {
                m > g.magnitude_at(xi - 1, yi) && m >= g.magnitude_at(xi + 1, yi)
            } else if ay > ax * TAN_67_5 {
                m > g.magnitude_at(xi, yi - 1) && m >= g.magnitude_at(xi, yi + 1)
            } else {
                let s: isize = if (g.dx[i] < 0.0) == (g.dy[i] < 0.0) { 1 } else { -1 };
                m > g.magnitude_at(xi - s, yi - 1) && m > g.magnitude_at(xi + s, yi + 1)
            };
            if is_max {
                marks[i] = if m > high { EDGE } else { 1 };
            }
        }
    }
    marks
}

/// Grow strong seeds through weak candidates. Non-recursive depth-first
/// walk over all eight neighbours.
fn hysteresis(marks: &mut [u8], width: usize, height: usize) {
    let mut stack: Vec<(usize, usize)> = (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .filter(|&(x, y)| marks[y * width + x] == EDGE)
        .collect();
    while let Some((nx, ny)) = stack.pop() {
        let neighbours = [
            (nx + 1, ny),
            (nx + 1, ny + 1),
            (nx, ny + 1),
            (nx.wrapping_sub(1), ny.wrapping_sub(1)),
            (nx.wrapping_sub(1), ny),
            (nx.wrapping_sub(1), ny + 1),
            (nx, ny.wrapping_sub(1)),
            (nx + 1, ny.wrapping_sub(1)),
        ];
        for (x, y) in neighbours {
            if x >= width || y >= height {
                continue;
            }
            let mark = &mut marks[y * width + x];
            if *mark == 1 {
                *mark = EDGE;
                stack.push((x, y));
            }
        }
    }
    for mark in marks.iter_mut() {
        if *mark != EDGE {
            *mark = 0;
        }
    }
}

/// Detect edges in a 1- or 3-channel image.
///
/// The thresholds may be given in either order; the smaller is the
/// hysteresis low threshold.
///
/// # Errors
///
/// Returns [`OperationError::InvalidArgument`] for an aperture other than
/// 3, 5 or 7 and [`OperationError::UnsupportedInput`] for other channel
/// counts or non-image frames.
pub fn canny(
    input: &Frame,
    threshold1: f32,
    threshold2: f32,
    aperture: i64,
    l2_gradient: bool,
) -> Result<GrayImage, OperationError> {
    let aperture = match aperture {
        3 => 3,
        5 => 5,
        7 => 7,
        other => {
            return Err(OperationError::invalid_argument(
                NAME,
                format!("aperture size should be odd between 3 and 7, got {other}"),
            ));
        }
    };
    let src = input_raster(NAME, input)?;
    if !matches!(src.channels, 1 | 3) {
        return Err(OperationError::unsupported_input(
            NAME,
            input,
            "expected a 1- or 3-channel image",
        ));
    }
    let (low, high) = if threshold1 <= threshold2 {
        (threshold1, threshold2)
    } else {
        (threshold2, threshold1)
    };

    let g = gradient(&src, aperture, l2_gradient);
    let mut marks = non_maximum_suppression(&g, low, high);
    hysteresis(&mut marks, g.width, g.height);
    GrayImage::from_raw(src.width, src.height, marks).ok_or_else(|| {
        OperationError::invalid_argument(NAME, "edge map does not match the input size")
    })
}
