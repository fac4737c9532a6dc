//! Probabilistic Hough line detection (`HoughLinesP`).
//!
//! A progressive probabilistic Hough transform over the non-zero pixels of
//! a single-channel image. Each point votes into a `(rho, theta)`
//! accumulator; as soon as a cell reaches `threshold` the corresponding
//! line is walked in both directions through the point set, tolerating up
//! to `max_line_gap` missing pixels. Walked pixels are removed from the
//! point set, and when the segment is long enough their votes are
//! withdrawn too.
//!
//! Points are visited in raster order rather than at random, so a given
//! image always yields the same segments.

use std::f64::consts::PI;

use crate::operation::{OperationError, input_raster};
use crate::types::{Dimensions, Frame, LineSegment};

const NAME: &str = "HoughLinesP";

/// Fixed-point fraction bits used while walking a line.
const SHIFT: u32 = 16;

/// Parameters of [`hough_lines_p`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoughOptions {
    /// Distance resolution of the accumulator in pixels.
    pub rho: f64,
    /// Angle resolution of the accumulator in radians.
    pub theta: f64,
    /// Votes a line needs before it is walked.
    pub threshold: i64,
    /// Segments whose x and y extents are both shorter are dropped.
    pub min_line_length: i64,
    /// Largest run of missing pixels bridged within one segment.
    pub max_line_gap: i64,
}

struct Accumulator {
    numrho: usize,
    numangle: usize,
    /// `(cos, sin) / rho` per angle bin.
    trig: Vec<(f64, f64)>,
    votes: Vec<i64>,
}

impl Accumulator {
    fn bin(&self, x: i64, y: i64, n: usize) -> Option<usize> {
        let (cos, sin) = self.trig[n];
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        let r = (x as f64).mul_add(cos, y as f64 * sin).round() as i64;
        let offset = i64::try_from((self.numrho - 1) / 2).ok()?;
        let r = usize::try_from(r + offset).ok().filter(|&r| r < self.numrho)?;
        Some(r * self.numangle + n)
    }

    /// Add one vote per angle for `(x, y)` and return the strongest bin.
    fn vote(&mut self, x: i64, y: i64) -> (i64, usize) {
        let mut best = (i64::MIN, 0);
        for n in 0..self.numangle {
            if let Some(cell) = self.bin(x, y, n) {
                self.votes[cell] += 1;
                if self.votes[cell] > best.0 {
                    best = (self.votes[cell], n);
                }
            }
        }
        best
    }

    fn withdraw(&mut self, x: i64, y: i64) {
        for n in 0..self.numangle {
            if let Some(cell) = self.bin(x, y, n) {
                self.votes[cell] -= 1;
            }
        }
    }
}

/// Fixed-point stepper along the line through `(x, y)` at angle bin `n`.
#[derive(Clone, Copy)]
struct Walk {
    /// Whether x advances by whole pixels (and y is fixed-point).
    along_x: bool,
    x0: i64,
    y0: i64,
    dx: i64,
    dy: i64,
}

impl Walk {
    #[allow(clippy::cast_possible_truncation)]
    fn new(x: i64, y: i64, (cos, sin): (f64, f64)) -> Self {
        let a = -sin;
        let b = cos;
        let one = f64::from(1_u32 << SHIFT);
        let half = 1_i64 << (SHIFT - 1);
        if a.abs() > b.abs() {
            Self {
                along_x: true,
                x0: x,
                y0: (y << SHIFT) + half,
                dx: if a > 0.0 { 1 } else { -1 },
                dy: (b * one / a.abs()).round() as i64,
            }
        } else {
            Self {
                along_x: false,
                x0: (x << SHIFT) + half,
                y0: y,
                dx: (a * one / b.abs()).round() as i64,
                dy: if b > 0.0 { 1 } else { -1 },
            }
        }
    }

    /// Pixel positions from the start point outward, in direction `k`
    /// (0 forward, 1 backward).
    fn pixels(self, k: usize) -> impl Iterator<Item = (i64, i64)> {
        let (dx, dy) = if k == 0 { (self.dx, self.dy) } else { (-self.dx, -self.dy) };
        (0_i64..).map(move |step| {
            let (x, y) = (self.x0 + dx * step, self.y0 + dy * step);
            if self.along_x { (x, y >> SHIFT) } else { (x >> SHIFT, y) }
        })
    }
}

/// Binary point set of the input image.
struct Mask {
    width: i64,
    height: i64,
    bits: Vec<bool>,
}

impl Mask {
    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        usize::try_from(y * self.width + x).ok()
    }

    fn contains(&self, x: i64, y: i64) -> bool {
        self.index(x, y).is_some_and(|i| self.bits[i])
    }

    fn clear(&mut self, x: i64, y: i64) {
        if let Some(i) = self.index(x, y) {
            self.bits[i] = false;
        }
    }
}

/// Detect line segments among the non-zero pixels of a 1-channel image.
///
/// # Errors
///
/// Returns [`OperationError::InvalidArgument`] when `rho` or `theta`
/// leave an empty accumulator and [`OperationError::UnsupportedInput`]
/// for anything but a single-channel image.
pub fn hough_lines_p(input: &Frame, options: &HoughOptions) -> Result<Frame, OperationError> {
    let src = input_raster(NAME, input)?;
    if src.channels != 1 {
        return Err(OperationError::unsupported_input(
            NAME,
            input,
            "expected a single-channel image",
        ));
    }
    if options.rho <= 0.0 || options.theta <= 0.0 {
        return Err(OperationError::invalid_argument(
            NAME,
            "rho and theta must be positive",
        ));
    }

    let width = i64::from(src.width);
    let height = i64::from(src.height);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let (numangle, numrho) = (
        (PI / options.theta).round() as usize,
        (((width + height) * 2 + 1) as f64 / options.rho).round() as usize,
    );
    if numangle == 0 || numrho == 0 {
        return Err(OperationError::invalid_argument(
            NAME,
            format!(
                "rho {} and theta {} leave an empty accumulator",
                options.rho, options.theta
            ),
        ));
    }

    let irho = 1.0 / options.rho;
    #[allow(clippy::cast_precision_loss)]
    let trig = (0..numangle)
        .map(|n| {
            let angle = n as f64 * options.theta;
            (angle.cos() * irho, angle.sin() * irho)
        })
        .collect();
    let mut acc = Accumulator {
        numrho,
        numangle,
        trig,
        votes: vec![0; numrho * numangle],
    };
    let mut mask = Mask {
        width,
        height,
        bits: src.data.iter().map(|&v| v != 0).collect(),
    };

    let points: Vec<(i64, i64)> = (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .filter(|&(x, y)| mask.contains(x, y))
        .collect();

    let mut segments = Vec::new();
    for (x, y) in points {
        if !mask.contains(x, y) {
            continue;
        }
        let (votes, n) = acc.vote(x, y);
        if votes < options.threshold {
            continue;
        }

        let walk = Walk::new(x, y, acc.trig[n]);
        let mut ends = [(x, y); 2];
        for (k, end) in ends.iter_mut().enumerate() {
            let mut gap = 0;
            for (px, py) in walk.pixels(k) {
                if mask.index(px, py).is_none() {
                    break;
                }
                if mask.contains(px, py) {
                    gap = 0;
                    *end = (px, py);
                } else {
                    gap += 1;
                    if gap > options.max_line_gap {
                        break;
                    }
                }
            }
        }

        let good = (ends[1].0 - ends[0].0).abs() >= options.min_line_length
            || (ends[1].1 - ends[0].1).abs() >= options.min_line_length;

        for (k, &end) in ends.iter().enumerate() {
            for (px, py) in walk.pixels(k) {
                if mask.index(px, py).is_none() {
                    break;
                }
                if mask.contains(px, py) {
                    if good {
                        acc.withdraw(px, py);
                    }
                    mask.clear(px, py);
                }
                if (px, py) == end {
                    break;
                }
            }
        }

        if good {
            let coord = |v: i64| i32::try_from(v).unwrap_or(i32::MAX);
            segments.push(LineSegment::new(
                coord(ends[0].0),
                coord(ends[0].1),
                coord(ends[1].0),
                coord(ends[1].1),
            ));
        }
    }

    tracing::debug!(segments = segments.len(), "hough lines detected");
    Ok(Frame::Lines {
        dimensions: Dimensions {
            width: src.width,
            height: src.height,
        },
        segments,
    })
}
