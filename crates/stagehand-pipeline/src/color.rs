//! Color space conversion (`cvtColor`) and the color-code catalog.
//!
//! Codes and fixed-point coefficients match OpenCV's 8-bit conversions so
//! pipelines written against OpenCV flag values keep their meaning.

use crate::operation::{OperationError, input_raster, output_image};
use crate::types::{DynamicImage, Frame};

const NAME: &str = "cvtColor";

/// Fixed-point shift for the luma and chroma coefficients.
const SHIFT: u32 = 14;
const R2Y: i32 = 4899;
const G2Y: i32 = 9617;
const B2Y: i32 = 1868;
/// `0.713 * 2^14`
const CR_SCALE: i32 = 11682;
/// `0.564 * 2^14`
const CB_SCALE: i32 = 9241;

/// Every supported conversion code under each of its OpenCV names.
///
/// Bayer demosaicing codes are not implemented, so their labels are never
/// listed here.
const COLOR_CODES: &[(&str, i64)] = &[
    ("COLOR_BGR2BGRA", 0),
    ("COLOR_RGB2RGBA", 0),
    ("COLOR_BGRA2BGR", 1),
    ("COLOR_RGBA2RGB", 1),
    ("COLOR_BGR2RGBA", 2),
    ("COLOR_RGB2BGRA", 2),
    ("COLOR_RGBA2BGR", 3),
    ("COLOR_BGRA2RGB", 3),
    ("COLOR_BGR2RGB", 4),
    ("COLOR_RGB2BGR", 4),
    ("COLOR_BGRA2RGBA", 5),
    ("COLOR_RGBA2BGRA", 5),
    ("COLOR_BGR2GRAY", 6),
    ("COLOR_RGB2GRAY", 7),
    ("COLOR_GRAY2BGR", 8),
    ("COLOR_GRAY2RGB", 8),
    ("COLOR_GRAY2BGRA", 9),
    ("COLOR_GRAY2RGBA", 9),
    ("COLOR_BGRA2GRAY", 10),
    ("COLOR_RGBA2GRAY", 11),
    ("COLOR_BGR2YCrCb", 36),
    ("COLOR_RGB2YCrCb", 37),
    ("COLOR_BGR2HSV", 40),
    ("COLOR_RGB2HSV", 41),
];

/// OpenCV value of `COLOR_RGB2GRAY`.
pub const COLOR_RGB2GRAY: i64 = 7;

/// The `label -> code` mapping offered by color conversion selects.
///
/// Built once at startup and passed to whatever needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorCatalog {
    entries: Vec<(String, i64)>,
}

impl ColorCatalog {
    /// All supported codes, labels sorted in byte order.
    #[must_use]
    pub fn builtin() -> Self {
        let mut entries: Vec<(String, i64)> = COLOR_CODES
            .iter()
            .map(|(label, code)| ((*label).to_string(), *code))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Self { entries }
    }

    /// The mapping in display order.
    #[must_use]
    pub fn entries(&self) -> &[(String, i64)] {
        &self.entries
    }

    /// Code for a label.
    #[must_use]
    pub fn code(&self, label: &str) -> Option<i64> {
        self.entries
            .iter()
            .find_map(|(name, code)| (name == label).then_some(*code))
    }
}

/// What a code does, once decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    /// Reorder or add/drop alpha between 3/4-channel layouts.
    Reorder { channels: usize, swap: bool },
    /// Weighted sum to one channel; `bgr` if the source is BGR ordered.
    ToGray { bgr: bool },
    /// Replicate one channel into 3 or 4.
    FromGray { channels: usize },
    YCrCb { bgr: bool },
    Hsv { bgr: bool },
}

impl Conversion {
    const fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            0 => Self::Reorder { channels: 4, swap: false },
            1 => Self::Reorder { channels: 3, swap: false },
            2 => Self::Reorder { channels: 4, swap: true },
            3 | 4 => Self::Reorder { channels: 3, swap: true },
            5 => Self::Reorder { channels: 4, swap: true },
            6 | 10 => Self::ToGray { bgr: true },
            7 | 11 => Self::ToGray { bgr: false },
            8 => Self::FromGray { channels: 3 },
            9 => Self::FromGray { channels: 4 },
            36 => Self::YCrCb { bgr: true },
            37 => Self::YCrCb { bgr: false },
            40 => Self::Hsv { bgr: true },
            41 => Self::Hsv { bgr: false },
            _ => return None,
        })
    }

    const fn accepts(self, channels: usize) -> bool {
        match self {
            Self::FromGray { .. } => channels == 1,
            _ => channels == 3 || channels == 4,
        }
    }

    const fn output_channels(self) -> usize {
        match self {
            Self::Reorder { channels, .. } | Self::FromGray { channels } => channels,
            Self::ToGray { .. } => 1,
            Self::YCrCb { .. } | Self::Hsv { .. } => 3,
        }
    }
}

/// Convert `input` with an OpenCV color conversion `code`.
///
/// # Errors
///
/// Returns [`OperationError::InvalidArgument`] for unknown codes and
/// [`OperationError::UnsupportedInput`] when the input channel count does
/// not fit the code.
pub fn cvt_color(input: &Frame, code: i64) -> Result<DynamicImage, OperationError> {
    let conversion = Conversion::from_code(code).ok_or_else(|| {
        OperationError::invalid_argument(NAME, format!("unknown color conversion code {code}"))
    })?;
    let src = input_raster(NAME, input)?;
    if !conversion.accepts(src.channels) {
        return Err(OperationError::unsupported_input(
            NAME,
            input,
            format!("code {code} cannot convert {} channel(s)", src.channels),
        ));
    }

    let dcn = conversion.output_channels();
    let mut out = Vec::with_capacity(src.pixel_count() * dcn);
    for px in src.data.chunks_exact(src.channels) {
        match conversion {
            Conversion::Reorder { channels, swap } => {
                let (a, b) = if swap { (px[2], px[0]) } else { (px[0], px[2]) };
                out.extend_from_slice(&[a, px[1], b]);
                if channels == 4 {
                    out.push(if src.channels == 4 { px[3] } else { u8::MAX });
                }
            }
            Conversion::ToGray { bgr } => {
                let (r, g, b) = rgb(px, bgr);
                out.push(luma(r, g, b));
            }
            Conversion::FromGray { channels } => {
                out.extend_from_slice(&[px[0]; 3]);
                if channels == 4 {
                    out.push(u8::MAX);
                }
            }
            Conversion::YCrCb { bgr } => {
                let (r, g, b) = rgb(px, bgr);
                out.extend_from_slice(&ycrcb(r, g, b));
            }
            Conversion::Hsv { bgr } => {
                let (r, g, b) = rgb(px, bgr);
                out.extend_from_slice(&hsv(r, g, b));
            }
        }
    }
    output_image(NAME, src.width, src.height, dcn, out)
}

const fn rgb(px: &[u8], bgr: bool) -> (u8, u8, u8) {
    if bgr {
        (px[2], px[1], px[0])
    } else {
        (px[0], px[1], px[2])
    }
}

fn saturate(v: i32) -> u8 {
    u8::try_from(v.clamp(0, 255)).unwrap_or(u8::MAX)
}

fn luma_fixed(r: u8, g: u8, b: u8) -> i32 {
    i32::from(r) * R2Y + i32::from(g) * G2Y + i32::from(b) * B2Y
}

fn descale(v: i32) -> i32 {
    (v + (1 << (SHIFT - 1))) >> SHIFT
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    saturate(descale(luma_fixed(r, g, b)))
}

fn ycrcb(r: u8, g: u8, b: u8) -> [u8; 3] {
    let y = descale(luma_fixed(r, g, b));
    let delta = 128 << SHIFT;
    let cr = descale((i32::from(r) - y) * CR_SCALE + delta);
    let cb = descale((i32::from(b) - y) * CB_SCALE + delta);
    [saturate(y), saturate(cr), saturate(cb)]
}

/// 8-bit HSV: hue halved into `0..180`, saturation and value in `0..=255`.
fn hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (rf, gf, bf) = (f32::from(r), f32::from(g), f32::from(b));
    let v = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let diff = v - min;
    let s = if v > 0.0 { diff * 255.0 / v } else { 0.0 };
    let mut h = if diff <= 0.0 {
        0.0
    } else if (v - rf).abs() < f32::EPSILON {
        60.0 * (gf - bf) / diff
    } else if (v - gf).abs() < f32::EPSILON {
        120.0 + 60.0 * (bf - rf) / diff
    } else {
        240.0 + 60.0 * (rf - gf) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }
    let mut h = (h / 2.0).round();
    if h >= 180.0 {
        h -= 180.0;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let to_u8 = |x: f32| x.round().clamp(0.0, 255.0) as u8;
    [to_u8(h), to_u8(s), to_u8(v)]
}
