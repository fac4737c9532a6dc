//! Per-channel planes for the image filters.
//!
//! [`crate::blur`], [`crate::canny`] and [`crate::morphology`] split an
//! interleaved raster into one plane per channel, hand the planes to
//! `imageproc`, and interleave the results again.
//!
//! `imageproc`'s row and column filters pad by continuity (the edge sample
//! repeats). OpenCV's default border reflects without repeating the edge
//! (`gfedcb|abcdefgh|gfedcba`), so [`float_planes`] can pre-pad a plane
//! that way by the kernel radius and [`crop`] cuts the result back.

use image::{GrayImage, ImageBuffer, Luma, Primitive};
use imageproc::definitions::Image;
use imageproc::filter::{horizontal_filter, vertical_filter};

use crate::types::Raster;

/// One channel of samples as `f32`.
pub(crate) type Plane = Image<Luma<f32>>;

/// Map a possibly out-of-range coordinate onto `0..len` by reflecting
/// about the edge samples.
pub(crate) fn reflect101(i: i64, len: u32) -> u32 {
    let n = i64::from(len);
    if n <= 1 {
        return 0;
    }
    let period = 2 * (n - 1);
    let mut j = i.rem_euclid(period);
    if j >= n {
        j = period - j;
    }
    u32::try_from(j).unwrap_or(0)
}

fn sample(src: &Raster<'_>, x: u32, y: u32, channel: usize) -> u8 {
    src.data[(y as usize * src.width as usize + x as usize) * src.channels + channel]
}

/// Split `src` into 8-bit planes.
pub(crate) fn gray_planes(src: &Raster<'_>) -> Vec<GrayImage> {
    (0..src.channels)
        .map(|c| GrayImage::from_fn(src.width, src.height, |x, y| Luma([sample(src, x, y, c)])))
        .collect()
}

/// Split `src` into `f32` planes padded by `pad = (x, y)` samples on each
/// side with reflect-101 borders.
pub(crate) fn float_planes(src: &Raster<'_>, pad: (u32, u32)) -> Vec<Plane> {
    let (px, py) = pad;
    let (width, height) = (src.width + 2 * px, src.height + 2 * py);
    (0..src.channels)
        .map(|c| {
            ImageBuffer::from_fn(width, height, |x, y| {
                let sx = reflect101(i64::from(x) - i64::from(px), src.width);
                let sy = reflect101(i64::from(y) - i64::from(py), src.height);
                Luma([f32::from(sample(src, sx, sy, c))])
            })
        })
        .collect()
}

/// Correlate `plane` with `kx` along rows, then `ky` along columns.
pub(crate) fn correlate(plane: &Plane, kx: &[f32], ky: &[f32]) -> Plane {
    vertical_filter(&horizontal_filter(plane, kx), ky)
}

/// Cut the `width` x `height` interior back out of a plane padded by `pad`.
pub(crate) fn crop(plane: &Plane, pad: (u32, u32), width: u32, height: u32) -> Plane {
    image::imageops::crop_imm(plane, pad.0, pad.1, width, height).to_image()
}

/// Interleave same-sized planes back into one sample buffer.
pub(crate) fn interleave<S, F>(planes: &[ImageBuffer<Luma<S>, Vec<S>>], to_u8: F) -> Vec<u8>
where
    S: Primitive,
    F: Fn(S) -> u8,
{
    let count = planes.first().map_or(0, |p| p.as_raw().len());
    let mut out = Vec::with_capacity(count * planes.len());
    for i in 0..count {
        out.extend(planes.iter().map(|p| to_u8(p.as_raw()[i])));
    }
    out
}

/// Round a filtered sample back to saturated 8-bit.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn saturate(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn raster(width: u32, height: u32, channels: usize, data: &[u8]) -> Raster<'_> {
        Raster {
            width,
            height,
            channels,
            data,
        }
    }

    #[test]
    fn reflect101_mirrors_without_edge() {
        assert_eq!(reflect101(-1, 5), 1);
        assert_eq!(reflect101(-2, 5), 2);
        assert_eq!(reflect101(5, 5), 3);
        assert_eq!(reflect101(6, 5), 2);
        assert_eq!(reflect101(2, 5), 2);
        assert_eq!(reflect101(-7, 3), 1);
        assert_eq!(reflect101(4, 1), 0);
    }

    #[test]
    fn padding_reflects_each_plane() {
        let data = [0_u8, 90, 180];
        let planes = float_planes(&raster(3, 1, 1, &data), (2, 0));
        assert_eq!(planes.len(), 1);
        assert_eq!(
            planes[0].as_raw(),
            &vec![180.0, 90.0, 0.0, 90.0, 180.0, 90.0, 0.0]
        );
    }

    #[test]
    fn split_then_interleave_copies() {
        let data: Vec<u8> = (0..12).collect();
        let planes = gray_planes(&raster(2, 2, 3, &data));
        assert_eq!(planes.len(), 3);
        assert_eq!(planes[1].as_raw(), &vec![1, 4, 7, 10]);
        assert_eq!(interleave(&planes, |v| v), data);
    }

    #[test]
    fn padded_box_filter_averages_with_reflected_border() {
        let data = [0_u8, 90, 180];
        let pad = (1, 0);
        let third = 1.0 / 3.0;
        let filtered: Vec<Plane> = float_planes(&raster(3, 1, 1, &data), pad)
            .iter()
            .map(|p| crop(&correlate(p, &[third; 3], &[1.0]), pad, 3, 1))
            .collect();
        assert_eq!(interleave(&filtered, saturate), vec![60, 90, 120]);
    }

    #[test]
    fn saturates_out_of_range_samples() {
        assert_eq!(saturate(-4.0), 0);
        assert_eq!(saturate(300.0), 255);
        assert_eq!(saturate(127.5), 128);
    }
}
