//! Morphological dilation (`dilate`) with a rectangular structuring
//! element.
//!
//! Each channel is dilated with `imageproc`'s `grayscale_dilate` over a
//! filled rectangular [`Mask`] anchored at `(width / 2, height / 2)`, so
//! even-sized elements reach one sample further toward larger
//! coordinates. Samples outside the image never win the max.

use image::{GrayImage, Luma};
use imageproc::morphology::{Mask, grayscale_dilate};

use crate::filter;
use crate::operation::{OperationError, input_raster, output_image};
use crate::types::{DynamicImage, Frame};

const NAME: &str = "dilate";

/// Filled `width` x `height` rectangle anchored at its center.
///
/// `imageproc` masks are at most 511 samples on a side.
fn rectangle(width: u32, height: u32) -> Result<Mask, OperationError> {
    match (u8::try_from(width / 2), u8::try_from(height / 2)) {
        (Ok(cx), Ok(cy)) => Ok(Mask::from_image(
            &GrayImage::from_pixel(width, height, Luma([u8::MAX])),
            cx,
            cy,
        )),
        _ => Err(OperationError::invalid_argument(
            NAME,
            format!("kernel dimensions must be at most 511, got {width}x{height}"),
        )),
    }
}

/// Dilate every channel of `input` with a `kernel = (width, height)`
/// rectangle, `iterations` times. Zero or negative iterations copy the
/// input.
///
/// # Errors
///
/// Returns [`OperationError::InvalidArgument`] for kernel dimensions
/// outside `1..=511` and [`OperationError::UnsupportedInput`] for
/// non-image frames.
pub fn dilate(input: &Frame, kernel: (i64, i64), iterations: i64) -> Result<DynamicImage, OperationError> {
    let dimension = |v: i64| {
        u32::try_from(v).ok().filter(|&v| v > 0).ok_or_else(|| {
            OperationError::invalid_argument(
                NAME,
                format!("kernel dimensions must be positive, got {kernel:?}"),
            )
        })
    };
    let mask = rectangle(dimension(kernel.0)?, dimension(kernel.1)?)?;
    let src = input_raster(NAME, input)?;

    let mut planes = filter::gray_planes(&src);
    for _ in 0..iterations.max(0) {
        planes = planes.iter().map(|plane| grayscale_dilate(plane, &mask)).collect();
    }
    let data = filter::interleave(&planes, |v| v);
    output_image(NAME, src.width, src.height, src.channels, data)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::GrayImage;

    fn single_dot(size: u32, at: (u32, u32)) -> Frame {
        Frame::from(GrayImage::from_fn(size, size, |x, y| {
            image::Luma([if (x, y) == at { 255 } else { 0 }])
        }))
    }

    fn lit(image: &DynamicImage) -> Vec<(u32, u32)> {
        let gray = image.to_luma8();
        gray.enumerate_pixels()
            .filter(|(_, _, p)| p.0[0] == 255)
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    #[test]
    fn dot_grows_into_kernel_rectangle() {
        let out = dilate(&single_dot(9, (4, 4)), (3, 5), 1).unwrap();
        let pixels = lit(&out);
        assert_eq!(pixels.len(), 15);
        assert!(pixels.iter().all(|&(x, y)| (3..=5).contains(&x) && (2..=6).contains(&y)));
    }

    #[test]
    fn iterations_compound() {
        let once = lit(&dilate(&single_dot(11, (5, 5)), (3, 3), 1).unwrap()).len();
        let twice = lit(&dilate(&single_dot(11, (5, 5)), (3, 3), 2).unwrap()).len();
        assert_eq!(once, 9);
        assert_eq!(twice, 25);
    }

    #[test]
    fn zero_iterations_copies_input() {
        let img = single_dot(5, (2, 2));
        let out = dilate(&img, (5, 5), 0).unwrap();
        assert_eq!(Frame::from(out), img);
    }

    #[test]
    fn corner_dot_is_clipped_to_image() {
        let out = dilate(&single_dot(5, (0, 0)), (3, 3), 1).unwrap();
        assert_eq!(lit(&out), vec![(0, 0), (1, 0), (0, 1), (1, 1)]);
    }

    #[test]
    fn even_kernel_spreads_toward_larger_coordinates() {
        let out = dilate(&single_dot(6, (3, 3)), (2, 1), 1).unwrap();
        assert_eq!(lit(&out), vec![(3, 3), (4, 3)]);
    }

    #[test]
    fn rejects_empty_kernel() {
        assert!(matches!(
            dilate(&single_dot(3, (1, 1)), (0, 3), 1),
            Err(OperationError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn rejects_oversized_kernel() {
        assert!(matches!(
            dilate(&single_dot(3, (1, 1)), (512, 3), 1),
            Err(OperationError::InvalidArgument { .. })
        ));
        assert!(dilate(&single_dot(3, (1, 1)), (511, 1), 1).is_ok());
    }

    /// Brute-force rectangular max with the anchor at `size / 2`.
    fn windowed_max(img: &GrayImage, (kw, kh): (u32, u32)) -> GrayImage {
        GrayImage::from_fn(img.width(), img.height(), |x, y| {
            let xs = x.saturating_sub(kw / 2)..(x + kw - kw / 2).min(img.width());
            let ys = y.saturating_sub(kh / 2)..(y + kh - kh / 2).min(img.height());
            let max = ys
                .flat_map(|sy| xs.clone().map(move |sx| img.get_pixel(sx, sy).0[0]))
                .max()
                .unwrap();
            Luma([max])
        })
    }

    #[test]
    fn every_channel_matches_windowed_max() {
        let rgb = image::RgbImage::from_fn(40, 30, |x, y| {
            let (x, y) = (u8::try_from(x).unwrap(), u8::try_from(y).unwrap());
            image::Rgb([
                x.wrapping_mul(37) ^ y.wrapping_mul(11),
                x.wrapping_mul(5).wrapping_add(y.wrapping_mul(3)),
                (x ^ y).wrapping_mul(53),
            ])
        });
        for kernel in [(3_u32, 3_u32), (5, 3), (2, 1), (7, 9)] {
            let out = dilate(
                &Frame::from(DynamicImage::ImageRgb8(rgb.clone())),
                (i64::from(kernel.0), i64::from(kernel.1)),
                1,
            )
            .unwrap()
            .to_rgb8();
            for c in 0..3 {
                let channel = GrayImage::from_fn(40, 30, |x, y| Luma([rgb.get_pixel(x, y).0[c]]));
                let expected = windowed_max(&channel, kernel);
                let actual = GrayImage::from_fn(40, 30, |x, y| Luma([out.get_pixel(x, y).0[c]]));
                assert_eq!(actual, expected, "kernel {kernel:?} channel {c}");
            }
        }
    }

    #[test]
    fn dilates_each_color_channel() {
        let img = Frame::from(DynamicImage::ImageRgb8(image::RgbImage::from_fn(3, 1, |x, _| {
            if x == 0 { image::Rgb([200, 0, 0]) } else { image::Rgb([0, 0, 50]) }
        })));
        let out = dilate(&img, (3, 1), 1).unwrap().to_rgb8();
        assert_eq!(out.get_pixel(1, 0).0, [200, 0, 50]);
        assert_eq!(out.get_pixel(2, 0).0, [0, 0, 50]);
    }
}
