//! # Image Cropping Module
//!
//! Percentage-based cropping. Each side's pixel count is
//! `round(percentage / 100 * dimension)`, so opposite sides may round towards
//! each other but the result is never empty.

use image::imageops;
use std::time::Instant;
use tracing;

use super::types::{Axis, CropSpec, PreprocessingError, RasterBuffer};

/// Pixel rectangle kept by a crop, relative to the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Crops `image` to the region described by `crop`.
///
/// # Errors
///
/// `InvalidCrop` or `DegenerateRegion` from [`CropSpec::validate`], or
/// `DegenerateRegion` if rounding leaves zero pixels on an axis.
///
/// # Examples
///
/// ```
/// use image::RgbaImage;
/// use transcribex::preprocessing::{crop_image, CropSpec};
///
/// let page = RgbaImage::new(200, 100);
/// let cropped = crop_image(&page, &CropSpec::new(10.0, 10.0, 25.0, 25.0)).unwrap();
/// assert_eq!(cropped.dimensions(), (100, 80));
/// ```
pub fn crop_image(image: &RasterBuffer, crop: &CropSpec) -> Result<RasterBuffer, PreprocessingError> {
    let start_time = Instant::now();

    crop.validate()?;
    let region = calculate_crop_region(image.width(), image.height(), crop)?;

    let cropped = imageops::crop_imm(image, region.x, region.y, region.width, region.height).to_image();

    tracing::debug!(
        target: "ocr_preprocessing",
        "Cropped {}x{} image to {}x{} at ({}, {}) in {}ms",
        image.width(),
        image.height(),
        region.width,
        region.height,
        region.x,
        region.y,
        start_time.elapsed().as_millis()
    );

    Ok(cropped)
}

/// Converts a percentage crop into a pixel rectangle for a `width` x `height` image.
pub fn calculate_crop_region(
    width: u32,
    height: u32,
    crop: &CropSpec,
) -> Result<CropRegion, PreprocessingError> {
    let (x, kept_width) = axis_span(width, crop.left, crop.right, Axis::Horizontal)?;
    let (y, kept_height) = axis_span(height, crop.top, crop.bottom, Axis::Vertical)?;

    Ok(CropRegion {
        x,
        y,
        width: kept_width,
        height: kept_height,
    })
}

fn axis_span(
    dimension: u32,
    start_pct: f32,
    end_pct: f32,
    axis: Axis,
) -> Result<(u32, u32), PreprocessingError> {
    let start_px = percent_to_pixels(start_pct, dimension);
    let end_px = percent_to_pixels(end_pct, dimension);
    let kept = dimension.saturating_sub(start_px).saturating_sub(end_px);

    if kept == 0 {
        return Err(PreprocessingError::DegenerateRegion {
            axis,
            dimension,
            start_px,
            end_px,
        });
    }

    Ok((start_px, kept))
}

fn percent_to_pixels(percentage: f32, dimension: u32) -> u32 {
    ((f64::from(percentage) / 100.0) * f64::from(dimension)).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn gradient_image(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 0, 255])
        })
    }

    #[test]
    fn test_no_crop_keeps_image() {
        let img = gradient_image(40, 30);
        let cropped = crop_image(&img, &CropSpec::NONE).unwrap();
        assert_eq!(cropped, img);
    }

    #[test]
    fn test_crop_offsets_content() {
        let img = gradient_image(100, 50);
        let crop = CropSpec::new(10.0, 0.0, 20.0, 0.0);
        let cropped = crop_image(&img, &crop).unwrap();

        assert_eq!(cropped.dimensions(), (80, 45));
        // top-left of the result is source pixel (20, 5)
        assert_eq!(cropped.get_pixel(0, 0), &Rgba([20, 5, 0, 255]));
    }

    #[test]
    fn test_crop_dimensions_within_rounding() {
        let (w, h) = (137u32, 91u32);
        let img = gradient_image(w, h);
        let crops = [
            CropSpec::new(35.0, 5.0, 5.0, 5.0),
            CropSpec::new(12.5, 12.5, 33.3, 0.0),
            CropSpec::new(0.0, 99.0, 0.0, 0.5),
            CropSpec::new(49.9, 49.9, 49.9, 49.9),
        ];

        for crop in crops {
            let cropped = crop_image(&img, &crop).unwrap();
            let expected_w = w as f32 * (1.0 - (crop.left + crop.right) / 100.0);
            let expected_h = h as f32 * (1.0 - (crop.top + crop.bottom) / 100.0);
            assert!(
                (cropped.width() as f32 - expected_w).abs() <= 1.0,
                "width {} vs {} for {:?}",
                cropped.width(),
                expected_w,
                crop
            );
            assert!(
                (cropped.height() as f32 - expected_h).abs() <= 1.0,
                "height {} vs {} for {:?}",
                cropped.height(),
                expected_h,
                crop
            );
        }
    }

    #[test]
    fn test_rounding_to_empty_axis_is_degenerate() {
        // 2px tall: 30% and 30% both round to 1px, leaving nothing
        let img = gradient_image(10, 2);
        let crop = CropSpec::new(30.0, 30.0, 0.0, 0.0);
        let result = crop_image(&img, &crop);
        assert!(matches!(
            result,
            Err(PreprocessingError::DegenerateRegion {
                axis: Axis::Vertical,
                dimension: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_consumed_axis_is_rejected_before_pixel_work() {
        let img = gradient_image(10, 10);
        let crop = CropSpec::new(0.0, 0.0, 70.0, 30.0);
        assert!(matches!(
            crop_image(&img, &crop),
            Err(PreprocessingError::DegenerateCrop {
                axis: Axis::Horizontal,
                ..
            })
        ));
    }

    #[test]
    fn test_calculate_crop_region() {
        let region = calculate_crop_region(200, 100, &CropSpec::new(35.0, 5.0, 5.0, 5.0)).unwrap();
        assert_eq!(
            region,
            CropRegion {
                x: 10,
                y: 35,
                width: 180,
                height: 60
            }
        );
    }
}
