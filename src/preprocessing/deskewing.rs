//! # Image Deskewing Module
//!
//! Rotation correction for tilted page photographs. The angle is supplied by
//! the caller; nothing here estimates skew. The canvas keeps its size, so
//! content rotated past the edges is clipped and uncovered corners become
//! transparent black.

use image::Rgba;
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use tracing;

use super::types::RasterBuffer;

/// Rotations smaller than this (in degrees) are skipped.
pub const SKEW_EPSILON_DEGREES: f32 = 0.1;

/// Fill for pixels that no source pixel maps onto.
const UNCOVERED: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Rotates `image` clockwise by `skew_degrees` about its centre on a canvas of
/// the same size.
///
/// Nearest-neighbour sampling keeps the result deterministic and leaves
/// binarization-friendly hard edges.
///
/// # Examples
///
/// ```
/// use image::RgbaImage;
/// use transcribex::preprocessing::rotate_in_place;
///
/// let page = RgbaImage::new(64, 48);
/// let rotated = rotate_in_place(&page, 3.5);
/// assert_eq!(rotated.dimensions(), (64, 48));
/// ```
pub fn rotate_in_place(image: &RasterBuffer, skew_degrees: f32) -> RasterBuffer {
    if skew_degrees.abs() <= SKEW_EPSILON_DEGREES {
        tracing::debug!(
            target: "ocr_preprocessing",
            "Skew angle {:.2}° is below threshold, skipping rotation",
            skew_degrees
        );
        return image.clone();
    }

    let start_time = std::time::Instant::now();
    let rotated = rotate_about_center(
        image,
        skew_degrees.to_radians(),
        Interpolation::Nearest,
        UNCOVERED,
    );

    tracing::debug!(
        target: "ocr_preprocessing",
        "Rotated {}x{} image by {:.2}° in {}ms",
        image.width(),
        image.height(),
        skew_degrees,
        start_time.elapsed().as_millis()
    );

    rotated
}
