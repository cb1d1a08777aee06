//! # Image Thresholding Module
//!
//! Converts a grayscale buffer into the RGB-equal raster handed to the
//! recognizer. Two binarization algorithms are available:
//!
//! - Otsu's method, one global threshold from the histogram
//! - Sauvola's method, a per-pixel threshold from local mean and deviation,
//!   computed in constant time per pixel with an [`IntegralImage`]
//!
//! Tone inversion is folded into the same pass.

use image::{Rgba, RgbaImage};
use std::time::Instant;
use tracing;

use super::integral::IntegralImage;
use super::types::{BinarizeMode, GrayscaleBuffer, SauvolaParams};

/// Threshold used when the histogram never separates into two classes.
const OTSU_FALLBACK_THRESHOLD: u8 = 127;

/// Result of a binarization pass.
#[derive(Debug, Clone)]
pub struct ThresholdedImageResult {
    /// RGB-equal raster with opaque alpha
    pub image: RgbaImage,
    /// Global threshold, when Otsu ran
    pub threshold: Option<u8>,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Binarizes `gray` with `mode`, inverting the tones afterwards if requested.
///
/// `None` replicates the gray level into R, G and B. Otsu and Sauvola
/// produce 0 or 255 in every channel.
///
/// # Examples
///
/// ```
/// use transcribex::preprocessing::{binarize, BinarizeMode, GrayscaleBuffer, SauvolaParams};
///
/// let gray = GrayscaleBuffer::new(4, 1, vec![10, 20, 230, 240]).unwrap();
/// let result = binarize(&gray, BinarizeMode::Otsu, false, &SauvolaParams::default());
/// assert_eq!(result.image.get_pixel(0, 0).0, [0, 0, 0, 255]);
/// assert_eq!(result.image.get_pixel(3, 0).0, [255, 255, 255, 255]);
/// ```
pub fn binarize(
    gray: &GrayscaleBuffer,
    mode: BinarizeMode,
    invert: bool,
    sauvola: &SauvolaParams,
) -> ThresholdedImageResult {
    let start_time = Instant::now();

    let (levels, threshold) = match mode {
        BinarizeMode::None => (gray.data().to_vec(), None),
        BinarizeMode::Otsu => {
            let threshold = otsu_threshold(&gray.histogram());
            (apply_global_threshold(gray, threshold), Some(threshold))
        }
        BinarizeMode::Sauvola => (apply_sauvola_threshold(gray, sauvola), None),
    };

    let image = RgbaImage::from_fn(gray.width(), gray.height(), |x, y| {
        let level = levels[y as usize * gray.width() as usize + x as usize];
        let value = if invert { invert_value(level) } else { level };
        Rgba([value, value, value, 255])
    });

    let processing_time = start_time.elapsed();

    tracing::debug!(
        target: "ocr_preprocessing",
        "Binarization ({}) completed in {}ms: threshold={:?}, invert={}, dimensions={}x{}",
        mode.as_str(),
        processing_time.as_millis(),
        threshold,
        invert,
        gray.width(),
        gray.height()
    );

    ThresholdedImageResult {
        image,
        threshold,
        processing_time_ms: processing_time.as_millis() as u32,
    }
}

/// Tone inversion of one sample.
pub fn invert_value(value: u8) -> u8 {
    255 - value
}

/// Finds the global threshold maximizing between-class variance.
///
/// Candidate thresholds are scanned in ascending order with the background
/// class holding levels `<= t`; the first maximum wins. When the winning
/// boundary is followed by empty bins, the returned threshold is centred in
/// that gap, which classifies every pixel of the histogram exactly as the
/// first maximum does. A histogram with a single occupied level yields 127.
pub fn otsu_threshold(histogram: &[u32; 256]) -> u8 {
    let total: f64 = histogram.iter().map(|&c| f64::from(c)).sum();
    let weighted_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * f64::from(count))
        .sum();

    let mut weight_background = 0f64;
    let mut sum_background = 0f64;
    let mut max_variance = 0f64;
    let mut best: Option<usize> = None;

    for (level, &count) in histogram.iter().enumerate() {
        weight_background += f64::from(count);
        if weight_background == 0.0 {
            continue;
        }
        let weight_foreground = total - weight_background;
        if weight_foreground == 0.0 {
            break;
        }

        sum_background += level as f64 * f64::from(count);
        let mean_background = sum_background / weight_background;
        let mean_foreground = (weighted_total - sum_background) / weight_foreground;

        let variance = weight_background
            * weight_foreground
            * (mean_background - mean_foreground).powi(2);

        if variance > max_variance {
            max_variance = variance;
            best = Some(level);
        }
    }

    match best {
        Some(level) => centre_in_gap(histogram, level),
        None => OTSU_FALLBACK_THRESHOLD,
    }
}

fn centre_in_gap(histogram: &[u32; 256], level: usize) -> u8 {
    let next_occupied = (level + 1..256)
        .find(|&l| histogram[l] > 0)
        .unwrap_or(level + 1);
    // levels in (level, next_occupied) are empty
    ((level + next_occupied - 1) / 2) as u8
}

fn apply_global_threshold(gray: &GrayscaleBuffer, threshold: u8) -> Vec<u8> {
    gray.data()
        .iter()
        .map(|&value| if value > threshold { 255 } else { 0 })
        .collect()
}

/// Sauvola threshold for a window with the given mean and standard deviation.
///
/// Non-decreasing in `std_dev` for positive `k`.
pub fn sauvola_threshold(mean: f64, std_dev: f64, params: &SauvolaParams) -> f64 {
    mean * (1.0 + params.k * ((std_dev / params.dynamic_range) - 1.0))
}

fn apply_sauvola_threshold(gray: &GrayscaleBuffer, params: &SauvolaParams) -> Vec<u8> {
    let integral = IntegralImage::new(gray);
    let mut out = Vec::with_capacity(gray.data().len());

    for y in 0..gray.height() {
        for x in 0..gray.width() {
            let stats = integral.window_stats(x, y, params.window_radius);
            let threshold = sauvola_threshold(stats.mean, stats.std_dev, params);
            let value = f64::from(gray.get(x, y));
            out.push(if value >= threshold { 255 } else { 0 });
        }
    }

    out
}
