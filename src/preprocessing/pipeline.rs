//! # Preprocessing Pipeline
//!
//! Composes crop, rotation, channel extraction and binarization into one
//! deterministic function of the raw image and its configuration.

use std::time::Instant;
use tracing;

use super::channel::extract_grayscale;
use super::cropping::crop_image;
use super::deskewing::rotate_in_place;
use super::thresholding::binarize;
use super::types::{PreprocessConfig, PreprocessingError, ProcessedImage, RawImage};

/// Runs every preprocessing stage on `raw` according to `config`.
///
/// The configuration is validated before any pixel work, so an impossible
/// crop is reported without allocating intermediate buffers.
///
/// # Errors
///
/// `DegenerateRegion` or `InvalidCrop` when the crop leaves nothing to
/// process, `ProcessingFailed` for an unusable skew or Sauvola setting.
///
/// # Examples
///
/// ```
/// use image::{Rgba, RgbaImage};
/// use transcribex::preprocessing::{preprocess, BinarizeMode, CropSpec, PreprocessConfig};
///
/// let page = RgbaImage::from_pixel(80, 60, Rgba([240, 230, 210, 255]));
/// let config = PreprocessConfig {
///     crop: CropSpec::new(10.0, 10.0, 0.0, 0.0),
///     binarize: BinarizeMode::Otsu,
///     ..Default::default()
/// };
/// let processed = preprocess(&page, &config).unwrap();
/// assert_eq!((processed.width(), processed.height()), (80, 48));
/// assert!(processed.is_bilevel());
/// ```
pub fn preprocess(
    raw: &RawImage,
    config: &PreprocessConfig,
) -> Result<ProcessedImage, PreprocessingError> {
    let start_time = Instant::now();

    config.validate()?;

    let cropped = crop_image(raw, &config.crop)?;
    let rotated = rotate_in_place(&cropped, config.skew_degrees);
    let gray = extract_grayscale(&rotated, config.channel);
    let thresholded = binarize(&gray, config.binarize, config.invert, &config.sauvola);

    let processing_time = start_time.elapsed();
    metrics::histogram!("preprocessing_duration_seconds", "binarize" => config.binarize.as_str())
        .record(processing_time.as_secs_f64());

    tracing::debug!(
        target: "ocr_preprocessing",
        "Preprocessing completed in {}ms: {}x{} -> {}x{}, channel={:?}, binarize={}, invert={}, skew={:.2}°",
        processing_time.as_millis(),
        raw.width(),
        raw.height(),
        thresholded.image.width(),
        thresholded.image.height(),
        config.channel,
        config.binarize.as_str(),
        config.invert,
        config.skew_degrees
    );

    Ok(ProcessedImage {
        image: thresholded.image,
        binarize: config.binarize,
        threshold: thresholded.threshold,
        processing_time_ms: processing_time.as_millis() as u32,
    })
}
