//! # Strip Segmentation Module
//!
//! Drives the recognizer over a page, either once over the whole cropped
//! image or over a sequence of overlapping horizontal strips.
//!
//! Strips are processed sequentially in index order. Each strip runs the full
//! preprocessing pipeline with its own vertical band, then one recognizer call
//! in single-line mode under a timeout. Any strip failure aborts the request
//! and no partial transcription is returned.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

use crate::errors::error_logging;
use crate::observability::{ocr_span, record_strip_metrics, strip_span};
use crate::ocr_config::{PageSegMode, RecognitionConfig};
use crate::ocr_errors::OcrError;
use crate::preprocessing::{preprocess, CropSpec, PreprocessConfig, RawImage};
use crate::progress::{whole_image_percent, ProgressReporter, ProgressState};
use crate::recognizer::{RecognitionRequest, Recognizer};

/// Recognized text of one strip, tagged with its top-to-bottom position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripResult {
    pub index: usize,
    pub text: String,
}

/// Vertical bands for `strip_count` strips sharing `overlap` of the page
/// height at each seam.
///
/// Band `i` keeps `top = 100·i/N` and `bottom = 100·(1 − (i+1)/N)`, both
/// reduced by `100·overlap` on interior seams and clamped at zero. The
/// horizontal crop of `base` is carried unchanged.
pub fn strip_crops(base: &CropSpec, strip_count: u32, overlap: f32) -> Vec<CropSpec> {
    let count = strip_count as f64;
    let seam = 100.0 * overlap as f64;

    (0..strip_count)
        .map(|i| {
            let index = i as f64;
            let mut top = 100.0 * index / count;
            let mut bottom = 100.0 * (1.0 - (index + 1.0) / count);
            if i > 0 {
                top -= seam;
            }
            if i + 1 < strip_count {
                bottom -= seam;
            }
            base.with_vertical_band(top.max(0.0) as f32, bottom.max(0.0) as f32)
        })
        .collect()
}

/// Joins strip texts in index order, one line per strip.
pub fn assemble_transcription(mut results: Vec<StripResult>) -> String {
    results.sort_by_key(|result| result.index);
    results.iter().fold(String::new(), |mut text, result| {
        text.push_str(result.text.trim());
        text.push('\n');
        text
    })
}

/// Runs one recognizer call under `timeout`, tagging failures with `strip`.
async fn recognize_with_timeout(
    recognizer: &dyn Recognizer,
    image: &image::RgbaImage,
    request: &RecognitionRequest,
    sink: &(dyn Fn(f32) + Send + Sync),
    timeout: Duration,
    strip: Option<usize>,
) -> Result<String, OcrError> {
    match tokio::time::timeout(timeout, recognizer.recognize(image, request, sink)).await {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(OcrError::Recognition { strip: None, message })) => {
            Err(OcrError::Recognition { strip, message })
        }
        Ok(Err(err)) => Err(err),
        Err(_) => Err(OcrError::Timeout {
            strip,
            seconds: timeout.as_secs(),
        }),
    }
}

/// Recognizes the text of `raw` with the given preprocessing and recognition
/// settings.
///
/// In whole-image mode the recognizer's progress ratio is forwarded as
/// `round(100·p)`. In strip mode the overall percentage is
/// `min(99, round(100·(i + p)/N))` while strip `i` is in flight and
/// `round(100·(i+1)/N)` once it completes. 100 is reported only after the
/// final text has been assembled.
///
/// # Errors
///
/// - `InvalidConfig` / `DegenerateRegion` - Rejected before recognition starts
/// - `Recognition` - The recognizer failed (with the strip index in strip mode)
/// - `Timeout` - A recognizer call exceeded `timeout`
/// - `Cancelled` - `cancel` fired before the next recognizer call was dispatched
pub async fn recognize_document(
    raw: &RawImage,
    preprocess_config: &PreprocessConfig,
    recognition: &RecognitionConfig,
    recognizer: &dyn Recognizer,
    progress: &ProgressReporter,
    cancel: &CancellationToken,
    timeout: Duration,
) -> Result<String, OcrError> {
    recognition
        .validate()
        .map_err(|e| OcrError::InvalidConfig(e.to_string()))?;
    progress.reset();

    if recognition.strip_mode {
        recognize_strips(
            raw,
            preprocess_config,
            recognition,
            recognizer,
            progress,
            cancel,
            timeout,
        )
        .instrument(ocr_span("recognize_strips"))
        .await
    } else {
        recognize_whole(
            raw,
            preprocess_config,
            recognition,
            recognizer,
            progress,
            cancel,
            timeout,
        )
        .instrument(ocr_span("recognize_whole"))
        .await
    }
}

async fn recognize_whole(
    raw: &RawImage,
    preprocess_config: &PreprocessConfig,
    recognition: &RecognitionConfig,
    recognizer: &dyn Recognizer,
    progress: &ProgressReporter,
    cancel: &CancellationToken,
    timeout: Duration,
) -> Result<String, OcrError> {
    let processed = preprocess(raw, preprocess_config)?;
    let request = RecognitionRequest::new(&recognition.language, recognition.page_seg_mode);
    recognize_image(&processed.image, &request, recognizer, progress, cancel, timeout).await
}

/// Recognizes one image as a whole, forwarding progress as `round(100·p)`.
///
/// Used for preprocessed pages and for images handed to the recognizer
/// without any preprocessing. The text is returned as the recognizer
/// produced it.
pub async fn recognize_image(
    image: &image::RgbaImage,
    request: &RecognitionRequest,
    recognizer: &dyn Recognizer,
    progress: &ProgressReporter,
    cancel: &CancellationToken,
    timeout: Duration,
) -> Result<String, OcrError> {
    if cancel.is_cancelled() {
        return Err(OcrError::Cancelled {
            completed_strips: 0,
        });
    }
    progress.reset();

    let sink = |fraction: f32| progress.report(None, fraction, whole_image_percent(fraction));

    let start_time = Instant::now();
    let text = recognize_with_timeout(recognizer, image, request, &sink, timeout, None)
        .await
        .inspect_err(|err| {
            error_logging::log_ocr_error(
                err,
                "recognize_image",
                None,
                Some((image.width(), image.height())),
                Some(start_time.elapsed()),
            );
        })?;

    progress.finish();
    info!(
        chars = text.chars().count(),
        psm = request.page_seg_mode.code(),
        duration_ms = start_time.elapsed().as_millis(),
        "Whole-image recognition completed"
    );
    Ok(text)
}

/// Preprocesses and recognizes strip `index`.
#[allow(clippy::too_many_arguments)]
async fn recognize_strip(
    raw: &RawImage,
    strip_config: &PreprocessConfig,
    recognizer: &dyn Recognizer,
    request: &RecognitionRequest,
    progress: &ProgressReporter,
    state: &Mutex<ProgressState>,
    index: usize,
    strip_count: usize,
    timeout: Duration,
) -> Result<String, OcrError> {
    let processed = preprocess(raw, strip_config)?;
    debug!(
        width = processed.width(),
        height = processed.height(),
        top = strip_config.crop.top,
        bottom = strip_config.crop.bottom,
        "Strip preprocessed"
    );

    let percent = state.lock().in_flight_percent(strip_count);
    progress.report(Some(index), 0.0, percent);
    let sink = |fraction: f32| {
        let percent = state.lock().advance(fraction, strip_count);
        progress.report(Some(index), fraction, percent)
    };

    recognize_with_timeout(
        recognizer,
        &processed.image,
        request,
        &sink,
        timeout,
        Some(index),
    )
    .await
}

async fn recognize_strips(
    raw: &RawImage,
    preprocess_config: &PreprocessConfig,
    recognition: &RecognitionConfig,
    recognizer: &dyn Recognizer,
    progress: &ProgressReporter,
    cancel: &CancellationToken,
    timeout: Duration,
) -> Result<String, OcrError> {
    let strip_count = recognition.strip_count as usize;
    let crops = strip_crops(
        &preprocess_config.crop,
        recognition.strip_count,
        recognition.overlap_fraction,
    );
    let request = RecognitionRequest::new(&recognition.language, PageSegMode::SingleLine);

    info!(
        strip_count,
        overlap = recognition.overlap_fraction,
        language = %recognition.language,
        "Starting strip recognition"
    );

    let state = Mutex::new(ProgressState::new());
    let mut results = Vec::with_capacity(strip_count);

    for (index, crop) in crops.into_iter().enumerate() {
        if cancel.is_cancelled() {
            let completed_strips = state.lock().completed_strips;
            warn!(completed_strips, "Strip recognition cancelled");
            return Err(OcrError::Cancelled { completed_strips });
        }

        let start_time = Instant::now();
        let outcome = recognize_strip(
            raw,
            &preprocess_config.with_crop(crop),
            recognizer,
            &request,
            progress,
            &state,
            index,
            strip_count,
            timeout,
        )
        .instrument(strip_span(index, strip_count))
        .await;

        let text = match outcome {
            Ok(text) => text,
            Err(err) => {
                record_strip_metrics(false, start_time.elapsed());
                error_logging::log_ocr_error(
                    &err,
                    "recognize_strip",
                    Some(index),
                    Some((raw.width(), raw.height())),
                    Some(start_time.elapsed()),
                );
                return Err(err);
            }
        };

        record_strip_metrics(true, start_time.elapsed());
        results.push(StripResult { index, text });

        let percent = state.lock().complete_strip(strip_count);
        progress.report(Some(index), 1.0, percent);
    }

    let transcription = assemble_transcription(results);
    progress.finish();

    info!(
        strip_count,
        chars = transcription.chars().count(),
        "Strip recognition completed"
    );
    Ok(transcription)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_crops_without_overlap() {
        let crops = strip_crops(&CropSpec::NONE, 4, 0.0);
        let bands: Vec<(f32, f32)> = crops.iter().map(|c| (c.top, c.bottom)).collect();
        assert_eq!(
            bands,
            vec![(0.0, 75.0), (25.0, 50.0), (50.0, 25.0), (75.0, 0.0)]
        );
    }

    #[test]
    fn test_strip_crops_overlap_on_interior_seams() {
        let crops = strip_crops(&CropSpec::new(35.0, 5.0, 5.0, 7.0), 4, 0.08);

        assert!((crops[0].top - 0.0).abs() < 1e-4);
        assert!((crops[0].bottom - 67.0).abs() < 1e-4);
        assert!((crops[1].top - 17.0).abs() < 1e-4);
        assert!((crops[1].bottom - 42.0).abs() < 1e-4);
        assert!((crops[3].top - 67.0).abs() < 1e-4);
        assert!((crops[3].bottom - 0.0).abs() < 1e-4);

        for crop in &crops {
            assert_eq!(crop.left, 5.0);
            assert_eq!(crop.right, 7.0);
            assert!(crop.validate().is_ok());
        }
    }

    #[test]
    fn test_strip_crops_clamp_at_zero() {
        let crops = strip_crops(&CropSpec::NONE, 8, 0.5);
        for crop in &crops {
            assert!(crop.top >= 0.0 && crop.bottom >= 0.0);
            assert!(crop.top + crop.bottom < 100.0);
        }
    }

    #[test]
    fn test_single_strip_covers_page() {
        let crops = strip_crops(&CropSpec::NONE, 1, 0.08);
        assert_eq!(crops.len(), 1);
        assert_eq!((crops[0].top, crops[0].bottom), (0.0, 0.0));
    }

    #[test]
    fn test_assemble_transcription_orders_by_index() {
        let results = vec![
            StripResult { index: 2, text: "C".to_string() },
            StripResult { index: 0, text: "  A\n".to_string() },
            StripResult { index: 1, text: "B".to_string() },
        ];
        assert_eq!(assemble_transcription(results), "A\nB\nC\n");
    }
}
