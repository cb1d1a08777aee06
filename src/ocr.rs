//! # OCR Processing Module
//!
//! Entry point for transcribing a page photograph: input validation and
//! decoding, document-mode dispatch and preview encoding.
//!
//! ## Supported Image Formats
//!
//! - PNG, JPEG, WEBP, BMP, TIFF, GIF
//!
//! PDF documents and unrecognised bytes are rejected before any processing.
//!
//! ## Document Modes
//!
//! | Mode | Enhance | Processing |
//! |------|---------|------------|
//! | Typed | on | no crop, Otsu, page segmentation mode 6 |
//! | Typed | off | raw image, page segmentation mode 6 |
//! | Handwritten | on | configured preprocessing, strips or whole page |
//! | Handwritten | off | raw image, configured page segmentation mode |

use std::io::Cursor;
use std::time::{Duration, Instant};

use image::{ImageFormat, RgbaImage};
use tokio_util::sync::CancellationToken;
use tracing::{info, Instrument};

use crate::errors::error_logging;
use crate::observability;
pub use crate::ocr_config::{DocumentMode, OcrConfig, RecoveryConfig};
use crate::ocr_config::{typed_preprocess_preset, PageSegMode, RecognitionConfig};
pub use crate::ocr_errors::OcrError;
use crate::preprocessing::{preprocess, RawImage};
use crate::progress::ProgressReporter;
use crate::recognizer::{RecognitionRequest, Recognizer};
use crate::segmentation::{recognize_document, recognize_image};

const PDF_MAGIC: &[u8] = b"%PDF";

/// Raster formats accepted for transcription
pub fn is_supported_format(format: ImageFormat) -> bool {
    matches!(
        format,
        ImageFormat::Png
            | ImageFormat::Jpeg
            | ImageFormat::WebP
            | ImageFormat::Bmp
            | ImageFormat::Tiff
            | ImageFormat::Gif
    )
}

/// Detect the raster format of `bytes` from its header.
///
/// # Errors
///
/// `UnsupportedFormat` for PDFs, truncated headers, and anything that is not
/// one of the supported raster formats.
pub fn detect_format(bytes: &[u8], config: &OcrConfig) -> Result<ImageFormat, OcrError> {
    if bytes.len() < config.min_format_bytes {
        return Err(OcrError::UnsupportedFormat(format!(
            "only {} bytes available, at least {} needed for format detection",
            bytes.len(),
            config.min_format_bytes
        )));
    }

    if bytes.starts_with(PDF_MAGIC) {
        return Err(OcrError::UnsupportedFormat(
            "PDF documents are not supported, export the page as an image".to_string(),
        ));
    }

    let header = &bytes[..bytes.len().min(config.buffer_size)];
    let format = image::guess_format(header)
        .map_err(|_| OcrError::UnsupportedFormat("unrecognised image header".to_string()))?;

    if !is_supported_format(format) {
        return Err(OcrError::UnsupportedFormat(format!(
            "{:?} images are not supported",
            format
        )));
    }

    Ok(format)
}

/// Validate format and size of an encoded image.
pub fn validate_image_bytes(bytes: &[u8], config: &OcrConfig) -> Result<ImageFormat, OcrError> {
    let format = detect_format(bytes, config)?;
    let size = bytes.len() as u64;
    let limit = config
        .format_limits
        .limit_for(format)
        .unwrap_or(config.max_file_size)
        .min(config.max_file_size);

    if size > limit {
        return Err(OcrError::TooLarge { size, limit });
    }

    info!(
        format = ?format,
        size_bytes = size,
        limit_bytes = limit,
        "Image accepted for transcription"
    );
    Ok(format)
}

/// Decode an encoded image into an RGBA raster.
///
/// # Errors
///
/// `UnsupportedFormat` if the bytes are not a supported raster image or fail
/// to decode, `TooLarge` if they exceed the configured limit.
pub fn decode_image(bytes: &[u8], config: &OcrConfig) -> Result<RawImage, OcrError> {
    let format = validate_image_bytes(bytes, config)?;
    let decoded = image::load_from_memory_with_format(bytes, format)?;
    Ok(decoded.to_rgba8())
}

/// Encode a raster as PNG for display next to the transcription.
pub fn encode_preview(image: &RgbaImage) -> Result<Vec<u8>, OcrError> {
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| OcrError::Preview(e.to_string()))?;
    Ok(png)
}

/// The image a transcription would hand to the recognizer first: the fully
/// preprocessed page when enhancement is on, otherwise the decoded input.
///
/// In strip mode this is the whole page with the configured crop, i.e. what
/// the strips are cut from.
pub fn preview_image(raw: &RawImage, config: &OcrConfig) -> Result<RgbaImage, OcrError> {
    if !config.enhance {
        return Ok(raw.clone());
    }
    let preprocess_config = match config.document_mode {
        DocumentMode::Typed => typed_preprocess_preset(),
        DocumentMode::Handwritten => config.preprocess,
    };
    Ok(preprocess(raw, &preprocess_config)?.image)
}

/// Transcribe an encoded page image.
///
/// Dispatches on the document mode and enhancement flag (see the module
/// table). Progress events go to `progress`; `cancel` stops the request
/// before the next recognizer call.
///
/// # Errors
///
/// - `InvalidConfig` - The configuration failed validation
/// - `UnsupportedFormat` / `TooLarge` - The input was rejected
/// - `DegenerateRegion` - The crop leaves nothing to recognize
/// - `Recognition` / `Timeout` / `Cancelled` - From the recognition stage
pub async fn transcribe(
    bytes: &[u8],
    config: &OcrConfig,
    recognizer: &dyn Recognizer,
    progress: &ProgressReporter,
    cancel: &CancellationToken,
) -> Result<String, OcrError> {
    let start_time = Instant::now();

    let result = transcribe_inner(bytes, config, recognizer, progress, cancel)
        .instrument(observability::ocr_span("transcribe"))
        .await;

    let duration = start_time.elapsed();
    observability::record_ocr_metrics(result.is_ok(), duration, bytes.len() as u64);

    match &result {
        Ok(text) => info!(
            document_mode = ?config.document_mode,
            enhance = config.enhance,
            chars = text.chars().count(),
            duration_ms = duration.as_millis(),
            "Transcription completed"
        ),
        Err(err) => error_logging::log_ocr_error(err, "transcribe", None, None, Some(duration)),
    }

    result
}

async fn transcribe_inner(
    bytes: &[u8],
    config: &OcrConfig,
    recognizer: &dyn Recognizer,
    progress: &ProgressReporter,
    cancel: &CancellationToken,
) -> Result<String, OcrError> {
    config
        .validate()
        .map_err(|e| OcrError::InvalidConfig(e.to_string()))?;

    let raw = decode_image(bytes, config)?;
    let timeout = Duration::from_secs(config.recovery.operation_timeout_secs);
    let language = &config.recognition.language;

    match (config.document_mode, config.enhance) {
        (DocumentMode::Handwritten, true) => {
            recognize_document(
                &raw,
                &config.preprocess,
                &config.recognition,
                recognizer,
                progress,
                cancel,
                timeout,
            )
            .await
        }
        (DocumentMode::Handwritten, false) => {
            let request = RecognitionRequest::new(language, config.recognition.page_seg_mode);
            recognize_image(&raw, &request, recognizer, progress, cancel, timeout).await
        }
        (DocumentMode::Typed, true) => {
            let recognition = RecognitionConfig {
                language: language.clone(),
                page_seg_mode: PageSegMode::SingleBlock,
                strip_mode: false,
                ..config.recognition.clone()
            };
            recognize_document(
                &raw,
                &typed_preprocess_preset(),
                &recognition,
                recognizer,
                progress,
                cancel,
                timeout,
            )
            .await
        }
        (DocumentMode::Typed, false) => {
            let request = RecognitionRequest::new(language, PageSegMode::SingleBlock);
            recognize_image(&raw, &request, recognizer, progress, cancel, timeout).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba([200, 190, 170, 255]));
        encode_preview(&image).unwrap()
    }

    #[test]
    fn test_detect_format_png() {
        let config = OcrConfig::default();
        assert_eq!(
            detect_format(&png_bytes(4, 4), &config).unwrap(),
            ImageFormat::Png
        );
    }

    #[test]
    fn test_detect_format_rejects_pdf() {
        let config = OcrConfig::default();
        let pdf = b"%PDF-1.7\n1 0 obj\n<< /Type /Catalog >>\nendobj\n";
        let err = detect_format(pdf, &config).unwrap_err();
        assert!(matches!(err, OcrError::UnsupportedFormat(ref msg) if msg.contains("PDF")));
    }

    #[test]
    fn test_detect_format_rejects_short_and_unknown_input() {
        let config = OcrConfig::default();
        assert!(matches!(
            detect_format(b"\x89PN", &config),
            Err(OcrError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            detect_format(b"just some plain text, not an image", &config),
            Err(OcrError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_validate_image_bytes_size_limit() {
        let mut config = OcrConfig::default();
        let bytes = png_bytes(16, 16);
        config.format_limits.png_max = 10;
        assert!(matches!(
            validate_image_bytes(&bytes, &config),
            Err(OcrError::TooLarge { limit: 10, .. })
        ));

        config.format_limits.png_max = 1024 * 1024;
        config.max_file_size = 20;
        assert!(matches!(
            validate_image_bytes(&bytes, &config),
            Err(OcrError::TooLarge { limit: 20, .. })
        ));
    }

    #[test]
    fn test_decode_image_dimensions() {
        let config = OcrConfig::default();
        let raw = decode_image(&png_bytes(7, 5), &config).unwrap();
        assert_eq!(raw.dimensions(), (7, 5));
        assert_eq!(raw.get_pixel(0, 0).0, [200, 190, 170, 255]);
    }

    #[test]
    fn test_encode_preview_is_png() {
        let bytes = png_bytes(3, 3);
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_preview_image_follows_mode() {
        let raw = RgbaImage::from_pixel(20, 20, Rgba([120, 120, 120, 255]));

        let mut config = OcrConfig::default();
        config.enhance = false;
        assert_eq!(preview_image(&raw, &config).unwrap(), raw);

        config.enhance = true;
        config.document_mode = DocumentMode::Handwritten;
        let preview = preview_image(&raw, &config).unwrap();
        // 35% top, 5% bottom, 5% left and right are cropped away
        assert_eq!(preview.dimensions(), (18, 12));
    }
}
