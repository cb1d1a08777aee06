//! # OCR Error Types Module
//!
//! This module defines the typed failures surfaced by a transcription request.
//! None of them is swallowed: each reaches the caller as an `Err`.

use crate::preprocessing::PreprocessingError;

/// Custom error types for OCR operations
#[derive(Debug, Clone, PartialEq)]
pub enum OcrError {
    /// Input bytes are not a decodable raster image (e.g. a PDF)
    UnsupportedFormat(String),
    /// Input exceeds the size limit for its format
    TooLarge { size: u64, limit: u64 },
    /// Crop eliminates an entire axis
    DegenerateRegion(String),
    /// Configuration rejected before processing started
    InvalidConfig(String),
    /// The recognizer failed, on a given strip if strip mode was active
    Recognition {
        strip: Option<usize>,
        message: String,
    },
    /// The recognizer did not finish within the configured time
    Timeout { strip: Option<usize>, seconds: u64 },
    /// The request was cancelled before all strips were dispatched
    Cancelled { completed_strips: usize },
    /// The processed image could not be encoded for preview
    Preview(String),
}

impl OcrError {
    /// Short tag used in logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            OcrError::UnsupportedFormat(_) => "unsupported_format",
            OcrError::TooLarge { .. } => "too_large",
            OcrError::DegenerateRegion(_) => "degenerate_region",
            OcrError::InvalidConfig(_) => "invalid_config",
            OcrError::Recognition { .. } => "recognition",
            OcrError::Timeout { .. } => "timeout",
            OcrError::Cancelled { .. } => "cancelled",
            OcrError::Preview(_) => "preview",
        }
    }
}

fn strip_suffix(strip: &Option<usize>) -> String {
    match strip {
        Some(index) => format!(" (strip {})", index),
        None => String::new(),
    }
}

impl std::fmt::Display for OcrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OcrError::UnsupportedFormat(msg) => write!(f, "[UNSUPPORTED_FORMAT] Input is not a supported raster image: {}", msg),
            OcrError::TooLarge { size, limit } => write!(f, "[IMAGE_TOO_LARGE] Image is {} bytes, maximum allowed is {} bytes", size, limit),
            OcrError::DegenerateRegion(msg) => write!(f, "[DEGENERATE_REGION] Crop leaves no image to process: {}", msg),
            OcrError::InvalidConfig(msg) => write!(f, "[INVALID_CONFIG] Recognition configuration rejected: {}", msg),
            OcrError::Recognition { strip, message } => write!(f, "[OCR_RECOGNIZE] Text recognition failed{}: {}", strip_suffix(strip), message),
            OcrError::Timeout { strip, seconds } => write!(f, "[OCR_TIMEOUT] Text recognition timed out after {} seconds{}", seconds, strip_suffix(strip)),
            OcrError::Cancelled { completed_strips } => write!(f, "[OCR_CANCELLED] Transcription cancelled after {} completed strips", completed_strips),
            OcrError::Preview(msg) => write!(f, "[PREVIEW_ENCODE] Failed to encode preview: {}", msg),
        }
    }
}

impl std::error::Error for OcrError {}

impl From<PreprocessingError> for OcrError {
    fn from(err: PreprocessingError) -> Self {
        match err {
            PreprocessingError::DegenerateRegion { .. } | PreprocessingError::DegenerateCrop { .. } => {
                OcrError::DegenerateRegion(err.to_string())
            }
            PreprocessingError::InvalidCrop { .. } | PreprocessingError::ProcessingFailed { .. } => {
                OcrError::InvalidConfig(err.to_string())
            }
            PreprocessingError::BufferMismatch { .. } => OcrError::Recognition {
                strip: None,
                message: err.to_string(),
            },
        }
    }
}

impl From<image::ImageError> for OcrError {
    fn from(err: image::ImageError) -> Self {
        OcrError::UnsupportedFormat(err.to_string())
    }
}
