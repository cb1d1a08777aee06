//! # Transcribex
//!
//! Document-image preprocessing and strip-segmented OCR orchestration for
//! historical manuscripts and printed pages. A page photograph is cropped,
//! deskewed, reduced to gray and binarized, then handed to a pluggable text
//! recognizer either whole or as a sequence of overlapping horizontal strips.

pub mod config;
pub mod errors;
pub mod observability;
pub mod ocr;
pub mod ocr_config;
pub mod ocr_errors;
pub mod preprocessing;
pub mod progress;
pub mod recognizer;
pub mod segmentation;

// Re-export types for easier access
pub use ocr::{decode_image, encode_preview, transcribe};
pub use ocr_config::{DocumentMode, OcrConfig, PageSegMode, RecognitionConfig};
pub use ocr_errors::OcrError;
pub use progress::{ProgressEvent, ProgressReporter};
pub use recognizer::{RecognitionRequest, Recognizer};
pub use segmentation::recognize_document;
