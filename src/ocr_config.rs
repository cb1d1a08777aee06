//! # OCR Configuration Module
//!
//! This module defines configuration structures for recognition requests,
//! including document presets, strip segmentation, timeouts and input limits.

use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};
use crate::preprocessing::{BinarizeMode, ChannelMode, CropSpec, PreprocessConfig};

// Constants for OCR configuration
pub const DEFAULT_LANGUAGE: &str = "por";
pub const SUPPORTED_LANGUAGES: &[&str] = &["por", "eng", "spa", "fra", "lat"];
pub const DEFAULT_STRIP_COUNT: u32 = 8;
pub const DEFAULT_STRIP_OVERLAP: f32 = 0.08;
pub const FORMAT_DETECTION_BUFFER_SIZE: usize = 32;
pub const MIN_FORMAT_BYTES: usize = 8;
pub const MAX_FILE_SIZE: u64 = 20 * 1024 * 1024; // 20MB limit for page photographs

/// Recovery configuration for error handling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Timeout for a single recognizer call (one strip, or the whole page) in seconds
    pub operation_timeout_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            operation_timeout_secs: 120, // 2 minutes
        }
    }
}

impl RecoveryConfig {
    /// Validate recovery configuration parameters
    pub fn validate(&self) -> AppResult<()> {
        if self.operation_timeout_secs == 0 {
            return Err(AppError::Config(
                "operation_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Format-specific file size limits for different image formats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatSizeLimits {
    /// PNG format limit (higher due to better compression)
    pub png_max: u64,
    /// JPEG format limit (moderate due to lossy compression)
    pub jpeg_max: u64,
    /// WEBP format limit
    pub webp_max: u64,
    /// BMP format limit (lower due to uncompressed nature)
    pub bmp_max: u64,
    /// TIFF format limit (archival scans can be large)
    pub tiff_max: u64,
}

impl Default for FormatSizeLimits {
    fn default() -> Self {
        Self {
            png_max: 20 * 1024 * 1024,  // 20MB for PNG
            jpeg_max: 15 * 1024 * 1024, // 15MB for JPEG
            webp_max: 15 * 1024 * 1024, // 15MB for WEBP
            bmp_max: 10 * 1024 * 1024,  // 10MB for BMP
            tiff_max: 20 * 1024 * 1024, // 20MB for TIFF
        }
    }
}

impl FormatSizeLimits {
    /// Validate format size limits
    pub fn validate(&self) -> AppResult<()> {
        for (name, value) in [
            ("png_max", self.png_max),
            ("jpeg_max", self.jpeg_max),
            ("webp_max", self.webp_max),
            ("bmp_max", self.bmp_max),
            ("tiff_max", self.tiff_max),
        ] {
            if value == 0 {
                return Err(AppError::Config(format!("{} must be greater than 0", name)));
            }
        }
        Ok(())
    }

    /// Size limit for a detected format, if it has a specific one
    pub fn limit_for(&self, format: image::ImageFormat) -> Option<u64> {
        match format {
            image::ImageFormat::Png => Some(self.png_max),
            image::ImageFormat::Jpeg => Some(self.jpeg_max),
            image::ImageFormat::WebP => Some(self.webp_max),
            image::ImageFormat::Bmp => Some(self.bmp_max),
            image::ImageFormat::Tiff => Some(self.tiff_max),
            _ => None,
        }
    }
}

/// Page Segmentation Mode for Tesseract OCR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSegMode {
    /// Orientation and script detection (OSD) only
    OsdOnly = 0,
    /// Automatic page segmentation with OSD
    AutoOsd = 1,
    /// Automatic page segmentation, no OSD
    AutoNoOsd = 2,
    /// Fully automatic page segmentation
    Auto = 3,
    /// Assume a single column of text
    SingleColumn = 4,
    /// Assume a single uniform block of vertically aligned text
    SingleBlockVert = 5,
    /// Assume a single uniform block of text
    #[default]
    SingleBlock = 6,
    /// Treat the image as a single text line
    SingleLine = 7,
    /// Treat the image as a single word
    SingleWord = 8,
    /// Treat the image as a single word in a circle
    WordInCircle = 9,
    /// Treat the image as a single character
    SingleChar = 10,
    /// Find as much text as possible in no particular order
    SparseText = 11,
    /// Sparse text with OSD
    SparseTextOsd = 12,
    /// Treat the image as a single text line, bypassing hacks that are Tesseract-specific
    RawLine = 13,
}

impl PageSegMode {
    /// Numeric code understood by the recognizer
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Convert PSM mode to string value for Tesseract
    pub fn as_str(&self) -> &'static str {
        match self {
            PageSegMode::OsdOnly => "0",
            PageSegMode::AutoOsd => "1",
            PageSegMode::AutoNoOsd => "2",
            PageSegMode::Auto => "3",
            PageSegMode::SingleColumn => "4",
            PageSegMode::SingleBlockVert => "5",
            PageSegMode::SingleBlock => "6",
            PageSegMode::SingleLine => "7",
            PageSegMode::SingleWord => "8",
            PageSegMode::WordInCircle => "9",
            PageSegMode::SingleChar => "10",
            PageSegMode::SparseText => "11",
            PageSegMode::SparseTextOsd => "12",
            PageSegMode::RawLine => "13",
        }
    }

    /// Parse a numeric page segmentation code
    pub fn from_code(code: u8) -> Option<Self> {
        let mode = match code {
            0 => PageSegMode::OsdOnly,
            1 => PageSegMode::AutoOsd,
            2 => PageSegMode::AutoNoOsd,
            3 => PageSegMode::Auto,
            4 => PageSegMode::SingleColumn,
            5 => PageSegMode::SingleBlockVert,
            6 => PageSegMode::SingleBlock,
            7 => PageSegMode::SingleLine,
            8 => PageSegMode::SingleWord,
            9 => PageSegMode::WordInCircle,
            10 => PageSegMode::SingleChar,
            11 => PageSegMode::SparseText,
            12 => PageSegMode::SparseTextOsd,
            13 => PageSegMode::RawLine,
            _ => return None,
        };
        Some(mode)
    }
}

/// Kind of document being transcribed, selecting a processing preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentMode {
    /// Printed text: global Otsu threshold, whole-page block recognition
    #[default]
    Typed,
    /// Manuscript: cropped margins, Sauvola threshold, line-oriented strips
    #[serde(alias = "hand")]
    Handwritten,
}

impl std::str::FromStr for DocumentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "typed" | "printed" => Ok(DocumentMode::Typed),
            "hand" | "handwritten" | "manuscript" => Ok(DocumentMode::Handwritten),
            other => Err(format!("unknown document mode '{}'", other)),
        }
    }
}

/// Language, layout and strip settings of one recognition request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionConfig {
    /// Recognizer language code (e.g. "por", "eng+lat")
    pub language: String,
    /// Page segmentation mode for whole-image recognition
    pub page_seg_mode: PageSegMode,
    /// Recognize the page as overlapping horizontal strips
    pub strip_mode: bool,
    /// Number of strips when strip mode is on
    pub strip_count: u32,
    /// Fraction of the page height shared between neighbouring strips, in [0, 1)
    pub overlap_fraction: f32,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            page_seg_mode: PageSegMode::SingleBlock,
            strip_mode: false,
            strip_count: DEFAULT_STRIP_COUNT,
            overlap_fraction: DEFAULT_STRIP_OVERLAP,
        }
    }
}

impl RecognitionConfig {
    /// Settings of the handwritten preset: single-line mode over strips
    pub fn handwritten(language: &str) -> Self {
        Self {
            language: language.to_string(),
            page_seg_mode: PageSegMode::SingleLine,
            strip_mode: true,
            ..Default::default()
        }
    }

    /// Validate recognition configuration parameters
    pub fn validate(&self) -> AppResult<()> {
        if self.language.trim().is_empty() {
            return Err(AppError::Config("language cannot be empty".to_string()));
        }
        if self.strip_mode && self.strip_count == 0 {
            return Err(AppError::Config(
                "strip_count must be greater than 0 in strip mode".to_string(),
            ));
        }
        if !self.overlap_fraction.is_finite() || !(0.0..1.0).contains(&self.overlap_fraction) {
            return Err(AppError::Config(format!(
                "overlap_fraction must be within [0, 1), got {}",
                self.overlap_fraction
            )));
        }
        Ok(())
    }
}

/// Preprocessing preset for printed pages
pub fn typed_preprocess_preset() -> PreprocessConfig {
    PreprocessConfig {
        crop: CropSpec::NONE,
        channel: ChannelMode::Auto,
        binarize: BinarizeMode::Otsu,
        invert: false,
        skew_degrees: 0.0,
        ..Default::default()
    }
}

/// Preprocessing preset for manuscripts: trims the header area and margins
pub fn handwritten_preprocess_preset() -> PreprocessConfig {
    PreprocessConfig {
        crop: CropSpec::new(35.0, 5.0, 5.0, 5.0),
        channel: ChannelMode::Auto,
        binarize: BinarizeMode::Sauvola,
        invert: false,
        skew_degrees: 0.0,
        ..Default::default()
    }
}

/// Complete configuration of a transcription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Document preset family
    pub document_mode: DocumentMode,
    /// Run preprocessing before recognition
    pub enhance: bool,
    /// Preprocessing used for handwritten documents
    pub preprocess: PreprocessConfig,
    /// Recognition settings
    pub recognition: RecognitionConfig,
    /// Timeout handling
    pub recovery: RecoveryConfig,
    /// Buffer size for format detection in bytes
    pub buffer_size: usize,
    /// Minimum bytes required for format detection
    pub min_format_bytes: usize,
    /// Maximum allowed file size in bytes (general limit)
    pub max_file_size: u64,
    /// Format-specific size limits
    pub format_limits: FormatSizeLimits,
    /// Directory holding recognizer language data
    pub tessdata_path: Option<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            document_mode: DocumentMode::default(),
            enhance: true,
            preprocess: handwritten_preprocess_preset(),
            recognition: RecognitionConfig::handwritten(DEFAULT_LANGUAGE),
            recovery: RecoveryConfig::default(),
            buffer_size: FORMAT_DETECTION_BUFFER_SIZE,
            min_format_bytes: MIN_FORMAT_BYTES,
            max_file_size: MAX_FILE_SIZE,
            format_limits: FormatSizeLimits::default(),
            tessdata_path: None,
        }
    }
}

impl OcrConfig {
    /// Handwritten preset: margins cropped, Sauvola, strips of single lines
    pub fn handwritten_preset(language: &str) -> Self {
        Self {
            document_mode: DocumentMode::Handwritten,
            recognition: RecognitionConfig::handwritten(language),
            ..Default::default()
        }
    }

    /// Printed preset. The manuscript settings are kept but only take effect
    /// once the document mode is switched to handwritten.
    pub fn typed_preset(language: &str) -> Self {
        Self {
            document_mode: DocumentMode::Typed,
            recognition: RecognitionConfig::handwritten(language),
            ..Default::default()
        }
    }

    /// Validate OCR configuration parameters
    pub fn validate(&self) -> AppResult<()> {
        if self.buffer_size == 0 {
            return Err(AppError::Config(
                "buffer_size must be greater than 0".to_string(),
            ));
        }
        if self.min_format_bytes == 0 {
            return Err(AppError::Config(
                "min_format_bytes must be greater than 0".to_string(),
            ));
        }
        if self.min_format_bytes > self.buffer_size {
            return Err(AppError::Config(format!(
                "min_format_bytes ({}) cannot exceed buffer_size ({})",
                self.min_format_bytes, self.buffer_size
            )));
        }
        if self.max_file_size == 0 {
            return Err(AppError::Config(
                "max_file_size must be greater than 0".to_string(),
            ));
        }

        // Whether opposite sides leave any pixels depends on the path taken:
        // strips replace top and bottom, typed pages ignore the crop.
        self.preprocess
            .crop
            .validate_ranges()
            .map_err(|e| AppError::Config(e.to_string()))?;
        self.preprocess
            .sauvola
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;
        self.recognition.validate()?;
        self.recovery.validate()?;
        self.format_limits.validate()?;

        Ok(())
    }
}
