//! # Unified Application Configuration
//!
//! This module consolidates transcription and logging settings into a single
//! configuration object. Values come from environment variables (a `.env`
//! file is loaded by the binary) on top of the document-mode presets, and
//! every section is validated before use.

use crate::errors::{AppError, AppResult};
use crate::ocr_config::{DocumentMode, OcrConfig, PageSegMode, DEFAULT_LANGUAGE};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level directive for the crate's own targets
    pub log_level: String,
    /// Output format
    pub format: LogFormat,
    /// Deployment environment name
    pub environment: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            environment: "development".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Validate logging configuration
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }
        if self.environment.trim().is_empty() {
            return Err(AppError::Config("environment cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// Unified application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// OCR processing configuration
    pub ocr: OcrConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ocr: OcrConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Parse an optional variable, naming it in the error
fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    expected: &str,
) -> AppResult<Option<T>> {
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AppError::Config(format!("{} must be {}", key, expected))),
        _ => Ok(None),
    }
}

fn parse_flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> AppResult<Option<bool>> {
    match lookup(key).map(|raw| raw.trim().to_ascii_lowercase()) {
        None => Ok(None),
        Some(raw) if raw.is_empty() => Ok(None),
        Some(raw) => match raw.as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(AppError::Config(format!("{} must be true or false", key))),
        },
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let language = lookup("OCR_LANGUAGE")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        let document_mode: DocumentMode = parse_var(&lookup, "OCR_DOCUMENT_MODE", "'typed' or 'hand'")?
            .unwrap_or_default();

        // Start from the document preset, then apply overrides
        let mut ocr = match document_mode {
            DocumentMode::Typed => OcrConfig::typed_preset(&language),
            DocumentMode::Handwritten => OcrConfig::handwritten_preset(&language),
        };

        if let Some(enhance) = parse_flag(&lookup, "OCR_ENHANCE")? {
            ocr.enhance = enhance;
        }
        if let Some(strip_mode) = parse_flag(&lookup, "OCR_STRIP_MODE")? {
            ocr.recognition.strip_mode = strip_mode;
        }
        if let Some(count) = parse_var(&lookup, "OCR_STRIP_COUNT", "a positive integer")? {
            ocr.recognition.strip_count = count;
        }
        if let Some(overlap) = parse_var(&lookup, "OCR_STRIP_OVERLAP", "a number in [0, 1)")? {
            ocr.recognition.overlap_fraction = overlap;
        }
        if let Some(code) = parse_var::<u8>(&lookup, "OCR_PSM", "an integer between 0 and 13")? {
            ocr.recognition.page_seg_mode = PageSegMode::from_code(code).ok_or_else(|| {
                AppError::Config("OCR_PSM must be an integer between 0 and 13".to_string())
            })?;
        }

        if let Some(binarize) = parse_var(&lookup, "OCR_BINARIZE", "'none', 'otsu' or 'sauvola'")? {
            ocr.preprocess.binarize = binarize;
        }
        if let Some(channel) = parse_var(&lookup, "OCR_CHANNEL", "'auto', 'r', 'g' or 'b'")? {
            ocr.preprocess.channel = channel;
        }
        if let Some(invert) = parse_flag(&lookup, "OCR_INVERT")? {
            ocr.preprocess.invert = invert;
        }
        if let Some(skew) = parse_var(&lookup, "OCR_SKEW_DEGREES", "a number")? {
            ocr.preprocess.skew_degrees = skew;
        }
        if let Some(top) = parse_var(&lookup, "OCR_CROP_TOP", "a percentage")? {
            ocr.preprocess.crop.top = top;
        }
        if let Some(bottom) = parse_var(&lookup, "OCR_CROP_BOTTOM", "a percentage")? {
            ocr.preprocess.crop.bottom = bottom;
        }
        if let Some(left) = parse_var(&lookup, "OCR_CROP_LEFT", "a percentage")? {
            ocr.preprocess.crop.left = left;
        }
        if let Some(right) = parse_var(&lookup, "OCR_CROP_RIGHT", "a percentage")? {
            ocr.preprocess.crop.right = right;
        }

        if let Some(timeout) = parse_var(&lookup, "OCR_STRIP_TIMEOUT_SECS", "a valid number")? {
            ocr.recovery.operation_timeout_secs = timeout;
        }
        if let Some(max_size) = parse_var(&lookup, "OCR_MAX_FILE_SIZE", "a valid number")? {
            ocr.max_file_size = max_size;
        }
        ocr.tessdata_path = lookup("TESSDATA_PREFIX").filter(|path| !path.trim().is_empty());

        let mut logging = LoggingConfig::default();
        if let Some(level) = lookup("LOG_LEVEL").filter(|value| !value.trim().is_empty()) {
            logging.log_level = level.trim().to_string();
        }
        if let Some(format) = parse_var(&lookup, "LOG_FORMAT", "'json' or 'pretty'")? {
            logging.format = format;
        }
        if let Some(environment) = lookup("ENVIRONMENT").filter(|value| !value.trim().is_empty()) {
            logging.environment = environment.trim().to_string();
        }

        Ok(Self { ocr, logging })
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> AppResult<()> {
        self.ocr.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Get a summary of the current configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Configuration: document_mode={:?}, language={}, enhance={}, strip_mode={}, strips={}, overlap={}, binarize={}, timeout={}s, log_level={}",
            self.ocr.document_mode,
            self.ocr.recognition.language,
            self.ocr.enhance,
            self.ocr.recognition.strip_mode,
            self.ocr.recognition.strip_count,
            self.ocr.recognition.overlap_fraction,
            self.ocr.preprocess.binarize.as_str(),
            self.ocr.recovery.operation_timeout_secs,
            self.logging.log_level
        )
    }
}
