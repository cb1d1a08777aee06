//! # Shared Types for Image Preprocessing
//!
//! This module contains the buffers, configuration values and error type used
//! across the preprocessing sub-modules. Every stage takes its input by
//! reference and returns a freshly allocated buffer.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Decoded page photograph, RGBA8. Stages never mutate it in place.
pub type RawImage = RgbaImage;

/// Intermediate RGBA raster passed between the geometric stages.
pub type RasterBuffer = RgbaImage;

/// Errors that can occur during image preprocessing operations.
#[derive(Debug, Clone, PartialEq)]
pub enum PreprocessingError {
    /// Crop percentages leave no pixels on one axis
    DegenerateRegion {
        axis: Axis,
        dimension: u32,
        start_px: u32,
        end_px: u32,
    },
    /// Opposite crop percentages add up to the whole axis
    DegenerateCrop {
        axis: Axis,
        start_percent: f32,
        end_percent: f32,
    },
    /// Crop percentages outside `[0, 100)` or not finite
    InvalidCrop { message: String },
    /// Grayscale buffer length does not match `width * height`
    BufferMismatch { expected: usize, actual: usize },
    /// Image processing operation failed
    ProcessingFailed { message: String },
}

impl std::fmt::Display for PreprocessingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreprocessingError::DegenerateRegion {
                axis,
                dimension,
                start_px,
                end_px,
            } => write!(
                f,
                "Crop leaves an empty {} axis: {}px image, {}px removed from the start and {}px from the end",
                axis, dimension, start_px, end_px
            ),
            PreprocessingError::DegenerateCrop {
                axis,
                start_percent,
                end_percent,
            } => write!(
                f,
                "Crop removes {}% from the start and {}% from the end of the {} axis, leaving nothing",
                start_percent, end_percent, axis
            ),
            PreprocessingError::InvalidCrop { message } => {
                write!(f, "Invalid crop specification: {}", message)
            }
            PreprocessingError::BufferMismatch { expected, actual } => write!(
                f,
                "Grayscale buffer has {} samples, expected {}",
                actual, expected
            ),
            PreprocessingError::ProcessingFailed { message } => {
                write!(f, "Image processing failed: {}", message)
            }
        }
    }
}

impl std::error::Error for PreprocessingError {}

/// Image axis, used to report which dimension a crop eliminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Horizontal => write!(f, "horizontal"),
            Axis::Vertical => write!(f, "vertical"),
        }
    }
}

/// Percentage of the image removed from each edge.
///
/// Each side lies in `[0, 100)` and opposite sides must sum to less than 100.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CropSpec {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl CropSpec {
    /// A crop that keeps the whole image.
    pub const NONE: CropSpec = CropSpec {
        top: 0.0,
        bottom: 0.0,
        left: 0.0,
        right: 0.0,
    };

    pub fn new(top: f32, bottom: f32, left: f32, right: f32) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    /// Checks that every side is finite and within `[0, 100)`.
    pub fn validate_ranges(&self) -> Result<(), PreprocessingError> {
        for (name, value) in [
            ("top", self.top),
            ("bottom", self.bottom),
            ("left", self.left),
            ("right", self.right),
        ] {
            if !value.is_finite() || !(0.0..100.0).contains(&value) {
                return Err(PreprocessingError::InvalidCrop {
                    message: format!("{} must be within [0, 100), got {}", name, value),
                });
            }
        }
        Ok(())
    }

    /// Checks the range and opposite-side invariants.
    ///
    /// # Errors
    ///
    /// `InvalidCrop` for a side outside `[0, 100)`, `DegenerateCrop` when
    /// opposite sides consume the whole axis.
    pub fn validate(&self) -> Result<(), PreprocessingError> {
        self.validate_ranges()?;

        if self.top + self.bottom >= 100.0 {
            return Err(PreprocessingError::DegenerateCrop {
                axis: Axis::Vertical,
                start_percent: self.top,
                end_percent: self.bottom,
            });
        }
        if self.left + self.right >= 100.0 {
            return Err(PreprocessingError::DegenerateCrop {
                axis: Axis::Horizontal,
                start_percent: self.left,
                end_percent: self.right,
            });
        }

        Ok(())
    }

    /// Same horizontal crop, new vertical band.
    pub fn with_vertical_band(&self, top: f32, bottom: f32) -> Self {
        Self {
            top,
            bottom,
            ..*self
        }
    }
}

/// Which colour information becomes the gray level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelMode {
    /// ITU-R BT.601 luma
    #[default]
    Auto,
    Red,
    Green,
    Blue,
}

impl FromStr for ChannelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(ChannelMode::Auto),
            "r" | "red" => Ok(ChannelMode::Red),
            "g" | "green" => Ok(ChannelMode::Green),
            "b" | "blue" => Ok(ChannelMode::Blue),
            other => Err(format!("unknown channel mode '{}'", other)),
        }
    }
}

/// Binarization algorithm applied to the grayscale buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinarizeMode {
    /// Grayscale is passed through
    None,
    /// Global histogram threshold
    Otsu,
    /// Local adaptive threshold
    #[default]
    Sauvola,
}

impl BinarizeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinarizeMode::None => "none",
            BinarizeMode::Otsu => "otsu",
            BinarizeMode::Sauvola => "sauvola",
        }
    }
}

impl FromStr for BinarizeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(BinarizeMode::None),
            "otsu" => Ok(BinarizeMode::Otsu),
            "sauvola" => Ok(BinarizeMode::Sauvola),
            other => Err(format!("unknown binarization mode '{}'", other)),
        }
    }
}

/// Tunable constants of the Sauvola threshold `T = m * (1 + k * (s / R - 1))`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SauvolaParams {
    /// Half-width of the square window (12 gives 25x25)
    pub window_radius: u32,
    /// Sensitivity to local contrast
    pub k: f64,
    /// Dynamic range of the standard deviation
    pub dynamic_range: f64,
}

impl SauvolaParams {
    /// Variant tuned for faded, low-contrast ink.
    pub const HIGH_CONTRAST: SauvolaParams = SauvolaParams {
        window_radius: 12,
        k: 0.34,
        dynamic_range: 128.0,
    };

    pub fn validate(&self) -> Result<(), PreprocessingError> {
        if !(self.k.is_finite() && self.k > 0.0) {
            return Err(PreprocessingError::ProcessingFailed {
                message: format!("Sauvola k must be positive, got {}", self.k),
            });
        }
        if !(self.dynamic_range.is_finite() && self.dynamic_range > 0.0) {
            return Err(PreprocessingError::ProcessingFailed {
                message: format!(
                    "Sauvola dynamic range must be positive, got {}",
                    self.dynamic_range
                ),
            });
        }
        Ok(())
    }
}

impl Default for SauvolaParams {
    fn default() -> Self {
        Self {
            window_radius: 12,
            k: 0.2,
            dynamic_range: 128.0,
        }
    }
}

/// Every tunable of one preprocessing run. Built once per request.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PreprocessConfig {
    pub crop: CropSpec,
    pub channel: ChannelMode,
    pub binarize: BinarizeMode,
    pub invert: bool,
    /// Rotation applied after cropping, in degrees (clockwise positive)
    pub skew_degrees: f32,
    #[serde(default)]
    pub sauvola: SauvolaParams,
}

impl PreprocessConfig {
    /// Checks crop and Sauvola invariants before any pixel work.
    pub fn validate(&self) -> Result<(), PreprocessingError> {
        self.crop.validate()?;
        if !self.skew_degrees.is_finite() {
            return Err(PreprocessingError::ProcessingFailed {
                message: format!("skew must be finite, got {}", self.skew_degrees),
            });
        }
        self.sauvola.validate()
    }

    /// Same configuration with a different crop.
    pub fn with_crop(&self, crop: CropSpec) -> Self {
        Self { crop, ..*self }
    }
}

/// One byte of gray level per pixel, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct GrayscaleBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl GrayscaleBuffer {
    /// Wraps raw samples, rejecting a length that disagrees with the shape.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, PreprocessingError> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(PreprocessingError::BufferMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Wraps samples whose length is already known to match, e.g. one per
    /// pixel of an existing raster.
    pub(super) fn from_samples(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Gray level at `(x, y)`.
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// 256-bin histogram of gray levels.
    pub fn histogram(&self) -> [u32; 256] {
        let mut histogram = [0u32; 256];
        for &value in &self.data {
            histogram[value as usize] += 1;
        }
        histogram
    }
}

/// Output of the preprocessing pipeline, ready for the recognizer.
///
/// R, G and B are equal in every pixel and alpha is opaque. After Otsu or
/// Sauvola each channel is either 0 or 255.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    /// The processed raster
    pub image: RgbaImage,
    /// Binarization applied
    pub binarize: BinarizeMode,
    /// Global threshold chosen by Otsu, if it ran
    pub threshold: Option<u8>,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

impl ProcessedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// True if every channel of every pixel is 0 or 255.
    pub fn is_bilevel(&self) -> bool {
        self.image
            .pixels()
            .all(|p| p.0[..3].iter().all(|&c| c == 0 || c == 255))
    }
}
