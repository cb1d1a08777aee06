//! # Image Preprocessing Module
//!
//! This module prepares a page photograph for text recognition: percentage
//! cropping, deskew rotation, channel selection, binarization and inversion.
//!
//! The module is organized into focused sub-modules:
//! - `cropping`: Percentage-based crop with degenerate-region detection
//! - `deskewing`: Fixed-canvas rotation about the image centre
//! - `channel`: Luma or single-channel grayscale extraction
//! - `integral`: Summed-area tables for constant-time window statistics
//! - `thresholding`: Otsu and Sauvola binarization, tone inversion
//! - `pipeline`: Composition of all stages into `preprocess`
//! - `types`: Shared types and error definitions

pub mod channel;
pub mod cropping;
pub mod deskewing;
pub mod integral;
pub mod pipeline;
pub mod thresholding;
pub mod types;

// Re-export commonly used types and functions for convenience
pub use types::{
    Axis, BinarizeMode, ChannelMode, CropSpec, GrayscaleBuffer, PreprocessConfig,
    PreprocessingError, ProcessedImage, RasterBuffer, RawImage, SauvolaParams,
};

pub use channel::extract_grayscale;
pub use cropping::{calculate_crop_region, crop_image, CropRegion};
pub use deskewing::{rotate_in_place, SKEW_EPSILON_DEGREES};
pub use integral::{IntegralImage, WindowStats};
pub use pipeline::preprocess;
pub use thresholding::{
    binarize, invert_value, otsu_threshold, sauvola_threshold, ThresholdedImageResult,
};
