//! # Channel Extraction Module
//!
//! Reduces an RGBA raster to one gray byte per pixel.

use super::types::{ChannelMode, GrayscaleBuffer, RasterBuffer};

const LUMA_RED: f32 = 0.299;
const LUMA_GREEN: f32 = 0.587;
const LUMA_BLUE: f32 = 0.114;

/// Extracts a gray level per pixel according to `mode`.
///
/// `Auto` uses BT.601 luma weights rounded to the nearest integer; the
/// single-channel modes copy that channel unchanged. Alpha is ignored.
pub fn extract_grayscale(image: &RasterBuffer, mode: ChannelMode) -> GrayscaleBuffer {
    let data: Vec<u8> = image
        .pixels()
        .map(|pixel| {
            let [r, g, b, _] = pixel.0;
            match mode {
                ChannelMode::Auto => luma(r, g, b),
                ChannelMode::Red => r,
                ChannelMode::Green => g,
                ChannelMode::Blue => b,
            }
        })
        .collect();

    GrayscaleBuffer::from_samples(image.width(), image.height(), data)
}

/// BT.601 luma of an RGB triple.
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let value = LUMA_RED * f32::from(r) + LUMA_GREEN * f32::from(g) + LUMA_BLUE * f32::from(b);
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn sample_image() -> RgbaImage {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([10, 20, 30, 255]));
        img.put_pixel(1, 0, Rgba([255, 128, 0, 0]));
        img
    }

    #[test]
    fn test_single_channel_passthrough() {
        let img = sample_image();
        assert_eq!(extract_grayscale(&img, ChannelMode::Red).data(), &[10, 255]);
        assert_eq!(extract_grayscale(&img, ChannelMode::Green).data(), &[20, 128]);
        assert_eq!(extract_grayscale(&img, ChannelMode::Blue).data(), &[30, 0]);
    }

    #[test]
    fn test_auto_uses_luma_weights() {
        let img = sample_image();
        let gray = extract_grayscale(&img, ChannelMode::Auto);
        // 0.299*10 + 0.587*20 + 0.114*30 = 18.15
        // 0.299*255 + 0.587*128 = 151.381
        assert_eq!(gray.data(), &[18, 151]);
        assert_eq!((gray.width(), gray.height()), (2, 1));
    }

    #[test]
    fn test_luma_extremes() {
        assert_eq!(luma(0, 0, 0), 0);
        assert_eq!(luma(255, 255, 255), 255);
        assert_eq!(luma(90, 90, 90), 90);
    }
}
