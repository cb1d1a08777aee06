//! Summed-area tables over a grayscale buffer.
//!
//! Both tables are `(width + 1) x (height + 1)` with a zero first row and
//! column, so `table[(y + 1) * stride + (x + 1)]` holds the sum over the
//! rectangle `[0, x] x [0, y]`.

use super::types::GrayscaleBuffer;

/// Prefix sums of gray levels and of their squares.
///
/// Scratch data for a single binarization call.
#[derive(Debug, Clone)]
pub struct IntegralImage {
    width: u32,
    height: u32,
    sum: Vec<u64>,
    sum_of_squares: Vec<u64>,
}

/// Mean and standard deviation of one window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub mean: f64,
    pub std_dev: f64,
    pub pixel_count: u64,
}

impl IntegralImage {
    pub fn new(gray: &GrayscaleBuffer) -> Self {
        let (width, height) = (gray.width(), gray.height());
        let stride = width as usize + 1;
        let mut sum = vec![0u64; stride * (height as usize + 1)];
        let mut sum_of_squares = vec![0u64; stride * (height as usize + 1)];

        for y in 0..height as usize {
            let mut row_sum = 0u64;
            let mut row_sum_sq = 0u64;
            for x in 0..width as usize {
                let value = u64::from(gray.data()[y * width as usize + x]);
                row_sum += value;
                row_sum_sq += value * value;

                let idx = (y + 1) * stride + (x + 1);
                let above = y * stride + (x + 1);
                sum[idx] = row_sum + sum[above];
                sum_of_squares[idx] = row_sum_sq + sum_of_squares[above];
            }
        }

        Self {
            width,
            height,
            sum,
            sum_of_squares,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sums over the half-open rectangle `[x0, x1) x [y0, y1)`.
    pub fn region_sums(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> (u64, u64) {
        let stride = self.width as usize + 1;
        let (x0, y0, x1, y1) = (x0 as usize, y0 as usize, x1 as usize, y1 as usize);

        let lookup = |table: &[u64]| {
            table[y1 * stride + x1] + table[y0 * stride + x0]
                - table[y0 * stride + x1]
                - table[y1 * stride + x0]
        };

        (lookup(&self.sum), lookup(&self.sum_of_squares))
    }

    /// Statistics of the square window of half-width `radius` centred on
    /// `(cx, cy)`, clamped to the image so border windows shrink instead of
    /// reading padding.
    pub fn window_stats(&self, cx: u32, cy: u32, radius: u32) -> WindowStats {
        let x0 = cx.saturating_sub(radius);
        let y0 = cy.saturating_sub(radius);
        let x1 = cx.saturating_add(radius).saturating_add(1).min(self.width);
        let y1 = cy.saturating_add(radius).saturating_add(1).min(self.height);

        let pixel_count = u64::from(x1 - x0) * u64::from(y1 - y0);
        let (sum, sum_sq) = self.region_sums(x0, y0, x1, y1);

        let n = pixel_count as f64;
        let mean = sum as f64 / n;
        let variance = (sum_sq as f64 / n - mean * mean).max(0.0);

        WindowStats {
            mean,
            std_dev: variance.sqrt(),
            pixel_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(width: u32, height: u32, data: Vec<u8>) -> GrayscaleBuffer {
        GrayscaleBuffer::new(width, height, data).unwrap()
    }

    #[test]
    fn test_region_sums_match_brute_force() {
        let data: Vec<u8> = (0..35u32).map(|i| ((i * 37) % 256) as u8).collect();
        let buffer = gray(7, 5, data.clone());
        let integral = IntegralImage::new(&buffer);

        for (x0, y0, x1, y1) in [(0, 0, 7, 5), (1, 1, 4, 3), (6, 4, 7, 5), (2, 0, 2, 5)] {
            let mut expected_sum = 0u64;
            let mut expected_sq = 0u64;
            for y in y0..y1 {
                for x in x0..x1 {
                    let v = u64::from(data[(y * 7 + x) as usize]);
                    expected_sum += v;
                    expected_sq += v * v;
                }
            }
            assert_eq!(
                integral.region_sums(x0, y0, x1, y1),
                (expected_sum, expected_sq)
            );
        }
    }

    #[test]
    fn test_window_is_clamped_at_borders() {
        let buffer = gray(10, 10, vec![100; 100]);
        let integral = IntegralImage::new(&buffer);

        let corner = integral.window_stats(0, 0, 3);
        assert_eq!(corner.pixel_count, 16);
        assert_eq!(corner.mean, 100.0);
        assert_eq!(corner.std_dev, 0.0);

        let centre = integral.window_stats(5, 5, 3);
        assert_eq!(centre.pixel_count, 49);
    }

    #[test]
    fn test_window_std_dev() {
        // two values 0 and 200: mean 100, std 100
        let buffer = gray(2, 1, vec![0, 200]);
        let integral = IntegralImage::new(&buffer);
        let stats = integral.window_stats(0, 0, 1);
        assert_eq!(stats.pixel_count, 2);
        assert!((stats.mean - 100.0).abs() < 1e-9);
        assert!((stats.std_dev - 100.0).abs() < 1e-9);
    }
}
