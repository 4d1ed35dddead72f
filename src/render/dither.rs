//! # Monochrome Conversion
//!
//! Turns 8-bit grayscale into print/no-print decisions.
//!
//! ## Modes
//!
//! | Mode | Rule | Use |
//! |------|------|-----|
//! | [`DitherMode::Threshold`] | black when luma < 128 | Text, QR, line art (default) |
//! | [`DitherMode::Bayer`] | 8x8 ordered matrix | Photos |
//!
//! Both modes are deterministic: the same input always produces the same
//! dots, so raster output can be compared byte for byte in tests.
//!
//! ## The Bayer Matrix
//!
//! Values range from 0-63 and are normalized to (0, 1) with
//! `threshold = (value + 0.5) / 64.0`. Ink intensity (0.0 = white,
//! 1.0 = black) above the threshold prints a dot.

/// Luma values strictly below this print black in threshold mode.
pub const MID_GRAY: u8 = 128;

/// Bayer 8x8 dithering matrix
pub const BAYER8: [[u8; 8]; 8] = [
    [0, 32, 8, 40, 2, 34, 10, 42],
    [48, 16, 56, 24, 50, 18, 58, 26],
    [12, 44, 4, 36, 14, 46, 6, 38],
    [60, 28, 52, 20, 62, 30, 54, 22],
    [3, 35, 11, 43, 1, 33, 9, 41],
    [51, 19, 59, 27, 49, 17, 57, 25],
    [15, 47, 7, 39, 13, 45, 5, 37],
    [63, 31, 55, 23, 61, 29, 53, 21],
];

/// How grayscale is reduced to one bit per dot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DitherMode {
    /// Fixed threshold at mid-gray
    #[default]
    Threshold,
    /// Bayer 8x8 ordered dithering
    Bayer,
}

impl DitherMode {
    /// Decide whether the dot at (x, y) with the given luma prints.
    #[inline]
    pub fn is_black(self, x: usize, y: usize, luma: u8) -> bool {
        match self {
            DitherMode::Threshold => luma < MID_GRAY,
            DitherMode::Bayer => should_print(x, y, 1.0 - luma as f32 / 255.0),
        }
    }
}

/// Bayer threshold for a pixel position, in (0, 1).
#[inline]
pub fn threshold(x: usize, y: usize) -> f32 {
    let matrix_value = BAYER8[y & 7][x & 7];
    (matrix_value as f32 + 0.5) / 64.0
}

/// `true` if a dot of ink `intensity` (0.0 = white, 1.0 = black) prints at
/// (x, y) under ordered dithering.
#[inline]
pub fn should_print(x: usize, y: usize, intensity: f32) -> bool {
    intensity > threshold(x, y)
}

/// Pack a row of pixels into bytes, MSB = leftmost dot, 1 = black.
///
/// A trailing partial byte is padded with white.
///
/// ```
/// use peripage::render::dither::pack_row;
///
/// let row = vec![true, true, false, false, true, false, true, false];
/// assert_eq!(pack_row(&row), vec![0b11001010]);
/// assert_eq!(pack_row(&[true; 12]), vec![0xFF, 0xF0]);
/// ```
pub fn pack_row(pixels: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; pixels.len().div_ceil(8)];

    for (i, &pixel) in pixels.iter().enumerate() {
        if pixel {
            bytes[i / 8] |= 0x80 >> (i % 8);
        }
    }

    bytes
}

// ============================================================================
// TESTS
// ============================================================================
