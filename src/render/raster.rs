//! # Raster Encoder
//!
//! Converts arbitrary images into the printer's fixed-width monochrome
//! raster and splits the result into packet-sized chunks.
//!
//! ## Pipeline
//!
//! ```text
//! DynamicImage ─► flatten alpha on white ─► luma8
//!              ─► resize to raster width (aspect preserved)
//!              ─► threshold / ordered dither
//!              ─► Bitmap (packed rows, MSB = left, 1 = black)
//!              ─► chunks of ≤ max_chunk_rows whole rows
//! ```

use image::{DynamicImage, GrayImage, Luma};

use super::dither::{DitherMode, pack_row};
use super::resample::{self, ResamplePolicy};
use crate::error::{PeripageError, Result};

/// A 1-bit-per-dot image, row-major, rows packed MSB-first.
///
/// Bits past `width` in the last byte of a row are always zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: usize,
    height: usize,
    row_bytes: usize,
    data: Vec<u8>,
}

impl Bitmap {
    /// An all-white bitmap.
    pub fn new(width: usize, height: usize) -> Self {
        let row_bytes = width.div_ceil(8);
        Self {
            width,
            height,
            row_bytes,
            data: vec![0u8; row_bytes * height],
        }
    }

    /// Build a bitmap from a per-dot predicate (`true` = black).
    pub fn from_fn<F>(width: usize, height: usize, mut is_black: F) -> Self
    where
        F: FnMut(usize, usize) -> bool,
    {
        let mut data = Vec::with_capacity(width.div_ceil(8) * height);
        let mut row = Vec::with_capacity(width);
        for y in 0..height {
            row.clear();
            row.extend((0..width).map(|x| is_black(x, y)));
            data.extend(pack_row(&row));
        }
        Self {
            width,
            height,
            row_bytes: width.div_ceil(8),
            data,
        }
    }

    /// Wrap already-packed rows `width` dots wide.
    ///
    /// Padding bits past `width` in each row are cleared.
    ///
    /// ## Errors
    ///
    /// [`PeripageError::InvalidImage`] if `data` is empty or not a whole
    /// number of rows.
    pub fn from_packed(width: usize, mut data: Vec<u8>) -> Result<Self> {
        let row_bytes = width.div_ceil(8);
        if row_bytes == 0 || data.is_empty() || data.len() % row_bytes != 0 {
            return Err(PeripageError::InvalidImage(format!(
                "{} bytes is not a whole number of {}-byte rows",
                data.len(),
                row_bytes
            )));
        }
        let spare = row_bytes * 8 - width;
        if spare > 0 {
            let mask = 0xFFu8 << spare;
            for row in data.chunks_mut(row_bytes) {
                row[row_bytes - 1] &= mask;
            }
        }
        Ok(Self {
            width,
            height: data.len() / row_bytes,
            row_bytes,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Bytes per packed row.
    pub fn row_bytes(&self) -> usize {
        self.row_bytes
    }

    /// `true` if the dot at (x, y) is black. Out-of-range reads are white.
    pub fn get(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.data[y * self.row_bytes + x / 8] & (0x80 >> (x % 8)) != 0
    }

    /// Set the dot at (x, y). Out-of-range writes are ignored.
    pub fn set(&mut self, x: usize, y: usize, black: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = y * self.row_bytes + x / 8;
        let mask = 0x80 >> (x % 8);
        if black {
            self.data[idx] |= mask;
        } else {
            self.data[idx] &= !mask;
        }
    }

    /// Packed bytes of row `y`.
    pub fn row(&self, y: usize) -> &[u8] {
        &self.data[y * self.row_bytes..(y + 1) * self.row_bytes]
    }

    /// All packed rows, top to bottom.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Count of black dots.
    pub fn black_count(&self) -> usize {
        self.data.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Split into chunks of at most `max_rows` whole rows, top to bottom.
    ///
    /// `max_rows` of zero is treated as one.
    pub fn chunks(&self, max_rows: usize) -> impl Iterator<Item = RasterChunk<'_>> {
        let row_bytes = self.row_bytes;
        let chunk_bytes = row_bytes.max(1) * max_rows.max(1);
        self.data.chunks(chunk_bytes).map(move |data| RasterChunk {
            rows: data.len() / row_bytes.max(1),
            data,
        })
    }
}

/// A contiguous run of whole raster rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterChunk<'a> {
    pub rows: usize,
    pub data: &'a [u8],
}

/// Flatten an image onto a white background and convert to 8-bit luma.
///
/// Thermal paper is white, so fully transparent pixels must not print.
pub fn flatten_to_gray(image: &DynamicImage) -> GrayImage {
    let luma_alpha = image.to_luma_alpha8();
    GrayImage::from_fn(luma_alpha.width(), luma_alpha.height(), |x, y| {
        let [l, a] = luma_alpha.get_pixel(x, y).0;
        let alpha = a as u32;
        let blended = (l as u32 * alpha + 255 * (255 - alpha) + 127) / 255;
        Luma([blended as u8])
    })
}

/// Convert an image to a `width`-dot bitmap.
///
/// The height follows the source aspect ratio (at least one row).
///
/// ## Errors
///
/// [`PeripageError::InvalidImage`] when the source or target has zero width
/// or height.
pub fn encode_image(
    image: &DynamicImage,
    width: usize,
    resample: ResamplePolicy,
    dither: DitherMode,
) -> Result<Bitmap> {
    encode_gray(&flatten_to_gray(image), width, resample, dither)
}

/// [`encode_image`] for an already-flattened grayscale image.
pub fn encode_gray(
    gray: &GrayImage,
    width: usize,
    resample: ResamplePolicy,
    dither: DitherMode,
) -> Result<Bitmap> {
    let (src_w, src_h) = gray.dimensions();
    if src_w == 0 || src_h == 0 {
        return Err(PeripageError::InvalidImage(format!(
            "Source image is {}×{}",
            src_w, src_h
        )));
    }
    if width == 0 {
        return Err(PeripageError::InvalidImage(
            "Target raster width is zero".to_string(),
        ));
    }

    let aspect = src_h as f64 / src_w as f64;
    let height = ((width as f64 * aspect).round() as u32).max(1);
    let resized = resample::resize(gray, width as u32, height, resample);

    Ok(Bitmap::from_fn(width, height as usize, |x, y| {
        dither.is_black(x, y, resized.get_pixel(x as u32, y as u32)[0])
    }))
}

// ============================================================================
// TESTS
// ============================================================================
