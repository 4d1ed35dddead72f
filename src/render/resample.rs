//! # Resampling
//!
//! Scales grayscale images to the printer's raster width.
//!
//! The default [`ResamplePolicy::Box`] averages every source pixel that
//! falls under a target pixel, weighted by overlap. Averaging before the
//! 1-bit conversion keeps thin features from aliasing away on downscale, and
//! on upscale it degenerates to pixel replication, so a single black source
//! pixel becomes a solid black block.
//!
//! The remaining policies delegate to [`image::imageops::resize`].

use image::GrayImage;
use image::imageops::{self, FilterType};

/// Resampling filter applied when fitting an image to the raster width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResamplePolicy {
    Nearest,
    /// Area-weighted average
    #[default]
    Box,
    Triangle,
    CatmullRom,
    Lanczos3,
}

impl ResamplePolicy {
    fn filter_type(self) -> Option<FilterType> {
        match self {
            ResamplePolicy::Nearest => Some(FilterType::Nearest),
            ResamplePolicy::Box => None,
            ResamplePolicy::Triangle => Some(FilterType::Triangle),
            ResamplePolicy::CatmullRom => Some(FilterType::CatmullRom),
            ResamplePolicy::Lanczos3 => Some(FilterType::Lanczos3),
        }
    }
}

/// Resize `src` to exactly `width` × `height`.
///
/// Returns a copy when the size already matches.
pub fn resize(src: &GrayImage, width: u32, height: u32, policy: ResamplePolicy) -> GrayImage {
    if src.dimensions() == (width, height) {
        return src.clone();
    }

    match policy.filter_type() {
        Some(filter) => imageops::resize(src, width, height, filter),
        None => box_resize(src, width, height),
    }
}

/// Separable area-weighted resize.
fn box_resize(src: &GrayImage, width: u32, height: u32) -> GrayImage {
    let (src_w, src_h) = src.dimensions();
    let x_weights = box_weights(src_w, width);
    let y_weights = box_weights(src_h, height);

    // Horizontal pass into an f32 buffer (src_h rows × width columns)
    let mut horizontal = vec![0.0f32; src_h as usize * width as usize];
    for y in 0..src_h {
        for (x, taps) in x_weights.iter().enumerate() {
            let value: f32 = taps
                .iter()
                .map(|&(sx, w)| src.get_pixel(sx, y)[0] as f32 * w)
                .sum();
            horizontal[y as usize * width as usize + x] = value;
        }
    }

    // Vertical pass
    let mut out = GrayImage::new(width, height);
    for (y, taps) in y_weights.iter().enumerate() {
        for x in 0..width as usize {
            let value: f32 = taps
                .iter()
                .map(|&(sy, w)| horizontal[sy as usize * width as usize + x] * w)
                .sum();
            out.put_pixel(x as u32, y as u32, image::Luma([value.round().clamp(0.0, 255.0) as u8]));
        }
    }

    out
}

/// For each destination index, the contributing source indices and their
/// normalized overlap weights.
fn box_weights(src_len: u32, dst_len: u32) -> Vec<Vec<(u32, f32)>> {
    let scale = src_len as f64 / dst_len as f64;

    (0..dst_len)
        .map(|i| {
            let start = i as f64 * scale;
            let end = (start + scale).min(src_len as f64);
            let first = (start.floor() as u32).min(src_len - 1);
            let last = (end.ceil() as u32).clamp(first + 1, src_len);

            let mut taps: Vec<(u32, f32)> = (first..last)
                .map(|j| {
                    let overlap = end.min(j as f64 + 1.0) - start.max(j as f64);
                    (j, overlap.max(0.0) as f32)
                })
                .filter(|&(_, w)| w > 0.0)
                .collect();

            let total: f32 = taps.iter().map(|&(_, w)| w).sum();
            if total > 0.0 {
                for tap in &mut taps {
                    tap.1 /= total;
                }
            } else {
                taps = vec![(first, 1.0)];
            }
            taps
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_box_upscale_replicates() {
        let src = GrayImage::from_pixel(1, 1, Luma([0]));
        let out = resize(&src, 384, 384, ResamplePolicy::Box);
        assert_eq!(out.dimensions(), (384, 384));
        assert!(out.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_box_downscale_averages() {
        // Alternating black/white columns average to mid gray
        let src = GrayImage::from_fn(8, 2, |x, _| Luma([if x % 2 == 0 { 0 } else { 255 }]));
        let out = resize(&src, 4, 1, ResamplePolicy::Box);
        for pixel in out.pixels() {
            assert!((127..=128).contains(&pixel[0]), "got {}", pixel[0]);
        }
    }

    #[test]
    fn test_box_weights_sum_to_one() {
        for (src, dst) in [(3, 7), (7, 3), (1, 384), (1000, 384), (384, 384)] {
            for taps in box_weights(src, dst) {
                let total: f32 = taps.iter().map(|&(_, w)| w).sum();
                assert!((total - 1.0).abs() < 1e-4, "{}→{}: {}", src, dst, total);
                assert!(taps.iter().all(|&(j, _)| j < src));
            }
        }
    }

    #[test]
    fn test_same_size_is_identity() {
        let src = GrayImage::from_fn(5, 3, |x, y| Luma([(x * 40 + y) as u8]));
        for policy in [ResamplePolicy::Box, ResamplePolicy::Lanczos3] {
            assert_eq!(resize(&src, 5, 3, policy), src);
        }
    }

    #[test]
    fn test_library_filters_produce_target_size() {
        let src = GrayImage::from_pixel(100, 50, Luma([200]));
        for policy in [
            ResamplePolicy::Nearest,
            ResamplePolicy::Triangle,
            ResamplePolicy::CatmullRom,
            ResamplePolicy::Lanczos3,
        ] {
            assert_eq!(resize(&src, 384, 192, policy).dimensions(), (384, 192));
        }
    }
}
