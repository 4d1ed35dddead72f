//! # QR Codes
//!
//! Encodes a string as a QR symbol and maps modules 1:1 onto dot blocks.
//! No resampling happens: each module becomes a `module_px × module_px`
//! square, so edges stay sharp.
//!
//! ## Encoding Policy
//!
//! - Byte mode, UTF-8 input
//! - Error correction [`QrErrorLevel::M`] (~15% recovery) unless overridden
//! - Smallest version (1-40) that holds the data
//! - Quiet zone of [`QUIET_ZONE`] modules on every side
//!
//! ## Layout
//!
//! ```text
//! ├─ pad ─┼─ quiet ─┼──── modules × module_px ────┼─ quiet ─┼─ pad ─┤
//!                      centered in the raster width
//! ```

use qrcode::bits::Bits;
use qrcode::{Color, EcLevel, QrCode, Version};

use super::raster::Bitmap;
use crate::error::{PeripageError, Result};

/// Quiet zone width in modules (ISO/IEC 18004 minimum).
pub const QUIET_ZONE: usize = 4;

/// QR error correction level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QrErrorLevel {
    /// ~7% recovery
    L,
    /// ~15% recovery
    #[default]
    M,
    /// ~25% recovery
    Q,
    /// ~30% recovery
    H,
}

impl From<QrErrorLevel> for EcLevel {
    fn from(level: QrErrorLevel) -> Self {
        match level {
            QrErrorLevel::L => EcLevel::L,
            QrErrorLevel::M => EcLevel::M,
            QrErrorLevel::Q => EcLevel::Q,
            QrErrorLevel::H => EcLevel::H,
        }
    }
}

/// Options for [`render_qr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QrOptions {
    pub error_level: QrErrorLevel,
    /// Dots per module. `None` picks the largest size that fits the width.
    pub module_px: Option<usize>,
}

/// Encode `data` in byte mode at the smallest version that fits.
fn encode_bytes(data: &[u8], level: EcLevel) -> Result<QrCode> {
    for version in 1..=40 {
        let mut bits = Bits::new(Version::Normal(version));
        if bits.push_byte_data(data).is_err() || bits.push_terminator(level).is_err() {
            continue;
        }
        return QrCode::with_bits(bits, level)
            .map_err(|e| PeripageError::Encoding(e.to_string()));
    }

    Err(PeripageError::Encoding(format!(
        "{} bytes exceed QR capacity at error level {:?}",
        data.len(),
        level
    )))
}

/// Render `text` as a QR bitmap exactly `width` dots wide.
///
/// ## Errors
///
/// [`PeripageError::Encoding`] if the content exceeds QR capacity, or if the
/// symbol plus quiet zone cannot fit `width` at the requested module size.
pub fn render_qr(text: &str, width: usize, options: QrOptions) -> Result<Bitmap> {
    let code = encode_bytes(text.as_bytes(), options.error_level.into())?;
    let modules = code.width();
    let span = modules + 2 * QUIET_ZONE;

    let module_px = match options.module_px {
        Some(px) => px,
        None => width / span,
    };
    if module_px == 0 || span * module_px > width {
        return Err(PeripageError::Encoding(format!(
            "{}-module symbol does not fit {} dots",
            modules, width
        )));
    }

    let colors = code.to_colors();
    let quiet_px = QUIET_ZONE * module_px;
    let left = (width - modules * module_px) / 2;
    let top = quiet_px;
    let height = span * module_px;

    Ok(Bitmap::from_fn(width, height, |x, y| {
        if x < left || y < top {
            return false;
        }
        let (mx, my) = ((x - left) / module_px, (y - top) / module_px);
        mx < modules && my < modules && colors[my * modules + mx] == Color::Dark
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fills_raster_width() {
        let bitmap = render_qr("hello", 384, QrOptions::default()).unwrap();
        assert_eq!(bitmap.width(), 384);
        // "hello" fits version 1 (21 modules): 29 modules with quiet zone → 13px each
        assert_eq!(bitmap.height(), 29 * 13);
        assert!(bitmap.black_count() > 0);
    }

    #[test]
    fn test_quiet_zone_is_blank() {
        let bitmap = render_qr("hello", 384, QrOptions::default()).unwrap();
        let quiet = QUIET_ZONE * 13;
        for x in 0..bitmap.width() {
            for y in 0..quiet {
                assert!(!bitmap.get(x, y));
                assert!(!bitmap.get(x, bitmap.height() - 1 - y));
            }
        }
        let left = (384 - 21 * 13) / 2;
        for y in 0..bitmap.height() {
            for x in 0..left {
                assert!(!bitmap.get(x, y));
            }
        }
    }

    #[test]
    fn test_explicit_module_size() {
        let options = QrOptions {
            module_px: Some(4),
            ..Default::default()
        };
        let bitmap = render_qr("hello", 384, options).unwrap();
        assert_eq!(bitmap.width(), 384);
        assert_eq!(bitmap.height(), 29 * 4);
    }

    #[test]
    fn test_module_size_too_large() {
        let options = QrOptions {
            module_px: Some(20),
            ..Default::default()
        };
        assert!(matches!(
            render_qr("hello", 384, options),
            Err(PeripageError::Encoding(_))
        ));
    }

    #[test]
    fn test_capacity_exceeded() {
        // Version 40-H holds 1273 bytes
        let text = "x".repeat(1300);
        let options = QrOptions {
            error_level: QrErrorLevel::H,
            module_px: Some(1),
        };
        assert!(matches!(
            render_qr(&text, 2480, options),
            Err(PeripageError::Encoding(_))
        ));
    }

    #[test]
    fn test_utf8_content() {
        let bitmap = render_qr("Grüße ✓", 576, QrOptions::default()).unwrap();
        assert_eq!(bitmap.width(), 576);
    }
}
