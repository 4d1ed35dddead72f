//! # Printer Models
//!
//! Hardware specifications for the supported PeriPage printers.
//!
//! ## Supported Printers
//!
//! | Model | Width (dots) | Row bytes | Resolution | Rows per packet |
//! |-------|--------------|-----------|------------|-----------------|
//! | A6    | 384          | 48        | 203 DPI    | 255             |
//! | A6p   | 576          | 72        | 203 DPI    | 170             |
//! | A40   | 1728         | 216       | 203 DPI    | 56              |
//! | A40p  | 2480         | 310       | 300 DPI    | 39              |
//!
//! ## Usage
//!
//! ```
//! use peripage::PrinterType;
//!
//! let model: PrinterType = "A6".parse()?;
//! let spec = model.spec();
//! assert_eq!(spec.width_dots, 384);
//! assert_eq!(spec.row_bytes, 48);
//! # Ok::<(), peripage::PeripageError>(())
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::PeripageError;

/// Upper bound on a single frame payload, in bytes.
///
/// The printers buffer roughly 12 KiB per packet over RFCOMM; larger writes
/// overrun the receive buffer and the tail of the image is lost.
pub const MAX_FRAME_PAYLOAD: usize = 12 * 1024;

/// # Model Specification
///
/// Static hardware description for one [`PrinterType`].
///
/// ## Calculations
///
/// ```text
/// row_bytes      = width_dots / 8
/// max_chunk_rows = min(255, MAX_FRAME_PAYLOAD / row_bytes)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSpec {
    /// Model name as accepted by [`PrinterType::from_str`]
    pub name: &'static str,

    /// Raster width in dots (pixels)
    pub width_dots: u16,

    /// Raster width in bytes (width_dots / 8)
    pub row_bytes: u16,

    /// Resolution in dots per inch
    pub dpi: u16,

    /// Characters per line of the built-in device font (ASCII mode)
    pub chars_per_line: u16,

    /// Maximum raster rows carried by one frame
    pub max_chunk_rows: u16,
}

impl ModelSpec {
    const A6: Self = Self {
        name: "A6",
        width_dots: 384,
        row_bytes: 48,
        dpi: 203,
        chars_per_line: 32,
        max_chunk_rows: 255,
    };

    const A6P: Self = Self {
        name: "A6p",
        width_dots: 576,
        row_bytes: 72,
        dpi: 203,
        chars_per_line: 48,
        max_chunk_rows: 170,
    };

    const A40: Self = Self {
        name: "A40",
        width_dots: 1728,
        row_bytes: 216,
        dpi: 203,
        chars_per_line: 144,
        max_chunk_rows: 56,
    };

    const A40P: Self = Self {
        name: "A40p",
        width_dots: 2480,
        row_bytes: 310,
        dpi: 300,
        chars_per_line: 206,
        max_chunk_rows: 39,
    };

    /// Largest payload a raster frame for this model may carry.
    #[inline]
    pub fn max_chunk_bytes(&self) -> usize {
        self.row_bytes as usize * self.max_chunk_rows as usize
    }

    /// Calculate dots per millimeter
    #[inline]
    pub fn dots_per_mm(&self) -> f32 {
        self.dpi as f32 / 25.4
    }

    /// Print width in millimeters
    #[inline]
    pub fn width_mm(&self) -> f32 {
        self.width_dots as f32 / self.dots_per_mm()
    }
}

/// Supported device models.
///
/// A closed set: the mapping to [`ModelSpec`] is a `match`, so adding a
/// variant without a specification does not compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrinterType {
    /// PeriPage A6, 58mm paper
    A6,
    /// PeriPage A6+, 80mm paper
    A6p,
    /// PeriPage A40, A4 paper at 203 DPI
    A40,
    /// PeriPage A40+, A4 paper at 300 DPI
    A40p,
}

impl PrinterType {
    /// Every supported model, in table order.
    pub const ALL: [PrinterType; 4] = [
        PrinterType::A6,
        PrinterType::A6p,
        PrinterType::A40,
        PrinterType::A40p,
    ];

    /// Static hardware specification for this model.
    pub const fn spec(self) -> &'static ModelSpec {
        match self {
            PrinterType::A6 => &ModelSpec::A6,
            PrinterType::A6p => &ModelSpec::A6P,
            PrinterType::A40 => &ModelSpec::A40,
            PrinterType::A40p => &ModelSpec::A40P,
        }
    }

    /// Model name.
    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Names of all supported models.
    pub fn names() -> impl Iterator<Item = &'static str> {
        Self::ALL.iter().map(|model| model.name())
    }
}

impl FromStr for PrinterType {
    type Err = PeripageError;

    /// Case-insensitive lookup by model name. `A6+`/`A40+` are accepted
    /// as aliases for `A6p`/`A40p`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('+', "p");
        Self::ALL
            .into_iter()
            .find(|model| model.name().to_ascii_lowercase() == normalized)
            .ok_or_else(|| {
                PeripageError::InvalidArgument(format!(
                    "Unknown printer model '{}'. Supported: {}",
                    s,
                    Self::names().collect::<Vec<_>>().join(", ")
                ))
            })
    }
}

impl fmt::Display for PrinterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_bytes_match_width() {
        for model in PrinterType::ALL {
            let spec = model.spec();
            assert_eq!(
                spec.width_dots,
                spec.row_bytes * 8,
                "{} row bytes disagree with width",
                spec.name
            );
        }
    }

    #[test]
    fn test_chunks_fit_frame_payload() {
        for model in PrinterType::ALL {
            let spec = model.spec();
            assert!(spec.max_chunk_rows > 0 && spec.max_chunk_rows <= 255);
            assert!(spec.max_chunk_bytes() <= MAX_FRAME_PAYLOAD);
        }
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!("A6".parse::<PrinterType>().unwrap(), PrinterType::A6);
        assert_eq!("a6p".parse::<PrinterType>().unwrap(), PrinterType::A6p);
        assert_eq!("A6+".parse::<PrinterType>().unwrap(), PrinterType::A6p);
        assert_eq!("A40+".parse::<PrinterType>().unwrap(), PrinterType::A40p);
        assert!(matches!(
            "A7".parse::<PrinterType>(),
            Err(PeripageError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_names_round_trip() {
        for model in PrinterType::ALL {
            assert_eq!(model.name().parse::<PrinterType>().unwrap(), model);
            assert_eq!(model.to_string(), model.name());
        }
    }

    #[test]
    fn test_a6_width_mm() {
        // 384 dots at 203 DPI ≈ 48mm printable on 58mm paper
        let width = PrinterType::A6.spec().width_mm();
        assert!((width - 48.0).abs() < 1.0);
    }
}
