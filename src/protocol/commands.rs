//! # PeriPage Command Frames
//!
//! Builders for every command the driver sends. Each builder returns an
//! immutable [`Frame`]: the command kind plus the exact bytes to put on the
//! wire.
//!
//! ## Escape Sequence Structure
//!
//! Vendor commands start with `10 FF` followed by a two-byte opcode:
//!
//! | Command | Bytes |
//! |---------|-------|
//! | Reset | `10 FF FE 01` + 12 × `00` |
//! | Concentration | `10 FF 10 00 n` |
//! | Identify (full) | `10 FF 70 F1` |
//! | Device name | `10 FF 30 11` |
//! | Firmware | `10 FF 20 F1` |
//! | Serial number | `10 FF 20 F2` |
//! | Battery | `10 FF 50 F1` |
//!
//! Raster and feed use the ESC/POS forms `GS v 0` and `ESC J`. Text is sent
//! as plain ASCII bytes and printed with the device's built-in font.
//!
//! ## Byte Order
//!
//! Multi-byte integers are **little-endian**:
//! - `u16` value 0x1234 is sent as bytes `[0x34, 0x12]`

use std::fmt;

use crate::error::{PeripageError, Result};

/// Vendor command prefix
pub const VENDOR: [u8; 2] = [0x10, 0xFF];

/// ESC (Escape) - ESC/POS command prefix
pub const ESC: u8 = 0x1B;

/// GS (Group Separator) - ESC/POS extended command prefix
pub const GS: u8 = 0x1D;

/// LF (Line Feed) - commit the device's text line buffer
pub const LF: u8 = 0x0A;

/// Number of zero bytes padding the reset command.
const RESET_PADDING: usize = 12;

// ============================================================================
// PARAMETER TYPES
// ============================================================================

/// Print heat level.
///
/// The device accepts exactly three levels; higher is darker and slower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Concentration {
    #[default]
    Light,
    Medium,
    Dark,
}

impl Concentration {
    /// Byte sent in the concentration command.
    #[inline]
    pub const fn level(self) -> u8 {
        match self {
            Concentration::Light => 0,
            Concentration::Medium => 1,
            Concentration::Dark => 2,
        }
    }
}

impl TryFrom<u8> for Concentration {
    type Error = PeripageError;

    fn try_from(level: u8) -> Result<Self> {
        match level {
            0 => Ok(Concentration::Light),
            1 => Ok(Concentration::Medium),
            2 => Ok(Concentration::Dark),
            n => Err(PeripageError::InvalidArgument(format!(
                "Concentration must be 0, 1 or 2, got {}",
                n
            ))),
        }
    }
}

/// Identity queries the device answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifyQuery {
    /// Everything the device reports about itself, as one opaque reply
    Full,
    Name,
    Firmware,
    Serial,
    Battery,
}

impl IdentifyQuery {
    const fn opcode(self) -> [u8; 2] {
        match self {
            IdentifyQuery::Full => [0x70, 0xF1],
            IdentifyQuery::Name => [0x30, 0x11],
            IdentifyQuery::Firmware => [0x20, 0xF1],
            IdentifyQuery::Serial => [0x20, 0xF2],
            IdentifyQuery::Battery => [0x50, 0xF1],
        }
    }
}

/// A command to encode.
///
/// Data-carrying variants borrow their payload; the resulting [`Frame`]
/// owns a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Reset,
    SetConcentration(Concentration),
    Identify(IdentifyQuery),
    /// `rows` packed raster rows of `row_bytes` bytes each
    Raster {
        row_bytes: u16,
        rows: u16,
        data: &'a [u8],
    },
    /// Feed `n` dot rows of blank paper
    Break(u8),
    /// Printable ASCII, printed with the device font
    Text(&'a [u8]),
}

/// Tag identifying what a [`Frame`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Reset,
    SetConcentration,
    Identify,
    Raster,
    Break,
    Text,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandKind::Reset => "reset",
            CommandKind::SetConcentration => "set-concentration",
            CommandKind::Identify => "identify",
            CommandKind::Raster => "raster",
            CommandKind::Break => "break",
            CommandKind::Text => "text",
        };
        f.write_str(name)
    }
}

/// An encoded command, ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    kind: CommandKind,
    bytes: Vec<u8>,
}

impl Frame {
    fn new(kind: CommandKind, bytes: Vec<u8>) -> Self {
        Self { kind, bytes }
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

// ============================================================================
// ENCODER
// ============================================================================

/// Encode a [`Command`] into its wire [`Frame`].
///
/// ## Errors
///
/// - Raster data whose length is not `row_bytes × rows`
/// - Empty raster chunks or a zero-row break (nothing to send)
pub fn encode_command(command: &Command<'_>) -> Result<Frame> {
    match *command {
        Command::Reset => Ok(reset()),
        Command::SetConcentration(level) => Ok(set_concentration(level)),
        Command::Identify(query) => Ok(identify(query)),
        Command::Raster {
            row_bytes,
            rows,
            data,
        } => raster(row_bytes, rows, data),
        Command::Break(n) => feed(n),
        Command::Text(text) => Ok(Frame::new(CommandKind::Text, text.to_vec())),
    }
}

/// # Reset (10 FF FE 01 + 12 × 00)
///
/// Clears the device's pending job state. Sent once right after connecting.
///
/// ```
/// use peripage::protocol::commands;
///
/// let frame = commands::reset();
/// assert_eq!(&frame.as_bytes()[..4], &[0x10, 0xFF, 0xFE, 0x01]);
/// assert_eq!(frame.len(), 16);
/// ```
pub fn reset() -> Frame {
    let mut bytes = Vec::with_capacity(4 + RESET_PADDING);
    bytes.extend_from_slice(&VENDOR);
    bytes.extend_from_slice(&[0xFE, 0x01]);
    bytes.extend_from_slice(&[0u8; RESET_PADDING]);
    Frame::new(CommandKind::Reset, bytes)
}

/// # Set Concentration (10 FF 10 00 n)
///
/// Applies to all raster output until changed again.
pub fn set_concentration(level: Concentration) -> Frame {
    let mut bytes = Vec::with_capacity(5);
    bytes.extend_from_slice(&VENDOR);
    bytes.extend_from_slice(&[0x10, 0x00, level.level()]);
    Frame::new(CommandKind::SetConcentration, bytes)
}

/// Identity request for the given query.
pub fn identify(query: IdentifyQuery) -> Frame {
    let mut bytes = Vec::with_capacity(4);
    bytes.extend_from_slice(&VENDOR);
    bytes.extend_from_slice(&query.opcode());
    Frame::new(CommandKind::Identify, bytes)
}

/// # Print Raster Bit Image (GS v 0 m xL xH yL yH d1...dk)
///
/// ## Parameters
///
/// - `row_bytes`: Width in bytes (each byte is 8 horizontal dots, MSB left)
/// - `rows`: Number of rows in this chunk
/// - `data`: Packed rows, k = row_bytes × rows bytes
///
/// ## Example
///
/// ```
/// use peripage::protocol::commands;
///
/// let data = vec![0xFF; 48 * 2];
/// let frame = commands::raster(48, 2, &data)?;
/// assert_eq!(&frame.as_bytes()[..8], &[0x1D, 0x76, 0x30, 0x00, 48, 0, 2, 0]);
/// # Ok::<(), peripage::PeripageError>(())
/// ```
pub fn raster(row_bytes: u16, rows: u16, data: &[u8]) -> Result<Frame> {
    let expected = row_bytes as usize * rows as usize;
    if expected == 0 {
        return Err(PeripageError::InvalidArgument(
            "Raster chunk must contain at least one row".to_string(),
        ));
    }
    if data.len() != expected {
        return Err(PeripageError::InvalidArgument(format!(
            "Raster data length mismatch: expected {} ({} bytes × {} rows), got {}",
            expected,
            row_bytes,
            rows,
            data.len()
        )));
    }

    let mut bytes = Vec::with_capacity(8 + data.len());
    bytes.extend_from_slice(&[GS, b'v', b'0', 0]);
    bytes.extend_from_slice(&u16_le(row_bytes));
    bytes.extend_from_slice(&u16_le(rows));
    bytes.extend_from_slice(data);
    Ok(Frame::new(CommandKind::Raster, bytes))
}

/// # Paper Feed (ESC J n)
///
/// Feeds `n` dot rows of blank paper. A zero-row feed is rejected; callers
/// skip the frame entirely instead.
pub fn feed(n: u8) -> Result<Frame> {
    if n == 0 {
        return Err(PeripageError::InvalidArgument(
            "Break size must be at least 1 row".to_string(),
        ));
    }
    Ok(Frame::new(CommandKind::Break, vec![ESC, b'J', n]))
}

/// Encode a u16 value as little-endian bytes [low, high]
///
/// ```
/// use peripage::protocol::commands::u16_le;
///
/// assert_eq!(u16_le(0x1234), [0x34, 0x12]);
/// assert_eq!(u16_le(384), [0x80, 0x01]);
/// ```
#[inline]
pub const fn u16_le(value: u16) -> [u8; 2] {
    value.to_le_bytes()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reset() {
        let frame = encode_command(&Command::Reset).unwrap();
        assert_eq!(frame.kind(), CommandKind::Reset);
        assert_eq!(
            frame.as_bytes(),
            &[0x10, 0xFF, 0xFE, 0x01, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_set_concentration() {
        for (level, byte) in [
            (Concentration::Light, 0),
            (Concentration::Medium, 1),
            (Concentration::Dark, 2),
        ] {
            let frame = encode_command(&Command::SetConcentration(level)).unwrap();
            assert_eq!(frame.as_bytes(), &[0x10, 0xFF, 0x10, 0x00, byte]);
        }
    }

    #[test]
    fn test_concentration_bounds() {
        assert_eq!(Concentration::try_from(0).unwrap(), Concentration::Light);
        assert_eq!(Concentration::try_from(2).unwrap(), Concentration::Dark);
        assert!(Concentration::try_from(3).is_err());
    }

    #[test]
    fn test_identify_opcodes() {
        assert_eq!(identify(IdentifyQuery::Full).as_bytes(), &[0x10, 0xFF, 0x70, 0xF1]);
        assert_eq!(identify(IdentifyQuery::Name).as_bytes(), &[0x10, 0xFF, 0x30, 0x11]);
        assert_eq!(
            identify(IdentifyQuery::Firmware).as_bytes(),
            &[0x10, 0xFF, 0x20, 0xF1]
        );
        assert_eq!(identify(IdentifyQuery::Serial).as_bytes(), &[0x10, 0xFF, 0x20, 0xF2]);
        assert_eq!(
            identify(IdentifyQuery::Battery).as_bytes(),
            &[0x10, 0xFF, 0x50, 0xF1]
        );
    }

    #[test]
    fn test_raster_header() {
        let data = vec![0xAA; 48 * 300];
        let frame = raster(48, 300, &data).unwrap();
        assert_eq!(frame.kind(), CommandKind::Raster);
        // 300 = 0x012C -> [0x2C, 0x01]
        assert_eq!(&frame.as_bytes()[..8], &[0x1D, 0x76, 0x30, 0x00, 0x30, 0x00, 0x2C, 0x01]);
        assert_eq!(&frame.as_bytes()[8..], &data[..]);
    }

    #[test]
    fn test_raster_length_mismatch() {
        let data = vec![0u8; 47];
        assert!(matches!(
            raster(48, 1, &data),
            Err(PeripageError::InvalidArgument(_))
        ));
        assert!(raster(48, 0, &[]).is_err());
    }

    #[test]
    fn test_feed() {
        assert_eq!(feed(1).unwrap().as_bytes(), &[0x1B, 0x4A, 1]);
        assert_eq!(feed(255).unwrap().as_bytes(), &[0x1B, 0x4A, 255]);
        assert!(feed(0).is_err());
    }

    #[test]
    fn test_text_passthrough() {
        let frame = encode_command(&Command::Text(b"hello\n")).unwrap();
        assert_eq!(frame.kind(), CommandKind::Text);
        assert_eq!(frame.into_bytes(), b"hello\n".to_vec());
    }
}
