//! # Printer Transport Layer
//!
//! Connected, ordered byte streams to a printer.
//!
//! ## Available Transports
//!
//! - [`rfcomm`]: Direct RFCOMM socket to a Bluetooth MAC address (Linux)
//! - [`tty`]: An RFCOMM device already bound with `rfcomm bind` (`/dev/rfcommN`)
//! - [`mock`]: In-memory transport that records frames, for tests
//!
//! ## Contract
//!
//! - `send` writes every byte or fails; it never returns after a partial write
//! - `receive` returns as soon as the peer pauses, with at most `max_bytes`
//! - `close` is idempotent and safe after any earlier failure

pub mod mock;
pub mod rfcomm;
pub mod tty;

mod fd;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{PeripageError, Result};

pub use mock::{MockConnector, MockTransport};
pub use rfcomm::RfcommSocket;
pub use tty::TtyTransport;

/// Default RFCOMM channel for the Serial Port Profile.
pub const DEFAULT_CHANNEL: u8 = 1;

/// A connected byte stream.
pub trait Transport: Send {
    /// Write all of `data`, blocking until flushed or the send timeout elapses.
    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Read up to `max_bytes`, waiting at most `timeout` for the first byte.
    fn receive(&mut self, max_bytes: usize, timeout: Duration) -> Result<Vec<u8>>;

    /// Release the connection. Calling it again is a no-op.
    fn close(&mut self) -> Result<()>;
}

/// Timeouts applied when opening a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportTimeouts {
    pub connect: Duration,
    pub send: Duration,
}

impl Default for TransportTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            send: Duration::from_secs(5),
        }
    }
}

/// Opens transports. The seam that lets the printer driver run against
/// real hardware or a mock.
pub trait Connect: Send {
    /// Establish a connected stream to `address`.
    ///
    /// Unreachable devices and connect timeouts fail with
    /// [`PeripageError::Connection`].
    fn open(&self, address: &Address, timeouts: TransportTimeouts) -> Result<Box<dyn Transport>>;
}

/// Opens a real RFCOMM socket for MAC addresses and a bound TTY for device paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemConnector {
    pub channel: u8,
}

impl Default for SystemConnector {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL,
        }
    }
}

impl Connect for SystemConnector {
    fn open(&self, address: &Address, timeouts: TransportTimeouts) -> Result<Box<dyn Transport>> {
        match address {
            Address::Mac(mac) => Ok(Box::new(RfcommSocket::connect(
                *mac,
                self.channel,
                timeouts,
            )?)),
            Address::Device(path) => Ok(Box::new(TtyTransport::open(path, timeouts)?)),
        }
    }
}

// ============================================================================
// ADDRESSES
// ============================================================================

/// Where the printer lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    /// Bluetooth device address, most significant byte first as written
    Mac([u8; 6]),
    /// A bound RFCOMM TTY such as `/dev/rfcomm0`
    Device(PathBuf),
}

impl FromStr for Address {
    type Err = PeripageError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if is_valid_mac(s) {
            let mut mac = [0u8; 6];
            for (byte, part) in mac.iter_mut().zip(s.split(':')) {
                *byte = u8::from_str_radix(part, 16)
                    .map_err(|e| PeripageError::InvalidArgument(format!("{}: {}", s, e)))?;
            }
            return Ok(Address::Mac(mac));
        }
        if s.starts_with("/dev/") {
            return Ok(Address::Device(PathBuf::from(s)));
        }
        Err(PeripageError::InvalidArgument(format!(
            "'{}' is neither a Bluetooth address (XX:XX:XX:XX:XX:XX) nor a /dev path",
            s
        )))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Mac(mac) => {
                let parts: Vec<String> = mac.iter().map(|b| format!("{:02X}", b)).collect();
                f.write_str(&parts.join(":"))
            }
            Address::Device(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Validate a Bluetooth MAC address format (XX:XX:XX:XX:XX:XX).
pub fn is_valid_mac(mac: &str) -> bool {
    let parts: Vec<&str> = mac.split(':').collect();
    parts.len() == 6
        && parts
            .iter()
            .all(|part| part.len() == 2 && part.chars().all(|c| c.is_ascii_hexdigit()))
}

// ============================================================================
// TESTS
// ============================================================================
