//! # Error Types
//!
//! Every public operation returns [`PeripageError`]. Transport and protocol
//! failures are never swallowed; the only place errors are discarded is
//! [`Printer::disconnect`](crate::Printer::disconnect), which must stay
//! callable from any state.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PeripageError>;

/// Main error type for peripage operations
#[derive(Debug, Error)]
pub enum PeripageError {
    /// Opening the transport failed (unreachable, unpaired, or connect timeout)
    #[error("Connection to {address} failed: {reason}")]
    Connection { address: String, reason: String },

    /// Send/receive failure on an established connection
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Nothing arrived (or could be written) within the configured bound
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Malformed or truncated device response
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Source bitmap cannot be rasterized (zero width/height)
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Image decoding failure
    #[error("Image error: {0}")]
    Imaging(#[from] image::ImageError),

    /// Font file missing or unreadable
    #[error("Failed to load font {}: {reason}", path.display())]
    FontLoad { path: PathBuf, reason: String },

    /// A text file handed to `print_txt_file` could not be read
    #[error("Failed to read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// QR content exceeds symbol capacity
    #[error("QR encoding failed: {0}")]
    Encoding(String),

    /// Print/query operation issued while disconnected or closed
    #[error("Printer is not connected")]
    NotConnected,

    /// Parameter rejected before reaching the device
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl PeripageError {
    /// `true` for [`PeripageError::Timeout`].
    ///
    /// Callers that implement their own retry policy usually retry only on
    /// timeouts, after reconnecting.
    pub fn is_timeout(&self) -> bool {
        matches!(self, PeripageError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_classification() {
        let timeout = PeripageError::Timeout {
            operation: "receive",
            after: Duration::from_secs(1),
        };
        assert!(timeout.is_timeout());
        assert!(!PeripageError::NotConnected.is_timeout());
        assert!(!PeripageError::Io(io::Error::other("broken pipe")).is_timeout());
    }

    #[test]
    fn test_messages() {
        let err = PeripageError::Connection {
            address: "00:11:22:33:44:55".to_string(),
            reason: "host is down".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Connection to 00:11:22:33:44:55 failed: host is down"
        );

        let err = PeripageError::FontLoad {
            path: PathBuf::from("/nope.ttf"),
            reason: "not found".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to load font /nope.ttf: not found");
    }
}
