//! # Device Responses
//!
//! Decoding of identity replies. The full identify reply has no documented
//! layout, so [`DeviceInfo`] keeps it as opaque bytes. The single-field
//! queries reply with either ASCII text (name, firmware, serial) or a single
//! byte (battery percentage).

use crate::error::{PeripageError, Result};
use crate::protocol::commands::IdentifyQuery;

/// Reply to [`IdentifyQuery::Full`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    raw: Vec<u8>,
}

impl DeviceInfo {
    pub fn new(raw: Vec<u8>) -> Self {
        Self { raw }
    }

    /// Bytes exactly as received.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.raw
    }

    /// Reply rendered for display: non-ASCII bytes are escaped, trailing
    /// NUL padding is removed.
    pub fn text(&self) -> String {
        trim_padding(&self.raw).escape_ascii().to_string()
    }
}

/// A decoded reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Full(DeviceInfo),
    Text(String),
    /// Battery charge in percent
    Battery(u8),
}

/// Decode the reply to `query`.
///
/// ## Errors
///
/// - Empty input (the device answered nothing), or only NUL padding for
///   text and full replies
/// - Text replies containing non-ASCII bytes
/// - Battery replies above 100%
pub fn decode_response(query: IdentifyQuery, bytes: &[u8]) -> Result<Response> {
    // A battery level of zero is a NUL byte, so only text replies are trimmed
    let payload = match query {
        IdentifyQuery::Battery => bytes,
        _ => trim_padding(bytes),
    };
    if payload.is_empty() {
        return Err(PeripageError::Protocol(format!(
            "Empty reply to {:?} query",
            query
        )));
    }

    match query {
        IdentifyQuery::Full => Ok(Response::Full(DeviceInfo::new(bytes.to_vec()))),
        IdentifyQuery::Name | IdentifyQuery::Firmware | IdentifyQuery::Serial => {
            if !payload.is_ascii() {
                return Err(PeripageError::Protocol(format!(
                    "Non-ASCII reply to {:?} query: {}",
                    query,
                    payload.escape_ascii()
                )));
            }
            // ASCII was checked above, so this never substitutes
            let text = String::from_utf8_lossy(payload);
            Ok(Response::Text(text.trim().to_string()))
        }
        IdentifyQuery::Battery => {
            let level = payload[0];
            if level > 100 {
                return Err(PeripageError::Protocol(format!(
                    "Battery level out of range: {}",
                    level
                )));
            }
            Ok(Response::Battery(level))
        }
    }
}

fn trim_padding(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|&b| b != 0)
        .map_or(0, |pos| pos + 1);
    &bytes[..end]
}
