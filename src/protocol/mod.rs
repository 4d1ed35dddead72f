//! # PeriPage Protocol
//!
//! Pure data transformation between commands and bytes. Nothing in this
//! module touches the transport or the imaging pipeline.
//!
//! - [`commands`]: Frame builders (reset, concentration, identify, raster, feed, text)
//! - [`response`]: Identity reply decoding
//!
//! ## Usage Example
//!
//! ```
//! use peripage::protocol::commands::{self, Command, Concentration};
//!
//! let mut data = Vec::new();
//! data.extend(commands::reset().into_bytes());
//! data.extend(commands::encode_command(&Command::SetConcentration(Concentration::Dark))?.into_bytes());
//! data.extend(commands::raster(48, 1, &[0xFF; 48])?.into_bytes());
//! data.extend(commands::feed(64)?.into_bytes());
//! # Ok::<(), peripage::PeripageError>(())
//! ```

pub mod commands;
pub mod response;

pub use commands::{Command, CommandKind, Concentration, Frame, IdentifyQuery, encode_command};
pub use response::{DeviceInfo, Response, decode_response};
