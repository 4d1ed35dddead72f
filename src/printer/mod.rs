//! # Printer Module
//!
//! The [`Printer`] façade and the hardware it drives.
//!
//! ## Modules
//!
//! - [`model`]: Supported models and their static specifications
//! - [`driver`]: Connection lifecycle and print operations
//! - [`ascii`]: Line buffering for the device's built-in font

pub mod ascii;
pub mod driver;
pub mod model;

pub use ascii::AsciiLineBuffer;
pub use driver::{ConnectionState, MAX_BREAK_ROWS, Printer, PrinterOptions, TextFileOptions};
pub use model::{MAX_FRAME_PAYLOAD, ModelSpec, PrinterType};
