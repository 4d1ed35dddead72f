//! # PeriPage - Thermal Printer Library
//!
//! Drives PeriPage portable thermal printers over Bluetooth RFCOMM. It
//! provides:
//!
//! - **Printer driver**: connection lifecycle, images, QR codes, text
//! - **Protocol implementation**: PeriPage command frames and identity replies
//! - **Rendering**: resampling, dithering, font rasterization, QR symbols
//! - **Transport**: RFCOMM sockets, bound RFCOMM TTYs, and a recording mock
//!
//! ## Quick Start
//!
//! ```no_run
//! use peripage::{Concentration, Printer, PrinterType, ResamplePolicy};
//!
//! let mut printer = Printer::new(PrinterType::A6);
//! printer.connect("00:15:83:AA:BB:CC")?;
//! printer.reset()?;
//! printer.set_concentration(Concentration::Medium)?;
//!
//! let image = image::open("cat.png")?;
//! printer.print_image(&image, ResamplePolicy::Box)?;
//! printer.print_break(100)?;
//! printer.disconnect();
//!
//! # Ok::<(), peripage::PeripageError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`printer`] | `Printer` façade and model table |
//! | [`protocol`] | Command frames and response decoding |
//! | [`render`] | Raster, dithering, text and QR rendering |
//! | [`transport`] | Communication backends |
//! | [`error`] | Error types |
//!
//! ## Supported Printers
//!
//! PeriPage A6, A6+, A40 and A40+. See [`PrinterType`].
//!
//! ## Logging
//!
//! The library logs through the `log` facade (frames at `debug`, connection
//! changes at `info`, dropped characters and swallowed close errors at
//! `warn`). Install any logger to see it.

pub mod error;
pub mod printer;
pub mod protocol;
pub mod render;
pub mod transport;

// Re-exports for convenience
pub use error::{PeripageError, Result};
pub use printer::{ConnectionState, Printer, PrinterOptions, PrinterType, TextFileOptions};
pub use protocol::Concentration;
pub use render::{DitherMode, FontSource, QrErrorLevel, QrOptions, ResamplePolicy};
pub use transport::{Address, Transport};
