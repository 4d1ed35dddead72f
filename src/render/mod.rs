//! # Rendering
//!
//! Everything that turns content into printer dots. All of it is synchronous
//! CPU work with no knowledge of the transport.
//!
//! - [`raster`]: [`Bitmap`], image-to-raster conversion and row chunking
//! - [`resample`]: Box (default) and library resampling filters
//! - [`dither`]: Threshold and Bayer 8x8 monochrome conversion
//! - [`text`]: ASCII filtering and font rasterization
//! - [`qr`]: QR symbol generation

pub mod dither;
pub mod qr;
pub mod raster;
pub mod resample;
pub mod text;

pub use dither::DitherMode;
pub use qr::{QrErrorLevel, QrOptions};
pub use raster::{Bitmap, RasterChunk};
pub use resample::ResamplePolicy;
pub use text::{FontSource, LoadedFont, TextLayout};
