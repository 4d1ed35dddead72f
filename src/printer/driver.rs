//! # Printer Driver
//!
//! [`Printer`] owns the connection to one device and turns high-level print
//! requests into ordered frames.
//!
//! ## Lifecycle
//!
//! ```text
//! Disconnected ──connect──► Connected ──disconnect──► Closed
//!                               ▲                        │
//!                               └───────connect──────────┘
//! ```
//!
//! Print and query operations fail with [`PeripageError::NotConnected`]
//! outside `Connected`. `disconnect` never fails and may be called from any
//! state, so error paths can always clean up. Dropping a `Printer`
//! disconnects it.
//!
//! ## Ordering
//!
//! Every operation completes (all frames written) before it returns. Pending
//! device-font text is flushed before any raster or break so output appears
//! in call order. If no concentration was set in this session, the default
//! level is sent before the first raster frame.
//!
//! ## Example
//!
//! ```no_run
//! use peripage::{Concentration, Printer, PrinterType};
//!
//! let mut printer = Printer::new(PrinterType::A6);
//! printer.session("00:15:83:AA:BB:CC", |p| {
//!     p.reset()?;
//!     p.set_concentration(Concentration::Dark)?;
//!     p.println_ascii("Hello from Rust")?;
//!     p.print_qr("https://example.com")?;
//!     p.print_break(64)
//! })?;
//! # Ok::<(), peripage::PeripageError>(())
//! ```

use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use image::DynamicImage;
use log::{debug, info, warn};

use super::ascii::AsciiLineBuffer;
use super::model::{MAX_FRAME_PAYLOAD, PrinterType};
use crate::error::{PeripageError, Result};
use crate::protocol::commands::{self, Command, Concentration, Frame, IdentifyQuery};
use crate::protocol::response::{Response, decode_response};
use crate::render::dither::DitherMode;
use crate::render::qr::{self, QrOptions};
use crate::render::raster::{self, Bitmap};
use crate::render::resample::ResamplePolicy;
use crate::render::text::{self, FontSource, TextLayout};
use crate::transport::{Address, Connect, SystemConnector, Transport, TransportTimeouts};

/// Largest identity reply accepted in one receive.
const MAX_REPLY_BYTES: usize = 1024;

/// Largest accepted break, in dot rows.
pub const MAX_BREAK_ROWS: u16 = 255;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Connection and output settings for a [`Printer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrinterOptions {
    /// Bound on establishing the link
    pub connect_timeout: Duration,
    /// Bound on each send, and on waiting for an identity reply
    pub io_timeout: Duration,
    /// Pause between consecutive raster frames
    pub packet_delay: Duration,
    /// Monochrome conversion for images and rendered text
    pub dither: DitherMode,
}

impl Default for PrinterOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            io_timeout: Duration::from_secs(5),
            packet_delay: Duration::from_millis(10),
            dither: DitherMode::Threshold,
        }
    }
}

/// How [`Printer::print_txt_file`] renders a text file.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFileOptions {
    pub font: FontSource,
    /// Glyph height in pixels
    pub font_size: f32,
    /// Blank pixel rows between lines
    pub line_break: usize,
    /// Pause between raster frames; slows the feed for long documents
    pub packet_delay: Duration,
    /// Text is drawn this many times larger than the paper width, then
    /// reduced to it with `resample`. 1 draws at print size.
    pub oversample: u32,
    pub resample: ResamplePolicy,
}

impl Default for TextFileOptions {
    fn default() -> Self {
        Self {
            font: FontSource::Builtin,
            font_size: 20.0,
            line_break: 2,
            packet_delay: Duration::from_millis(10),
            oversample: 2,
            resample: ResamplePolicy::Box,
        }
    }
}

/// Where a [`Printer`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connected,
    Closed,
}

// ============================================================================
// PRINTER
// ============================================================================

/// A PeriPage printer.
pub struct Printer {
    model: PrinterType,
    options: PrinterOptions,
    connector: Box<dyn Connect>,
    address: Option<Address>,
    transport: Option<Box<dyn Transport>>,
    state: ConnectionState,
    /// Last level the device acknowledged in this session
    concentration: Option<Concentration>,
    ascii: AsciiLineBuffer,
}

impl Printer {
    /// A disconnected printer that opens real Bluetooth connections.
    pub fn new(model: PrinterType) -> Self {
        Self::with_connector(model, SystemConnector::default())
    }

    /// A disconnected printer that opens connections through `connector`.
    pub fn with_connector<C: Connect + 'static>(model: PrinterType, connector: C) -> Self {
        Self {
            model,
            options: PrinterOptions::default(),
            connector: Box::new(connector),
            address: None,
            transport: None,
            state: ConnectionState::Disconnected,
            concentration: None,
            ascii: AsciiLineBuffer::new(model.spec().chars_per_line as usize),
        }
    }

    pub fn with_options(mut self, options: PrinterOptions) -> Self {
        self.options = options;
        self
    }

    pub fn model(&self) -> PrinterType {
        self.model
    }

    pub fn options(&self) -> &PrinterOptions {
        &self.options
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Address of the current or most recent connection.
    pub fn address(&self) -> Option<&Address> {
        self.address.as_ref()
    }

    /// Concentration the device acknowledged in this session, if any.
    pub fn concentration(&self) -> Option<Concentration> {
        self.concentration
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Connect to a MAC address (`XX:XX:XX:XX:XX:XX`) or bound RFCOMM device
    /// (`/dev/rfcommN`).
    ///
    /// Connecting again to the same address while connected is a no-op.
    ///
    /// ## Errors
    ///
    /// - [`PeripageError::InvalidArgument`] for a malformed address, or when
    ///   already connected elsewhere
    /// - [`PeripageError::Connection`] for every failure to open the link,
    ///   timeouts included
    pub fn connect(&mut self, address: &str) -> Result<()> {
        let address: Address = address.parse()?;
        self.connect_to(address)
    }

    /// [`connect`](Self::connect) with an already parsed address.
    pub fn connect_to(&mut self, address: Address) -> Result<()> {
        if self.state == ConnectionState::Connected {
            return match &self.address {
                Some(current) if *current == address => Ok(()),
                Some(current) => Err(PeripageError::InvalidArgument(format!(
                    "Already connected to {}",
                    current
                ))),
                None => Err(PeripageError::NotConnected),
            };
        }

        info!("Connecting to {} ({})", address, self.model);
        let timeouts = TransportTimeouts {
            connect: self.options.connect_timeout,
            send: self.options.io_timeout,
        };
        let transport = self
            .connector
            .open(&address, timeouts)
            .map_err(|e| match e {
                e @ PeripageError::Connection { .. } => e,
                other => PeripageError::Connection {
                    address: address.to_string(),
                    reason: other.to_string(),
                },
            })?;

        self.transport = Some(transport);
        self.address = Some(address);
        self.state = ConnectionState::Connected;
        self.concentration = None;
        self.ascii = AsciiLineBuffer::new(self.model.spec().chars_per_line as usize);
        Ok(())
    }

    /// Flush pending text, close the link and enter `Closed`.
    ///
    /// Never fails: flush and close errors are logged and dropped. Safe to
    /// call repeatedly and after any earlier failure.
    pub fn disconnect(&mut self) {
        if self.state == ConnectionState::Connected
            && let Err(e) = self.flush_ascii()
        {
            warn!("Discarding unprinted text: {}", e);
        }
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close() {
                warn!("Error while closing connection: {}", e);
            }
            if let Some(address) = &self.address {
                info!("Disconnected from {}", address);
            }
        }
        self.state = ConnectionState::Closed;
    }

    /// Connect, run `f`, and disconnect on every exit path.
    ///
    /// The result of `f` is returned unchanged; disconnect never masks it.
    pub fn session<T, F>(&mut self, address: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        self.connect(address)?;
        let result = f(self);
        self.disconnect();
        result
    }

    // ========================================================================
    // DEVICE SETTINGS
    // ========================================================================

    /// Reset the device's job state.
    pub fn reset(&mut self) -> Result<()> {
        self.send_frame(&commands::reset())
    }

    /// Set print heat for all following raster output.
    ///
    /// The stored level changes only if the frame was written.
    pub fn set_concentration(&mut self, level: Concentration) -> Result<()> {
        self.send_frame(&commands::set_concentration(level))?;
        self.concentration = Some(level);
        Ok(())
    }

    fn ensure_concentration(&mut self) -> Result<()> {
        if self.concentration.is_none() {
            debug!("No concentration set, sending default");
            self.set_concentration(Concentration::default())?;
        }
        Ok(())
    }

    // ========================================================================
    // RASTER OUTPUT
    // ========================================================================

    /// Scale `image` to the paper width and print it.
    ///
    /// ## Errors
    ///
    /// [`PeripageError::InvalidImage`] for an image with no pixels, plus any
    /// transport failure.
    pub fn print_image(&mut self, image: &DynamicImage, resample: ResamplePolicy) -> Result<()> {
        self.require_connected()?;
        let width = self.width();
        let bitmap = raster::encode_image(image, width, resample, self.options.dither)?;
        self.print_bitmap(&bitmap)
    }

    /// Print packed rows exactly as given (`row_bytes` bytes per row, MSB is
    /// the leftmost dot).
    pub fn print_row_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.require_connected()?;
        let bitmap = Bitmap::from_packed(self.width(), data.to_vec())?;
        self.print_bitmap(&bitmap)
    }

    /// Print a bitmap that is already the paper width.
    pub fn print_bitmap(&mut self, bitmap: &Bitmap) -> Result<()> {
        self.send_bitmap(bitmap, self.options.packet_delay)
    }

    /// Print `text` as a QR code filling the paper width.
    pub fn print_qr(&mut self, text: &str) -> Result<()> {
        self.print_qr_with(text, QrOptions::default())
    }

    /// [`print_qr`](Self::print_qr) with explicit error correction and
    /// module size.
    pub fn print_qr_with(&mut self, text: &str, options: QrOptions) -> Result<()> {
        self.require_connected()?;
        let bitmap = qr::render_qr(text, self.width(), options)?;
        self.print_bitmap(&bitmap)
    }

    /// Render a text file with a font and print it as an image.
    ///
    /// ## Errors
    ///
    /// - [`PeripageError::ReadFile`] if the file cannot be read
    /// - [`PeripageError::FontLoad`] if the font cannot be loaded
    pub fn print_txt_file<P: AsRef<Path>>(&mut self, path: P, options: &TextFileOptions) -> Result<()> {
        self.require_connected()?;
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| PeripageError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let content = String::from_utf8_lossy(&bytes);

        let font = text::load_font(&options.font)?;
        let scale = options.oversample.max(1) as usize;
        let layout = TextLayout {
            font_size: options.font_size * scale as f32,
            line_break: options.line_break * scale,
        };
        let width = self.width();
        let gray = text::render_text_gray(&content, &font, layout, width * scale)?;
        let bitmap = raster::encode_gray(&gray, width, options.resample, self.options.dither)?;

        info!(
            "Printing {} ({} bytes) as {} raster rows",
            path.display(),
            bytes.len(),
            bitmap.height()
        );
        self.send_bitmap(&bitmap, options.packet_delay)
    }

    /// Feed `rows` dot rows of blank paper. Zero sends nothing.
    ///
    /// ## Errors
    ///
    /// [`PeripageError::InvalidArgument`] above [`MAX_BREAK_ROWS`], checked
    /// before anything is sent.
    pub fn print_break(&mut self, rows: u16) -> Result<()> {
        let rows = u8::try_from(rows).map_err(|_| {
            PeripageError::InvalidArgument(format!(
                "Break size must be 0..={}, got {}",
                MAX_BREAK_ROWS, rows
            ))
        })?;
        self.require_connected()?;
        if rows == 0 {
            return Ok(());
        }
        self.flush_ascii()?;
        self.send_frame(&commands::feed(rows)?)
    }

    fn send_bitmap(&mut self, bitmap: &Bitmap, delay: Duration) -> Result<()> {
        let spec = self.model.spec();
        if bitmap.width() != spec.width_dots as usize {
            return Err(PeripageError::InvalidImage(format!(
                "Bitmap is {} dots wide, {} prints {}",
                bitmap.width(),
                self.model,
                spec.width_dots
            )));
        }
        self.require_connected()?;
        self.flush_ascii()?;
        self.ensure_concentration()?;

        debug!(
            "Sending {}x{} raster in packets of {} rows",
            bitmap.width(),
            bitmap.height(),
            spec.max_chunk_rows
        );
        for (i, chunk) in bitmap.chunks(spec.max_chunk_rows as usize).enumerate() {
            if i > 0 && !delay.is_zero() {
                thread::sleep(delay);
            }
            let frame = commands::raster(spec.row_bytes, chunk.rows as u16, chunk.data)?;
            self.send_frame(&frame)?;
        }
        Ok(())
    }

    // ========================================================================
    // DEVICE-FONT TEXT
    // ========================================================================

    /// Queue text for the device font. Complete lines print immediately.
    ///
    /// Characters outside printable ASCII are dropped with a warning.
    pub fn print_ascii(&mut self, text: &str) -> Result<()> {
        self.require_connected()?;
        let ready = self.ascii.push(text);
        self.send_text(&ready)
    }

    /// [`print_ascii`](Self::print_ascii) followed by a newline.
    pub fn println_ascii(&mut self, line: &str) -> Result<()> {
        self.print_ascii(&format!("{}\n", line))
    }

    /// Print whatever partial line is pending.
    pub fn flush_ascii(&mut self) -> Result<()> {
        self.require_connected()?;
        match self.ascii.finish() {
            Some(text) => self.send_text(&text),
            None => Ok(()),
        }
    }

    fn send_text(&mut self, text: &str) -> Result<()> {
        for chunk in text.as_bytes().chunks(MAX_FRAME_PAYLOAD) {
            let frame = commands::encode_command(&Command::Text(chunk))?;
            self.send_frame(&frame)?;
        }
        Ok(())
    }

    // ========================================================================
    // IDENTITY
    // ========================================================================

    /// Raw reply to the full identify request, for display.
    pub fn get_device_full(&mut self) -> Result<Vec<u8>> {
        match self.query(IdentifyQuery::Full)? {
            Response::Full(info) => Ok(info.into_raw()),
            other => Err(unexpected(IdentifyQuery::Full, other)),
        }
    }

    pub fn get_device_name(&mut self) -> Result<String> {
        self.query_text(IdentifyQuery::Name)
    }

    pub fn get_device_firmware(&mut self) -> Result<String> {
        self.query_text(IdentifyQuery::Firmware)
    }

    pub fn get_device_serial(&mut self) -> Result<String> {
        self.query_text(IdentifyQuery::Serial)
    }

    /// Battery charge in percent.
    pub fn get_device_battery(&mut self) -> Result<u8> {
        match self.query(IdentifyQuery::Battery)? {
            Response::Battery(level) => Ok(level),
            other => Err(unexpected(IdentifyQuery::Battery, other)),
        }
    }

    fn query_text(&mut self, query: IdentifyQuery) -> Result<String> {
        match self.query(query)? {
            Response::Text(text) => Ok(text),
            other => Err(unexpected(query, other)),
        }
    }

    fn query(&mut self, query: IdentifyQuery) -> Result<Response> {
        self.send_frame(&commands::identify(query))?;
        let timeout = self.options.io_timeout;
        let reply = self.transport()?.receive(MAX_REPLY_BYTES, timeout)?;
        debug!("Received {} byte reply to {:?}", reply.len(), query);
        decode_response(query, &reply)
    }

    // ========================================================================
    // PLUMBING
    // ========================================================================

    fn width(&self) -> usize {
        self.model.spec().width_dots as usize
    }

    fn require_connected(&mut self) -> Result<()> {
        self.transport().map(|_| ())
    }

    fn transport(&mut self) -> Result<&mut Box<dyn Transport>> {
        match (self.state, self.transport.as_mut()) {
            (ConnectionState::Connected, Some(transport)) => Ok(transport),
            _ => Err(PeripageError::NotConnected),
        }
    }

    fn send_frame(&mut self, frame: &Frame) -> Result<()> {
        debug!("Sending {} frame ({} bytes)", frame.kind(), frame.len());
        self.transport()?.send(frame.as_bytes())
    }
}

impl Drop for Printer {
    fn drop(&mut self) {
        if self.state == ConnectionState::Connected {
            self.disconnect();
        }
    }
}

fn unexpected(query: IdentifyQuery, response: Response) -> PeripageError {
    PeripageError::Protocol(format!(
        "Unexpected reply to {:?} query: {:?}",
        query, response
    ))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockConnector, MockTransport};

    const MAC: &str = "00:15:83:AA:BB:CC";

    fn connected(model: PrinterType) -> (Printer, MockTransport) {
        let mock = MockTransport::new();
        let options = PrinterOptions {
            packet_delay: Duration::ZERO,
            ..Default::default()
        };
        let mut printer = Printer::with_connector(model, mock.connector()).with_options(options);
        printer.connect(MAC).unwrap();
        (printer, mock)
    }

    #[test]
    fn test_starts_disconnected() {
        let printer = Printer::with_connector(PrinterType::A6, MockTransport::new().connector());
        assert_eq!(printer.state(), ConnectionState::Disconnected);
        assert!(printer.address().is_none());
    }

    #[test]
    fn test_operations_require_connection() {
        let mut printer = Printer::with_connector(PrinterType::A6, MockTransport::new().connector());
        assert!(matches!(printer.reset(), Err(PeripageError::NotConnected)));
        assert!(matches!(printer.print_qr("x"), Err(PeripageError::NotConnected)));
        assert!(matches!(
            printer.get_device_full(),
            Err(PeripageError::NotConnected)
        ));
    }

    #[test]
    fn test_connect_same_address_is_noop() {
        let mock = MockTransport::new();
        let connector = mock.connector();
        let mut printer = Printer::with_connector(PrinterType::A6, connector.clone());
        printer.connect(MAC).unwrap();
        printer.connect(MAC).unwrap();
        assert_eq!(connector.opens(), 1);
        assert!(matches!(
            printer.connect("00:15:83:00:00:01"),
            Err(PeripageError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_connect_rejects_malformed_address() {
        let mut printer = Printer::with_connector(PrinterType::A6, MockTransport::new().connector());
        assert!(matches!(
            printer.connect("not-an-address"),
            Err(PeripageError::InvalidArgument(_))
        ));
        assert_eq!(printer.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_reconnect_after_disconnect() {
        let (mut printer, mock) = connected(PrinterType::A6);
        printer.disconnect();
        assert_eq!(printer.state(), ConnectionState::Closed);
        printer.connect(MAC).unwrap();
        assert_eq!(printer.state(), ConnectionState::Connected);
        printer.reset().unwrap();
        assert_eq!(mock.sent_frames().last().unwrap(), commands::reset().as_bytes());
    }

    #[test]
    fn test_concentration_updated_only_on_success() {
        let (mut printer, mock) = connected(PrinterType::A6);
        printer.set_concentration(Concentration::Medium).unwrap();
        mock.fail_sends_after(0);
        assert!(printer.set_concentration(Concentration::Dark).is_err());
        assert_eq!(printer.concentration(), Some(Concentration::Medium));
    }

    #[test]
    fn test_default_concentration_before_first_raster() {
        let (mut printer, mock) = connected(PrinterType::A6);
        printer.print_qr("hi").unwrap();
        let frames = mock.sent_frames();
        assert_eq!(frames[0], commands::set_concentration(Concentration::Light).as_bytes());
        assert_eq!(&frames[1][..4], &[0x1D, 0x76, 0x30, 0x00]);

        // Not repeated for later rasters
        mock.clear_sent();
        printer.print_qr("hi").unwrap();
        assert!(mock.sent_frames().iter().all(|f| f[0] == commands::GS));
    }

    #[test]
    fn test_raster_frames_respect_chunk_rows() {
        let (mut printer, mock) = connected(PrinterType::A40p);
        printer.set_concentration(Concentration::Light).unwrap();
        mock.clear_sent();

        let spec = PrinterType::A40p.spec();
        let bitmap = Bitmap::from_fn(spec.width_dots as usize, 100, |x, y| (x + y) % 3 == 0);
        printer.print_bitmap(&bitmap).unwrap();

        let frames = mock.sent_frames();
        let rows: Vec<u16> = frames
            .iter()
            .map(|f| u16::from_le_bytes([f[6], f[7]]))
            .collect();
        assert_eq!(rows, vec![39, 39, 22]);
        for frame in &frames {
            assert!(frame.len() - 8 <= MAX_FRAME_PAYLOAD);
        }
        let payload: Vec<u8> = frames.iter().flat_map(|f| f[8..].to_vec()).collect();
        assert_eq!(payload, bitmap.as_bytes());
    }

    #[test]
    fn test_wrong_width_bitmap_rejected() {
        let (mut printer, mock) = connected(PrinterType::A6);
        let bitmap = Bitmap::new(576, 4);
        assert!(matches!(
            printer.print_bitmap(&bitmap),
            Err(PeripageError::InvalidImage(_))
        ));
        assert!(mock.sent_frames().is_empty());
    }

    #[test]
    fn test_print_row_bytes() {
        let (mut printer, mock) = connected(PrinterType::A6);
        printer.set_concentration(Concentration::Light).unwrap();
        mock.clear_sent();
        printer.print_row_bytes(&[0xAA; 48 * 3]).unwrap();
        let frames = mock.sent_frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..8], &[0x1D, 0x76, 0x30, 0x00, 48, 0, 3, 0]);

        assert!(matches!(
            printer.print_row_bytes(&[0xAA; 47]),
            Err(PeripageError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_ascii_flushed_before_raster() {
        let (mut printer, mock) = connected(PrinterType::A6);
        printer.set_concentration(Concentration::Light).unwrap();
        mock.clear_sent();

        printer.print_ascii("caption").unwrap();
        assert!(mock.sent_frames().is_empty());
        printer.print_break(10).unwrap();

        assert_eq!(
            mock.sent_frames(),
            vec![b"caption\n".to_vec(), vec![0x1B, 0x4A, 10]]
        );
    }

    fn raster_payload(frames: &[Vec<u8>]) -> Vec<u8> {
        frames
            .iter()
            .filter(|f| f.starts_with(&[0x1D, 0x76, 0x30, 0x00]))
            .flat_map(|f| f[8..].iter().copied())
            .collect()
    }

    #[test]
    fn test_txt_file_reduced_with_requested_filter() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"Invoice #12\ntotal: 4.20").unwrap();
        let font = text::load_font(&FontSource::Builtin).unwrap();

        for resample in [ResamplePolicy::Nearest, ResamplePolicy::Box] {
            let (mut printer, mock) = connected(PrinterType::A6);
            let options = TextFileOptions {
                font_size: 12.0,
                line_break: 1,
                packet_delay: Duration::ZERO,
                oversample: 2,
                resample,
                ..Default::default()
            };
            printer.print_txt_file(file.path(), &options).unwrap();

            let layout = TextLayout {
                font_size: 24.0,
                line_break: 2,
            };
            let large =
                text::render_text_gray("Invoice #12\ntotal: 4.20", &font, layout, 768).unwrap();
            let expected = raster::encode_gray(&large, 384, resample, DitherMode::Threshold).unwrap();
            assert_eq!(raster_payload(&mock.sent_frames()), expected.as_bytes(), "{:?}", resample);
        }
    }

    #[test]
    fn test_txt_file_without_oversampling() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"hello").unwrap();
        let (mut printer, mock) = connected(PrinterType::A6);
        let options = TextFileOptions {
            packet_delay: Duration::ZERO,
            oversample: 1,
            ..Default::default()
        };
        printer.print_txt_file(file.path(), &options).unwrap();

        let font = text::load_font(&FontSource::Builtin).unwrap();
        let expected = text::render_text("hello", &font, TextLayout::default(), 384, DitherMode::Threshold)
            .unwrap();
        assert_eq!(raster_payload(&mock.sent_frames()), expected.as_bytes());
    }

    #[test]
    fn test_text_frames_never_exceed_payload() {
        let (mut printer, mock) = connected(PrinterType::A40p);
        let line = "x".repeat(MAX_FRAME_PAYLOAD + 100);
        printer.println_ascii(&line).unwrap();
        let frames = mock.sent_frames();
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|f| f.len() <= MAX_FRAME_PAYLOAD));
        assert_eq!(frames.concat().len(), line.len() + 1);
    }

    #[test]
    fn test_identity_queries() {
        let (mut printer, mock) = connected(PrinterType::A6);
        mock.push_reply(b"PeriPage_A6\x00".to_vec());
        mock.push_reply(b"V2.11".to_vec());
        mock.push_reply(b"SN0042".to_vec());
        mock.push_reply(vec![64]);

        assert_eq!(printer.get_device_name().unwrap(), "PeriPage_A6");
        assert_eq!(printer.get_device_firmware().unwrap(), "V2.11");
        assert_eq!(printer.get_device_serial().unwrap(), "SN0042");
        assert_eq!(printer.get_device_battery().unwrap(), 64);

        let frames = mock.sent_frames();
        assert_eq!(frames[0], [0x10, 0xFF, 0x30, 0x11]);
        assert_eq!(frames[1], [0x10, 0xFF, 0x20, 0xF1]);
        assert_eq!(frames[2], [0x10, 0xFF, 0x20, 0xF2]);
        assert_eq!(frames[3], [0x10, 0xFF, 0x50, 0xF1]);
    }

    #[test]
    fn test_identity_timeout_surfaces() {
        let (mut printer, _mock) = connected(PrinterType::A6);
        let err = printer.get_device_full().unwrap_err();
        assert!(err.is_timeout());
        // Still closable
        printer.disconnect();
        assert_eq!(printer.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_session_disconnects_on_error() {
        let mock = MockTransport::new();
        let mut printer = Printer::with_connector(PrinterType::A6, mock.connector());
        let result: Result<()> = printer.session(MAC, |p| {
            p.reset()?;
            Err(PeripageError::InvalidArgument("boom".to_string()))
        });
        assert!(matches!(result, Err(PeripageError::InvalidArgument(_))));
        assert_eq!(printer.state(), ConnectionState::Closed);
        assert!(mock.is_closed());
    }

    #[test]
    fn test_drop_closes_transport() {
        let (printer, mock) = connected(PrinterType::A6);
        drop(printer);
        assert!(mock.is_closed());
        assert_eq!(mock.close_calls(), 1);
    }

    #[test]
    fn test_refused_connection() {
        let mut printer = Printer::with_connector(PrinterType::A6, MockConnector::refusing());
        assert!(matches!(
            printer.connect(MAC),
            Err(PeripageError::Connection { .. })
        ));
        assert_eq!(printer.state(), ConnectionState::Disconnected);
    }
}
