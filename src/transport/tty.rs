//! # Bound RFCOMM TTY Transport
//!
//! Talks to a printer through an RFCOMM device created by `rfcomm bind`.
//! Useful when the process lacks permission to open Bluetooth sockets
//! directly, or on systems where the binding is managed elsewhere.
//!
//! ## Bluetooth Setup (Linux)
//!
//! ```bash
//! # 1. Find the printer's Bluetooth address
//! $ bluetoothctl
//! [bluetooth]# scan on
//! # Look for "PeriPage" and note the address, e.g., 00:15:83:XX:XX:XX
//!
//! # 2. Pair with the printer
//! [bluetooth]# pair 00:15:83:XX:XX:XX
//!
//! # 3. Bind to RFCOMM device
//! $ sudo rfcomm bind 0 00:15:83:XX:XX:XX 1
//! # This creates /dev/rfcomm0
//! ```
//!
//! ## TTY Configuration
//!
//! The device is opened in raw mode so binary raster data passes through
//! unmodified:
//!
//! - **No input processing**: IGNBRK, BRKINT, PARMRK, ISTRIP, INLCR, IGNCR, ICRNL
//! - **No flow control**: IXON, IXOFF, IXANY (0x11 and 0x13 appear in raster data)
//! - **No output processing**: OPOST (no CR/LF translation)
//! - **8-bit characters**: CS8, no parity
//! - **Non-canonical, no echo**: ICANON, ECHO, ECHONL, ISIG, IEXTEN
//!
//! ## Chunked Writes
//!
//! Large frames are written in [`CHUNK_SIZE`] pieces with a short pause
//! between them so the Bluetooth buffer does not overflow.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};

use super::{Transport, TransportTimeouts, fd};
use crate::error::{PeripageError, Result};

/// Default RFCOMM device path
pub const DEFAULT_DEVICE: &str = "/dev/rfcomm0";

/// Default chunk size for writes (bytes)
pub const CHUNK_SIZE: usize = 4096;

/// Delay between chunks (milliseconds)
const CHUNK_DELAY_MS: u64 = 2;

/// # Bound TTY Transport
///
/// ## Example
///
/// ```no_run
/// use std::time::Duration;
/// use peripage::transport::{Transport, TransportTimeouts, TtyTransport};
/// use peripage::protocol::commands;
///
/// let mut tty = TtyTransport::open("/dev/rfcomm0", TransportTimeouts::default())?;
/// tty.send(commands::reset().as_bytes())?;
/// let reply = tty.receive(128, Duration::from_secs(1))?;
/// # Ok::<(), peripage::error::PeripageError>(())
/// ```
pub struct TtyTransport {
    path: PathBuf,
    file: Option<File>,
    send_timeout: Duration,
    chunk_size: usize,
    chunk_delay: Duration,
}

impl TtyTransport {
    /// Open and configure an RFCOMM TTY.
    ///
    /// Opening a bound device makes the kernel establish the Bluetooth link,
    /// which can block; the open is abandoned after `timeouts.connect`.
    ///
    /// ## Errors
    ///
    /// [`PeripageError::Connection`] if the device is missing, permission is
    /// denied, the link does not come up in time, or TTY configuration fails.
    pub fn open<P: AsRef<Path>>(device: P, timeouts: TransportTimeouts) -> Result<Self> {
        let path = device.as_ref().to_path_buf();
        let connection_error = |reason: String| PeripageError::Connection {
            address: path.display().to_string(),
            reason,
        };

        debug!("opening {}", path.display());
        let (tx, rx) = mpsc::channel();
        let open_path = path.clone();
        thread::spawn(move || {
            let result = OpenOptions::new()
                .read(true)
                .write(true)
                .custom_flags(libc::O_NOCTTY)
                .open(&open_path);
            // The receiver is gone if the caller already timed out
            let _ = tx.send(result);
        });

        let file = match rx.recv_timeout(timeouts.connect) {
            Ok(Ok(file)) => file,
            Ok(Err(e)) => return Err(connection_error(e.to_string())),
            Err(_) => {
                return Err(connection_error(format!(
                    "timed out after {:?}",
                    timeouts.connect
                )));
            }
        };

        configure_tty_raw(file.as_raw_fd()).map_err(|e| connection_error(e.to_string()))?;
        // Set after the open: a non-blocking open would not wait for the link
        fd::set_nonblocking(file.as_raw_fd(), true).map_err(|e| connection_error(e.to_string()))?;
        info!("connected to {}", path.display());

        Ok(Self {
            path,
            file: Some(file),
            send_timeout: timeouts.send,
            chunk_size: CHUNK_SIZE,
            chunk_delay: Duration::from_millis(CHUNK_DELAY_MS),
        })
    }

    /// Set the chunk size for large writes. Default is 4096 bytes.
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size.max(1);
    }

    /// Set the delay between chunks. Default is 2ms.
    pub fn set_chunk_delay(&mut self, delay: Duration) {
        self.chunk_delay = delay;
    }

    /// Device path this transport was opened on.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn raw_fd(&self) -> Result<i32> {
        self.file
            .as_ref()
            .map(|f| f.as_raw_fd())
            .ok_or(PeripageError::NotConnected)
    }
}

impl Transport for TtyTransport {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        let fd = self.raw_fd()?;
        if data.len() <= self.chunk_size {
            return fd::write_all(fd, data, self.send_timeout);
        }
        let deadline = Instant::now() + self.send_timeout;
        for chunk in data.chunks(self.chunk_size) {
            fd::write_all_until(fd, chunk, deadline, self.send_timeout)?;
            if !self.chunk_delay.is_zero() {
                thread::sleep(self.chunk_delay);
            }
        }
        Ok(())
    }

    fn receive(&mut self, max_bytes: usize, timeout: Duration) -> Result<Vec<u8>> {
        let fd = self.raw_fd()?;
        fd::read_available(fd, max_bytes, timeout)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            debug!("closing {}", self.path.display());
            drop(file);
        }
        Ok(())
    }
}

impl Drop for TtyTransport {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Configure a file descriptor for raw TTY mode.
fn configure_tty_raw(fd: i32) -> io::Result<()> {
    use std::mem::MaybeUninit;

    let mut termios = MaybeUninit::uninit();
    if unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    let mut termios = unsafe { termios.assume_init() };

    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);
    termios.c_oflag &= !libc::OPOST;
    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
    termios.c_cflag |= libc::CS8;
    // Reads are driven by poll, so never block inside read itself
    termios.c_cc[libc::VMIN] = 0;
    termios.c_cc[libc::VTIME] = 0;

    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_device_path() {
        assert_eq!(DEFAULT_DEVICE, "/dev/rfcomm0");
    }

    #[test]
    fn test_missing_device_is_connection_error() {
        let timeouts = TransportTimeouts {
            connect: Duration::from_secs(2),
            send: Duration::from_secs(1),
        };
        match TtyTransport::open("/dev/rfcomm-does-not-exist", timeouts) {
            Err(PeripageError::Connection { address, .. }) => {
                assert_eq!(address, "/dev/rfcomm-does-not-exist");
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("opened a device that does not exist"),
        }
    }

    #[test]
    fn test_non_tty_is_connection_error() {
        // A regular file opens fine but cannot be put into raw mode
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = TtyTransport::open(file.path(), TransportTimeouts::default());
        assert!(matches!(result, Err(PeripageError::Connection { .. })));
    }
}
