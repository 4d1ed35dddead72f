//! # RFCOMM Socket Transport
//!
//! Opens a Bluetooth RFCOMM stream socket straight to the printer's MAC
//! address, without a `/dev/rfcommN` binding. The device must already be
//! paired.
//!
//! ## Address Layout
//!
//! BlueZ stores `bdaddr_t` little-endian, so `AA:BB:CC:DD:EE:FF` goes on the
//! wire as `FF EE DD CC BB AA`.
//!
//! ## Connect Timeout
//!
//! The socket connects non-blocking and waits for writability with `poll`,
//! so an out-of-range printer fails after the configured timeout instead of
//! the kernel's much longer default.

use std::time::Duration;

use log::{debug, info};

use super::{Transport, TransportTimeouts};
use crate::error::{PeripageError, Result};

/// BlueZ protocol number for RFCOMM.
pub const BTPROTO_RFCOMM: i32 = 3;

/// `struct sockaddr_rc` from `<bluetooth/rfcomm.h>`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct SockaddrRc {
    rc_family: libc::sa_family_t,
    rc_bdaddr: [u8; 6],
    rc_channel: u8,
}

/// Convert a written MAC (most significant byte first) to `bdaddr_t` order.
pub fn bdaddr(mac: [u8; 6]) -> [u8; 6] {
    let mut out = mac;
    out.reverse();
    out
}

fn format_mac(mac: [u8; 6]) -> String {
    mac.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// A connected RFCOMM stream socket.
pub struct RfcommSocket {
    address: String,
    fd: Option<std::os::fd::OwnedFd>,
    send_timeout: Duration,
}

impl RfcommSocket {
    /// Connect to `mac` on `channel`.
    ///
    /// ## Errors
    ///
    /// [`PeripageError::Connection`] if the socket cannot be created, the
    /// device refuses or is unreachable, or `timeouts.connect` elapses.
    #[cfg(target_os = "linux")]
    pub fn connect(mac: [u8; 6], channel: u8, timeouts: TransportTimeouts) -> Result<Self> {
        use std::io;
        use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

        use super::fd;

        let address = format_mac(mac);
        let connection_error = |reason: String| PeripageError::Connection {
            address: address.clone(),
            reason,
        };

        debug!("opening RFCOMM socket to {} channel {}", address, channel);
        let raw = unsafe {
            libc::socket(
                libc::AF_BLUETOOTH,
                libc::SOCK_STREAM | libc::SOCK_CLOEXEC,
                BTPROTO_RFCOMM,
            )
        };
        if raw < 0 {
            return Err(connection_error(format!(
                "socket: {}",
                io::Error::last_os_error()
            )));
        }
        let owned = unsafe { OwnedFd::from_raw_fd(raw) };
        let sock = owned.as_raw_fd();

        fd::set_nonblocking(sock, true).map_err(|e| connection_error(e.to_string()))?;

        let addr = SockaddrRc {
            rc_family: libc::AF_BLUETOOTH as libc::sa_family_t,
            rc_bdaddr: bdaddr(mac),
            rc_channel: channel,
        };
        let rc = unsafe {
            libc::connect(
                sock,
                (&addr as *const SockaddrRc).cast::<libc::sockaddr>(),
                std::mem::size_of::<SockaddrRc>() as libc::socklen_t,
            )
        };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::EINPROGRESS) {
                return Err(connection_error(err.to_string()));
            }
            let ready = fd::poll_ready(sock, libc::POLLOUT, timeouts.connect)
                .map_err(|e| connection_error(e.to_string()))?;
            if !ready {
                return Err(connection_error(format!(
                    "timed out after {:?}",
                    timeouts.connect
                )));
            }
            let pending = socket_error(sock).map_err(|e| connection_error(e.to_string()))?;
            if pending != 0 {
                return Err(connection_error(
                    io::Error::from_raw_os_error(pending).to_string(),
                ));
            }
        }

        // Stays non-blocking so sends honour their deadline
        info!("connected to {}", address);

        Ok(Self {
            address,
            fd: Some(owned),
            send_timeout: timeouts.send,
        })
    }

    #[cfg(not(target_os = "linux"))]
    pub fn connect(mac: [u8; 6], _channel: u8, _timeouts: TransportTimeouts) -> Result<Self> {
        Err(PeripageError::Connection {
            address: format_mac(mac),
            reason: "RFCOMM sockets are only supported on Linux".to_string(),
        })
    }

    /// Printer address as `XX:XX:XX:XX:XX:XX`.
    pub fn address(&self) -> &str {
        &self.address
    }

    fn raw_fd(&self) -> Result<i32> {
        use std::os::fd::AsRawFd;

        self.fd
            .as_ref()
            .map(|fd| fd.as_raw_fd())
            .ok_or(PeripageError::NotConnected)
    }
}

/// Read and clear `SO_ERROR` after a non-blocking connect.
#[cfg(target_os = "linux")]
fn socket_error(sock: i32) -> std::io::Result<i32> {
    let mut value: libc::c_int = 0;
    let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;
    let rc = unsafe {
        libc::getsockopt(
            sock,
            libc::SOL_SOCKET,
            libc::SO_ERROR,
            (&mut value as *mut libc::c_int).cast(),
            &mut len,
        )
    };
    if rc < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(value)
}

impl Transport for RfcommSocket {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        super::fd::write_all(self.raw_fd()?, data, self.send_timeout)
    }

    fn receive(&mut self, max_bytes: usize, timeout: Duration) -> Result<Vec<u8>> {
        super::fd::read_available(self.raw_fd()?, max_bytes, timeout)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(fd) = self.fd.take() {
            debug!("closing RFCOMM socket to {}", self.address);
            drop(fd);
        }
        Ok(())
    }
}

impl Drop for RfcommSocket {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
