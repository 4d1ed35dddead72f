//! Deadline-bounded reads and writes on raw file descriptors, shared by the
//! socket and TTY transports.

use std::io;
use std::time::{Duration, Instant};

use crate::error::{PeripageError, Result};

/// How long `read_available` waits for more bytes once the first arrived.
const READ_PAUSE: Duration = Duration::from_millis(50);

/// Wait until `fd` is ready for `events`. `Ok(false)` means the timeout elapsed.
pub(crate) fn poll_ready(fd: i32, events: i16, timeout: Duration) -> io::Result<bool> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let millis = remaining.as_millis().min(i32::MAX as u128) as i32;
        let mut pfd = libc::pollfd {
            fd,
            events,
            revents: 0,
        };
        let rc = unsafe { libc::poll(&mut pfd, 1, millis) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        if rc == 0 {
            return Ok(false);
        }
        if pfd.revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0
            && pfd.revents & events == 0
        {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "connection closed by printer",
            ));
        }
        return Ok(true);
    }
}

/// Write all of `data` within `timeout`.
///
/// `fd` must be non-blocking, otherwise a single `write` can stall past the
/// deadline once the peer stops reading.
pub(crate) fn write_all(fd: i32, data: &[u8], timeout: Duration) -> Result<()> {
    write_all_until(fd, data, Instant::now() + timeout, timeout)
}

/// [`write_all`] against a deadline shared with earlier writes. `timeout` is
/// the bound reported if the deadline passes.
pub(crate) fn write_all_until(
    fd: i32,
    mut data: &[u8],
    deadline: Instant,
    timeout: Duration,
) -> Result<()> {
    let timed_out = || PeripageError::Timeout {
        operation: "send",
        after: timeout,
    };

    while !data.is_empty() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() || !poll_ready(fd, libc::POLLOUT, remaining)? {
            return Err(timed_out());
        }
        let n = unsafe { libc::write(fd, data.as_ptr().cast(), data.len()) };
        if n < 0 {
            let err = io::Error::last_os_error();
            match err.kind() {
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock => continue,
                _ => return Err(PeripageError::Io(err)),
            }
        }
        data = &data[n as usize..];
    }
    Ok(())
}

/// Read up to `max_bytes`: wait `timeout` for the first byte, then keep
/// reading while more arrives without a pause.
pub(crate) fn read_available(fd: i32, max_bytes: usize, timeout: Duration) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(max_bytes.min(4096));
    let mut wait = timeout;

    while out.len() < max_bytes {
        if !poll_ready(fd, libc::POLLIN, wait)? {
            break;
        }
        let mut buf = vec![0u8; max_bytes - out.len()];
        let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
        if n < 0 {
            let err = io::Error::last_os_error();
            match err.kind() {
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock => continue,
                _ => return Err(PeripageError::Io(err)),
            }
        }
        if n == 0 {
            if out.is_empty() {
                return Err(PeripageError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed by printer",
                )));
            }
            break;
        }
        out.extend_from_slice(&buf[..n as usize]);
        wait = READ_PAUSE;
    }

    if out.is_empty() {
        return Err(PeripageError::Timeout {
            operation: "receive",
            after: timeout,
        });
    }
    Ok(out)
}

/// Toggle `O_NONBLOCK`.
pub(crate) fn set_nonblocking(fd: i32, nonblocking: bool) -> io::Result<()> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    let flags = if nonblocking {
        flags | libc::O_NONBLOCK
    } else {
        flags & !libc::O_NONBLOCK
    };
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
