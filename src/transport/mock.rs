//! # In-Memory Transport
//!
//! A [`Transport`] that records every `send` as one frame and answers
//! `receive` from a queue of canned replies. Cloned handles share state, so a
//! test keeps one handle while the printer owns another.
//!
//! ```
//! use peripage::transport::{MockTransport, Transport};
//! use std::time::Duration;
//!
//! let mock = MockTransport::new().with_reply(b"P\x00".to_vec());
//! let mut handle = mock.clone();
//! handle.send(&[0x10, 0xFF]).unwrap();
//! assert_eq!(mock.sent_frames(), vec![vec![0x10, 0xFF]]);
//! assert_eq!(handle.receive(8, Duration::ZERO).unwrap(), b"P\x00");
//! ```

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{Address, Connect, Transport, TransportTimeouts};
use crate::error::{PeripageError, Result};

#[derive(Debug, Default)]
struct MockState {
    sent: Vec<Vec<u8>>,
    replies: VecDeque<Vec<u8>>,
    closed: bool,
    close_calls: usize,
    /// Number of sends that succeed before every further send fails
    fail_sends_after: Option<usize>,
}

/// Recording transport for tests.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for the next `receive`.
    pub fn with_reply(self, reply: Vec<u8>) -> Self {
        self.push_reply(reply);
        self
    }

    pub fn push_reply(&self, reply: Vec<u8>) {
        self.lock().replies.push_back(reply);
    }

    /// Let `n` more sends succeed, then fail every send with a broken pipe.
    pub fn fail_sends_after(&self, n: usize) {
        let mut state = self.lock();
        state.fail_sends_after = Some(state.sent.len() + n);
    }

    /// Every frame sent so far, in order.
    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        self.lock().sent.clone()
    }

    /// All sent bytes concatenated.
    pub fn sent_bytes(&self) -> Vec<u8> {
        self.lock().sent.concat()
    }

    pub fn clear_sent(&self) {
        self.lock().sent.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn close_calls(&self) -> usize {
        self.lock().close_calls
    }

    /// A connector that hands out this transport.
    pub fn connector(&self) -> MockConnector {
        MockConnector::new(self.clone())
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for MockTransport {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut state = self.lock();
        if state.closed {
            return Err(PeripageError::NotConnected);
        }
        if state.fail_sends_after.is_some_and(|limit| state.sent.len() >= limit) {
            return Err(PeripageError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "mock transport send failure",
            )));
        }
        state.sent.push(data.to_vec());
        Ok(())
    }

    fn receive(&mut self, max_bytes: usize, timeout: Duration) -> Result<Vec<u8>> {
        let mut state = self.lock();
        if state.closed {
            return Err(PeripageError::NotConnected);
        }
        match state.replies.pop_front() {
            Some(mut reply) => {
                if reply.len() > max_bytes {
                    let rest = reply.split_off(max_bytes);
                    state.replies.push_front(rest);
                }
                Ok(reply)
            }
            None => Err(PeripageError::Timeout {
                operation: "receive",
                after: timeout,
            }),
        }
    }

    fn close(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.close_calls += 1;
        state.closed = true;
        Ok(())
    }
}

/// Connector that returns a shared [`MockTransport`], or a canned failure.
#[derive(Debug, Clone)]
pub struct MockConnector {
    transport: MockTransport,
    failure: Option<Failure>,
    opens: Arc<Mutex<usize>>,
}

#[derive(Debug, Clone, Copy)]
enum Failure {
    Timeout,
    Refused,
}

impl MockConnector {
    pub fn new(transport: MockTransport) -> Self {
        Self {
            transport,
            failure: None,
            opens: Arc::new(Mutex::new(0)),
        }
    }

    /// Every open fails as if the device never answered.
    pub fn timing_out() -> Self {
        Self {
            failure: Some(Failure::Timeout),
            ..Self::new(MockTransport::new())
        }
    }

    /// Every open fails as if the device refused the link.
    pub fn refusing() -> Self {
        Self {
            failure: Some(Failure::Refused),
            ..Self::new(MockTransport::new())
        }
    }

    /// Number of `open` calls so far, failed or not.
    pub fn opens(&self) -> usize {
        *self.opens.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Connect for MockConnector {
    fn open(&self, address: &Address, timeouts: TransportTimeouts) -> Result<Box<dyn Transport>> {
        *self.opens.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        match self.failure {
            Some(Failure::Timeout) => Err(PeripageError::Timeout {
                operation: "connect",
                after: timeouts.connect,
            }),
            Some(Failure::Refused) => Err(PeripageError::Connection {
                address: address.to_string(),
                reason: "connection refused".to_string(),
            }),
            None => {
                let transport = self.transport.clone();
                transport.lock().closed = false;
                Ok(Box::new(transport))
            }
        }
    }
}
