//! stdin as the console UART
//!
//! A reader thread plays the receive interrupt: it appends raw bytes to an
//! [`RxBuffer`] and calls a notify function, normally
//! [`ConsoleInput::notify`](node_boot::ConsoleInput::notify). The input
//! handler later drains complete lines from the buffer. Bytes stay buffered
//! when a notify is dropped, so the next successful notify picks them up.

use std::collections::VecDeque;
use std::io::{self, Read};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

/// Default receive buffer size in bytes
pub const RX_BUFFER_SIZE: usize = 1024;

/// Bounded receive buffer shared by the reader thread and the input handler
#[derive(Debug)]
pub struct RxBuffer {
    bytes: Mutex<VecDeque<u8>>,
    capacity: usize,
}

impl RxBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<u8>> {
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append received bytes; returns how many were dropped for lack of room
    pub fn push(&self, data: &[u8]) -> usize {
        let mut bytes = self.lock();
        let room = self.capacity - bytes.len();
        let accepted = data.len().min(room);
        bytes.extend(&data[..accepted]);
        data.len() - accepted
    }

    /// Take the next line without its terminator.
    ///
    /// Without `force` only a terminated line is returned; with `force`
    /// whatever is buffered comes out as a line.
    pub fn take_line(&self, force: bool) -> Option<String> {
        let mut bytes = self.lock();
        let line: Vec<u8> = match bytes.iter().position(|&b| b == b'\n') {
            Some(end) => bytes.drain(..=end).take(end).collect(),
            None if force && !bytes.is_empty() => bytes.drain(..).collect(),
            None => return None,
        };
        let text = String::from_utf8_lossy(&line);
        Some(text.trim_end_matches('\r').to_string())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Default for RxBuffer {
    fn default() -> Self {
        Self::new(RX_BUFFER_SIZE)
    }
}

/// Spawn the receive thread.
///
/// Every chunk read is followed by `notify(false)`; end of input is
/// followed by `notify(true)` so a trailing unterminated line is flushed.
pub fn spawn_reader<R, F>(mut input: R, rx: Arc<RxBuffer>, notify: F) -> io::Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
    F: Fn(bool) -> bool + Send + 'static,
{
    thread::Builder::new().name("uart-rx".into()).spawn(move || {
        let mut chunk = [0u8; 64];
        loop {
            match input.read(&mut chunk) {
                Ok(0) => {
                    log::debug!("console input closed");
                    notify(true);
                    return;
                }
                Ok(n) => {
                    let lost = rx.push(&chunk[..n]);
                    if lost > 0 {
                        log::warn!("rx buffer full, {} bytes lost", lost);
                    }
                    notify(false);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    log::error!("console read failed: {}", err);
                    return;
                }
            }
        }
    })
}
