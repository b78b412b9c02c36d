#![no_std]
#![forbid(unsafe_code)]

//! # Node Core
//!
//! Core types shared by every layer of the node firmware scheduler: task
//! priorities, the single-word task parameter, handler identities, callback
//! references and the error type.
//!
//! Nothing in this crate touches interrupts or shared state; the types here
//! are plain values that can be copied in and out of critical sections.

#[cfg(feature = "std")]
extern crate std;

use core::fmt;

pub mod priority;
pub mod task;

pub use priority::*;
pub use task::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type used throughout the scheduler
pub type NodeResult<T> = Result<T, NodeError>;

/// Error types for scheduler, callback store and boot operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeError {
    /// Task queue is full; the task was not posted
    QueueOverflow,
    /// Every handler identity slot is taken
    HandlerTableFull,
    /// Every callback slot is taken
    CallbackStoreFull,
    /// Callback reference was already taken, released, or never stored
    StaleCallbackRef,
    /// Raw priority outside LOW..=HIGH
    InvalidPriority,
    /// Platform bring-up failed
    PlatformInit,
    /// Persistent storage operation failed
    Storage,
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeError::QueueOverflow => write!(f, "Task queue overflow. Task not posted"),
            NodeError::HandlerTableFull => write!(f, "Handler table is full"),
            NodeError::CallbackStoreFull => write!(f, "Callback store is full"),
            NodeError::StaleCallbackRef => write!(f, "Stale callback reference"),
            NodeError::InvalidPriority => write!(f, "Invalid priority"),
            NodeError::PlatformInit => write!(f, "Can not init platform"),
            NodeError::Storage => write!(f, "Storage operation failed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for NodeError {}

#[cfg(feature = "defmt")]
impl defmt::Format for NodeError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            NodeError::QueueOverflow => defmt::write!(fmt, "QueueOverflow"),
            NodeError::HandlerTableFull => defmt::write!(fmt, "HandlerTableFull"),
            NodeError::CallbackStoreFull => defmt::write!(fmt, "CallbackStoreFull"),
            NodeError::StaleCallbackRef => defmt::write!(fmt, "StaleCallbackRef"),
            NodeError::InvalidPriority => defmt::write!(fmt, "InvalidPriority"),
            NodeError::PlatformInit => defmt::write!(fmt, "PlatformInit"),
            NodeError::Storage => defmt::write!(fmt, "Storage"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_message_matches_script_error() {
        let mut buf = [0u8; 64];
        let mut w = Writer { buf: &mut buf, len: 0 };
        fmt::write(&mut w, format_args!("{}", NodeError::QueueOverflow)).unwrap();
        let len = w.len;
        assert_eq!(&buf[..len], b"Task queue overflow. Task not posted");
    }

    struct Writer<'a> {
        buf: &'a mut [u8],
        len: usize,
    }

    impl fmt::Write for Writer<'_> {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            let end = self.len + s.len();
            if end > self.buf.len() {
                return Err(fmt::Error);
            }
            self.buf[self.len..end].copy_from_slice(s.as_bytes());
            self.len = end;
            Ok(())
        }
    }
}
