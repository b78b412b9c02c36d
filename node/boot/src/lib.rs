#![no_std]
#![forbid(unsafe_code)]

//! # Node Boot
//!
//! Everything that runs before, or beside, the main loop:
//!
//! - [`BootSequencer`]: brings up the platform, checks persistent storage,
//!   and posts the task that starts the script runtime.
//! - [`ConsoleInput`]: the UART receive path, an interrupt-context producer.
//!
//! Hardware and storage are reached only through the [`Platform`] and
//! [`Storage`] traits; the scheduler only through [`node_task::Post`].

pub mod console;
pub mod sequencer;

pub use console::*;
pub use sequencer::*;

use node_task::NodeResult;

/// Platform bring-up and reset, provided by the board support package
pub trait Platform {
    /// Initialize clocks, pins and peripherals needed by the runtime
    fn init(&mut self) -> NodeResult<()>;

    /// Request a device restart. On hardware this does not come back; hosted
    /// ports return and let the caller run the boot sequence again.
    fn restart(&mut self);
}

/// Persistent storage (flash filesystem) collaborator
pub trait Storage {
    /// Flash size the firmware image was configured for, in bytes
    fn configured_size(&self) -> u32;

    /// Flash size actually present on the device, in bytes
    fn detected_size(&self) -> u32;

    /// Record a new configured flash size
    fn set_configured_size(&mut self, bytes: u32);

    /// Mount the filesystem
    fn mount(&mut self) -> NodeResult<()>;

    /// Reformat the filesystem; leaves it mounted on success
    fn format(&mut self) -> NodeResult<()>;

    /// Unmount the filesystem
    fn unmount(&mut self);
}
