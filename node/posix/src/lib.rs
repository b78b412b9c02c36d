//! POSIX port of the node firmware.
//!
//! Hosts the cooperative scheduler as an ordinary process: the main loop
//! sleeps on a condition variable instead of `wfi`, stdin stands in for the
//! UART, flash is simulated in memory, and log records go to stdout.
//! Critical sections come from the `critical-section` std implementation.

pub mod logger;
pub mod platform;
pub mod port;
pub mod uart;

pub use logger::StdoutLogger;
pub use platform::{HostPlatform, MemStorage};
pub use port::{
    idle, install_shutdown_handler, request_shutdown, scheduler_config, shutdown_requested, wake,
};
pub use uart::{spawn_reader, RxBuffer};
