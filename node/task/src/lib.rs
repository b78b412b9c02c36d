#![no_std]
#![forbid(unsafe_code)]

//! # Node Task
//!
//! The shared structures behind the cooperative scheduler:
//!
//! - [`TaskQueue`]: bounded multi-priority FIFO, safe to post to from
//!   interrupt context.
//! - [`HandlerRegistry`]: fixed table binding handler types to stable
//!   [`HandlerId`]s.
//! - [`CallbackStore`]: one-shot slot arena for deferred callables.
//!
//! Every structure keeps its state behind a `critical_section::Mutex`, so a
//! single shared reference can be handed to interrupt handlers and the main
//! loop alike.

pub mod queue;
pub mod registry;
pub mod store;

pub use node_core::*;
pub use queue::*;
pub use registry::*;
pub use store::*;

/// Default task queue capacity shared by all priority levels
pub const DEFAULT_QUEUE_CAPACITY: usize = 4;

/// Default number of handler identity slots
pub const MAX_HANDLERS: usize = 8;

/// Default number of pending deferred callables
pub const MAX_CALLBACKS: usize = 16;

/// Capability to enqueue work for the main loop.
///
/// This is the only mutation producers need. Implementations must be safe to
/// call from interrupt context: no blocking, no allocation, bounded time. A
/// `false` return is final; the task was not queued and nothing changed.
pub trait Post {
    /// Enqueue `handler(param)` at `priority`
    fn post(&self, priority: TaskPriority, handler: HandlerId, param: TaskParam) -> bool;

    /// Enqueue at [`TaskPriority::Low`]
    fn post_low(&self, handler: HandlerId, param: TaskParam) -> bool {
        self.post(TaskPriority::Low, handler, param)
    }

    /// Enqueue at [`TaskPriority::Medium`]
    fn post_medium(&self, handler: HandlerId, param: TaskParam) -> bool {
        self.post(TaskPriority::Medium, handler, param)
    }

    /// Enqueue at [`TaskPriority::High`]
    fn post_high(&self, handler: HandlerId, param: TaskParam) -> bool {
        self.post(TaskPriority::High, handler, param)
    }
}

impl<P: Post + ?Sized> Post for &P {
    fn post(&self, priority: TaskPriority, handler: HandlerId, param: TaskParam) -> bool {
        (**self).post(priority, handler, param)
    }
}
