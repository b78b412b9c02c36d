//! Deferred callables: the script-facing "run this later at priority P"

use crate::{CallbackRef, NodeError, NodeResult, Scheduler, TaskHandler, TaskParam, TaskPriority};
use core::marker::PhantomData;

/// A callable that can be stored now and run once from the main loop.
///
/// Implemented for every `FnOnce(&C, TaskPriority)`, including boxed
/// closures. The priority passed in is the one the task was dispatched at.
pub trait Deferred<C: ?Sized> {
    fn call(self, ctx: &C, priority: TaskPriority);
}

impl<C: ?Sized, F> Deferred<C> for F
where
    F: FnOnce(&C, TaskPriority),
{
    fn call(self, ctx: &C, priority: TaskPriority) {
        self(ctx, priority)
    }
}

/// Handler behind every deferred callable: takes the stored callable out of
/// the callback store and runs it.
struct RunDeferred<T, const Q: usize, const H: usize, const R: usize>(PhantomData<fn() -> T>);

impl<C, T, const Q: usize, const H: usize, const R: usize> TaskHandler<C>
    for RunDeferred<T, Q, H, R>
where
    C: AsRef<Scheduler<C, T, Q, H, R>>,
    T: Deferred<C> + 'static,
{
    fn run(ctx: &C, param: TaskParam, priority: TaskPriority) {
        // The descriptor was consumed by the dequeue, so this is the only
        // take for this reference.
        if let Some(callable) = ctx.as_ref().take_callback(param) {
            callable.call(ctx, priority);
        }
    }
}

impl<C, T, const Q: usize, const H: usize, const R: usize> Scheduler<C, T, Q, H, R>
where
    C: AsRef<Self>,
    T: Deferred<C> + 'static,
{
    /// Store `callable` and post a task that runs it once at `priority`.
    ///
    /// The dispatching handler is bound on the first call. If the task
    /// cannot be queued the callable is released here, before returning
    /// [`NodeError::QueueOverflow`], so it can never run later and the
    /// caller has nothing to clean up.
    pub fn defer(&self, priority: TaskPriority, callable: T) -> NodeResult<()> {
        let handler = self.register::<RunDeferred<T, Q, H, R>>()?;
        let param = self.callbacks().store(callable)?.into_param();

        if self.post(priority, handler, param) {
            return Ok(());
        }

        self.callbacks().release(CallbackRef::from_param(param));
        log::warn!("[{}] deferred call at {} dropped: queue full", self.config().name, priority);
        Err(NodeError::QueueOverflow)
    }

    /// [`defer`](Self::defer) with a raw script priority (0 = low, 1 =
    /// medium, 2 = high).
    ///
    /// An out-of-range priority is rejected before anything is stored.
    pub fn defer_raw(&self, priority: u8, callable: T) -> NodeResult<()> {
        let priority = TaskPriority::from_raw(priority)?;
        self.defer(priority, callable)
    }

    /// [`defer`](Self::defer) at the default priority, medium
    pub fn defer_default(&self, callable: T) -> NodeResult<()> {
        self.defer(TaskPriority::default(), callable)
    }
}
