#![no_std]
#![forbid(unsafe_code)]

//! # Node Scheduler
//!
//! The cooperative main loop of the node firmware. Interrupt handlers, boot
//! code and script code post tasks; the single dispatcher drains them
//! highest priority first and runs each handler to completion before looking
//! at the queue again. No task preempts another.
//!
//! ```text
//!   IDLE --(task queued)--> DISPATCHING --(handler returned)--> IDLE
//! ```
//!
//! A [`Scheduler`] is constructed once by the application root and shared by
//! reference with every producer. Its constructor is `const`, so on bare
//! metal it can live in a `static`.

pub mod config;
pub mod defer;

pub use config::*;
pub use defer::*;
pub use node_task::*;

use core::cell::Cell;
use core::marker::PhantomData;
use critical_section::Mutex;

/// Cooperative priority scheduler.
///
/// - `C`: context handed to every handler, usually the application root that
///   owns this scheduler.
/// - `T`: deferred callable type kept in the callback store.
/// - `Q`: task queue capacity shared by all priority levels.
/// - `H`: number of handler identity slots.
/// - `R`: number of callables that may be pending at once.
pub struct Scheduler<
    C,
    T,
    const Q: usize = DEFAULT_QUEUE_CAPACITY,
    const H: usize = MAX_HANDLERS,
    const R: usize = MAX_CALLBACKS,
> {
    config: SchedulerConfig,
    queue: TaskQueue<Q>,
    handlers: HandlerRegistry<C, H>,
    callbacks: CallbackStore<T, R>,
    running: Mutex<Cell<bool>>,
    _context: PhantomData<fn(&C)>,
}

impl<C, T, const Q: usize, const H: usize, const R: usize> Scheduler<C, T, Q, H, R> {
    /// Create a new scheduler
    pub const fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            queue: TaskQueue::new(),
            handlers: HandlerRegistry::new(),
            callbacks: CallbackStore::new(),
            running: Mutex::new(Cell::new(false)),
            _context: PhantomData,
        }
    }

    /// Returns the scheduler configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Register a handler, or return its existing identity.
    ///
    /// Main context only; registration is not interrupt safe.
    pub fn register<Hd: TaskHandler<C>>(&self) -> NodeResult<HandlerId> {
        self.handlers.register::<Hd>()
    }

    /// Enqueue a task. Safe from any context.
    ///
    /// On success the wake hook runs so an idle main loop notices the task.
    /// `false` means the queue was full and nothing was queued; the caller
    /// owns any cleanup.
    pub fn post(&self, priority: TaskPriority, handler: HandlerId, param: TaskParam) -> bool {
        if !self.queue.post(priority, handler, param) {
            return false;
        }
        if let Some(wake) = self.config.wake_hook {
            wake();
        }
        true
    }

    /// Take the callable behind a callback parameter for its one invocation
    pub fn take_callback(&self, param: TaskParam) -> Option<T> {
        self.callbacks.take(CallbackRef::from_param(param))
    }

    /// The task queue
    pub fn queue(&self) -> &TaskQueue<Q> {
        &self.queue
    }

    /// The handler registry
    pub fn handlers(&self) -> &HandlerRegistry<C, H> {
        &self.handlers
    }

    /// The callback store
    pub fn callbacks(&self) -> &CallbackStore<T, R> {
        &self.callbacks
    }

    /// Dispatch the highest-priority queued task, if any.
    ///
    /// Returns `true` if a task was dequeued. The handler runs outside any
    /// critical section, so it may post further tasks.
    pub fn dispatch_once(&self, ctx: &C) -> bool {
        let Some(task) = self.queue.dequeue_highest() else {
            return false;
        };
        match self.handlers.resolve(task.handler) {
            Some(entry) => {
                log::trace!("[{}] dispatch {} -> {}", self.config.name, task, entry.name());
                entry.invoke(ctx, task.param, task.priority);
            }
            None => {
                log::error!("[{}] dropping {}: handler not registered", self.config.name, task);
            }
        }
        true
    }

    /// Dispatch until the queue is empty; returns the number of tasks run
    pub fn run_until_idle(&self, ctx: &C) -> usize {
        let mut dispatched = 0;
        while self.dispatch_once(ctx) {
            dispatched += 1;
        }
        dispatched
    }

    /// Run the main loop while `keep_running` holds and [`stop`](Self::stop)
    /// has not been called.
    pub fn run_while<F>(&self, ctx: &C, mut keep_running: F)
    where
        F: FnMut() -> bool,
    {
        self.enter_loop();

        while self.is_running() && keep_running() {
            if !self.dispatch_once(ctx) {
                self.on_idle();
            }
        }

        self.set_running(false);
        log::info!("[{}] main loop stopped", self.config.name);
    }

    /// Run the main loop forever
    pub fn run(&self, ctx: &C) -> ! {
        self.enter_loop();

        loop {
            if !self.dispatch_once(ctx) {
                self.on_idle();
            }
        }
    }

    /// Ask [`run_while`](Self::run_while) to return after the current task
    pub fn stop(&self) {
        self.set_running(false);
        if let Some(wake) = self.config.wake_hook {
            wake();
        }
    }

    /// Check if the main loop is running
    pub fn is_running(&self) -> bool {
        critical_section::with(|cs| self.running.borrow(cs).get())
    }

    fn set_running(&self, running: bool) {
        critical_section::with(|cs| self.running.borrow(cs).set(running));
    }

    fn enter_loop(&self) {
        self.set_running(true);
        if !self.config.sleeps_when_idle() {
            log::error!(
                "[{}] no idle hook on this target: the main loop will busy-wait",
                self.config.name
            );
        }
        log::info!("[{}] main loop started", self.config.name);
    }

    /// Idle until something may have been posted.
    ///
    /// Without an idle hook, ARM targets sleep with `wfi` inside a critical
    /// section so a post that landed before the check is still seen. Other
    /// targets have no portable sleep and need a hook; without one this is
    /// a spin-loop hint and the loop start logs an error.
    fn on_idle(&self) {
        if let Some(idle) = self.config.idle_hook {
            idle();
            return;
        }

        #[cfg(target_arch = "arm")]
        critical_section::with(|_| {
            if self.queue.is_empty() {
                cortex_m::asm::wfi();
            }
        });

        #[cfg(not(target_arch = "arm"))]
        core::hint::spin_loop();
    }
}

impl<C, T, const Q: usize, const H: usize, const R: usize> Default for Scheduler<C, T, Q, H, R> {
    fn default() -> Self {
        Self::new(SchedulerConfig::DEFAULT)
    }
}

impl<C, T, const Q: usize, const H: usize, const R: usize> Post for Scheduler<C, T, Q, H, R> {
    fn post(&self, priority: TaskPriority, handler: HandlerId, param: TaskParam) -> bool {
        Scheduler::post(self, priority, handler, param)
    }
}

#[cfg(feature = "defmt")]
impl<C, T, const Q: usize, const H: usize, const R: usize> defmt::Format
    for Scheduler<C, T, Q, H, R>
{
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "Scheduler{{running: {}, queued: {}/{}}}",
            self.is_running(),
            self.queue.len(),
            Q
        );
    }
}
