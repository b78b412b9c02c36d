//! Idle and wake hooks for a hosted main loop
//!
//! A post from any thread sets a pending flag and signals a condition
//! variable; the idle hook waits on it. The flag is only cleared by the
//! idle hook, so a wake that lands between the dispatcher's empty-queue
//! check and its wait is never lost.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use node_sched::SchedulerConfig;

/// Upper bound on one idle wait, so shutdown is noticed even without a wake
const IDLE_TIMEOUT: Duration = Duration::from_millis(100);

static PENDING: Mutex<bool> = Mutex::new(false);
static SIGNAL: Condvar = Condvar::new();
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

fn pending() -> MutexGuard<'static, bool> {
    PENDING.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Wake hook: mark work pending and wake the main loop
pub fn wake() {
    let mut pending = pending();
    *pending = true;
    SIGNAL.notify_one();
}

/// Idle hook: block until woken or the idle timeout passes
pub fn idle() {
    let mut pending = pending();
    if !*pending {
        pending = match SIGNAL.wait_timeout(pending, IDLE_TIMEOUT) {
            Ok((guard, _)) => guard,
            Err(poisoned) => poisoned.into_inner().0,
        };
    }
    *pending = false;
}

/// Scheduler configuration wired to this port's hooks
pub const fn scheduler_config(name: &'static str) -> SchedulerConfig {
    SchedulerConfig::builder()
        .name(name)
        .idle_hook(idle)
        .wake_hook(wake)
        .build()
}

/// Ask the main loop to wind down
pub fn request_shutdown() {
    SHUTDOWN.store(true, Ordering::SeqCst);
    wake();
}

/// Check whether shutdown was requested
pub fn shutdown_requested() -> bool {
    SHUTDOWN.load(Ordering::SeqCst)
}

/// Route Ctrl-C to [`request_shutdown`]
pub fn install_shutdown_handler() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(|| {
        log::info!("interrupt received, shutting down");
        request_shutdown();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_port_hooks() {
        // One test: the hooks share process-wide state.

        // wake before idle is not lost
        wake();
        let start = Instant::now();
        idle();
        assert!(start.elapsed() < IDLE_TIMEOUT);

        // wake from another thread ends the wait
        let waker = thread::spawn(|| {
            thread::sleep(Duration::from_millis(5));
            wake();
        });
        idle();
        waker.join().unwrap();

        // without a wake the wait still returns
        let start = Instant::now();
        idle();
        assert!(start.elapsed() < IDLE_TIMEOUT * 20);

        assert!(!shutdown_requested());
        request_shutdown();
        assert!(shutdown_requested());
    }

    #[test]
    fn test_scheduler_config_uses_port_hooks() {
        let config = scheduler_config("host");
        assert_eq!(config.name, "host");
        assert!(config.idle_hook.is_some());
        assert!(config.wake_hook.is_some());
    }
}
