//! Console input: the UART receive interrupt's producer side

use core::cell::Cell;
use critical_section::Mutex;
use node_task::{HandlerId, Post, TaskParam};

/// Hands received console input to the main loop.
///
/// Called from the UART receive interrupt. Each call posts one low-priority
/// task for the input handler, carrying a `force` flag (process the buffered
/// line even without a terminator). A rejected post is final: the event is
/// counted, logged and dropped, never retried from interrupt context.
pub struct ConsoleInput {
    handler: HandlerId,
    dropped: Mutex<Cell<u32>>,
}

impl ConsoleInput {
    /// Producer for the registered input handler
    pub const fn new(handler: HandlerId) -> Self {
        Self {
            handler,
            dropped: Mutex::new(Cell::new(0)),
        }
    }

    /// Identity of the input handler this producer posts to
    pub fn handler(&self) -> HandlerId {
        self.handler
    }

    /// Signal that input is waiting. Returns `false` if the event was dropped.
    pub fn notify<Q: Post + ?Sized>(&self, scheduler: &Q, force: bool) -> bool {
        if scheduler.post_low(self.handler, TaskParam::from(force)) {
            return true;
        }
        let dropped = critical_section::with(|cs| {
            let counter = self.dropped.borrow(cs);
            counter.set(counter.get().saturating_add(1));
            counter.get()
        });
        log::warn!("console input dropped: task queue full ({} so far)", dropped);
        false
    }

    /// Number of input events dropped because the queue was full
    pub fn dropped(&self) -> u32 {
        critical_section::with(|cs| self.dropped.borrow(cs).get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use node_task::{TaskPriority, TaskQueue};

    #[test]
    fn test_notify_posts_low_with_force_flag() {
        let queue: TaskQueue<2> = TaskQueue::new();
        let console = ConsoleInput::new(HandlerId::from_index(1));

        assert!(console.notify(&queue, true));

        let task = queue.dequeue_highest().unwrap();
        assert_eq!(task.priority, TaskPriority::Low);
        assert_eq!(task.handler, console.handler());
        assert!(task.param.as_bool());
    }

    #[test]
    fn test_full_queue_drops_without_retry() {
        let queue: TaskQueue<1> = TaskQueue::new();
        let console = ConsoleInput::new(HandlerId::from_index(1));

        assert!(console.notify(&queue, false));
        assert!(!console.notify(&queue, false));
        assert!(!console.notify(&queue, true));

        assert_eq!(console.dropped(), 2);
        assert_eq!(queue.len(), 1);
        assert!(!queue.dequeue_highest().unwrap().param.as_bool());
    }
}
