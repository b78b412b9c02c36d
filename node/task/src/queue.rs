//! Priority task queue shared between interrupt producers and the main loop

use crate::{HandlerId, Post, TaskDescriptor, TaskParam, TaskPriority, PRIORITY_LEVELS};
use core::cell::RefCell;
use critical_section::Mutex;
use heapless::{Deque, Vec};

/// Task queue occupancy statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    /// Total number of slots shared by all levels
    pub capacity: usize,
    /// Number of tasks currently queued
    pub queued: usize,
    /// Highest number of tasks ever queued at once
    pub high_water: usize,
    /// Number of posts rejected because the queue was full
    pub overflows: u32,
}

struct Lanes<const N: usize> {
    /// One FIFO per level, indexed by [`TaskPriority::index`]
    lanes: [Deque<TaskDescriptor, N>; PRIORITY_LEVELS],
    queued: usize,
    high_water: usize,
    overflows: u32,
}

impl<const N: usize> Lanes<N> {
    const fn new() -> Self {
        Self {
            lanes: [Deque::new(), Deque::new(), Deque::new()],
            queued: 0,
            high_water: 0,
            overflows: 0,
        }
    }

    fn push(&mut self, task: TaskDescriptor) -> bool {
        if self.queued >= N {
            self.overflows = self.overflows.saturating_add(1);
            return false;
        }
        // Each lane holds N, and the shared count is below N, so this cannot fail.
        if self.lanes[task.priority.index()].push_back(task).is_err() {
            self.overflows = self.overflows.saturating_add(1);
            return false;
        }
        self.queued += 1;
        if self.queued > self.high_water {
            self.high_water = self.queued;
        }
        true
    }

    fn pop_highest(&mut self) -> Option<TaskDescriptor> {
        for priority in TaskPriority::DESCENDING {
            if let Some(task) = self.lanes[priority.index()].pop_front() {
                self.queued -= 1;
                return Some(task);
            }
        }
        None
    }
}

/// Bounded multi-priority FIFO of pending tasks.
///
/// `N` slots are shared across all priority levels. Posting takes a single
/// short critical section and never blocks or allocates, so it may be called
/// from interrupt handlers while the main loop is dequeuing.
///
/// Dequeuing is strict-priority: while a `High` task is queued no `Medium`
/// or `Low` task is returned. Lower levels can starve under sustained
/// higher-priority load.
pub struct TaskQueue<const N: usize> {
    inner: Mutex<RefCell<Lanes<N>>>,
}

impl<const N: usize> TaskQueue<N> {
    /// Create a new empty task queue
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Lanes::new())),
        }
    }

    /// Enqueue a task descriptor.
    ///
    /// Returns `false` and leaves the queue untouched when all `N` slots are
    /// in use.
    pub fn post(&self, priority: TaskPriority, handler: HandlerId, param: TaskParam) -> bool {
        let task = TaskDescriptor::new(priority, handler, param);
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).push(task))
    }

    /// Remove the oldest task of the highest non-empty level
    pub fn dequeue_highest(&self) -> Option<TaskDescriptor> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).pop_highest())
    }

    /// Number of queued tasks across all levels
    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.inner.borrow_ref(cs).queued)
    }

    /// Check if no task is queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if a post would be rejected
    pub fn is_full(&self) -> bool {
        self.len() >= N
    }

    /// Get the maximum number of queued tasks
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of tasks queued at one level
    pub fn pending(&self, priority: TaskPriority) -> usize {
        critical_section::with(|cs| self.inner.borrow_ref(cs).lanes[priority.index()].len())
    }

    /// Copy of the queued tasks in the order they would be dispatched
    pub fn snapshot(&self) -> Vec<TaskDescriptor, N> {
        critical_section::with(|cs| {
            let lanes = self.inner.borrow_ref(cs);
            let mut out = Vec::new();
            for priority in TaskPriority::DESCENDING {
                for task in lanes.lanes[priority.index()].iter() {
                    // out has room for N and at most N tasks are queued
                    let _ = out.push(*task);
                }
            }
            out
        })
    }

    /// Get occupancy statistics
    pub fn stats(&self) -> QueueStats {
        critical_section::with(|cs| {
            let lanes = self.inner.borrow_ref(cs);
            QueueStats {
                capacity: N,
                queued: lanes.queued,
                high_water: lanes.high_water,
                overflows: lanes.overflows,
            }
        })
    }
}

impl<const N: usize> Default for TaskQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Post for TaskQueue<N> {
    fn post(&self, priority: TaskPriority, handler: HandlerId, param: TaskParam) -> bool {
        TaskQueue::post(self, priority, handler, param)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for QueueStats {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "QueueStats{{ capacity: {}, queued: {}, high_water: {}, overflows: {} }}",
            self.capacity,
            self.queued,
            self.high_water,
            self.overflows
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const H1: HandlerId = HandlerId::from_index(1);
    const H2: HandlerId = HandlerId::from_index(2);

    fn param(c: u8) -> TaskParam {
        TaskParam::from(c)
    }

    #[test]
    fn test_priority_major_fifo_minor() {
        let queue: TaskQueue<4> = TaskQueue::new();

        assert!(queue.post(TaskPriority::High, H1, param(b'a')));
        assert!(queue.post(TaskPriority::Low, H2, param(b'b')));
        assert!(queue.post(TaskPriority::High, H1, param(b'c')));

        let order = [
            queue.dequeue_highest().unwrap(),
            queue.dequeue_highest().unwrap(),
            queue.dequeue_highest().unwrap(),
        ];
        assert_eq!((order[0].handler, order[0].param), (H1, param(b'a')));
        assert_eq!((order[1].handler, order[1].param), (H1, param(b'c')));
        assert_eq!((order[2].handler, order[2].param), (H2, param(b'b')));
        assert_eq!(queue.dequeue_highest(), None);
    }

    #[test]
    fn test_overflow_leaves_queue_unchanged() {
        let queue: TaskQueue<2> = TaskQueue::new();

        assert!(queue.post(TaskPriority::Low, H1, param(1)));
        assert!(queue.post(TaskPriority::Medium, H2, param(2)));
        let before = queue.snapshot();

        assert!(queue.is_full());
        assert!(!queue.post(TaskPriority::High, H1, param(3)));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.snapshot(), before);
        assert_eq!(queue.pending(TaskPriority::High), 0);
    }

    #[test]
    fn test_capacity_is_shared_across_levels() {
        let queue: TaskQueue<3> = TaskQueue::new();

        assert!(queue.post(TaskPriority::Low, H1, param(0)));
        assert!(queue.post(TaskPriority::Medium, H1, param(0)));
        assert!(queue.post(TaskPriority::High, H1, param(0)));
        assert!(!queue.post(TaskPriority::Low, H1, param(0)));

        assert!(queue.dequeue_highest().is_some());
        assert!(queue.post(TaskPriority::Low, H1, param(0)));
    }

    #[test]
    fn test_stats_track_high_water_and_overflow() {
        let queue: TaskQueue<2> = TaskQueue::new();

        queue.post(TaskPriority::Low, H1, param(0));
        queue.post(TaskPriority::Low, H1, param(0));
        queue.post(TaskPriority::Low, H1, param(0));
        queue.dequeue_highest();

        let stats = queue.stats();
        assert_eq!(stats.capacity, 2);
        assert_eq!(stats.queued, 1);
        assert_eq!(stats.high_water, 2);
        assert_eq!(stats.overflows, 1);
    }
}
