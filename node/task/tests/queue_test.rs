//! Task queue tests for node-task, including posts from another thread
//! standing in for an interrupt handler.

use node_task::{HandlerId, Post, TaskParam, TaskPriority, TaskQueue};
use std::thread;

#[test]
fn test_dispatch_order_for_interleaved_posts() {
    let queue: TaskQueue<8> = TaskQueue::new();
    let h = HandlerId::from_index(0);

    let posts = [
        (TaskPriority::Low, 1),
        (TaskPriority::Medium, 2),
        (TaskPriority::High, 3),
        (TaskPriority::Low, 4),
        (TaskPriority::High, 5),
        (TaskPriority::Medium, 6),
    ];
    for (priority, value) in posts {
        assert!(queue.post(priority, h, TaskParam::new(value)));
    }

    let drained: Vec<usize> = std::iter::from_fn(|| queue.dequeue_highest())
        .map(|task| task.param.raw())
        .collect();
    assert_eq!(drained, vec![3, 5, 2, 6, 1, 4]);
}

#[test]
fn test_post_trait_helpers() {
    let queue: TaskQueue<4> = TaskQueue::new();
    let producer: &dyn Post = &queue;
    let h = HandlerId::from_index(2);

    assert!(producer.post_low(h, TaskParam::new(1)));
    assert!(producer.post_high(h, TaskParam::new(2)));
    assert!(producer.post_medium(h, TaskParam::new(3)));

    assert_eq!(queue.pending(TaskPriority::Low), 1);
    assert_eq!(queue.pending(TaskPriority::Medium), 1);
    assert_eq!(queue.pending(TaskPriority::High), 1);
    assert_eq!(queue.dequeue_highest().unwrap().param, TaskParam::new(2));
}

#[test]
fn test_concurrent_producer_never_exceeds_capacity() {
    const CAP: usize = 4;
    let queue: TaskQueue<CAP> = TaskQueue::new();
    let h = HandlerId::from_index(1);

    let accepted = thread::scope(|s| {
        let producer = s.spawn(|| {
            let mut accepted = Vec::new();
            for i in 0..1000usize {
                if queue.post(TaskPriority::Medium, h, TaskParam::new(i)) {
                    accepted.push(i);
                }
            }
            accepted
        });

        let mut consumed = Vec::new();
        while !producer.is_finished() || !queue.is_empty() {
            assert!(queue.len() <= CAP);
            if let Some(task) = queue.dequeue_highest() {
                consumed.push(task.param.raw());
            }
        }
        let accepted = producer.join().unwrap();
        while let Some(task) = queue.dequeue_highest() {
            consumed.push(task.param.raw());
        }
        assert_eq!(consumed, accepted);
        accepted
    });

    assert!(!accepted.is_empty());
    let stats = queue.stats();
    assert!(stats.high_water <= CAP);
    assert_eq!(stats.overflows as usize, 1000 - accepted.len());
}
