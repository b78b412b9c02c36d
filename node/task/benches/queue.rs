use criterion::{black_box, criterion_group, criterion_main, Criterion};
use node_task::{CallbackStore, HandlerId, TaskParam, TaskPriority, TaskQueue};

fn bench_post_dequeue(c: &mut Criterion) {
    let queue: TaskQueue<32> = TaskQueue::new();
    let handler = HandlerId::from_index(0);

    c.bench_function("post_then_dequeue_mixed_priorities", |b| {
        b.iter(|| {
            for (i, priority) in TaskPriority::DESCENDING.iter().cycle().take(24).enumerate() {
                queue.post(*priority, handler, TaskParam::new(i));
            }
            while let Some(task) = queue.dequeue_highest() {
                black_box(task);
            }
        })
    });
}

fn bench_store_take(c: &mut Criterion) {
    let store: CallbackStore<u64, 16> = CallbackStore::new();

    c.bench_function("callback_store_then_take", |b| {
        b.iter(|| {
            if let Ok(key) = store.store(black_box(42)) {
                black_box(store.take(key));
            }
        })
    });
}

criterion_group!(benches, bench_post_dequeue, bench_store_take);
criterion_main!(benches);
