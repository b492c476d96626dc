/*!
 * Execution Model Integration Tests
 *
 * Pool provisioning, draining on release and per-task worker accounting
 */

use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use sync_burst::execution::{BoundedPool, PerTaskPool};
use sync_burst::{ExecutionModelKind, HarnessError, WorkerPool};

fn counting_job(counter: &Arc<AtomicUsize>, dwell: Duration) -> Box<dyn FnOnce() + Send> {
    let counter = counter.clone();
    Box::new(move || {
        thread::sleep(dwell);
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn test_bounded_release_drains_in_flight_work() {
    let mut pool = BoundedPool::new(2).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..10 {
        pool.submit(counting_job(&counter, Duration::from_millis(5)))
            .unwrap();
    }

    // Released immediately after submission: queued jobs still run
    pool.release();
    assert!(pool.is_released());
    assert_eq!(counter.load(Ordering::SeqCst), 10);
    assert_eq!(pool.stats().completed, 10);
}

#[test]
fn test_per_task_release_drains_in_flight_work() {
    let mut pool = PerTaskPool::new(2).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..12 {
        pool.submit(counting_job(&counter, Duration::from_millis(2)))
            .unwrap();
    }

    pool.release();
    assert!(pool.is_released());
    assert_eq!(counter.load(Ordering::SeqCst), 12);
    assert_eq!(pool.in_flight(), 0);
}

#[test]
fn test_submit_after_release_is_rejected() {
    for kind in ExecutionModelKind::ALL {
        let mut pool = WorkerPool::acquire(kind, 1).unwrap();
        pool.release();
        let result = pool.submit(Box::new(|| {}));
        assert!(matches!(result, Err(HarnessError::PoolReleased(_))), "{}", kind);
    }
}

#[test]
fn test_provisioned_workers_by_model() {
    let counter = Arc::new(AtomicUsize::new(0));

    let mut bounded = WorkerPool::acquire(ExecutionModelKind::BoundedPool, 3).unwrap();
    let mut per_task = WorkerPool::acquire(ExecutionModelKind::PerTaskUnbounded, 3).unwrap();
    for _ in 0..9 {
        bounded.submit(counting_job(&counter, Duration::ZERO)).unwrap();
        per_task.submit(counting_job(&counter, Duration::ZERO)).unwrap();
    }
    bounded.release();
    per_task.release();

    // Fixed threads versus one worker per submission
    assert_eq!(bounded.stats().provisioned_workers, 3);
    assert_eq!(per_task.stats().provisioned_workers, 9);
    assert_eq!(counter.load(Ordering::SeqCst), 18);
}

#[test]
fn test_per_task_in_flight_exceeds_capacity() {
    let capacity = 2;
    let mut pool = PerTaskPool::new(capacity).unwrap();
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    for _ in 0..32 {
        let current = current.clone();
        let peak = peak.clone();
        pool.spawn(async move {
            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            current.fetch_sub(1, Ordering::SeqCst);
        })
        .unwrap();
    }

    // Released with every task still suspended: all of them finish
    pool.release();
    assert!(peak.load(Ordering::SeqCst) > capacity);
    assert_eq!(peak.load(Ordering::SeqCst), 32);
    assert_eq!(current.load(Ordering::SeqCst), 0);

    let stats = pool.stats();
    assert_eq!(stats.worker_capacity, capacity);
    assert_eq!(stats.provisioned_workers, 32);
    assert_eq!(stats.completed, 32);
}
