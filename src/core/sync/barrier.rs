/*!
 * Completion Barrier
 *
 * Count-down latch the coordinator blocks on until every task of a burst
 * has signaled. Atomic counter on the hot path, parking_lot condvar for the
 * single waiter, no polling.
 */

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::error;

/// Count-down latch initialised to the burst size
///
/// # Invariant
///
/// Each task decrements exactly once. Decrements past zero are refused and
/// tallied as overruns so a double signal is visible instead of wrapping.
pub struct CompletionBarrier {
    initial: usize,
    remaining: AtomicUsize,
    overruns: AtomicUsize,
    lock: Mutex<()>,
    opened: Condvar,
}

impl CompletionBarrier {
    pub fn new(count: usize) -> Self {
        Self {
            initial: count,
            remaining: AtomicUsize::new(count),
            overruns: AtomicUsize::new(0),
            lock: Mutex::new(()),
            opened: Condvar::new(),
        }
    }

    /// Signal one completion
    ///
    /// Returns false if the barrier had already reached zero.
    pub fn count_down(&self) -> bool {
        let previous = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));

        match previous {
            Ok(1) => {
                // Take the lock so a waiter between its check and its park
                // cannot miss the notification
                let _guard = self.lock.lock();
                self.opened.notify_all();
                true
            }
            Ok(_) => true,
            Err(_) => {
                self.overruns.fetch_add(1, Ordering::Relaxed);
                error!(initial = self.initial, "Completion barrier signaled past zero");
                false
            }
        }
    }

    /// Block until the count reaches zero
    pub fn wait(&self) {
        if self.is_open() {
            return;
        }
        let mut guard = self.lock.lock();
        while !self.is_open() {
            self.opened.wait(&mut guard);
        }
    }

    /// Block until the count reaches zero or `timeout` elapses
    ///
    /// Returns true if the barrier opened.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_open() {
            return true;
        }
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock.lock();
        while !self.is_open() {
            if self.opened.wait_until(&mut guard, deadline).timed_out() {
                return self.is_open();
            }
        }
        true
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.remaining.load(Ordering::Acquire) == 0
    }

    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Successful decrements observed so far
    pub fn decrements(&self) -> usize {
        self.initial - self.remaining()
    }

    pub fn overruns(&self) -> usize {
        self.overruns.load(Ordering::Relaxed)
    }

    pub fn initial(&self) -> usize {
        self.initial
    }
}

impl std::fmt::Debug for CompletionBarrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionBarrier")
            .field("initial", &self.initial)
            .field("remaining", &self.remaining())
            .field("overruns", &self.overruns())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_zero_count_is_open() {
        let barrier = CompletionBarrier::new(0);
        assert!(barrier.is_open());
        barrier.wait();
        assert!(!barrier.count_down());
        assert_eq!(barrier.overruns(), 1);
    }

    #[test]
    fn test_wait_unblocks_after_all_signals() {
        let barrier = Arc::new(CompletionBarrier::new(16));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let barrier = barrier.clone();
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(5));
                    assert!(barrier.count_down());
                })
            })
            .collect();

        barrier.wait();
        assert_eq!(barrier.decrements(), 16);

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(barrier.overruns(), 0);
    }

    #[test]
    fn test_wait_timeout_expires_while_outstanding() {
        let barrier = CompletionBarrier::new(2);
        barrier.count_down();

        let start = Instant::now();
        assert!(!barrier.wait_timeout(Duration::from_millis(50)));
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(barrier.remaining(), 1);
    }

    #[test]
    fn test_double_signal_is_refused() {
        let barrier = CompletionBarrier::new(1);
        assert!(barrier.count_down());
        assert!(!barrier.count_down());
        assert_eq!(barrier.decrements(), 1);
        assert_eq!(barrier.overruns(), 1);
    }
}
