/*!
 * Occupancy Gauge
 *
 * Backoff decorator counting how many tasks are inside the critical
 * section at once. Used to verify that exclusive strategies serialize and
 * that the baseline does not.
 */

use crate::core::sync::{Backoff, TaskContext};
use crate::core::TaskResult;
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// Decrements occupancy when dropped, including on unwind
struct Occupant<'a>(&'a AtomicUsize);

impl Drop for Occupant<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Wraps a backoff and records critical-section occupancy
///
/// An optional dwell widens the window each task spends inside so overlap
/// is observable even when the wrapped backoff is a no-op.
pub struct OccupancyGauge<B> {
    inner: B,
    dwell: Option<Duration>,
    current: AtomicUsize,
    max: AtomicUsize,
    entries: AtomicUsize,
}

impl<B: Backoff> OccupancyGauge<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            dwell: None,
            current: AtomicUsize::new(0),
            max: AtomicUsize::new(0),
            entries: AtomicUsize::new(0),
        }
    }

    pub fn with_dwell(mut self, dwell: Duration) -> Self {
        self.dwell = Some(dwell);
        self
    }

    /// Highest concurrent occupancy seen
    pub fn max_occupancy(&self) -> usize {
        self.max.load(Ordering::Acquire)
    }

    pub fn current_occupancy(&self) -> usize {
        self.current.load(Ordering::Acquire)
    }

    /// Total critical-section entries
    pub fn entries(&self) -> usize {
        self.entries.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.max.store(0, Ordering::Release);
        self.entries.store(0, Ordering::Relaxed);
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }
}

impl<B: Backoff> OccupancyGauge<B> {
    fn enter(&self) -> Occupant<'_> {
        let occupancy = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        self.max.fetch_max(occupancy, Ordering::AcqRel);
        self.entries.fetch_add(1, Ordering::Relaxed);
        Occupant(&self.current)
    }
}

impl<B: Backoff> Backoff for OccupancyGauge<B> {
    fn apply(&self, ctx: &TaskContext) -> TaskResult<()> {
        let _occupant = self.enter();
        if let Some(dwell) = self.dwell {
            thread::sleep(dwell);
        }
        self.inner.apply(ctx)
    }

    fn apply_suspending<'a>(&'a self, ctx: &'a TaskContext) -> BoxFuture<'a, TaskResult<()>> {
        Box::pin(async move {
            let _occupant = self.enter();
            if let Some(dwell) = self.dwell {
                tokio::time::sleep(dwell).await;
            }
            self.inner.apply_suspending(ctx).await
        })
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
