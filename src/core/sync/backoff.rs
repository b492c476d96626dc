/*!
 * Backoff Strategies
 *
 * Artificial stall injected inside the critical section to perturb
 * scheduling. The built-in kinds are stateless; `Backoff` is open so
 * instrumented strategies can wrap them.
 *
 * Two flavours per strategy:
 * - `apply` blocks the calling OS thread
 * - `apply_suspending` yields the worker back to the runtime so other
 *   tasks can use its carrier thread while it is stalled
 */

use super::interrupt::InterruptRegistry;
use crate::core::limits::{PARK_BRIEF_QUANTUM, SLEEP_BRIEF_QUANTUM};
use crate::core::types::BackoffKind;
use crate::core::{TaskError, TaskResult};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::thread;

/// Identity of the task applying a backoff
#[derive(Debug, Clone)]
pub struct TaskContext {
    task_id: usize,
    interrupts: InterruptRegistry,
}

impl TaskContext {
    pub fn new(task_id: usize, interrupts: InterruptRegistry) -> Self {
        Self {
            task_id,
            interrupts,
        }
    }

    #[inline]
    pub fn task_id(&self) -> usize {
        self.task_id
    }

    /// Fail with `InterruptedDuringBackoff` if an interrupt is pending
    ///
    /// Consumes the interrupt so it is reported exactly once.
    #[inline]
    pub fn check_interrupt(&self, backoff: &str) -> TaskResult<()> {
        if self.interrupts.take(self.task_id) {
            return Err(TaskError::InterruptedDuringBackoff {
                task_id: self.task_id,
                backoff: backoff.to_string(),
            });
        }
        Ok(())
    }
}

/// Stall policy applied inside a critical section
///
/// Implementations must not swallow interrupts: silently continuing would
/// under-count stall time.
pub trait Backoff: Send + Sync {
    fn apply(&self, ctx: &TaskContext) -> TaskResult<()>;

    /// Stall without holding the carrier thread
    ///
    /// Must be polled inside a runtime with timers enabled. Defaults to the
    /// blocking `apply`.
    fn apply_suspending<'a>(&'a self, ctx: &'a TaskContext) -> BoxFuture<'a, TaskResult<()>> {
        Box::pin(async move { self.apply(ctx) })
    }

    /// Name used in logs and reports
    fn name(&self) -> &'static str;
}

impl Backoff for BackoffKind {
    #[inline]
    fn apply(&self, ctx: &TaskContext) -> TaskResult<()> {
        match self {
            BackoffKind::None => Ok(()),
            BackoffKind::SleepBrief => {
                // An interrupt raised before the suspension fails it immediately
                ctx.check_interrupt(self.as_str())?;
                thread::sleep(SLEEP_BRIEF_QUANTUM);
                ctx.check_interrupt(self.as_str())
            }
            BackoffKind::ParkBrief => {
                ctx.check_interrupt(self.as_str())?;
                thread::park_timeout(PARK_BRIEF_QUANTUM);
                ctx.check_interrupt(self.as_str())
            }
        }
    }

    fn apply_suspending<'a>(&'a self, ctx: &'a TaskContext) -> BoxFuture<'a, TaskResult<()>> {
        Box::pin(async move {
            match self {
                BackoffKind::None => Ok(()),
                BackoffKind::SleepBrief => {
                    ctx.check_interrupt(self.as_str())?;
                    // The runtime timer rounds the quantum up to its tick
                    tokio::time::sleep(SLEEP_BRIEF_QUANTUM).await;
                    ctx.check_interrupt(self.as_str())
                }
                BackoffKind::ParkBrief => {
                    ctx.check_interrupt(self.as_str())?;
                    tokio::task::yield_now().await;
                    ctx.check_interrupt(self.as_str())
                }
            }
        })
    }

    fn name(&self) -> &'static str {
        self.as_str()
    }
}

impl<B: Backoff + ?Sized> Backoff for Arc<B> {
    #[inline]
    fn apply(&self, ctx: &TaskContext) -> TaskResult<()> {
        (**self).apply(ctx)
    }

    fn apply_suspending<'a>(&'a self, ctx: &'a TaskContext) -> BoxFuture<'a, TaskResult<()>> {
        (**self).apply_suspending(ctx)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
