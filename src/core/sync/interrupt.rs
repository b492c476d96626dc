/*!
 * Interrupt Registry
 *
 * Per-trial record of interrupts raised against individual tasks.
 * Suspension primitives consume the pending flag and fail the task.
 */

use ahash::RandomState;
use dashmap::DashMap;
use std::sync::Arc;

/// Pending interrupts keyed by task index
///
/// Cloning shares the underlying registry. An interrupt stays pending until
/// a suspension point observes it, so it may be raised before the task starts.
#[derive(Clone, Default)]
pub struct InterruptRegistry {
    pending: Arc<DashMap<usize, (), RandomState>>,
}

impl InterruptRegistry {
    pub fn new() -> Self {
        Self {
            pending: Arc::new(DashMap::with_hasher(RandomState::new())),
        }
    }

    /// Raise an interrupt for `task_id`
    ///
    /// Returns false if one was already pending.
    pub fn interrupt(&self, task_id: usize) -> bool {
        self.pending.insert(task_id, ()).is_none()
    }

    /// Consume the pending interrupt for `task_id`, if any
    #[inline]
    pub fn take(&self, task_id: usize) -> bool {
        // Fast path: nothing pending anywhere
        if self.pending.is_empty() {
            return false;
        }
        self.pending.remove(&task_id).is_some()
    }

    pub fn is_pending(&self, task_id: usize) -> bool {
        self.pending.contains_key(&task_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drop interrupts no task consumed
    pub fn clear(&self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }
}

impl std::fmt::Debug for InterruptRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterruptRegistry")
            .field("pending", &self.pending.len())
            .finish()
    }
}
