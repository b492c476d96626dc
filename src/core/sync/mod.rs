/*!
 * Synchronization Primitives
 *
 * The pieces a burst is assembled from:
 * - Backoff strategies applied inside the critical section
 * - Lock strategies wrapping the critical section
 * - A completion barrier the coordinator blocks on
 * - An in-flight gauge used to drain execution models on release
 *
 * # Architecture
 *
 * Lock strategies use enum dispatch: the set of disciplines is closed and
 * each one owns a trial-scoped primitive. Backoff is a trait so that
 * instrumented strategies can wrap the built-in kinds.
 */

mod backoff;
mod barrier;
mod gauge;
mod interrupt;
mod lock;

pub use backoff::{Backoff, TaskContext};
pub use barrier::CompletionBarrier;
pub use gauge::InFlightGauge;
pub use interrupt::InterruptRegistry;
pub use lock::{LockStrategy, SuspendingLock};
