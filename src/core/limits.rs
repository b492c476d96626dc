/*!
 * Harness Limits and Constants
 *
 * Centralized location for the defaults and magic numbers used by the
 * harness and the measurement driver, grouped by domain.
 */

use std::time::Duration;

// =============================================================================
// BACKOFF
// =============================================================================

/// Quantum requested by `SleepBrief` (1ns)
/// The OS rounds this up to its timer slack; what matters is the yield
pub const SLEEP_BRIEF_QUANTUM: Duration = Duration::from_nanos(1);

/// Quantum requested by `ParkBrief` (1ns)
pub const PARK_BRIEF_QUANTUM: Duration = Duration::from_nanos(1);

// =============================================================================
// BURST SIZING
// =============================================================================

/// Default tasks per unit of worker capacity
pub const DEFAULT_LOAD_FACTOR: usize = 256;

/// Upper bound on a single burst
/// [SAFETY] Keeps a misconfigured sweep from queueing billions of closures
pub const MAX_TASK_COUNT: usize = 1 << 24;

/// Environment variable overriding the ambient parallelism level
pub const PARALLELISM_ENV: &str = "SYNC_BURST_PARALLELISM";

// =============================================================================
// EXECUTION MODELS
// =============================================================================

/// Thread name prefix for bounded pool workers
pub const BOUNDED_WORKER_PREFIX: &str = "burst-worker";

/// Thread name for the per-task runtime carriers
pub const CARRIER_THREAD_NAME: &str = "burst-carrier";

/// Grace period for the per-task runtime to stop its carrier threads
/// Tasks are already drained when this applies
pub const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

// =============================================================================
// MEASUREMENT DRIVER
// =============================================================================

/// Warmup iterations per combination (discarded)
pub const DEFAULT_WARMUP_ITERATIONS: u32 = 5;

/// Measured iterations per combination
pub const DEFAULT_MEASUREMENT_ITERATIONS: u32 = 5;

/// Environment variable enabling JSON trace output
pub const TRACE_JSON_ENV: &str = "SYNC_BURST_TRACE_JSON";
