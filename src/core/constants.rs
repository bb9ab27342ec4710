// ============================================================================
// spark-observer - Constants
// Default timings and graph flag bits
// ============================================================================

use std::time::Duration;

// =============================================================================
// LEAK GUARD TIMINGS
// =============================================================================

/// How long an uncommitted reaction may live before the leak guard disposes it
pub const DEFAULT_CLEANUP_DELAY: Duration = Duration::from_millis(10_000);

/// Minimum spacing between two leak-guard sweeps requested by the host loop
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(10_000);

// =============================================================================
// GRAPH LIMITS
// =============================================================================

/// Maximum notification rounds at the end of one transaction before we
/// consider it an infinite loop
pub const MAX_NOTIFY_ROUNDS: u32 = 1000;

// =============================================================================
// LISTENER / COMPUTED FLAGS
// =============================================================================

/// Listener has been notified and not re-tracked since
pub const STALE: u32 = 1 << 0;

/// Listener or computed has been disposed
pub const DISPOSED: u32 = 1 << 1;

/// Computed value must be recomputed on next read
pub const DIRTY: u32 = 1 << 2;

// =============================================================================
// TESTS
// =============================================================================
