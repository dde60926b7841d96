/*!
 * Limits and Constants
 *
 * Centralized location for toolkit-wide limits and defaults.
 * All values include rationale comments explaining WHY they exist.
 */

use super::types::Size;

// =============================================================================
// ARENA CACHE LIMITS
// =============================================================================

/// Default upper bound on idle arenas held by the cache
/// High enough that release() almost never destroys under steady load
pub const DEFAULT_MAX_CACHED_ARENAS: usize = 100_000;

/// Default arena size hint (4KB)
/// [PERF] One page covers the typical request-scoped table plus headroom
pub const DEFAULT_ARENA_SIZE: Size = 4096;

/// Default number of arenas created eagerly at cache initialization
/// Warms the cache so early checkouts skip arena construction entirely
pub const DEFAULT_PREALLOC_ARENAS: usize = 1000;
