/*!
 * Arena Cache
 *
 * Bounded freelist of idle, reset arenas. Workloads that repeatedly need a
 * short-lived arena of similar size check one out, build their request state
 * inside it, and check it back in instead of paying construction and
 * destruction on every cycle.
 */

use crate::core::limits::{
    DEFAULT_ARENA_SIZE, DEFAULT_MAX_CACHED_ARENAS, DEFAULT_PREALLOC_ARENAS,
};
use crate::core::types::Size;
use log::{debug, info, trace};

use super::bump::Arena;
use super::types::{ArenaResult, CacheStats};

/// Bounded LIFO cache of ready-to-reuse arenas.
///
/// Every cached arena has been reset, so a checkout observes an empty arena
/// whether it came from the cache or was freshly created.
pub struct ArenaCache {
    cache: Vec<Arena>,
    max_cached: usize,
    arena_size: Size,
}

impl ArenaCache {
    /// Initialize the cache, eagerly creating up to `prealloc` arenas.
    ///
    /// A `0` for any parameter selects the corresponding default. The
    /// pre-allocation count is clamped to `max_cached`; individual creation
    /// failures during warm-up are skipped rather than failing construction.
    pub fn new(max_cached: usize, arena_size: Size, prealloc: usize) -> Self {
        let max_cached = if max_cached == 0 {
            DEFAULT_MAX_CACHED_ARENAS
        } else {
            max_cached
        };
        let arena_size = if arena_size == 0 {
            DEFAULT_ARENA_SIZE
        } else {
            arena_size
        };
        let prealloc = if prealloc == 0 {
            DEFAULT_PREALLOC_ARENAS
        } else {
            prealloc
        };

        let mut cache = Vec::with_capacity(prealloc.min(max_cached));
        for _ in 0..prealloc.min(max_cached) {
            if let Ok(arena) = Arena::new(arena_size) {
                cache.push(arena);
            }
        }

        info!(
            "Arena cache initialized: max_cached={}, arena_size={}, preallocated={}",
            max_cached,
            arena_size,
            cache.len()
        );

        Self {
            cache,
            max_cached,
            arena_size,
        }
    }

    /// Check an arena out of the cache, creating a fresh one when empty.
    pub fn acquire(&mut self) -> ArenaResult<Arena> {
        match self.cache.pop() {
            Some(arena) => {
                trace!("arena checkout from cache ({} remain)", self.cache.len());
                Ok(arena)
            }
            None => Arena::new(self.arena_size),
        }
    }

    /// Check an arena back in. Reset and re-cached when below capacity,
    /// destroyed outright otherwise.
    pub fn release(&mut self, mut arena: Arena) {
        if self.cache.len() < self.max_cached {
            arena.reset();
            self.cache.push(arena);
            trace!("arena checkin ({} cached)", self.cache.len());
        } else {
            debug!(
                "arena cache full ({} cached), destroying released arena",
                self.cache.len()
            );
        }
    }

    /// Number of idle arenas currently cached.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Snapshot of the cache configuration and occupancy.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            max_cached: self.max_cached,
            cached: self.cache.len(),
            arena_size: self.arena_size,
        }
    }
}
