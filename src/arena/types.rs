/*!
 * Arena Types
 * Common types for arena-backed allocation
 */

use crate::core::types::Size;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Arena operation result
pub type ArenaResult<T> = Result<T, ArenaError>;

/// Arena errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArenaError {
    #[error("arena exhausted: failed to allocate {requested} bytes")]
    AllocationFailed { requested: Size },

    #[error("allocation size overflow: {count} elements of {elt_size} bytes")]
    SizeOverflow { count: usize, elt_size: Size },
}

/// Cache statistics snapshot
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CacheStats {
    pub max_cached: usize,
    pub cached: usize,
    pub arena_size: Size,
}
