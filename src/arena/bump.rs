/*!
 * Arena Wrapper
 * Bump allocation with reset/destroy lifetime for request-scoped storage
 */

use crate::core::types::Size;
use bumpalo::Bump;
use std::cell::Cell;

use super::types::{ArenaError, ArenaResult};

/// A bump arena owning every byte of array, table, and string storage built
/// inside it.
///
/// The arena is the unit of reclamation: nothing allocated from it is freed
/// individually. `reset` takes `&mut self` and `release`/drop take the arena
/// by value, so the borrow checker guarantees no collection built inside the
/// arena survives either boundary.
pub struct Arena {
    bump: Bump,
    size_hint: Size,
}

impl Arena {
    /// Create an arena pre-sized to `size_hint` bytes.
    ///
    /// The hint sizes the first internal block; further blocks are created on
    /// demand as allocations outgrow it.
    pub fn new(size_hint: Size) -> ArenaResult<Self> {
        let bump = Bump::try_with_capacity(size_hint).map_err(|_| {
            ArenaError::AllocationFailed {
                requested: size_hint,
            }
        })?;
        Ok(Self { bump, size_hint })
    }

    /// Copy a string into arena-owned memory.
    pub fn alloc_str(&self, s: &str) -> ArenaResult<&str> {
        self.bump
            .try_alloc_str(s)
            .map(|s| &*s)
            .map_err(|_| ArenaError::AllocationFailed { requested: s.len() })
    }

    /// Build one arena-owned string from `parts`, inserting `sep` between
    /// consecutive parts. Two passes: size, then copy.
    pub fn join_strs(&self, parts: &[&str], sep: &str) -> ArenaResult<&str> {
        let mut len: Size = parts.iter().map(|p| p.len()).sum();
        if !parts.is_empty() {
            len += sep.len() * (parts.len() - 1);
        }

        let buf = self
            .bump
            .try_alloc_slice_fill_copy(len, 0u8)
            .map_err(|_| ArenaError::AllocationFailed { requested: len })?;

        let mut at = 0;
        for (i, part) in parts.iter().enumerate() {
            if i > 0 && !sep.is_empty() {
                buf[at..at + sep.len()].copy_from_slice(sep.as_bytes());
                at += sep.len();
            }
            buf[at..at + part.len()].copy_from_slice(part.as_bytes());
            at += part.len();
        }

        // SAFETY: buf is assembled only from the bytes of `&str` inputs, so
        // it is valid UTF-8.
        Ok(unsafe { std::str::from_utf8_unchecked(buf) })
    }

    /// Allocate default-initialized element storage as a shared cell slice.
    ///
    /// Cells permit the single-threaded shared mutation that header-copied
    /// arrays rely on; the slice stays `!Sync`.
    pub(crate) fn alloc_cells<T: Copy + Default>(&self, len: usize) -> ArenaResult<&[Cell<T>]> {
        let slice = self.bump.try_alloc_slice_fill_default(len).map_err(|_| {
            ArenaError::AllocationFailed {
                requested: len.saturating_mul(std::mem::size_of::<T>()),
            }
        })?;
        Ok(Cell::from_mut(slice).as_slice_of_cells())
    }

    /// Release every allocation made since creation or the last reset.
    ///
    /// Requires exclusive access: any array or table still borrowing the
    /// arena makes this a compile error.
    pub fn reset(&mut self) {
        self.bump.reset();
    }

    /// Bytes currently allocated from the arena, padding included.
    pub fn allocated_bytes(&self) -> Size {
        self.bump.allocated_bytes()
    }

    /// Size hint the arena was created with.
    pub fn size_hint(&self) -> Size {
        self.size_hint
    }

    pub(crate) fn bump(&self) -> &Bump {
        &self.bump
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("size_hint", &self.size_hint)
            .field("allocated_bytes", &self.allocated_bytes())
            .finish()
    }
}
