/*!
 * Pool Array
 *
 * Growable, arena-backed storage for fixed-size elements. Elements are plain
 * values with no destructors; all backing storage belongs to the owning
 * arena, and outgrown blocks are abandoned to it rather than freed.
 *
 * Storage is a shared cell slice: header copies alias the same cells, and
 * single-threaded shared mutation through `Cell` is what makes the
 * copy-on-grow scheme sound without raw pointers.
 */

use crate::arena::{Arena, ArenaError, ArenaResult};
use bumpalo::collections::Vec as BumpVec;
use std::cell::Cell;

/// Growable element sequence inside an arena.
///
/// `capacity()` is the allocated element count; growth always doubles and
/// always moves to fresh arena storage, so pushes stay amortized O(1).
#[derive(Debug)]
pub struct PoolArray<'a, T: Copy + Default> {
    arena: &'a Arena,
    elts: &'a [Cell<T>],
    nelts: usize,
}

impl<'a, T: Copy + Default> PoolArray<'a, T> {
    /// Create an array sized for `nelts` elements (minimum 1), empty.
    pub fn with_capacity(arena: &'a Arena, nelts: usize) -> ArenaResult<Self> {
        let elts = arena.alloc_cells::<T>(nelts.max(1))?;
        Ok(Self {
            arena,
            elts,
            nelts: 0,
        })
    }

    pub fn arena(&self) -> &'a Arena {
        self.arena
    }

    pub fn len(&self) -> usize {
        self.nelts
    }

    pub fn is_empty(&self) -> bool {
        self.nelts == 0
    }

    /// Allocated capacity in elements.
    pub fn capacity(&self) -> usize {
        self.elts.len()
    }

    /// Live elements as cells.
    pub fn cells(&self) -> &'a [Cell<T>] {
        let elts = self.elts;
        &elts[..self.nelts]
    }

    /// Value at `index`. Panics when out of the live range.
    pub fn get(&self, index: usize) -> T {
        self.cells()[index].get()
    }

    /// Overwrite the value at `index`. Panics when out of the live range.
    ///
    /// Takes `&self`: mutation goes through the shared cells and is visible
    /// to header copies aliasing the same storage.
    pub fn set(&self, index: usize, value: T) {
        self.cells()[index].set(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + 'a {
        self.cells().iter().map(Cell::get)
    }

    /// Reserve the next slot, reset it to `T::default()`, and return it.
    pub fn push(&mut self) -> ArenaResult<&'a Cell<T>> {
        let slot = self.push_noclear()?;
        slot.set(T::default());
        Ok(slot)
    }

    /// Reserve the next slot without clearing it. The slot may hold a stale
    /// value from an earlier pop; callers overwrite it immediately.
    pub(crate) fn push_noclear(&mut self) -> ArenaResult<&'a Cell<T>> {
        if self.nelts == self.elts.len() {
            self.grow(self.nelts + 1)?;
        }
        let elts = self.elts;
        let slot = &elts[self.nelts];
        self.nelts += 1;
        Ok(slot)
    }

    /// Remove and return the last element, or `None` when empty. The storage
    /// bytes are left behind, stale.
    pub fn pop(&mut self) -> Option<T> {
        if self.nelts == 0 {
            return None;
        }
        self.nelts -= 1;
        Some(self.elts[self.nelts].get())
    }

    /// Forget all elements without touching storage.
    pub fn clear(&mut self) {
        self.nelts = 0;
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        if len < self.nelts {
            self.nelts = len;
        }
    }

    /// Append all of `src`'s elements, growing by doubling until they fit.
    pub fn concat(&mut self, src: &PoolArray<'a, T>) -> ArenaResult<()> {
        let needed = self
            .nelts
            .checked_add(src.nelts)
            .ok_or(ArenaError::SizeOverflow {
                count: src.nelts,
                elt_size: std::mem::size_of::<T>(),
            })?;
        if needed > self.elts.len() {
            self.grow(needed)?;
        }
        let dst = self.elts;
        for (i, cell) in src.cells().iter().enumerate() {
            dst[self.nelts + i].set(cell.get());
        }
        self.nelts = needed;
        Ok(())
    }

    /// Deep copy into `arena`, preserving `src`'s allocated capacity.
    pub fn copy_in(arena: &'a Arena, src: &PoolArray<'a, T>) -> ArenaResult<Self> {
        let fresh = arena.alloc_cells::<T>(src.elts.len().max(1))?;
        for (dst, s) in fresh.iter().zip(src.cells()) {
            dst.set(s.get());
        }
        Ok(Self {
            arena,
            elts: fresh,
            nelts: src.nelts,
        })
    }

    /// Header-only copy sharing `src`'s live storage, with capacity clamped
    /// to the current count so the first push or concat on the copy must
    /// reallocate before writing (copy-on-grow isolation).
    pub fn copy_header_in(arena: &'a Arena, src: &PoolArray<'a, T>) -> Self {
        Self {
            arena,
            elts: src.cells(),
            nelts: src.nelts,
        }
    }

    /// `copy_header_in(first)` + `concat(second)`; shares `first`'s storage
    /// outright when `second` is empty.
    pub fn append_in(
        arena: &'a Arena,
        first: &PoolArray<'a, T>,
        second: &PoolArray<'a, T>,
    ) -> ArenaResult<Self> {
        let mut res = Self::copy_header_in(arena, first);
        res.concat(second)?;
        Ok(res)
    }

    fn grow(&mut self, min_capacity: usize) -> ArenaResult<()> {
        let overflow = ArenaError::SizeOverflow {
            count: min_capacity,
            elt_size: std::mem::size_of::<T>(),
        };
        let mut new_cap = self.elts.len().max(1);
        while new_cap < min_capacity {
            new_cap = new_cap.checked_mul(2).ok_or(overflow.clone())?;
        }
        let fresh = self.arena.alloc_cells::<T>(new_cap)?;
        for (dst, src) in fresh.iter().zip(self.cells()) {
            dst.set(src.get());
        }
        self.elts = fresh;
        Ok(())
    }
}

impl<'a> PoolArray<'a, Option<&'a str>> {
    /// Join the non-null elements in order into one arena-owned string,
    /// inserting `sep` between consecutive non-null elements. Empty and
    /// all-null arrays yield `""`.
    pub fn join_str(&self, arena: &'a Arena, sep: Option<char>) -> ArenaResult<&'a str> {
        let mut parts = BumpVec::with_capacity_in(self.nelts, arena.bump());
        for s in self.iter().flatten() {
            parts.push(s);
        }
        let mut sep_buf = [0u8; 4];
        let sep_str = match sep {
            Some(c) => &*c.encode_utf8(&mut sep_buf),
            None => "",
        };
        arena.join_strs(&parts, sep_str)
    }
}
