/*!
 * Indexed Table
 *
 * Insertion-ordered, case-insensitive, multi-valued string-to-string
 * collection. Entries live in one flat pool array; a 32-bucket index keyed on
 * a key's first byte bounds the positions worth scanning per key. The bucket
 * range is a superset bound, not a partition: entries with other keys may sit
 * inside it, so every probe still compares keys.
 *
 * Key equality is a two-stage predicate: a 4-byte case-folded prefix checksum
 * as a fast reject, then a full case-insensitive comparison.
 */

use crate::arena::{Arena, ArenaResult};
use crate::core::types::EntryIndex;
use bumpalo::collections::Vec as BumpVec;
use log::debug;
use std::cmp::Ordering;

use super::array::PoolArray;
use super::sort::merge_sort_refs;

const TABLE_HASH_SIZE: usize = 32;
const TABLE_INDEX_MASK: u8 = 0x1f;

/// Clears bit 5 of every byte, folding ASCII letter case. Non-letter bytes
/// get mangled too; the checksum is only a pre-filter and the full
/// comparison decides.
const CASE_MASK: u32 = 0xdfdf_dfdf;

fn table_hash(key: &str) -> usize {
    usize::from(key.as_bytes().first().copied().unwrap_or(0) & TABLE_INDEX_MASK)
}

/// First 4 bytes of the key packed big-endian, zero-padded, case-folded.
fn key_checksum(key: &str) -> u32 {
    let bytes = key.as_bytes();
    let mut checksum: u32 = 0;
    for i in 0..4 {
        checksum <<= 8;
        if let Some(&b) = bytes.get(i) {
            checksum |= u32::from(b);
        }
    }
    checksum & CASE_MASK
}

fn case_cmp(a: &str, b: &str) -> Ordering {
    a.bytes()
        .map(|c| c.to_ascii_lowercase())
        .cmp(b.bytes().map(|c| c.to_ascii_lowercase()))
}

fn entry_matches(entry: &TableEntry<'_>, checksum: u32, key: &str) -> bool {
    entry.key_checksum == checksum && entry.key.is_some_and(|k| k.eq_ignore_ascii_case(key))
}

/// One table entry. A `None` key marks an entry removed during compression;
/// such entries never survive past the compaction pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableEntry<'a> {
    key: Option<&'a str>,
    val: &'a str,
    key_checksum: u32,
}

impl<'a> TableEntry<'a> {
    pub fn key(&self) -> Option<&'a str> {
        self.key
    }

    pub fn value(&self) -> &'a str {
        self.val
    }
}

/// Duplicate-key resolution for `compress` and `overlap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressPolicy {
    /// Keep only the last value in insertion order.
    Overwrite,
    /// Join all values with `", "` in insertion order.
    Merge,
}

/// Case-insensitive, multi-valued, insertion-ordered string table.
#[derive(Debug)]
pub struct Table<'a> {
    a: PoolArray<'a, TableEntry<'a>>,
    index_initialized: u32,
    index_first: [EntryIndex; TABLE_HASH_SIZE],
    index_last: [EntryIndex; TABLE_HASH_SIZE],
}

impl<'a> Table<'a> {
    /// Create a table with room for `nelts` entries before the first growth.
    pub fn with_capacity(arena: &'a Arena, nelts: usize) -> ArenaResult<Self> {
        Ok(Self {
            a: PoolArray::with_capacity(arena, nelts)?,
            index_initialized: 0,
            index_first: [0; TABLE_HASH_SIZE],
            index_last: [0; TABLE_HASH_SIZE],
        })
    }

    /// Deep copy preserving capacity and the exact index.
    pub fn copy_in(arena: &'a Arena, t: &Table<'a>) -> ArenaResult<Table<'a>> {
        Ok(Self {
            a: PoolArray::copy_in(arena, &t.a)?,
            index_initialized: t.index_initialized,
            index_first: t.index_first,
            index_last: t.index_last,
        })
    }

    /// Rebuild entry-by-entry via `add`, normalizing the index.
    pub fn clone_in(arena: &'a Arena, t: &Table<'a>) -> ArenaResult<Table<'a>> {
        let mut new = Table::with_capacity(arena, t.a.len())?;
        for e in t.a.iter() {
            if let Some(key) = e.key {
                new.add(key, e.val)?;
            }
        }
        Ok(new)
    }

    pub fn len(&self) -> usize {
        self.a.len()
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    /// Forget all entries and bucket state without touching storage.
    pub fn clear(&mut self) {
        self.a.clear();
        self.index_initialized = 0;
    }

    /// The flat entry sequence backing the table.
    pub fn entry_array(&self) -> &PoolArray<'a, TableEntry<'a>> {
        &self.a
    }

    /// Live `(key, value)` pairs in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.a.iter().filter_map(|e| e.key.map(|k| (k, e.val)))
    }

    fn arena(&self) -> &'a Arena {
        self.a.arena()
    }

    fn index_set(&self, hash: usize) -> bool {
        self.index_initialized & (1 << hash) != 0
    }

    fn mark_index(&mut self, hash: usize) {
        self.index_initialized |= 1 << hash;
    }

    /// Value of the first entry matching `key` within its bucket range.
    pub fn get(&self, key: &str) -> Option<&'a str> {
        let hash = table_hash(key);
        if !self.index_set(hash) {
            return None;
        }
        let checksum = key_checksum(key);
        for i in self.index_first[hash]..=self.index_last[hash] {
            let e = self.a.get(i);
            if entry_matches(&e, checksum, key) {
                return Some(e.val);
            }
        }
        None
    }

    /// Overwrite the first entry matching `key`, removing any further
    /// duplicates of it, or append a new entry when none matches. Key and
    /// value are duplicated into the table's arena.
    pub fn set(&mut self, key: &str, val: &str) -> ArenaResult<()> {
        let key = self.arena().alloc_str(key)?;
        let val = self.arena().alloc_str(val)?;
        self.set_ref(key, val)
    }

    /// `set` without duplication; `key` and `val` must already live as long
    /// as the table's arena.
    pub fn set_ref(&mut self, key: &'a str, val: &'a str) -> ArenaResult<()> {
        let checksum = key_checksum(key);
        let hash = table_hash(key);
        if !self.index_set(hash) {
            self.index_first[hash] = self.a.len();
            self.mark_index(hash);
            return self.append_entry(hash, key, val, checksum);
        }

        let first = self.index_first[hash];
        let last = self.index_last[hash];
        let table_end = self.a.len();
        for i in first..=last {
            let mut e = self.a.get(i);
            if !entry_matches(&e, checksum, key) {
                continue;
            }

            // Overwrite the first match in place.
            e.val = val;
            self.a.set(i, e);

            // Remove any other instances of this key within the bucket
            // range, compacting survivors left as we go.
            let mut dst: Option<EntryIndex> = None;
            let mut removed = 0;
            for j in (i + 1)..=last {
                let ej = self.a.get(j);
                if entry_matches(&ej, checksum, key) {
                    removed += 1;
                    if dst.is_none() {
                        dst = Some(j);
                    }
                } else if let Some(d) = dst {
                    self.a.set(d, ej);
                    dst = Some(d + 1);
                }
            }

            // The scan stopped at the bucket's last position, not the end of
            // the table; shift the remainder over the gap.
            if let Some(mut d) = dst {
                for j in (last + 1)..table_end {
                    self.a.set(d, self.a.get(j));
                    d += 1;
                }
                self.a.truncate(table_end - removed);
                self.reindex();
            }
            return Ok(());
        }

        self.append_entry(hash, key, val, checksum)
    }

    /// Unconditionally append an entry, duplicating key and value into the
    /// table's arena. The only operation that produces duplicate keys.
    pub fn add(&mut self, key: &str, val: &str) -> ArenaResult<()> {
        let key = self.arena().alloc_str(key)?;
        let val = self.arena().alloc_str(val)?;
        self.add_ref(key, val)
    }

    /// `add` without duplication; `key` and `val` must already live as long
    /// as the table's arena.
    pub fn add_ref(&mut self, key: &'a str, val: &'a str) -> ArenaResult<()> {
        let hash = table_hash(key);
        if !self.index_set(hash) {
            self.index_first[hash] = self.a.len();
            self.mark_index(hash);
        }
        let checksum = key_checksum(key);
        self.append_entry(hash, key, val, checksum)
    }

    /// Remove every entry matching `key`. No-op when the bucket was never
    /// populated.
    pub fn unset(&mut self, key: &str) {
        let hash = table_hash(key);
        if !self.index_set(hash) {
            return;
        }
        let checksum = key_checksum(key);
        let first = self.index_first[hash];
        let last = self.index_last[hash];
        let table_end = self.a.len();
        for i in first..=last {
            let e = self.a.get(i);
            if !entry_matches(&e, checksum, key) {
                continue;
            }

            // First match found: drop it plus any later matches in the
            // bucket range, then shift the rest of the table left.
            let mut dst = i;
            let mut removed = 1;
            for j in (i + 1)..=last {
                let ej = self.a.get(j);
                if entry_matches(&ej, checksum, key) {
                    removed += 1;
                } else {
                    self.a.set(dst, ej);
                    dst += 1;
                }
            }
            for j in (last + 1)..table_end {
                self.a.set(dst, self.a.get(j));
                dst += 1;
            }
            self.a.truncate(table_end - removed);
            self.reindex();
            return;
        }
    }

    /// Append `", " + val` onto the first entry matching `key`, or add a new
    /// entry when none matches.
    pub fn merge(&mut self, key: &str, val: &str) -> ArenaResult<()> {
        let key = self.arena().alloc_str(key)?;
        let val = self.arena().alloc_str(val)?;
        self.merge_ref(key, val)
    }

    /// `merge` without duplication on the append path; the merged value
    /// itself is always built in the table's arena.
    pub fn merge_ref(&mut self, key: &'a str, val: &'a str) -> ArenaResult<()> {
        let checksum = key_checksum(key);
        let hash = table_hash(key);
        if !self.index_set(hash) {
            self.index_first[hash] = self.a.len();
            self.mark_index(hash);
            return self.append_entry(hash, key, val, checksum);
        }

        for i in self.index_first[hash]..=self.index_last[hash] {
            let mut e = self.a.get(i);
            if entry_matches(&e, checksum, key) {
                e.val = self.arena().join_strs(&[e.val, val], ", ")?;
                self.a.set(i, e);
                return Ok(());
            }
        }

        self.append_entry(hash, key, val, checksum)
    }

    /// New table holding `overlay`'s entries followed by `base`'s, fully
    /// reindexed. Since `get` returns the first match, a key present in both
    /// resolves to `overlay`'s value.
    pub fn overlay_in(
        arena: &'a Arena,
        overlay: &Table<'a>,
        base: &Table<'a>,
    ) -> ArenaResult<Table<'a>> {
        let a = PoolArray::append_in(arena, &overlay.a, &base.a)?;
        let mut res = Table {
            a,
            index_initialized: 0,
            index_first: [0; TABLE_HASH_SIZE],
            index_last: [0; TABLE_HASH_SIZE],
        };
        res.reindex();
        Ok(res)
    }

    /// Concatenate `other`'s entries onto `self`, then resolve the duplicate
    /// keys this may introduce via `compress`.
    pub fn overlap(&mut self, other: &Table<'a>, policy: CompressPolicy) -> ArenaResult<()> {
        if self.a.len() + other.a.len() == 0 {
            return Ok(());
        }
        self.cat(other)?;
        self.compress(policy)
    }

    /// Table-wide duplicate-key resolution.
    ///
    /// Entry references are stably sorted by case-insensitive key (the table
    /// itself is not reordered); adjacent equal-key runs collapse per
    /// `policy`; dead entries are swept by one left-compaction pass; the
    /// index is rebuilt from scratch.
    pub fn compress(&mut self, policy: CompressPolicy) -> ArenaResult<()> {
        let n = self.a.len();
        if n <= 1 {
            return Ok(());
        }

        let arena = self.a.arena();
        let mut dups_found = false;
        {
            let entries = &self.a;
            let bump = arena.bump();
            let mut refs = BumpVec::with_capacity_in(n, bump);
            refs.extend(0..n);

            let key_at = |i: usize| entries.get(i).key.unwrap_or_default();
            let sorted = merge_sort_refs(bump, refs, |x, y| {
                case_cmp(key_at(x), key_at(y)) == Ordering::Greater
            });

            // Walk equal-key runs in the sorted view. Stability means each
            // run lists its duplicates in insertion order.
            let mut i = 0;
            while i < n {
                let head = entries.get(sorted[i]);
                let mut j = i + 1;
                while j < n {
                    let e = entries.get(sorted[j]);
                    if e.key_checksum == head.key_checksum
                        && e.key
                            .unwrap_or_default()
                            .eq_ignore_ascii_case(key_at(sorted[i]))
                    {
                        j += 1;
                    } else {
                        break;
                    }
                }
                if j > i + 1 {
                    dups_found = true;
                    let survivor = sorted[i];
                    let mut e = entries.get(survivor);
                    match policy {
                        CompressPolicy::Merge => {
                            let mut parts = BumpVec::with_capacity_in(j - i, bump);
                            for k in i..j {
                                parts.push(entries.get(sorted[k]).val);
                            }
                            e.val = arena.join_strs(&parts, ", ")?;
                        }
                        CompressPolicy::Overwrite => {
                            e.val = entries.get(sorted[j - 1]).val;
                        }
                    }
                    entries.set(survivor, e);
                    for k in (i + 1)..j {
                        let mut dead = entries.get(sorted[k]);
                        dead.key = None;
                        entries.set(sorted[k], dead);
                    }
                }
                i = j;
            }
        }

        // Shift survivors left over the holes, then rebuild the index.
        if dups_found {
            let mut dst = 0;
            for src in 0..n {
                let e = self.a.get(src);
                if e.key.is_some() {
                    if dst != src {
                        self.a.set(dst, e);
                    }
                    dst += 1;
                }
            }
            self.a.truncate(dst);
            debug!("table compress removed {} duplicate entries", n - dst);
        }

        self.reindex();
        Ok(())
    }

    /// Visit entries with `callback`; a `false` return stops a scan.
    ///
    /// With no keys: one full scan, stopped entirely by the first `false`.
    /// With keys: one full linear scan per key (not bucket-indexed, no
    /// checksum pre-filter), where `false` stops only that key's scan and
    /// later keys still run. Returns `false` iff any callback returned
    /// `false`. The per-key early-termination behavior is long-standing and
    /// preserved deliberately; callers depend on it.
    pub fn iterate<F>(&self, keys: &[&str], mut callback: F) -> bool
    where
        F: FnMut(&'a str, &'a str) -> bool,
    {
        if keys.is_empty() {
            for e in self.a.iter() {
                if let Some(key) = e.key {
                    if !callback(key, e.val) {
                        return false;
                    }
                }
            }
            return true;
        }

        let mut all = true;
        for probe in keys {
            for e in self.a.iter() {
                let Some(key) = e.key else { continue };
                if key.eq_ignore_ascii_case(probe) && !callback(key, e.val) {
                    all = false;
                    break;
                }
            }
        }
        all
    }

    /// All values for `key` as one string: a single match returns the stored
    /// value without allocating; several matches join with `","`; no match
    /// is `None`.
    pub fn get_merged(&self, arena: &'a Arena, key: &str) -> ArenaResult<Option<&'a str>> {
        let mut first: Option<&'a str> = None;
        let mut merged: Option<BumpVec<'_, &'a str>> = None;
        self.iterate(&[key], |_, val| {
            if first.is_none() {
                // Fast path: a single match hands back the stored value
                // without allocating.
                first = Some(val);
            } else if let Some(vals) = merged.as_mut() {
                vals.push(val);
            } else {
                let mut vals = BumpVec::with_capacity_in(10, arena.bump());
                if let Some(f) = first {
                    vals.push(f);
                }
                vals.push(val);
                merged = Some(vals);
            }
            true
        });

        match merged {
            Some(vals) => Ok(Some(arena.join_strs(&vals, ",")?)),
            None => Ok(first),
        }
    }

    fn append_entry(
        &mut self,
        hash: usize,
        key: &'a str,
        val: &'a str,
        checksum: u32,
    ) -> ArenaResult<()> {
        self.index_last[hash] = self.a.len();
        let slot = self.a.push_noclear()?;
        slot.set(TableEntry {
            key: Some(key),
            val,
            key_checksum: checksum,
        });
        Ok(())
    }

    /// Concatenate `other`'s entry sequence, fixing `other`'s bucket bounds
    /// up by the prior entry count instead of a full rebuild. When `self`
    /// was empty, `other`'s index applies verbatim.
    fn cat(&mut self, other: &Table<'a>) -> ArenaResult<()> {
        let n = self.a.len();
        self.a.concat(&other.a)?;

        if n == 0 {
            self.index_first = other.index_first;
            self.index_last = other.index_last;
            self.index_initialized = other.index_initialized;
            return Ok(());
        }

        for idx in 0..TABLE_HASH_SIZE {
            if other.index_initialized & (1 << idx) != 0 {
                self.index_last[idx] = other.index_last[idx] + n;
                if self.index_initialized & (1 << idx) == 0 {
                    self.index_first[idx] = other.index_first[idx] + n;
                }
            }
        }
        self.index_initialized |= other.index_initialized;
        Ok(())
    }

    /// Recompute every bucket's position bounds from the entry sequence.
    fn reindex(&mut self) {
        self.index_initialized = 0;
        for i in 0..self.a.len() {
            let Some(key) = self.a.get(i).key else { continue };
            let hash = table_hash(key);
            self.index_last[hash] = i;
            if !self.index_set(hash) {
                self.index_first[hash] = i;
                self.mark_index(hash);
            }
        }
    }
}
