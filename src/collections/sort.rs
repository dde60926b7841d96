/*!
 * Reference Sort
 *
 * Bottom-up merge sort over entry references, used by table compression.
 * Mergesort rather than a quicksort family: guaranteed O(n log n) on any
 * input, and stability preserves insertion order among duplicate keys, which
 * the merge-duplicates policy depends on.
 */

use bumpalo::collections::Vec as BumpVec;
use bumpalo::Bump;

/// Sort `values` with `greater` as the strict "out of order" predicate.
///
/// First pass sorts adjacent pairs in place; subsequent passes merge blocks
/// of doubling size, alternating between `values` and an auxiliary buffer.
/// Returns whichever buffer holds the final ordering. Scratch space comes
/// from `bump`, never the system allocator.
pub(crate) fn merge_sort_refs<'b, F>(
    bump: &'b Bump,
    mut values: BumpVec<'b, usize>,
    greater: F,
) -> BumpVec<'b, usize>
where
    F: Fn(usize, usize) -> bool,
{
    let n = values.len();

    // First pass: sort pairs of elements.
    let mut i = 0;
    while i + 1 < n {
        if greater(values[i], values[i + 1]) {
            values.swap(i, i + 1);
        }
        i += 2;
    }

    let mut aux = BumpVec::with_capacity_in(n, bump);
    aux.resize(n, 0);

    let mut src = values;
    let mut dst = aux;
    let mut blocksize = 2;
    while blocksize < n {
        let mut out = 0;
        let mut next_start = 0;
        while next_start + blocksize < n {
            let block1_end = next_start + blocksize;
            let block2_end = (block1_end + blocksize).min(n);
            let mut b1 = next_start;
            let mut b2 = block1_end;

            // Merge two adjacent blocks, draining the remainder of one once
            // the other empties. Ties take from block 1, keeping the sort
            // stable.
            while b1 < block1_end || b2 < block2_end {
                if b1 == block1_end {
                    dst[out] = src[b2];
                    b2 += 1;
                } else if b2 == block2_end {
                    dst[out] = src[b1];
                    b1 += 1;
                } else if greater(src[b1], src[b2]) {
                    dst[out] = src[b2];
                    b2 += 1;
                } else {
                    dst[out] = src[b1];
                    b1 += 1;
                }
                out += 1;
            }
            next_start += blocksize * 2;
        }

        // Elements past the last full block pair carry over unchanged.
        while out < n {
            dst[out] = src[out];
            out += 1;
        }

        std::mem::swap(&mut src, &mut dst);
        blocksize *= 2;
    }

    src
}
