// Copyright 2026 the Windrow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public [`SpanIndex`] API and implementation.

use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;

use hashbrown::HashMap;

use crate::types::Span;

/// Error returned when resizing a key that is not registered.
///
/// This is a contract violation on the caller's side: sections must be
/// registered before their size is reported. Unregistering an unknown key, by
/// contrast, is a valid no-op (see [`SpanIndex::unregister`]).
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("key is not registered in this span index")]
pub struct UnknownKey;

/// How many neighboring ranks a lookup probes before falling back to binary
/// search. Two steps in the travel direction let a sequential sweep hop over
/// one empty section without paying for the search.
const PROBE_LIMIT: usize = 3;

/// Locality cursor: the rank that answered the previous position lookup.
///
/// Only a hint. The entry table is the sole source of truth, and every use of
/// the cursor re-checks the live span before trusting it, so a cursor that has
/// drifted can cost a probe or a binary search but never a wrong answer.
#[derive(Copy, Clone, Debug)]
struct Cursor {
    rank: usize,
    last_pos: usize,
}

#[derive(Copy, Clone, Debug)]
struct Entry<K> {
    key: K,
    span: Span,
}

/// A table of sections, each occupying a contiguous [`Span`] of a shared
/// global coordinate space.
///
/// Sections are ordered by *rank* (registration order, or an explicit
/// insertion rank), ranks are dense, and adjacent spans always meet exactly:
/// the first span starts at 0 and `span(i).end() == span(i + 1).start` for
/// every adjacent pair. Registering, unregistering, or resizing one section
/// shifts every later span in O(sections) — acceptable because section counts
/// stay small (tens) while item counts may be large.
///
/// Position lookup is tuned for the access pattern of a scrolling UI: long
/// monotone runs of nearby positions. A one-entry locality cursor answers
/// repeats in O(1), a bounded neighbor probe catches steps into an adjacent
/// section, and binary search over span starts bounds the worst case at
/// O(log sections).
///
/// Keys are opaque handles: copied, compared, hashed, never interpreted.
#[derive(Clone, Debug)]
pub struct SpanIndex<K> {
    entries: Vec<Entry<K>>,
    ranks: HashMap<K, usize>,
    cursor: Option<Cursor>,
}

impl<K: Copy + Eq + Hash + Debug> SpanIndex<K> {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            ranks: HashMap::new(),
            cursor: None,
        }
    }

    /// Number of registered sections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no sections are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of items across all sections.
    #[must_use]
    pub fn total(&self) -> usize {
        self.entries.last().map_or(0, |e| e.span.end())
    }

    /// Register `key` at the end of the rank order with `len` items.
    ///
    /// If `key` is already registered this behaves as [`SpanIndex::set_len`].
    pub fn register(&mut self, key: K, len: usize) -> Span {
        self.register_at(self.entries.len(), key, len)
    }

    /// Register `key` at `rank` with `len` items.
    ///
    /// `rank` is clamped to `[0, self.len()]`; out-of-range ranks append. The
    /// new span starts where the preceding section ends, and every section at
    /// or after the insertion point shifts up by `len`. If `key` is already
    /// registered the rank is ignored and this behaves as
    /// [`SpanIndex::set_len`].
    pub fn register_at(&mut self, rank: usize, key: K, len: usize) -> Span {
        if self.ranks.contains_key(&key) {
            return self
                .set_len(key, len)
                .expect("key present in rank map must resize");
        }

        let rank = rank.min(self.entries.len());
        let start = match rank.checked_sub(1) {
            Some(prev) => self.entries[prev].span.end(),
            None => 0,
        };

        for entry in &mut self.entries[rank..] {
            entry.span.start += len;
        }
        for (i, entry) in self.entries[rank..].iter().enumerate() {
            self.ranks.insert(entry.key, rank + i + 1);
        }

        let span = Span::new(start, len);
        self.entries.insert(rank, Entry { key, span });
        self.ranks.insert(key, rank);

        // The cursor keeps tracking the entry it pointed at.
        if let Some(c) = &mut self.cursor
            && c.rank >= rank
        {
            c.rank += 1;
        }

        span
    }

    /// Remove `key` from the index, closing the rank gap.
    ///
    /// Every later span shifts down by the removed span's length. Unknown
    /// keys are a valid no-op (a caller racing a detach against a pending
    /// removal is normal), reported as `None`.
    pub fn unregister(&mut self, key: K) -> Option<Span> {
        let rank = self.ranks.remove(&key)?;
        let removed = self.entries.remove(rank);

        for entry in &mut self.entries[rank..] {
            entry.span.start -= removed.span.len;
        }
        for (i, entry) in self.entries[rank..].iter().enumerate() {
            self.ranks.insert(entry.key, rank + i);
        }

        self.cursor = match self.cursor {
            Some(c) if c.rank == rank => None,
            Some(c) if c.rank > rank => Some(Cursor {
                rank: c.rank - 1,
                ..c
            }),
            other => other,
        };

        Some(removed.span)
    }

    /// Set the item count of `key`, shifting every later span by the delta.
    ///
    /// Returns the section's updated span.
    pub fn set_len(&mut self, key: K, new_len: usize) -> Result<Span, UnknownKey> {
        let rank = *self.ranks.get(&key).ok_or(UnknownKey)?;
        let old_len = self.entries[rank].span.len;
        self.entries[rank].span.len = new_len;
        let span = self.entries[rank].span;

        if new_len > old_len {
            let delta = new_len - old_len;
            for entry in &mut self.entries[rank + 1..] {
                entry.span.start += delta;
            }
        } else if new_len < old_len {
            let delta = old_len - new_len;
            for entry in &mut self.entries[rank + 1..] {
                entry.span.start -= delta;
            }
        }

        Ok(span)
    }

    /// The current span of `key`, or `None` if it is not registered.
    ///
    /// Direct map lookup; does not consult or move the locality cursor.
    #[must_use]
    pub fn span_of(&self, key: K) -> Option<Span> {
        let rank = *self.ranks.get(&key)?;
        Some(self.entries[rank].span)
    }

    /// The rank of `key`, or `None` if it is not registered.
    #[must_use]
    pub fn rank_of(&self, key: K) -> Option<usize> {
        self.ranks.get(&key).copied()
    }

    /// The key registered at `rank`, if any.
    #[must_use]
    pub fn key_at(&self, rank: usize) -> Option<K> {
        self.entries.get(rank).map(|e| e.key)
    }

    /// Iterate `(key, span)` pairs in rank order.
    pub fn iter(&self) -> impl Iterator<Item = (K, Span)> + '_ {
        self.entries.iter().map(|e| (e.key, e.span))
    }

    /// Resolve a global position to `(key, local offset)`.
    ///
    /// Returns `None` when `pos` is outside `[0, self.total())`. Successful
    /// lookups move the locality cursor to the answering section and remember
    /// the queried position, so monotone sweeps stay O(1). The cursor is a
    /// pure accelerator: results are identical whether or not it is warm.
    pub fn locate(&mut self, pos: usize) -> Option<(K, usize)> {
        if pos >= self.total() {
            return None;
        }

        let rank = self.find_rank(pos);
        let entry = &self.entries[rank];
        debug_assert!(
            entry.span.contains(pos),
            "rank {rank} resolved for position {pos} must contain it"
        );
        self.cursor = Some(Cursor {
            rank,
            last_pos: pos,
        });
        Some((entry.key, pos - entry.span.start))
    }

    /// Find the rank whose span contains `pos`. Caller guarantees
    /// `pos < self.total()`.
    fn find_rank(&self, pos: usize) -> usize {
        if let Some(c) = self.cursor {
            if let Some(entry) = self.entries.get(c.rank)
                && entry.span.contains(pos)
            {
                return c.rank;
            }

            // Bounded probe of neighboring ranks, preferring the direction the
            // caller is sweeping in.
            let steps: [isize; PROBE_LIMIT] = if pos >= c.last_pos {
                [1, 2, -1]
            } else {
                [-1, -2, 1]
            };
            for step in steps {
                let Some(rank) = c.rank.checked_add_signed(step) else {
                    continue;
                };
                let Some(entry) = self.entries.get(rank) else {
                    continue;
                };
                if entry.span.contains(pos) {
                    return rank;
                }
            }
        }

        // Spans are contiguous and ends are nondecreasing, so the first entry
        // ending past `pos` contains it. Empty sections end at their start and
        // are stepped over.
        let rank = self.entries.partition_point(|e| e.span.end() <= pos);
        debug_assert!(
            rank < self.entries.len(),
            "position {pos} below total() must resolve to a rank"
        );
        rank
    }
}

impl<K: Copy + Eq + Hash + Debug> Default for SpanIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::{SpanIndex, UnknownKey};
    use crate::types::Span;

    fn assert_contiguous<K: Copy + Eq + core::hash::Hash + core::fmt::Debug>(
        index: &SpanIndex<K>,
    ) {
        let mut expected_start = 0;
        for (key, span) in index.iter() {
            assert_eq!(
                span.start, expected_start,
                "span of {key:?} must start where the previous section ends"
            );
            expected_start = span.end();
        }
        assert_eq!(index.total(), expected_start, "total must equal last end");
    }

    #[test]
    fn register_appends_contiguously() {
        let mut index = SpanIndex::new();
        assert_eq!(index.total(), 0);
        assert!(index.is_empty());

        assert_eq!(index.register("a", 3), Span::new(0, 3));
        assert_eq!(index.register("b", 0), Span::new(3, 0));
        assert_eq!(index.register("c", 2), Span::new(3, 2));

        assert_eq!(index.len(), 3);
        assert_eq!(index.total(), 5);
        assert_contiguous(&index);
    }

    #[test]
    fn register_at_rank_shifts_later_sections() {
        let mut index = SpanIndex::new();
        index.register("a", 2);
        index.register("c", 3);

        let span = index.register_at(1, "b", 4);
        assert_eq!(span, Span::new(2, 4));
        assert_eq!(index.rank_of("b"), Some(1));
        assert_eq!(index.rank_of("c"), Some(2));
        assert_eq!(index.span_of("c"), Some(Span::new(6, 3)));
        assert_contiguous(&index);

        // Rank 0 insertion shifts everything.
        index.register_at(0, "head", 1);
        assert_eq!(index.span_of("head"), Some(Span::new(0, 1)));
        assert_eq!(index.span_of("a"), Some(Span::new(1, 2)));
        assert_eq!(index.total(), 10);
        assert_contiguous(&index);
    }

    #[test]
    fn register_out_of_range_rank_appends() {
        let mut index = SpanIndex::new();
        index.register("a", 1);
        index.register_at(99, "b", 2);
        assert_eq!(index.rank_of("b"), Some(1));
        assert_eq!(index.span_of("b"), Some(Span::new(1, 2)));
    }

    #[test]
    fn register_existing_key_resizes() {
        let mut index = SpanIndex::new();
        index.register("a", 2);
        index.register("b", 2);

        // Rank argument is ignored for an already-registered key.
        let span = index.register_at(0, "b", 5);
        assert_eq!(span, Span::new(2, 5));
        assert_eq!(index.rank_of("b"), Some(1));
        assert_eq!(index.total(), 7);
        assert_contiguous(&index);
    }

    #[test]
    fn unregister_closes_the_gap() {
        let mut index = SpanIndex::new();
        index.register("a", 3);
        index.register("b", 2);
        index.register("c", 4);

        assert_eq!(index.unregister("b"), Some(Span::new(3, 2)));
        assert_eq!(index.len(), 2);
        assert_eq!(index.rank_of("c"), Some(1));
        assert_eq!(index.span_of("c"), Some(Span::new(3, 4)));
        assert_eq!(index.total(), 7);
        assert_contiguous(&index);
    }

    #[test]
    fn unregister_unknown_is_a_noop() {
        let mut index = SpanIndex::new();
        index.register("a", 3);
        assert_eq!(index.unregister("ghost"), None);
        assert_eq!(index.total(), 3);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn set_len_shifts_only_later_sections() {
        let mut index = SpanIndex::new();
        index.register("a", 3);
        index.register("b", 2);
        index.register("c", 4);
        let before_a = index.span_of("a").unwrap();
        let total_before = index.total();

        let span = index.set_len("b", 6).unwrap();
        assert_eq!(span, Span::new(3, 6));
        assert_eq!(index.span_of("a"), Some(before_a));
        assert_eq!(index.span_of("c"), Some(Span::new(9, 4)));
        assert_eq!(index.total(), total_before + 4);
        assert_contiguous(&index);

        // Shrinking shifts the other way.
        index.set_len("b", 1).unwrap();
        assert_eq!(index.span_of("c"), Some(Span::new(4, 4)));
        assert_contiguous(&index);
    }

    #[test]
    fn set_len_unknown_key_errors() {
        let mut index: SpanIndex<&str> = SpanIndex::new();
        assert_eq!(index.set_len("ghost", 1), Err(UnknownKey));
    }

    #[test]
    fn locate_roundtrips_every_position() {
        let mut index = SpanIndex::new();
        index.register("a", 3);
        index.register("b", 0);
        index.register("c", 2);
        index.register("d", 5);

        let sections: Vec<(&str, Span)> = index.iter().collect();
        for (key, span) in sections {
            for local in 0..span.len {
                assert_eq!(
                    index.locate(span.to_global(local)),
                    Some((key, local)),
                    "round-trip for {key:?} at local {local}"
                );
            }
        }
    }

    #[test]
    fn locate_out_of_bounds_is_none() {
        let mut index: SpanIndex<&str> = SpanIndex::new();
        assert_eq!(index.locate(0), None);

        index.register("a", 3);
        assert_eq!(index.locate(3), None);
        assert_eq!(index.locate(usize::MAX), None);
    }

    #[test]
    fn cursor_is_not_observable() {
        let mut cold = SpanIndex::new();
        let mut warm = SpanIndex::new();
        for index in [&mut cold, &mut warm] {
            index.register("a", 4);
            index.register("b", 1);
            index.register("c", 6);
        }

        // Leave the warm index's cursor far from where the comparison starts.
        warm.locate(10);
        warm.locate(9);

        let positions: Vec<usize> = (0..cold.total()).chain((0..cold.total()).rev()).collect();
        for pos in positions {
            assert_eq!(cold.locate(pos), warm.locate(pos), "position {pos}");
        }
    }

    #[test]
    fn sequential_sweep_crosses_empty_sections() {
        let mut index = SpanIndex::new();
        index.register("a", 2);
        index.register("gap", 0);
        index.register("b", 3);

        // Forward sweep across the boundary, then backward.
        assert_eq!(index.locate(0), Some(("a", 0)));
        assert_eq!(index.locate(1), Some(("a", 1)));
        assert_eq!(index.locate(2), Some(("b", 0)));
        assert_eq!(index.locate(3), Some(("b", 1)));
        assert_eq!(index.locate(2), Some(("b", 0)));
        assert_eq!(index.locate(1), Some(("a", 1)));
        assert_eq!(index.locate(0), Some(("a", 0)));
    }

    #[test]
    fn cursor_survives_structural_edits() {
        let mut index = SpanIndex::new();
        index.register("a", 3);
        index.register("b", 3);
        index.register("c", 3);

        // Warm the cursor on "c".
        assert_eq!(index.locate(7), Some(("c", 1)));

        // Removing an earlier section shifts "c" down; the cursor must follow.
        index.unregister("a");
        assert_eq!(index.locate(4), Some(("c", 1)));

        // Inserting at the front shifts everything back up.
        index.register_at(0, "head", 2);
        assert_eq!(index.locate(6), Some(("c", 1)));

        // Removing the section under the cursor drops the cursor.
        index.unregister("c");
        assert_eq!(index.locate(2), Some(("b", 0)));
        assert_contiguous(&index);
    }

    #[test]
    fn far_jumps_fall_back_to_binary_search() {
        let mut index = SpanIndex::new();
        for key in 0..32_u32 {
            index.register(key, 4);
        }

        // Alternate between distant ends; every answer must still be exact.
        let expected = |pos: usize| Some((u32::try_from(pos / 4).unwrap(), pos % 4));
        for i in 0..16 {
            let lo = i;
            let hi = index.total() - 1 - i;
            assert_eq!(index.locate(lo), expected(lo));
            assert_eq!(index.locate(hi), expected(hi));
        }
    }
}
