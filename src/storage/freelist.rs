//! # Free-Space Stack
//!
//! Each container file tracks its free blocks as a bounded collection of
//! disjoint `(start, length)` ranges. The collection is persisted in the
//! container header, so its capacity is fixed at `FREE_STACK_CAPACITY`
//! entries.
//!
//! ## Allocation Strategy
//!
//! `take(n)` is best-fit: the smallest range of at least `n` blocks supplies
//! the allocation, always from its front, so an allocation never spans two
//! entries. When no range fits, the caller extends the file (see
//! `Container::allocate`).
//!
//! ## Release and Merging
//!
//! `release(start, n)` merges the range with the entries immediately before
//! and after it. A range that touches neither is inserted as a new entry. If
//! the stack is already full the range is dropped and counted as lost:
//!
//! ```text
//! before:  [3..5) [9..12)          release(5, 4)
//! after:   [3..12)                 both neighbours merged
//!
//! full:    96 entries              release(40, 1), no neighbour
//! after:   96 entries, lost += 1
//! ```
//!
//! Lost blocks stay allocated on disk until the file is rewritten. The lost
//! count lives only in memory.
//!
//! Ranges are kept sorted by start block, which makes neighbour lookup a
//! binary search.

use eyre::Result;

use crate::config::FREE_STACK_CAPACITY;
use crate::error::{hds_ensure, HdsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeRange {
    pub start: u32,
    pub len: u32,
}

impl FreeRange {
    pub fn new(start: u32, len: u32) -> Self {
        Self { start, len }
    }

    /// First block past the range.
    pub fn end(&self) -> u32 {
        self.start + self.len
    }
}

/// Outcome of returning a range to the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Released {
    Merged,
    Pushed,
    Lost,
}

#[derive(Debug, Clone)]
pub struct FreeSpaceStack {
    ranges: Vec<FreeRange>,
    eof: u32,
    lost: u64,
}

impl FreeSpaceStack {
    pub fn new(eof: u32) -> Self {
        Self {
            ranges: Vec::with_capacity(FREE_STACK_CAPACITY),
            eof,
            lost: 0,
        }
    }

    /// Rebuilds the stack from persisted entries, checking that they are
    /// disjoint and inside the file.
    pub fn from_ranges(
        eof: u32,
        first_block: u32,
        entries: impl IntoIterator<Item = FreeRange>,
    ) -> Result<Self> {
        let mut ranges: Vec<FreeRange> = entries.into_iter().collect();
        ranges.sort_by_key(|r| r.start);

        hds_ensure!(
            ranges.len() <= FREE_STACK_CAPACITY,
            HdsError::integrity(format!("free-space stack has {} entries", ranges.len()))
        );

        for (i, range) in ranges.iter().enumerate() {
            hds_ensure!(
                range.len > 0 && range.start >= first_block && range.end() <= eof + 1,
                HdsError::integrity(format!(
                    "free range {}+{} lies outside blocks {}..={}",
                    range.start, range.len, first_block, eof
                ))
            );
            if i > 0 {
                hds_ensure!(
                    ranges[i - 1].end() <= range.start,
                    HdsError::integrity(format!(
                        "free ranges overlap at block {}",
                        range.start
                    ))
                );
            }
        }

        Ok(Self {
            ranges,
            eof,
            lost: 0,
        })
    }

    pub fn eof(&self) -> u32 {
        self.eof
    }

    pub fn set_eof(&mut self, eof: u32) {
        debug_assert!(eof >= self.eof, "file extent never shrinks");
        self.eof = eof;
    }

    pub fn ranges(&self) -> &[FreeRange] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.ranges.len() >= FREE_STACK_CAPACITY
    }

    pub fn free_blocks(&self) -> u64 {
        self.ranges.iter().map(|r| r.len as u64).sum()
    }

    pub fn lost_blocks(&self) -> u64 {
        self.lost
    }

    /// The free range that ends at end-of-file, if any.
    pub fn tail(&self) -> Option<FreeRange> {
        self.ranges
            .last()
            .copied()
            .filter(|r| r.end() == self.eof + 1)
    }

    /// Best-fit allocation of `n` contiguous blocks.
    pub fn take(&mut self, n: u32) -> Option<u32> {
        if n == 0 {
            return None;
        }

        let idx = self
            .ranges
            .iter()
            .enumerate()
            .filter(|(_, r)| r.len >= n)
            .min_by_key(|(_, r)| r.len)
            .map(|(i, _)| i)?;

        Some(self.take_front_of(idx, n))
    }

    /// Takes `n` blocks from the front of the range starting at `start`.
    /// Used to grow a frame in place.
    pub fn take_at(&mut self, start: u32, n: u32) -> bool {
        match self.ranges.binary_search_by_key(&start, |r| r.start) {
            Ok(idx) if self.ranges[idx].len >= n => {
                self.take_front_of(idx, n);
                true
            }
            _ => false,
        }
    }

    fn take_front_of(&mut self, idx: usize, n: u32) -> u32 {
        let range = &mut self.ranges[idx];
        let start = range.start;
        if range.len == n {
            self.ranges.remove(idx);
        } else {
            range.start += n;
            range.len -= n;
        }
        start
    }

    /// Returns `n` blocks starting at `start` to the stack.
    pub fn release(&mut self, start: u32, n: u32) -> Result<Released> {
        if n == 0 {
            return Ok(Released::Merged);
        }

        let freed = FreeRange::new(start, n);
        hds_ensure!(
            freed.end() <= self.eof + 1,
            HdsError::integrity(format!(
                "freeing blocks {}+{} beyond end of file {}",
                start, n, self.eof
            ))
        );

        let idx = self.ranges.partition_point(|r| r.start < start);

        let merge_prev = idx > 0 && {
            let prev = self.ranges[idx - 1];
            hds_ensure!(
                prev.end() <= start,
                HdsError::integrity(format!("block {} is already free", start))
            );
            prev.end() == start
        };
        let merge_next = idx < self.ranges.len() && {
            let next = self.ranges[idx];
            hds_ensure!(
                freed.end() <= next.start,
                HdsError::integrity(format!("block {} is already free", next.start))
            );
            freed.end() == next.start
        };

        match (merge_prev, merge_next) {
            (true, true) => {
                let next = self.ranges.remove(idx);
                self.ranges[idx - 1].len += n + next.len;
            }
            (true, false) => self.ranges[idx - 1].len += n,
            (false, true) => {
                let next = &mut self.ranges[idx];
                next.start = start;
                next.len += n;
            }
            (false, false) => {
                if self.is_full() {
                    self.lost += n as u64;
                    return Ok(Released::Lost);
                }
                self.ranges.insert(idx, freed);
                return Ok(Released::Pushed);
            }
        }

        Ok(Released::Merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn take_prefers_smallest_fitting_range() {
        let mut stack =
            FreeSpaceStack::from_ranges(40, 3, [FreeRange::new(3, 10), FreeRange::new(20, 3)])
                .unwrap();

        assert_eq!(stack.take(2), Some(20));
        assert_eq!(stack.ranges(), &[FreeRange::new(3, 10), FreeRange::new(22, 1)]);
    }

    #[test]
    fn take_removes_exhausted_range() {
        let mut stack = FreeSpaceStack::from_ranges(20, 3, [FreeRange::new(5, 4)]).unwrap();

        assert_eq!(stack.take(4), Some(5));
        assert!(stack.is_empty());
        assert_eq!(stack.take(1), None);
    }

    #[test]
    fn release_merges_both_neighbours() {
        let mut stack =
            FreeSpaceStack::from_ranges(20, 3, [FreeRange::new(3, 2), FreeRange::new(9, 3)])
                .unwrap();

        assert_eq!(stack.release(5, 4).unwrap(), Released::Merged);
        assert_eq!(stack.ranges(), &[FreeRange::new(3, 9)]);
    }

    #[test]
    fn release_merges_following_range() {
        let mut stack = FreeSpaceStack::from_ranges(20, 3, [FreeRange::new(10, 2)]).unwrap();

        assert_eq!(stack.release(8, 2).unwrap(), Released::Merged);
        assert_eq!(stack.ranges(), &[FreeRange::new(8, 4)]);
    }

    #[test]
    fn release_into_full_stack_is_lost() {
        let mut stack = FreeSpaceStack::new(1000);
        for i in 0..FREE_STACK_CAPACITY as u32 {
            assert_eq!(stack.release(3 + i * 2, 1).unwrap(), Released::Pushed);
        }
        assert!(stack.is_full());

        assert_eq!(stack.release(500, 3).unwrap(), Released::Lost);
        assert_eq!(stack.lost_blocks(), 3);
        assert_eq!(stack.len(), FREE_STACK_CAPACITY);
    }

    #[test]
    fn full_stack_still_merges() {
        let mut stack = FreeSpaceStack::new(1000);
        for i in 0..FREE_STACK_CAPACITY as u32 {
            stack.release(3 + i * 2, 1).unwrap();
        }

        assert_eq!(stack.release(4, 1).unwrap(), Released::Merged);
        assert_eq!(stack.len(), FREE_STACK_CAPACITY - 1);
        assert_eq!(stack.lost_blocks(), 0);
    }

    #[test]
    fn double_free_is_an_integrity_error() {
        let mut stack = FreeSpaceStack::from_ranges(20, 3, [FreeRange::new(5, 4)]).unwrap();

        let err = stack.release(6, 1).unwrap_err();
        assert_eq!(
            crate::error::error_kind(&err),
            Some(crate::error::ErrorKind::Integrity)
        );
    }

    #[test]
    fn from_ranges_rejects_overlap() {
        let result =
            FreeSpaceStack::from_ranges(20, 3, [FreeRange::new(3, 5), FreeRange::new(6, 2)]);

        assert!(result.is_err());
    }

    #[test]
    fn tail_is_range_touching_eof() {
        let stack =
            FreeSpaceStack::from_ranges(20, 3, [FreeRange::new(4, 2), FreeRange::new(18, 3)])
                .unwrap();

        assert_eq!(stack.tail(), Some(FreeRange::new(18, 3)));
    }

    #[test]
    fn take_at_only_matches_range_start() {
        let mut stack = FreeSpaceStack::from_ranges(20, 3, [FreeRange::new(8, 4)]).unwrap();

        assert!(!stack.take_at(9, 1));
        assert!(!stack.take_at(8, 5));
        assert!(stack.take_at(8, 3));
        assert_eq!(stack.ranges(), &[FreeRange::new(11, 1)]);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Alloc(u32),
        Free(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u32..12).prop_map(Op::Alloc),
            any::<prop::sample::Index>().prop_map(|i| Op::Free(i.index(usize::MAX))),
        ]
    }

    proptest! {
        #[test]
        fn ranges_stay_disjoint_and_blocks_are_conserved(ops in prop::collection::vec(op(), 1..200)) {
            const FIRST: u32 = 3;
            let mut stack = FreeSpaceStack::new(FIRST - 1);
            let mut used: Vec<FreeRange> = Vec::new();

            for op in ops {
                match op {
                    Op::Alloc(n) => {
                        let start = match stack.take(n) {
                            Some(start) => start,
                            None => {
                                let start = stack.eof() + 1;
                                stack.set_eof(stack.eof() + n);
                                start
                            }
                        };
                        used.push(FreeRange::new(start, n));
                    }
                    Op::Free(i) if !used.is_empty() => {
                        let range = used.swap_remove(i % used.len());
                        stack.release(range.start, range.len).unwrap();
                    }
                    Op::Free(_) => {}
                }

                let ranges = stack.ranges();
                for pair in ranges.windows(2) {
                    prop_assert!(pair[0].end() < pair[1].start);
                }
                let in_use: u64 = used.iter().map(|r| r.len as u64).sum();
                prop_assert_eq!(
                    stack.free_blocks() + in_use + stack.lost_blocks(),
                    (stack.eof() + 1 - FIRST) as u64
                );
            }
        }
    }
}
