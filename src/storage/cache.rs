//! # SIEVE Block Cache
//!
//! All block traffic between the record layer and the container files goes
//! through one `BlockCache`. Blocks are read through on a miss and written
//! back when a dirty block is evicted, when its file is flushed, and before
//! its file is closed.
//!
//! ## Why SIEVE Instead of LRU?
//!
//! Walking a large array of structures touches every cell record once. Under
//! LRU each of those blocks becomes "most recently used" and pushes out the
//! chip blocks holding component tables, which are about to be read again.
//! SIEVE uses a "visited" flag instead of strict recency ordering:
//!
//! - On access: set the visited flag
//! - On eviction: scan entries with a "hand" pointer
//!   - visited: clear the flag, move the hand forward (second chance)
//!   - not visited: evict this entry
//!
//! Blocks touched once by a scan are evicted on the next sweep while the
//! hot index blocks survive.
//!
//! ## Memory Layout
//!
//! ```text
//! CacheEntry {
//!     key: BlockKey,          // 8 bytes (file slot + block number)
//!     visited: bool,
//!     dirty: bool,
//!     pin_count: u32,
//!     data: Box<[u8; 512]>,
//! }
//! ```
//!
//! Capacity is the `MAXWPL` tuning parameter (default 32 blocks).
//!
//! ## Pin/Release Protocol
//!
//! 1. `get_block(io, key, mode)` returns a `BlockRef` and pins the block
//! 2. The caller reads with `data(&r)` or writes with `data_mut(&r)`
//! 3. `release_block(r)` unpins it
//! 4. A pinned block is never chosen for eviction
//!
//! `read_block`/`write_block` wrap the protocol around a closure and are what
//! most callers use.
//!
//! ## Thread Safety
//!
//! The cache is plain `&mut self` state. The engine serializes all access
//! behind its mutex, so there is no sharding or per-entry atomics here.

use eyre::Result;
use hashbrown::HashMap;
use tracing::trace;

use super::driver::{BlockIo, BlockKey};
use crate::config::BLOCK_SIZE;
use crate::error::{hds_ensure, HdsError};

/// How `get_block` should populate the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockMode {
    /// Read through; the block stays clean.
    Read,
    /// Read through and mark dirty.
    Write,
    /// Do not read; start from a zeroed buffer marked dirty.
    Zero,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub writebacks: u64,
}

struct CacheEntry {
    key: BlockKey,
    visited: bool,
    dirty: bool,
    pin_count: u32,
    data: Box<[u8; BLOCK_SIZE]>,
}

impl CacheEntry {
    fn new(key: BlockKey) -> Self {
        Self {
            key,
            visited: true,
            dirty: false,
            pin_count: 0,
            data: Box::new([0u8; BLOCK_SIZE]),
        }
    }

    fn is_pinned(&self) -> bool {
        self.pin_count > 0
    }
}

/// A pinned block. Must be handed back to `release_block`.
#[derive(Debug)]
#[must_use = "a pinned block must be released"]
pub struct BlockRef {
    key: BlockKey,
}

impl BlockRef {
    pub fn key(&self) -> BlockKey {
        self.key
    }
}

pub struct BlockCache {
    entries: Vec<CacheEntry>,
    index: HashMap<BlockKey, usize>,
    hand: usize,
    capacity: usize,
    stats: CacheStats,
}

impl BlockCache {
    pub fn new(capacity: usize) -> Result<Self> {
        hds_ensure!(
            capacity > 0,
            HdsError::invalid("block cache capacity must be at least 1")
        );

        Ok(Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
            hand: 0,
            capacity,
            stats: CacheStats::default(),
        })
    }

    pub fn get_block(
        &mut self,
        io: &mut dyn BlockIo,
        key: BlockKey,
        mode: BlockMode,
    ) -> Result<BlockRef> {
        if let Some(&idx) = self.index.get(&key) {
            self.stats.hits += 1;
            let entry = &mut self.entries[idx];
            entry.visited = true;
            entry.pin_count += 1;
            match mode {
                BlockMode::Read => {}
                BlockMode::Write => entry.dirty = true,
                BlockMode::Zero => {
                    entry.data.fill(0);
                    entry.dirty = true;
                }
            }
            return Ok(BlockRef { key });
        }

        self.stats.misses += 1;
        self.make_room(io)?;

        let mut entry = CacheEntry::new(key);
        match mode {
            BlockMode::Read => io.read_block(key, &mut entry.data)?,
            BlockMode::Write => {
                io.read_block(key, &mut entry.data)?;
                entry.dirty = true;
            }
            BlockMode::Zero => entry.dirty = true,
        }
        entry.pin_count = 1;

        let idx = self.entries.len();
        self.entries.push(entry);
        self.index.insert(key, idx);

        Ok(BlockRef { key })
    }

    fn entry_index(&self, key: &BlockKey) -> usize {
        // INVARIANT: a BlockRef only exists while its block is pinned in the cache
        *self.index.get(key).expect("pinned block missing from cache")
    }

    pub fn data(&self, block: &BlockRef) -> &[u8; BLOCK_SIZE] {
        &self.entries[self.entry_index(&block.key)].data
    }

    pub fn data_mut(&mut self, block: &BlockRef) -> &mut [u8; BLOCK_SIZE] {
        let idx = self.entry_index(&block.key);
        let entry = &mut self.entries[idx];
        entry.dirty = true;
        &mut entry.data
    }

    pub fn release_block(&mut self, block: BlockRef) {
        let idx = self.entry_index(&block.key);
        let entry = &mut self.entries[idx];
        debug_assert!(entry.pin_count > 0, "release of an unpinned block");
        entry.pin_count -= 1;
    }

    /// Runs `f` over a pinned, read-only view of the block.
    pub fn read_block<R>(
        &mut self,
        io: &mut dyn BlockIo,
        key: BlockKey,
        f: impl FnOnce(&[u8; BLOCK_SIZE]) -> R,
    ) -> Result<R> {
        let block = self.get_block(io, key, BlockMode::Read)?;
        let out = f(self.data(&block));
        self.release_block(block);
        Ok(out)
    }

    /// Runs `f` over a pinned, writable view of the block.
    pub fn write_block<R>(
        &mut self,
        io: &mut dyn BlockIo,
        key: BlockKey,
        mode: BlockMode,
        f: impl FnOnce(&mut [u8; BLOCK_SIZE]) -> R,
    ) -> Result<R> {
        let block = self.get_block(io, key, mode)?;
        let out = f(self.data_mut(&block));
        self.release_block(block);
        Ok(out)
    }

    fn make_room(&mut self, io: &mut dyn BlockIo) -> Result<()> {
        while self.entries.len() >= self.capacity {
            let Some(idx) = self.evict_candidate() else {
                return Err(HdsError::OutOfSpace(format!(
                    "block cache full and all {} blocks pinned",
                    self.entries.len()
                ))
                .into());
            };
            self.evict(io, idx)?;
        }
        Ok(())
    }

    fn evict_candidate(&mut self) -> Option<usize> {
        let n = self.entries.len();
        if n == 0 {
            return None;
        }
        if self.hand >= n {
            self.hand = 0;
        }

        // The first sweep may only clear visited flags; the second finds a victim.
        for _ in 0..2 * n {
            let idx = self.hand;
            let entry = &mut self.entries[idx];
            if !entry.is_pinned() {
                if !entry.visited {
                    return Some(idx);
                }
                entry.visited = false;
            }
            self.hand = (self.hand + 1) % n;
        }

        None
    }

    fn evict(&mut self, io: &mut dyn BlockIo, idx: usize) -> Result<()> {
        let entry = &mut self.entries[idx];
        if entry.dirty {
            io.write_block(entry.key, &entry.data)?;
            entry.dirty = false;
            self.stats.writebacks += 1;
        }
        trace!(slot = entry.key.slot, block = entry.key.block, "evicted block");
        self.stats.evictions += 1;
        self.remove(idx);
        Ok(())
    }

    fn remove(&mut self, idx: usize) -> CacheEntry {
        let entry = self.entries.swap_remove(idx);
        self.index.remove(&entry.key);

        if idx < self.entries.len() {
            let moved_key = self.entries[idx].key;
            self.index.insert(moved_key, idx);
        }

        if self.hand >= self.entries.len() {
            self.hand = 0;
        }

        entry
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, entry) in self.entries.iter().enumerate() {
            self.index.insert(entry.key, i);
        }
        self.hand = 0;
    }

    /// Writes back every dirty block of one file, in block order.
    pub fn flush_file(&mut self, io: &mut dyn BlockIo, slot: u32) -> Result<usize> {
        let mut dirty: Vec<usize> = (0..self.entries.len())
            .filter(|&i| self.entries[i].key.slot == slot && self.entries[i].dirty)
            .collect();
        dirty.sort_unstable_by_key(|&i| self.entries[i].key.block);

        for &i in &dirty {
            let entry = &mut self.entries[i];
            io.write_block(entry.key, &entry.data)?;
            entry.dirty = false;
            self.stats.writebacks += 1;
        }

        Ok(dirty.len())
    }

    /// Drops every block of one file without writing it back.
    pub fn discard_file(&mut self, slot: u32) -> usize {
        let before = self.entries.len();
        debug_assert!(
            self.entries
                .iter()
                .all(|e| e.key.slot != slot || !e.is_pinned()),
            "discarding pinned blocks"
        );
        self.entries.retain(|e| e.key.slot != slot);
        self.rebuild_index();
        before - self.entries.len()
    }

    /// Changes the capacity, evicting (and writing back) blocks until the
    /// cache fits. Pinned blocks are kept even if that leaves it over size.
    pub fn set_capacity(&mut self, io: &mut dyn BlockIo, capacity: usize) -> Result<()> {
        hds_ensure!(
            capacity > 0,
            HdsError::invalid("block cache capacity must be at least 1")
        );
        self.capacity = capacity;

        while self.entries.len() > self.capacity {
            match self.evict_candidate() {
                Some(idx) => self.evict(io, idx)?,
                None => break,
            }
        }
        Ok(())
    }

    pub fn is_dirty(&self, key: &BlockKey) -> bool {
        self.index
            .get(key)
            .map(|&i| self.entries[i].dirty)
            .unwrap_or(false)
    }

    pub fn contains(&self, key: &BlockKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::driver::memory::MemoryBlocks;

    fn key(block: u32) -> BlockKey {
        BlockKey::new(0, block)
    }

    #[test]
    fn miss_reads_through_and_hit_does_not() {
        let mut io = MemoryBlocks::default();
        io.blocks.insert(key(3), [7u8; BLOCK_SIZE]);
        let mut cache = BlockCache::new(4).unwrap();

        let first = cache.read_block(&mut io, key(3), |b| b[0]).unwrap();
        let second = cache.read_block(&mut io, key(3), |b| b[511]).unwrap();

        assert_eq!((first, second), (7, 7));
        assert_eq!(io.reads, 1);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn zero_mode_skips_the_read() {
        let mut io = MemoryBlocks::default();
        io.blocks.insert(key(5), [9u8; BLOCK_SIZE]);
        let mut cache = BlockCache::new(4).unwrap();

        cache
            .write_block(&mut io, key(5), BlockMode::Zero, |b| assert!(b.iter().all(|&x| x == 0)))
            .unwrap();

        assert_eq!(io.reads, 0);
        assert!(cache.is_dirty(&key(5)));
    }

    #[test]
    fn dirty_victim_is_written_back() {
        let mut io = MemoryBlocks::default();
        let mut cache = BlockCache::new(2).unwrap();

        cache
            .write_block(&mut io, key(1), BlockMode::Zero, |b| b[0] = 42)
            .unwrap();
        for block in 2..6 {
            cache.read_block(&mut io, key(block), |_| ()).unwrap();
        }

        assert!(!cache.contains(&key(1)));
        assert_eq!(io.blocks[&key(1)][0], 42);
        assert!(cache.stats().writebacks >= 1);
    }

    #[test]
    fn pinned_block_is_never_evicted() {
        let mut io = MemoryBlocks::default();
        let mut cache = BlockCache::new(2).unwrap();

        let pinned = cache.get_block(&mut io, key(1), BlockMode::Read).unwrap();
        for block in 2..10 {
            cache.read_block(&mut io, key(block), |_| ()).unwrap();
        }

        assert!(cache.contains(&key(1)));
        cache.release_block(pinned);
    }

    #[test]
    fn all_pinned_is_out_of_space() {
        let mut io = MemoryBlocks::default();
        let mut cache = BlockCache::new(1).unwrap();

        let pinned = cache.get_block(&mut io, key(1), BlockMode::Read).unwrap();
        let err = cache.get_block(&mut io, key(2), BlockMode::Read).unwrap_err();

        assert_eq!(
            crate::error::error_kind(&err),
            Some(crate::error::ErrorKind::OutOfSpace)
        );
        cache.release_block(pinned);
    }

    #[test]
    fn visited_block_gets_second_chance() {
        let mut io = MemoryBlocks::default();
        let mut cache = BlockCache::new(3).unwrap();

        for block in 1..=3 {
            cache.read_block(&mut io, key(block), |_| ()).unwrap();
        }
        // First eviction sweep clears every visited flag and evicts block 1.
        cache.read_block(&mut io, key(4), |_| ()).unwrap();
        cache.read_block(&mut io, key(2), |_| ()).unwrap();
        cache.read_block(&mut io, key(5), |_| ()).unwrap();

        assert!(cache.contains(&key(2)));
        assert!(!cache.contains(&key(1)));
    }

    #[test]
    fn flush_file_only_touches_that_file() {
        let mut io = MemoryBlocks::default();
        let mut cache = BlockCache::new(8).unwrap();

        cache
            .write_block(&mut io, BlockKey::new(0, 3), BlockMode::Zero, |b| b[0] = 1)
            .unwrap();
        cache
            .write_block(&mut io, BlockKey::new(1, 3), BlockMode::Zero, |b| b[0] = 2)
            .unwrap();

        assert_eq!(cache.flush_file(&mut io, 1).unwrap(), 1);
        assert!(cache.is_dirty(&BlockKey::new(0, 3)));
        assert!(!cache.is_dirty(&BlockKey::new(1, 3)));
        assert_eq!(io.blocks[&BlockKey::new(1, 3)][0], 2);
    }

    #[test]
    fn discard_file_drops_its_blocks() {
        let mut io = MemoryBlocks::default();
        let mut cache = BlockCache::new(8).unwrap();
        for block in 1..4 {
            cache.read_block(&mut io, BlockKey::new(0, block), |_| ()).unwrap();
            cache.read_block(&mut io, BlockKey::new(1, block), |_| ()).unwrap();
        }

        assert_eq!(cache.discard_file(0), 3);
        assert_eq!(cache.len(), 3);
        assert!(cache.contains(&BlockKey::new(1, 2)));
        assert_eq!(cache.read_block(&mut io, BlockKey::new(1, 2), |b| b[0]).unwrap(), 0);
    }

    #[test]
    fn shrinking_capacity_writes_back() {
        let mut io = MemoryBlocks::default();
        let mut cache = BlockCache::new(8).unwrap();
        for block in 1..=8 {
            cache
                .write_block(&mut io, key(block), BlockMode::Zero, |b| b[0] = block as u8)
                .unwrap();
        }

        cache.set_capacity(&mut io, 2).unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(io.writes, 6);
    }
}
