//! # Block I/O Abstraction
//!
//! `BlockIo` is the copy-based interface between the block cache and the
//! files behind it. The cache never touches a `File` directly: it asks its
//! `BlockIo` to fill a buffer on a miss and to write a buffer back when a
//! dirty block is evicted or flushed.
//!
//! ```text
//! fn read_block(&mut self, key: BlockKey, buf: &mut [u8; BLOCK_SIZE]) -> Result<()>;
//! fn write_block(&mut self, key: BlockKey, data: &[u8; BLOCK_SIZE]) -> Result<()>;
//! ```
//!
//! A `BlockKey` names a block by the slot index of its open file and its
//! 1-based block number. The production implementation is `FileTable`, which
//! maps block `n` to byte offset `(n - 1) * BLOCK_SIZE` of the file in that
//! slot.

use eyre::Result;

use crate::config::BLOCK_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockKey {
    pub slot: u32,
    pub block: u32,
}

impl BlockKey {
    pub fn new(slot: u32, block: u32) -> Self {
        Self { slot, block }
    }
}

/// Backing store for the block cache.
pub trait BlockIo {
    /// Reads one block into `buf`.
    fn read_block(&mut self, key: BlockKey, buf: &mut [u8; BLOCK_SIZE]) -> Result<()>;

    /// Writes one block. Durability is only guaranteed after the owning file
    /// is synced at close or flush.
    fn write_block(&mut self, key: BlockKey, data: &[u8; BLOCK_SIZE]) -> Result<()>;
}

/// Byte offset of a 1-based block number.
pub fn block_offset(block: u32) -> u64 {
    debug_assert!(block > 0, "block 0 is the null block");
    (block as u64 - 1) * BLOCK_SIZE as u64
}

#[cfg(test)]
pub(crate) mod memory {
    use hashbrown::HashMap;

    use super::*;

    /// In-memory block store that counts its traffic.
    #[derive(Default)]
    pub struct MemoryBlocks {
        pub blocks: HashMap<BlockKey, [u8; BLOCK_SIZE]>,
        pub reads: usize,
        pub writes: usize,
    }

    impl BlockIo for MemoryBlocks {
        fn read_block(&mut self, key: BlockKey, buf: &mut [u8; BLOCK_SIZE]) -> Result<()> {
            self.reads += 1;
            match self.blocks.get(&key) {
                Some(data) => buf.copy_from_slice(data),
                None => buf.fill(0),
            }
            Ok(())
        }

        fn write_block(&mut self, key: BlockKey, data: &[u8; BLOCK_SIZE]) -> Result<()> {
            self.writes += 1;
            self.blocks.insert(key, *data);
            Ok(())
        }
    }
}
