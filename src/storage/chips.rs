//! # Chips and Record Addresses
//!
//! A chip block divides one 512-byte block into a 2-byte occupancy bitmap
//! followed by 15 chips of 34 bytes:
//!
//! ```text
//! Offset  Size  Description
//! 0       2     Chip bitmap (u16 LE, bit i set = chip i in use)
//! 2       34    Chip 0
//! 36      34    Chip 1
//! ...
//! 478     34    Chip 14
//! ```
//!
//! Records occupy a contiguous run of chips inside one chip block, so a
//! record is addressed by `(block, first chip)`. That address is the
//! record's identity for its whole life and is what parent links and child
//! indices store.

use std::fmt;

use crate::config::{CHIPS_PER_BLOCK, CHIP_BITMAP_SIZE, CHIP_SIZE};

/// Address of a record: the chip block and the first chip of its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RecordId {
    pub block: u32,
    pub chip: u16,
}

impl RecordId {
    /// The null record id; used for "no parent".
    pub const NULL: RecordId = RecordId { block: 0, chip: 0 };

    pub fn new(block: u32, chip: u16) -> Self {
        Self { block, chip }
    }

    pub fn is_null(&self) -> bool {
        self.block == 0
    }

    /// Byte offset of this record inside its chip block.
    pub fn offset(&self) -> usize {
        chip_offset(self.chip)
    }

    pub fn to_le_bytes(self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[..4].copy_from_slice(&self.block.to_le_bytes());
        out[4..6].copy_from_slice(&self.chip.to_le_bytes());
        out
    }

    pub fn from_le_bytes(bytes: &[u8]) -> Self {
        Self {
            block: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            chip: u16::from_le_bytes([bytes[4], bytes[5]]),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.block, self.chip)
    }
}

pub fn chip_offset(chip: u16) -> usize {
    CHIP_BITMAP_SIZE + chip as usize * CHIP_SIZE
}

/// Number of chips needed to hold `bytes` bytes.
pub fn chips_for(bytes: usize) -> usize {
    bytes.div_ceil(CHIP_SIZE)
}

/// Occupancy map of one chip block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChipBitmap(u16);

impl ChipBitmap {
    const VALID: u16 = (1 << CHIPS_PER_BLOCK) - 1;

    pub fn from_block(block: &[u8]) -> Self {
        Self(u16::from_le_bytes([block[0], block[1]]) & Self::VALID)
    }

    pub fn store(&self, block: &mut [u8]) {
        block[..CHIP_BITMAP_SIZE].copy_from_slice(&self.0.to_le_bytes());
    }

    pub fn bits(&self) -> u16 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn used(&self) -> u32 {
        self.0.count_ones()
    }

    pub fn test(&self, chip: u16) -> bool {
        self.0 & (1 << chip) != 0
    }

    fn run_mask(first: u16, n: usize) -> u16 {
        debug_assert!(first as usize + n <= CHIPS_PER_BLOCK);
        (((1u32 << n) - 1) << first) as u16
    }

    /// Finds the lowest run of `n` free chips.
    pub fn find_run(&self, n: usize) -> Option<u16> {
        if n == 0 || n > CHIPS_PER_BLOCK {
            return None;
        }
        (0..=(CHIPS_PER_BLOCK - n) as u16).find(|&first| self.0 & Self::run_mask(first, n) == 0)
    }

    pub fn is_run_set(&self, first: u16, n: usize) -> bool {
        let mask = Self::run_mask(first, n);
        self.0 & mask == mask
    }

    pub fn set_run(&mut self, first: u16, n: usize) {
        self.0 |= Self::run_mask(first, n);
    }

    pub fn clear_run(&mut self, first: u16, n: usize) {
        self.0 &= !Self::run_mask(first, n);
    }
}
