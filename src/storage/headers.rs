//! # Container Header
//!
//! Every container file starts with a 1024-byte header occupying blocks 1
//! and 2. It identifies the file, records its extent and top-level object,
//! and persists the free-space stack and the chip-block list.
//!
//! ## Header Layout
//!
//! ```text
//! Offset  Size  Description
//! 0       4     Stamp (5456979)
//! 4       4     Format version (4)
//! 8       4     End-of-file block number
//! 12      4     Top-level record block
//! 16      2     Top-level record chip
//! 18      2     Free-space stack length
//! 20      2     Chip-block list length
//! 22      2     Reserved
//! 24      16    Top-level object name (NUL padded)
//! 40      768   Free-space stack: 96 x (start u32, length u32)
//! 808     128   Chip-block list: 32 x u32
//! 936     88    Reserved
//! ```
//!
//! All integers are little-endian; the zerocopy `U16`/`U32` wrappers handle
//! conversion, and `Unaligned` lets the header be cast from any buffer.

use std::path::Path;

use eyre::Result;
use zerocopy::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::chips::RecordId;
use super::freelist::FreeRange;
use crate::config::{
    CHIP_LIST_CAPACITY, FORMAT_STAMP, FORMAT_VERSION, FREE_STACK_CAPACITY, HEADER_SIZE,
    NAME_FIELD_SIZE,
};
use crate::error::{hds_ensure, HdsError};

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct FreeEntry {
    start: U32,
    len: U32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct ContainerHeader {
    stamp: U32,
    version: U32,
    eof: U32,
    top_block: U32,
    top_chip: U16,
    nfree: U16,
    nchip: U16,
    reserved0: [u8; 2],
    top_name: [u8; NAME_FIELD_SIZE],
    free: [FreeEntry; FREE_STACK_CAPACITY],
    chips: [U32; CHIP_LIST_CAPACITY],
    reserved: [u8; 88],
}

const _: () = assert!(std::mem::size_of::<ContainerHeader>() == HEADER_SIZE);

impl ContainerHeader {
    pub fn new(eof: u32, top: RecordId, top_name: &str) -> Self {
        Self {
            stamp: U32::new(FORMAT_STAMP),
            version: U32::new(FORMAT_VERSION),
            eof: U32::new(eof),
            top_block: U32::new(top.block),
            top_chip: U16::new(top.chip),
            nfree: U16::new(0),
            nchip: U16::new(0),
            reserved0: [0; 2],
            top_name: encode_name(top_name),
            free: [FreeEntry {
                start: U32::new(0),
                len: U32::new(0),
            }; FREE_STACK_CAPACITY],
            chips: [U32::new(0); CHIP_LIST_CAPACITY],
            reserved: [0; 88],
        }
    }

    /// Casts and validates a header read from `path`.
    pub fn from_bytes<'a>(path: &Path, bytes: &'a [u8]) -> Result<&'a Self> {
        hds_ensure!(
            bytes.len() >= HEADER_SIZE,
            HdsError::format(
                path,
                format!("file too short for header: {} < {}", bytes.len(), HEADER_SIZE)
            )
        );

        let header = Self::ref_from_bytes(&bytes[..HEADER_SIZE])
            .map_err(|e| HdsError::format(path, format!("unreadable header: {:?}", e)))?;

        hds_ensure!(
            header.stamp() == FORMAT_STAMP,
            HdsError::format(path, format!("bad stamp {}", header.stamp()))
        );
        hds_ensure!(
            header.version() == FORMAT_VERSION,
            HdsError::format(
                path,
                format!(
                    "unsupported version: {} (expected {})",
                    header.version(),
                    FORMAT_VERSION
                )
            )
        );
        hds_ensure!(
            header.nfree() as usize <= FREE_STACK_CAPACITY
                && header.nchip() as usize <= CHIP_LIST_CAPACITY,
            HdsError::format(path, "free-space bookkeeping exceeds its capacity")
        );

        Ok(header)
    }

    zerocopy_accessors! {
        stamp: u32,
        version: u32,
        eof: u32,
        nfree: u16,
        nchip: u16,
    }

    pub fn top_rid(&self) -> RecordId {
        RecordId::new(self.top_block.get(), self.top_chip.get())
    }

    pub fn set_top_rid(&mut self, rid: RecordId) {
        self.top_block = U32::new(rid.block);
        self.top_chip = U16::new(rid.chip);
    }

    pub fn top_name(&self) -> String {
        decode_name(&self.top_name)
    }

    pub fn set_top_name(&mut self, name: &str) {
        self.top_name = encode_name(name);
    }

    pub fn free_ranges(&self) -> impl Iterator<Item = FreeRange> + '_ {
        self.free[..self.nfree() as usize]
            .iter()
            .map(|e| FreeRange::new(e.start.get(), e.len.get()))
    }

    pub fn set_free_ranges(&mut self, ranges: &[FreeRange]) {
        debug_assert!(ranges.len() <= FREE_STACK_CAPACITY);
        for (slot, range) in self.free.iter_mut().zip(ranges) {
            slot.start = U32::new(range.start);
            slot.len = U32::new(range.len);
        }
        self.nfree = U16::new(ranges.len() as u16);
    }

    pub fn chip_blocks(&self) -> Vec<u32> {
        self.chips[..self.nchip() as usize]
            .iter()
            .map(|b| b.get())
            .collect()
    }

    pub fn set_chip_blocks(&mut self, blocks: &[u32]) {
        debug_assert!(blocks.len() <= CHIP_LIST_CAPACITY);
        for (slot, block) in self.chips.iter_mut().zip(blocks) {
            *slot = U32::new(*block);
        }
        self.nchip = U16::new(blocks.len() as u16);
    }
}

/// Stores a name in a fixed NUL-padded field. Callers validate the length.
pub fn encode_name(name: &str) -> [u8; NAME_FIELD_SIZE] {
    let mut out = [0u8; NAME_FIELD_SIZE];
    let bytes = name.as_bytes();
    let n = bytes.len().min(NAME_FIELD_SIZE - 1);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

pub fn decode_name(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}
