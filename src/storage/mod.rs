//! # Storage Module
//!
//! The block-level half of the engine: container files, the block cache and
//! free-space management. Everything above this module works in terms of
//! records; everything in it works in terms of 512-byte blocks and 34-byte
//! chips.
//!
//! ## Layering
//!
//! ```text
//! Container (allocation policy, byte access)
//!     │
//!     ├── FileTable ── ContainerFile (header state, lock, refcount)
//!     │       │
//!     │       └── BlockIo (positional block reads and writes)
//!     │
//!     ├── BlockCache (SIEVE, write-back, pinning)
//!     │
//!     └── FreeSpaceStack + ChipBitmap (what is free)
//! ```
//!
//! ## Container File Layout
//!
//! ```text
//! Block 1-2   ContainerHeader (1024 bytes)
//! Block 3+    chip blocks and extended record frames, in any order
//! ```
//!
//! ## Module Organization
//!
//! - `headers`: zerocopy header struct and name fields
//! - `driver`: `BlockIo` trait and block addressing
//! - `cache`: SIEVE block cache
//! - `freelist`: bounded free-range stack
//! - `chips`: chip bitmap and record addresses
//! - `file_manager`: open files, identity, locking, close/delete
//! - `container`: per-file allocator and byte access

mod cache;
mod chips;
mod container;
mod driver;
mod file_manager;
mod freelist;
mod headers;

pub use cache::{BlockCache, BlockMode, BlockRef, CacheStats};
pub use chips::{chip_offset, chips_for, ChipBitmap, RecordId};
pub use container::Container;
pub use driver::{block_offset, BlockIo, BlockKey};
pub use file_manager::{
    container_path, ContainerFile, FileId, FileOptions, FileTable, OpenMode, SpaceReport,
    DEFAULT_EXTENSION,
};
pub use freelist::{FreeRange, FreeSpaceStack, Released};
pub use headers::{decode_name, encode_name, ContainerHeader};
