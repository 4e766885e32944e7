//! # hdsdb Configuration Constants
//!
//! This module centralizes the format and engine constants. Constants that
//! depend on each other are co-located and their relationships are checked at
//! compile time, so a change to one cannot silently break another.
//!
//! ## Dependency Graph
//!
//! ```text
//! BLOCK_SIZE (512 bytes)
//!       │
//!       ├─> CHIP_BITMAP_SIZE (2 bytes) + CHIPS_PER_BLOCK (15) × CHIP_SIZE (34)
//!       │     A chip block is exactly one block: 2 + 15 × 34 = 512.
//!       │
//!       ├─> HEADER_BLOCKS (2)
//!       │     The container header (1024 bytes) occupies blocks 1 and 2.
//!       │
//!       └─> FIRST_DATA_BLOCK (3)
//!
//! CHIPS_PER_BLOCK (15)
//!       │
//!       └─> ChipBitmap is a u16; bit 15 is never used.
//!
//! RCL_SIZE (24 bytes) + descriptor (20 + 4 × naxes bytes)
//!       │
//!       └─> MAX_RECORD_HEADER_CHIPS: the record header and the largest
//!           descriptor must fit inside one chip block.
//!
//! FREE_STACK_CAPACITY (96) / CHIP_LIST_CAPACITY (32)
//!       │
//!       └─> Persisted inside the container header; the header struct size
//!           assertion in storage::headers fails if these are raised too far.
//! ```
//!
//! ## File Layout
//!
//! ```text
//! Offset 0:     Block 1 ┐ container header (stamp, version, eof,
//! Offset 512:   Block 2 ┘ top-level object, free stack, chip list)
//! Offset 1024:  Block 3   first data block
//! ...
//! ```
//!
//! Blocks are numbered from 1; block number 0 is the null reference.

// ============================================================================
// BLOCK AND CHIP LAYOUT
// ============================================================================

/// Size of a container file block in bytes. The unit of I/O and caching.
pub const BLOCK_SIZE: usize = 512;

/// Number of chips a chip block is divided into.
pub const CHIPS_PER_BLOCK: usize = 15;

/// Size of one chip in bytes.
pub const CHIP_SIZE: usize = 34;

/// Size of the packed chip bitmap at the start of every chip block.
pub const CHIP_BITMAP_SIZE: usize = 2;

const _: () = assert!(
    CHIP_BITMAP_SIZE + CHIPS_PER_BLOCK * CHIP_SIZE == BLOCK_SIZE,
    "a chip block must be exactly one block"
);

const _: () = assert!(
    CHIPS_PER_BLOCK <= 16,
    "chip occupancy is tracked in a u16 bitmap"
);

/// Number of blocks occupied by the container header.
pub const HEADER_BLOCKS: u32 = 2;

/// Size of the container header in bytes.
pub const HEADER_SIZE: usize = HEADER_BLOCKS as usize * BLOCK_SIZE;

/// First block number available for records.
pub const FIRST_DATA_BLOCK: u32 = HEADER_BLOCKS + 1;

/// Largest block number the format can address. Block offsets are computed
/// in u64, so the limit is the u32 block number itself.
pub const MAX_BLOCK: u32 = u32::MAX - 1;

// ============================================================================
// FORMAT IDENTIFICATION
// ============================================================================

/// Container file identification stamp.
pub const FORMAT_STAMP: u32 = 5_456_979;

/// Current container format version.
pub const FORMAT_VERSION: u32 = 4;

// ============================================================================
// FREE-SPACE BOOKKEEPING
// Both collections are fixed-size arrays inside the persisted header.
// ============================================================================

/// Number of entries in the free-space stack.
pub const FREE_STACK_CAPACITY: usize = 96;

/// Number of chip blocks tracked for sub-block allocation.
pub const CHIP_LIST_CAPACITY: usize = 32;

// ============================================================================
// RECORD LAYOUT
// ============================================================================

/// Size of the record control label (record header).
pub const RCL_SIZE: usize = 24;

/// Maximum length of an object name or type name.
pub const MAX_NAME_LEN: usize = 15;

/// Stored width of a name (NUL padded).
pub const NAME_FIELD_SIZE: usize = 16;

/// Maximum number of array dimensions.
pub const MAX_DIMS: usize = 7;

/// Size of the fixed part of an object descriptor (type name + naxes).
pub const DESCRIPTOR_BASE_SIZE: usize = NAME_FIELD_SIZE + 4;

/// Size of the largest object descriptor.
pub const MAX_DESCRIPTOR_SIZE: usize = DESCRIPTOR_BASE_SIZE + 4 * MAX_DIMS;

/// Size of one component-table entry (name + record id).
pub const COMPONENT_ENTRY_SIZE: usize = NAME_FIELD_SIZE + 8;

/// Size of the component count that prefixes a component table.
pub const COMPONENT_TABLE_HEADER_SIZE: usize = 4;

/// Size of one cell-vector entry (record id).
pub const CELL_ENTRY_SIZE: usize = 8;

const _: () = assert!(
    RCL_SIZE + MAX_DESCRIPTOR_SIZE <= CHIPS_PER_BLOCK * CHIP_SIZE,
    "a record header with the largest descriptor must fit in one chip block"
);

const _: () = assert!(
    MAX_NAME_LEN < NAME_FIELD_SIZE,
    "names are stored NUL padded"
);

// ============================================================================
// TUNING DEFAULTS
// Runtime-adjustable through Hds::tune; these are the initial values.
// ============================================================================

/// Default initial allocation (blocks) for a newly created container file.
pub const DEFAULT_INALQ: u32 = 2;

/// Default block cache capacity (the "working page list" size).
pub const DEFAULT_MAXWPL: usize = 32;

/// Minimum block cache capacity. Chip allocation pins at most two blocks at
/// once, so the cache must always have evictable room beyond that.
pub const MIN_MAXWPL: usize = 8;

/// Default minimum number of blocks added when a file is extended.
pub const DEFAULT_NBLOCKS: u32 = 8;

/// Default initial capacity of a structure's component table.
pub const DEFAULT_NCOMP: u32 = 6;
