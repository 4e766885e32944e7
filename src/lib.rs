//! # hdsdb - Hierarchical Container-File Storage Engine
//!
//! hdsdb persists named, typed, arbitrarily nested objects (scalars, arrays
//! and structures) inside a single random-access container file, and hands
//! out reference-counted handles ("locators") for navigating and mutating
//! that hierarchy.
//!
//! ## Quick Start
//!
//! ```ignore
//! use hdsdb::{Hds, OpenMode};
//!
//! let hds = Hds::new()?;
//!
//! let top = hds.create("obs", "OBS", "OBSERVATION", &[])?;
//! hds.new_component(top, "EXPOSURE", "_DOUBLE", &[])?;
//! let exposure = hds.find(top, "EXPOSURE")?;
//! hds.put(exposure, &[30.0f64])?;
//! hds.annul(exposure)?;
//! hds.annul(top)?;
//!
//! let top = hds.open("obs.sdf", OpenMode::Read)?;
//! let exposure = hds.find(top, "EXPOSURE")?;
//! assert_eq!(hds.get::<f64>(exposure)?, vec![30.0]);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │        Public API (Hds engine)       │
//! ├──────────────────┬──────────────────┤
//! │  Locators        │  Path Tracer     │
//! ├──────────────────┴──────────────────┤
//! │  Records (labels, descriptors,       │
//! │  component tables, cell vectors)     │
//! ├─────────────────────────────────────┤
//! │  Container allocator (blocks, chips) │
//! ├─────────────────────────────────────┤
//! │  Block cache (SIEVE, write-back)     │
//! ├─────────────────────────────────────┤
//! │  Container files (header, locks)     │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## File Layout
//!
//! ```text
//! obs.sdf
//! ├── blocks 1-2   header: stamp, version, eof, top-level object,
//! │                free-space stack, chip-block list
//! └── blocks 3..   chip blocks (bitmap + 15 chips of 34 bytes) and
//!                  extended frames holding large record data
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: container files, block cache, free space, chips
//! - [`records`]: record labels, descriptors, child indices, `RecordStore`
//! - [`locator`]: locator handles and subscripts
//! - [`trace`]: path reconstruction
//! - [`engine`]: the `Hds` facade, tuning and diagnostics
//! - [`error`]: `HdsError` and `ErrorKind`
//! - [`config`]: format constants and tuning defaults

#[macro_use]
mod macros;

pub mod config;
pub mod engine;
pub mod error;
pub mod locator;
pub mod records;
pub mod slots;
pub mod storage;
pub mod trace;

pub use engine::{FileStatus, Hds, HdsBuilder, LocatorStatus, ObjectInfo, Tuning, TuningParam};
pub use error::{error_kind, hds_error, ErrorKind, HdsError};
pub use locator::Locator;
pub use records::{Primitive, PrimitiveType};
pub use storage::{CacheStats, OpenMode, RecordId, SpaceReport};
pub use trace::TracedPath;
