//! # Record Layer
//!
//! Objects live in records. A record is a control label, a descriptor and
//! the object's data, held in a run of chips inside one block, with the data
//! moved to a frame of whole blocks when it does not fit.
//!
//! ## Record Binary Layout
//!
//! ```text
//! +------------------+------------------+------------------------------+
//! | Rcl (24 bytes)   | Descriptor       | Data (inline or in a frame)  |
//! +------------------+------------------+------------------------------+
//! ```
//!
//! | Record class | Data                                            |
//! |--------------|-------------------------------------------------|
//! | Primitive    | Packed little-endian elements, column-major     |
//! | Structure    | Component table (scalar) or cell vector (array) |
//!
//! ## Module Structure
//!
//! - `rcl`: the record control label
//! - `descriptor`: object types, names and shapes
//! - `types`: Rust element types for primitive data
//! - `index`: component tables and cell vectors
//! - `store`: `RecordStore`, record lifecycle on top of a `Container`

pub mod descriptor;
pub mod index;
pub mod rcl;
pub mod store;
pub mod types;

pub use descriptor::{validate_name, Dims, ObjectDescriptor, ObjectType, PrimitiveType};
pub use index::{decode_cells, encode_cells, ComponentTable};
pub use rcl::{Rcl, RecordClass};
pub use store::{RecordHeader, RecordStore};
pub use types::{decode_strings, decode_values, encode_strings, encode_values, Primitive};

pub use crate::storage::RecordId;
