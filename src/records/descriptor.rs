//! # Object Types and Descriptors
//!
//! Every record carries a descriptor naming its type and shape:
//!
//! ```text
//! Offset  Size       Description
//! 0       16         Type name (NUL padded)
//! 16      4          Number of dimensions (0 = scalar, at most 7)
//! 20      4 x naxes  Extent along each dimension
//! ```
//!
//! ## Types
//!
//! | Type        | Element size | Rust type |
//! |-------------|--------------|-----------|
//! | `_BYTE`     | 1            | `i8`      |
//! | `_UBYTE`    | 1            | `u8`      |
//! | `_WORD`     | 2            | `i16`     |
//! | `_UWORD`    | 2            | `u16`     |
//! | `_INTEGER`  | 4            | `i32`     |
//! | `_INT64`    | 8            | `i64`     |
//! | `_REAL`     | 4            | `f32`     |
//! | `_DOUBLE`   | 8            | `f64`     |
//! | `_LOGICAL`  | 4            | `bool`    |
//! | `_CHAR*n`   | n            | `str`     |
//!
//! Any other type name denotes a structure. Names and types are 1-15
//! characters from `A-Z`, `0-9` and `_`, and are stored upper-case. Primitive
//! type names start with `_`; structure type names must not.

use eyre::Result;
use smallvec::SmallVec;

use crate::config::{DESCRIPTOR_BASE_SIZE, MAX_DIMS, MAX_NAME_LEN, NAME_FIELD_SIZE};
use crate::error::{hds_bail, hds_ensure, HdsError};
use crate::storage::{decode_name, encode_name};

pub type Dims = SmallVec<[u32; MAX_DIMS]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Byte,
    UByte,
    Word,
    UWord,
    Integer,
    Int64,
    Real,
    Double,
    Logical,
    Char(u32),
}

impl PrimitiveType {
    pub fn element_size(&self) -> usize {
        match self {
            PrimitiveType::Byte | PrimitiveType::UByte => 1,
            PrimitiveType::Word | PrimitiveType::UWord => 2,
            PrimitiveType::Integer | PrimitiveType::Real | PrimitiveType::Logical => 4,
            PrimitiveType::Int64 | PrimitiveType::Double => 8,
            PrimitiveType::Char(n) => *n as usize,
        }
    }

    pub fn name(&self) -> String {
        match self {
            PrimitiveType::Byte => "_BYTE".into(),
            PrimitiveType::UByte => "_UBYTE".into(),
            PrimitiveType::Word => "_WORD".into(),
            PrimitiveType::UWord => "_UWORD".into(),
            PrimitiveType::Integer => "_INTEGER".into(),
            PrimitiveType::Int64 => "_INT64".into(),
            PrimitiveType::Real => "_REAL".into(),
            PrimitiveType::Double => "_DOUBLE".into(),
            PrimitiveType::Logical => "_LOGICAL".into(),
            PrimitiveType::Char(n) => format!("_CHAR*{}", n),
        }
    }

    /// Parses an upper-case primitive type name.
    pub fn parse(name: &str) -> Option<Self> {
        let ty = match name {
            "_BYTE" => PrimitiveType::Byte,
            "_UBYTE" => PrimitiveType::UByte,
            "_WORD" => PrimitiveType::Word,
            "_UWORD" => PrimitiveType::UWord,
            "_INTEGER" => PrimitiveType::Integer,
            "_INT64" => PrimitiveType::Int64,
            "_REAL" => PrimitiveType::Real,
            "_DOUBLE" => PrimitiveType::Double,
            "_LOGICAL" => PrimitiveType::Logical,
            "_CHAR" => PrimitiveType::Char(1),
            other => {
                let len = other.strip_prefix("_CHAR*")?;
                let n: u32 = len.parse().ok()?;
                if n == 0 {
                    return None;
                }
                PrimitiveType::Char(n)
            }
        };
        Some(ty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Primitive(PrimitiveType),
    Structure(String),
}

impl ObjectType {
    /// Validates and normalizes a type name.
    pub fn parse(type_name: &str) -> Result<Self> {
        let upper = type_name.trim().to_ascii_uppercase();

        if upper.starts_with('_') {
            hds_ensure!(
                upper.len() <= MAX_NAME_LEN,
                HdsError::invalid(format!("type name '{}' is too long", type_name))
            );
            return match PrimitiveType::parse(&upper) {
                Some(ty) => Ok(ObjectType::Primitive(ty)),
                None => Err(HdsError::invalid(format!("unknown primitive type '{}'", type_name)).into()),
            };
        }

        let name = validate_name(&upper)?;
        Ok(ObjectType::Structure(name))
    }

    pub fn name(&self) -> String {
        match self {
            ObjectType::Primitive(ty) => ty.name(),
            ObjectType::Structure(name) => name.clone(),
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, ObjectType::Primitive(_))
    }

    pub fn primitive(&self) -> Option<PrimitiveType> {
        match self {
            ObjectType::Primitive(ty) => Some(*ty),
            ObjectType::Structure(_) => None,
        }
    }
}

/// Checks an object or structure-type name and returns it upper-cased.
pub fn validate_name(name: &str) -> Result<String> {
    let upper = name.trim().to_ascii_uppercase();

    hds_ensure!(
        !upper.is_empty() && upper.len() <= MAX_NAME_LEN,
        HdsError::invalid(format!(
            "name '{}' must be 1 to {} characters",
            name, MAX_NAME_LEN
        ))
    );
    hds_ensure!(
        upper
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_'),
        HdsError::invalid(format!("name '{}' contains an invalid character", name))
    );
    hds_ensure!(
        !upper.starts_with('_'),
        HdsError::invalid(format!("name '{}' may not start with '_'", name))
    );

    Ok(upper)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDescriptor {
    pub ty: ObjectType,
    pub dims: Dims,
}

impl ObjectDescriptor {
    pub fn new(ty: ObjectType, dims: &[u32]) -> Result<Self> {
        hds_ensure!(
            dims.len() <= MAX_DIMS,
            HdsError::invalid(format!("{} dimensions exceed the limit of {}", dims.len(), MAX_DIMS))
        );
        hds_ensure!(
            dims.iter().all(|&d| d > 0),
            HdsError::invalid(format!("dimensions {:?} must all be positive", dims))
        );

        let desc = Self {
            ty,
            dims: dims.iter().copied().collect(),
        };

        let unit = match &desc.ty {
            ObjectType::Primitive(p) => p.element_size() as u64,
            ObjectType::Structure(_) => crate::config::CELL_ENTRY_SIZE as u64,
        };
        let bytes = desc
            .dims
            .iter()
            .try_fold(unit, |acc, &d| acc.checked_mul(d as u64));
        hds_ensure!(
            bytes.is_some_and(|n| n <= u32::MAX as u64),
            HdsError::invalid(format!("object of shape {:?} is too large", dims))
        );

        Ok(desc)
    }

    pub fn scalar(ty: ObjectType) -> Self {
        Self {
            ty,
            dims: Dims::new(),
        }
    }

    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    pub fn ndims(&self) -> usize {
        self.dims.len()
    }

    pub fn element_count(&self) -> u64 {
        self.dims.iter().map(|&d| d as u64).product()
    }

    /// Data size of a primitive object.
    pub fn primitive_len(&self) -> Option<u32> {
        let ty = self.ty.primitive()?;
        Some((self.element_count() * ty.element_size() as u64) as u32)
    }

    pub fn encode(&self) -> SmallVec<[u8; 64]> {
        let mut out = SmallVec::new();
        out.extend_from_slice(&encode_name(&self.ty.name()));
        out.extend_from_slice(&(self.dims.len() as u32).to_le_bytes());
        for d in &self.dims {
            out.extend_from_slice(&d.to_le_bytes());
        }
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        hds_ensure!(
            bytes.len() >= DESCRIPTOR_BASE_SIZE,
            HdsError::integrity(format!("descriptor of {} bytes is truncated", bytes.len()))
        );

        let type_name = decode_name(&bytes[..NAME_FIELD_SIZE]);
        let naxes = u32::from_le_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]) as usize;
        hds_ensure!(
            naxes <= MAX_DIMS && bytes.len() >= DESCRIPTOR_BASE_SIZE + 4 * naxes,
            HdsError::integrity(format!("descriptor claims {} dimensions", naxes))
        );

        let dims: Dims = (0..naxes)
            .map(|i| {
                let at = DESCRIPTOR_BASE_SIZE + 4 * i;
                u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
            })
            .collect();

        let ty = match ObjectType::parse(&type_name) {
            Ok(ty) => ty,
            Err(_) => hds_bail!(HdsError::integrity(format!(
                "descriptor has invalid type '{}'",
                type_name
            ))),
        };

        Ok(Self { ty, dims })
    }
}
