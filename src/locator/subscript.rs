//! # Subscripts
//!
//! Arrays are stored column-major: the first subscript varies fastest.
//! Subscripts are 1-based. A locator can address a whole object, one cell of
//! a primitive array, or a rectangular slice; cells and slices are always
//! recorded in terms of the underlying object's own shape, so a cell of a
//! slice is just a cell.
//!
//! ```text
//! dims (3, 2)       offset = (i - 1) + 3 * (j - 1)
//!
//!   (1,1) (2,1) (3,1) (1,2) (2,2) (3,2)
//!     0     1     2     3     4     5
//! ```

use eyre::Result;
use smallvec::SmallVec;

use crate::config::MAX_DIMS;
use crate::error::{hds_ensure, HdsError};
use crate::records::Dims;

/// Inclusive 1-based `(lower, upper)` bounds per dimension.
pub type Bounds = SmallVec<[(u32, u32); MAX_DIMS]>;

/// Column-major element offset of 1-based subscripts.
pub fn offset_of(dims: &[u32], subs: &[u32]) -> u64 {
    let mut offset = 0u64;
    let mut stride = 1u64;
    for (&d, &s) in dims.iter().zip(subs) {
        offset += (s as u64 - 1) * stride;
        stride *= d as u64;
    }
    offset
}

/// Inverse of [`offset_of`].
pub fn subs_of(dims: &[u32], mut offset: u64) -> Dims {
    dims.iter()
        .map(|&d| {
            let d = d as u64;
            let s = offset % d;
            offset /= d;
            s as u32 + 1
        })
        .collect()
}

pub fn format_subs(subs: &[u32]) -> String {
    let parts: Vec<String> = subs.iter().map(|s| s.to_string()).collect();
    format!("({})", parts.join(","))
}

pub fn format_bounds(bounds: &[(u32, u32)]) -> String {
    let parts: Vec<String> = bounds.iter().map(|(l, u)| format!("{}:{}", l, u)).collect();
    format!("({})", parts.join(","))
}

/// The part of an object a locator addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subscript {
    Whole,
    Cell(Dims),
    Slice(Bounds),
}

impl Subscript {
    pub fn is_whole(&self) -> bool {
        matches!(self, Subscript::Whole)
    }

    /// Shape of the addressed part of an object with extents `dims`.
    pub fn shape(&self, dims: &[u32]) -> Dims {
        match self {
            Subscript::Whole => dims.iter().copied().collect(),
            Subscript::Cell(_) => Dims::new(),
            Subscript::Slice(bounds) => bounds.iter().map(|(l, u)| u - l + 1).collect(),
        }
    }

    pub fn element_count(&self, dims: &[u32]) -> u64 {
        self.shape(dims).iter().map(|&d| d as u64).product()
    }

    /// Maps subscripts relative to this view onto the object's subscripts.
    pub fn cell(&self, dims: &[u32], subs: &[u32]) -> Result<Dims> {
        let shape = self.shape(dims);
        hds_ensure!(
            !shape.is_empty(),
            HdsError::invalid("cannot take a cell of a scalar")
        );
        hds_ensure!(
            subs.len() == shape.len(),
            HdsError::invalid(format!(
                "{} subscripts given for {} dimensions",
                subs.len(),
                shape.len()
            ))
        );
        hds_ensure!(
            subs.iter().zip(&shape).all(|(&s, &d)| s >= 1 && s <= d),
            HdsError::invalid(format!(
                "subscripts {} outside shape {:?}",
                format_subs(subs),
                shape.as_slice()
            ))
        );

        Ok(match self {
            Subscript::Slice(bounds) => subs
                .iter()
                .zip(bounds)
                .map(|(&s, &(l, _))| l - 1 + s)
                .collect(),
            _ => subs.iter().copied().collect(),
        })
    }

    /// Maps bounds relative to this view onto the object's bounds.
    pub fn slice(&self, dims: &[u32], bounds: &[(u32, u32)]) -> Result<Bounds> {
        let shape = self.shape(dims);
        hds_ensure!(
            !shape.is_empty(),
            HdsError::invalid("cannot take a slice of a scalar")
        );
        hds_ensure!(
            bounds.len() == shape.len(),
            HdsError::invalid(format!(
                "{} bounds given for {} dimensions",
                bounds.len(),
                shape.len()
            ))
        );
        hds_ensure!(
            bounds
                .iter()
                .zip(&shape)
                .all(|(&(l, u), &d)| l >= 1 && l <= u && u <= d),
            HdsError::invalid(format!(
                "bounds {} outside shape {:?}",
                format_bounds(bounds),
                shape.as_slice()
            ))
        );

        Ok(match self {
            Subscript::Slice(outer) => bounds
                .iter()
                .zip(outer)
                .map(|(&(l, u), &(ol, _))| (ol - 1 + l, ol - 1 + u))
                .collect(),
            _ => bounds.iter().copied().collect(),
        })
    }

    /// Contiguous `(first element, count)` runs covering the addressed
    /// elements in column-major order.
    pub fn runs(&self, dims: &[u32]) -> Vec<(u64, u64)> {
        match self {
            Subscript::Whole => {
                let n: u64 = dims.iter().map(|&d| d as u64).product();
                vec![(0, n)]
            }
            Subscript::Cell(subs) => vec![(offset_of(dims, subs), 1)],
            Subscript::Slice(bounds) => {
                let shape = self.shape(dims);
                let run = shape[0] as u64;
                let outer: u64 = shape[1..].iter().map(|&d| d as u64).product();

                let mut runs = Vec::with_capacity(outer as usize);
                let mut subs: Dims = bounds.iter().map(|&(l, _)| l).collect();
                for k in 0..outer {
                    let mut rem = k;
                    for i in 1..shape.len() {
                        let extent = shape[i] as u64;
                        subs[i] = bounds[i].0 + (rem % extent) as u32;
                        rem /= extent;
                    }
                    runs.push((offset_of(dims, &subs), run));
                }
                runs
            }
        }
    }

    /// Trace suffix: empty, `(i,j)` or `(l:u,l:u)`.
    pub fn suffix(&self) -> String {
        match self {
            Subscript::Whole => String::new(),
            Subscript::Cell(subs) => format_subs(subs),
            Subscript::Slice(bounds) => format_bounds(bounds),
        }
    }
}
