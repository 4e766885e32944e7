//! # Internal Macros
//!
//! ## zerocopy_accessors!
//!
//! Generates getter and setter methods for the little-endian fields of the
//! on-disk structs (`ContainerHeader`, `Rcl`). Fields keep their zerocopy
//! wrapper types (`U16`, `U32`) so the structs can be cast straight from a
//! block buffer, while callers see native integers.
//!
//! ### Usage
//!
//! ```ignore
//! use zerocopy::little_endian::{U16, U32};
//!
//! #[repr(C)]
//! struct Rcl {
//!     dlen: U32,
//!     slen: U16,
//! }
//!
//! impl Rcl {
//!     zerocopy_accessors! {
//!         dlen: u32,
//!         slen: u16,
//!     }
//! }
//!
//! // Generates:
//! // pub fn dlen(&self) -> u32 { self.dlen.get() }
//! // pub fn set_dlen(&mut self, val: u32) { self.dlen = U32::new(val); }
//! // pub fn slen(&self) -> u16 { self.slen.get() }
//! // pub fn set_slen(&mut self, val: u16) { self.slen = U16::new(val); }
//! ```

/// Generates getter and setter methods for zerocopy little-endian fields.
#[macro_export]
macro_rules! zerocopy_accessors {
    (@impl $field:ident, u16) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> u16 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: u16) {
                self.$field = ::zerocopy::little_endian::U16::new(val);
            }
        }
    };
    (@impl $field:ident, u32) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> u32 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: u32) {
                self.$field = ::zerocopy::little_endian::U32::new(val);
            }
        }
    };
    ($($field:ident : $ty:tt),* $(,)?) => {
        $(
            $crate::zerocopy_accessors!(@impl $field, $ty);
        )*
    };
}
