//! # Record Control Label
//!
//! The fixed 24-byte header at the start of every record:
//!
//! ```text
//! Offset  Size  Description
//! 0       1     Class (1 = structure, 2 = primitive, 0 = free)
//! 1       1     Flags (bit 0 active, bit 1 extended)
//! 2       1     Number of chips holding the record
//! 3       1     Reserved
//! 4       4     Parent record block (0 = top level)
//! 8       2     Parent record chip
//! 10      2     Descriptor length
//! 12      4     Data length
//! 16      4     First block of the extended frame
//! 20      4     Extended frame length in blocks
//! ```
//!
//! The descriptor follows the label. The data follows the descriptor when it
//! fits in the record's chips; otherwise the record is "extended" and its data
//! lives in the frame.

use zerocopy::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::RCL_SIZE;
use crate::storage::RecordId;

pub const FLAG_ACTIVE: u8 = 0x01;
pub const FLAG_EXTENDED: u8 = 0x02;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordClass {
    Structure = 1,
    Primitive = 2,
}

impl RecordClass {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(RecordClass::Structure),
            2 => Some(RecordClass::Primitive),
            _ => None,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct Rcl {
    class: u8,
    flags: u8,
    nchips: u8,
    reserved: u8,
    parent_block: U32,
    parent_chip: U16,
    slen: U16,
    dlen: U32,
    frame: U32,
    frame_blocks: U32,
}

const _: () = assert!(std::mem::size_of::<Rcl>() == RCL_SIZE);

impl Rcl {
    pub fn new(class: RecordClass, parent: RecordId, nchips: u8, slen: u16, dlen: u32) -> Self {
        Self {
            class: class as u8,
            flags: FLAG_ACTIVE,
            nchips,
            reserved: 0,
            parent_block: U32::new(parent.block),
            parent_chip: U16::new(parent.chip),
            slen: U16::new(slen),
            dlen: U32::new(dlen),
            frame: U32::new(0),
            frame_blocks: U32::new(0),
        }
    }

    zerocopy_accessors! {
        slen: u16,
        dlen: u32,
        frame: u32,
        frame_blocks: u32,
    }

    pub fn class(&self) -> Option<RecordClass> {
        RecordClass::from_u8(self.class)
    }

    pub fn nchips(&self) -> usize {
        self.nchips as usize
    }

    pub fn parent(&self) -> RecordId {
        RecordId::new(self.parent_block.get(), self.parent_chip.get())
    }

    pub fn is_active(&self) -> bool {
        self.flags & FLAG_ACTIVE != 0
    }

    pub fn is_extended(&self) -> bool {
        self.flags & FLAG_EXTENDED != 0
    }

    pub fn set_extended(&mut self, frame: u32, frame_blocks: u32) {
        self.flags |= FLAG_EXTENDED;
        self.set_frame(frame);
        self.set_frame_blocks(frame_blocks);
    }

    pub fn clear_extended(&mut self) {
        self.flags &= !FLAG_EXTENDED;
        self.set_frame(0);
        self.set_frame_blocks(0);
    }

    /// Size of label plus descriptor.
    pub fn header_len(&self) -> usize {
        RCL_SIZE + self.slen() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rcl_is_24_bytes() {
        assert_eq!(std::mem::size_of::<Rcl>(), 24);
    }

    #[test]
    fn zeroed_label_is_not_active() {
        let rcl = Rcl::read_from_bytes(&[0u8; RCL_SIZE]).unwrap();

        assert!(!rcl.is_active());
        assert_eq!(rcl.class(), None);
    }

    #[test]
    fn extended_flag_roundtrip() {
        let mut rcl = Rcl::new(RecordClass::Primitive, RecordId::new(3, 1), 2, 20, 4096);
        rcl.set_extended(40, 8);

        let back = Rcl::read_from_bytes(rcl.as_bytes()).unwrap();
        assert!(back.is_extended() && back.is_active());
        assert_eq!((back.frame(), back.frame_blocks()), (40, 8));
        assert_eq!(back.parent(), RecordId::new(3, 1));

        let mut inline = back;
        inline.clear_extended();
        assert!(!inline.is_extended());
        assert_eq!(inline.frame(), 0);
    }
}
