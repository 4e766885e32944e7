//! # Record Store
//!
//! `RecordStore` maps records onto chips and blocks through a `Container`.
//!
//! ## Record Placement
//!
//! ```text
//! inline:    chips [ Rcl | descriptor | data ]
//!
//! extended:  chips [ Rcl | descriptor ]
//!            frame [ data ........................ ]   whole blocks
//! ```
//!
//! A record is created inline when label, descriptor and data fit in at most
//! 15 chips; otherwise only the header goes in chips and the data gets a
//! frame. The chip run is never reallocated, so a record's id is stable for
//! its whole life. Resizing moves the data between the chips and a frame as
//! needed, preserving the leading bytes and zero-filling growth.
//!
//! ## Integrity Checks
//!
//! Freed chips are zeroed, so reading a freed record fails the active-flag
//! check. Reads through a parent (`child`) also check the child's parent link,
//! which catches a stale id whose chips were reused by another record.
//!
//! Erasing a subtree reads and checks every header below it before anything
//! is unlinked or freed, so a damaged descendant aborts the erase with the
//! tree untouched.

use eyre::{Result, WrapErr};
use hashbrown::HashSet;
use tracing::{trace, warn};
use zerocopy::{FromBytes, IntoBytes};

use super::descriptor::{ObjectDescriptor, ObjectType};
use super::index::{decode_cells, encode_cells, ComponentTable};
use super::rcl::{Rcl, RecordClass};
use crate::config::{BLOCK_SIZE, CELL_ENTRY_SIZE, CHIPS_PER_BLOCK, CHIP_SIZE, RCL_SIZE};
use crate::error::{hds_bail, hds_ensure, HdsError};
use crate::storage::{chips_for, Container, RecordId};

/// A record's label and decoded descriptor.
#[derive(Debug, Clone)]
pub struct RecordHeader {
    pub rid: RecordId,
    pub rcl: Rcl,
    pub descriptor: ObjectDescriptor,
}

impl RecordHeader {
    pub fn parent(&self) -> RecordId {
        self.rcl.parent()
    }

    pub fn dlen(&self) -> usize {
        self.rcl.dlen() as usize
    }

    pub fn is_structure(&self) -> bool {
        self.rcl.class() == Some(RecordClass::Structure)
    }

    pub fn is_structure_array(&self) -> bool {
        self.is_structure() && !self.descriptor.is_scalar()
    }

    pub fn is_scalar_structure(&self) -> bool {
        self.is_structure() && self.descriptor.is_scalar()
    }

    /// Bytes available for inline data in the record's chips.
    fn inline_capacity(&self) -> usize {
        (self.rcl.nchips() * CHIP_SIZE).saturating_sub(self.rcl.header_len())
    }

    /// Where the data lives: (first block, byte offset).
    fn data_location(&self) -> (u32, usize) {
        if self.rcl.is_extended() {
            (self.rcl.frame(), 0)
        } else {
            (self.rid.block, self.rid.offset() + self.rcl.header_len())
        }
    }
}

fn blocks_for(bytes: usize) -> u32 {
    bytes.div_ceil(BLOCK_SIZE).max(1) as u32
}

pub struct RecordStore<'a> {
    container: Container<'a>,
    ncomp: u32,
}

impl<'a> RecordStore<'a> {
    pub fn new(container: Container<'a>, ncomp: u32) -> Self {
        Self {
            container,
            ncomp: ncomp.max(1),
        }
    }

    pub fn container(&mut self) -> &mut Container<'a> {
        &mut self.container
    }

    pub fn read_header(&mut self, rid: RecordId) -> Result<RecordHeader> {
        hds_ensure!(
            !rid.is_null() && (rid.chip as usize) < CHIPS_PER_BLOCK,
            HdsError::integrity(format!("invalid record id {}", rid))
        );

        let mut raw = [0u8; RCL_SIZE];
        self.container
            .read_bytes(rid.block, rid.offset(), &mut raw)
            .wrap_err_with(|| format!("failed to read record {}", rid))?;
        let rcl = Rcl::read_from_bytes(&raw)
            .map_err(|_| HdsError::integrity(format!("unreadable label in record {}", rid)))?;

        hds_ensure!(
            rcl.is_active() && rcl.class().is_some(),
            HdsError::integrity(format!("record {} is not active", rid))
        );
        hds_ensure!(
            rcl.nchips() >= 1
                && rid.chip as usize + rcl.nchips() <= CHIPS_PER_BLOCK
                && rcl.header_len() <= rcl.nchips() * CHIP_SIZE,
            HdsError::integrity(format!("record {} has a corrupt label", rid))
        );

        let mut desc = vec![0u8; rcl.slen() as usize];
        self.container
            .read_bytes(rid.block, rid.offset() + RCL_SIZE, &mut desc)?;
        let descriptor = ObjectDescriptor::decode(&desc)
            .wrap_err_with(|| format!("corrupt descriptor in record {}", rid))?;

        let header = RecordHeader {
            rid,
            rcl,
            descriptor,
        };
        hds_ensure!(
            header.rcl.is_extended() || header.dlen() <= header.inline_capacity(),
            HdsError::integrity(format!("record {} data overflows its chips", rid))
        );
        Ok(header)
    }

    /// Reads a record reached through `parent`, checking its parent link.
    pub fn child(&mut self, parent: RecordId, rid: RecordId) -> Result<RecordHeader> {
        let header = self.read_header(rid)?;
        hds_ensure!(
            header.parent() == parent,
            HdsError::integrity(format!(
                "record {} claims parent {} but is indexed by {}",
                rid,
                header.parent(),
                parent
            ))
        );
        Ok(header)
    }

    fn write_rcl(&mut self, rid: RecordId, rcl: &Rcl) -> Result<()> {
        self.container
            .write_bytes(rid.block, rid.offset(), rcl.as_bytes())
    }

    /// Creates a record with zero-filled data of `dlen` bytes.
    pub fn create_record(
        &mut self,
        parent: RecordId,
        class: RecordClass,
        descriptor: &ObjectDescriptor,
        dlen: u32,
    ) -> Result<RecordId> {
        self.container.ensure_writable()?;

        let desc = descriptor.encode();
        let header_len = RCL_SIZE + desc.len();
        let total = header_len + dlen as usize;
        let inline = chips_for(total) <= CHIPS_PER_BLOCK;
        let nchips = if inline {
            chips_for(total)
        } else {
            chips_for(header_len)
        };

        let rid = self.container.allocate_chips(nchips)?;
        let mut rcl = Rcl::new(class, parent, nchips as u8, desc.len() as u16, dlen);

        if !inline {
            let blocks = blocks_for(dlen as usize);
            match self.container.allocate(blocks) {
                Ok(frame) => rcl.set_extended(frame, blocks),
                Err(err) => {
                    self.container.deallocate_chips(rid, nchips)?;
                    return Err(err);
                }
            }
        }

        let result = (|| {
            self.write_rcl(rid, &rcl)?;
            self.container
                .write_bytes(rid.block, rid.offset() + RCL_SIZE, &desc)?;
            if rcl.is_extended() {
                self.container
                    .zero_bytes(rcl.frame(), 0, rcl.frame_blocks() as usize * BLOCK_SIZE)
            } else {
                self.container
                    .zero_bytes(rid.block, rid.offset() + header_len, dlen as usize)
            }
        })();

        if let Err(err) = result {
            if rcl.is_extended() {
                if let Err(free_err) = self.container.deallocate(rcl.frame(), rcl.frame_blocks()) {
                    warn!(%rid, "failed to free frame of unfinished record: {free_err:#}");
                }
            }
            if let Err(free_err) = self.container.deallocate_chips(rid, nchips) {
                warn!(%rid, "failed to free chips of unfinished record: {free_err:#}");
            }
            return Err(err);
        }

        trace!(%rid, nchips, dlen, extended = rcl.is_extended(), "created record");
        Ok(rid)
    }

    /// Frees one record's chips and frame. Children are not touched.
    pub fn free_record(&mut self, rid: RecordId) -> Result<()> {
        let header = self.read_header(rid)?;
        self.free_with_header(&header)
    }

    /// Frees a record on an error path, where a failure can only be logged.
    fn discard(&mut self, rid: RecordId) {
        if let Err(err) = self.free_record(rid) {
            warn!(%rid, "failed to free record on error path, chips leaked: {err:#}");
        }
    }

    fn free_with_header(&mut self, header: &RecordHeader) -> Result<()> {
        self.container.ensure_writable()?;
        if header.rcl.is_extended() {
            self.container
                .deallocate(header.rcl.frame(), header.rcl.frame_blocks())?;
        }
        self.container
            .deallocate_chips(header.rid, header.rcl.nchips())?;
        trace!(rid = %header.rid, "freed record");
        Ok(())
    }

    pub fn read_data(&mut self, rid: RecordId, offset: usize, buf: &mut [u8]) -> Result<()> {
        let header = self.read_header(rid)?;
        self.read_data_with(&header, offset, buf)
    }

    fn read_data_with(&mut self, header: &RecordHeader, offset: usize, buf: &mut [u8]) -> Result<()> {
        hds_ensure!(
            offset + buf.len() <= header.dlen(),
            HdsError::invalid(format!(
                "read of {}+{} bytes past the {} bytes of record {}",
                offset,
                buf.len(),
                header.dlen(),
                header.rid
            ))
        );
        let (start, base) = header.data_location();
        self.container.read_bytes(start, base + offset, buf)
    }

    pub fn write_data(&mut self, rid: RecordId, offset: usize, data: &[u8]) -> Result<()> {
        let header = self.read_header(rid)?;
        self.write_data_with(&header, offset, data)
    }

    fn write_data_with(&mut self, header: &RecordHeader, offset: usize, data: &[u8]) -> Result<()> {
        self.container.ensure_writable()?;
        hds_ensure!(
            offset + data.len() <= header.dlen(),
            HdsError::invalid(format!(
                "write of {}+{} bytes past the {} bytes of record {}",
                offset,
                data.len(),
                header.dlen(),
                header.rid
            ))
        );
        let (start, base) = header.data_location();
        self.container.write_bytes(start, base + offset, data)
    }

    pub fn read_record(&mut self, rid: RecordId) -> Result<Vec<u8>> {
        let header = self.read_header(rid)?;
        let mut data = vec![0u8; header.dlen()];
        self.read_data_with(&header, 0, &mut data)?;
        Ok(data)
    }

    /// Replaces a record's data, resizing it first if the length differs.
    pub fn write_record(&mut self, rid: RecordId, data: &[u8]) -> Result<()> {
        let mut header = self.read_header(rid)?;
        if header.dlen() != data.len() {
            header = self.resize_with(header, data.len())?;
        }
        self.write_data_with(&header, 0, data)
    }

    pub fn resize_data(&mut self, rid: RecordId, new_len: usize) -> Result<()> {
        let header = self.read_header(rid)?;
        self.resize_with(header, new_len)?;
        Ok(())
    }

    fn resize_with(&mut self, mut header: RecordHeader, new_len: usize) -> Result<RecordHeader> {
        self.container.ensure_writable()?;
        hds_ensure!(
            new_len <= u32::MAX as usize,
            HdsError::invalid(format!("record size {} is too large", new_len))
        );

        let old_len = header.dlen();
        if new_len == old_len {
            return Ok(header);
        }
        let rid = header.rid;
        let keep = old_len.min(new_len);
        let inline_start = rid.offset() + header.rcl.header_len();

        if new_len <= header.inline_capacity() {
            if header.rcl.is_extended() {
                let mut kept = vec![0u8; keep];
                self.container
                    .read_bytes(header.rcl.frame(), 0, &mut kept)?;
                self.container
                    .deallocate(header.rcl.frame(), header.rcl.frame_blocks())?;
                self.container.write_bytes(rid.block, inline_start, &kept)?;
                header.rcl.clear_extended();
            }
            if new_len > keep {
                self.container
                    .zero_bytes(rid.block, inline_start + keep, new_len - keep)?;
            }
        } else {
            let blocks = blocks_for(new_len);
            if header.rcl.is_extended() {
                let frame = self.container.extend_frame(
                    header.rcl.frame(),
                    header.rcl.frame_blocks(),
                    blocks,
                )?;
                header.rcl.set_extended(frame, blocks);
            } else {
                let frame = self.container.allocate(blocks)?;
                let mut kept = vec![0u8; keep];
                self.container.read_bytes(rid.block, inline_start, &mut kept)?;
                self.container.write_bytes(frame, 0, &kept)?;
                header.rcl.set_extended(frame, blocks);
            }
            if new_len > keep {
                self.container
                    .zero_bytes(header.rcl.frame(), keep, new_len - keep)?;
            }
        }

        header.rcl.set_dlen(new_len as u32);
        self.write_rcl(rid, &header.rcl)?;
        trace!(%rid, old_len, new_len, extended = header.rcl.is_extended(), "resized record");
        Ok(header)
    }

    /// Rewrites the descriptor of a record. The encoded length must not
    /// change, so only extents (not the number of dimensions) may differ.
    pub fn rewrite_descriptor(&mut self, rid: RecordId, descriptor: &ObjectDescriptor) -> Result<()> {
        self.container.ensure_writable()?;
        let header = self.read_header(rid)?;
        let desc = descriptor.encode();
        hds_ensure!(
            desc.len() == header.rcl.slen() as usize,
            HdsError::invalid("the number of dimensions cannot change")
        );
        self.container
            .write_bytes(rid.block, rid.offset() + RCL_SIZE, &desc)
    }

    /// Changes the extents of an array, keeping its leading elements in
    /// storage order. Structure arrays gain new empty cells or free their
    /// trailing ones; the freed record ids are returned.
    pub fn reshape(&mut self, rid: RecordId, descriptor: &ObjectDescriptor) -> Result<Vec<RecordId>> {
        let header = self.read_header(rid)?;
        hds_ensure!(
            descriptor.ty == header.descriptor.ty,
            HdsError::invalid("the type of an object cannot change")
        );
        hds_ensure!(
            descriptor.ndims() == header.descriptor.ndims(),
            HdsError::invalid(format!(
                "cannot change {} dimensions to {}",
                header.descriptor.ndims(),
                descriptor.ndims()
            ))
        );
        if descriptor.dims == header.descriptor.dims {
            return Ok(Vec::new());
        }

        let mut freed = Vec::new();
        if header.is_structure() {
            let mut cells = self.cells(rid)?;
            let count = descriptor.element_count() as usize;
            if count < cells.len() {
                let mut doomed = Vec::new();
                for &cell in &cells[count..] {
                    doomed.extend(self.collect_tree(cell)?);
                }
                cells.truncate(count);
                self.write_record(rid, &encode_cells(&cells))?;
                self.free_headers(&doomed, &mut freed);
            } else {
                let before = cells.len();
                let cell_desc = ObjectDescriptor::scalar(descriptor.ty.clone());
                let result = (|| {
                    while cells.len() < count {
                        cells.push(self.create_object(rid, &cell_desc)?);
                    }
                    self.write_record(rid, &encode_cells(&cells))
                })();
                if let Err(err) = result {
                    for cell in cells.drain(before..) {
                        self.discard(cell);
                    }
                    return Err(err);
                }
            }
        } else {
            let len = descriptor.primitive_len().unwrap_or(0) as usize;
            self.resize_data(rid, len)?;
        }

        self.rewrite_descriptor(rid, descriptor)?;
        Ok(freed)
    }

    /// Creates a primitive or structure object. Structure arrays get one
    /// scalar structure cell per element. On failure nothing is left
    /// allocated.
    pub fn create_object(&mut self, parent: RecordId, descriptor: &ObjectDescriptor) -> Result<RecordId> {
        match &descriptor.ty {
            ObjectType::Primitive(_) => {
                let dlen = descriptor.primitive_len().unwrap_or(0);
                self.create_record(parent, RecordClass::Primitive, descriptor, dlen)
            }
            ObjectType::Structure(_) if descriptor.is_scalar() => {
                self.create_scalar_structure(parent, descriptor)
            }
            ObjectType::Structure(_) => self.create_structure_array(parent, descriptor),
        }
    }

    fn create_scalar_structure(&mut self, parent: RecordId, descriptor: &ObjectDescriptor) -> Result<RecordId> {
        let table = ComponentTable::with_capacity(self.ncomp as usize);
        let data = table.encode();
        let rid = self.create_record(
            parent,
            RecordClass::Structure,
            descriptor,
            data.len() as u32,
        )?;
        if let Err(err) = self.write_data(rid, 0, &data) {
            self.discard(rid);
            return Err(err);
        }
        Ok(rid)
    }

    fn create_structure_array(&mut self, parent: RecordId, descriptor: &ObjectDescriptor) -> Result<RecordId> {
        let count = descriptor.element_count() as usize;
        let rid = self.create_record(
            parent,
            RecordClass::Structure,
            descriptor,
            (count * CELL_ENTRY_SIZE) as u32,
        )?;

        let cell_desc = ObjectDescriptor::scalar(descriptor.ty.clone());
        let mut cells = Vec::with_capacity(count);
        let result = (|| {
            for _ in 0..count {
                cells.push(self.create_scalar_structure(rid, &cell_desc)?);
            }
            self.write_data(rid, 0, &encode_cells(&cells))
        })();

        if let Err(err) = result {
            for cell in cells {
                self.discard(cell);
            }
            self.discard(rid);
            return Err(err);
        }
        Ok(rid)
    }

    fn scalar_structure(&mut self, rid: RecordId) -> Result<RecordHeader> {
        let header = self.read_header(rid)?;
        hds_ensure!(
            header.is_scalar_structure(),
            HdsError::invalid(format!("record {} is not a scalar structure", rid))
        );
        Ok(header)
    }

    pub fn component_table(&mut self, rid: RecordId) -> Result<ComponentTable> {
        let header = self.scalar_structure(rid)?;
        let mut data = vec![0u8; header.dlen()];
        self.read_data_with(&header, 0, &mut data)?;
        ComponentTable::decode(&data).wrap_err_with(|| format!("in structure record {}", rid))
    }

    fn store_component_table(&mut self, rid: RecordId, table: &ComponentTable) -> Result<()> {
        self.write_record(rid, &table.encode())
    }

    pub fn list_components(&mut self, rid: RecordId) -> Result<Vec<(String, RecordId)>> {
        Ok(self.component_table(rid)?.entries().to_vec())
    }

    pub fn find_component(&mut self, rid: RecordId, name: &str) -> Result<Option<RecordId>> {
        Ok(self.component_table(rid)?.find(name))
    }

    pub fn insert_component(&mut self, rid: RecordId, name: &str, child: RecordId) -> Result<()> {
        let mut table = self.component_table(rid)?;
        table.insert(name, child)?;
        self.store_component_table(rid, &table)
    }

    pub fn remove_component(&mut self, rid: RecordId, name: &str) -> Result<RecordId> {
        let mut table = self.component_table(rid)?;
        let Some(child) = table.remove(name) else {
            hds_bail!(HdsError::NotFound(name.to_string()));
        };
        self.store_component_table(rid, &table)?;
        Ok(child)
    }

    pub fn rename_component(&mut self, rid: RecordId, old: &str, new: &str) -> Result<()> {
        let mut table = self.component_table(rid)?;
        table.rename(old, new)?;
        self.store_component_table(rid, &table)
    }

    /// Name under which `child` is indexed in the scalar structure `parent`.
    pub fn component_name_of(&mut self, parent: RecordId, child: RecordId) -> Result<String> {
        let table = self.component_table(parent)?;
        match table.name_of(child) {
            Some(name) => Ok(name.to_string()),
            None => hds_bail!(HdsError::integrity(format!(
                "record {} is missing from the component table of {}",
                child, parent
            ))),
        }
    }

    pub fn cells(&mut self, rid: RecordId) -> Result<Vec<RecordId>> {
        let header = self.read_header(rid)?;
        hds_ensure!(
            header.is_structure_array(),
            HdsError::invalid(format!("record {} is not a structure array", rid))
        );
        let mut data = vec![0u8; header.dlen()];
        self.read_data_with(&header, 0, &mut data)?;
        Ok(decode_cells(&data))
    }

    /// The cell record at a 0-based column-major element offset.
    pub fn get_cell(&mut self, rid: RecordId, offset: u64) -> Result<RecordId> {
        let header = self.read_header(rid)?;
        hds_ensure!(
            header.is_structure_array(),
            HdsError::invalid(format!("record {} is not a structure array", rid))
        );
        hds_ensure!(
            offset < header.descriptor.element_count(),
            HdsError::NotFound(format!("cell {} of record {}", offset + 1, rid))
        );
        let mut raw = [0u8; CELL_ENTRY_SIZE];
        self.read_data_with(&header, offset as usize * CELL_ENTRY_SIZE, &mut raw)?;
        Ok(RecordId::from_le_bytes(&raw))
    }

    /// Element offset of `child` in the cell vector of `parent`.
    pub fn cell_offset_of(&mut self, parent: RecordId, child: RecordId) -> Result<u64> {
        match self.cells(parent)?.iter().position(|&c| c == child) {
            Some(pos) => Ok(pos as u64),
            None => hds_bail!(HdsError::integrity(format!(
                "record {} is missing from the cell vector of {}",
                child, parent
            ))),
        }
    }

    /// Removes a component and frees it with all its descendants. Returns
    /// every record id of the erased subtree.
    ///
    /// The whole subtree is checked first; if any descendant is damaged the
    /// erase fails and nothing changes.
    pub fn erase_component(&mut self, rid: RecordId, name: &str) -> Result<Vec<RecordId>> {
        let child = self.component_table(rid)?.find(name);
        let Some(child) = child else {
            hds_bail!(HdsError::NotFound(name.to_string()));
        };
        self.child(rid, child)?;
        let headers = self
            .collect_tree(child)
            .wrap_err_with(|| format!("component '{}' has a damaged descendant", name))?;

        self.remove_component(rid, name)?;
        let mut freed = Vec::new();
        self.free_headers(&headers, &mut freed);
        Ok(freed)
    }

    /// Frees a record and all its descendants, after checking all of them.
    pub fn free_tree(&mut self, rid: RecordId, freed: &mut Vec<RecordId>) -> Result<()> {
        let headers = self.collect_tree(rid)?;
        self.free_headers(&headers, freed);
        Ok(())
    }

    /// Reads and checks the headers of `rid` and everything below it,
    /// parents before children. Every child must name its indexing record
    /// as parent and appear in the tree once.
    pub fn collect_tree(&mut self, rid: RecordId) -> Result<Vec<RecordHeader>> {
        let mut headers = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![(None, rid)];

        while let Some((parent, next)) = stack.pop() {
            hds_ensure!(
                seen.insert(next),
                HdsError::integrity(format!("record {} is indexed twice below {}", next, rid))
            );
            let header = self.read_header(next)?;
            if let Some(parent) = parent {
                hds_ensure!(
                    header.parent() == parent,
                    HdsError::integrity(format!(
                        "record {} is indexed by {} but names {} as parent",
                        next,
                        parent,
                        header.parent()
                    ))
                );
            }

            if header.is_scalar_structure() {
                let table = self.component_table(next)?;
                stack.extend(table.entries().iter().map(|(_, c)| (Some(next), *c)));
            } else if header.is_structure_array() {
                stack.extend(self.cells(next)?.into_iter().map(|c| (Some(next), c)));
            }
            headers.push(header);
        }
        Ok(headers)
    }

    /// Frees checked records. The records are already unlinked, so a failure
    /// leaks that record's space and is logged; the id is still reported.
    fn free_headers(&mut self, headers: &[RecordHeader], freed: &mut Vec<RecordId>) {
        for header in headers {
            if let Err(err) = self.free_with_header(header) {
                warn!(rid = %header.rid, "failed to free erased record, space leaked: {err:#}");
            }
            freed.push(header.rid);
        }
    }

    /// Blocks in use by `rid` and its descendants: every chip block holding
    /// one of their labels plus their extended frames.
    pub fn used_blocks(&mut self, rid: RecordId) -> Result<u64> {
        let headers = self.collect_tree(rid)?;
        let chip_blocks: HashSet<u32> = headers.iter().map(|h| h.rid.block).collect();
        let frames: u64 = headers
            .iter()
            .filter(|h| h.rcl.is_extended())
            .map(|h| h.rcl.frame_blocks() as u64)
            .sum();
        Ok(chip_blocks.len() as u64 + frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{error_kind, ErrorKind};
    use crate::records::descriptor::PrimitiveType;
    use crate::slots::SlotId;
    use crate::storage::{BlockCache, FileOptions, FileTable};
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        _dir: TempDir,
        files: FileTable,
        cache: BlockCache,
        slot: SlotId,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            let mut files = FileTable::new();
            let opts = FileOptions {
                inalq: 2,
                syslck: false,
                wait: false,
            };
            let slot = files.create(&dir.path().join("r.sdf"), "TOP", opts).unwrap();
            Self {
                _dir: dir,
                files,
                cache: BlockCache::new(32).unwrap(),
                slot,
            }
        }

        fn store(&mut self) -> RecordStore<'_> {
            let container = Container::new(&mut self.files, &mut self.cache, self.slot, 8).unwrap();
            RecordStore::new(container, 6)
        }
    }

    fn bytes_desc(n: u32) -> ObjectDescriptor {
        ObjectDescriptor::new(ObjectType::Primitive(PrimitiveType::UByte), &[n]).unwrap()
    }

    fn struct_desc(dims: &[u32]) -> ObjectDescriptor {
        ObjectDescriptor::new(ObjectType::Structure("S".into()), dims).unwrap()
    }

    fn pattern(n: usize) -> Vec<u8> {
        (0..n).map(|i| (i * 7 % 256) as u8).collect()
    }

    #[test]
    fn write_then_read_across_sizes() {
        let mut fx = Fixture::new();
        let mut store = fx.store();

        for size in [10usize, 300, 5000] {
            let rid = store
                .create_object(RecordId::NULL, &bytes_desc(size as u32))
                .unwrap();
            let data = pattern(size);
            store.write_record(rid, &data).unwrap();

            assert_eq!(store.read_record(rid).unwrap(), data, "size {}", size);
        }
    }

    #[test]
    fn small_record_is_inline_and_large_is_extended() {
        let mut fx = Fixture::new();
        let mut store = fx.store();

        let small = store.create_object(RecordId::NULL, &bytes_desc(100)).unwrap();
        let large = store.create_object(RecordId::NULL, &bytes_desc(2000)).unwrap();

        assert!(!store.read_header(small).unwrap().rcl.is_extended());
        let header = store.read_header(large).unwrap();
        assert!(header.rcl.is_extended());
        assert_eq!(header.rcl.frame_blocks(), 4);
    }

    #[test]
    fn growing_preserves_data_and_zero_fills() {
        let mut fx = Fixture::new();
        let mut store = fx.store();
        let rid = store.create_object(RecordId::NULL, &bytes_desc(40)).unwrap();
        store.write_data(rid, 0, &pattern(40)).unwrap();

        store.resize_data(rid, 3000).unwrap();

        let data = store.read_record(rid).unwrap();
        assert_eq!(&data[..40], &pattern(40)[..]);
        assert!(data[40..].iter().all(|&b| b == 0));
        assert!(store.read_header(rid).unwrap().rcl.is_extended());
    }

    #[test]
    fn shrinking_back_inline_frees_the_frame() {
        let mut fx = Fixture::new();
        let mut store = fx.store();
        let rid = store.create_object(RecordId::NULL, &bytes_desc(3000)).unwrap();
        store.write_data(rid, 0, &pattern(3000)).unwrap();
        let free_before = store.container().file().unwrap().space().free_blocks();

        store.resize_data(rid, 20).unwrap();

        let header = store.read_header(rid).unwrap();
        assert!(!header.rcl.is_extended());
        assert_eq!(store.read_record(rid).unwrap(), pattern(20));
        let free_after = store.container().file().unwrap().space().free_blocks();
        assert_eq!(free_after, free_before + 6);
    }

    #[test]
    fn freed_record_reads_as_integrity_error() {
        let mut fx = Fixture::new();
        let mut store = fx.store();
        let keep = store.create_object(RecordId::NULL, &bytes_desc(8)).unwrap();
        let rid = store.create_object(RecordId::NULL, &bytes_desc(8)).unwrap();

        store.free_record(rid).unwrap();

        let err = store.read_header(rid).unwrap_err();
        assert_eq!(error_kind(&err), Some(ErrorKind::Integrity));
        assert!(store.read_header(keep).is_ok());
    }

    #[test]
    fn component_table_grows_past_initial_capacity() {
        let mut fx = Fixture::new();
        let mut store = fx.store();
        let parent = store.create_object(RecordId::NULL, &struct_desc(&[])).unwrap();

        for i in 0..10 {
            let child = store.create_object(parent, &bytes_desc(4)).unwrap();
            store.insert_component(parent, &format!("C{}", i), child).unwrap();
        }

        let names: Vec<_> = store
            .list_components(parent)
            .unwrap()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names.len(), 10);
        assert_eq!(names[9], "C9");
        assert_eq!(store.component_table(parent).unwrap().capacity(), 12);
    }

    #[test]
    fn structure_array_cells_point_back_to_the_array() {
        let mut fx = Fixture::new();
        let mut store = fx.store();
        let arr = store.create_object(RecordId::NULL, &struct_desc(&[2, 3])).unwrap();

        let cell = store.get_cell(arr, 4).unwrap();

        assert_eq!(store.child(arr, cell).unwrap().parent(), arr);
        assert_eq!(store.cell_offset_of(arr, cell).unwrap(), 4);
        assert!(store.component_table(cell).unwrap().is_empty());
        assert_eq!(
            error_kind(&store.get_cell(arr, 6).unwrap_err()),
            Some(ErrorKind::NotFound)
        );
    }

    #[test]
    fn erase_frees_all_descendants() {
        let mut fx = Fixture::new();
        let mut store = fx.store();
        let top = store.create_object(RecordId::NULL, &struct_desc(&[])).unwrap();
        let sub = store.create_object(top, &struct_desc(&[2])).unwrap();
        store.insert_component(top, "SUB", sub).unwrap();
        let cell = store.get_cell(sub, 1).unwrap();
        let leaf = store.create_object(cell, &bytes_desc(5000)).unwrap();
        store.insert_component(cell, "LEAF", leaf).unwrap();
        let free_before = store.container().file().unwrap().space().free_blocks();

        let freed = store.erase_component(top, "SUB").unwrap();

        assert_eq!(freed.len(), 4);
        assert!(freed.contains(&leaf));
        assert!(store.find_component(top, "SUB").unwrap().is_none());
        assert!(store.read_header(leaf).is_err());
        let free_after = store.container().file().unwrap().space().free_blocks();
        assert!(free_after >= free_before + 10);
    }

    #[test]
    fn erase_with_a_damaged_descendant_changes_nothing() {
        let mut fx = Fixture::new();
        let mut store = fx.store();
        let top = store.create_object(RecordId::NULL, &struct_desc(&[])).unwrap();
        let c = store.create_object(top, &struct_desc(&[])).unwrap();
        store.insert_component(top, "C", c).unwrap();
        let g1 = store.create_object(c, &bytes_desc(8)).unwrap();
        store.insert_component(c, "G1", g1).unwrap();
        let g2 = store.create_object(c, &bytes_desc(3000)).unwrap();
        store.insert_component(c, "G2", g2).unwrap();
        store.free_record(g1).unwrap();
        let free_before = store.container().file().unwrap().space().free_blocks();

        let err = store.erase_component(top, "C").unwrap_err();

        assert_eq!(error_kind(&err), Some(ErrorKind::Integrity));
        assert_eq!(store.find_component(top, "C").unwrap(), Some(c));
        assert!(store.read_header(c).is_ok());
        assert!(store.read_header(g2).is_ok());
        let free_after = store.container().file().unwrap().space().free_blocks();
        assert_eq!(free_after, free_before);
    }

    #[test]
    fn used_blocks_account_for_the_whole_file() {
        let mut fx = Fixture::new();
        let mut store = fx.store();
        let top = store.create_object(RecordId::NULL, &struct_desc(&[])).unwrap();
        let big = store.create_object(top, &bytes_desc(3000)).unwrap();
        store.insert_component(top, "BIG", big).unwrap();
        let arr = store.create_object(top, &struct_desc(&[3])).unwrap();
        store.insert_component(top, "ARR", arr).unwrap();

        let used = store.used_blocks(top).unwrap();

        let file = store.container().file().unwrap();
        let accounted = used + file.space().free_blocks() + file.space().lost_blocks() + 2;
        assert_eq!(accounted, file.eof() as u64);
        assert!(used >= 7);
    }

    #[test]
    fn parent_mismatch_is_an_integrity_error() {
        let mut fx = Fixture::new();
        let mut store = fx.store();
        let a = store.create_object(RecordId::NULL, &struct_desc(&[])).unwrap();
        let b = store.create_object(RecordId::NULL, &bytes_desc(4)).unwrap();

        let err = store.child(a, b).unwrap_err();

        assert_eq!(error_kind(&err), Some(ErrorKind::Integrity));
    }

    #[test]
    fn reads_past_the_data_are_rejected() {
        let mut fx = Fixture::new();
        let mut store = fx.store();
        let rid = store.create_object(RecordId::NULL, &bytes_desc(8)).unwrap();

        let mut buf = [0u8; 4];
        let err = store.read_data(rid, 6, &mut buf).unwrap_err();

        assert_eq!(error_kind(&err), Some(ErrorKind::InvalidArgument));
    }
}
