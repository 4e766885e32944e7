//! # Container Allocator
//!
//! `Container` is a short-lived view of one open file together with the
//! block cache. It is the only way the record layer touches blocks, and it
//! owns the allocation policy:
//!
//! - `allocate(n)` takes the best-fit free range. With no fit the file is
//!   extended: a free range touching end-of-file is absorbed, the extension
//!   is at least `NBLOCKS` blocks, and the surplus goes back on the stack.
//! - `deallocate(start, n)` merges or pushes; a range that cannot be
//!   recorded is leaked and logged.
//! - `allocate_chips(n)` scans the tracked chip blocks for a run of `n` free
//!   chips and otherwise claims a fresh block.
//! - `deallocate_chips(rid, n)` clears the run and zeroes its bytes; a chip
//!   block left empty is returned to the block stack.
//! - `extend_frame` grows a run of whole blocks in place when the blocks
//!   after it are free (or it ends at end-of-file), and otherwise moves it.
//!
//! Byte access (`read_bytes`/`write_bytes`) addresses a run of blocks by its
//! first block and a byte offset, so callers never deal with block
//! boundaries.

use eyre::{Result, WrapErr};
use tracing::{trace, warn};

use super::cache::{BlockCache, BlockMode};
use super::chips::{chip_offset, ChipBitmap, RecordId};
use super::driver::BlockKey;
use super::file_manager::{ContainerFile, FileTable, SpaceReport};
use super::freelist::Released;
use crate::config::{BLOCK_SIZE, CHIPS_PER_BLOCK, CHIP_SIZE, MAX_BLOCK};
use crate::error::{hds_bail, hds_ensure, HdsError};
use crate::slots::SlotId;

pub struct Container<'a> {
    files: &'a mut FileTable,
    cache: &'a mut BlockCache,
    slot: SlotId,
    nblocks: u32,
}

impl<'a> Container<'a> {
    pub fn new(
        files: &'a mut FileTable,
        cache: &'a mut BlockCache,
        slot: SlotId,
        nblocks: u32,
    ) -> Result<Self> {
        files.get(slot)?;
        Ok(Self {
            files,
            cache,
            slot,
            nblocks: nblocks.max(1),
        })
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn file(&self) -> Result<&ContainerFile> {
        self.files.get(self.slot)
    }

    pub fn file_mut(&mut self) -> Result<&mut ContainerFile> {
        self.files.get_mut(self.slot)
    }

    pub fn ensure_writable(&self) -> Result<()> {
        let file = self.file()?;
        hds_ensure!(
            file.is_writable(),
            HdsError::AccessDenied(format!("'{}' is open read-only", file.path().display()))
        );
        Ok(())
    }

    fn key(&self, block: u32) -> BlockKey {
        BlockKey::new(self.slot.index(), block)
    }

    pub fn read_block<R>(&mut self, block: u32, f: impl FnOnce(&[u8; BLOCK_SIZE]) -> R) -> Result<R> {
        let key = self.key(block);
        self.cache.read_block(&mut *self.files, key, f)
    }

    pub fn write_block<R>(
        &mut self,
        block: u32,
        mode: BlockMode,
        f: impl FnOnce(&mut [u8; BLOCK_SIZE]) -> R,
    ) -> Result<R> {
        let key = self.key(block);
        self.cache.write_block(&mut *self.files, key, mode, f)
    }

    /// Reads `buf.len()` bytes starting `offset` bytes into the run of blocks
    /// that begins at `start`.
    pub fn read_bytes(&mut self, start: u32, offset: usize, buf: &mut [u8]) -> Result<()> {
        let mut done = 0;
        while done < buf.len() {
            let pos = offset + done;
            let block = start + (pos / BLOCK_SIZE) as u32;
            let within = pos % BLOCK_SIZE;
            let n = (BLOCK_SIZE - within).min(buf.len() - done);
            let dst = &mut buf[done..done + n];
            self.read_block(block, |b| dst.copy_from_slice(&b[within..within + n]))?;
            done += n;
        }
        Ok(())
    }

    pub fn write_bytes(&mut self, start: u32, offset: usize, data: &[u8]) -> Result<()> {
        let mut done = 0;
        while done < data.len() {
            let pos = offset + done;
            let block = start + (pos / BLOCK_SIZE) as u32;
            let within = pos % BLOCK_SIZE;
            let n = (BLOCK_SIZE - within).min(data.len() - done);
            let mode = if n == BLOCK_SIZE {
                BlockMode::Zero
            } else {
                BlockMode::Write
            };
            let src = &data[done..done + n];
            self.write_block(block, mode, |b| b[within..within + n].copy_from_slice(src))?;
            done += n;
        }
        Ok(())
    }

    pub fn zero_bytes(&mut self, start: u32, offset: usize, len: usize) -> Result<()> {
        let mut done = 0;
        while done < len {
            let pos = offset + done;
            let block = start + (pos / BLOCK_SIZE) as u32;
            let within = pos % BLOCK_SIZE;
            let n = (BLOCK_SIZE - within).min(len - done);
            let mode = if n == BLOCK_SIZE {
                BlockMode::Zero
            } else {
                BlockMode::Write
            };
            self.write_block(block, mode, |b| b[within..within + n].fill(0))?;
            done += n;
        }
        Ok(())
    }

    /// Allocates `n` contiguous blocks and returns the first.
    pub fn allocate(&mut self, n: u32) -> Result<u32> {
        hds_ensure!(n > 0, HdsError::invalid("cannot allocate zero blocks"));
        self.ensure_writable()?;

        if let Some(start) = self.file_mut()?.space_mut().take(n) {
            trace!(start, blocks = n, "allocated blocks");
            return Ok(start);
        }

        let start = self.grow_file(n)?;
        trace!(start, blocks = n, "allocated blocks at end of file");
        Ok(start)
    }

    /// Extends the file so that `need` blocks are free at its end, absorbing
    /// a free tail range, and takes them. Returns the first block.
    fn grow_file(&mut self, need: u32) -> Result<u32> {
        let nblocks = self.nblocks;
        let file = self.file_mut()?;
        let eof = file.eof();

        let (start, absorbed) = match file.space().tail() {
            Some(tail) => {
                file.space_mut().take_at(tail.start, tail.len);
                (tail.start, tail.len)
            }
            None => (eof + 1, 0),
        };

        let grow = if absorbed >= need {
            0
        } else {
            (need - absorbed).max(nblocks)
        };
        let new_eof = eof as u64 + grow as u64;

        if new_eof > MAX_BLOCK as u64 {
            file.space_mut().release(start, absorbed)?;
            hds_bail!(HdsError::OutOfSpace(format!(
                "'{}' cannot grow past block {}",
                file.path().display(),
                MAX_BLOCK
            )));
        }

        if grow > 0 {
            if let Err(err) = file.extend_to(new_eof as u32) {
                file.space_mut().release(start, absorbed)?;
                hds_bail!(HdsError::OutOfSpace(format!(
                    "'{}' could not be extended: {err:#}",
                    file.path().display()
                )));
            }
            trace!(eof = new_eof, "extended container file");
        }

        let surplus = absorbed + grow - need;
        if surplus > 0 {
            file.space_mut().release(start + need, surplus)?;
        }
        Ok(start)
    }

    pub fn deallocate(&mut self, start: u32, n: u32) -> Result<()> {
        if n == 0 {
            return Ok(());
        }
        let file = self.file_mut()?;
        let released = file
            .space_mut()
            .release(start, n)
            .wrap_err_with(|| format!("failed to free blocks {}+{}", start, n))?;

        if released == Released::Lost {
            warn!(
                path = %file.path().display(),
                start,
                blocks = n,
                lost = file.space().lost_blocks(),
                "free-space stack full, blocks leaked"
            );
        } else {
            trace!(start, blocks = n, "freed blocks");
        }
        Ok(())
    }

    /// Resizes a run of whole blocks from `old` to `new` blocks, moving it if
    /// it cannot grow in place. Returns the (possibly new) first block.
    pub fn extend_frame(&mut self, start: u32, old: u32, new: u32) -> Result<u32> {
        if new == old {
            return Ok(start);
        }
        if new < old {
            self.deallocate(start + new, old - new)?;
            return Ok(start);
        }
        self.ensure_writable()?;

        let extra = new - old;
        let file = self.file_mut()?;
        if file.space_mut().take_at(start + old, extra) {
            trace!(start, blocks = new, "grew frame in place");
            return Ok(start);
        }

        let tail_start = file
            .space()
            .tail()
            .map(|r| r.start)
            .unwrap_or(file.eof() + 1);
        if tail_start == start + old {
            self.grow_file(extra)?;
            trace!(start, blocks = new, "grew frame at end of file");
            return Ok(start);
        }

        let moved = self.allocate(new)?;
        for i in 0..old {
            let data = self.read_block(start + i, |b| *b)?;
            self.write_block(moved + i, BlockMode::Zero, |b| *b = data)?;
        }
        self.deallocate(start, old)?;
        trace!(from = start, to = moved, blocks = new, "moved frame");
        Ok(moved)
    }

    /// Allocates a run of `n` chips.
    pub fn allocate_chips(&mut self, n: usize) -> Result<RecordId> {
        hds_ensure!(
            (1..=CHIPS_PER_BLOCK).contains(&n),
            HdsError::invalid(format!("cannot allocate {} chips", n))
        );
        self.ensure_writable()?;

        let tracked = self.file()?.chip_blocks().to_vec();
        for block in tracked {
            let found = self.read_block(block, |b| ChipBitmap::from_block(b).find_run(n))?;
            if let Some(first) = found {
                self.write_block(block, BlockMode::Write, |b| {
                    let mut map = ChipBitmap::from_block(b);
                    map.set_run(first, n);
                    map.store(b);
                })?;
                trace!(block, chip = first, chips = n, "allocated chips");
                return Ok(RecordId::new(block, first));
            }
        }

        let block = self.allocate(1)?;
        self.write_block(block, BlockMode::Zero, |b| {
            let mut map = ChipBitmap::default();
            map.set_run(0, n);
            map.store(b);
        })?;
        self.file_mut()?.track_chip_block(block);
        trace!(block, chips = n, "allocated chips in new chip block");
        Ok(RecordId::new(block, 0))
    }

    /// Frees a run of chips and zeroes their contents.
    pub fn deallocate_chips(&mut self, rid: RecordId, n: usize) -> Result<()> {
        hds_ensure!(
            n >= 1 && rid.chip as usize + n <= CHIPS_PER_BLOCK,
            HdsError::integrity(format!("bad chip run {} x {}", rid, n))
        );

        let outcome = self.write_block(rid.block, BlockMode::Write, |b| {
            let mut map = ChipBitmap::from_block(b);
            if !map.is_run_set(rid.chip, n) {
                return None;
            }
            map.clear_run(rid.chip, n);
            map.store(b);
            let off = chip_offset(rid.chip);
            b[off..off + n * CHIP_SIZE].fill(0);
            Some(map.is_empty())
        })?;

        let Some(empty) = outcome else {
            hds_bail!(HdsError::integrity(format!(
                "chips {} x {} are not allocated",
                rid, n
            )));
        };

        trace!(block = rid.block, chip = rid.chip, chips = n, "freed chips");
        if empty {
            self.file_mut()?.untrack_chip_block(rid.block);
            self.deallocate(rid.block, 1)?;
        } else {
            self.file_mut()?.offer_chip_block(rid.block);
        }
        Ok(())
    }

    pub fn space_report(&self) -> Result<SpaceReport> {
        Ok(SpaceReport::from(self.file()?))
    }
}
