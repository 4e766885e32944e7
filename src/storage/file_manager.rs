//! # Container File Table
//!
//! This module owns every open container file. Files live in a
//! generation-checked `SlotTable`, so the slot id handed to locators and the
//! block cache can be checked for staleness after the file is closed.
//!
//! ## Open File State
//!
//! ```text
//! ContainerFile
//! ├── path, identity      device+inode on Unix, canonical path elsewhere
//! ├── file, mode          read-only or update I/O channel
//! ├── space               free-space stack + end-of-file block
//! ├── chips               blocks currently used for chip allocation
//! ├── top                 top-level record id and name
//! ├── refcount            live primary locators
//! ├── delete_on_close
//! ├── locked              advisory lock held
//! └── header_modified     header must be written back at close
//! ```
//!
//! The header is loaded once at open and kept in memory; it is written back
//! at flush and close if anything changed.
//!
//! ## Reopening
//!
//! Opening a file that is already open (same identity) reuses its slot
//! instead of creating a second channel. Opening for update a file that was
//! opened read-only upgrades the channel and the lock in place.
//!
//! ## Locking
//!
//! With `SYSLCK` set, the file is `flock`ed at open: shared for read,
//! exclusive for update. Without `WAIT` a conflicting lock fails immediately
//! with an I/O error. Locks are released at close.
//!
//! ## File Names
//!
//! A path without an extension gets the default `.sdf` extension.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};
use tracing::{debug, warn};
use zerocopy::IntoBytes;

use super::cache::BlockCache;
use super::chips::RecordId;
use super::driver::{block_offset, BlockIo, BlockKey};
use super::freelist::{FreeRange, FreeSpaceStack};
use super::headers::ContainerHeader;
use crate::config::{BLOCK_SIZE, CHIP_LIST_CAPACITY, FIRST_DATA_BLOCK, HEADER_BLOCKS, HEADER_SIZE};
use crate::error::{hds_bail, hds_ensure, HdsError};
use crate::slots::{SlotId, SlotTable};

pub const DEFAULT_EXTENSION: &str = "sdf";

/// Access mode of a file or locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpenMode {
    Read,
    Update,
}

impl OpenMode {
    pub fn is_writable(self) -> bool {
        matches!(self, OpenMode::Update)
    }
}

/// File-level settings taken from the tuning parameters.
#[derive(Debug, Clone, Copy)]
pub struct FileOptions {
    pub inalq: u32,
    pub syslck: bool,
    pub wait: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileId {
    Inode { dev: u64, ino: u64 },
    Path(PathBuf),
}

impl FileId {
    fn of(path: &Path, file: &File) -> Result<Self> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            let meta = file.metadata().map_err(|e| HdsError::io(path, e))?;
            Ok(FileId::Inode {
                dev: meta.dev(),
                ino: meta.ino(),
            })
        }
        #[cfg(not(unix))]
        {
            let _ = file;
            let canonical = fs::canonicalize(path).map_err(|e| HdsError::io(path, e))?;
            Ok(FileId::Path(canonical))
        }
    }

    fn of_path(path: &Path) -> Option<Self> {
        let file = File::open(path).ok()?;
        Self::of(path, &file).ok()
    }
}

/// Adds the default extension to a path that has none.
pub fn container_path(path: &Path) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension(DEFAULT_EXTENSION)
    }
}

#[cfg(unix)]
fn lock_file(file: &File, path: &Path, exclusive: bool, wait: bool) -> Result<()> {
    use std::os::unix::io::AsRawFd;

    let mut op = if exclusive {
        libc::LOCK_EX
    } else {
        libc::LOCK_SH
    };
    if !wait {
        op |= libc::LOCK_NB;
    }
    // SAFETY: the descriptor is owned by `file` and stays open for the call.
    let r = unsafe { libc::flock(file.as_raw_fd(), op) };
    if r != 0 {
        return Err(HdsError::io(path, std::io::Error::last_os_error()))
            .wrap_err_with(|| format!("'{}' is locked by another process", path.display()));
    }
    Ok(())
}

#[cfg(unix)]
fn unlock_file(file: &File, path: &Path) {
    use std::os::unix::io::AsRawFd;

    // SAFETY: the descriptor is owned by `file` and stays open for the call.
    let r = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_UN) };
    if r != 0 {
        debug!(
            path = %path.display(),
            "failed to unlock container file: {}",
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
fn lock_file(_file: &File, _path: &Path, _exclusive: bool, _wait: bool) -> Result<()> {
    Ok(())
}

#[cfg(not(unix))]
fn unlock_file(_file: &File, _path: &Path) {}

#[derive(Debug)]
pub struct ContainerFile {
    path: PathBuf,
    id: FileId,
    file: File,
    mode: OpenMode,
    space: FreeSpaceStack,
    chips: Vec<u32>,
    top_rid: RecordId,
    top_name: String,
    refcount: u32,
    delete_on_close: bool,
    locked: bool,
    header_modified: bool,
}

impl ContainerFile {
    fn create(path: &Path, top_name: &str, opts: FileOptions) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| HdsError::io(path, e))
            .wrap_err_with(|| format!("failed to create container file '{}'", path.display()))?;

        let locked = opts.syslck;
        if locked {
            lock_file(&file, path, true, opts.wait)?;
        }
        file.set_len(0).map_err(|e| HdsError::io(path, e))?;

        let id = FileId::of(path, &file)?;
        let inalq = opts.inalq.max(1);
        let eof = HEADER_BLOCKS + inalq;
        let mut space = FreeSpaceStack::new(eof);
        space.release(FIRST_DATA_BLOCK, inalq)?;

        let mut cf = Self {
            path: path.to_path_buf(),
            id,
            file,
            mode: OpenMode::Update,
            space,
            chips: Vec::new(),
            top_rid: RecordId::NULL,
            top_name: top_name.to_string(),
            refcount: 0,
            delete_on_close: false,
            locked,
            header_modified: true,
        };

        cf.file
            .set_len(block_offset(eof + 1))
            .map_err(|e| HdsError::io(path, e))?;
        cf.write_header()?;

        debug!(path = %path.display(), eof, "created container file");
        Ok(cf)
    }

    fn open(path: &Path, mode: OpenMode, opts: FileOptions) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(mode.is_writable())
            .open(path)
            .map_err(|e| HdsError::io(path, e))
            .wrap_err_with(|| format!("failed to open container file '{}'", path.display()))?;

        let locked = opts.syslck;
        if locked {
            lock_file(&file, path, mode.is_writable(), opts.wait)?;
        }

        let mut buf = vec![0u8; HEADER_SIZE];
        let len = file.metadata().map_err(|e| HdsError::io(path, e))?.len();
        hds_ensure!(
            len >= HEADER_SIZE as u64,
            HdsError::format(path, format!("file too short for header: {} bytes", len))
        );
        file.seek(SeekFrom::Start(0))
            .and_then(|_| file.read_exact(&mut buf))
            .map_err(|e| HdsError::io(path, e))?;

        let header = ContainerHeader::from_bytes(path, &buf)?;
        let eof = header.eof();
        hds_ensure!(
            eof >= HEADER_BLOCKS && len >= block_offset(eof + 1),
            HdsError::format(
                path,
                format!("end-of-file block {} does not match file size {}", eof, len)
            )
        );

        let space = FreeSpaceStack::from_ranges(eof, FIRST_DATA_BLOCK, header.free_ranges())
            .wrap_err_with(|| format!("corrupt free-space stack in '{}'", path.display()))?;
        let chips = header.chip_blocks();
        for &block in &chips {
            hds_ensure!(
                (FIRST_DATA_BLOCK..=eof).contains(&block),
                HdsError::integrity(format!("chip block {} outside the file", block))
            );
        }

        let id = FileId::of(path, &file)?;
        debug!(path = %path.display(), ?mode, eof, "opened container file");

        Ok(Self {
            path: path.to_path_buf(),
            id,
            file,
            mode,
            space,
            chips,
            top_rid: header.top_rid(),
            top_name: header.top_name(),
            refcount: 0,
            delete_on_close: false,
            locked,
            header_modified: false,
        })
    }

    /// Reopens a read-only file for update, converting its lock.
    fn upgrade(&mut self, opts: FileOptions) -> Result<()> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| HdsError::io(&self.path, e))
            .wrap_err_with(|| {
                format!("failed to reopen '{}' for update", self.path.display())
            })?;

        if self.locked {
            unlock_file(&self.file, &self.path);
            if let Err(err) = lock_file(&file, &self.path, true, opts.wait) {
                lock_file(&self.file, &self.path, false, opts.wait)?;
                return Err(err);
            }
        }

        self.file = file;
        self.mode = OpenMode::Update;
        debug!(path = %self.path.display(), "upgraded container file to update access");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn id(&self) -> &FileId {
        &self.id
    }

    pub fn is_writable(&self) -> bool {
        self.mode.is_writable()
    }

    pub fn refcount(&self) -> u32 {
        self.refcount
    }

    pub fn add_ref(&mut self) {
        self.refcount += 1;
    }

    /// Drops one primary reference; returns the remaining count.
    pub fn release_ref(&mut self) -> u32 {
        debug_assert!(self.refcount > 0, "reference count underflow");
        self.refcount = self.refcount.saturating_sub(1);
        self.refcount
    }

    pub fn delete_on_close(&self) -> bool {
        self.delete_on_close
    }

    pub fn mark_for_deletion(&mut self) {
        self.delete_on_close = true;
    }

    pub fn top_rid(&self) -> RecordId {
        self.top_rid
    }

    pub fn top_name(&self) -> &str {
        &self.top_name
    }

    pub fn set_top(&mut self, rid: RecordId, name: &str) {
        self.top_rid = rid;
        self.top_name = name.to_string();
        self.header_modified = true;
    }

    pub fn space(&self) -> &FreeSpaceStack {
        &self.space
    }

    pub fn space_mut(&mut self) -> &mut FreeSpaceStack {
        self.header_modified = true;
        &mut self.space
    }

    pub fn eof(&self) -> u32 {
        self.space.eof()
    }

    pub fn chip_blocks(&self) -> &[u32] {
        &self.chips
    }

    /// Starts tracking a chip block. When the list is full the oldest entry
    /// is dropped and its free chips are unavailable until it is re-added.
    pub fn track_chip_block(&mut self, block: u32) {
        if self.chips.contains(&block) {
            return;
        }
        if self.chips.len() >= CHIP_LIST_CAPACITY {
            let dropped = self.chips.remove(0);
            debug!(path = %self.path.display(), block = dropped, "chip list full, dropped block");
        }
        self.chips.push(block);
        self.header_modified = true;
    }

    /// Re-tracks a chip block only if the list has room.
    pub fn offer_chip_block(&mut self, block: u32) {
        if !self.chips.contains(&block) && self.chips.len() < CHIP_LIST_CAPACITY {
            self.chips.push(block);
            self.header_modified = true;
        }
    }

    pub fn untrack_chip_block(&mut self, block: u32) {
        if let Some(pos) = self.chips.iter().position(|&b| b == block) {
            self.chips.remove(pos);
            self.header_modified = true;
        }
    }

    /// Grows the physical file to `eof` blocks.
    pub fn extend_to(&mut self, eof: u32) -> Result<()> {
        self.file
            .set_len(block_offset(eof + 1))
            .map_err(|e| HdsError::io(&self.path, e))
            .wrap_err_with(|| format!("failed to extend '{}' to {} blocks", self.path.display(), eof))?;
        self.space.set_eof(eof);
        self.header_modified = true;
        Ok(())
    }

    fn header(&self) -> ContainerHeader {
        let mut header = ContainerHeader::new(self.space.eof(), self.top_rid, &self.top_name);
        header.set_free_ranges(self.space.ranges());
        header.set_chip_blocks(&self.chips);
        header
    }

    fn write_header(&mut self) -> Result<()> {
        let header = self.header();
        self.file
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.file.write_all(header.as_bytes()))
            .map_err(|e| HdsError::io(&self.path, e))
            .wrap_err_with(|| format!("failed to write header of '{}'", self.path.display()))?;
        self.header_modified = false;
        Ok(())
    }

    /// Writes back a modified header and syncs the file.
    fn flush(&mut self) -> Result<()> {
        if !self.is_writable() {
            return Ok(());
        }
        if self.header_modified {
            self.write_header()?;
        }
        self.file
            .sync_data()
            .map_err(|e| HdsError::io(&self.path, e))?;
        Ok(())
    }

    fn finish(mut self) -> Result<()> {
        let result = if self.delete_on_close {
            Ok(())
        } else {
            self.flush()
        };

        if self.locked {
            unlock_file(&self.file, &self.path);
        }

        let path = self.path.clone();
        let delete = self.delete_on_close;
        drop(self);

        if delete {
            fs::remove_file(&path)
                .map_err(|e| HdsError::io(&path, e))
                .wrap_err_with(|| format!("failed to delete '{}'", path.display()))?;
            debug!(path = %path.display(), "deleted container file");
        } else {
            debug!(path = %path.display(), "closed container file");
        }
        result
    }

    fn read_raw(&mut self, block: u32, buf: &mut [u8; BLOCK_SIZE]) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(block_offset(block)))
            .and_then(|_| self.file.read_exact(buf))
            .map_err(|e| HdsError::io(&self.path, e))
            .wrap_err_with(|| format!("failed to read block {}", block))
    }

    fn write_raw(&mut self, block: u32, data: &[u8; BLOCK_SIZE]) -> Result<()> {
        hds_ensure!(
            self.is_writable(),
            HdsError::AccessDenied(format!("'{}' is open read-only", self.path.display()))
        );
        self.file
            .seek(SeekFrom::Start(block_offset(block)))
            .and_then(|_| self.file.write_all(data))
            .map_err(|e| HdsError::io(&self.path, e))
            .wrap_err_with(|| format!("failed to write block {}", block))
    }
}

#[derive(Debug, Default)]
pub struct FileTable {
    files: SlotTable<ContainerFile>,
}

impl FileTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn find_open(&self, id: &FileId) -> Option<SlotId> {
        self.files
            .iter()
            .find(|(_, f)| &f.id == id)
            .map(|(slot, _)| slot)
    }

    /// Creates (or truncates) a container file and registers it.
    pub fn create(&mut self, path: &Path, top_name: &str, opts: FileOptions) -> Result<SlotId> {
        let path = container_path(path);
        if let Some(id) = FileId::of_path(&path) {
            if self.find_open(&id).is_some() {
                hds_bail!(HdsError::invalid(format!(
                    "cannot create '{}': the file is open",
                    path.display()
                )));
            }
        }

        let file = ContainerFile::create(&path, top_name, opts)?;
        Ok(self.files.insert(file))
    }

    /// Opens a container file, reusing its slot if it is already open.
    pub fn open(&mut self, path: &Path, mode: OpenMode, opts: FileOptions) -> Result<SlotId> {
        let path = container_path(path);

        if let Some(slot) = FileId::of_path(&path).and_then(|id| self.find_open(&id)) {
            let file = self.get_mut(slot)?;
            if mode.is_writable() && !file.is_writable() {
                file.upgrade(opts)?;
            }
            debug!(path = %path.display(), "container file already open, reusing slot");
            return Ok(slot);
        }

        let file = ContainerFile::open(&path, mode, opts)?;
        Ok(self.files.insert(file))
    }

    pub fn get(&self, slot: SlotId) -> Result<&ContainerFile> {
        self.files
            .get(slot)
            .ok_or_else(|| HdsError::InvalidHandle.into())
    }

    pub fn get_mut(&mut self, slot: SlotId) -> Result<&mut ContainerFile> {
        self.files
            .get_mut(slot)
            .ok_or_else(|| HdsError::InvalidHandle.into())
    }

    pub fn contains(&self, slot: SlotId) -> bool {
        self.files.contains(slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &ContainerFile)> {
        self.files.iter()
    }

    pub fn slots(&self) -> Vec<SlotId> {
        self.files.ids()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Writes back the file's dirty blocks and header and syncs it.
    pub fn flush(&mut self, cache: &mut BlockCache, slot: SlotId) -> Result<()> {
        if !self.get(slot)?.is_writable() {
            return Ok(());
        }
        cache.flush_file(self, slot.index())?;
        self.get_mut(slot)?.flush()
    }

    /// Closes a file: flush, write the header, sync, unlock, and delete it if
    /// it was marked for deletion. The slot is released even on error.
    pub fn close(&mut self, cache: &mut BlockCache, slot: SlotId) -> Result<()> {
        let file = self.get(slot)?;
        let skip_flush = file.delete_on_close() || !file.is_writable();

        let flushed = if skip_flush {
            Ok(0)
        } else {
            cache.flush_file(self, slot.index())
        };
        cache.discard_file(slot.index());

        let file = self.files.remove(slot).ok_or(HdsError::InvalidHandle)?;
        let path = file.path.clone();
        let finished = file.finish();

        if let Err(err) = &flushed {
            warn!(path = %path.display(), "failed to write back blocks at close: {err:#}");
        }
        flushed.map(|_| ())?;
        finished
    }
}

impl BlockIo for FileTable {
    fn read_block(&mut self, key: BlockKey, buf: &mut [u8; BLOCK_SIZE]) -> Result<()> {
        let (slot, _) = self
            .files
            .get_by_index(key.slot)
            .ok_or(HdsError::InvalidHandle)?;
        let file = self.files.get_mut(slot).ok_or(HdsError::InvalidHandle)?;
        hds_ensure!(
            key.block >= FIRST_DATA_BLOCK && key.block <= file.eof(),
            HdsError::integrity(format!(
                "block {} outside data blocks {}..={} of '{}'",
                key.block,
                FIRST_DATA_BLOCK,
                file.eof(),
                file.path.display()
            ))
        );
        file.read_raw(key.block, buf)
    }

    fn write_block(&mut self, key: BlockKey, data: &[u8; BLOCK_SIZE]) -> Result<()> {
        let (slot, _) = self
            .files
            .get_by_index(key.slot)
            .ok_or(HdsError::InvalidHandle)?;
        let file = self.files.get_mut(slot).ok_or(HdsError::InvalidHandle)?;
        file.write_raw(key.block, data)
    }
}

/// Free-space figures for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceReport {
    pub eof: u32,
    pub free: Vec<FreeRange>,
    pub free_blocks: u64,
    pub lost_blocks: u64,
}

impl From<&ContainerFile> for SpaceReport {
    fn from(file: &ContainerFile) -> Self {
        Self {
            eof: file.eof(),
            free: file.space.ranges().to_vec(),
            free_blocks: file.space.free_blocks(),
            lost_blocks: file.space.lost_blocks(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FORMAT_STAMP;
    use tempfile::tempdir;

    fn opts() -> FileOptions {
        FileOptions {
            inalq: 2,
            syslck: true,
            wait: false,
        }
    }

    #[test]
    fn create_writes_a_valid_header() {
        let dir = tempdir().unwrap();
        let mut files = FileTable::new();

        let slot = files.create(&dir.path().join("a.sdf"), "DATA", opts()).unwrap();
        let file = files.get(slot).unwrap();

        assert_eq!(file.eof(), HEADER_BLOCKS + 2);
        assert_eq!(file.space().ranges(), &[FreeRange::new(FIRST_DATA_BLOCK, 2)]);

        let bytes = fs::read(dir.path().join("a.sdf")).unwrap();
        assert_eq!(bytes.len(), 4 * BLOCK_SIZE);
        assert_eq!(&bytes[..4], &FORMAT_STAMP.to_le_bytes());
    }

    #[test]
    fn default_extension_is_added() {
        let dir = tempdir().unwrap();
        let mut files = FileTable::new();

        let slot = files.create(&dir.path().join("noext"), "DATA", opts()).unwrap();

        assert!(files.get(slot).unwrap().path().ends_with("noext.sdf"));
        assert!(dir.path().join("noext.sdf").exists());
    }

    #[test]
    fn opening_twice_reuses_the_slot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.sdf");
        let mut files = FileTable::new();
        let mut cache = BlockCache::new(8).unwrap();
        let slot = files.create(&path, "DATA", opts()).unwrap();
        files.close(&mut cache, slot).unwrap();

        let first = files.open(&path, OpenMode::Read, opts()).unwrap();
        let second = files.open(&path, OpenMode::Update, opts()).unwrap();

        assert_eq!(first, second);
        assert_eq!(files.len(), 1);
        assert!(files.get(first).unwrap().is_writable());
    }

    #[test]
    fn open_rejects_foreign_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("junk.sdf");
        fs::write(&path, vec![0xAB; 2048]).unwrap();
        let mut files = FileTable::new();

        let err = files.open(&path, OpenMode::Read, opts()).unwrap_err();

        assert_eq!(
            crate::error::error_kind(&err),
            Some(crate::error::ErrorKind::Format)
        );
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        let mut files = FileTable::new();

        let err = files
            .open(&dir.path().join("missing.sdf"), OpenMode::Read, opts())
            .unwrap_err();

        assert_eq!(crate::error::error_kind(&err), Some(crate::error::ErrorKind::Io));
    }

    #[test]
    fn close_invalidates_slot_and_persists_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.sdf");
        let mut files = FileTable::new();
        let mut cache = BlockCache::new(8).unwrap();

        let slot = files.create(&path, "DATA", opts()).unwrap();
        files.get_mut(slot).unwrap().set_top(RecordId::new(3, 0), "TOP");
        files.close(&mut cache, slot).unwrap();
        assert!(files.get(slot).is_err());

        let slot = files.open(&path, OpenMode::Read, opts()).unwrap();
        let file = files.get(slot).unwrap();
        assert_eq!(file.top_rid(), RecordId::new(3, 0));
        assert_eq!(file.top_name(), "TOP");
    }

    #[test]
    fn close_deletes_marked_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.sdf");
        let mut files = FileTable::new();
        let mut cache = BlockCache::new(8).unwrap();

        let slot = files.create(&path, "DATA", opts()).unwrap();
        files.get_mut(slot).unwrap().mark_for_deletion();
        files.close(&mut cache, slot).unwrap();

        assert!(!path.exists());
    }

    #[test]
    fn read_only_file_rejects_block_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.sdf");
        let mut files = FileTable::new();
        let mut cache = BlockCache::new(8).unwrap();
        let slot = files.create(&path, "DATA", opts()).unwrap();
        files.close(&mut cache, slot).unwrap();

        let slot = files.open(&path, OpenMode::Read, opts()).unwrap();
        let err = files
            .write_block(BlockKey::new(slot.index(), 3), &[0u8; BLOCK_SIZE])
            .unwrap_err();

        assert_eq!(
            crate::error::error_kind(&err),
            Some(crate::error::ErrorKind::AccessDenied)
        );
    }

    #[cfg(unix)]
    #[test]
    fn exclusive_lock_blocks_second_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.sdf");
        let mut first = FileTable::new();
        let mut second = FileTable::new();

        let _slot = first.create(&path, "DATA", opts()).unwrap();
        let err = second.open(&path, OpenMode::Read, opts()).unwrap_err();

        assert_eq!(crate::error::error_kind(&err), Some(crate::error::ErrorKind::Io));
    }
}
