//! # Engine
//!
//! `Hds` is the public face of the crate. It owns every piece of engine
//! state: the open container files, the block cache, the locator table and
//! the tuning parameters. All operations are methods on it.
//!
//! ## Thread Safety
//!
//! `Hds` is `Send + Sync`. The state sits behind one `parking_lot::Mutex`,
//! so operations on one engine are serialized; each one runs to completion
//! (or fails) before the lock is released.
//!
//! ## Usage
//!
//! ```ignore
//! let hds = Hds::new()?;
//!
//! let top = hds.create("obs.sdf", "OBS", "OBSERVATION", &[])?;
//! hds.new_component(top, "COUNTS", "_INTEGER", &[3])?;
//! let counts = hds.find(top, "COUNTS")?;
//! hds.put(counts, &[1i32, 2, 3])?;
//!
//! let cell = hds.cell(counts, &[2])?;
//! assert_eq!(hds.get::<i32>(cell)?, vec![2]);
//! assert_eq!(hds.trace(cell)?.path, "OBS.COUNTS(2)");
//!
//! hds.annul(cell)?;
//! hds.annul(counts)?;
//! hds.annul(top)?; // last primary locator: the file is closed
//! ```
//!
//! ## Module Organization
//!
//! - `tuning`: tuning parameters and their environment defaults
//! - `builder`: `HdsBuilder`
//! - `show`: diagnostic listings of open files and locators

mod builder;
mod show;
mod tuning;

use std::path::Path;

use eyre::{Result, WrapErr};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{hds_bail, hds_ensure, HdsError};
use crate::locator::{offset_of, Locator, LocatorData, LocatorTable, Subscript};
use crate::records::{
    decode_strings, decode_values, encode_strings, encode_values, validate_name, Dims,
    ObjectDescriptor, ObjectType, Primitive, PrimitiveType, RecordHeader, RecordStore,
};
use crate::slots::SlotId;
use crate::storage::{BlockCache, CacheStats, Container, FileTable, OpenMode, RecordId, SpaceReport};
use crate::trace::{bound_trace, trace_path, TracedPath};

pub use builder::HdsBuilder;
pub use show::{FileStatus, LocatorStatus};
pub use tuning::{Tuning, TuningParam};

/// Name, type and shape of the object a locator addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub name: String,
    pub type_name: String,
    pub dims: Dims,
    pub primitive: bool,
}

impl ObjectInfo {
    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    pub fn element_count(&self) -> u64 {
        self.dims.iter().map(|&d| d as u64).product()
    }
}

struct EngineState {
    files: FileTable,
    cache: BlockCache,
    locators: LocatorTable,
    tuning: Tuning,
}

impl EngineState {
    fn store(&mut self, file: SlotId) -> Result<RecordStore<'_>> {
        let container = Container::new(&mut self.files, &mut self.cache, file, self.tuning.nblocks)?;
        Ok(RecordStore::new(container, self.tuning.ncomp))
    }

    fn locator(&self, loc: Locator) -> Result<LocatorData> {
        self.locators.get(loc).cloned()
    }

    fn writable(&self, loc: Locator) -> Result<LocatorData> {
        let data = self.locator(loc)?;
        hds_ensure!(
            data.is_writable(),
            HdsError::AccessDenied(format!("locator {} is read-only", loc))
        );
        Ok(data)
    }

    fn issue(&mut self, data: LocatorData) -> Result<Locator> {
        if data.primary {
            let file = self.files.get_mut(data.file)?;
            file.add_ref();
            debug!(path = %file.path().display(), refcount = file.refcount(), "primary locator issued");
        }
        Ok(self.locators.issue(data))
    }

    /// Drops the reference held by a removed locator, closing its file when
    /// that was the last primary one.
    fn release(&mut self, data: &LocatorData) -> Result<()> {
        if !data.primary || !self.files.contains(data.file) {
            return Ok(());
        }
        let file = self.files.get_mut(data.file)?;
        let remaining = file.release_ref();
        debug!(path = %file.path().display(), refcount = remaining, "primary locator released");
        if remaining == 0 {
            self.close_file(data.file)?;
        }
        Ok(())
    }

    fn release_all(&mut self, dropped: Vec<LocatorData>) -> Result<()> {
        for data in &dropped {
            self.release(data)?;
        }
        Ok(())
    }

    fn close_file(&mut self, file: SlotId) -> Result<()> {
        let invalidated = self.locators.remove_file(file).len();
        let path = self.files.get(file)?.path().display().to_string();
        self.files.close(&mut self.cache, file)?;
        debug!(%path, invalidated, "closed container file");
        Ok(())
    }

    fn close_all(&mut self) -> Result<()> {
        let mut first_err = None;
        for file in self.files.slots() {
            if let Err(err) = self.close_file(file) {
                warn!("failed to close container file: {err:#}");
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn create_top(&mut self, file: SlotId, name: &str, descriptor: &ObjectDescriptor) -> Result<RecordId> {
        let rid = self.store(file)?.create_object(RecordId::NULL, descriptor)?;
        self.files.get_mut(file)?.set_top(rid, name);
        Ok(rid)
    }
}

/// Reads the header of a scalar structure addressed as a whole.
fn structure_header(store: &mut RecordStore<'_>, data: &LocatorData) -> Result<RecordHeader> {
    let header = store.read_header(data.rid)?;
    hds_ensure!(
        data.subscript.is_whole() && header.is_scalar_structure(),
        HdsError::invalid("object is not a scalar structure")
    );
    Ok(header)
}

/// Looks up `name` in the addressed structure and checks the child's
/// parent link.
fn find_child(store: &mut RecordStore<'_>, data: &LocatorData, name: &str) -> Result<RecordId> {
    let name = validate_name(name)?;
    structure_header(store, data)?;
    let Some(child) = store.find_component(data.rid, &name)? else {
        hds_bail!(HdsError::NotFound(name));
    };
    store
        .child(data.rid, child)
        .wrap_err_with(|| format!("component '{}' is damaged", name))?;
    Ok(child)
}

/// Reads the header of a primitive object and returns its element type.
fn primitive_header(store: &mut RecordStore<'_>, data: &LocatorData) -> Result<(RecordHeader, PrimitiveType)> {
    let header = store.read_header(data.rid)?;
    let Some(ty) = header.descriptor.ty.primitive() else {
        hds_bail!(HdsError::invalid(format!(
            "object of type {} is not primitive",
            header.descriptor.ty.name()
        )));
    };
    Ok((header, ty))
}

fn read_view(store: &mut RecordStore<'_>, data: &LocatorData, header: &RecordHeader, size: usize) -> Result<Vec<u8>> {
    let count = data.subscript.element_count(&header.descriptor.dims) as usize;
    let mut out = vec![0u8; count * size];
    let mut at = 0;
    for (start, n) in data.subscript.runs(&header.descriptor.dims) {
        let len = n as usize * size;
        store.read_data(data.rid, start as usize * size, &mut out[at..at + len])?;
        at += len;
    }
    Ok(out)
}

fn write_view(store: &mut RecordStore<'_>, data: &LocatorData, header: &RecordHeader, size: usize, bytes: &[u8]) -> Result<()> {
    let count = data.subscript.element_count(&header.descriptor.dims) as usize;
    hds_ensure!(
        bytes.len() == count * size,
        HdsError::invalid(format!(
            "{} bytes given for {} elements of {} bytes",
            bytes.len(),
            count,
            size
        ))
    );
    let mut at = 0;
    for (start, n) in data.subscript.runs(&header.descriptor.dims) {
        let len = n as usize * size;
        store.write_data(data.rid, start as usize * size, &bytes[at..at + len])?;
        at += len;
    }
    Ok(())
}

pub struct Hds {
    state: Mutex<EngineState>,
}

impl Hds {
    /// Creates an engine with default tuning.
    pub fn new() -> Result<Self> {
        Self::with_tuning(Tuning::default())
    }

    pub fn builder() -> HdsBuilder {
        HdsBuilder::new()
    }

    pub fn with_tuning(tuning: Tuning) -> Result<Self> {
        let cache = BlockCache::new(tuning.maxwpl)?;
        Ok(Self {
            state: Mutex::new(EngineState {
                files: FileTable::new(),
                cache,
                locators: LocatorTable::new(),
                tuning,
            }),
        })
    }

    // ------------------------------------------------------------------
    // Container files
    // ------------------------------------------------------------------

    /// Creates a container file whose top-level object is `name` of type
    /// `type_name` and shape `dims`. Returns a primary locator on it.
    pub fn create(&self, path: impl AsRef<Path>, name: &str, type_name: &str, dims: &[u32]) -> Result<Locator> {
        let path = path.as_ref();
        let name = validate_name(name)?;
        let descriptor = ObjectDescriptor::new(ObjectType::parse(type_name)?, dims)?;

        let mut state = self.state.lock();
        let opts = state.tuning.file_options();
        let file = state
            .files
            .create(path, &name, opts)
            .wrap_err_with(|| format!("failed to create container '{}'", path.display()))?;

        let rid = match state.create_top(file, &name, &descriptor) {
            Ok(rid) => rid,
            Err(err) => {
                if let Ok(f) = state.files.get_mut(file) {
                    f.mark_for_deletion();
                }
                if let Err(close_err) = state.close_file(file) {
                    warn!("failed to discard partly created container: {close_err:#}");
                }
                return Err(err.wrap_err(format!("failed to create container '{}'", path.display())));
            }
        };

        let mut data = LocatorData::whole(file, rid, OpenMode::Update);
        data.primary = true;
        state.issue(data)
    }

    /// Opens a container file and returns a primary locator on its
    /// top-level object. A file already open in this engine is shared.
    pub fn open(&self, path: impl AsRef<Path>, mode: OpenMode) -> Result<Locator> {
        let path = path.as_ref();
        let mut state = self.state.lock();
        let opts = state.tuning.file_options();
        let file = state
            .files
            .open(path, mode, opts)
            .wrap_err_with(|| format!("failed to open container '{}'", path.display()))?;

        let top = state.files.get(file)?.top_rid();
        let checked = state.store(file).and_then(|mut store| store.read_header(top));
        if let Err(err) = checked {
            if state.files.get(file)?.refcount() == 0 {
                state.close_file(file)?;
            }
            return Err(err.wrap_err(format!("unreadable top-level object in '{}'", path.display())));
        }

        let mut data = LocatorData::whole(file, top, mode);
        data.primary = true;
        state.issue(data)
    }

    /// Writes back every dirty block and modified header.
    pub fn flush(&self) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        for file in state.files.slots() {
            state.files.flush(&mut state.cache, file)?;
        }
        Ok(())
    }

    /// Marks a container file for deletion, invalidates every locator on it
    /// and closes (deleting) it.
    pub fn erase_container(&self, loc: Locator) -> Result<()> {
        let mut state = self.state.lock();
        let data = state.writable(loc)?;
        let file = state.files.get_mut(data.file)?;
        file.mark_for_deletion();
        debug!(path = %file.path().display(), "container marked for deletion");
        state.close_file(data.file)
    }

    /// Closes every open file. Called on drop; errors are returned here but
    /// only logged there.
    pub fn close_all(&self) -> Result<()> {
        self.state.lock().close_all()
    }

    // ------------------------------------------------------------------
    // Locators
    // ------------------------------------------------------------------

    pub fn valid(&self, loc: Locator) -> bool {
        self.state.lock().locators.contains(loc)
    }

    pub fn clone_locator(&self, loc: Locator, primary: bool) -> Result<Locator> {
        let mut state = self.state.lock();
        let mut data = state.locator(loc)?;
        data.primary = primary;
        state.issue(data)
    }

    /// Invalidates a locator. Annulling the last primary locator on a file
    /// closes the file.
    pub fn annul(&self, loc: Locator) -> Result<()> {
        let mut state = self.state.lock();
        let data = state.locators.remove(loc)?;
        state.release(&data)
    }

    /// Number of primary locators on the locator's file.
    pub fn refcount(&self, loc: Locator) -> Result<u32> {
        let state = self.state.lock();
        let data = state.locators.get(loc)?;
        Ok(state.files.get(data.file)?.refcount())
    }

    pub fn is_primary(&self, loc: Locator) -> Result<bool> {
        Ok(self.state.lock().locators.get(loc)?.primary)
    }

    /// Promotes or demotes a locator. Demoting the last primary locator on
    /// a file closes it and invalidates `loc` with everything else on it.
    pub fn set_primary(&self, loc: Locator, primary: bool) -> Result<()> {
        let mut state = self.state.lock();
        let data = state.locator(loc)?;
        if data.primary == primary {
            return Ok(());
        }

        state.locators.get_mut(loc)?.primary = primary;
        if primary {
            let file = state.files.get_mut(data.file)?;
            file.add_ref();
            debug!(path = %file.path().display(), refcount = file.refcount(), "locator promoted to primary");
            Ok(())
        } else {
            state.release(&data)
        }
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Locates a component of a scalar structure.
    pub fn find(&self, loc: Locator, name: &str) -> Result<Locator> {
        let mut state = self.state.lock();
        let data = state.locator(loc)?;
        let child = {
            let mut store = state.store(data.file)?;
            find_child(&mut store, &data, name)?
        };
        state.issue(data.derive(child, Subscript::Whole))
    }

    /// Resolves a dotted component path such as `MORE.FITS` below `loc` and
    /// returns a single locator on the result, primary if asked.
    pub fn import(&self, loc: Locator, path: &str, primary: bool) -> Result<Locator> {
        let mut state = self.state.lock();
        let data = state.locator(loc)?;

        let rid = {
            let mut store = state.store(data.file)?;
            let mut current = data.clone();
            for name in path.split('.') {
                let child = find_child(&mut store, &current, name)
                    .wrap_err_with(|| format!("failed to resolve '{}'", path))?;
                current = current.derive(child, Subscript::Whole);
            }
            current.rid
        };

        let mut imported = data.derive(rid, Subscript::Whole);
        imported.primary = primary;
        state.issue(imported)
    }

    pub fn there(&self, loc: Locator, name: &str) -> Result<bool> {
        let mut state = self.state.lock();
        let data = state.locator(loc)?;
        let name = validate_name(name)?;
        let mut store = state.store(data.file)?;
        structure_header(&mut store, &data)?;
        Ok(store.find_component(data.rid, &name)?.is_some())
    }

    /// Locates the `n`th component (1-based, in creation order).
    pub fn index(&self, loc: Locator, n: usize) -> Result<Locator> {
        hds_ensure!(n >= 1, HdsError::invalid("component index is 1-based"));
        let mut state = self.state.lock();
        let data = state.locator(loc)?;

        let child = {
            let mut store = state.store(data.file)?;
            structure_header(&mut store, &data)?;
            let components = store.list_components(data.rid)?;
            let Some((_, child)) = components.get(n - 1).cloned() else {
                hds_bail!(HdsError::NotFound(format!(
                    "component {} of {}",
                    n,
                    components.len()
                )));
            };
            store.child(data.rid, child)?;
            child
        };

        state.issue(data.derive(child, Subscript::Whole))
    }

    pub fn components(&self, loc: Locator) -> Result<Vec<String>> {
        let mut state = self.state.lock();
        let data = state.locator(loc)?;
        let mut store = state.store(data.file)?;
        structure_header(&mut store, &data)?;
        Ok(store
            .list_components(data.rid)?
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    pub fn ncomp(&self, loc: Locator) -> Result<usize> {
        Ok(self.components(loc)?.len())
    }

    /// Locates one element of an array (1-based subscripts). A cell of a
    /// structure array is the scalar structure stored there.
    pub fn cell(&self, loc: Locator, subs: &[u32]) -> Result<Locator> {
        let mut state = self.state.lock();
        let data = state.locator(loc)?;

        let (rid, subscript) = {
            let mut store = state.store(data.file)?;
            let header = store.read_header(data.rid)?;
            let dims = &header.descriptor.dims;
            let base = data.subscript.cell(dims, subs)?;

            if header.is_structure_array() {
                let cell = store.get_cell(data.rid, offset_of(dims, &base))?;
                store.child(data.rid, cell)?;
                (cell, Subscript::Whole)
            } else {
                (data.rid, Subscript::Cell(base))
            }
        };

        state.issue(data.derive(rid, subscript))
    }

    /// Locates a rectangular slice, given inclusive 1-based bounds.
    pub fn slice(&self, loc: Locator, bounds: &[(u32, u32)]) -> Result<Locator> {
        let mut state = self.state.lock();
        let data = state.locator(loc)?;

        let base = {
            let mut store = state.store(data.file)?;
            let header = store.read_header(data.rid)?;
            data.subscript.slice(&header.descriptor.dims, bounds)?
        };

        state.issue(data.derive(data.rid, Subscript::Slice(base)))
    }

    // ------------------------------------------------------------------
    // Structure editing
    // ------------------------------------------------------------------

    /// Creates a component of a scalar structure.
    pub fn new_component(&self, loc: Locator, name: &str, type_name: &str, dims: &[u32]) -> Result<()> {
        let mut state = self.state.lock();
        let data = state.writable(loc)?;
        let name = validate_name(name)?;
        let descriptor = ObjectDescriptor::new(ObjectType::parse(type_name)?, dims)?;

        let mut store = state.store(data.file)?;
        structure_header(&mut store, &data)?;
        hds_ensure!(
            store.find_component(data.rid, &name)?.is_none(),
            HdsError::invalid(format!("component '{}' already exists", name))
        );

        let child = store
            .create_object(data.rid, &descriptor)
            .wrap_err_with(|| format!("failed to create component '{}'", name))?;
        if let Err(err) = store.insert_component(data.rid, &name, child) {
            let mut freed = Vec::new();
            if let Err(free_err) = store.free_tree(child, &mut freed) {
                warn!("failed to free orphaned component '{}': {free_err:#}", name);
            }
            return Err(err);
        }
        Ok(())
    }

    /// Erases a component and everything below it. Locators on the erased
    /// objects become invalid.
    pub fn erase(&self, loc: Locator, name: &str) -> Result<()> {
        let mut state = self.state.lock();
        let data = state.writable(loc)?;
        let name = validate_name(name)?;

        let freed = {
            let mut store = state.store(data.file)?;
            structure_header(&mut store, &data)?;
            store
                .erase_component(data.rid, &name)
                .wrap_err_with(|| format!("failed to erase component '{}'", name))?
        };

        let dropped = state.locators.remove_records(data.file, &freed);
        debug!(component = %name, records = freed.len(), locators = dropped.len(), "erased component");
        state.release_all(dropped)
    }

    /// Renames the object. The top-level object is renamed in the file
    /// header; cells of structure arrays have no name of their own.
    pub fn rename(&self, loc: Locator, new_name: &str) -> Result<()> {
        let mut state = self.state.lock();
        let data = state.writable(loc)?;
        let new_name = validate_name(new_name)?;
        hds_ensure!(
            data.subscript.is_whole(),
            HdsError::invalid("cannot rename a cell or slice")
        );

        let mut store = state.store(data.file)?;
        let parent = store.read_header(data.rid)?.parent();
        if parent.is_null() {
            store.container().file_mut()?.set_top(data.rid, &new_name);
            return Ok(());
        }

        hds_ensure!(
            !store.read_header(parent)?.is_structure_array(),
            HdsError::invalid("cells of a structure array cannot be renamed")
        );
        let old = store.component_name_of(parent, data.rid)?;
        store.rename_component(parent, &old, &new_name)
    }

    /// Changes the extents of an array. The number of dimensions is fixed;
    /// leading elements are kept in storage order and new ones are zero
    /// (or empty structures). Cell and slice locators on the object, and
    /// locators below removed structure cells, become invalid.
    pub fn alter(&self, loc: Locator, dims: &[u32]) -> Result<()> {
        let mut state = self.state.lock();
        let data = state.writable(loc)?;
        hds_ensure!(
            data.subscript.is_whole(),
            HdsError::invalid("cannot reshape a cell or slice")
        );

        let freed = {
            let mut store = state.store(data.file)?;
            let header = store.read_header(data.rid)?;
            let descriptor = ObjectDescriptor::new(header.descriptor.ty.clone(), dims)?;
            store
                .reshape(data.rid, &descriptor)
                .wrap_err_with(|| format!("failed to reshape to {:?}", dims))?
        };

        let mut dropped = state.locators.remove_views(data.file, data.rid);
        dropped.extend(state.locators.remove_records(data.file, &freed));
        state.release_all(dropped)
    }

    // ------------------------------------------------------------------
    // Data access
    // ------------------------------------------------------------------

    /// Writes all addressed elements. The element type must match the
    /// stored type exactly.
    pub fn put<T: Primitive>(&self, loc: Locator, values: &[T]) -> Result<()> {
        let mut state = self.state.lock();
        let data = state.writable(loc)?;
        let mut store = state.store(data.file)?;
        let (header, ty) = primitive_header(&mut store, &data)?;
        hds_ensure!(
            ty == T::TYPE,
            HdsError::invalid(format!("cannot write {} values to a {} object", T::TYPE.name(), ty.name()))
        );
        write_view(&mut store, &data, &header, ty.element_size(), &encode_values(values))
    }

    pub fn get<T: Primitive>(&self, loc: Locator) -> Result<Vec<T>> {
        let mut state = self.state.lock();
        let data = state.locator(loc)?;
        let mut store = state.store(data.file)?;
        let (header, ty) = primitive_header(&mut store, &data)?;
        hds_ensure!(
            ty == T::TYPE,
            HdsError::invalid(format!("cannot read {} values from a {} object", T::TYPE.name(), ty.name()))
        );
        let bytes = read_view(&mut store, &data, &header, ty.element_size())?;
        Ok(decode_values(&bytes))
    }

    /// Writes raw little-endian element bytes of any primitive type.
    pub fn put_bytes(&self, loc: Locator, bytes: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        let data = state.writable(loc)?;
        let mut store = state.store(data.file)?;
        let (header, ty) = primitive_header(&mut store, &data)?;
        write_view(&mut store, &data, &header, ty.element_size(), bytes)
    }

    pub fn get_bytes(&self, loc: Locator) -> Result<Vec<u8>> {
        let mut state = self.state.lock();
        let data = state.locator(loc)?;
        let mut store = state.store(data.file)?;
        let (header, ty) = primitive_header(&mut store, &data)?;
        read_view(&mut store, &data, &header, ty.element_size())
    }

    /// Writes `_CHAR*n` elements; values are blank padded or truncated to
    /// `n` bytes.
    pub fn put_str<S: AsRef<str>>(&self, loc: Locator, values: &[S]) -> Result<()> {
        let mut state = self.state.lock();
        let data = state.writable(loc)?;
        let mut store = state.store(data.file)?;
        let (header, ty) = primitive_header(&mut store, &data)?;
        let PrimitiveType::Char(width) = ty else {
            hds_bail!(HdsError::invalid(format!("cannot write strings to a {} object", ty.name())));
        };
        let bytes = encode_strings(values, width as usize);
        write_view(&mut store, &data, &header, width as usize, &bytes)
    }

    /// Reads `_CHAR*n` elements with trailing blanks removed.
    pub fn get_str(&self, loc: Locator) -> Result<Vec<String>> {
        let mut state = self.state.lock();
        let data = state.locator(loc)?;
        let mut store = state.store(data.file)?;
        let (header, ty) = primitive_header(&mut store, &data)?;
        let PrimitiveType::Char(width) = ty else {
            hds_bail!(HdsError::invalid(format!("cannot read strings from a {} object", ty.name())));
        };
        let bytes = read_view(&mut store, &data, &header, width as usize)?;
        Ok(decode_strings(&bytes, width as usize))
    }

    pub fn put_logical(&self, loc: Locator, values: &[bool]) -> Result<()> {
        self.put(loc, values)
    }

    pub fn get_logical(&self, loc: Locator) -> Result<Vec<bool>> {
        self.get(loc)
    }

    /// Name, type and (view) shape of the addressed object.
    pub fn info(&self, loc: Locator) -> Result<ObjectInfo> {
        let mut state = self.state.lock();
        let data = state.locator(loc)?;
        let mut store = state.store(data.file)?;
        let header = store.read_header(data.rid)?;
        let traced = trace_path(&mut store, data.rid, &data.subscript)?;

        Ok(ObjectInfo {
            name: traced.path.rsplit('.').next().unwrap_or_default().to_string(),
            type_name: header.descriptor.ty.name(),
            dims: data.subscript.shape(&header.descriptor.dims),
            primitive: header.descriptor.ty.is_primitive(),
        })
    }

    // ------------------------------------------------------------------
    // Tracing
    // ------------------------------------------------------------------

    /// Fully qualified path of the addressed object.
    pub fn trace(&self, loc: Locator) -> Result<TracedPath> {
        let mut state = self.state.lock();
        let data = state.locator(loc)?;
        let mut store = state.store(data.file)?;
        trace_path(&mut store, data.rid, &data.subscript)
            .wrap_err_with(|| format!("failed to trace locator {}", loc))
    }

    /// Like `trace`, but fails with `Truncated` (carrying the truncated
    /// strings) when the path or file name exceeds the given lengths.
    pub fn trace_bounded(&self, loc: Locator, path_cap: usize, file_cap: usize) -> Result<TracedPath> {
        bound_trace(self.trace(loc)?, path_cap, file_cap)
    }

    // ------------------------------------------------------------------
    // Tuning and statistics
    // ------------------------------------------------------------------

    pub fn tune(&self, name: &str, value: i64) -> Result<()> {
        let param = TuningParam::parse(name)?;
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.tuning.set(param, value)?;
        if param == TuningParam::Maxwpl {
            state.cache.set_capacity(&mut state.files, state.tuning.maxwpl)?;
        }
        debug!(%param, value, "tuning parameter set");
        Ok(())
    }

    pub fn gtune(&self, name: &str) -> Result<i64> {
        let param = TuningParam::parse(name)?;
        Ok(self.state.lock().tuning.get(param))
    }

    pub fn tuning(&self) -> Tuning {
        self.state.lock().tuning
    }

    /// Free-space figures of the locator's file.
    pub fn free_space(&self, loc: Locator) -> Result<SpaceReport> {
        let mut state = self.state.lock();
        let data = state.locator(loc)?;
        state.store(data.file)?.container().space_report()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.state.lock().cache.stats()
    }

    pub fn open_files(&self) -> usize {
        self.state.lock().files.len()
    }
}

impl Drop for Hds {
    fn drop(&mut self) {
        if let Err(err) = self.state.get_mut().close_all() {
            warn!("error closing container files on drop: {err:#}");
        }
    }
}
