//! # Locators
//!
//! A `Locator` is the handle clients hold on an object. It is a copyable
//! generation-checked index into the engine's `LocatorTable`; annulling it
//! (or closing its file) removes the entry, and every later use of the
//! handle fails with `InvalidHandle`.
//!
//! ## Primary and Secondary Locators
//!
//! A container file stays open while it has at least one primary locator:
//! its reference count is the number of live primary locators on it. When
//! the last one goes away the file is closed and all remaining (secondary)
//! locators on it are invalidated.
//!
//! | Issued by                                 | Kind      |
//! |-------------------------------------------|-----------|
//! | `create`, `open`                          | primary   |
//! | `find`, `cell`, `slice`, `index`          | secondary |
//! | `clone_locator`                           | caller's choice |
//!
//! This table only tracks locators; reference counts live on the open files
//! and are adjusted by the engine as it issues and annuls locators.

mod subscript;

use std::fmt;

use eyre::Result;

use crate::error::HdsError;
use crate::slots::{SlotId, SlotTable};
use crate::storage::{OpenMode, RecordId};

pub use subscript::{format_bounds, format_subs, offset_of, subs_of, Bounds, Subscript};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locator(SlotId);

impl Locator {
    pub fn id(&self) -> SlotId {
        self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.0.index(), self.0.generation())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorData {
    pub file: SlotId,
    pub rid: RecordId,
    pub primary: bool,
    pub mode: OpenMode,
    pub subscript: Subscript,
}

impl LocatorData {
    pub fn whole(file: SlotId, rid: RecordId, mode: OpenMode) -> Self {
        Self {
            file,
            rid,
            primary: false,
            mode,
            subscript: Subscript::Whole,
        }
    }

    /// A secondary locator on `rid` with this locator's file and mode.
    pub fn derive(&self, rid: RecordId, subscript: Subscript) -> Self {
        Self {
            file: self.file,
            rid,
            primary: false,
            mode: self.mode,
            subscript,
        }
    }

    pub fn is_writable(&self) -> bool {
        self.mode.is_writable()
    }
}

#[derive(Debug, Default)]
pub struct LocatorTable {
    locators: SlotTable<LocatorData>,
}

impl LocatorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, data: LocatorData) -> Locator {
        Locator(self.locators.insert(data))
    }

    pub fn get(&self, loc: Locator) -> Result<&LocatorData> {
        self.locators
            .get(loc.0)
            .ok_or_else(|| HdsError::InvalidHandle.into())
    }

    pub fn get_mut(&mut self, loc: Locator) -> Result<&mut LocatorData> {
        self.locators
            .get_mut(loc.0)
            .ok_or_else(|| HdsError::InvalidHandle.into())
    }

    pub fn contains(&self, loc: Locator) -> bool {
        self.locators.contains(loc.0)
    }

    pub fn remove(&mut self, loc: Locator) -> Result<LocatorData> {
        self.locators
            .remove(loc.0)
            .ok_or_else(|| HdsError::InvalidHandle.into())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Locator, &LocatorData)> {
        self.locators.iter().map(|(id, data)| (Locator(id), data))
    }

    pub fn len(&self) -> usize {
        self.locators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }

    fn remove_where(&mut self, pred: impl Fn(&LocatorData) -> bool) -> Vec<LocatorData> {
        let doomed: Vec<SlotId> = self
            .locators
            .iter()
            .filter(|(_, d)| pred(d))
            .map(|(id, _)| id)
            .collect();
        doomed
            .into_iter()
            .filter_map(|id| self.locators.remove(id))
            .collect()
    }

    /// Invalidates every locator on a file.
    pub fn remove_file(&mut self, file: SlotId) -> Vec<LocatorData> {
        self.remove_where(|d| d.file == file)
    }

    /// Invalidates every locator on one of the given records of a file.
    pub fn remove_records(&mut self, file: SlotId, rids: &[RecordId]) -> Vec<LocatorData> {
        let rids: hashbrown::HashSet<RecordId> = rids.iter().copied().collect();
        self.remove_where(|d| d.file == file && rids.contains(&d.rid))
    }

    /// Invalidates the cell and slice locators on a record, whose
    /// subscripts no longer apply once the record is reshaped.
    pub fn remove_views(&mut self, file: SlotId, rid: RecordId) -> Vec<LocatorData> {
        self.remove_where(|d| d.file == file && d.rid == rid && !d.subscript.is_whole())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{error_kind, ErrorKind};

    fn file_slot(n: usize) -> SlotId {
        let mut table = SlotTable::new();
        let mut id = table.insert(());
        for _ in 0..n {
            id = table.insert(());
        }
        id
    }

    #[test]
    fn removed_locator_is_invalid() {
        let mut table = LocatorTable::new();
        let loc = table.issue(LocatorData::whole(file_slot(0), RecordId::new(3, 0), OpenMode::Read));

        table.remove(loc).unwrap();

        assert!(!table.contains(loc));
        assert_eq!(
            error_kind(&table.get(loc).unwrap_err()),
            Some(ErrorKind::InvalidHandle)
        );
        assert!(table.remove(loc).is_err());
    }

    #[test]
    fn reissued_slot_does_not_revive_old_handle() {
        let mut table = LocatorTable::new();
        let file = file_slot(0);
        let old = table.issue(LocatorData::whole(file, RecordId::new(3, 0), OpenMode::Read));
        table.remove(old).unwrap();

        let new = table.issue(LocatorData::whole(file, RecordId::new(4, 0), OpenMode::Read));

        assert_eq!(old.id().index(), new.id().index());
        assert!(table.get(old).is_err());
        assert_eq!(table.get(new).unwrap().rid, RecordId::new(4, 0));
    }

    #[test]
    fn removing_a_file_drops_all_its_locators() {
        let mut table = LocatorTable::new();
        let a = file_slot(0);
        let b = file_slot(1);
        let mut primary = LocatorData::whole(a, RecordId::new(3, 0), OpenMode::Update);
        primary.primary = true;
        table.issue(primary.clone());
        table.issue(primary.clone());
        table.issue(primary.derive(RecordId::new(3, 2), Subscript::Whole));
        table.issue(LocatorData::whole(b, RecordId::new(3, 0), OpenMode::Read));

        let dropped = table.remove_file(a);
        assert_eq!(dropped.len(), 3);
        assert_eq!(dropped.iter().filter(|d| d.primary).count(), 2);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn removing_records_spares_other_files() {
        let mut table = LocatorTable::new();
        let a = file_slot(0);
        let b = file_slot(1);
        let rid = RecordId::new(5, 1);
        table.issue(LocatorData::whole(a, rid, OpenMode::Update));
        let other = table.issue(LocatorData::whole(b, rid, OpenMode::Update));

        let removed = table.remove_records(a, &[rid]);

        assert_eq!(removed.len(), 1);
        assert!(table.contains(other));
    }
}
