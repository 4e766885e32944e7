//! # Child Indices
//!
//! Structures find their children through one of two indices stored as the
//! structure record's data.
//!
//! ## Component Table (scalar structure)
//!
//! ```text
//! Offset  Size        Description
//! 0       4           Number of components in use
//! 4       24 x cap    Entries: name (16 bytes, NUL padded) + record id (8)
//! ```
//!
//! The table starts with room for `NCOMP` entries and doubles when full.
//! Entries keep insertion order.
//!
//! ## Cell Vector (array of structures)
//!
//! One 8-byte record id per element in column-major order: the first
//! subscript varies fastest. Each cell is a scalar structure record whose
//! parent is the array record.

use eyre::Result;

use crate::config::{CELL_ENTRY_SIZE, COMPONENT_ENTRY_SIZE, COMPONENT_TABLE_HEADER_SIZE, NAME_FIELD_SIZE};
use crate::error::{hds_ensure, HdsError};
use crate::storage::{decode_name, encode_name, RecordId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentTable {
    entries: Vec<(String, RecordId)>,
    capacity: usize,
}

impl ComponentTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn data_len(capacity: usize) -> usize {
        COMPONENT_TABLE_HEADER_SIZE + capacity * COMPONENT_ENTRY_SIZE
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        hds_ensure!(
            data.len() >= COMPONENT_TABLE_HEADER_SIZE,
            HdsError::integrity("component table is truncated")
        );
        let count = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        let capacity = (data.len() - COMPONENT_TABLE_HEADER_SIZE) / COMPONENT_ENTRY_SIZE;
        hds_ensure!(
            count <= capacity,
            HdsError::integrity(format!(
                "component table holds {} entries but has room for {}",
                count, capacity
            ))
        );

        let entries = (0..count)
            .map(|i| {
                let at = COMPONENT_TABLE_HEADER_SIZE + i * COMPONENT_ENTRY_SIZE;
                let name = decode_name(&data[at..at + NAME_FIELD_SIZE]);
                let rid = RecordId::from_le_bytes(&data[at + NAME_FIELD_SIZE..at + COMPONENT_ENTRY_SIZE]);
                (name, rid)
            })
            .collect();

        Ok(Self { entries, capacity })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![0u8; Self::data_len(self.capacity)];
        out[..4].copy_from_slice(&(self.entries.len() as u32).to_le_bytes());
        for (i, (name, rid)) in self.entries.iter().enumerate() {
            let at = COMPONENT_TABLE_HEADER_SIZE + i * COMPONENT_ENTRY_SIZE;
            out[at..at + NAME_FIELD_SIZE].copy_from_slice(&encode_name(name));
            out[at + NAME_FIELD_SIZE..at + COMPONENT_ENTRY_SIZE].copy_from_slice(&rid.to_le_bytes());
        }
        out
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn entries(&self) -> &[(String, RecordId)] {
        &self.entries
    }

    pub fn find(&self, name: &str) -> Option<RecordId> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, rid)| *rid)
    }

    pub fn name_of(&self, rid: RecordId) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, r)| *r == rid)
            .map(|(n, _)| n.as_str())
    }

    /// Appends an entry, doubling the capacity if the table is full.
    pub fn insert(&mut self, name: &str, rid: RecordId) -> Result<()> {
        hds_ensure!(
            self.find(name).is_none(),
            HdsError::invalid(format!("component '{}' already exists", name))
        );
        if self.entries.len() == self.capacity {
            self.capacity *= 2;
        }
        self.entries.push((name.to_string(), rid));
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<RecordId> {
        let pos = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        hds_ensure!(
            old == new || self.find(new).is_none(),
            HdsError::invalid(format!("component '{}' already exists", new))
        );
        let entry = self
            .entries
            .iter_mut()
            .find(|(n, _)| n == old)
            .ok_or_else(|| HdsError::NotFound(old.to_string()))?;
        entry.0 = new.to_string();
        Ok(())
    }
}

pub fn encode_cells(cells: &[RecordId]) -> Vec<u8> {
    let mut out = Vec::with_capacity(cells.len() * CELL_ENTRY_SIZE);
    for rid in cells {
        out.extend_from_slice(&rid.to_le_bytes());
    }
    out
}

pub fn decode_cells(data: &[u8]) -> Vec<RecordId> {
    data.chunks_exact(CELL_ENTRY_SIZE)
        .map(RecordId::from_le_bytes)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_doubles_when_full() {
        let mut table = ComponentTable::with_capacity(2);
        table.insert("A", RecordId::new(3, 0)).unwrap();
        table.insert("B", RecordId::new(3, 2)).unwrap();
        assert_eq!(table.capacity(), 2);

        table.insert("C", RecordId::new(4, 0)).unwrap();

        assert_eq!(table.capacity(), 4);
        assert_eq!(table.encode().len(), ComponentTable::data_len(4));
    }

    #[test]
    fn table_survives_encoding() {
        let mut table = ComponentTable::with_capacity(6);
        table.insert("DATA_ARRAY", RecordId::new(9, 3)).unwrap();
        table.insert("TITLE", RecordId::new(9, 7)).unwrap();

        let back = ComponentTable::decode(&table.encode()).unwrap();

        assert_eq!(back, table);
        assert_eq!(back.find("TITLE"), Some(RecordId::new(9, 7)));
        assert_eq!(back.name_of(RecordId::new(9, 3)), Some("DATA_ARRAY"));
    }

    #[test]
    fn duplicate_component_is_rejected() {
        let mut table = ComponentTable::with_capacity(2);
        table.insert("A", RecordId::new(3, 0)).unwrap();

        assert!(table.insert("A", RecordId::new(3, 4)).is_err());
    }

    #[test]
    fn remove_keeps_order_of_the_rest() {
        let mut table = ComponentTable::with_capacity(4);
        for (i, name) in ["A", "B", "C"].iter().enumerate() {
            table.insert(name, RecordId::new(3, i as u16)).unwrap();
        }

        assert_eq!(table.remove("B"), Some(RecordId::new(3, 1)));
        let names: Vec<_> = table.entries().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
    }

    #[test]
    fn rename_to_existing_name_fails() {
        let mut table = ComponentTable::with_capacity(4);
        table.insert("A", RecordId::new(3, 0)).unwrap();
        table.insert("B", RecordId::new(3, 1)).unwrap();

        assert!(table.rename("A", "B").is_err());
        table.rename("A", "Z").unwrap();
        assert_eq!(table.find("Z"), Some(RecordId::new(3, 0)));
    }

    #[test]
    fn overfull_count_is_an_integrity_error() {
        let mut data = ComponentTable::with_capacity(1).encode();
        data[0] = 5;

        assert!(ComponentTable::decode(&data).is_err());
    }

    #[test]
    fn cells_are_eight_bytes_each() {
        let cells = vec![RecordId::new(5, 0), RecordId::new(5, 1)];
        let data = encode_cells(&cells);

        assert_eq!(data.len(), 16);
        assert_eq!(decode_cells(&data), cells);
    }
}
