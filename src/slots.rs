//! # Generation-Checked Slot Tables
//!
//! Open container files and locators are stored in `SlotTable`s and referred
//! to by `SlotId { index, generation }`. Removing an entry bumps the slot's
//! generation, so an id that outlives its entry no longer resolves: a stale
//! handle is detected as a lookup miss instead of silently aliasing whatever
//! reuses the slot.
//!
//! ```text
//! SlotTable
//! ├── [0] gen 3  Some(file A)
//! ├── [1] gen 1  None            <- on free list
//! └── [2] gen 7  Some(file B)
//!
//! SlotId { index: 1, generation: 0 }  -> None (stale)
//! SlotId { index: 2, generation: 7 }  -> file B
//! ```

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId {
    index: u32,
    generation: u32,
}

impl SlotId {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

#[derive(Debug)]
pub struct SlotTable<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> SlotTable<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    pub fn insert(&mut self, value: T) -> SlotId {
        self.len += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.value.is_none());
            slot.value = Some(value);
            return SlotId {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        SlotId {
            index,
            generation: 0,
        }
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    /// Looks up a live entry by raw index, ignoring the generation.
    pub fn get_by_index(&self, index: u32) -> Option<(SlotId, &T)> {
        let slot = self.slots.get(index as usize)?;
        let value = slot.value.as_ref()?;
        Some((
            SlotId {
                index,
                generation: slot.generation,
            },
            value,
        ))
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.get(id).is_some()
    }

    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }

        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Some(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.value.as_ref().map(|v| {
                (
                    SlotId {
                        index: i as u32,
                        generation: slot.generation,
                    },
                    v,
                )
            })
        })
    }

    pub fn ids(&self) -> Vec<SlotId> {
        self.iter().map(|(id, _)| id).collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<T> Default for SlotTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get_returns_value() {
        let mut table = SlotTable::new();
        let id = table.insert("a");

        assert_eq!(table.get(id), Some(&"a"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn removed_id_no_longer_resolves() {
        let mut table = SlotTable::new();
        let id = table.insert(1u32);

        assert_eq!(table.remove(id), Some(1));
        assert!(table.get(id).is_none());
        assert!(table.remove(id).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn reused_slot_gets_new_generation() {
        let mut table = SlotTable::new();
        let old = table.insert(1u32);
        table.remove(old);

        let new = table.insert(2u32);

        assert_eq!(old.index(), new.index());
        assert_ne!(old.generation(), new.generation());
        assert!(table.get(old).is_none());
        assert_eq!(table.get(new), Some(&2));
    }

    #[test]
    fn iter_skips_empty_slots() {
        let mut table = SlotTable::new();
        let a = table.insert('a');
        let b = table.insert('b');
        let c = table.insert('c');
        table.remove(b);

        let ids: Vec<_> = table.iter().map(|(id, v)| (id, *v)).collect();

        assert_eq!(ids, vec![(a, 'a'), (c, 'c')]);
    }

    #[test]
    fn get_by_index_reports_current_generation() {
        let mut table = SlotTable::new();
        let old = table.insert(10u8);
        table.remove(old);
        let new = table.insert(20u8);

        let (id, value) = table.get_by_index(new.index()).unwrap();
        assert_eq!(id, new);
        assert_eq!(*value, 20);
    }
}
