//! # Free-Space Property Tests
//!
//! Random sequences of component creation, erasure and growth must leave
//! the container's free-space report consistent and the surviving data
//! intact, both in the running engine and after a reopen:
//!
//! - free ranges are sorted, disjoint and never adjacent (merged)
//! - no range starts inside the header or runs past the end of file
//! - free, lost and in-use blocks plus the two header blocks add up to the
//!   end-of-file block
//! - every surviving component reads back exactly what was written

use std::collections::BTreeMap;

use hdsdb::{Hds, Locator, OpenMode, SpaceReport};
use proptest::prelude::*;
use tempfile::tempdir;

const HEADER_BLOCKS: u64 = 2;
const FIRST_DATA_BLOCK: u32 = 3;
const SLOTS: usize = 6;

#[derive(Debug, Clone)]
enum Op {
    Create { slot: usize, len: u32, seed: u8 },
    Erase { slot: usize },
    Grow { slot: usize, len: u32 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..SLOTS, 1u32..4000, any::<u8>()).prop_map(|(slot, len, seed)| Op::Create { slot, len, seed }),
        (0..SLOTS).prop_map(|slot| Op::Erase { slot }),
        (0..SLOTS, 1u32..6000).prop_map(|(slot, len)| Op::Grow { slot, len }),
    ]
}

fn name(slot: usize) -> String {
    format!("C{}", slot)
}

fn pattern(len: u32, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

fn check_report(report: &SpaceReport) {
    let mut total = 0u64;
    for range in &report.free {
        assert!(range.len > 0, "empty free range {:?}", range);
        assert!(range.start >= FIRST_DATA_BLOCK, "free range {:?} overlaps the header", range);
        assert!(
            range.end() <= report.eof + 1,
            "free range {:?} runs past eof {}",
            range,
            report.eof
        );
        total += range.len as u64;
    }
    for pair in report.free.windows(2) {
        assert!(
            pair[0].end() < pair[1].start,
            "free ranges {:?} and {:?} overlap or were not merged",
            pair[0],
            pair[1]
        );
    }
    assert_eq!(total, report.free_blocks);
}

fn check_accounting(hds: &Hds, top: Locator) {
    let report = hds.free_space(top).unwrap();
    check_report(&report);
    let used = hds.used_blocks(top).unwrap();
    assert_eq!(
        report.free_blocks + report.lost_blocks + used + HEADER_BLOCKS,
        report.eof as u64,
        "blocks unaccounted for: {:?}, used {}",
        report,
        used
    );
}

fn check_data(hds: &Hds, top: Locator, model: &BTreeMap<String, Vec<u8>>) {
    assert_eq!(hds.ncomp(top).unwrap(), model.len());
    for (name, expected) in model {
        let loc = hds.find(top, name).unwrap();
        assert_eq!(&hds.get_bytes(loc).unwrap(), expected, "component {}", name);
        hds.annul(loc).unwrap();
    }
}

fn apply(hds: &Hds, top: Locator, model: &mut BTreeMap<String, Vec<u8>>, op: &Op) {
    match *op {
        Op::Create { slot, len, seed } => {
            let name = name(slot);
            if model.contains_key(&name) {
                return;
            }
            hds.new_component(top, &name, "_UBYTE", &[len]).unwrap();
            let loc = hds.find(top, &name).unwrap();
            let data = pattern(len, seed);
            hds.put_bytes(loc, &data).unwrap();
            hds.annul(loc).unwrap();
            model.insert(name, data);
        }
        Op::Erase { slot } => {
            let name = name(slot);
            if model.remove(&name).is_some() {
                hds.erase(top, &name).unwrap();
            }
        }
        Op::Grow { slot, len } => {
            let name = name(slot);
            let Some(data) = model.get_mut(&name) else {
                return;
            };
            let loc = hds.find(top, &name).unwrap();
            hds.alter(loc, &[len]).unwrap();
            hds.annul(loc).unwrap();
            data.resize(len as usize, 0);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn free_space_stays_consistent(ops in proptest::collection::vec(op_strategy(), 1..40)) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("space.sdf");
        let mut model = BTreeMap::new();

        let report = {
            let hds = Hds::builder().syslck(false).build().unwrap();
            let top = hds.create(&path, "SPACE", "POOL", &[]).unwrap();
            for op in &ops {
                apply(&hds, top, &mut model, op);
                check_accounting(&hds, top);
            }
            check_data(&hds, top, &model);
            let report = hds.free_space(top).unwrap();
            hds.annul(top).unwrap();
            report
        };

        let hds = Hds::builder().syslck(false).build().unwrap();
        let top = hds.open(&path, OpenMode::Read).unwrap();
        let reopened = hds.free_space(top).unwrap();
        if report.lost_blocks == 0 {
            check_accounting(&hds, top);
        }
        check_report(&reopened);
        prop_assert_eq!(reopened.eof, report.eof);
        prop_assert_eq!(reopened.free, report.free);
        check_data(&hds, top, &model);
    }
}

#[test]
fn erasing_everything_returns_all_data_blocks() {
    let dir = tempdir().unwrap();
    let hds = Hds::builder().syslck(false).build().unwrap();
    let top = hds.create(dir.path().join("drain"), "DRAIN", "POOL", &[]).unwrap();
    for slot in 0..4 {
        hds.new_component(top, &name(slot), "_DOUBLE", &[600]).unwrap();
    }
    check_report(&hds.free_space(top).unwrap());

    for slot in 0..4 {
        hds.erase(top, &name(slot)).unwrap();
    }
    check_accounting(&hds, top);
    let after = hds.free_space(top).unwrap();
    assert!(after.free_blocks >= 40, "{:?}", after);
    assert_eq!(after.lost_blocks, 0);
}
