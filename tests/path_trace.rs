//! # Path Trace Tests
//!
//! `trace` rebuilds the dotted path of an object from its ancestry:
//! component names come from the parents' component tables, cell
//! subscripts from the parents' cell vectors (1-based, first subscript
//! fastest), and the top-level name from the container header.

use hdsdb::{error_kind, hds_error, ErrorKind, Hds, HdsError};
use tempfile::tempdir;

fn engine() -> Hds {
    Hds::builder().syslck(false).build().unwrap()
}

#[test]
fn nested_components_are_dot_separated() {
    let dir = tempdir().unwrap();
    let hds = engine();
    let s = hds.create(dir.path().join("trace"), "S", "TOP", &[]).unwrap();
    hds.new_component(s, "A", "MID", &[]).unwrap();
    let a = hds.find(s, "A").unwrap();
    hds.new_component(a, "B", "_INTEGER", &[]).unwrap();
    let b = hds.find(a, "B").unwrap();

    let traced = hds.trace(b).unwrap();

    assert!(traced.path.ends_with(".A.B"), "got {}", traced.path);
    assert_eq!(traced.path, "S.A.B");
    assert_eq!(traced.levels, 3);
    assert!(traced.file.ends_with("trace.sdf"));
}

#[test]
fn structure_array_cell_carries_its_subscripts() {
    let dir = tempdir().unwrap();
    let hds = engine();
    let s = hds.create(dir.path().join("arr"), "S", "TOP", &[]).unwrap();
    hds.new_component(s, "ARR", "CELL", &[3, 4]).unwrap();
    let arr = hds.find(s, "ARR").unwrap();

    let cell = hds.cell(arr, &[2, 3]).unwrap();
    hds.new_component(cell, "X", "_REAL", &[]).unwrap();
    let x = hds.find(cell, "X").unwrap();

    assert!(hds.trace(cell).unwrap().path.ends_with(".ARR(2,3)"));
    assert_eq!(hds.trace(x).unwrap().path, "S.ARR(2,3).X");
    assert_eq!(hds.trace(x).unwrap().levels, 3);
}

#[test]
fn primitive_cell_write_and_trace() {
    let dir = tempdir().unwrap();
    let hds = engine();
    let s = hds.create(dir.path().join("prim"), "S", "TOP", &[]).unwrap();
    hds.new_component(s, "ARR", "_INTEGER", &[3]).unwrap();
    let arr = hds.find(s, "ARR").unwrap();

    let cell = hds.cell(arr, &[2]).unwrap();
    hds.put(cell, &[7i32]).unwrap();

    assert_eq!(hds.get::<i32>(arr).unwrap(), vec![0, 7, 0]);
    assert!(hds.trace(cell).unwrap().path.ends_with(".ARR(2)"));
}

#[test]
fn slices_trace_with_bounds() {
    let dir = tempdir().unwrap();
    let hds = engine();
    let s = hds.create(dir.path().join("slice"), "S", "TOP", &[]).unwrap();
    hds.new_component(s, "IMG", "_UBYTE", &[8, 8]).unwrap();
    let img = hds.find(s, "IMG").unwrap();

    let slice = hds.slice(img, &[(2, 4), (5, 8)]).unwrap();
    let inner = hds.slice(slice, &[(1, 1), (2, 3)]).unwrap();

    assert_eq!(hds.trace(slice).unwrap().path, "S.IMG(2:4,5:8)");
    assert_eq!(hds.trace(inner).unwrap().path, "S.IMG(2:2,6:7)");
    assert_eq!(hds.info(slice).unwrap().dims.as_slice(), &[3, 4]);
}

#[test]
fn deep_mixed_hierarchy() {
    let dir = tempdir().unwrap();
    let hds = engine();
    let top = hds.create(dir.path().join("deep"), "DATA", "NDF", &[]).unwrap();
    hds.new_component(top, "MORE", "EXT", &[]).unwrap();
    let more = hds.find(top, "MORE").unwrap();
    hds.new_component(more, "AXIS", "AXIS", &[2]).unwrap();
    let axis = hds.find(more, "AXIS").unwrap();
    let second = hds.cell(axis, &[2]).unwrap();
    hds.new_component(second, "LABEL", "_CHAR*20", &[]).unwrap();
    let label = hds.find(second, "LABEL").unwrap();

    let traced = hds.trace(label).unwrap();

    assert_eq!(traced.path, "DATA.MORE.AXIS(2).LABEL");
    assert_eq!(traced.levels, 4);
}

#[test]
fn top_level_trace_is_the_header_name() {
    let dir = tempdir().unwrap();
    let hds = engine();
    let top = hds.create(dir.path().join("t"), "lower", "_DOUBLE", &[]).unwrap();

    let traced = hds.trace(top).unwrap();

    assert_eq!(traced.path, "LOWER");
    assert_eq!(traced.levels, 1);
}

#[test]
fn bounded_trace_reports_truncation() {
    let dir = tempdir().unwrap();
    let hds = engine();
    let s = hds.create(dir.path().join("bounded"), "SPECTRUM", "TOP", &[]).unwrap();
    hds.new_component(s, "WAVELENGTH", "_REAL", &[]).unwrap();
    let w = hds.find(s, "WAVELENGTH").unwrap();

    let full = hds.trace_bounded(w, 64, 4096).unwrap();
    assert_eq!(full.path, "SPECTRUM.WAVELENGTH");

    let err = hds.trace_bounded(w, 10, 4096).unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::Truncated));
    match hds_error(&err) {
        Some(HdsError::Truncated(t)) => {
            assert_eq!(t.path, "SPECTRUM.W");
            assert_eq!(t.levels, 2);
        }
        other => panic!("expected a truncated trace, got {:?}", other),
    }

    let err = hds.trace_bounded(w, 64, 3).unwrap_err();
    match hds_error(&err) {
        Some(HdsError::Truncated(t)) => assert_eq!(t.file.chars().count(), 3),
        other => panic!("expected a truncated trace, got {:?}", other),
    }
}
