//! # Path Tracer
//!
//! Reconstructs the fully qualified name of an object by walking parent
//! links up to the top-level record:
//!
//! ```text
//! DATA.SPECTRUM(2,3).AXIS(1).LABEL
//! ^^^^ top-level name, from the container header
//!      ^^^^^^^^ component name, from the parent's component table
//!              ^^^^^ cell subscripts, from the parent's cell vector
//! ```
//!
//! Every step checks that the parent actually indexes the child; a child
//! missing from its parent's index, a parent chain that loops, or a top
//! record that is not the one named in the header is an integrity error.

use eyre::Result;
use hashbrown::HashSet;

use crate::error::{hds_bail, hds_ensure, HdsError};
use crate::locator::{format_subs, subs_of, Subscript};
use crate::records::RecordStore;
use crate::storage::RecordId;

/// A traced object: dotted path, container file name and number of path
/// components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracedPath {
    pub path: String,
    pub file: String,
    pub levels: usize,
}

/// Traces `rid` (viewed through `subscript`) in the store's file.
pub fn trace_path(store: &mut RecordStore<'_>, rid: RecordId, subscript: &Subscript) -> Result<TracedPath> {
    let (file, top_rid, top_name) = {
        let file = store.container().file()?;
        (
            file.path().display().to_string(),
            file.top_rid(),
            file.top_name().to_string(),
        )
    };

    let mut segments = Vec::new();
    let mut suffix = subscript.suffix();
    let mut visited = HashSet::new();
    let mut current = rid;

    loop {
        hds_ensure!(
            visited.insert(current),
            HdsError::integrity(format!("parent chain of record {} loops", rid))
        );

        let parent = store.read_header(current)?.parent();
        if parent.is_null() {
            if current != top_rid {
                hds_bail!(HdsError::integrity(format!(
                    "record {} has no parent but the top-level record is {}",
                    current, top_rid
                )));
            }
            segments.push(format!("{}{}", top_name, suffix));
            break;
        }

        let parent_header = store.read_header(parent)?;
        if parent_header.is_structure_array() {
            let offset = store.cell_offset_of(parent, current)?;
            suffix = format_subs(&subs_of(&parent_header.descriptor.dims, offset));
        } else {
            let name = store.component_name_of(parent, current)?;
            segments.push(format!("{}{}", name, suffix));
            suffix.clear();
        }
        current = parent;
    }

    segments.reverse();
    Ok(TracedPath {
        levels: segments.len(),
        path: segments.join("."),
        file,
    })
}

fn truncate_chars(s: &str, cap: usize) -> String {
    match s.char_indices().nth(cap) {
        Some((at, _)) => s[..at].to_string(),
        None => s.to_string(),
    }
}

/// Fits a trace into caller-sized buffers of `path_cap` and `file_cap`
/// characters. If either overflows, fails with `Truncated` carrying the
/// truncated strings.
pub fn bound_trace(traced: TracedPath, path_cap: usize, file_cap: usize) -> Result<TracedPath> {
    let path_fits = traced.path.chars().count() <= path_cap;
    let file_fits = traced.file.chars().count() <= file_cap;
    if path_fits && file_fits {
        return Ok(traced);
    }

    hds_bail!(HdsError::Truncated(TracedPath {
        path: truncate_chars(&traced.path, path_cap),
        file: truncate_chars(&traced.file, file_cap),
        levels: traced.levels,
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{error_kind, hds_error, ErrorKind};

    fn traced() -> TracedPath {
        TracedPath {
            path: "DATA.SPECTRUM(2,3).LABEL".into(),
            file: "/tmp/obs.sdf".into(),
            levels: 3,
        }
    }

    #[test]
    fn trace_that_fits_is_unchanged() {
        assert_eq!(bound_trace(traced(), 64, 64).unwrap(), traced());
    }

    #[test]
    fn overflow_reports_truncated_strings() {
        let err = bound_trace(traced(), 8, 64).unwrap_err();

        assert_eq!(error_kind(&err), Some(ErrorKind::Truncated));
        match hds_error(&err) {
            Some(HdsError::Truncated(t)) => {
                assert_eq!(t.path, "DATA.SPE");
                assert_eq!(t.file, "/tmp/obs.sdf");
                assert_eq!(t.levels, 3);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("ÅBC", 1), "Å");
        assert_eq!(truncate_chars("AB", 5), "AB");
    }
}
