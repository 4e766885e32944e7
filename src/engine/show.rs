//! Diagnostic listings of the engine's open files and live locators.

use std::fmt;

use eyre::{Result, WrapErr};

use super::Hds;
use crate::locator::Locator;
use crate::trace::trace_path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    pub path: String,
    pub refcount: u32,
    pub writable: bool,
    pub eof: u32,
    pub free_blocks: u64,
    pub lost_blocks: u64,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} refcnt={} mode={} eof={} free={} lost={}",
            self.path,
            self.refcount,
            if self.writable { "UPDATE" } else { "READ" },
            self.eof,
            self.free_blocks,
            self.lost_blocks
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorStatus {
    pub locator: Locator,
    pub path: String,
    pub file: String,
    pub primary: bool,
    pub writable: bool,
}

impl fmt::Display for LocatorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} [{}]",
            self.locator,
            if self.primary { "P" } else { "S" },
            self.path,
            self.file
        )?;
        if !self.writable {
            f.write_str(" (read-only)")?;
        }
        Ok(())
    }
}

impl Hds {
    /// One entry per open container file.
    pub fn show_files(&self) -> Vec<FileStatus> {
        let state = self.state.lock();
        state
            .files
            .iter()
            .map(|(_, file)| FileStatus {
                path: file.path().display().to_string(),
                refcount: file.refcount(),
                writable: file.is_writable(),
                eof: file.eof(),
                free_blocks: file.space().free_blocks(),
                lost_blocks: file.space().lost_blocks(),
            })
            .collect()
    }

    /// Blocks in use by the objects of the locator's file: chip blocks and
    /// extended frames reachable from the top-level object. Together with
    /// the free and lost blocks and the two header blocks this accounts for
    /// every block up to end of file.
    pub fn used_blocks(&self, loc: Locator) -> Result<u64> {
        let mut state = self.state.lock();
        let data = state.locator(loc)?;
        let mut store = state.store(data.file)?;
        let top = store.container().file()?.top_rid();
        store
            .used_blocks(top)
            .wrap_err_with(|| format!("failed to walk the objects of locator {}", loc))
    }

    /// One entry per valid locator, with its traced path.
    pub fn show_locators(&self) -> Result<Vec<LocatorStatus>> {
        let mut state = self.state.lock();
        let live: Vec<_> = state
            .locators
            .iter()
            .map(|(loc, data)| (loc, data.clone()))
            .collect();

        let mut out = Vec::with_capacity(live.len());
        for (loc, data) in live {
            let mut store = state.store(data.file)?;
            let traced = trace_path(&mut store, data.rid, &data.subscript)
                .wrap_err_with(|| format!("failed to trace locator {}", loc))?;
            out.push(LocatorStatus {
                locator: loc,
                path: traced.path,
                file: traced.file,
                primary: data.primary,
                writable: data.is_writable(),
            });
        }
        Ok(out)
    }
}
