//! # Engine Builder
//!
//! `HdsBuilder` configures the tuning parameters before the engine (and its
//! block cache) is created.
//!
//! ```ignore
//! let hds = Hds::builder()
//!     .maxwpl(64)
//!     .nblocks(16)
//!     .syslck(false)
//!     .build()?;
//! ```
//!
//! `HdsBuilder::from_env()` starts from the `HDS_*` environment variables
//! instead of the built-in defaults; explicit setter calls still win.

use eyre::Result;

use super::tuning::{Tuning, TuningParam};
use super::Hds;

#[derive(Debug, Clone, Default)]
pub struct HdsBuilder {
    base: Tuning,
    overrides: Vec<(TuningParam, i64)>,
}

impl HdsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from the environment defaults.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            base: Tuning::from_env()?,
            overrides: Vec::new(),
        })
    }

    fn with(mut self, param: TuningParam, value: i64) -> Self {
        self.overrides.push((param, value));
        self
    }

    /// Initial number of data blocks in a new container file.
    pub fn inalq(self, blocks: u32) -> Self {
        self.with(TuningParam::Inalq, blocks as i64)
    }

    /// Block cache capacity in blocks.
    pub fn maxwpl(self, blocks: usize) -> Self {
        self.with(TuningParam::Maxwpl, blocks as i64)
    }

    pub fn nblocks(self, blocks: u32) -> Self {
        self.with(TuningParam::Nblocks, blocks as i64)
    }

    pub fn ncomp(self, entries: u32) -> Self {
        self.with(TuningParam::Ncomp, entries as i64)
    }

    pub fn syslck(self, enabled: bool) -> Self {
        self.with(TuningParam::Syslck, enabled as i64)
    }

    pub fn wait(self, enabled: bool) -> Self {
        self.with(TuningParam::Wait, enabled as i64)
    }

    /// Validates the settings and creates the engine.
    pub fn build(self) -> Result<Hds> {
        let mut tuning = self.base;
        for (param, value) in self.overrides {
            tuning.set(param, value)?;
        }
        Hds::with_tuning(tuning)
    }
}
