//! # hdsdb Configuration Module
//!
//! This module centralizes the compile-time constants of the container
//! format and the defaults of the runtime tuning parameters. Constants are
//! grouped by functional area and their interdependencies are enforced
//! through compile-time assertions.
//!
//! Runtime configuration (the tuning parameters `INALQ`, `MAXWPL`, `NBLOCKS`,
//! `NCOMP`, `SYSLCK`, `WAIT`) lives in [`crate::engine::Tuning`].
//!
//! ## Module Organization
//!
//! - [`constants`]: All numeric configuration values with dependency documentation

pub mod constants;
pub use constants::*;
