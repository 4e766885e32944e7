//! # Tuning Parameters
//!
//! Named integer settings of the engine, read with `gtune` and changed with
//! `tune`. Names are case-insensitive and only their first four characters
//! are significant, so `"maxw"`, `"MAXWPL"` and `"MaxWplXYZ"` all name the
//! same parameter.
//!
//! | Name      | Default | Minimum | Meaning                                      |
//! |-----------|---------|---------|----------------------------------------------|
//! | `INALQ`   | 2       | 1       | Initial data blocks of a new container file  |
//! | `MAXWPL`  | 32      | 8       | Block cache capacity                         |
//! | `NBLOCKS` | 8       | 1       | Minimum number of blocks added on extension  |
//! | `NCOMP`   | 6       | 1       | Initial component-table capacity             |
//! | `SYSLCK`  | 1       | 0       | Take advisory locks on container files       |
//! | `WAIT`    | 0       | 0       | Block on a conflicting lock instead of failing |
//!
//! Each default can be overridden by an `HDS_<NAME>` environment variable
//! (see `HdsBuilder::from_env`).

use std::fmt;

use eyre::{Result, WrapErr};

use crate::config::{DEFAULT_INALQ, DEFAULT_MAXWPL, DEFAULT_NBLOCKS, DEFAULT_NCOMP, MIN_MAXWPL};
use crate::error::{hds_bail, hds_ensure, HdsError};
use crate::storage::FileOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TuningParam {
    Inalq,
    Maxwpl,
    Nblocks,
    Ncomp,
    Syslck,
    Wait,
}

impl TuningParam {
    pub const ALL: [TuningParam; 6] = [
        TuningParam::Inalq,
        TuningParam::Maxwpl,
        TuningParam::Nblocks,
        TuningParam::Ncomp,
        TuningParam::Syslck,
        TuningParam::Wait,
    ];

    pub fn parse(name: &str) -> Result<Self> {
        let key: String = name.trim().chars().take(4).collect::<String>().to_ascii_uppercase();
        let param = match key.as_str() {
            "INAL" => TuningParam::Inalq,
            "MAXW" => TuningParam::Maxwpl,
            "NBLO" => TuningParam::Nblocks,
            "NCOM" => TuningParam::Ncomp,
            "SYSL" => TuningParam::Syslck,
            "WAIT" => TuningParam::Wait,
            _ => hds_bail!(HdsError::invalid(format!("unknown tuning parameter '{}'", name))),
        };
        Ok(param)
    }

    pub fn name(&self) -> &'static str {
        match self {
            TuningParam::Inalq => "INALQ",
            TuningParam::Maxwpl => "MAXWPL",
            TuningParam::Nblocks => "NBLOCKS",
            TuningParam::Ncomp => "NCOMP",
            TuningParam::Syslck => "SYSLCK",
            TuningParam::Wait => "WAIT",
        }
    }

    fn minimum(&self) -> i64 {
        match self {
            TuningParam::Maxwpl => MIN_MAXWPL as i64,
            TuningParam::Syslck | TuningParam::Wait => 0,
            _ => 1,
        }
    }

    fn env_var(&self) -> String {
        format!("HDS_{}", self.name())
    }
}

impl fmt::Display for TuningParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tuning {
    pub inalq: u32,
    pub maxwpl: usize,
    pub nblocks: u32,
    pub ncomp: u32,
    pub syslck: bool,
    pub wait: bool,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            inalq: DEFAULT_INALQ,
            maxwpl: DEFAULT_MAXWPL,
            nblocks: DEFAULT_NBLOCKS,
            ncomp: DEFAULT_NCOMP,
            syslck: true,
            wait: false,
        }
    }
}

impl Tuning {
    pub fn get(&self, param: TuningParam) -> i64 {
        match param {
            TuningParam::Inalq => self.inalq as i64,
            TuningParam::Maxwpl => self.maxwpl as i64,
            TuningParam::Nblocks => self.nblocks as i64,
            TuningParam::Ncomp => self.ncomp as i64,
            TuningParam::Syslck => self.syslck as i64,
            TuningParam::Wait => self.wait as i64,
        }
    }

    pub fn set(&mut self, param: TuningParam, value: i64) -> Result<()> {
        hds_ensure!(
            value >= param.minimum() && value <= u32::MAX as i64,
            HdsError::invalid(format!(
                "{} must be between {} and {}, got {}",
                param,
                param.minimum(),
                u32::MAX,
                value
            ))
        );

        match param {
            TuningParam::Inalq => self.inalq = value as u32,
            TuningParam::Maxwpl => self.maxwpl = value as usize,
            TuningParam::Nblocks => self.nblocks = value as u32,
            TuningParam::Ncomp => self.ncomp = value as u32,
            TuningParam::Syslck => self.syslck = value != 0,
            TuningParam::Wait => self.wait = value != 0,
        }
        Ok(())
    }

    /// Defaults overridden by the `HDS_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut tuning = Self::default();
        for param in TuningParam::ALL {
            let var = param.env_var();
            let Some(raw) = lookup(&var) else {
                continue;
            };
            let value: i64 = match raw.trim().parse() {
                Ok(v) => v,
                Err(_) => hds_bail!(HdsError::invalid(format!(
                    "{}='{}' is not an integer",
                    var, raw
                ))),
            };
            tuning
                .set(param, value)
                .wrap_err_with(|| format!("invalid value in {}", var))?;
        }
        Ok(tuning)
    }

    pub fn file_options(&self) -> FileOptions {
        FileOptions {
            inalq: self.inalq,
            syslck: self.syslck,
            wait: self.wait,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{error_kind, ErrorKind};

    #[test]
    fn names_match_on_first_four_characters() {
        assert_eq!(TuningParam::parse("maxwpl").unwrap(), TuningParam::Maxwpl);
        assert_eq!(TuningParam::parse("MAXW").unwrap(), TuningParam::Maxwpl);
        assert_eq!(TuningParam::parse("NcompXYZ").unwrap(), TuningParam::Ncomp);
        assert_eq!(TuningParam::parse("wait").unwrap(), TuningParam::Wait);
    }

    #[test]
    fn unknown_names_are_rejected() {
        for name in ["MAP", "SHELL", "MAX", ""] {
            let err = TuningParam::parse(name).unwrap_err();
            assert_eq!(error_kind(&err), Some(ErrorKind::InvalidArgument), "{}", name);
        }
    }

    #[test]
    fn values_below_minimum_are_rejected() {
        let mut tuning = Tuning::default();

        assert!(tuning.set(TuningParam::Maxwpl, 7).is_err());
        assert!(tuning.set(TuningParam::Inalq, 0).is_err());
        assert_eq!(tuning, Tuning::default());

        tuning.set(TuningParam::Maxwpl, 8).unwrap();
        assert_eq!(tuning.get(TuningParam::Maxwpl), 8);
    }

    #[test]
    fn flags_read_back_as_zero_or_one() {
        let mut tuning = Tuning::default();
        tuning.set(TuningParam::Wait, 5).unwrap();

        assert_eq!(tuning.get(TuningParam::Wait), 1);
        assert_eq!(tuning.get(TuningParam::Syslck), 1);
    }

    #[test]
    fn environment_overrides_defaults() {
        let tuning = Tuning::from_lookup(|var| match var {
            "HDS_NCOMP" => Some("20".into()),
            "HDS_SYSLCK" => Some(" 0 ".into()),
            _ => None,
        })
        .unwrap();

        assert_eq!(tuning.ncomp, 20);
        assert!(!tuning.syslck);
        assert_eq!(tuning.inalq, DEFAULT_INALQ);
    }

    #[test]
    fn malformed_environment_value_fails() {
        let err = Tuning::from_lookup(|var| (var == "HDS_MAXWPL").then(|| "lots".to_string()))
            .unwrap_err();

        assert_eq!(error_kind(&err), Some(ErrorKind::InvalidArgument));
    }
}
