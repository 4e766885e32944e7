//! # Error Taxonomy
//!
//! Every public operation returns `eyre::Result<T>`. The root cause of a
//! failure raised by the engine is an [`HdsError`]; the layers above it attach
//! human-readable context (file name, object path, record id) with
//! `WrapErr::wrap_err_with`, so a rendered report reads outermost-first:
//!
//! ```text
//! failed to find component 'Z' in DATA.S
//!
//! Caused by:
//!     object 'Z' not found
//! ```
//!
//! Callers that need to branch on the failure class use [`error_kind`], which
//! walks the report chain and returns the [`ErrorKind`] of the first
//! `HdsError` it finds. Errors that did not originate in the engine (for
//! example a bare `std::io::Error` wrapped by `eyre`) classify as
//! [`ErrorKind::Io`] when they are I/O errors and `None` otherwise.

use std::path::PathBuf;

use crate::trace::TracedPath;

/// Failure classes signalled by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// File open/read/write failure.
    Io,
    /// Unrecognized format stamp or version.
    Format,
    /// Allocation failed even after extending the file.
    OutOfSpace,
    /// Use of an annulled, stale or foreign locator.
    InvalidHandle,
    /// Name or cell lookup failure.
    NotFound,
    /// Mutation through a read-only locator.
    AccessDenied,
    /// Structural inconsistency in the container file.
    Integrity,
    /// A traced path or file name did not fit the caller's buffer.
    Truncated,
    /// Bad name, type, shape, subscript or tuning parameter.
    InvalidArgument,
}

#[derive(Debug, thiserror::Error)]
pub enum HdsError {
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{}' is not a usable container file: {reason}", path.display())]
    Format { path: PathBuf, reason: String },

    #[error("out of space: {0}")]
    OutOfSpace(String),

    #[error("invalid locator (annulled, stale or never issued)")]
    InvalidHandle,

    #[error("object '{0}' not found")]
    NotFound(String),

    #[error("write access denied: {0}")]
    AccessDenied(String),

    #[error("container file integrity error: {0}")]
    Integrity(String),

    #[error("traced path truncated to '{}' in '{}'", .0.path, .0.file)]
    Truncated(TracedPath),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl HdsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HdsError::Io { .. } => ErrorKind::Io,
            HdsError::Format { .. } => ErrorKind::Format,
            HdsError::OutOfSpace(_) => ErrorKind::OutOfSpace,
            HdsError::InvalidHandle => ErrorKind::InvalidHandle,
            HdsError::NotFound(_) => ErrorKind::NotFound,
            HdsError::AccessDenied(_) => ErrorKind::AccessDenied,
            HdsError::Integrity(_) => ErrorKind::Integrity,
            HdsError::Truncated(_) => ErrorKind::Truncated,
            HdsError::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HdsError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        HdsError::Format {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn integrity(reason: impl Into<String>) -> Self {
        HdsError::Integrity(reason.into())
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        HdsError::InvalidArgument(reason.into())
    }
}

/// Returns the failure class of a report produced by this crate.
pub fn error_kind(report: &eyre::Report) -> Option<ErrorKind> {
    for cause in report.chain() {
        if let Some(err) = cause.downcast_ref::<HdsError>() {
            return Some(err.kind());
        }
        if cause.downcast_ref::<std::io::Error>().is_some() {
            return Some(ErrorKind::Io);
        }
    }
    None
}

/// Returns the root `HdsError` of a report, if any.
pub fn hds_error(report: &eyre::Report) -> Option<&HdsError> {
    report
        .chain()
        .find_map(|cause| cause.downcast_ref::<HdsError>())
}

/// Builds a report whose root cause is the given error.
macro_rules! hds_bail {
    ($err:expr) => {
        return Err(::eyre::Report::new($err))
    };
}

pub(crate) use hds_bail;

/// Like `eyre::ensure!`, but the root cause is an `HdsError`.
macro_rules! hds_ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err(::eyre::Report::new($err));
        }
    };
}

pub(crate) use hds_ensure;

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;

    fn not_found() -> eyre::Result<()> {
        hds_bail!(HdsError::NotFound("X".into()))
    }

    #[test]
    fn error_kind_sees_through_context() {
        let err = not_found()
            .wrap_err("failed to find component 'X'")
            .wrap_err("while tracing DATA.S")
            .unwrap_err();

        assert_eq!(error_kind(&err), Some(ErrorKind::NotFound));
        assert!(err.to_string().contains("while tracing"));
    }

    #[test]
    fn error_kind_classifies_bare_io_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = eyre::Report::new(io).wrap_err("read failed");

        assert_eq!(error_kind(&err), Some(ErrorKind::Io));
    }

    #[test]
    fn error_kind_is_none_for_foreign_errors() {
        let err = eyre::eyre!("something else");

        assert_eq!(error_kind(&err), None);
    }

    #[test]
    fn hds_ensure_only_fails_on_false() {
        fn check(ok: bool) -> eyre::Result<()> {
            hds_ensure!(ok, HdsError::AccessDenied("read-only".into()));
            Ok(())
        }

        assert!(check(true).is_ok());
        let err = check(false).unwrap_err();
        assert_eq!(error_kind(&err), Some(ErrorKind::AccessDenied));
    }

    #[test]
    fn io_error_display_names_the_file() {
        let err = HdsError::io(
            "/tmp/x.sdf",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );

        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("/tmp/x.sdf"));
    }
}
