//! Error types for rowcast operations.
//!
//! One public enum with structured variants for the failure modes of the
//! execution/mapping pipeline, classified into four coarse kinds
//! (acquisition, bind, execution, conversion). Resource-release guarantees
//! are the runner's job: by the time one of these errors reaches a caller,
//! every cursor, statement, and owned connection of the failed call has
//! already been closed.

use thiserror::Error;

/// Convenience result alias used across the workspace.
pub type Result<T, E = RowcastError> = std::result::Result<T, E>;

/// Primary error type for rowcast operations.
#[derive(Error, Debug)]
pub enum RowcastError {
    // === Acquisition ===
    /// No connection could be obtained from the data source.
    #[error("cannot acquire connection: {detail}")]
    Acquisition { detail: String },

    /// The runner has no owned data source; only the borrowed-connection
    /// entry points are available.
    #[error("runner has no data source; use a *_with entry point")]
    NoDataSource,

    // === Bind ===
    /// SQL text was empty.
    #[error("empty SQL text")]
    EmptySql,

    /// Supplied parameter count does not match the statement's declared
    /// parameter count.
    #[error("parameter count mismatch: statement declares {expected}, got {actual}")]
    ParameterMismatch { expected: usize, actual: usize },

    /// One row of a batch parameter table has the wrong arity.
    #[error("batch row {row} has {actual} parameters, expected {expected}")]
    BatchArity {
        row: usize,
        expected: usize,
        actual: usize,
    },

    // === Execution ===
    /// The underlying execute failed.
    #[error("execution failed: {detail}")]
    Execution { detail: String },

    /// A column was addressed by a name the result set does not contain.
    #[error("no such column: {name}")]
    NoSuchColumn { name: String },

    /// A column was addressed by an index outside the result set.
    #[error("column index {index} out of range ({count} columns)")]
    ColumnIndexOutOfRange { index: usize, count: usize },

    /// The cursor was used after being closed.
    #[error("cursor is closed")]
    CursorClosed,

    /// A column was read with no current row positioned.
    #[error("no current row")]
    NoCurrentRow,

    /// A statement or connection was used after being closed.
    #[error("{what} is closed")]
    ResourceClosed { what: &'static str },

    /// An async task was cancelled before the worker started it.
    #[error("task cancelled before execution")]
    TaskCancelled,

    /// The worker pool shut down before delivering a result.
    #[error("worker pool shut down")]
    PoolShutdown,

    // === Conversion ===
    /// A value could not be coerced into the requested target type and no
    /// safe default exists (scalar/column extraction only; record-field
    /// coercion degrades to the field's default instead).
    #[error("cannot convert {value_type} value to {target}")]
    Conversion {
        value_type: &'static str,
        target: &'static str,
    },
}

/// Coarse classification of an error, mirroring the four-part taxonomy of
/// the execution pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No connection obtainable.
    Acquisition,
    /// Parameter arity or SQL-text problems caught before execution.
    Bind,
    /// The underlying operation failed.
    Execution,
    /// A value had no valid coercion and no safe default.
    Conversion,
}

impl RowcastError {
    /// Shorthand for an [`RowcastError::Acquisition`] error.
    pub fn acquisition(detail: impl Into<String>) -> Self {
        Self::Acquisition {
            detail: detail.into(),
        }
    }

    /// Shorthand for an [`RowcastError::Execution`] error.
    pub fn execution(detail: impl Into<String>) -> Self {
        Self::Execution {
            detail: detail.into(),
        }
    }

    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Acquisition { .. } | Self::NoDataSource => ErrorKind::Acquisition,
            Self::EmptySql | Self::ParameterMismatch { .. } | Self::BatchArity { .. } => {
                ErrorKind::Bind
            }
            Self::Execution { .. }
            | Self::NoSuchColumn { .. }
            | Self::ColumnIndexOutOfRange { .. }
            | Self::CursorClosed
            | Self::NoCurrentRow
            | Self::ResourceClosed { .. }
            | Self::TaskCancelled
            | Self::PoolShutdown => ErrorKind::Execution,
            Self::Conversion { .. } => ErrorKind::Conversion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(
            RowcastError::acquisition("pool empty").kind(),
            ErrorKind::Acquisition
        );
        assert_eq!(RowcastError::EmptySql.kind(), ErrorKind::Bind);
        assert_eq!(
            RowcastError::ParameterMismatch {
                expected: 2,
                actual: 1
            }
            .kind(),
            ErrorKind::Bind
        );
        assert_eq!(
            RowcastError::execution("boom").kind(),
            ErrorKind::Execution
        );
        assert_eq!(
            RowcastError::Conversion {
                value_type: "blob",
                target: "int64"
            }
            .kind(),
            ErrorKind::Conversion
        );
    }

    #[test]
    fn messages() {
        assert_eq!(
            RowcastError::ParameterMismatch {
                expected: 2,
                actual: 1
            }
            .to_string(),
            "parameter count mismatch: statement declares 2, got 1"
        );
        assert_eq!(
            RowcastError::BatchArity {
                row: 1,
                expected: 2,
                actual: 1
            }
            .to_string(),
            "batch row 1 has 1 parameters, expected 2"
        );
        assert_eq!(RowcastError::EmptySql.to_string(), "empty SQL text");
    }
}
