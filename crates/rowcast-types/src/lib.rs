//! Core data types shared across the rowcast workspace.
//!
//! Defines the dynamically-typed [`Value`] carried between cursors and
//! records, the [`TypeTag`] describing a record field's declared type, and
//! the [`Column`] metadata reported by a cursor for one query execution.

mod value;

pub use value::Value;

use serde::{Deserialize, Serialize};

/// Declared type of a record field.
///
/// Coercion canonicalizes raw column values toward one of these tags before
/// the field writer runs. `Any` accepts the raw value unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    /// 8-bit signed integer.
    Int8,
    /// 16-bit signed integer.
    Int16,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 32-bit float.
    Float32,
    /// 64-bit float.
    Float64,
    /// Boolean (stored as an integer, nonzero = true).
    Bool,
    /// UTF-8 text.
    Text,
    /// Raw bytes.
    Blob,
    /// Untyped: the raw [`Value`] is passed through unchanged.
    Any,
}

impl TypeTag {
    /// Whether this tag names one of the integer kinds (including `Bool`).
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64 | Self::Bool
        )
    }

    /// Whether this tag names one of the float kinds.
    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// Short lowercase name, used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Bool => "bool",
            Self::Text => "text",
            Self::Blob => "blob",
            Self::Any => "any",
        }
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Metadata for one result-set column within a single query execution.
///
/// `index` is 1-based, matching cursor addressing. `label` is the name the
/// query assigned to the column (alias or projection label); a data source
/// that cannot distinguish labels from names reports `label` equal to
/// `name`. A column whose label is absent is never matched to a record
/// field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// 1-based position within the result set.
    pub index: usize,
    /// Underlying column name.
    pub name: String,
    /// Reported label, if any.
    pub label: Option<String>,
}

impl Column {
    /// Construct a column whose label equals its name.
    #[must_use]
    pub fn new(index: usize, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            index,
            label: Some(name.clone()),
            name,
        }
    }

    /// Construct a column with an explicitly absent label.
    #[must_use]
    pub fn unlabeled(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            label: None,
        }
    }
}
