//! Per-row conversion: raw arrays, record instances, and row mappings.
//!
//! The converter reads the cursor's current row only; advancing is the
//! collector's job. Record mode walks the match table and routes each
//! matched column through the coercion chain into its field writer.
//! Unmatched columns are skipped entirely: the cursor contract gives
//! side-effect-free random access within the current row, so there is
//! nothing to preserve by reading them.

use std::sync::Arc;

use rowcast_error::Result;
use rowcast_types::{Column, TypeTag, Value};

use crate::coerce::CoercionChain;
use crate::matcher::{match_columns, MatchTable};
use crate::record::Record;
use crate::source::Cursor;

/// Which column keyed aggregates extract their key from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyColumn {
    /// 1-based column index.
    Index(usize),
    /// Column name, resolved case-insensitively by the cursor.
    Name(String),
}

impl Default for KeyColumn {
    /// The first column.
    fn default() -> Self {
        Self::Index(1)
    }
}

/// A post-processing step applied to values in array and mapping modes.
pub trait ValueTransform: Send + Sync {
    /// Transform one column value.
    fn apply(&self, column: &Column, value: Value) -> Value;
}

/// Trims leading and trailing whitespace from text values. Useful for
/// backends that pad CHAR columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrimText;

impl ValueTransform for TrimText {
    fn apply(&self, _column: &Column, value: Value) -> Value {
        match value {
            Value::Text(s) => Value::Text(s.trim().to_owned()),
            other => other,
        }
    }
}

/// Replaces NULL values with a configured substitute.
#[derive(Debug, Clone)]
pub struct NullSubstitute {
    replacement: Value,
}

impl NullSubstitute {
    /// Substitute `replacement` for every NULL value.
    #[must_use]
    pub fn new(replacement: Value) -> Self {
        Self { replacement }
    }
}

impl ValueTransform for NullSubstitute {
    fn apply(&self, _column: &Column, value: Value) -> Value {
        if value.is_null() {
            self.replacement.clone()
        } else {
            value
        }
    }
}

/// A label-keyed row mapping with case-insensitive lookup, preserving
/// column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowMap {
    entries: Vec<(String, Value)>,
}

impl RowMap {
    /// Value stored under `key`, compared case-insensitively.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the row had no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(label, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Converts the cursor's current row into a caller-selected shape.
#[derive(Clone)]
pub struct RowConverter {
    coercion: CoercionChain,
    transforms: Vec<Arc<dyn ValueTransform>>,
}

impl std::fmt::Debug for RowConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowConverter")
            .field("coercion", &self.coercion)
            .field("transforms", &self.transforms.len())
            .finish()
    }
}

impl RowConverter {
    /// Converter with default coercion and no transforms.
    #[must_use]
    pub fn new() -> Self {
        Self {
            coercion: CoercionChain::new(),
            transforms: Vec::new(),
        }
    }

    /// Replace the coercion chain.
    #[must_use]
    pub fn with_coercion(mut self, coercion: CoercionChain) -> Self {
        self.coercion = coercion;
        self
    }

    /// Append a post-processing transform (array and mapping modes only).
    #[must_use]
    pub fn with_transform(mut self, transform: Arc<dyn ValueTransform>) -> Self {
        self.transforms.push(transform);
        self
    }

    /// The coercion chain in use.
    #[must_use]
    pub fn coercion(&self) -> &CoercionChain {
        &self.coercion
    }

    /// Build the match table for a record shape against `columns`.
    ///
    /// Computed once per execution by the collectors and reused for every
    /// row of that execution.
    #[must_use]
    pub fn match_table<R: Record>(&self, columns: &[Column]) -> MatchTable {
        match_columns(columns, R::fields().iter().map(|f| f.name))
    }

    /// Current row as one value per column, in column order, after the
    /// transform chain.
    pub fn to_array(&self, cursor: &dyn Cursor, columns: &[Column]) -> Result<Vec<Value>> {
        let mut row = Vec::with_capacity(columns.len());
        for column in columns {
            let value = cursor.column(column.index)?;
            row.push(self.post_process(column, value));
        }
        Ok(row)
    }

    /// Current row as a label-keyed mapping. Columns with no label fall
    /// back to their underlying name as the key.
    pub fn to_map(&self, cursor: &dyn Cursor, columns: &[Column]) -> Result<RowMap> {
        let mut entries = Vec::with_capacity(columns.len());
        for column in columns {
            let key = column.label.clone().unwrap_or_else(|| column.name.clone());
            let value = cursor.column(column.index)?;
            entries.push((key, self.post_process(column, value)));
        }
        Ok(RowMap { entries })
    }

    /// Current row as a record instance, per the match table.
    ///
    /// Fields with no matching column keep their defaults; coerced NULLs
    /// skip the write for the same reason.
    pub fn to_record<R: Record>(&self, cursor: &dyn Cursor, table: &MatchTable) -> Result<R> {
        let fields = R::fields();
        let mut record = R::default();
        for (column_index, field_position) in table.assignments() {
            let Some(field) = fields.get(field_position) else {
                continue;
            };
            let raw = cursor.column(column_index)?;
            let coerced = self.coercion.convert(field.ty, raw);
            if coerced.is_null() {
                continue;
            }
            (field.write)(&mut record, coerced);
        }
        Ok(record)
    }

    /// Current row's single configured column, coerced toward `target`
    /// with no fallback (scalar extraction).
    pub fn scalar(
        &self,
        cursor: &dyn Cursor,
        key: &KeyColumn,
        target: TypeTag,
    ) -> Result<Value> {
        let raw = self.key_value(cursor, key)?;
        self.coercion.convert_checked(target, raw)
    }

    /// Raw key extraction for keyed aggregates.
    pub fn key_value(&self, cursor: &dyn Cursor, key: &KeyColumn) -> Result<Value> {
        match key {
            KeyColumn::Index(index) => cursor.column(*index),
            KeyColumn::Name(name) => cursor.column_by_name(name),
        }
    }

    fn post_process(&self, column: &Column, mut value: Value) -> Value {
        for transform in &self.transforms {
            value = transform.apply(column, value);
        }
        value
    }
}

impl Default for RowConverter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_text_transform() {
        let col = Column::new(1, "c");
        assert_eq!(
            TrimText.apply(&col, Value::Text("  padded  ".into())),
            Value::Text("padded".into())
        );
        assert_eq!(TrimText.apply(&col, Value::Integer(3)), Value::Integer(3));
    }

    #[test]
    fn null_substitute_transform() {
        let col = Column::new(1, "c");
        let sub = NullSubstitute::new(Value::Text(String::new()));
        assert_eq!(sub.apply(&col, Value::Null), Value::Text(String::new()));
        assert_eq!(sub.apply(&col, Value::Integer(1)), Value::Integer(1));
    }

    #[test]
    fn row_map_lookup_is_case_insensitive() {
        let map = RowMap {
            entries: vec![("First_Name".into(), Value::Text("ada".into()))],
        };
        assert_eq!(map.get("first_name"), Some(&Value::Text("ada".into())));
        assert_eq!(map.get("FIRST_NAME"), Some(&Value::Text("ada".into())));
        assert_eq!(map.get("missing"), None);
        assert_eq!(map.len(), 1);
    }
}
