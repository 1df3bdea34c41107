//! Result collectors: drive the cursor once and fold rows into an
//! aggregate shape.
//!
//! Each collector reads metadata once, builds any match table once, then
//! loops `advance -> convert -> fold`. First-row collectors advance exactly
//! once and never look further. Zero-row result sets produce empty or
//! absent aggregates, never an error.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::marker::PhantomData;

use rowcast_error::{Result, RowcastError};
use rowcast_types::Value;
use tracing::debug;

use crate::convert::{KeyColumn, RowConverter, RowMap};
use crate::record::{FromValue, Record};
use crate::source::Cursor;

/// Folds all rows of one cursor into an aggregate.
///
/// Implementations must consume the cursor at most once and must not close
/// it; the execution wrapper owns the release sequence.
pub trait CursorHandler {
    /// The aggregate shape produced.
    type Output;

    /// Drive the cursor and build the aggregate.
    fn handle(&self, cursor: &mut dyn Cursor) -> Result<Self::Output>;
}

/// Map key wrapper giving [`Value`] a total order so keyed aggregates can
/// use `BTreeMap`. Keys are not required to be unique; insertion handles
/// collisions per collector.
#[derive(Debug, Clone, PartialEq)]
pub struct RowKey(pub Value);

impl Eq for RowKey {}

impl PartialOrd for RowKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RowKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl From<Value> for RowKey {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// All rows as records, in cursor order.
pub struct RecordList<R> {
    converter: RowConverter,
    _marker: PhantomData<fn() -> R>,
}

impl<R: Record> RecordList<R> {
    /// Collector with a default converter.
    #[must_use]
    pub fn new() -> Self {
        Self::with_converter(RowConverter::new())
    }

    /// Collector with a custom converter.
    #[must_use]
    pub fn with_converter(converter: RowConverter) -> Self {
        Self {
            converter,
            _marker: PhantomData,
        }
    }
}

impl<R: Record> Default for RecordList<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> CursorHandler for RecordList<R> {
    type Output = Vec<R>;

    fn handle(&self, cursor: &mut dyn Cursor) -> Result<Vec<R>> {
        let columns = cursor.metadata()?;
        let table = self.converter.match_table::<R>(&columns);
        let mut rows = Vec::new();
        while cursor.advance()? {
            rows.push(self.converter.to_record(cursor, &table)?);
        }
        debug!(rows = rows.len(), "collected record list");
        Ok(rows)
    }
}

/// The first row as a record, or `None` for an empty result set.
pub struct FirstRecord<R> {
    converter: RowConverter,
    _marker: PhantomData<fn() -> R>,
}

impl<R: Record> FirstRecord<R> {
    /// Collector with a default converter.
    #[must_use]
    pub fn new() -> Self {
        Self::with_converter(RowConverter::new())
    }

    /// Collector with a custom converter.
    #[must_use]
    pub fn with_converter(converter: RowConverter) -> Self {
        Self {
            converter,
            _marker: PhantomData,
        }
    }
}

impl<R: Record> Default for FirstRecord<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> CursorHandler for FirstRecord<R> {
    type Output = Option<R>;

    fn handle(&self, cursor: &mut dyn Cursor) -> Result<Option<R>> {
        if !cursor.advance()? {
            return Ok(None);
        }
        let columns = cursor.metadata()?;
        let table = self.converter.match_table::<R>(&columns);
        Ok(Some(self.converter.to_record(cursor, &table)?))
    }
}

/// Records keyed by a configured column; a duplicate key overwrites the
/// previously stored record.
pub struct RecordMap<R> {
    converter: RowConverter,
    key: KeyColumn,
    _marker: PhantomData<fn() -> R>,
}

impl<R: Record> RecordMap<R> {
    /// Key by the first column.
    #[must_use]
    pub fn new() -> Self {
        Self::keyed(KeyColumn::default())
    }

    /// Key by `key`.
    #[must_use]
    pub fn keyed(key: KeyColumn) -> Self {
        Self {
            converter: RowConverter::new(),
            key,
            _marker: PhantomData,
        }
    }

    /// Replace the converter.
    #[must_use]
    pub fn with_converter(mut self, converter: RowConverter) -> Self {
        self.converter = converter;
        self
    }
}

impl<R: Record> Default for RecordMap<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> CursorHandler for RecordMap<R> {
    type Output = BTreeMap<RowKey, R>;

    fn handle(&self, cursor: &mut dyn Cursor) -> Result<BTreeMap<RowKey, R>> {
        let columns = cursor.metadata()?;
        let table = self.converter.match_table::<R>(&columns);
        let mut map = BTreeMap::new();
        while cursor.advance()? {
            let key = self.converter.key_value(cursor, &self.key)?;
            let record = self.converter.to_record(cursor, &table)?;
            map.insert(RowKey(key), record);
        }
        Ok(map)
    }
}

/// Records grouped by a configured key column, preserving intra-group row
/// order.
pub struct GroupedRecords<R> {
    converter: RowConverter,
    key: KeyColumn,
    _marker: PhantomData<fn() -> R>,
}

impl<R: Record> GroupedRecords<R> {
    /// Group by the first column.
    #[must_use]
    pub fn new() -> Self {
        Self::keyed(KeyColumn::default())
    }

    /// Group by `key`.
    #[must_use]
    pub fn keyed(key: KeyColumn) -> Self {
        Self {
            converter: RowConverter::new(),
            key,
            _marker: PhantomData,
        }
    }

    /// Replace the converter.
    #[must_use]
    pub fn with_converter(mut self, converter: RowConverter) -> Self {
        self.converter = converter;
        self
    }
}

impl<R: Record> Default for GroupedRecords<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> CursorHandler for GroupedRecords<R> {
    type Output = BTreeMap<RowKey, Vec<R>>;

    fn handle(&self, cursor: &mut dyn Cursor) -> Result<BTreeMap<RowKey, Vec<R>>> {
        let columns = cursor.metadata()?;
        let table = self.converter.match_table::<R>(&columns);
        let mut map: BTreeMap<RowKey, Vec<R>> = BTreeMap::new();
        while cursor.advance()? {
            let key = self.converter.key_value(cursor, &self.key)?;
            let record = self.converter.to_record(cursor, &table)?;
            map.entry(RowKey(key)).or_default().push(record);
        }
        Ok(map)
    }
}

/// All rows as raw value arrays, in cursor order.
#[derive(Default)]
pub struct ArrayList {
    converter: RowConverter,
}

impl ArrayList {
    /// Collector with a default converter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collector with a custom converter (transform chain applies).
    #[must_use]
    pub fn with_converter(converter: RowConverter) -> Self {
        Self { converter }
    }
}

impl CursorHandler for ArrayList {
    type Output = Vec<Vec<Value>>;

    fn handle(&self, cursor: &mut dyn Cursor) -> Result<Vec<Vec<Value>>> {
        let columns = cursor.metadata()?;
        let mut rows = Vec::new();
        while cursor.advance()? {
            rows.push(self.converter.to_array(cursor, &columns)?);
        }
        Ok(rows)
    }
}

/// The first row as a raw value array, or `None`.
#[derive(Default)]
pub struct FirstArray {
    converter: RowConverter,
}

impl FirstArray {
    /// Collector with a default converter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collector with a custom converter.
    #[must_use]
    pub fn with_converter(converter: RowConverter) -> Self {
        Self { converter }
    }
}

impl CursorHandler for FirstArray {
    type Output = Option<Vec<Value>>;

    fn handle(&self, cursor: &mut dyn Cursor) -> Result<Option<Vec<Value>>> {
        if !cursor.advance()? {
            return Ok(None);
        }
        let columns = cursor.metadata()?;
        Ok(Some(self.converter.to_array(cursor, &columns)?))
    }
}

/// All rows as label-keyed mappings, in cursor order.
#[derive(Default)]
pub struct MapList {
    converter: RowConverter,
}

impl MapList {
    /// Collector with a default converter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collector with a custom converter.
    #[must_use]
    pub fn with_converter(converter: RowConverter) -> Self {
        Self { converter }
    }
}

impl CursorHandler for MapList {
    type Output = Vec<RowMap>;

    fn handle(&self, cursor: &mut dyn Cursor) -> Result<Vec<RowMap>> {
        let columns = cursor.metadata()?;
        let mut rows = Vec::new();
        while cursor.advance()? {
            rows.push(self.converter.to_map(cursor, &columns)?);
        }
        Ok(rows)
    }
}

/// The first row as a label-keyed mapping, or `None`.
#[derive(Default)]
pub struct FirstMap {
    converter: RowConverter,
}

impl FirstMap {
    /// Collector with a default converter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collector with a custom converter.
    #[must_use]
    pub fn with_converter(converter: RowConverter) -> Self {
        Self { converter }
    }
}

impl CursorHandler for FirstMap {
    type Output = Option<RowMap>;

    fn handle(&self, cursor: &mut dyn Cursor) -> Result<Option<RowMap>> {
        if !cursor.advance()? {
            return Ok(None);
        }
        let columns = cursor.metadata()?;
        Ok(Some(self.converter.to_map(cursor, &columns)?))
    }
}

/// Row mappings keyed by a configured column; duplicate keys overwrite.
pub struct KeyedMaps {
    converter: RowConverter,
    key: KeyColumn,
}

impl KeyedMaps {
    /// Key by the first column.
    #[must_use]
    pub fn new() -> Self {
        Self::keyed(KeyColumn::default())
    }

    /// Key by `key`.
    #[must_use]
    pub fn keyed(key: KeyColumn) -> Self {
        Self {
            converter: RowConverter::new(),
            key,
        }
    }
}

impl Default for KeyedMaps {
    fn default() -> Self {
        Self::new()
    }
}

impl CursorHandler for KeyedMaps {
    type Output = BTreeMap<RowKey, RowMap>;

    fn handle(&self, cursor: &mut dyn Cursor) -> Result<BTreeMap<RowKey, RowMap>> {
        let columns = cursor.metadata()?;
        let mut map = BTreeMap::new();
        while cursor.advance()? {
            let key = self.converter.key_value(cursor, &self.key)?;
            let row = self.converter.to_map(cursor, &columns)?;
            map.insert(RowKey(key), row);
        }
        Ok(map)
    }
}

/// One column across all rows, narrowed to `T`, in cursor order.
pub struct ColumnList<T> {
    converter: RowConverter,
    column: KeyColumn,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FromValue> ColumnList<T> {
    /// Extract the first column.
    #[must_use]
    pub fn new() -> Self {
        Self::at(KeyColumn::default())
    }

    /// Extract `column`.
    #[must_use]
    pub fn at(column: KeyColumn) -> Self {
        Self {
            converter: RowConverter::new(),
            column,
            _marker: PhantomData,
        }
    }
}

impl<T: FromValue> Default for ColumnList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FromValue> CursorHandler for ColumnList<T> {
    type Output = Vec<T>;

    fn handle(&self, cursor: &mut dyn Cursor) -> Result<Vec<T>> {
        let mut out = Vec::new();
        while cursor.advance()? {
            let value = self
                .converter
                .scalar(cursor, &self.column, T::TAG)?;
            let value_type = value.type_name();
            match T::from_value(value) {
                Some(v) => out.push(v),
                None => {
                    return Err(RowcastError::Conversion {
                        value_type,
                        target: T::TAG.name(),
                    })
                }
            }
        }
        Ok(out)
    }
}

/// The first row's configured column, narrowed to `T`, or `None` for an
/// empty result set.
pub struct ScalarValue<T> {
    converter: RowConverter,
    column: KeyColumn,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FromValue> ScalarValue<T> {
    /// Extract the first column.
    #[must_use]
    pub fn new() -> Self {
        Self::at(KeyColumn::default())
    }

    /// Extract `column`.
    #[must_use]
    pub fn at(column: KeyColumn) -> Self {
        Self {
            converter: RowConverter::new(),
            column,
            _marker: PhantomData,
        }
    }
}

impl<T: FromValue> Default for ScalarValue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FromValue> CursorHandler for ScalarValue<T> {
    type Output = Option<T>;

    fn handle(&self, cursor: &mut dyn Cursor) -> Result<Option<T>> {
        if !cursor.advance()? {
            return Ok(None);
        }
        let value = self.converter.scalar(cursor, &self.column, T::TAG)?;
        let value_type = value.type_name();
        match T::from_value(value) {
            Some(v) => Ok(Some(v)),
            None => Err(RowcastError::Conversion {
                value_type,
                target: T::TAG.name(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_key_total_order() {
        let mut keys = vec![
            RowKey(Value::Text("b".into())),
            RowKey(Value::Null),
            RowKey(Value::Integer(3)),
            RowKey(Value::Float(1.5)),
        ];
        keys.sort();
        assert_eq!(keys[0], RowKey(Value::Null));
        assert_eq!(keys[1], RowKey(Value::Float(1.5)));
        assert_eq!(keys[2], RowKey(Value::Integer(3)));
        assert_eq!(keys[3], RowKey(Value::Text("b".into())));
    }

    #[test]
    fn row_key_duplicates_collide() {
        let mut map = BTreeMap::new();
        map.insert(RowKey(Value::Integer(1)), "first");
        map.insert(RowKey(Value::Integer(1)), "second");
        assert_eq!(map.len(), 1);
        assert_eq!(map[&RowKey(Value::Integer(1))], "second");
    }
}
