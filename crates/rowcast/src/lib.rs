//! Public API facade for rowcast.
//!
//! Re-exports the engine surface: value/column types, the record macro and
//! traits, collectors, the synchronous [`QueryRunner`] and asynchronous
//! [`AsyncRunner`], and the boundary traits a backend implements.
//!
//! ```
//! use std::sync::Arc;
//! use rowcast::{params, QueryRunner, RecordList};
//! use rowcast_harness::MemDataSource;
//!
//! rowcast::record! {
//!     #[derive(Debug, Default, PartialEq)]
//!     pub struct Person {
//!         pub id: i64,
//!         pub name: String,
//!     }
//! }
//!
//! let source = MemDataSource::with_columns(
//!     &["id", "name"],
//!     vec![vec![1_i64.into(), "ada".into()]],
//! );
//! let runner = QueryRunner::with_source(Arc::new(source));
//! let people: Vec<Person> = runner
//!     .query(
//!         "select id, name from person where id = ?",
//!         params![1_i64],
//!         &RecordList::new(),
//!     )
//!     .unwrap();
//! assert_eq!(people[0].name, "ada");
//! ```

pub use rowcast_core::{
    coerce, collect, convert, matcher, pool, record, runner, source, task, ArrayList,
    AsyncRunner, CoercionChain, ColumnList, Connection, Cursor, CursorHandler, DataSource,
    FieldDescriptor, FirstArray, FirstMap, FirstRecord, FromValue, GroupedRecords, KeyColumn,
    KeyedMaps, MapList, MatchTable, NullSubstitute, PropertyHandler, QueryRunner, Record,
    RecordList, RecordMap, RowConverter, RowKey, RowMap, RunnerOptions, ScalarValue, Statement,
    TaskHandle, TrimText, ValueTransform, WorkerPool,
};
pub use rowcast_error::{ErrorKind, Result, RowcastError};
pub use rowcast_types::{Column, TypeTag, Value};

/// Build a parameter slice from anything convertible into [`Value`].
///
/// ```
/// use rowcast::{params, Value};
/// let p = params![1_i64, "hello", None::<i64>];
/// assert_eq!(p[2], Value::Null);
/// ```
#[macro_export]
macro_rules! params {
    () => {
        &[] as &[$crate::Value]
    };
    ($($val:expr),+ $(,)?) => {
        &[$($crate::Value::from($val)),+] as &[$crate::Value]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_macro_empty_produces_empty_slice() {
        let p = params![];
        assert!(p.is_empty());
    }

    #[test]
    fn params_macro_mixed_types() {
        let p = params![1_i64, "hello", 3.5_f64];
        assert_eq!(p.len(), 3);
        assert_eq!(p[0], Value::Integer(1));
        assert_eq!(p[1], Value::Text("hello".to_owned()));
        assert_eq!(p[2], Value::Float(3.5));
    }

    #[test]
    fn params_macro_none_produces_null() {
        let p = params![None::<i64>];
        assert_eq!(p[0], Value::Null);
    }

    #[test]
    fn params_macro_trailing_comma() {
        let p = params![1_i64, 2_i64,];
        assert_eq!(p.len(), 2);
    }
}
