//! Row-mapping engine and execution lifecycle.
//!
//! The pipeline: a [`runner::QueryRunner`] acquires a connection, binds
//! parameters, and executes; a [`collect::CursorHandler`] drives the
//! cursor and folds rows; per row, a [`convert::RowConverter`] routes
//! column values through the [`matcher`] assignment and the
//! [`coerce::CoercionChain`] into a [`record::Record`] (or a raw array /
//! mapping shape). Resources are released on every exit path, in
//! cursor -> statement -> connection order.
//!
//! The engine is backend-agnostic: everything runs against the capability
//! traits in [`source`].

pub mod coerce;
pub mod collect;
pub mod convert;
pub mod matcher;
pub mod pool;
pub mod record;
pub mod runner;
pub mod source;
pub mod task;

pub use coerce::{CoercionChain, PropertyHandler};
pub use collect::{
    ArrayList, ColumnList, CursorHandler, FirstArray, FirstMap, FirstRecord, GroupedRecords,
    KeyedMaps, MapList, RecordList, RecordMap, RowKey, ScalarValue,
};
pub use convert::{KeyColumn, NullSubstitute, RowConverter, RowMap, TrimText, ValueTransform};
pub use matcher::{match_columns, normalize, MatchTable};
pub use pool::{TaskHandle, WorkerPool};
pub use record::{FieldDescriptor, FromValue, Record};
pub use runner::{QueryRunner, RunnerOptions};
pub use source::{Connection, Cursor, DataSource, Statement};
pub use task::AsyncRunner;
