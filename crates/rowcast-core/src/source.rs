//! Boundary traits for the underlying tabular data source.
//!
//! The engine is written entirely against these capabilities; it never
//! assumes a concrete backend. Implementations own their transport-level
//! details (wire protocol, files, memory) and only promise the minimal
//! surface the runner and collectors need: acquire, prepare, bind,
//! execute, iterate, close.
//!
//! Both statement forms receive their SQL text at creation. Plain
//! statements report a parameter count of zero and reject binds.

use rowcast_error::Result;
use rowcast_types::{Column, Value};

/// A pool or factory of connections.
pub trait DataSource: Send + Sync {
    /// Acquire a connection. Failure means no connection is obtainable.
    fn connection(&self) -> Result<Box<dyn Connection>>;
}

/// One open connection to the data source.
pub trait Connection: Send {
    /// Prepare a parameterizable statement for `sql`.
    fn prepare(&mut self, sql: &str) -> Result<Box<dyn Statement>>;

    /// Create a direct-execution statement for `sql` (no parameters).
    fn plain(&mut self, sql: &str) -> Result<Box<dyn Statement>>;

    /// Close the connection. Further use of statements created from it is
    /// implementation-defined; the runner never does so.
    fn close(&mut self) -> Result<()>;
}

/// A statement bound to one connection, prepared or plain.
pub trait Statement: Send {
    /// Bind a parameter at 1-based `index`.
    fn bind(&mut self, index: usize, value: Value) -> Result<()>;

    /// Snapshot the currently-bound parameters as one batch entry and
    /// clear them for the next row.
    fn add_batch_entry(&mut self) -> Result<()>;

    /// Execute and return a cursor over the result rows.
    fn execute_query(&mut self) -> Result<Box<dyn Cursor>>;

    /// Execute and return the affected-row count.
    fn execute_update(&mut self) -> Result<usize>;

    /// Execute all accumulated batch entries, returning one affected-row
    /// count per entry.
    fn execute_batch(&mut self) -> Result<Vec<usize>>;

    /// Number of parameters the statement declares. Zero for plain
    /// statements.
    fn parameter_count(&self) -> usize;

    /// Close the statement.
    fn close(&mut self) -> Result<()>;
}

/// A sequential, forward-only iterator over result rows.
///
/// Column access addresses the current row only and has no side effects;
/// the same column may be read any number of times, in any order.
pub trait Cursor: Send {
    /// Advance to the next row. Returns false when exhausted.
    fn advance(&mut self) -> Result<bool>;

    /// Read the current row's value at 1-based `index`.
    fn column(&self, index: usize) -> Result<Value>;

    /// Read the current row's value in the column named `name`
    /// (case-insensitive).
    fn column_by_name(&self, name: &str) -> Result<Value>;

    /// Column metadata for this result set. Stable for the cursor's
    /// lifetime: columns do not change mid-iteration.
    fn metadata(&self) -> Result<Vec<Column>>;

    /// Close the cursor.
    fn close(&mut self) -> Result<()>;
}
