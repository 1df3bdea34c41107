//! In-memory implementations of the rowcast boundary traits.
//!
//! A [`MemDataSource`] serves a fixed column set and row table to every
//! statement, regardless of SQL text; statements derive their declared
//! parameter count from `?` placeholders. All opens and closes are
//! recorded in a shared [`CloseLog`] so tests can assert that every
//! resource of a call was released exactly once, on success and failure
//! paths alike. Failure injection covers acquisition and execution.
//!
//! The cursor is implemented directly over the row table (sequential
//! `advance`, random access within the current row) with no interception
//! layer in between.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rowcast_core::source::{Connection, Cursor, DataSource, Statement};
use rowcast_error::{Result, RowcastError};

pub use rowcast_types::{Column, Value};

/// Shared open/close accounting across one data source.
#[derive(Debug, Default)]
pub struct CloseLog {
    connections_opened: AtomicUsize,
    connections_closed: AtomicUsize,
    statements_opened: AtomicUsize,
    statements_closed: AtomicUsize,
    cursors_opened: AtomicUsize,
    cursors_closed: AtomicUsize,
}

impl CloseLog {
    /// Connections handed out.
    pub fn connections_opened(&self) -> usize {
        self.connections_opened.load(Ordering::Acquire)
    }

    /// Connections closed.
    pub fn connections_closed(&self) -> usize {
        self.connections_closed.load(Ordering::Acquire)
    }

    /// Statements created.
    pub fn statements_opened(&self) -> usize {
        self.statements_opened.load(Ordering::Acquire)
    }

    /// Statements closed.
    pub fn statements_closed(&self) -> usize {
        self.statements_closed.load(Ordering::Acquire)
    }

    /// Cursors created.
    pub fn cursors_opened(&self) -> usize {
        self.cursors_opened.load(Ordering::Acquire)
    }

    /// Cursors closed.
    pub fn cursors_closed(&self) -> usize {
        self.cursors_closed.load(Ordering::Acquire)
    }

    /// True when every opened resource has been closed.
    pub fn all_released(&self) -> bool {
        self.connections_opened() == self.connections_closed()
            && self.statements_opened() == self.statements_closed()
            && self.cursors_opened() == self.cursors_closed()
    }
}

#[derive(Debug, Clone)]
struct Fixture {
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
    update_count: usize,
    fail_acquire: bool,
    fail_execution: bool,
}

/// In-memory data source serving one fixed result table.
#[derive(Debug, Clone)]
pub struct MemDataSource {
    fixture: Fixture,
    log: Arc<CloseLog>,
}

impl MemDataSource {
    /// A source whose every query yields `columns` x `rows`.
    #[must_use]
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            fixture: Fixture {
                columns,
                rows,
                update_count: 1,
                fail_acquire: false,
                fail_execution: false,
            },
            log: Arc::new(CloseLog::default()),
        }
    }

    /// Convenience: columns named `names`, labels equal to names.
    #[must_use]
    pub fn with_columns(names: &[&str], rows: Vec<Vec<Value>>) -> Self {
        let columns = names
            .iter()
            .enumerate()
            .map(|(i, name)| Column::new(i + 1, *name))
            .collect();
        Self::new(columns, rows)
    }

    /// Affected-row count reported by updates and per batch entry.
    #[must_use]
    pub fn update_count(mut self, count: usize) -> Self {
        self.fixture.update_count = count;
        self
    }

    /// Make `connection()` fail.
    #[must_use]
    pub fn fail_acquire(mut self) -> Self {
        self.fixture.fail_acquire = true;
        self
    }

    /// Make every execute fail after resources were acquired.
    #[must_use]
    pub fn fail_execution(mut self) -> Self {
        self.fixture.fail_execution = true;
        self
    }

    /// The shared close accounting.
    #[must_use]
    pub fn log(&self) -> Arc<CloseLog> {
        Arc::clone(&self.log)
    }
}

impl DataSource for MemDataSource {
    fn connection(&self) -> Result<Box<dyn Connection>> {
        if self.fixture.fail_acquire {
            return Err(RowcastError::acquisition("harness: acquisition disabled"));
        }
        self.log.connections_opened.fetch_add(1, Ordering::AcqRel);
        Ok(Box::new(MemConnection {
            fixture: self.fixture.clone(),
            log: Arc::clone(&self.log),
            closed: false,
        }))
    }
}

/// One in-memory connection.
pub struct MemConnection {
    fixture: Fixture,
    log: Arc<CloseLog>,
    closed: bool,
}

impl MemConnection {
    fn statement(&mut self, parameter_count: usize) -> Result<Box<dyn Statement>> {
        if self.closed {
            return Err(RowcastError::ResourceClosed { what: "connection" });
        }
        self.log.statements_opened.fetch_add(1, Ordering::AcqRel);
        Ok(Box::new(MemStatement {
            fixture: self.fixture.clone(),
            log: Arc::clone(&self.log),
            parameter_count,
            bound: vec![None; parameter_count],
            batch: Vec::new(),
            closed: false,
        }))
    }
}

impl Connection for MemConnection {
    fn prepare(&mut self, sql: &str) -> Result<Box<dyn Statement>> {
        let count = count_placeholders(sql);
        self.statement(count)
    }

    fn plain(&mut self, _sql: &str) -> Result<Box<dyn Statement>> {
        self.statement(0)
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(RowcastError::ResourceClosed { what: "connection" });
        }
        self.closed = true;
        self.log.connections_closed.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

/// One in-memory statement, prepared or plain.
pub struct MemStatement {
    fixture: Fixture,
    log: Arc<CloseLog>,
    parameter_count: usize,
    bound: Vec<Option<Value>>,
    batch: Vec<Vec<Option<Value>>>,
    closed: bool,
}

impl MemStatement {
    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(RowcastError::ResourceClosed { what: "statement" });
        }
        Ok(())
    }

    fn check_execute(&self) -> Result<()> {
        self.check_open()?;
        if self.fixture.fail_execution {
            return Err(RowcastError::execution("harness: execution disabled"));
        }
        Ok(())
    }
}

impl Statement for MemStatement {
    fn bind(&mut self, index: usize, value: Value) -> Result<()> {
        self.check_open()?;
        if index == 0 || index > self.parameter_count {
            return Err(RowcastError::execution(format!(
                "bind index {index} out of range (statement declares {})",
                self.parameter_count
            )));
        }
        self.bound[index - 1] = Some(value);
        Ok(())
    }

    fn add_batch_entry(&mut self) -> Result<()> {
        self.check_open()?;
        let entry = std::mem::replace(&mut self.bound, vec![None; self.parameter_count]);
        self.batch.push(entry);
        Ok(())
    }

    fn execute_query(&mut self) -> Result<Box<dyn Cursor>> {
        self.check_execute()?;
        self.log.cursors_opened.fetch_add(1, Ordering::AcqRel);
        Ok(Box::new(MemCursor {
            columns: self.fixture.columns.clone(),
            rows: self.fixture.rows.clone(),
            position: None,
            closed: false,
            log: Arc::clone(&self.log),
        }))
    }

    fn execute_update(&mut self) -> Result<usize> {
        self.check_execute()?;
        Ok(self.fixture.update_count)
    }

    fn execute_batch(&mut self) -> Result<Vec<usize>> {
        self.check_execute()?;
        Ok(vec![self.fixture.update_count; self.batch.len()])
    }

    fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(RowcastError::ResourceClosed { what: "statement" });
        }
        self.closed = true;
        self.log.statements_closed.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

/// Sequential cursor over the in-memory row table.
pub struct MemCursor {
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
    position: Option<usize>,
    closed: bool,
    log: Arc<CloseLog>,
}

impl MemCursor {
    /// Standalone cursor over `columns` x `rows`, for unit tests that
    /// exercise converters without a runner.
    #[must_use]
    pub fn standalone(columns: Vec<Column>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows,
            position: None,
            closed: false,
            log: Arc::new(CloseLog::default()),
        }
    }

    fn current(&self) -> Result<&Vec<Value>> {
        if self.closed {
            return Err(RowcastError::CursorClosed);
        }
        let index = self.position.ok_or(RowcastError::NoCurrentRow)?;
        self.rows.get(index).ok_or(RowcastError::NoCurrentRow)
    }
}

impl Cursor for MemCursor {
    fn advance(&mut self) -> Result<bool> {
        if self.closed {
            return Err(RowcastError::CursorClosed);
        }
        let next = self.position.map_or(0, |p| p + 1);
        if next < self.rows.len() {
            self.position = Some(next);
            Ok(true)
        } else {
            self.position = Some(self.rows.len());
            Ok(false)
        }
    }

    fn column(&self, index: usize) -> Result<Value> {
        let row = self.current()?;
        if index == 0 || index > row.len() {
            return Err(RowcastError::ColumnIndexOutOfRange {
                index,
                count: row.len(),
            });
        }
        Ok(row[index - 1].clone())
    }

    fn column_by_name(&self, name: &str) -> Result<Value> {
        let index = self
            .columns
            .iter()
            .find(|c| {
                c.label
                    .as_deref()
                    .is_some_and(|l| l.eq_ignore_ascii_case(name))
                    || c.name.eq_ignore_ascii_case(name)
            })
            .map(|c| c.index)
            .ok_or_else(|| RowcastError::NoSuchColumn {
                name: name.to_owned(),
            })?;
        self.column(index)
    }

    fn metadata(&self) -> Result<Vec<Column>> {
        if self.closed {
            return Err(RowcastError::CursorClosed);
        }
        Ok(self.columns.clone())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(RowcastError::CursorClosed);
        }
        self.closed = true;
        self.log.cursors_closed.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

/// Count `?` placeholders outside single-quoted literals.
fn count_placeholders(sql: &str) -> usize {
    let mut count = 0;
    let mut in_literal = false;
    for c in sql.chars() {
        match c {
            '\'' => in_literal = !in_literal,
            '?' if !in_literal => count += 1,
            _ => {}
        }
    }
    count
}

// Convenience used by several integration tests.
/// Build a row of values from anything convertible.
#[macro_export]
macro_rules! row {
    ($($val:expr),* $(,)?) => {
        vec![$($crate::Value::from($val)),*]
    };
}
