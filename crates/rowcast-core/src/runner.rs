//! Query execution with deterministic resource release.
//!
//! Every operation moves through the same sequence: acquire a connection
//! (owned source or caller-supplied), pick the statement form, bind,
//! execute, consume results, release. Release runs on every exit path in
//! cursor -> statement -> connection order; the connection is closed only
//! when the runner acquired it from its own source. When the operation
//! itself failed, release errors are logged and suppressed so the original
//! failure propagates; when the operation succeeded, the first release
//! error surfaces.

use std::sync::Arc;

use rowcast_error::{Result, RowcastError};
use rowcast_types::Value;
use tracing::{debug, warn};

use crate::collect::CursorHandler;
use crate::source::{Connection, DataSource, Statement};

/// Execution options carried through every operation.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Verify the supplied parameter count against the statement's
    /// declared count before binding. Disable for backends whose
    /// parameter metadata is unreliable.
    pub check_parameter_counts: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            check_parameter_counts: true,
        }
    }
}

/// Executes queries, updates, and batches against a data source.
///
/// Constructed with an owned [`DataSource`] (`with_source`) or without one
/// (`new`), in which case only the borrowed-connection `*_with` entry
/// points are usable. The two modes are separate methods by design: who
/// closes the connection is decided at the call site, never inferred.
#[derive(Clone)]
pub struct QueryRunner {
    source: Option<Arc<dyn DataSource>>,
    options: RunnerOptions,
}

impl std::fmt::Debug for QueryRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryRunner")
            .field("has_source", &self.source.is_some())
            .field("options", &self.options)
            .finish()
    }
}

enum ConnectionScope<'a> {
    Owned(Box<dyn Connection>),
    Borrowed(&'a mut dyn Connection),
}

impl ConnectionScope<'_> {
    fn as_mut(&mut self) -> &mut dyn Connection {
        match self {
            ConnectionScope::Owned(conn) => conn.as_mut(),
            ConnectionScope::Borrowed(conn) => &mut **conn,
        }
    }

    /// Close only when owned; a borrowed connection stays with its caller.
    fn release(self, after_failure: bool) -> Result<()> {
        match self {
            ConnectionScope::Owned(mut conn) => {
                let closed = conn.close();
                if after_failure {
                    suppress("connection", closed);
                    Ok(())
                } else {
                    closed
                }
            }
            ConnectionScope::Borrowed(_) => Ok(()),
        }
    }
}

fn suppress(what: &'static str, result: Result<()>) {
    if let Err(error) = result {
        warn!(%error, what, "release failed during unwind");
    }
}

impl QueryRunner {
    /// A runner with no owned source; only `*_with` entry points work.
    #[must_use]
    pub fn new() -> Self {
        Self {
            source: None,
            options: RunnerOptions::default(),
        }
    }

    /// A runner that acquires (and closes) connections from `source`.
    #[must_use]
    pub fn with_source(source: Arc<dyn DataSource>) -> Self {
        Self {
            source: Some(source),
            options: RunnerOptions::default(),
        }
    }

    /// Replace the options.
    #[must_use]
    pub fn with_options(mut self, options: RunnerOptions) -> Self {
        self.options = options;
        self
    }

    /// The options in use.
    #[must_use]
    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Execute `sql` and fold the result rows through `handler`.
    pub fn query<H: CursorHandler>(
        &self,
        sql: &str,
        params: &[Value],
        handler: &H,
    ) -> Result<H::Output> {
        let scope = self.acquire(sql)?;
        self.run_query(scope, sql, params, handler)
    }

    /// Like [`query`](Self::query), on a caller-supplied connection that
    /// stays open afterwards.
    pub fn query_with<H: CursorHandler>(
        &self,
        conn: &mut dyn Connection,
        sql: &str,
        params: &[Value],
        handler: &H,
    ) -> Result<H::Output> {
        require_sql(sql)?;
        self.run_query(ConnectionScope::Borrowed(conn), sql, params, handler)
    }

    /// Execute `sql` as an update, returning the affected-row count.
    pub fn update(&self, sql: &str, params: &[Value]) -> Result<usize> {
        let scope = self.acquire(sql)?;
        self.run_update(scope, sql, params)
    }

    /// Like [`update`](Self::update), on a caller-supplied connection.
    pub fn update_with(
        &self,
        conn: &mut dyn Connection,
        sql: &str,
        params: &[Value],
    ) -> Result<usize> {
        require_sql(sql)?;
        self.run_update(ConnectionScope::Borrowed(conn), sql, params)
    }

    /// Execute `sql` once per parameter row as one batch, returning one
    /// affected-row count per row.
    pub fn batch(&self, sql: &str, param_rows: &[Vec<Value>]) -> Result<Vec<usize>> {
        let scope = self.acquire(sql)?;
        self.run_batch(scope, sql, param_rows)
    }

    /// Like [`batch`](Self::batch), on a caller-supplied connection.
    pub fn batch_with(
        &self,
        conn: &mut dyn Connection,
        sql: &str,
        param_rows: &[Vec<Value>],
    ) -> Result<Vec<usize>> {
        require_sql(sql)?;
        self.run_batch(ConnectionScope::Borrowed(conn), sql, param_rows)
    }

    /// Validate SQL, then acquire a connection from the owned source.
    /// Validation runs first: bad input never costs a connection.
    fn acquire(&self, sql: &str) -> Result<ConnectionScope<'static>> {
        require_sql(sql)?;
        let source = self.source.as_ref().ok_or(RowcastError::NoDataSource)?;
        Ok(ConnectionScope::Owned(source.connection()?))
    }

    fn run_query<H: CursorHandler>(
        &self,
        mut scope: ConnectionScope<'_>,
        sql: &str,
        params: &[Value],
        handler: &H,
    ) -> Result<H::Output> {
        let mut stmt = match self.open_statement(scope.as_mut(), sql, params) {
            Ok(stmt) => stmt,
            Err(error) => {
                suppress_scope(scope);
                return Err(error);
            }
        };
        let result = Self::query_statement(stmt.as_mut(), handler);
        finish(scope, stmt, result)
    }

    fn run_update(
        &self,
        mut scope: ConnectionScope<'_>,
        sql: &str,
        params: &[Value],
    ) -> Result<usize> {
        let mut stmt = match self.open_statement(scope.as_mut(), sql, params) {
            Ok(stmt) => stmt,
            Err(error) => {
                suppress_scope(scope);
                return Err(error);
            }
        };
        let result = stmt.execute_update();
        if let Ok(count) = &result {
            debug!(count, "update executed");
        }
        finish(scope, stmt, result)
    }

    fn run_batch(
        &self,
        mut scope: ConnectionScope<'_>,
        sql: &str,
        param_rows: &[Vec<Value>],
    ) -> Result<Vec<usize>> {
        let mut stmt = match scope.as_mut().prepare(sql) {
            Ok(stmt) => stmt,
            Err(error) => {
                suppress_scope(scope);
                return Err(error);
            }
        };
        let result = self.batch_statement(stmt.as_mut(), param_rows);
        finish(scope, stmt, result)
    }

    /// Pick the statement form and bind parameters.
    ///
    /// Empty params select direct execution; otherwise the statement is
    /// prepared and the declared parameter count checked before any bind.
    fn open_statement(
        &self,
        conn: &mut dyn Connection,
        sql: &str,
        params: &[Value],
    ) -> Result<Box<dyn Statement>> {
        if params.is_empty() {
            return conn.plain(sql);
        }
        let mut stmt = conn.prepare(sql)?;
        if let Err(error) = self.bind_params(stmt.as_mut(), params) {
            suppress("statement", stmt.close());
            return Err(error);
        }
        Ok(stmt)
    }

    fn bind_params(&self, stmt: &mut dyn Statement, params: &[Value]) -> Result<()> {
        if self.options.check_parameter_counts {
            let expected = stmt.parameter_count();
            if expected != params.len() {
                return Err(RowcastError::ParameterMismatch {
                    expected,
                    actual: params.len(),
                });
            }
        }
        for (i, value) in params.iter().enumerate() {
            stmt.bind(i + 1, value.clone())?;
        }
        Ok(())
    }

    fn query_statement<H: CursorHandler>(
        stmt: &mut dyn Statement,
        handler: &H,
    ) -> Result<H::Output> {
        let mut cursor = stmt.execute_query()?;
        let outcome = handler.handle(cursor.as_mut());
        let closed = cursor.close();
        match outcome {
            Ok(output) => closed.map(|()| output),
            Err(error) => {
                suppress("cursor", closed);
                Err(error)
            }
        }
    }

    fn batch_statement(
        &self,
        stmt: &mut dyn Statement,
        param_rows: &[Vec<Value>],
    ) -> Result<Vec<usize>> {
        let expected = stmt.parameter_count();
        for (row, params) in param_rows.iter().enumerate() {
            if self.options.check_parameter_counts && params.len() != expected {
                return Err(RowcastError::BatchArity {
                    row,
                    expected,
                    actual: params.len(),
                });
            }
            for (i, value) in params.iter().enumerate() {
                stmt.bind(i + 1, value.clone())?;
            }
            stmt.add_batch_entry()?;
        }
        let counts = stmt.execute_batch()?;
        debug!(entries = counts.len(), "batch executed");
        Ok(counts)
    }
}

impl Default for QueryRunner {
    fn default() -> Self {
        Self::new()
    }
}

fn require_sql(sql: &str) -> Result<()> {
    if sql.trim().is_empty() {
        return Err(RowcastError::EmptySql);
    }
    Ok(())
}

fn suppress_scope(scope: ConnectionScope<'_>) {
    // Unwind path: the operation already failed.
    let _ = scope.release(true);
}

/// Close statement then connection, keeping the operation's error dominant.
fn finish<T>(
    scope: ConnectionScope<'_>,
    mut stmt: Box<dyn Statement>,
    result: Result<T>,
) -> Result<T> {
    let stmt_closed = stmt.close();
    match result {
        Ok(value) => match stmt_closed {
            Ok(()) => {
                scope.release(false)?;
                Ok(value)
            }
            Err(error) => {
                let _ = scope.release(true);
                Err(error)
            }
        },
        Err(error) => {
            suppress("statement", stmt_closed);
            let _ = scope.release(true);
            Err(error)
        }
    }
}
