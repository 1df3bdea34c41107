//! Asynchronous execution: the synchronous runner dispatched to a worker
//! pool.
//!
//! Each operation is submitted as one opaque unit of work; the returned
//! [`TaskHandle`] resolves to the same result the synchronous call would
//! have produced, at the point the caller consumes it. Only the
//! owned-source mode is available here: a borrowed connection cannot move
//! into a worker thread, and serializing a shared connection is the
//! caller's job.

use std::sync::Arc;

use rowcast_types::Value;

use crate::collect::CursorHandler;
use crate::pool::{TaskHandle, WorkerPool};
use crate::runner::QueryRunner;

/// Submits runner operations to a worker pool.
#[derive(Debug, Clone)]
pub struct AsyncRunner {
    runner: Arc<QueryRunner>,
    pool: Arc<WorkerPool>,
}

impl AsyncRunner {
    /// Wrap `runner`, dispatching to a dedicated pool of `threads` workers.
    #[must_use]
    pub fn new(runner: QueryRunner, threads: usize) -> Self {
        Self {
            runner: Arc::new(runner),
            pool: Arc::new(WorkerPool::new(threads)),
        }
    }

    /// Wrap `runner`, dispatching to an existing pool.
    #[must_use]
    pub fn with_pool(runner: QueryRunner, pool: Arc<WorkerPool>) -> Self {
        Self {
            runner: Arc::new(runner),
            pool,
        }
    }

    /// The underlying synchronous runner.
    #[must_use]
    pub fn runner(&self) -> &QueryRunner {
        &self.runner
    }

    /// Submit a query; the handler folds rows on the worker thread.
    pub fn query<H>(
        &self,
        sql: impl Into<String>,
        params: Vec<Value>,
        handler: H,
    ) -> TaskHandle<H::Output>
    where
        H: CursorHandler + Send + 'static,
        H::Output: Send + 'static,
    {
        let runner = Arc::clone(&self.runner);
        let sql = sql.into();
        self.pool
            .submit(move || runner.query(&sql, &params, &handler))
    }

    /// Submit an update.
    pub fn update(&self, sql: impl Into<String>, params: Vec<Value>) -> TaskHandle<usize> {
        let runner = Arc::clone(&self.runner);
        let sql = sql.into();
        self.pool.submit(move || runner.update(&sql, &params))
    }

    /// Submit a batch.
    pub fn batch(
        &self,
        sql: impl Into<String>,
        param_rows: Vec<Vec<Value>>,
    ) -> TaskHandle<Vec<usize>> {
        let runner = Arc::clone(&self.runner);
        let sql = sql.into();
        self.pool.submit(move || runner.batch(&sql, &param_rows))
    }
}
