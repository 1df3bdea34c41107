//! Fixed-size worker pool for asynchronous execution.
//!
//! Jobs are whole operations submitted as one unit of work; workers pull
//! them off a shared channel. A [`TaskHandle`] represents the eventual
//! result. Cancelling a handle only prevents a job that has not started;
//! a running job is never interrupted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use rowcast_error::{Result, RowcastError};
use tracing::debug;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Handle to a submitted unit of work.
#[derive(Debug)]
pub struct TaskHandle<T> {
    receiver: mpsc::Receiver<Result<T>>,
    cancelled: Arc<AtomicBool>,
}

impl<T> TaskHandle<T> {
    /// Request cancellation. Returns true if the request was recorded
    /// before a worker started the job; the job then reports
    /// [`RowcastError::TaskCancelled`] instead of running.
    pub fn cancel(&self) -> bool {
        self.cancelled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Block until the job finishes and take its result. A pool that shut
    /// down before running the job yields [`RowcastError::PoolShutdown`].
    pub fn join(self) -> Result<T> {
        self.receiver
            .recv()
            .unwrap_or(Err(RowcastError::PoolShutdown))
    }

    /// Take the result if the job has already finished.
    pub fn try_join(&self) -> Option<Result<T>> {
        self.receiver.try_recv().ok()
    }
}

/// Fixed set of worker threads draining a shared job queue.
pub struct WorkerPool {
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers.len())
            .finish()
    }
}

impl WorkerPool {
    /// Spawn `threads` workers (at least one).
    #[must_use]
    pub fn new(threads: usize) -> Self {
        let threads = threads.max(1);
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        let workers = (0..threads)
            .map(|id| {
                let receiver = Arc::clone(&receiver);
                thread::Builder::new()
                    .name(format!("rowcast-worker-{id}"))
                    .spawn(move || {
                        loop {
                            let job = receiver.lock().recv();
                            match job {
                                Ok(job) => job(),
                                Err(_) => break,
                            }
                        }
                        debug!(id, "worker exiting");
                    })
                    .expect("spawn worker thread")
            })
            .collect();
        Self {
            sender: Mutex::new(Some(sender)),
            workers,
        }
    }

    /// Submit one unit of work.
    ///
    /// The job runs on some worker unless the handle is cancelled first or
    /// the pool shuts down; either way the handle resolves.
    pub fn submit<T, F>(&self, work: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (result_tx, result_rx) = mpsc::channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let job: Job = Box::new(move || {
            let outcome = if flag.load(Ordering::Acquire) {
                Err(RowcastError::TaskCancelled)
            } else {
                work()
            };
            let _ = result_tx.send(outcome);
        });
        let sender = self.sender.lock();
        match sender.as_ref() {
            Some(tx) => {
                // A send failure means the workers are gone; the dropped
                // result sender surfaces as PoolShutdown at join.
                let _ = tx.send(job);
            }
            None => drop(job),
        }
        TaskHandle {
            receiver: result_rx,
            cancelled,
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.sender.lock().take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn submit_and_join() {
        let pool = WorkerPool::new(2);
        let handle = pool.submit(|| Ok(21 * 2));
        assert_eq!(handle.join().unwrap(), 42);
    }

    #[test]
    fn jobs_run_concurrently_with_capacity() {
        let pool = WorkerPool::new(4);
        let handles: Vec<_> = (0..8)
            .map(|i| {
                pool.submit(move || {
                    thread::sleep(Duration::from_millis(5));
                    Ok(i)
                })
            })
            .collect();
        let mut results: Vec<i32> = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect();
        results.sort_unstable();
        assert_eq!(results, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn cancel_before_start_reports_cancelled() {
        let pool = WorkerPool::new(1);
        // Occupy the only worker so the second job cannot start yet.
        let blocker = pool.submit(|| {
            thread::sleep(Duration::from_millis(50));
            Ok(())
        });
        let victim = pool.submit(|| Ok(1));
        assert!(victim.cancel());
        assert!(matches!(
            victim.join(),
            Err(RowcastError::TaskCancelled)
        ));
        blocker.join().unwrap();
    }

    #[test]
    fn cancel_after_start_does_not_interrupt() {
        let pool = WorkerPool::new(1);
        let handle = pool.submit(|| Ok(7));
        thread::sleep(Duration::from_millis(20));
        handle.cancel();
        assert_eq!(handle.join().unwrap(), 7);
    }

    #[test]
    fn pool_drop_resolves_pending_handles() {
        let handle = {
            let pool = WorkerPool::new(1);
            let h = pool.submit(|| Ok(1));
            let _ = h.join();
            let h2 = pool.submit(|| Ok(2));
            drop(pool);
            h2
        };
        // Either the job ran before shutdown or the handle reports it.
        match handle.join() {
            Ok(2) | Err(RowcastError::PoolShutdown) => {}
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
