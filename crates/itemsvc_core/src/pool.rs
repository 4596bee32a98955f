//! Fixed-size worker pool with joinable task handles.
//!
//! # Responsibility
//! - Run submitted closures on a bounded set of long-lived OS threads.
//! - Hand back one handle per task so callers can join on completion.
//!
//! # Invariants
//! - Worker count is fixed at construction; threads are reused across tasks.
//! - A panicking task never takes its worker down; the panic is reported
//!   through that task's handle.
//! - After `shutdown()`, submission fails and every queued task still runs
//!   before the workers exit.

use crossbeam::channel::{self, Receiver, Sender};
use log::{debug, error, info};
use parking_lot::Mutex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Worker pool failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Requested a pool without workers.
    InvalidSize,
    /// The OS refused to start a worker thread.
    Spawn(String),
    /// The pool no longer accepts work.
    ShutDown,
    /// The task panicked; carries the sanitized panic payload.
    TaskPanicked(String),
    /// The task's worker went away without reporting a result.
    Disconnected,
}

impl Display for PoolError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSize => write!(f, "worker pool size must be at least 1"),
            Self::Spawn(message) => write!(f, "failed to spawn worker thread: {message}"),
            Self::ShutDown => write!(f, "worker pool is shut down"),
            Self::TaskPanicked(message) => write!(f, "task panicked: {message}"),
            Self::Disconnected => write!(f, "worker exited without reporting a result"),
        }
    }
}

impl Error for PoolError {}

/// Pending result of one submitted task.
#[derive(Debug)]
pub struct TaskHandle<T> {
    receiver: Receiver<Result<T, PoolError>>,
}

impl<T> TaskHandle<T> {
    /// Blocks until the task reached a terminal state.
    pub fn wait(self) -> Result<T, PoolError> {
        self.receiver.recv().unwrap_or(Err(PoolError::Disconnected))
    }

    /// Returns whether a result is ready, without blocking.
    pub fn is_finished(&self) -> bool {
        !self.receiver.is_empty()
    }
}

/// Waits on every handle and returns all outcomes in submission order.
pub fn join_all<T>(handles: impl IntoIterator<Item = TaskHandle<T>>) -> Vec<Result<T, PoolError>> {
    handles.into_iter().map(TaskHandle::wait).collect()
}

/// Bounded pool of named worker threads fed by one shared queue.
pub struct WorkerPool {
    name: String,
    size: usize,
    sender: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Starts `size` worker threads named `{name}-{index}`.
    ///
    /// # Errors
    /// - `PoolError::InvalidSize` when `size == 0`.
    /// - `PoolError::Spawn` when a thread cannot be started; already started
    ///   workers are shut down first.
    pub fn new(name: impl Into<String>, size: usize) -> Result<Self, PoolError> {
        if size == 0 {
            return Err(PoolError::InvalidSize);
        }

        let name = name.into();
        let (sender, receiver) = channel::unbounded::<Job>();
        let pool = Self {
            name,
            size,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(Vec::with_capacity(size)),
        };

        for index in 0..size {
            let receiver = receiver.clone();
            let spawned = thread::Builder::new()
                .name(format!("{}-{index}", pool.name))
                .spawn(move || run_worker(receiver));
            match spawned {
                Ok(handle) => pool.workers.lock().push(handle),
                Err(err) => {
                    pool.shutdown();
                    return Err(PoolError::Spawn(err.to_string()));
                }
            }
        }

        info!(
            "event=pool_start module=pool status=ok pool={} workers={}",
            pool.name, size
        );
        Ok(pool)
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Queues `task` and returns a handle to its result.
    ///
    /// # Errors
    /// - `PoolError::ShutDown` once `shutdown()` was called.
    pub fn submit<T, F>(&self, task: F) -> Result<TaskHandle<T>, PoolError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (result_tx, result_rx) = channel::bounded(1);
        let job: Job = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(task))
                .map_err(|payload| PoolError::TaskPanicked(panic_message(payload.as_ref())));
            // The handle may already be dropped by a caller that does not care.
            let _ = result_tx.send(outcome);
        });

        let guard = self.sender.lock();
        let sender = guard.as_ref().ok_or(PoolError::ShutDown)?;
        sender.send(job).map_err(|_| PoolError::ShutDown)?;
        Ok(TaskHandle {
            receiver: result_rx,
        })
    }

    /// Stops accepting work, drains the queue and joins every worker.
    ///
    /// Idempotent.
    pub fn shutdown(&self) {
        let Some(sender) = self.sender.lock().take() else {
            return;
        };
        drop(sender);

        let workers = std::mem::take(&mut *self.workers.lock());
        let current = thread::current().id();
        for worker in workers {
            // A worker dropping the last pool reference cannot join itself.
            if worker.thread().id() == current {
                continue;
            }
            if worker.join().is_err() {
                error!(
                    "event=pool_shutdown module=pool status=error pool={} error=worker_panicked",
                    self.name
                );
            }
        }
        info!(
            "event=pool_shutdown module=pool status=ok pool={}",
            self.name
        );
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(receiver: Receiver<Job>) {
    while let Ok(job) = receiver.recv() {
        job();
    }
    debug!("event=worker_exit module=pool status=ok");
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
