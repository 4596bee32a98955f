//! Concurrent "process every pending item" routine.
//!
//! # Responsibility
//! - Snapshot all stored ids and fan one unit of work per id out to a fixed
//!   worker pool.
//! - Advance every pending item to `PROCESSED_STATUS` and collect exactly the
//!   items that were transitioned.
//!
//! # Invariants
//! - The call returns only after every submitted unit has reached a terminal
//!   outcome (transitioned, skipped or failed).
//! - One attempt per id per call; no retry.
//! - Units write only the status field, so a concurrent delete or edit of
//!   the same item is never undone.
//! - A failing unit is logged and excluded; it never fails its siblings.
//! - Results are keyed by item id, so no item is reported twice.

use crate::config::BatchConfig;
use crate::model::item::{Item, ItemId};
use crate::pool::{join_all, PoolError, TaskHandle, WorkerPool};
use crate::repo::item_repo::{ItemStore, RepoError};
use dashmap::DashMap;
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const WORKER_POOL_NAME: &str = "item-worker";
const COORDINATOR_POOL_NAME: &str = "batch-coordinator";

/// Failure of a whole batch call.
#[derive(Debug)]
pub enum BatchError {
    /// The id snapshot could not be read.
    Store(RepoError),
    /// The worker pool could not run or report the batch.
    Pool(PoolError),
}

impl Display for BatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "failed to read item ids: {err}"),
            Self::Pool(err) => write!(f, "batch worker pool unavailable: {err}"),
        }
    }
}

impl Error for BatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Pool(err) => Some(err),
        }
    }
}

impl From<PoolError> for BatchError {
    fn from(value: PoolError) -> Self {
        Self::Pool(value)
    }
}

/// Terminal outcome of one per-item unit.
#[derive(Debug)]
pub enum ItemOutcome {
    /// Status was written as processed and the item was recorded.
    Transitioned,
    /// Item already carried the processed status when read or written.
    Skipped,
    /// Fetch or write failed.
    Failed(RepoError),
}

/// Summary of one batch call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Items transitioned by this call, in no particular order.
    pub transitioned: Vec<Item>,
    /// Ids that were already processed.
    pub skipped: usize,
    /// Ids whose unit failed.
    pub failed: Vec<ItemId>,
}

impl BatchReport {
    /// Number of ids this call resolved.
    pub fn total(&self) -> usize {
        self.transitioned.len() + self.skipped + self.failed.len()
    }
}

/// Handle to a batch running on the coordinator pool.
#[derive(Debug)]
pub struct BatchHandle {
    inner: TaskHandle<Result<BatchReport, BatchError>>,
}

impl BatchHandle {
    /// Blocks until the batch has fully completed.
    pub fn wait(self) -> Result<BatchReport, BatchError> {
        self.inner.wait()?
    }

    /// Returns whether the batch result is ready.
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

/// Batch processor over a shared item store.
///
/// Owns two pools for its whole lifetime: `config.workers` threads for
/// per-item units, and one coordinator thread for `process_all_async`.
pub struct BatchProcessor<S: ItemStore + 'static> {
    store: Arc<S>,
    config: BatchConfig,
    workers: WorkerPool,
    coordinator: WorkerPool,
}

impl<S: ItemStore + 'static> BatchProcessor<S> {
    /// Starts the worker and coordinator pools.
    ///
    /// # Errors
    /// - `BatchError::Pool` when `config.workers == 0` or threads cannot start.
    pub fn new(store: Arc<S>, config: BatchConfig) -> Result<Self, BatchError> {
        let workers = WorkerPool::new(WORKER_POOL_NAME, config.workers)?;
        let coordinator = WorkerPool::new(COORDINATOR_POOL_NAME, 1)?;
        Ok(Self {
            store,
            config,
            workers,
            coordinator,
        })
    }

    /// Processes every stored item and blocks until all units are done.
    ///
    /// # Contract
    /// - Ids are read once; items created afterwards are not part of the run.
    /// - `transitioned` holds only items this call wrote as processed.
    ///
    /// # Errors
    /// - `BatchError::Store` when the id snapshot cannot be read.
    /// - `BatchError::Pool` when work cannot be submitted or a worker vanished;
    ///   raised only after every submitted unit has been joined.
    pub fn process_all(&self) -> Result<BatchReport, BatchError> {
        let started_at = Instant::now();
        let ids = self.store.list_ids().map_err(|err| {
            error!(
                "event=batch_process module=batch status=error error_code=list_ids_failed error={}",
                err
            );
            BatchError::Store(err)
        })?;
        info!(
            "event=batch_process module=batch status=start ids={} workers={}",
            ids.len(),
            self.workers.size()
        );

        let results: Arc<DashMap<ItemId, Item>> = Arc::new(DashMap::with_capacity(ids.len()));
        let mut submitted = Vec::with_capacity(ids.len());
        let mut handles = Vec::with_capacity(ids.len());
        let mut pool_error = None;

        for id in ids {
            let store = Arc::clone(&self.store);
            let results = Arc::clone(&results);
            let delay = self.config.item_delay;
            match self
                .workers
                .submit(move || process_one(store.as_ref(), &results, id, delay))
            {
                Ok(handle) => {
                    submitted.push(id);
                    handles.push(handle);
                }
                Err(err) => {
                    pool_error = Some(err);
                    break;
                }
            }
        }

        let mut report = BatchReport::default();
        for (id, outcome) in submitted.into_iter().zip(join_all(handles)) {
            match outcome {
                Ok(ItemOutcome::Transitioned) => {}
                Ok(ItemOutcome::Skipped) => report.skipped += 1,
                Ok(ItemOutcome::Failed(err)) => {
                    warn!(
                        "event=batch_item module=batch status=error item_id={} error={}",
                        id, err
                    );
                    report.failed.push(id);
                }
                Err(PoolError::TaskPanicked(message)) => {
                    error!(
                        "event=batch_item module=batch status=error item_id={} error_code=panicked error={}",
                        id, message
                    );
                    report.failed.push(id);
                }
                Err(err) => {
                    error!(
                        "event=batch_item module=batch status=error item_id={} error_code=pool error={}",
                        id, err
                    );
                    report.failed.push(id);
                    pool_error.get_or_insert(err);
                }
            }
        }

        if let Some(err) = pool_error {
            error!(
                "event=batch_process module=batch status=error duration_ms={} error_code=pool_unavailable error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(BatchError::Pool(err));
        }

        report.transitioned = results
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        info!(
            "event=batch_process module=batch status=ok duration_ms={} transitioned={} skipped={} failed={}",
            started_at.elapsed().as_millis(),
            report.transitioned.len(),
            report.skipped,
            report.failed.len()
        );
        Ok(report)
    }

    /// Runs `process_all` on the coordinator thread and returns immediately.
    ///
    /// Batches submitted concurrently run one after another.
    pub fn process_all_async(self: &Arc<Self>) -> Result<BatchHandle, BatchError> {
        let processor = Arc::clone(self);
        let inner = self.coordinator.submit(move || processor.process_all())?;
        Ok(BatchHandle { inner })
    }

    /// Drains pending batches, then stops both pools.
    ///
    /// Idempotent; later calls to `process_all*` fail with `BatchError::Pool`.
    pub fn shutdown(&self) {
        self.coordinator.shutdown();
        self.workers.shutdown();
    }
}

fn process_one<S: ItemStore + ?Sized>(
    store: &S,
    results: &DashMap<ItemId, Item>,
    id: ItemId,
    delay: Duration,
) -> ItemOutcome {
    if !delay.is_zero() {
        thread::sleep(delay);
    }

    let item = match store.get_item(id) {
        Ok(Some(item)) => item,
        Ok(None) => return ItemOutcome::Failed(RepoError::NotFound(id)),
        Err(err) => return ItemOutcome::Failed(err),
    };

    if item.is_processed() {
        debug!("event=batch_item module=batch status=skip item_id={id}");
        return ItemOutcome::Skipped;
    }

    match store.mark_processed(id) {
        Ok(Some(saved)) => {
            results.insert(id, saved);
            debug!("event=batch_item module=batch status=ok item_id={id}");
            ItemOutcome::Transitioned
        }
        // Processed by another batch between the read and the write.
        Ok(None) => {
            debug!("event=batch_item module=batch status=skip item_id={id}");
            ItemOutcome::Skipped
        }
        Err(err) => ItemOutcome::Failed(err),
    }
}
