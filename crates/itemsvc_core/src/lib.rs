//! Core domain logic for the item service.
//! This crate is the single source of truth for business invariants.

pub mod batch;
pub mod config;
pub mod db;
pub mod logging;
pub mod mapper;
pub mod model;
pub mod pool;
pub mod repo;
pub mod service;

pub use batch::{BatchError, BatchHandle, BatchProcessor, BatchReport, ItemOutcome};
pub use config::{BatchConfig, DEFAULT_ITEM_DELAY, DEFAULT_WORKERS};
pub use logging::{
    default_log_level, init_logging, init_stderr_logging, logging_status, LogTarget,
};
pub use mapper::{to_storage, to_wire, ItemDto};
pub use model::item::{Item, ItemId, ItemValidationError, PROCESSED_STATUS};
pub use pool::{join_all, PoolError, TaskHandle, WorkerPool};
pub use repo::item_repo::{ItemStore, RepoError, RepoResult, SqliteItemStore};
pub use service::item_service::{items_of, ItemService, ServiceError, ServiceResult};
