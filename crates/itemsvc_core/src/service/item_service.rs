//! Item use-case service.
//!
//! # Responsibility
//! - Provide the find/save/update/delete entry points used by the HTTP layer.
//! - Translate store outcomes into caller-facing failures with stable messages.
//! - Delegate bulk processing to the batch processor.
//!
//! # Invariants
//! - Service APIs never bypass store validation/persistence contracts.
//! - An email owned by one item is never written onto another item.
//! - `update` never creates an item; `save` upserts.

use crate::batch::{BatchError, BatchHandle, BatchProcessor, BatchReport};
use crate::config::BatchConfig;
use crate::mapper::{to_storage, to_wire, ItemDto};
use crate::model::item::{ItemId, ItemValidationError};
use crate::repo::item_repo::{ItemStore, RepoError};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Service error for item use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Id or email lookup missed.
    NotFound(String),
    /// Email already belongs to another item.
    Conflict(String),
    /// A required field is missing or malformed.
    Validation(ItemValidationError),
    /// Persistence-layer failure.
    Store(RepoError),
    /// Batch call could not complete.
    Batch(BatchError),
}

impl ServiceError {
    fn id_not_found(id: ItemId) -> Self {
        Self::NotFound(format!("Item with id: {id} not found!"))
    }

    fn email_not_found(email: &str) -> Self {
        Self::NotFound(format!("Item with email: {email} not found!"))
    }

    fn email_taken(email: &str) -> Self {
        Self::Conflict(format!("Item with email: {email} already exists!"))
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(message) | Self::Conflict(message) => write!(f, "{message}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Batch(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Batch(err) => Some(err),
            Self::NotFound(_) | Self::Conflict(_) => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::id_not_found(id),
            RepoError::Conflict { email } => Self::email_taken(&email),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Store(other),
        }
    }
}

impl From<ItemValidationError> for ServiceError {
    fn from(value: ItemValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<BatchError> for ServiceError {
    fn from(value: BatchError) -> Self {
        Self::Batch(value)
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Item service facade over a store and a batch processor.
pub struct ItemService<S: ItemStore + 'static> {
    store: Arc<S>,
    processor: Arc<BatchProcessor<S>>,
}

impl<S: ItemStore + 'static> ItemService<S> {
    /// Creates a service and starts the batch pools for `config`.
    pub fn new(store: Arc<S>, config: BatchConfig) -> ServiceResult<Self> {
        let processor = BatchProcessor::new(Arc::clone(&store), config)?;
        Ok(Self::with_processor(store, Arc::new(processor)))
    }

    /// Creates a service around an existing processor.
    pub fn with_processor(store: Arc<S>, processor: Arc<BatchProcessor<S>>) -> Self {
        Self { store, processor }
    }

    /// Lists every item, oldest first.
    pub fn list_all(&self) -> ServiceResult<Vec<ItemDto>> {
        Ok(self.store.list_items()?.iter().map(to_wire).collect())
    }

    pub fn get_by_id(&self, id: ItemId) -> ServiceResult<ItemDto> {
        self.store
            .get_item(id)?
            .map(|item| to_wire(&item))
            .ok_or_else(|| ServiceError::id_not_found(id))
    }

    pub fn get_by_email(&self, email: &str) -> ServiceResult<ItemDto> {
        self.store
            .find_by_email(email)?
            .map(|item| to_wire(&item))
            .ok_or_else(|| ServiceError::email_not_found(email))
    }

    /// Validates and upserts `dto`.
    ///
    /// # Contract
    /// - `dto.id == None` creates an item with a store-assigned id.
    /// - Fails with `Conflict` when another item owns `dto.email`; the stored
    ///   owner is left untouched.
    pub fn save(&self, dto: &ItemDto) -> ServiceResult<ItemDto> {
        let item = to_storage(dto);
        item.validate()?;

        if let Some(owner) = self.store.find_by_email(&item.email)? {
            if owner.id != item.id {
                return Err(ServiceError::email_taken(&item.email));
            }
        }

        let saved = self.store.save_item(&item)?;
        info!(
            "event=item_save module=service status=ok item_id={}",
            saved.id.map(|id| id.to_string()).unwrap_or_default()
        );
        Ok(to_wire(&saved))
    }

    /// Replaces every field of an existing item.
    ///
    /// The path `id` wins over any id carried by `dto`.
    pub fn update(&self, id: ItemId, dto: &ItemDto) -> ServiceResult<ItemDto> {
        self.get_by_id(id)?;
        let dto = ItemDto {
            id: Some(id),
            ..dto.clone()
        };
        self.save(&dto)
    }

    pub fn delete_by_id(&self, id: ItemId) -> ServiceResult<()> {
        self.store.delete_item(id)?;
        info!("event=item_delete module=service status=ok item_id={id}");
        Ok(())
    }

    /// Processes all items and returns the ones transitioned by this call.
    pub fn process_all(&self) -> ServiceResult<Vec<ItemDto>> {
        Ok(items_of(self.processor.process_all()?))
    }

    /// Starts a batch on the coordinator and returns its handle.
    pub fn process_all_async(&self) -> ServiceResult<BatchHandle> {
        Ok(self.processor.process_all_async()?)
    }

    /// Stops batch pools. Pending batches complete first.
    pub fn shutdown(&self) {
        self.processor.shutdown();
    }
}

/// Wire view of the items a batch transitioned.
pub fn items_of(report: BatchReport) -> Vec<ItemDto> {
    report.transitioned.iter().map(to_wire).collect()
}
