//! Item domain model.
//!
//! # Responsibility
//! - Define the record persisted by the item store.
//! - Validate required fields and the email shape before persistence.
//!
//! # Invariants
//! - `id` is `None` only for items that were never saved.
//! - `status == PROCESSED_STATUS` is the only status value with meaning to core.
//! - Once an item is marked processed, batch processing never reverts it.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for stored items.
pub type ItemId = Uuid;

/// Status written by batch processing.
pub const PROCESSED_STATUS: &str = "PROCESSED";

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
        .expect("valid email regex")
});

/// Field-level validation failure for an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemValidationError {
    /// A required text field is empty or whitespace only.
    MissingField(&'static str),
    /// `email` does not look like `local@domain.tld`.
    InvalidEmail(String),
}

impl ItemValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingField(field) => field,
            Self::InvalidEmail(_) => "email",
        }
    }
}

impl Display for ItemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => {
                write!(f, "{field}: {} is mandatory!", capitalize(field))
            }
            Self::InvalidEmail(_) => write!(f, "email: Email is invalid!"),
        }
    }
}

impl Error for ItemValidationError {}

/// Stored item record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Assigned by the store on first save, immutable afterwards.
    pub id: Option<ItemId>,
    pub name: String,
    pub description: String,
    /// Free-text tag. Only `PROCESSED_STATUS` is interpreted.
    pub status: String,
    /// Unique across all stored items.
    pub email: String,
}

impl Item {
    /// Creates an unsaved item. The store assigns `id` on save.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        status: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: description.into(),
            status: status.into(),
            email: email.into(),
        }
    }

    /// Checks required fields and the email pattern.
    ///
    /// Fields are checked in declaration order; the first failure is returned.
    pub fn validate(&self) -> Result<(), ItemValidationError> {
        require("name", &self.name)?;
        require("description", &self.description)?;
        require("status", &self.status)?;
        require("email", &self.email)?;
        if !EMAIL_RE.is_match(&self.email) {
            return Err(ItemValidationError::InvalidEmail(self.email.clone()));
        }
        Ok(())
    }

    /// Returns whether the item already carries `PROCESSED_STATUS`.
    pub fn is_processed(&self) -> bool {
        self.status == PROCESSED_STATUS
    }
}

fn require(field: &'static str, value: &str) -> Result<(), ItemValidationError> {
    if value.trim().is_empty() {
        return Err(ItemValidationError::MissingField(field));
    }
    Ok(())
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
