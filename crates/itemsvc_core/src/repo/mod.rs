//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the record store contract consumed by service and batch layers.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Store writes must enforce `Item::validate()` before persistence.
//! - Store APIs return semantic errors (`NotFound`, `Conflict`) in addition
//!   to DB transport errors.

pub mod item_repo;
