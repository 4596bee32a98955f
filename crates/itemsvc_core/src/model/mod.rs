//! Domain model for stored items.
//!
//! # Responsibility
//! - Define the canonical storage shape of an item.
//! - Own field validation rules shared by store and service layers.
//!
//! # Invariants
//! - Every persisted item carries a stable `ItemId` assigned by the store.
//! - Deletion is a hard delete; there are no tombstones.

pub mod item;
