//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store, mapper and batch calls into use-case level APIs.
//! - Keep the HTTP layer decoupled from storage details.

pub mod item_service;
