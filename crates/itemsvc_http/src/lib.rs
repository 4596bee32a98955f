//! HTTP surface for the item service.
//!
//! # Responsibility
//! - Expose item CRUD and the batch processing endpoint over actix-web.
//! - Translate service failures into status codes and one error body shape.
//!
//! # Invariants
//! - Handlers never touch the store directly; every call goes through
//!   `ItemService`.
//! - Blocking service calls run on the actix blocking pool, never on the
//!   async worker.

pub mod error;
pub mod routes;

pub use error::{ApiError, ErrorBody};
pub use routes::{configure_routes, AppService, HealthStatus};

/// Version string reported by `/health`.
pub fn http_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
