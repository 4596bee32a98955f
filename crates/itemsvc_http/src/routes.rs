//! Route table and handlers.
//!
//! Handlers take the service as `web::Data<AppService>`; the binary builds it
//! once and shares it across every server worker.

use crate::error::ApiError;
use actix_web::{web, HttpRequest, HttpResponse};
use itemsvc_core::{items_of, ItemDto, ItemId, ItemService, ServiceError, SqliteItemStore};
use log::debug;
use serde::{Deserialize, Serialize};

/// Service type shared through `web::Data`.
pub type AppService = ItemService<SqliteItemStore>;

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

/// Registers `/health` and the `/items` scope.
///
/// `/items/process` is registered ahead of `/items/{id}` so it is never read
/// as an id.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(path_config())
        .route("/health", web::get().to(health))
        .service(
            web::scope("/items")
                .route("", web::get().to(list_items))
                .route("", web::post().to(create_item))
                .route("/process", web::get().to(process_items))
                .route("/{id}", web::get().to(get_item))
                .route("/{id}", web::put().to(update_item))
                .route("/{id}", web::delete().to(delete_item)),
        );
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req: &HttpRequest| {
        ApiError::BadRequest(format!("Malformed item body: {err}")).into()
    })
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req: &HttpRequest| {
        ApiError::BadRequest(format!("Invalid item id: {err}")).into()
    })
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthStatus {
        status: "UP".to_string(),
        version: crate::http_version().to_string(),
    })
}

async fn list_items(service: web::Data<AppService>) -> Result<HttpResponse, ApiError> {
    let items = web::block(move || service.list_all()).await??;
    Ok(HttpResponse::Ok().json(items))
}

async fn get_item(
    service: web::Data<AppService>,
    id: web::Path<ItemId>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let item = web::block(move || service.get_by_id(id)).await??;
    Ok(HttpResponse::Ok().json(item))
}

async fn create_item(
    service: web::Data<AppService>,
    body: web::Json<ItemDto>,
) -> Result<HttpResponse, ApiError> {
    let dto = ItemDto {
        id: None,
        ..body.into_inner()
    };
    let created = web::block(move || service.save(&dto)).await??;
    Ok(HttpResponse::Created().json(created))
}

async fn update_item(
    service: web::Data<AppService>,
    id: web::Path<ItemId>,
    body: web::Json<ItemDto>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let dto = body.into_inner();
    let updated = web::block(move || service.update(id, &dto)).await??;
    Ok(HttpResponse::Ok().json(updated))
}

async fn delete_item(
    service: web::Data<AppService>,
    id: web::Path<ItemId>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    web::block(move || service.delete_by_id(id)).await??;
    Ok(HttpResponse::NoContent().finish())
}

async fn process_items(service: web::Data<AppService>) -> Result<HttpResponse, ApiError> {
    let handle = service.process_all_async()?;
    debug!("event=http_process module=http status=start");
    let report = web::block(move || handle.wait())
        .await?
        .map_err(ServiceError::from)?;
    Ok(HttpResponse::Ok().json(items_of(report)))
}
