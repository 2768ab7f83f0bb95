use actix_web::{web, HttpResponse, ResponseError};

use crate::database::MongoDB;
use crate::services::collection_service;

#[utoipa::path(
    get,
    path = "/api/materials",
    tag = "Materials",
    responses(
        (status = 200, description = "Material catalog ordered by name", body = [crate::models::MaterialResponse])
    )
)]
pub async fn list_materials(db: web::Data<MongoDB>) -> HttpResponse {
    log::info!("♻️ GET /api/materials");

    match collection_service::list_materials(&db).await {
        Ok(materials) => HttpResponse::Ok().json(materials),
        Err(e) => {
            log::error!("❌ Failed to list materials: {}", e);
            e.error_response()
        }
    }
}
