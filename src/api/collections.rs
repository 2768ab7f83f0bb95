use actix_web::{web, HttpResponse, ResponseError};
use serde::Deserialize;

use crate::database::MongoDB;
use crate::middleware::auth::require_role;
use crate::models::{
    CollectionStatus, ScheduleCollectionRequest, UpdateCollectionStatusRequest, UserRole,
};
use crate::services::auth_service::Claims;
use crate::services::collection_service::{self, CollectionFilter};
use crate::seeds::materials_seed;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCollectionsQuery {
    pub status: Option<String>,
    pub cooperative_id: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/collections",
    tag = "Collections",
    request_body = ScheduleCollectionRequest,
    responses(
        (status = 201, description = "Collection scheduled", body = crate::models::CollectionResponse),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Caller is not a citizen or company")
    ),
    security(("bearer_auth" = []))
)]
pub async fn schedule_collection(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    request: web::Json<ScheduleCollectionRequest>,
) -> HttpResponse {
    log::info!("📦 POST /api/collections - requester: {}", user.sub);

    // GET e POST dividem o mesmo recurso; o allow-set do POST é checado aqui
    if let Err(e) = require_role(&user, &[UserRole::Citizen, UserRole::Company]) {
        log::warn!("❌ Schedule rejected for {}: {}", user.sub, e);
        return e.error_response();
    }
    if let Err(e) = request.validate() {
        log::warn!("❌ Schedule rejected for {}: {}", user.sub, e);
        return e.error_response();
    }

    match collection_service::schedule_collection(&db, &user.sub, &request).await {
        Ok(collection) => {
            log::info!("✅ Collection scheduled: {}", collection.id);
            HttpResponse::Created().json(collection)
        }
        Err(e) => {
            log::warn!("❌ Schedule failed for {}: {}", user.sub, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/collections",
    tag = "Collections",
    params(
        ("status" = Option<String>, Query, description = "Estreita por status (valor inválido é ignorado)"),
        ("cooperativeId" = Option<String>, Query, description = "Cooperativa alvo da listagem")
    ),
    responses(
        (status = 200, description = "Role-scoped collection list", body = [crate::models::CollectionResponse])
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_collections(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    query: web::Query<ListCollectionsQuery>,
) -> HttpResponse {
    log::info!(
        "📋 GET /api/collections - caller: {} ({})",
        user.sub,
        user.role
    );

    let status = query.status.as_deref().and_then(CollectionStatus::parse);
    let filter = CollectionFilter::for_caller(&user, status, query.cooperative_id.as_deref());

    match collection_service::list_collections(&db, &filter).await {
        Ok(collections) => HttpResponse::Ok().json(collections),
        Err(e) => {
            log::error!("❌ Failed to list collections: {}", e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/collections/{id}",
    tag = "Collections",
    params(("id" = String, Path, description = "ID da coleta")),
    responses(
        (status = 200, description = "Collection details", body = crate::models::CollectionResponse),
        (status = 403, description = "Caller may not view this collection"),
        (status = 404, description = "Collection not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_collection_by_id(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
) -> HttpResponse {
    let collection_id = path.into_inner();
    log::info!(
        "🔍 GET /api/collections/{} - caller: {}",
        collection_id,
        user.sub
    );

    match collection_service::get_collection(&db, &collection_id, &user).await {
        Ok(collection) => HttpResponse::Ok().json(collection),
        Err(e) => {
            log::warn!("❌ Collection fetch failed: {} - {}", collection_id, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/collections/{id}/status",
    tag = "Collections",
    params(("id" = String, Path, description = "ID da coleta")),
    request_body = UpdateCollectionStatusRequest,
    responses(
        (status = 200, description = "Updated collection", body = crate::models::CollectionResponse),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Not allowed for this caller"),
        (status = 404, description = "Collection not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_collection_status(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    path: web::Path<String>,
    request: web::Json<UpdateCollectionStatusRequest>,
) -> HttpResponse {
    let collection_id = path.into_inner();
    log::info!(
        "🔄 PUT /api/collections/{}/status - cooperative: {} → {}",
        collection_id,
        user.sub,
        request.status
    );

    // O escopo já exige COOPERATIVE; a checagem se repete aqui por segurança
    if let Err(e) = require_role(&user, &[UserRole::Cooperative]) {
        return e.error_response();
    }
    if let Err(e) = request.validate() {
        log::warn!("❌ Status update rejected: {} - {}", collection_id, e);
        return e.error_response();
    }

    match collection_service::update_collection_status(&db, &collection_id, &user.sub, &request)
        .await
    {
        Ok(collection) => {
            log::info!(
                "✅ Collection {} now {} (cooperative {})",
                collection_id,
                collection.status,
                user.sub
            );
            HttpResponse::Ok().json(collection)
        }
        Err(e) => {
            log::warn!("❌ Status update failed: {} - {}", collection_id, e);
            e.error_response()
        }
    }
}

pub async fn seed_materials(user: web::ReqData<Claims>, db: web::Data<MongoDB>) -> HttpResponse {
    log::info!(
        "🌱 POST /api/collections/seed-materials - cooperative: {}",
        user.sub
    );

    match materials_seed::seed_base_materials(&db).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "message": "Materiais pré-populados com sucesso!",
        })),
        Err(e) => {
            log::error!("❌ Material seed failed: {}", e);
            e.error_response()
        }
    }
}
