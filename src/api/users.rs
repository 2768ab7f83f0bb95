use actix_web::{web, HttpResponse, ResponseError};
use serde::Deserialize;

use crate::database::MongoDB;
use crate::models::{UpdateUserRequest, UserRole};
use crate::services::auth_service::Claims;
use crate::services::user_service;
use crate::utils::error::AppError;

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub role: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    responses(
        (status = 200, description = "Authenticated user's profile", body = crate::models::UserProfile),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_profile(user: web::ReqData<Claims>, db: web::Data<MongoDB>) -> HttpResponse {
    log::info!("👤 GET /api/users/me - user: {}", user.sub);

    match user_service::find_user_by_id(&db, &user.sub).await {
        Ok(profile) => HttpResponse::Ok().json(profile),
        Err(e) => {
            log::warn!("❌ Profile fetch failed: {} - {}", user.sub, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/users/me",
    tag = "Users",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated profile", body = crate::models::UserProfile),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_profile(
    user: web::ReqData<Claims>,
    db: web::Data<MongoDB>,
    request: web::Json<UpdateUserRequest>,
) -> HttpResponse {
    log::info!("✏️ PUT /api/users/me - user: {}", user.sub);

    if let Err(e) = request.validate() {
        log::warn!("❌ Profile update rejected: {} - {}", user.sub, e);
        return e.error_response();
    }

    match user_service::update_user(&db, &user.sub, &request).await {
        Ok(profile) => {
            log::info!("✅ Profile updated: {}", user.sub);
            HttpResponse::Ok().json(profile)
        }
        Err(e) => {
            log::warn!("❌ Profile update failed: {} - {}", user.sub, e);
            e.error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    params(
        ("role" = Option<String>, Query, description = "Filtra por papel (CITIZEN, COMPANY, COOPERATIVE)")
    ),
    responses(
        (status = 200, description = "User list", body = [crate::models::UserProfile]),
        (status = 403, description = "Caller is not a cooperative")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(db: web::Data<MongoDB>, query: web::Query<ListUsersQuery>) -> HttpResponse {
    log::info!("📋 GET /api/users - role filter: {:?}", query.role);

    let role = match query.role.as_deref() {
        Some(value) => match UserRole::parse(value) {
            Some(role) => Some(role),
            None => {
                return AppError::Validation(vec!["Papel de usuário inválido.".to_string()])
                    .error_response();
            }
        },
        None => None,
    };

    match user_service::list_users(&db, role).await {
        Ok(users) => HttpResponse::Ok().json(users),
        Err(e) => {
            log::error!("❌ Failed to list users: {}", e);
            e.error_response()
        }
    }
}

pub async fn get_user_by_id(db: web::Data<MongoDB>, path: web::Path<String>) -> HttpResponse {
    let user_id = path.into_inner();
    log::info!("👤 GET /api/users/{}", user_id);

    match user_service::find_user_by_id(&db, &user_id).await {
        Ok(profile) => HttpResponse::Ok().json(profile),
        Err(e) => {
            log::warn!("❌ User fetch failed: {} - {}", user_id, e);
            e.error_response()
        }
    }
}
