use chrono::Utc;
use futures::stream::StreamExt;
use mongodb::bson::{doc, Document};

use crate::database::MongoDB;
use crate::models::{UpdateUserRequest, User, UserProfile, UserRole};
use crate::services::auth_service;
use crate::utils::error::AppError;

pub async fn find_user_by_id(db: &MongoDB, user_id: &str) -> Result<UserProfile, AppError> {
    let collection = db.collection::<User>("users");

    collection
        .find_one(doc! { "user_id": user_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .map(UserProfile::from)
        .ok_or_else(|| AppError::NotFound("Usuário não encontrado.".to_string()))
}

/// Monta o `$set` parcial da atualização de perfil.
/// A senha chega já hasheada; campos ausentes não entram no documento.
pub(crate) fn build_update_document(
    request: &UpdateUserRequest,
    password_hash: Option<String>,
    now: i64,
) -> Document {
    let mut set = doc! { "updated_at": now };
    if let Some(name) = &request.name {
        set.insert("name", name.as_str());
    }
    if let Some(email) = &request.email {
        set.insert("email", email.as_str());
    }
    if let Some(hash) = password_hash {
        set.insert("password", hash);
    }
    if let Some(phone) = &request.phone {
        set.insert("phone", phone.as_str());
    }
    if let Some(address) = &request.address {
        set.insert("address", address.as_str());
    }
    if let Some(latitude) = request.latitude {
        set.insert("latitude", latitude);
    }
    if let Some(longitude) = request.longitude {
        set.insert("longitude", longitude);
    }
    set
}

pub async fn update_user(
    db: &MongoDB,
    user_id: &str,
    request: &UpdateUserRequest,
) -> Result<UserProfile, AppError> {
    let collection = db.collection::<User>("users");

    let existing = collection
        .find_one(doc! { "user_id": user_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    if existing.is_none() {
        return Err(AppError::NotFound("Usuário não encontrado.".to_string()));
    }

    // Email novo não pode pertencer a outro usuário
    if let Some(email) = &request.email {
        let taken = collection
            .find_one(doc! { "email": email, "user_id": { "$ne": user_id } })
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        if taken.is_some() {
            return Err(AppError::Conflict(
                "Usuário com este email já existe.".to_string(),
            ));
        }
    }

    let password_hash = match &request.password {
        Some(password) => Some(auth_service::hash_password(password)?),
        None => None,
    };
    let set = build_update_document(request, password_hash, Utc::now().timestamp());

    collection
        .update_one(doc! { "user_id": user_id }, doc! { "$set": set })
        .await
        .map_err(|e| AppError::Database(format!("Failed to update user: {}", e)))?;

    find_user_by_id(db, user_id).await
}

pub async fn list_users(
    db: &MongoDB,
    role: Option<UserRole>,
) -> Result<Vec<UserProfile>, AppError> {
    let collection = db.collection::<User>("users");

    let filter = match role {
        Some(role) => doc! { "role": role.as_str() },
        None => doc! {},
    };

    let mut cursor = collection
        .find(filter)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let mut users = Vec::new();
    while let Some(result) = cursor.next().await {
        let user = result.map_err(|e| AppError::Database(e.to_string()))?;
        users.push(UserProfile::from(user));
    }

    Ok(users)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_request() -> UpdateUserRequest {
        UpdateUserRequest {
            name: None,
            email: None,
            password: None,
            phone: None,
            address: None,
            latitude: None,
            longitude: None,
        }
    }

    #[test]
    fn update_document_only_carries_provided_fields() {
        let mut request = empty_request();
        request.name = Some("Ana Maria".into());
        request.latitude = Some(-23.5);

        let set = build_update_document(&request, None, 1700000000);

        assert_eq!(set.get_str("name").unwrap(), "Ana Maria");
        assert_eq!(set.get_f64("latitude").unwrap(), -23.5);
        assert_eq!(set.get_i64("updated_at").unwrap(), 1700000000);
        assert!(!set.contains_key("email"));
        assert!(!set.contains_key("password"));
        assert!(!set.contains_key("phone"));
    }

    #[test]
    fn update_document_stores_the_hash_not_the_password() {
        let mut request = empty_request();
        request.password = Some("senha-nova".into());

        let set = build_update_document(&request, Some("$2b$12$rehashed".into()), 0);

        assert_eq!(set.get_str("password").unwrap(), "$2b$12$rehashed");
    }
}
