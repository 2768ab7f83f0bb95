use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::doc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::MongoDB;
use crate::models::{is_valid_email, User, UserProfile, UserRole};
use crate::utils::error::AppError;

/// Mensagem única para email desconhecido e senha incorreta
pub const INVALID_CREDENTIALS: &str = "Credenciais inválidas: Email ou senha incorretos.";

// JWT Claims — payload mínimo: identidade + papel
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user_id
    pub role: UserRole,
    pub iat: usize, // issued at
    pub exp: usize, // expiration
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        if self.name.chars().count() < 3 {
            errors.push("O nome deve ter pelo menos 3 caracteres.".to_string());
        }
        if !is_valid_email(&self.email) {
            errors.push("Formato de email inválido.".to_string());
        }
        if self.password.chars().count() < 6 {
            errors.push("A senha deve ter pelo menos 6 caracteres.".to_string());
        }
        if let Some(latitude) = self.latitude {
            if !(-90.0..=90.0).contains(&latitude) {
                errors.push("Latitude inválida.".to_string());
            }
        }
        if let Some(longitude) = self.longitude {
            if !(-180.0..=180.0).contains(&longitude) {
                errors.push("Longitude inválida.".to_string());
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        if !is_valid_email(&self.email) {
            errors.push("Formato de email inválido.".to_string());
        }
        if self.password.chars().count() < 6 {
            errors.push("A senha deve ter pelo menos 6 caracteres.".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub user: UserProfile,
    pub token: String,
}

fn get_jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| "default-secret-change-me".to_string())
}

// Generate JWT token (expira em 1 dia)
pub fn generate_token(user_id: &str, role: UserRole) -> Result<String, AppError> {
    let iat = Utc::now().timestamp() as usize;
    let exp = (Utc::now() + Duration::days(1)).timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        role,
        iat,
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(get_jwt_secret().as_ref()),
    )
    .map_err(|e| AppError::Database(format!("Failed to generate token: {}", e)))
}

// Verify JWT token — expiração e assinatura inválida são erros distintos
pub fn verify_token(token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(get_jwt_secret().as_ref()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::Unauthorized("Token expirado.".to_string())
        }
        _ => AppError::Unauthorized("Token inválido.".to_string()),
    })
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Database(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hashed: &str) -> Result<bool, AppError> {
    verify(password, hashed)
        .map_err(|e| AppError::Database(format!("Password verification error: {}", e)))
}

// User registration
pub async fn register(db: &MongoDB, request: &RegisterRequest) -> Result<AuthResponse, AppError> {
    let collection = db.collection::<User>("users");

    // Check if user already exists
    let existing = collection
        .find_one(doc! { "email": &request.email })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "Usuário com este email já existe.".to_string(),
        ));
    }

    let now = Utc::now().timestamp();
    let new_user = User {
        id: None,
        user_id: Uuid::new_v4().to_string(),
        name: request.name.clone(),
        email: request.email.clone(),
        password: hash_password(&request.password)?,
        role: request.role,
        phone: request.phone.clone(),
        address: request.address.clone(),
        latitude: request.latitude,
        longitude: request.longitude,
        created_at: now,
        updated_at: now,
    };

    collection
        .insert_one(&new_user)
        .await
        .map_err(|e| AppError::Database(format!("Failed to create user: {}", e)))?;

    let token = generate_token(&new_user.user_id, new_user.role)?;

    log::info!(
        "✅ User registered successfully: {} ({})",
        new_user.email,
        new_user.role
    );

    Ok(AuthResponse {
        user: UserProfile::from(new_user),
        token,
    })
}

// User login
pub async fn login(db: &MongoDB, request: &LoginRequest) -> Result<AuthResponse, AppError> {
    let collection = db.collection::<User>("users");

    let user = collection
        .find_one(doc! { "email": &request.email })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    let valid = verify_password(&request.password, &user.password)?;
    if !valid {
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let token = generate_token(&user.user_id, user.role)?;

    Ok(AuthResponse {
        user: UserProfile::from(user),
        token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_roundtrip_preserves_identity_and_role() {
        let token = generate_token("user-1", UserRole::Citizen).unwrap();
        let claims = verify_token(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.role, UserRole::Citizen);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let iat = (Utc::now() - Duration::days(2)).timestamp() as usize;
        let exp = (Utc::now() - Duration::days(1)).timestamp() as usize;
        let claims = Claims {
            sub: "user-1".to_string(),
            role: UserRole::Company,
            iat,
            exp,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(get_jwt_secret().as_ref()),
        )
        .unwrap();

        match verify_token(&token) {
            Err(AppError::Unauthorized(msg)) => assert_eq!(msg, "Token expirado."),
            other => panic!("expected expired-token error, got {:?}", other),
        }
    }

    #[test]
    fn tampered_token_is_reported_as_invalid() {
        let mut token = generate_token("user-1", UserRole::Cooperative).unwrap();
        token.push('A');

        match verify_token(&token) {
            Err(AppError::Unauthorized(msg)) => assert_eq!(msg, "Token inválido."),
            other => panic!("expected invalid-token error, got {:?}", other),
        }
    }

    #[test]
    fn garbage_token_is_reported_as_invalid() {
        match verify_token("definitivamente-nao-e-um-jwt") {
            Err(AppError::Unauthorized(msg)) => assert_eq!(msg, "Token inválido."),
            other => panic!("expected invalid-token error, got {:?}", other),
        }
    }

    #[test]
    fn password_hash_never_stores_plaintext_and_verifies() {
        let hashed = hash_password("segredo123").unwrap();
        assert_ne!(hashed, "segredo123");
        assert!(verify_password("segredo123", &hashed).unwrap());
        assert!(!verify_password("outra-senha", &hashed).unwrap());
    }

    #[test]
    fn register_request_validation_collects_all_errors() {
        let request = RegisterRequest {
            name: "ab".into(),
            email: "invalido".into(),
            password: "123".into(),
            role: UserRole::Citizen,
            phone: None,
            address: None,
            latitude: None,
            longitude: None,
        };
        match request.validate() {
            Err(AppError::Validation(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn login_request_validates_shape_before_credentials() {
        let request = LoginRequest {
            email: "ana@example.com".into(),
            password: "12345".into(),
        };
        match request.validate() {
            Err(AppError::Validation(errors)) => {
                assert_eq!(errors, vec!["A senha deve ter pelo menos 6 caracteres."]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
