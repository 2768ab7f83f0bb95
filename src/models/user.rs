use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::error::AppError;

/// Papéis de usuário do sistema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Citizen,
    Company,
    Cooperative,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Citizen => "CITIZEN",
            UserRole::Company => "COMPANY",
            UserRole::Cooperative => "COOPERATIVE",
        }
    }

    pub fn parse(s: &str) -> Option<UserRole> {
        match s {
            "CITIZEN" => Some(UserRole::Citizen),
            "COMPANY" => Some(UserRole::Company),
            "COOPERATIVE" => Some(UserRole::Cooperative),
            _ => None,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Usuário (armazenado no MongoDB)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Identificador primário da aplicação (UUID)
    pub user_id: String,

    pub name: String,
    pub email: String,

    /// Hash bcrypt — nunca sai em respostas da API
    pub password: String,

    pub role: UserRole,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    /// Timestamps Unix (segundos)
    pub created_at: i64,
    pub updated_at: i64,
}

/// Perfil público completo (sem o hash de senha)
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        UserProfile {
            id: user.user_id,
            name: user.name,
            email: user.email,
            role: user.role,
            phone: user.phone,
            address: user.address,
            latitude: user.latitude,
            longitude: user.longitude,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Resumo de usuário aninhado nas respostas de coleta
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        UserSummary {
            id: user.user_id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            address: user.address,
            latitude: user.latitude,
            longitude: user.longitude,
        }
    }
}

/// Request de atualização de perfil (todos os campos opcionais)
#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        if let Some(name) = &self.name {
            if name.chars().count() < 3 {
                errors.push("O nome deve ter pelo menos 3 caracteres.".to_string());
            }
        }
        if let Some(email) = &self.email {
            if !is_valid_email(email) {
                errors.push("Formato de email inválido.".to_string());
            }
        }
        if let Some(password) = &self.password {
            if password.chars().count() < 6 {
                errors.push("A senha deve ter pelo menos 6 caracteres.".to_string());
            }
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

pub fn is_valid_email(email: &str) -> bool {
    if email.contains(char::is_whitespace) {
        return false;
    }
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_in_uppercase() {
        assert_eq!(
            serde_json::to_string(&UserRole::Citizen).unwrap(),
            "\"CITIZEN\""
        );
        assert_eq!(
            serde_json::to_string(&UserRole::Cooperative).unwrap(),
            "\"COOPERATIVE\""
        );
    }

    #[test]
    fn role_parse_roundtrip() {
        for role in [UserRole::Citizen, UserRole::Company, UserRole::Cooperative] {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::parse("ADMIN"), None);
        assert_eq!(UserRole::parse("citizen"), None);
    }

    #[test]
    fn email_validation_accepts_common_addresses() {
        assert!(is_valid_email("ana@example.com"));
        assert!(is_valid_email("coop.recicla+tag@mail.com.br"));
    }

    #[test]
    fn email_validation_rejects_malformed_addresses() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("sem-arroba.com"));
        assert!(!is_valid_email("@dominio.com"));
        assert!(!is_valid_email("ana@semponto"));
        assert!(!is_valid_email("ana@.com."));
        assert!(!is_valid_email("ana maria@example.com"));
    }

    #[test]
    fn update_request_collects_field_errors() {
        let request = UpdateUserRequest {
            name: Some("ab".into()),
            email: Some("invalido".into()),
            password: Some("123".into()),
            phone: None,
            address: None,
            latitude: Some(91.0),
            longitude: Some(-200.0),
        };
        match request.validate() {
            Err(AppError::Validation(errors)) => assert_eq!(errors.len(), 5),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn empty_update_request_is_valid() {
        let request = UpdateUserRequest {
            name: None,
            email: None,
            password: None,
            phone: None,
            address: None,
            latitude: None,
            longitude: None,
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn profile_never_carries_the_password_hash() {
        let user = User {
            id: None,
            user_id: "u-1".into(),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            password: "$2b$12$hash".into(),
            role: UserRole::Citizen,
            phone: None,
            address: None,
            latitude: None,
            longitude: None,
            created_at: 0,
            updated_at: 0,
        };
        let json = serde_json::to_value(UserProfile::from(user)).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["id"], "u-1");
        assert_eq!(json["role"], "CITIZEN");
    }
}
