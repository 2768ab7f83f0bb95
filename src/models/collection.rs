use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::models::{MaterialResponse, UserSummary};
use crate::utils::error::AppError;

/// Estados do ciclo de vida de uma coleta.
/// SCHEDULED → IN_ROUTE → COMPLETED; CANCELED a partir de SCHEDULED ou IN_ROUTE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectionStatus {
    Scheduled,
    InRoute,
    Completed,
    Canceled,
}

impl CollectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionStatus::Scheduled => "SCHEDULED",
            CollectionStatus::InRoute => "IN_ROUTE",
            CollectionStatus::Completed => "COMPLETED",
            CollectionStatus::Canceled => "CANCELED",
        }
    }

    pub fn parse(s: &str) -> Option<CollectionStatus> {
        match s {
            "SCHEDULED" => Some(CollectionStatus::Scheduled),
            "IN_ROUTE" => Some(CollectionStatus::InRoute),
            "COMPLETED" => Some(CollectionStatus::Completed),
            "CANCELED" => Some(CollectionStatus::Canceled),
            _ => None,
        }
    }
}

impl fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coleta agendada (armazenada no MongoDB)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Identificador primário da aplicação (UUID)
    pub collection_id: String,

    pub requester_id: String,

    /// Null até uma cooperativa assumir a coleta
    pub cooperative_id: Option<String>,

    pub latitude: f64,
    pub longitude: f64,
    pub pickup_date: DateTime<Utc>,
    pub status: CollectionStatus,
    pub notes: Option<String>,

    /// Peso registrado na conclusão
    pub weight_kg: Option<f64>,

    pub created_at: i64,
    pub updated_at: i64,
}

/// Item de material de uma coleta (um documento por linha)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionMaterial {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub item_id: String,
    pub collection_id: String,
    pub material_id: String,

    /// Descrição livre de quantidade ("2 sacos", "5kg", ...)
    pub quantity: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MaterialLineRequest {
    pub material_id: String,
    pub quantity: Option<String>,
}

/// Request de agendamento de coleta
#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScheduleCollectionRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub pickup_date: DateTime<Utc>,
    pub materials: Vec<MaterialLineRequest>,
    pub notes: Option<String>,
}

impl ScheduleCollectionRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        if !(-90.0..=90.0).contains(&self.latitude) {
            errors.push("Latitude inválida.".to_string());
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            errors.push("Longitude inválida.".to_string());
        }
        if self.materials.is_empty() {
            errors.push("Pelo menos um material deve ser especificado.".to_string());
        }
        for line in &self.materials {
            if Uuid::parse_str(&line.material_id).is_err() {
                errors.push("ID do material inválido.".to_string());
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

/// Request de atualização de status (apenas cooperativas)
#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateCollectionStatusRequest {
    pub status: CollectionStatus,
    pub cooperative_id: Option<String>,
    pub weight_kg: Option<f64>,
}

impl UpdateCollectionStatusRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        if let Some(cooperative_id) = &self.cooperative_id {
            if Uuid::parse_str(cooperative_id).is_err() {
                errors.push("ID da cooperativa inválido.".to_string());
            }
        }
        if let Some(weight_kg) = self.weight_kg {
            if weight_kg < 0.0 {
                errors.push("O peso deve ser um número positivo.".to_string());
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

/// Item de material hidratado na resposta
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CollectionMaterialResponse {
    pub id: String,
    pub quantity: Option<String>,
    pub material: MaterialResponse,
}

/// Coleta completa, com solicitante, cooperativa e materiais aninhados
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CollectionResponse {
    pub id: String,
    pub requester_id: String,
    pub cooperative_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub pickup_date: DateTime<Utc>,
    pub status: CollectionStatus,
    pub notes: Option<String>,
    pub weight_kg: Option<f64>,
    pub materials: Vec<CollectionMaterialResponse>,
    pub requester: UserSummary,
    pub cooperative: Option<UserSummary>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> ScheduleCollectionRequest {
        ScheduleCollectionRequest {
            latitude: -23.55,
            longitude: -46.63,
            pickup_date: Utc::now(),
            materials: vec![MaterialLineRequest {
                material_id: "7f8a1c9e-1b2d-4e5f-9a0b-3c4d5e6f7a8b".into(),
                quantity: Some("2 sacos".into()),
            }],
            notes: None,
        }
    }

    #[test]
    fn status_serializes_in_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&CollectionStatus::InRoute).unwrap(),
            "\"IN_ROUTE\""
        );
        assert_eq!(
            serde_json::to_string(&CollectionStatus::Scheduled).unwrap(),
            "\"SCHEDULED\""
        );
    }

    #[test]
    fn status_parse_roundtrip() {
        for status in [
            CollectionStatus::Scheduled,
            CollectionStatus::InRoute,
            CollectionStatus::Completed,
            CollectionStatus::Canceled,
        ] {
            assert_eq!(CollectionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(CollectionStatus::parse("DONE"), None);
        assert_eq!(CollectionStatus::parse("scheduled"), None);
    }

    #[test]
    fn schedule_request_with_one_valid_material_passes() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn schedule_request_without_materials_always_fails() {
        let mut request = valid_request();
        request.materials.clear();
        match request.validate() {
            Err(AppError::Validation(errors)) => {
                assert!(errors
                    .iter()
                    .any(|e| e == "Pelo menos um material deve ser especificado."));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn schedule_request_rejects_non_uuid_material_id() {
        let mut request = valid_request();
        request.materials[0].material_id = "papel".into();
        match request.validate() {
            Err(AppError::Validation(errors)) => {
                assert!(errors.iter().any(|e| e == "ID do material inválido."));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn schedule_request_rejects_out_of_range_coordinates() {
        let mut request = valid_request();
        request.latitude = 90.5;
        request.longitude = 181.0;
        match request.validate() {
            Err(AppError::Validation(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn status_update_rejects_negative_weight() {
        let request = UpdateCollectionStatusRequest {
            status: CollectionStatus::Completed,
            cooperative_id: None,
            weight_kg: Some(-1.0),
        };
        match request.validate() {
            Err(AppError::Validation(errors)) => {
                assert_eq!(errors, vec!["O peso deve ser um número positivo."]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn status_update_accepts_zero_weight_and_valid_cooperative() {
        let request = UpdateCollectionStatusRequest {
            status: CollectionStatus::Completed,
            cooperative_id: Some("7f8a1c9e-1b2d-4e5f-9a0b-3c4d5e6f7a8b".into()),
            weight_kg: Some(0.0),
        };
        assert!(request.validate().is_ok());
    }
}
