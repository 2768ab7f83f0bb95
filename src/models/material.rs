use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Material reciclável do catálogo (armazenado no MongoDB)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Identificador primário da aplicação (UUID)
    pub material_id: String,

    /// Nome único no catálogo
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

impl From<Material> for MaterialResponse {
    fn from(material: Material) -> Self {
        MaterialResponse {
            id: material.material_id,
            name: material.name,
            description: material.description,
        }
    }
}
