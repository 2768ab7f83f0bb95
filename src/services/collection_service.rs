use std::collections::{HashMap, HashSet};

use chrono::Utc;
use futures::stream::StreamExt;
use mongodb::bson::{doc, Document};
use uuid::Uuid;

use crate::database::MongoDB;
use crate::models::{
    Collection, CollectionMaterial, CollectionMaterialResponse, CollectionResponse,
    CollectionStatus, Material, MaterialResponse, ScheduleCollectionRequest,
    UpdateCollectionStatusRequest, User, UserRole, UserSummary,
};
use crate::services::auth_service::Claims;
use crate::utils::error::AppError;

/// Escopo de visibilidade de uma listagem, derivado do papel do chamador.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionScope {
    /// Cidadão/empresa: apenas as próprias solicitações
    Requester(String),
    /// Cooperativa: coletas atribuídas à cooperativa indicada
    Cooperative(String),
    /// Cooperativa filtrando SCHEDULED: coletas agendadas ainda sem cooperativa
    UnassignedScheduled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionFilter {
    pub scope: CollectionScope,
    pub status: Option<CollectionStatus>,
}

impl CollectionFilter {
    /// Seleciona o escopo de forma determinística a partir de papel + query.
    pub fn for_caller(
        claims: &Claims,
        status: Option<CollectionStatus>,
        cooperative_id: Option<&str>,
    ) -> CollectionFilter {
        match claims.role {
            UserRole::Citizen | UserRole::Company => CollectionFilter {
                scope: CollectionScope::Requester(claims.sub.clone()),
                status,
            },
            UserRole::Cooperative => {
                if let Some(cooperative_id) = cooperative_id {
                    CollectionFilter {
                        scope: CollectionScope::Cooperative(cooperative_id.to_string()),
                        status,
                    }
                } else if status == Some(CollectionStatus::Scheduled) {
                    // Vitrine de coletas disponíveis para assumir
                    CollectionFilter {
                        scope: CollectionScope::UnassignedScheduled,
                        status: None,
                    }
                } else {
                    CollectionFilter {
                        scope: CollectionScope::Cooperative(claims.sub.clone()),
                        status,
                    }
                }
            }
        }
    }

    pub fn to_document(&self) -> Document {
        let mut filter = match &self.scope {
            CollectionScope::Requester(requester_id) => doc! { "requester_id": requester_id },
            CollectionScope::Cooperative(cooperative_id) => {
                doc! { "cooperative_id": cooperative_id }
            }
            CollectionScope::UnassignedScheduled => doc! {
                "cooperative_id": null,
                "status": CollectionStatus::Scheduled.as_str(),
            },
        };
        if let Some(status) = self.status {
            filter.insert("status", status.as_str());
        }
        filter
    }
}

/// Decide se o chamador pode ver a coleta: o solicitante sempre pode; uma
/// cooperativa pode quando a coleta é dela ou ainda está agendada sem dono.
pub fn can_view(claims: &Claims, collection: &Collection) -> bool {
    match claims.role {
        UserRole::Citizen | UserRole::Company => collection.requester_id == claims.sub,
        UserRole::Cooperative => {
            collection.cooperative_id.as_deref() == Some(claims.sub.as_str())
                || (collection.cooperative_id.is_none()
                    && collection.status == CollectionStatus::Scheduled)
        }
    }
}

/// Uma cooperativa não atribui trabalho a outra: `cooperativeId` no payload,
/// quando presente, precisa ser o próprio chamador.
fn check_assignment(caller_id: &str, requested: Option<&str>) -> Result<(), AppError> {
    match requested {
        Some(cooperative_id) if cooperative_id != caller_id => Err(AppError::Forbidden(
            "Você não tem permissão para atribuir esta coleta a outra cooperativa.".to_string(),
        )),
        _ => Ok(()),
    }
}

// Agendamento: pai + itens de material em uma única transação
pub async fn schedule_collection(
    db: &MongoDB,
    requester_id: &str,
    request: &ScheduleCollectionRequest,
) -> Result<CollectionResponse, AppError> {
    let materials_collection = db.collection::<Material>("materials");

    // Todo material referenciado precisa existir no catálogo
    let ids: Vec<String> = request
        .materials
        .iter()
        .map(|line| line.material_id.clone())
        .collect();
    let mut cursor = materials_collection
        .find(doc! { "material_id": { "$in": ids } })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    let mut known = HashSet::new();
    while let Some(result) = cursor.next().await {
        let material = result.map_err(|e| AppError::Database(e.to_string()))?;
        known.insert(material.material_id);
    }
    for line in &request.materials {
        if !known.contains(&line.material_id) {
            return Err(AppError::InvalidRequest(format!(
                "Material não encontrado: {}",
                line.material_id
            )));
        }
    }

    let now = Utc::now().timestamp();
    let collection = Collection {
        id: None,
        collection_id: Uuid::new_v4().to_string(),
        requester_id: requester_id.to_string(),
        cooperative_id: None,
        latitude: request.latitude,
        longitude: request.longitude,
        pickup_date: request.pickup_date,
        status: CollectionStatus::Scheduled,
        notes: request.notes.clone(),
        weight_kg: None,
        created_at: now,
        updated_at: now,
    };
    let items: Vec<CollectionMaterial> = request
        .materials
        .iter()
        .map(|line| CollectionMaterial {
            id: None,
            item_id: Uuid::new_v4().to_string(),
            collection_id: collection.collection_id.clone(),
            material_id: line.material_id.clone(),
            quantity: line.quantity.clone(),
        })
        .collect();

    let collections = db.collection::<Collection>("collections");
    let line_items = db.collection::<CollectionMaterial>("collection_materials");

    let mut session = db
        .client()
        .start_session()
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    session
        .start_transaction()
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let write: Result<(), mongodb::error::Error> = async {
        collections
            .insert_one(&collection)
            .session(&mut session)
            .await?;
        line_items.insert_many(&items).session(&mut session).await?;
        Ok(())
    }
    .await;

    match write {
        Ok(()) => {
            session
                .commit_transaction()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }
        Err(e) => {
            let _ = session.abort_transaction().await;
            return Err(AppError::Database(format!(
                "Failed to create collection: {}",
                e
            )));
        }
    }

    hydrate(db, collection).await
}

pub async fn list_collections(
    db: &MongoDB,
    filter: &CollectionFilter,
) -> Result<Vec<CollectionResponse>, AppError> {
    let collections = db.collection::<Collection>("collections");

    let mut cursor = collections
        .find(filter.to_document())
        .sort(doc! { "created_at": -1 })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let mut results = Vec::new();
    while let Some(result) = cursor.next().await {
        let collection = result.map_err(|e| AppError::Database(e.to_string()))?;
        results.push(hydrate(db, collection).await?);
    }

    Ok(results)
}

pub async fn get_collection(
    db: &MongoDB,
    collection_id: &str,
    claims: &Claims,
) -> Result<CollectionResponse, AppError> {
    let collections = db.collection::<Collection>("collections");

    let collection = collections
        .find_one(doc! { "collection_id": collection_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Coleta não encontrada.".to_string()))?;

    // Existência primeiro; recurso existente mas proibido responde 403
    if !can_view(claims, &collection) {
        return Err(AppError::Forbidden("Acesso negado a esta coleta.".to_string()));
    }

    hydrate(db, collection).await
}

pub async fn update_collection_status(
    db: &MongoDB,
    collection_id: &str,
    caller_id: &str,
    request: &UpdateCollectionStatusRequest,
) -> Result<CollectionResponse, AppError> {
    let collections = db.collection::<Collection>("collections");

    let exists = collections
        .find_one(doc! { "collection_id": collection_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    if exists.is_none() {
        return Err(AppError::NotFound("Coleta não encontrada.".to_string()));
    }

    check_assignment(caller_id, request.cooperative_id.as_deref())?;

    let mut set = doc! {
        "status": request.status.as_str(),
        "cooperative_id": caller_id,
        "updated_at": Utc::now().timestamp(),
    };
    if let Some(weight_kg) = request.weight_kg {
        set.insert("weight_kg", weight_kg);
    }

    // O status pedido é aplicado como veio; a escrita só é condicionada ao dono:
    // o primeiro claim vence e coleta de outra cooperativa não é sobrescrita.
    // TODO: validar que o status pedido é uma transição legal a partir do atual
    // (hoje nada impede SCHEDULED → COMPLETED direto, nem reviver CANCELED).
    let result = collections
        .update_one(
            doc! {
                "collection_id": collection_id,
                "$or": [
                    { "cooperative_id": null },
                    { "cooperative_id": caller_id },
                ],
            },
            doc! { "$set": set },
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to update collection: {}", e)))?;

    if result.matched_count == 0 {
        return Err(AppError::Forbidden(
            "Coleta já atribuída a outra cooperativa.".to_string(),
        ));
    }

    let updated = collections
        .find_one(doc! { "collection_id": collection_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Coleta não encontrada.".to_string()))?;

    hydrate(db, updated).await
}

pub async fn list_materials(db: &MongoDB) -> Result<Vec<MaterialResponse>, AppError> {
    let collection = db.collection::<Material>("materials");

    let mut cursor = collection
        .find(doc! {})
        .sort(doc! { "name": 1 })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let mut materials = Vec::new();
    while let Some(result) = cursor.next().await {
        let material = result.map_err(|e| AppError::Database(e.to_string()))?;
        materials.push(MaterialResponse::from(material));
    }

    Ok(materials)
}

/// Monta a resposta completa: itens + catálogo + solicitante + cooperativa.
async fn hydrate(db: &MongoDB, collection: Collection) -> Result<CollectionResponse, AppError> {
    let line_items = db.collection::<CollectionMaterial>("collection_materials");
    let materials_collection = db.collection::<Material>("materials");
    let users = db.collection::<User>("users");

    let mut cursor = line_items
        .find(doc! { "collection_id": &collection.collection_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    let mut items = Vec::new();
    while let Some(result) = cursor.next().await {
        items.push(result.map_err(|e| AppError::Database(e.to_string()))?);
    }

    let material_ids: Vec<String> = items.iter().map(|item| item.material_id.clone()).collect();
    let mut materials_by_id = HashMap::new();
    if !material_ids.is_empty() {
        let mut cursor = materials_collection
            .find(doc! { "material_id": { "$in": material_ids } })
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        while let Some(result) = cursor.next().await {
            let material = result.map_err(|e| AppError::Database(e.to_string()))?;
            materials_by_id.insert(material.material_id.clone(), material);
        }
    }

    let requester = users
        .find_one(doc! { "user_id": &collection.requester_id })
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .map(UserSummary::from)
        .ok_or_else(|| {
            AppError::Database(format!(
                "Requester {} missing for collection {}",
                collection.requester_id, collection.collection_id
            ))
        })?;

    let cooperative = match &collection.cooperative_id {
        Some(cooperative_id) => users
            .find_one(doc! { "user_id": cooperative_id })
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .map(UserSummary::from),
        None => None,
    };

    let mut materials = Vec::with_capacity(items.len());
    for item in items {
        let material = materials_by_id.get(&item.material_id).cloned().ok_or_else(|| {
            AppError::Database(format!(
                "Material {} missing for collection {}",
                item.material_id, collection.collection_id
            ))
        })?;
        materials.push(CollectionMaterialResponse {
            id: item.item_id,
            quantity: item.quantity,
            material: MaterialResponse::from(material),
        });
    }

    Ok(CollectionResponse {
        id: collection.collection_id,
        requester_id: collection.requester_id,
        cooperative_id: collection.cooperative_id,
        latitude: collection.latitude,
        longitude: collection.longitude,
        pickup_date: collection.pickup_date,
        status: collection.status,
        notes: collection.notes,
        weight_kg: collection.weight_kg,
        materials,
        requester,
        cooperative,
        created_at: collection.created_at,
        updated_at: collection.updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: &str, role: UserRole) -> Claims {
        Claims {
            sub: sub.to_string(),
            role,
            iat: 0,
            exp: 0,
        }
    }

    fn scheduled_collection(requester: &str, cooperative: Option<&str>) -> Collection {
        Collection {
            id: None,
            collection_id: "c-1".into(),
            requester_id: requester.to_string(),
            cooperative_id: cooperative.map(str::to_string),
            latitude: -23.55,
            longitude: -46.63,
            pickup_date: Utc::now(),
            status: CollectionStatus::Scheduled,
            notes: None,
            weight_kg: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn citizen_listing_is_scoped_to_own_requests() {
        let filter = CollectionFilter::for_caller(&claims("ana", UserRole::Citizen), None, None);
        assert_eq!(filter.scope, CollectionScope::Requester("ana".into()));
        assert_eq!(filter.status, None);

        // o filtro de status apenas estreita o escopo do solicitante
        let filter = CollectionFilter::for_caller(
            &claims("ana", UserRole::Citizen),
            Some(CollectionStatus::Completed),
            Some("coop-1"),
        );
        assert_eq!(filter.scope, CollectionScope::Requester("ana".into()));
        assert_eq!(filter.status, Some(CollectionStatus::Completed));
    }

    #[test]
    fn cooperative_filtering_scheduled_sees_the_claim_queue() {
        let filter = CollectionFilter::for_caller(
            &claims("coop-1", UserRole::Cooperative),
            Some(CollectionStatus::Scheduled),
            None,
        );
        assert_eq!(filter.scope, CollectionScope::UnassignedScheduled);
        assert_eq!(filter.status, None);
    }

    #[test]
    fn cooperative_default_listing_is_scoped_to_itself() {
        let filter =
            CollectionFilter::for_caller(&claims("coop-1", UserRole::Cooperative), None, None);
        assert_eq!(filter.scope, CollectionScope::Cooperative("coop-1".into()));

        let filter = CollectionFilter::for_caller(
            &claims("coop-1", UserRole::Cooperative),
            Some(CollectionStatus::InRoute),
            None,
        );
        assert_eq!(filter.scope, CollectionScope::Cooperative("coop-1".into()));
        assert_eq!(filter.status, Some(CollectionStatus::InRoute));
    }

    #[test]
    fn cooperative_query_parameter_wins_over_the_claim_queue() {
        let filter = CollectionFilter::for_caller(
            &claims("coop-1", UserRole::Cooperative),
            Some(CollectionStatus::Scheduled),
            Some("coop-2"),
        );
        assert_eq!(filter.scope, CollectionScope::Cooperative("coop-2".into()));
        assert_eq!(filter.status, Some(CollectionStatus::Scheduled));
    }

    #[test]
    fn filter_documents_match_each_scope() {
        let filter = CollectionFilter {
            scope: CollectionScope::Requester("ana".into()),
            status: Some(CollectionStatus::Canceled),
        };
        assert_eq!(
            filter.to_document(),
            doc! { "requester_id": "ana", "status": "CANCELED" }
        );

        let filter = CollectionFilter {
            scope: CollectionScope::UnassignedScheduled,
            status: None,
        };
        assert_eq!(
            filter.to_document(),
            doc! { "cooperative_id": null, "status": "SCHEDULED" }
        );

        let filter = CollectionFilter {
            scope: CollectionScope::Cooperative("coop-1".into()),
            status: None,
        };
        assert_eq!(filter.to_document(), doc! { "cooperative_id": "coop-1" });
    }

    #[test]
    fn assignment_to_another_cooperative_is_forbidden() {
        assert!(check_assignment("coop-1", None).is_ok());
        assert!(check_assignment("coop-1", Some("coop-1")).is_ok());
        match check_assignment("coop-1", Some("coop-2")) {
            Err(AppError::Forbidden(msg)) => {
                assert_eq!(
                    msg,
                    "Você não tem permissão para atribuir esta coleta a outra cooperativa."
                );
            }
            other => panic!("expected forbidden, got {:?}", other),
        }
    }

    #[test]
    fn requester_views_own_collection_but_not_others() {
        let collection = scheduled_collection("ana", None);
        assert!(can_view(&claims("ana", UserRole::Citizen), &collection));
        assert!(!can_view(&claims("beto", UserRole::Citizen), &collection));
        assert!(!can_view(&claims("beto", UserRole::Company), &collection));
    }

    #[test]
    fn cooperative_views_assigned_or_unassigned_scheduled() {
        let unassigned = scheduled_collection("ana", None);
        assert!(can_view(&claims("coop-1", UserRole::Cooperative), &unassigned));

        let mine = scheduled_collection("ana", Some("coop-1"));
        assert!(can_view(&claims("coop-1", UserRole::Cooperative), &mine));

        // atribuída a outra cooperativa: invisível mesmo em SCHEDULED
        let theirs = scheduled_collection("ana", Some("coop-2"));
        assert!(!can_view(&claims("coop-1", UserRole::Cooperative), &theirs));

        let mut in_route = scheduled_collection("ana", None);
        in_route.status = CollectionStatus::InRoute;
        assert!(!can_view(&claims("coop-1", UserRole::Cooperative), &in_route));
    }
}
