use mongodb::bson::doc;
use uuid::Uuid;

use crate::database::MongoDB;
use crate::models::Material;
use crate::utils::error::AppError;

/// Catálogo base de materiais recicláveis
pub const BASE_MATERIALS: [(&str, &str); 6] = [
    ("Papel", "Jornais, revistas, caixas de papelão limpas"),
    ("Plástico", "Garrafas PET, embalagens plásticas, sacolas"),
    ("Metal", "Latas de alumínio, latas de aço, ferragens"),
    ("Vidro", "Garrafas, potes de vidro (sem tampa)"),
    ("Orgânico", "Restos de alimentos, podas de jardim"),
    ("Eletrônico", "Celulares, computadores, pilhas, baterias"),
];

/// Upsert idempotente: cria o que falta e não toca no que já existe.
pub async fn seed_base_materials(db: &MongoDB) -> Result<(), AppError> {
    let collection = db.collection::<Material>("materials");

    log::info!(
        "🌱 Seeding base material catalog ({} entries)...",
        BASE_MATERIALS.len()
    );

    for (name, description) in BASE_MATERIALS {
        collection
            .update_one(
                doc! { "name": name },
                doc! {
                    "$setOnInsert": {
                        "material_id": Uuid::new_v4().to_string(),
                        "name": name,
                        "description": description,
                    }
                },
            )
            .upsert(true)
            .await
            .map_err(|e| AppError::Database(format!("Failed to seed material {}: {}", name, e)))?;
    }

    log::info!("✅ Base material catalog ready");
    Ok(())
}
