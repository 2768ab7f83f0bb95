use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Coleta Service API",
        version = "1.0.0",
        description = "API de agendamento de coletas de materiais recicláveis. \n\n**Authentication:** endpoints autenticados exigem JWT Bearer token.\n\n**Papéis:**\n- CITIZEN/COMPANY agendam coletas\n- COOPERATIVE assume e conclui coletas",
    ),
    paths(
        // Auth endpoints
        crate::api::auth::register,
        crate::api::auth::login,

        // Users
        crate::api::users::get_profile,
        crate::api::users::update_profile,
        crate::api::users::list_users,

        // Collections
        crate::api::collections::schedule_collection,
        crate::api::collections::list_collections,
        crate::api::collections::get_collection_by_id,
        crate::api::collections::update_collection_status,

        // Materials & Health
        crate::api::materials::list_materials,
        crate::api::health::health_check,
    ),
    components(
        schemas(
            // Auth
            crate::services::auth_service::RegisterRequest,
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::AuthResponse,

            // Users
            crate::models::UserRole,
            crate::models::UserProfile,
            crate::models::UserSummary,
            crate::models::UpdateUserRequest,

            // Collections
            crate::models::CollectionStatus,
            crate::models::ScheduleCollectionRequest,
            crate::models::MaterialLineRequest,
            crate::models::UpdateCollectionStatusRequest,
            crate::models::CollectionResponse,
            crate::models::CollectionMaterialResponse,

            // Materials & Health
            crate::models::MaterialResponse,
            crate::api::health::HealthResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Registro e login com email/senha; tokens JWT de 1 dia."),
        (name = "Users", description = "Perfil do usuário autenticado e diretório (cooperativas)."),
        (name = "Collections", description = "Ciclo de vida das coletas: agendamento, listagem, atribuição e conclusão."),
        (name = "Materials", description = "Catálogo público de materiais recicláveis."),
        (name = "Health", description = "Health check do serviço."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Enter your JWT token"))
                        .build(),
                ),
            );
        }
    }
}
