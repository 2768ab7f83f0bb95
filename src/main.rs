mod api;
mod database;
mod middleware;
mod models;
mod seeds;
mod services;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::env;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::models::UserRole;
use crate::utils::error::AppError;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // Get configuration from environment
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "3333".to_string());
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    log::info!("🚀 Starting Coleta Service...");

    // Initialize MongoDB connection
    let db = database::MongoDB::new(&database_url)
        .await
        .expect("Failed to connect to MongoDB");

    let db_data = web::Data::new(db.clone());

    log::info!("✅ MongoDB connected successfully");

    log::info!("🌐 Server starting on {}:{}", host, port);
    log::info!(
        "📚 Swagger UI available at: http://{}:{}/swagger-ui/",
        host,
        port
    );

    // Start HTTP server
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin("http://localhost:3000")
            .allowed_origin("http://localhost:5173")
            .allowed_origin("http://127.0.0.1:3000")
            .allowed_origin("http://127.0.0.1:5173")
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
            ])
            .max_age(3600);

        // Generate OpenAPI specification
        let openapi = api::swagger::ApiDoc::openapi();

        // Corpo JSON malformado responde no mesmo formato {message, errors}
        let json_config = web::JsonConfig::default()
            .error_handler(|err, _req| AppError::Validation(vec![err.to_string()]).into());

        App::new()
            .app_data(db_data.clone())
            .app_data(json_config)
            .wrap(cors)
            .wrap(Logger::default())
            // Swagger UI
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()),
            )
            // Health check
            .route("/health", web::get().to(api::health::health_check))
            // Auth endpoints
            .service(
                web::scope("/api/auth")
                    .route("/register", web::post().to(api::auth::register))
                    .route("/login", web::post().to(api::auth::login)),
            )
            // Users: perfil próprio + diretório (cooperativas)
            .service(
                web::scope("/api/users")
                    .wrap(middleware::AuthMiddleware)
                    .service(
                        web::resource("/me")
                            .route(web::get().to(api::users::get_profile))
                            .route(web::put().to(api::users::update_profile)),
                    )
                    .service(
                        web::resource("")
                            .wrap(middleware::RequireRole(&[UserRole::Cooperative]))
                            .route(web::get().to(api::users::list_users)),
                    )
                    .service(
                        web::resource("/{id}")
                            .wrap(middleware::RequireRole(&[UserRole::Cooperative]))
                            .route(web::get().to(api::users::get_user_by_id)),
                    ),
            )
            // Collections: ciclo de vida das coletas
            .service(
                web::scope("/api/collections")
                    .wrap(middleware::AuthMiddleware)
                    .service(
                        web::resource("/seed-materials")
                            .wrap(middleware::RequireRole(&[UserRole::Cooperative]))
                            .route(web::post().to(api::collections::seed_materials)),
                    )
                    .service(
                        web::resource("/{id}/status")
                            .wrap(middleware::RequireRole(&[UserRole::Cooperative]))
                            .route(web::put().to(api::collections::update_collection_status)),
                    )
                    .service(
                        web::resource("")
                            .route(web::post().to(api::collections::schedule_collection))
                            .route(web::get().to(api::collections::list_collections)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(api::collections::get_collection_by_id)),
                    ),
            )
            // Materials: catálogo público
            .service(
                web::scope("/api/materials")
                    .route("", web::get().to(api::materials::list_materials)),
            )
    })
    .bind(format!("{}:{}", host, port))?
    .run()
    .await
}
