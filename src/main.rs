//! VoxMetrics server
//!
//! Receives voice-agent webhooks, stores normalized calls per organization
//! and serves tenant-scoped metrics.

use actix_cors::Cors;
use actix_web::{http::header, middleware, web, App, HttpResponse, HttpServer};
use anyhow::Context;
use std::env;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vox_api::AppState;
use vox_auth::JwtService;
use vox_cache::CacheService;
use vox_core::traits::ProviderApi;
use vox_core::AppConfig;
use vox_db::{create_pool, run_migrations, PgAgentStore, PgTenantStore};
use vox_services::ProviderClient;

/// Initialize tracing/logging
fn init_tracing() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "voxmetrics={lvl},vox_api={lvl},vox_services={lvl},vox_cache={lvl},vox_db={lvl},vox_auth={lvl},actix_web=info,sqlx=warn",
            lvl = log_level
        ))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

fn provider_client(config: &AppConfig) -> Option<Arc<dyn ProviderApi>> {
    match ProviderClient::new(&config.provider) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            warn!("Backfill disabled: {}", e);
            None
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting VoxMetrics v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load().context("failed to load configuration")?;
    if config.webhook.secret.is_none() {
        warn!("No webhook secret configured, signatures will not be verified");
    }

    info!("Connecting to database...");
    let pool = create_pool(&config.database)
        .await
        .context("failed to create database pool")?;
    run_migrations(&pool)
        .await
        .context("failed to run migrations")?;
    info!(
        "Database connection established with {} max connections",
        config.database.max_connections
    );

    let cache = Arc::new(CacheService::new(&config.cache));
    cache.start();

    let state = web::Data::new(AppState::build(
        &config,
        Arc::new(PgTenantStore::new(pool.clone())),
        Arc::new(PgAgentStore::new(pool)),
        provider_client(&config),
        Arc::clone(&cache),
    ));
    let jwt_service = web::Data::new(Arc::new(JwtService::new(&config.auth.jwt_secret)));

    let cors_origins = env::var("CORS_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string());

    let bind_addr = config.server_addr();
    info!(
        "Starting HTTP server on {} with {} workers",
        bind_addr, config.server.workers
    );

    HttpServer::new(move || {
        let cors_origins_inner = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _req_head| {
                origin
                    .to_str()
                    .map(|o| cors_origins_inner.split(',').any(|allowed| allowed.trim() == o))
                    .unwrap_or(false)
            })
            .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                header::AUTHORIZATION,
                header::ACCEPT,
                header::CONTENT_TYPE,
            ])
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .app_data(jwt_service.clone())
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                let error_message = err.to_string();
                actix_web::error::InternalError::from_response(
                    err,
                    HttpResponse::BadRequest().json(serde_json::json!({
                        "error": "invalid_query",
                        "message": error_message,
                        "status": 400
                    })),
                )
                .into()
            }))
            .wrap(cors)
            .wrap(TracingLogger::default())
            .wrap(middleware::Compress::default())
            .wrap(middleware::NormalizePath::trim())
            .configure(vox_api::configure)
            .route(
                "/",
                web::get().to(|| async {
                    HttpResponse::Found()
                        .append_header(("Location", "/api/v1/health"))
                        .finish()
                }),
            )
    })
    .workers(config.server.workers)
    .bind(&bind_addr)?
    .run()
    .await?;

    cache.close();
    info!("Server stopped");
    Ok(())
}
