//! Health and cache monitoring handlers

use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::info;
use vox_auth::SuperAdmin;

/// GET /api/v1/health
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "voxmetrics",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Hit/miss counters of the three caches
///
/// GET /api/v1/monitoring/cache
pub async fn cache_stats(state: web::Data<AppState>, _admin: SuperAdmin) -> HttpResponse {
    HttpResponse::Ok().json(state.cache.stats())
}

/// POST /api/v1/monitoring/cache/flush
pub async fn flush_cache(state: web::Data<AppState>, admin: SuperAdmin) -> HttpResponse {
    state.cache.flush_all();
    info!(user_id = %admin.principal.id, "Caches flushed by administrator");
    HttpResponse::Ok().json(json!({ "status": "flushed" }))
}

/// Configure monitoring routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check)).service(
        web::scope("/monitoring")
            .route("/cache", web::get().to(cache_stats))
            .route("/cache/flush", web::post().to(flush_cache)),
    );
}
