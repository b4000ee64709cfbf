//! HTTP surface of VoxMetrics
//!
//! Provider webhooks are mounted at the root (`/webhooks/...`); every other
//! route lives under `/api/v1`.

pub mod dto;
pub mod handlers;
pub mod state;

pub use state::AppState;

use actix_web::web;

/// Mount every route of the service
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(handlers::configure_webhooks).service(
        web::scope("/api/v1")
            .configure(handlers::configure_monitoring)
            .configure(handlers::configure_metrics)
            .configure(handlers::configure_organizations)
            .configure(handlers::configure_agents),
    );
}
