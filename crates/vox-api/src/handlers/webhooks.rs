//! Provider webhook handlers
//!
//! The raw body is taken as bytes so the signature covers exactly what the
//! provider sent.

use crate::state::AppState;
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};
use vox_core::models::AGENT_WEBHOOK_PREFIX;
use vox_core::AppError;

/// First configured signature header present on the request
fn signature<'a>(req: &'a HttpRequest, state: &AppState) -> Option<&'a str> {
    state
        .pipeline
        .verifier()
        .header_names()
        .iter()
        .find_map(|name| req.headers().get(name.as_str()))
        .and_then(|value| value.to_str().ok())
}

/// Shared webhook endpoint
///
/// POST /webhooks/calls
#[instrument(skip(state, req, body))]
pub async fn receive_call_webhook(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let outcome = state
        .pipeline
        .ingest(signature(&req, &state), &body)
        .await?;

    info!(event = %outcome.event, call_id = ?outcome.external_call_id, "Webhook processed");
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "result": outcome,
    })))
}

/// Per-agent webhook endpoint
///
/// POST /webhooks/agent/{token}
#[instrument(skip(state, req, body))]
pub async fn receive_agent_webhook(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let webhook_path = format!("{}{}", AGENT_WEBHOOK_PREFIX, path.into_inner());

    let outcome = state
        .pipeline
        .ingest_for_agent(&webhook_path, signature(&req, &state), &body)
        .await?;

    info!(
        webhook_path = %webhook_path,
        event = %outcome.event,
        agent_validated = outcome.agent_validated,
        "Agent webhook processed"
    );
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "agent_validated": outcome.agent_validated,
        "result": outcome,
    })))
}

/// Configure webhook routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/webhooks")
            .route("/calls", web::post().to(receive_call_webhook))
            .route("/agent/{token}", web::post().to(receive_agent_webhook)),
    );
}
