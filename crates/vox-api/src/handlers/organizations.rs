//! Organization administration handlers

use crate::dto::{ApiResponse, BackfillRequestDto, UpdateBillingRequest};
use crate::handlers::agents::{create_agent, list_agents};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use tracing::{instrument, warn};
use uuid::Uuid;
use validator::Validate;
use vox_auth::SuperAdmin;
use vox_core::AppError;

/// Change an organization's billing rates
///
/// PATCH /api/v1/organizations/{org}/billing
#[instrument(skip(state, admin, req))]
pub async fn update_billing(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    admin: SuperAdmin,
    req: web::Json<UpdateBillingRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Billing update validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let org = state
        .organizations
        .update_billing(&admin.principal, path.into_inner(), &req.into_inner().into())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(org, "Billing rates updated")))
}

/// Import provider history into an organization
///
/// POST /api/v1/organizations/{org}/backfill
#[instrument(skip(state, admin, req))]
pub async fn backfill(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    admin: SuperAdmin,
    req: web::Json<BackfillRequestDto>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Backfill validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let service = state.backfill.as_ref().ok_or_else(|| {
        AppError::Config("provider API key is not configured".to_string())
    })?;

    let report = service
        .backfill(&admin.principal, path.into_inner(), &req.into_inner().into())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        report.clone(),
        format!("Backfilled {} calls", report.total_calls),
    )))
}

/// Configure organization routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/organizations/{org}")
            .route("/agents", web::post().to(create_agent))
            .route("/agents", web::get().to(list_agents))
            .route("/billing", web::patch().to(update_billing))
            .route("/backfill", web::post().to(backfill)),
    );
}
