//! Agent administration handlers
//!
//! All routes require a super-admin.

use crate::dto::{ApiResponse, CreateAgentRequest, UpdateAgentStatusRequest};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use tracing::{instrument, warn};
use uuid::Uuid;
use validator::Validate;
use vox_auth::SuperAdmin;
use vox_core::AppError;

/// Register an agent for an organization
///
/// POST /api/v1/organizations/{org}/agents
#[instrument(skip(state, admin, req))]
pub async fn create_agent(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    admin: SuperAdmin,
    req: web::Json<CreateAgentRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Agent creation validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let view = state
        .agents
        .create_agent(&admin.principal, path.into_inner(), &req.to_new_agent())
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        view,
        "Agent created, waiting for the first webhook",
    )))
}

/// GET /api/v1/organizations/{org}/agents
#[instrument(skip(state, admin))]
pub async fn list_agents(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    admin: SuperAdmin,
) -> Result<HttpResponse, AppError> {
    let agents = state
        .agents
        .list_agents(&admin.principal, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(agents)))
}

/// GET /api/v1/agents/{id}
#[instrument(skip(state, admin))]
pub async fn get_agent(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    admin: SuperAdmin,
) -> Result<HttpResponse, AppError> {
    let agent = state
        .agents
        .get_agent(&admin.principal, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(agent)))
}

/// Poll the validation state
///
/// GET /api/v1/agents/{id}/validation
#[instrument(skip(state, admin))]
pub async fn check_validation(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    admin: SuperAdmin,
) -> Result<HttpResponse, AppError> {
    let validation = state
        .agents
        .check_validation(&admin.principal, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(validation))
}

/// PATCH /api/v1/agents/{id}/status
#[instrument(skip(state, admin, req))]
pub async fn update_agent_status(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    admin: SuperAdmin,
    req: web::Json<UpdateAgentStatusRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Agent status validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let agent = state
        .agents
        .update_status(&admin.principal, path.into_inner(), &req.into_inner().into())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(agent)))
}

/// DELETE /api/v1/agents/{id}
#[instrument(skip(state, admin))]
pub async fn delete_agent(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    admin: SuperAdmin,
) -> Result<HttpResponse, AppError> {
    state
        .agents
        .delete_agent(&admin.principal, path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Configure agent routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/agents")
            .route("/{id}", web::get().to(get_agent))
            .route("/{id}", web::delete().to(delete_agent))
            .route("/{id}/validation", web::get().to(check_validation))
            .route("/{id}/status", web::patch().to(update_agent_status)),
    );
}
