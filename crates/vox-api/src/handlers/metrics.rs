//! Tenant metrics handlers

use crate::dto::MetricsQueryParams;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{debug, instrument, warn};
use validator::Validate;
use vox_auth::{AuthenticatedUser, SuperAdmin};
use vox_core::AppError;

fn validated(query: &MetricsQueryParams) -> Result<(), AppError> {
    query.validate().map_err(|e| {
        warn!("Metrics query validation failed: {}", e);
        AppError::Validation(e.to_string())
    })
}

/// Cursor-paginated calls of the caller's organization
///
/// GET /api/v1/metrics/calls
#[instrument(skip(state, user), fields(user_id = %user.principal.id))]
pub async fn get_calls(
    state: web::Data<AppState>,
    query: web::Query<MetricsQueryParams>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    validated(&query)?;

    let result = state
        .metrics
        .get_calls(&user.principal, &query.calls_query())
        .await?;

    debug!(count = result.pagination.count, "Calls listed");
    Ok(HttpResponse::Ok().json(result))
}

/// Aggregate overview of the caller's organization
///
/// GET /api/v1/metrics/overview
#[instrument(skip(state, user), fields(user_id = %user.principal.id))]
pub async fn get_overview(
    state: web::Data<AppState>,
    query: web::Query<MetricsQueryParams>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    validated(&query)?;

    let result = state
        .metrics
        .get_overview(&user.principal, &query.overview_query())
        .await?;

    Ok(HttpResponse::Ok().json(result))
}

/// All organizations
///
/// GET /api/v1/metrics/organizations
#[instrument(skip(state, admin))]
pub async fn list_organizations(
    state: web::Data<AppState>,
    admin: SuperAdmin,
) -> Result<HttpResponse, AppError> {
    let organizations = state
        .organizations
        .list_organizations(&admin.principal)
        .await?;

    Ok(HttpResponse::Ok().json(organizations.as_ref()))
}

/// Caller profile
///
/// GET /api/v1/metrics/profile
pub async fn get_profile(state: web::Data<AppState>, user: AuthenticatedUser) -> HttpResponse {
    let profile = state.metrics.profile(&user.principal);
    HttpResponse::Ok().json(json!({ "user": profile.as_ref() }))
}

/// Configure metrics routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/metrics")
            .route("/calls", web::get().to(get_calls))
            .route("/overview", web::get().to(get_overview))
            .route("/organizations", web::get().to(list_organizations))
            .route("/profile", web::get().to(get_profile)),
    );
}
