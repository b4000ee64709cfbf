//! Actix-web request extractors
//!
//! Provides extractors for authenticated callers with role checks.

use crate::jwt::JwtService;
use crate::Claims;
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use std::sync::Arc;
use tracing::{debug, warn};
use vox_core::error::AppError;
use vox_core::models::Principal;

/// Extract the bearer token from the Authorization header
fn extract_bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
    let jwt_service = req
        .app_data::<web::Data<Arc<JwtService>>>()
        .ok_or_else(|| {
            warn!("JwtService not found in app data");
            AppError::Unauthorized("Authentication service not configured".to_string())
        })?;

    let token = extract_bearer_token(req).ok_or_else(|| {
        debug!("No authentication token found in request");
        AppError::Unauthorized("No authentication token provided".to_string())
    })?;

    let claims = jwt_service.validate_token(token)?;
    debug!(user_id = %claims.sub, role = %claims.role, "Caller authenticated");

    Ok(AuthenticatedUser {
        principal: claims.principal(),
        claims,
    })
}

/// Authenticated caller extractor
///
/// # Examples
///
/// ```no_run
/// use actix_web::HttpResponse;
/// use vox_auth::middleware::AuthenticatedUser;
///
/// async fn protected_handler(user: AuthenticatedUser) -> HttpResponse {
///     HttpResponse::Ok().json(serde_json::json!({
///         "id": user.principal.id,
///         "role": user.principal.role
///     }))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub principal: Principal,

    /// Full claims from the JWT token
    pub claims: Claims,
}

impl FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req).map_err(|e| {
            warn!(error = %e, "Authentication failed");
            e.into()
        }))
    }
}

/// Super-admin extractor
///
/// Responds 403 when the caller is authenticated but lacks the role.
#[derive(Debug, Clone)]
pub struct SuperAdmin(pub AuthenticatedUser);

impl std::ops::Deref for SuperAdmin {
    type Target = AuthenticatedUser;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for SuperAdmin {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = authenticate(req).and_then(|user| {
            if user.principal.is_super_admin() {
                Ok(SuperAdmin(user))
            } else {
                warn!(
                    user_id = %user.principal.id,
                    role = %user.principal.role,
                    "Caller attempted super-admin access"
                );
                Err(AppError::AuthorizationDenied(
                    "super admin role required".to_string(),
                ))
            }
        });

        ready(result.map_err(Into::into))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App, HttpResponse};
    use uuid::Uuid;
    use vox_core::models::Role;

    const SECRET: &str = "test-secret-key-12345";

    fn token(role: Role) -> String {
        let claims = Claims::with_expiration(Uuid::new_v4(), role, Some(Uuid::new_v4()), 3600);
        JwtService::new(SECRET).create_token(&claims).unwrap()
    }

    async fn whoami(user: AuthenticatedUser) -> HttpResponse {
        HttpResponse::Ok().json(user.principal)
    }

    async fn admin_only(_admin: SuperAdmin) -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    macro_rules! app {
        () => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(Arc::new(JwtService::new(SECRET))))
                    .route("/me", web::get().to(whoami))
                    .route("/admin", web::get().to(admin_only)),
            )
            .await
        };
    }

    #[actix_rt::test]
    async fn test_missing_token_is_unauthorized() {
        let app = app!();
        let req = test::TestRequest::get().uri("/me").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_rt::test]
    async fn test_valid_token_yields_principal() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header(("Authorization", format!("Bearer {}", token(Role::User))))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Principal = test::read_body_json(resp).await;
        assert_eq!(body.role, Role::User);
    }

    #[actix_rt::test]
    async fn test_super_admin_guard() {
        let app = app!();

        let req = test::TestRequest::get()
            .uri("/admin")
            .insert_header(("Authorization", format!("Bearer {}", token(Role::OrgAdmin))))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::get()
            .uri("/admin")
            .insert_header(("Authorization", format!("Bearer {}", token(Role::SuperAdmin))))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
