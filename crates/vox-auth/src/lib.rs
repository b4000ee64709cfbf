//! Caller authentication for VoxMetrics
//!
//! Sessions are issued by an external identity provider. This crate only
//! verifies the bearer JWT it hands out and turns it into a
//! [`Principal`](vox_core::models::Principal) for the core.
//!
//! # Using extractors in Actix-web
//!
//! ```no_run
//! use actix_web::HttpResponse;
//! use vox_auth::middleware::AuthenticatedUser;
//!
//! async fn profile(user: AuthenticatedUser) -> HttpResponse {
//!     HttpResponse::Ok().json(&user.principal)
//! }
//! ```

pub mod claims;
pub mod jwt;
pub mod middleware;

pub use claims::Claims;
pub use jwt::JwtService;
pub use middleware::{AuthenticatedUser, SuperAdmin};
