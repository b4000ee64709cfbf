//! JWT validation service
//!
//! Verifies HS256 session tokens with the jsonwebtoken crate. Token creation
//! is kept for operator tooling and tests; production tokens come from the
//! identity provider.

use crate::claims::Claims;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::{debug, error, warn};
use vox_core::error::AppError;

/// JWT Service for token validation
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    /// Create a new JWT service
    ///
    /// # Arguments
    ///
    /// * `secret` - The shared secret tokens are signed with
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Sign a token for the given claims
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidToken` if token creation fails
    pub fn create_token(&self, claims: &Claims) -> Result<String, AppError> {
        debug!(user_id = %claims.sub, role = %claims.role, "Creating JWT token");

        encode(&Header::default(), claims, &self.encoding_key).map_err(|e| {
            error!(error = %e, "Failed to create JWT token");
            AppError::InvalidToken(format!("Token creation failed: {}", e))
        })
    }

    /// Validate a JWT token and extract claims
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `AppError::TokenExpired` if the token has expired
    /// - `AppError::InvalidToken` if the token is invalid
    ///
    /// # Examples
    ///
    /// ```
    /// use uuid::Uuid;
    /// use vox_auth::{Claims, JwtService};
    /// use vox_core::models::Role;
    ///
    /// let jwt_service = JwtService::new("secret");
    /// let claims = Claims::with_expiration(Uuid::new_v4(), Role::User, None, 3600);
    /// let token = jwt_service.create_token(&claims)?;
    /// let decoded = jwt_service.validate_token(&token)?;
    /// assert_eq!(decoded.sub, claims.sub);
    /// # Ok::<(), vox_core::error::AppError>(())
    /// ```
    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        let validation = Validation::default();

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => {
                        warn!("Token expired");
                        AppError::TokenExpired
                    }
                    _ => {
                        warn!(error = %e, "Invalid token");
                        AppError::InvalidToken(format!("Token validation failed: {}", e))
                    }
                }
            })?;

        debug!(user_id = %token_data.claims.sub, "Token validated");
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use vox_core::models::Role;

    #[test]
    fn test_round_trip() {
        let service = JwtService::new("test-secret");
        let claims = Claims::with_expiration(Uuid::new_v4(), Role::OrgAdmin, Some(Uuid::new_v4()), 600);

        let token = service.create_token(&claims).unwrap();
        assert_eq!(service.validate_token(&token).unwrap(), claims);
    }

    #[test]
    fn test_expired_token() {
        let service = JwtService::new("test-secret");
        // Beyond the default 60 s leeway
        let claims = Claims::with_expiration(Uuid::new_v4(), Role::User, None, -120);
        let token = service.create_token(&claims).unwrap();

        assert!(matches!(
            service.validate_token(&token),
            Err(AppError::TokenExpired)
        ));
    }

    #[test]
    fn test_wrong_secret() {
        let issuer = JwtService::new("secret-a");
        let verifier = JwtService::new("secret-b");
        let claims = Claims::with_expiration(Uuid::new_v4(), Role::User, None, 600);
        let token = issuer.create_token(&claims).unwrap();

        assert!(matches!(
            verifier.validate_token(&token),
            Err(AppError::InvalidToken(_))
        ));
        assert!(verifier.validate_token("garbage").is_err());
    }
}
