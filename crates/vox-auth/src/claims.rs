//! JWT Claims structure
//!
//! Defines the claims carried by caller session tokens.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vox_core::models::{Principal, Role};

/// JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject (user id)
    pub sub: Uuid,

    pub role: Role,

    /// Organization the caller belongs to; absent for platform operators
    #[serde(default)]
    pub organization_id: Option<Uuid>,

    #[serde(default)]
    pub email: Option<String>,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Create claims expiring `expires_in_secs` from now
    ///
    /// # Examples
    ///
    /// ```
    /// use uuid::Uuid;
    /// use vox_auth::Claims;
    /// use vox_core::models::Role;
    ///
    /// let claims = Claims::with_expiration(Uuid::new_v4(), Role::User, None, 3600);
    /// assert!(!claims.is_expired());
    /// ```
    pub fn with_expiration(
        user_id: Uuid,
        role: Role,
        organization_id: Option<Uuid>,
        expires_in_secs: i64,
    ) -> Self {
        let now = Utc::now();
        let exp = now + Duration::seconds(expires_in_secs);

        Self {
            sub: user_id,
            role,
            organization_id,
            email: None,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.exp <= Utc::now().timestamp()
    }

    /// The verified caller these claims describe
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.sub,
            role: self.role,
            organization_id: self.organization_id,
            email: self.email.clone(),
        }
    }
}
