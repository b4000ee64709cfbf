//! Caller identity
//!
//! A principal is the verified caller handed to the core by the identity
//! layer. Tenant scope is decided here and nowhere else.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Caller role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    OrgAdmin,
    /// May read and administer every organization
    SuperAdmin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::OrgAdmin => write!(f, "org_admin"),
            Role::SuperAdmin => write!(f, "super_admin"),
        }
    }
}

impl Role {
    pub fn is_super_admin(&self) -> bool {
        matches!(self, Role::SuperAdmin)
    }
}

/// Verified caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
    pub organization_id: Option<Uuid>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Principal {
    pub fn is_super_admin(&self) -> bool {
        self.role.is_super_admin()
    }

    /// Resolve which organization a request may read
    ///
    /// A super-admin may name any organization and otherwise falls back to
    /// their own. Everyone else is fixed to their own organization.
    ///
    /// # Errors
    ///
    /// Returns `AppError::AuthorizationDenied` when a non-super-admin names
    /// another organization, or when no organization can be resolved.
    pub fn resolve_scope(&self, requested: Option<Uuid>) -> Result<Uuid, AppError> {
        if self.is_super_admin() {
            return requested.or(self.organization_id).ok_or_else(|| {
                AppError::AuthorizationDenied("organization_id is required".to_string())
            });
        }

        let own = self.organization_id.ok_or_else(|| {
            AppError::AuthorizationDenied("no organization assigned".to_string())
        })?;

        match requested {
            Some(org) if org != own => Err(AppError::AuthorizationDenied(
                "cannot access another organization".to_string(),
            )),
            _ => Ok(own),
        }
    }

    /// # Errors
    ///
    /// Returns `AppError::AuthorizationDenied` unless the caller is a super-admin.
    pub fn require_super_admin(&self) -> Result<(), AppError> {
        if self.is_super_admin() {
            Ok(())
        } else {
            Err(AppError::AuthorizationDenied(
                "super admin role required".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role, org: Option<Uuid>) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            role,
            organization_id: org,
            email: None,
        }
    }

    #[test]
    fn test_user_is_fixed_to_own_org() {
        let own = Uuid::new_v4();
        let user = principal(Role::User, Some(own));

        assert_eq!(user.resolve_scope(None).unwrap(), own);
        assert_eq!(user.resolve_scope(Some(own)).unwrap(), own);
        assert!(matches!(
            user.resolve_scope(Some(Uuid::new_v4())),
            Err(AppError::AuthorizationDenied(_))
        ));
    }

    #[test]
    fn test_user_without_org_is_denied() {
        let user = principal(Role::OrgAdmin, None);
        assert!(user.resolve_scope(None).is_err());
    }

    #[test]
    fn test_super_admin_may_pick_any_org() {
        let other = Uuid::new_v4();
        let admin = principal(Role::SuperAdmin, None);

        assert_eq!(admin.resolve_scope(Some(other)).unwrap(), other);
        assert!(admin.resolve_scope(None).is_err());
        assert!(admin.require_super_admin().is_ok());
        assert!(principal(Role::User, None).require_super_admin().is_err());
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(
            serde_json::to_string(&Role::SuperAdmin).unwrap(),
            "\"super_admin\""
        );
        let role: Role = serde_json::from_str("\"org_admin\"").unwrap();
        assert_eq!(role, Role::OrgAdmin);
    }
}
