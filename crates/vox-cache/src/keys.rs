//! Cache key constants and builders for VoxMetrics
//!
//! Provides standardized key naming patterns for all cached entities,
//! ensuring consistency across the application and preventing key collisions.
//!
//! # Key Patterns
//!
//! - `org:{id}` - Organization by id (organization cache)
//! - `org:slug:{slug}` - Organization by slug (organization cache)
//! - `orgs:all` - Every organization (organization cache)
//! - `user:{id}` - Caller profile (user cache)
//! - `perm:{user_id}:{org_id}` - Scope decision for a caller and organization (user cache)
//! - `metrics:{org_id}:{type}:{range}` - Computed metrics (metrics cache)
//!
//! # Example
//!
//! ```
//! use vox_cache::keys;
//! use uuid::Uuid;
//!
//! let id = Uuid::nil();
//! assert_eq!(keys::org_key(id), format!("org:{}", id));
//! assert_eq!(keys::ALL_ORGS_KEY, "orgs:all");
//! ```

use uuid::Uuid;

/// Prefix for organization entries
pub const ORG_PREFIX: &str = "org";

/// Key holding the full organization list
pub const ALL_ORGS_KEY: &str = "orgs:all";

/// Prefix for caller profiles
pub const USER_PREFIX: &str = "user";

/// Prefix for scope decisions
pub const PERMISSION_PREFIX: &str = "perm";

/// Prefix for computed metrics
pub const METRICS_PREFIX: &str = "metrics";

/// Build a cache key for an organization by id
///
/// # Arguments
///
/// * `id` - The organization id
///
/// # Returns
///
/// A cache key in the format `org:{id}`
pub fn org_key(id: Uuid) -> String {
    format!("{}:{}", ORG_PREFIX, id)
}

/// Build a cache key for an organization by slug
///
/// # Returns
///
/// A cache key in the format `org:slug:{slug}`
pub fn org_slug_key(slug: &str) -> String {
    format!("{}:slug:{}", ORG_PREFIX, slug)
}

pub fn user_key(user_id: Uuid) -> String {
    format!("{}:{}", USER_PREFIX, user_id)
}

/// Build a cache key for a caller's access decision on an organization
///
/// # Returns
///
/// A cache key in the format `perm:{user_id}:{org_id}`
pub fn permission_key(user_id: Uuid, organization_id: Uuid) -> String {
    format!("{}:{}:{}", PERMISSION_PREFIX, user_id, organization_id)
}

/// Build a cache key for a computed metric
///
/// # Arguments
///
/// * `organization_id` - Tenant the metric belongs to
/// * `kind` - Metric family, e.g. `overview`
/// * `range` - Encoded filter window, see [`range_segment`]
///
/// # Returns
///
/// A cache key in the format `metrics:{org_id}:{kind}:{range}`
pub fn metrics_key(organization_id: Uuid, kind: &str, range: &str) -> String {
    format!("{}{}:{}", metrics_prefix(organization_id), kind, range)
}

/// Prefix shared by every metrics key of one organization
pub fn metrics_prefix(organization_id: Uuid) -> String {
    format!("{}:{}:", METRICS_PREFIX, organization_id)
}

/// Encode a filter window as a key segment
///
/// Open bounds are written as `*`.
pub fn range_segment(
    from: Option<chrono::DateTime<chrono::Utc>>,
    to: Option<chrono::DateTime<chrono::Utc>>,
    is_billable: Option<bool>,
) -> String {
    let bound = |ts: Option<chrono::DateTime<chrono::Utc>>| {
        ts.map(|t| t.timestamp_millis().to_string())
            .unwrap_or_else(|| "*".to_string())
    };
    let billable = match is_billable {
        Some(true) => "billable",
        Some(false) => "test",
        None => "all",
    };
    format!("{}-{}:{}", bound(from), bound(to), billable)
}
