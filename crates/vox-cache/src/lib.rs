//! In-process caching layer for VoxMetrics
//!
//! Three independent TTL caches sit in front of the backing store:
//!
//! - organizations: long TTL, few keys
//! - users: caller profiles and scope decisions, medium TTL
//! - metrics: computed overviews, short TTL
//!
//! The caches are process-local. Nothing here is shared across instances, so
//! after a mutation on another instance a reader may see data up to one TTL
//! old.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vox_cache::CacheService;
//! use vox_core::config::CacheConfig;
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = Arc::new(CacheService::new(&CacheConfig::default()));
//!     cache.start();
//!
//!     // ... serve requests ...
//!
//!     cache.close();
//! }
//! ```

pub mod keys;
mod ttl;

pub use ttl::{CacheStats, TtlCache};

use parking_lot::Mutex;
use serde::Serialize;
use std::any::Any;
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;
use vox_core::config::CacheConfig;
use vox_core::models::Organization;

/// Stats for all three caches
#[derive(Debug, Clone, Serialize)]
pub struct CacheReport {
    pub organizations: CacheStats,
    pub users: CacheStats,
    pub metrics: CacheStats,
}

/// The composite cache injected into the services
pub struct CacheService {
    organizations: Arc<TtlCache>,
    users: Arc<TtlCache>,
    metrics: Arc<TtlCache>,
    sweepers: Mutex<Vec<JoinHandle<()>>>,
}

impl CacheService {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            organizations: Arc::new(TtlCache::from_config("organizations", &config.organizations)),
            users: Arc::new(TtlCache::from_config("users", &config.users)),
            metrics: Arc::new(TtlCache::from_config("metrics", &config.metrics)),
            sweepers: Mutex::new(Vec::new()),
        }
    }

    /// Spawn one background sweeper per cache
    ///
    /// Must be called from within a Tokio runtime. Calling it again while
    /// sweepers are running is a no-op.
    pub fn start(&self) {
        let mut sweepers = self.sweepers.lock();
        if !sweepers.is_empty() {
            return;
        }

        for cache in [&self.organizations, &self.users, &self.metrics] {
            sweepers.push(spawn_sweeper(Arc::downgrade(cache), cache.sweep_period()));
        }
        info!("Cache sweepers started");
    }

    /// Stop the sweepers and drop every entry
    pub fn close(&self) {
        for handle in self.sweepers.lock().drain(..) {
            handle.abort();
        }
        self.flush_all();
        info!("Cache service closed");
    }

    pub fn organizations(&self) -> &TtlCache {
        &self.organizations
    }

    pub fn users(&self) -> &TtlCache {
        &self.users
    }

    pub fn metrics(&self) -> &TtlCache {
        &self.metrics
    }

    // ==================== Organizations ====================

    pub fn get_organization(&self, id: Uuid) -> Option<Arc<Organization>> {
        self.organizations.get(&keys::org_key(id))
    }

    pub fn get_organization_by_slug(&self, slug: &str) -> Option<Arc<Organization>> {
        self.organizations.get(&keys::org_slug_key(slug))
    }

    /// Cache one organization under its id and slug keys
    pub fn set_organization(&self, org: Organization) -> Arc<Organization> {
        let org = Arc::new(org);
        self.organizations
            .set_shared(keys::org_slug_key(&org.slug), Arc::clone(&org));
        self.organizations
            .set_shared(keys::org_key(org.id), Arc::clone(&org));
        org
    }

    pub fn get_all_organizations(&self) -> Option<Arc<Vec<Organization>>> {
        self.organizations.get(keys::ALL_ORGS_KEY)
    }

    /// Cache the full organization list and each organization in it
    pub fn set_all_organizations(&self, orgs: Vec<Organization>) -> Arc<Vec<Organization>> {
        for org in &orgs {
            self.set_organization(org.clone());
        }
        self.organizations.set(keys::ALL_ORGS_KEY, orgs)
    }

    /// Drop an organization and every aggregate key that embeds it
    pub fn invalidate_organization(&self, id: Uuid) {
        let id_key = keys::org_key(id);
        let slug = self
            .organizations
            .peek::<Organization>(&id_key)
            .map(|org| org.slug.clone());

        self.organizations.delete(&id_key);
        if let Some(slug) = slug {
            self.organizations.delete(&keys::org_slug_key(&slug));
        }
        self.organizations.delete(keys::ALL_ORGS_KEY);
        debug!(organization_id = %id, "Organization cache invalidated");
    }

    // ==================== Users ====================

    pub fn get_user<T: Any + Send + Sync>(&self, user_id: Uuid) -> Option<Arc<T>> {
        self.users.get(&keys::user_key(user_id))
    }

    pub fn set_user<T: Any + Send + Sync>(&self, user_id: Uuid, profile: T) -> Arc<T> {
        self.users.set(keys::user_key(user_id), profile)
    }

    /// Cached scope decision for a caller on an organization
    pub fn get_permission(&self, user_id: Uuid, organization_id: Uuid) -> Option<bool> {
        self.users
            .get::<bool>(&keys::permission_key(user_id, organization_id))
            .map(|allowed| *allowed)
    }

    pub fn set_permission(&self, user_id: Uuid, organization_id: Uuid, allowed: bool) {
        self.users
            .set(keys::permission_key(user_id, organization_id), allowed);
    }

    pub fn invalidate_user(&self, user_id: Uuid) {
        self.users.delete(&keys::user_key(user_id));
        self.users
            .delete_prefix(&format!("{}:{}:", keys::PERMISSION_PREFIX, user_id));
    }

    // ==================== Metrics ====================

    pub fn get_metrics<T: Any + Send + Sync>(
        &self,
        organization_id: Uuid,
        kind: &str,
        range: &str,
    ) -> Option<Arc<T>> {
        self.metrics
            .get(&keys::metrics_key(organization_id, kind, range))
    }

    pub fn set_metrics<T: Any + Send + Sync>(
        &self,
        organization_id: Uuid,
        kind: &str,
        range: &str,
        value: T,
    ) -> Arc<T> {
        self.metrics
            .set(keys::metrics_key(organization_id, kind, range), value)
    }

    /// Drop every cached metric of one organization
    pub fn invalidate_org_metrics(&self, organization_id: Uuid) -> usize {
        self.metrics
            .delete_prefix(&keys::metrics_prefix(organization_id))
    }

    // ==================== Administration ====================

    pub fn stats(&self) -> CacheReport {
        CacheReport {
            organizations: self.organizations.stats(),
            users: self.users.stats(),
            metrics: self.metrics.stats(),
        }
    }

    pub fn flush_all(&self) {
        self.organizations.flush();
        self.users.flush();
        self.metrics.flush();
        info!("All caches flushed");
    }
}

impl Drop for CacheService {
    fn drop(&mut self) {
        for handle in self.sweepers.get_mut().drain(..) {
            handle.abort();
        }
    }
}

fn spawn_sweeper(cache: Weak<TtlCache>, period: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;

        loop {
            interval.tick().await;
            let Some(cache) = cache.upgrade() else {
                break;
            };
            let removed = cache.purge_expired();
            if removed > 0 {
                debug!(cache = cache.name(), removed, "Swept expired entries");
            }
        }
    })
}
