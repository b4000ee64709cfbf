//! Organization lookups and billing administration
//!
//! Organizations are read through the organization cache. A miss loads the
//! whole list once and caches every entry.

use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;
use vox_cache::CacheService;
use vox_core::models::{BillingUpdate, Organization, Principal};
use vox_core::traits::TenantStore;
use vox_core::{AppError, AppResult};

/// Organization fields echoed alongside tenant metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganizationSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

impl From<&Organization> for OrganizationSummary {
    fn from(org: &Organization) -> Self {
        Self {
            id: org.id,
            name: org.name.clone(),
            slug: org.slug.clone(),
        }
    }
}

#[derive(Clone)]
pub struct OrganizationService {
    store: Arc<dyn TenantStore>,
    cache: Arc<CacheService>,
}

impl OrganizationService {
    pub fn new(store: Arc<dyn TenantStore>, cache: Arc<CacheService>) -> Self {
        Self { store, cache }
    }

    async fn load_all(&self) -> AppResult<Arc<Vec<Organization>>> {
        if let Some(orgs) = self.cache.get_all_organizations() {
            return Ok(orgs);
        }

        let orgs = self.store.list_organizations().await?;
        debug!(count = orgs.len(), "Organization list cached");
        Ok(self.cache.set_all_organizations(orgs))
    }

    /// Organization by id, read through the cache
    ///
    /// A per-id miss is served from the cached organization list when it
    /// holds the id; otherwise the list is reloaded from the store.
    ///
    /// # Errors
    ///
    /// Returns `AppError::OrganizationNotFound` if the id is unknown after a
    /// fresh load.
    #[instrument(skip(self))]
    pub async fn get_organization(&self, id: Uuid) -> AppResult<Arc<Organization>> {
        if let Some(org) = self.cache.get_organization(id) {
            return Ok(org);
        }

        if let Some(org) = self
            .cache
            .get_all_organizations()
            .and_then(|orgs| orgs.iter().find(|o| o.id == id).cloned())
        {
            return Ok(self.cache.set_organization(org));
        }

        debug!(organization_id = %id, "Organization cache miss, loading all");
        let orgs = self.store.list_organizations().await?;
        let orgs = self.cache.set_all_organizations(orgs);

        orgs.iter()
            .find(|o| o.id == id)
            .cloned()
            .map(Arc::new)
            .ok_or_else(|| AppError::OrganizationNotFound(id.to_string()))
    }

    /// Every organization; super-admin only
    #[instrument(skip(self, caller), fields(caller = %caller.id))]
    pub async fn list_organizations(
        &self,
        caller: &Principal,
    ) -> AppResult<Arc<Vec<Organization>>> {
        caller.require_super_admin()?;
        self.load_all().await
    }

    /// Change an organization's billing rates
    ///
    /// Drops the organization's cache entries, the all-organizations list and
    /// every cached metric of the organization.
    #[instrument(skip(self, caller, update), fields(caller = %caller.id))]
    pub async fn update_billing(
        &self,
        caller: &Principal,
        organization_id: Uuid,
        update: &BillingUpdate,
    ) -> AppResult<Organization> {
        caller.require_super_admin()?;

        if update.billing_rate_per_minute < Decimal::ZERO || update.cogs_per_minute < Decimal::ZERO {
            return Err(AppError::Validation(
                "billing rates must not be negative".to_string(),
            ));
        }

        let org = self
            .store
            .update_organization_billing(
                organization_id,
                update.billing_rate_per_minute,
                update.cogs_per_minute,
            )
            .await?;

        self.cache.invalidate_organization(organization_id);
        let dropped = self.cache.invalidate_org_metrics(organization_id);

        info!(
            organization_id = %organization_id,
            billing_rate_per_minute = %org.billing_rate_per_minute,
            cogs_per_minute = %org.cogs_per_minute,
            metrics_dropped = dropped,
            "Organization billing updated"
        );
        Ok(org)
    }
}
