//! Store and collaborator traits
//!
//! The core talks to its backing store and to the provider API only through
//! these traits. Every store method is tenant-scoped except the explicit
//! organization listing.

use crate::error::AppError;
use crate::models::{
    Agent, Call, CallCursor, CallFilter, CallUpsert, Organization, OverviewAggregate,
    ProviderCall, ProviderCallListing,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Tenant-scoped call and organization storage
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Insert or merge a call keyed by its external id, returning the stored
    /// record after the merge.
    async fn upsert_call(&self, call: &CallUpsert) -> Result<Call, AppError>;

    /// Find a call by external id within an organization
    async fn find_call(
        &self,
        organization_id: Uuid,
        external_call_id: &str,
    ) -> Result<Option<Call>, AppError>;

    /// Every organization; only used for the super-admin listing and to
    /// warm the organization cache
    async fn list_organizations(&self) -> Result<Vec<Organization>, AppError>;

    /// Replace an organization's per-minute rates
    async fn update_organization_billing(
        &self,
        organization_id: Uuid,
        billing_rate_per_minute: Decimal,
        cogs_per_minute: Decimal,
    ) -> Result<Organization, AppError>;

    /// Calls strictly after `cursor`, newest first, at most `limit` of them
    async fn fetch_calls(
        &self,
        organization_id: Uuid,
        filter: &CallFilter,
        cursor: Option<&CallCursor>,
        limit: i64,
    ) -> Result<Vec<Call>, AppError>;

    /// Aggregate counters over the filtered calls
    async fn overview(
        &self,
        organization_id: Uuid,
        filter: &CallFilter,
    ) -> Result<OverviewAggregate, AppError>;
}

/// Agent registry
#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn create(&self, agent: &Agent) -> Result<Agent, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<Agent>, AppError>;

    async fn find_by_webhook_path(&self, webhook_path: &str) -> Result<Option<Agent>, AppError>;

    /// Find the agent registered under a provider agent id
    async fn find_by_provider_agent_id(&self, agent_id: &str) -> Result<Option<Agent>, AppError>;

    async fn list(&self, organization_id: Uuid) -> Result<Vec<Agent>, AppError>;

    /// Persist the lifecycle fields of an agent
    async fn save_state(&self, agent: &Agent) -> Result<Agent, AppError>;

    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}

/// Voice-agent provider REST API
#[async_trait]
pub trait ProviderApi: Send + Sync {
    /// One page of calls for an agent within a time range
    async fn list_calls(&self, listing: &ProviderCallListing)
        -> Result<Vec<ProviderCall>, AppError>;
}

/// Clamp a requested page size into `1..=max`, using `default` when absent
pub fn clamp_page_size(requested: Option<i64>, default: i64, max: i64) -> i64 {
    requested.unwrap_or(default).clamp(1, max.max(1))
}
