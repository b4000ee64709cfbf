//! Business logic services for VoxMetrics
//!
//! This crate contains the services that sit between the HTTP surface and the
//! backing store.
//!
//! # Architecture
//!
//! - Each service owns its dependencies as `Arc<dyn Trait>` so the PostgreSQL
//!   stores and the in-memory store are interchangeable
//! - The cache is an injected [`vox_cache::CacheService`], never a global
//! - All async operations are instrumented with tracing
//! - Every failure is an `AppError` scoped to one request or event
//!
//! # Services
//!
//! - [`Normalizer`] - provider payload to canonical call (pure)
//! - [`SignatureVerifier`] - HMAC-SHA256 webhook signatures
//! - [`IngestionPipeline`] - normalize + idempotent upsert
//! - [`AgentValidator`] - agent registration and the webhook validation state machine
//! - [`MultiTenantMetrics`] - tenant-scoped, cache-aside reads
//! - [`OrganizationService`] - billing rate administration
//! - [`ProviderClient`] / [`BackfillService`] - pulling history from the provider API

pub mod agent_validation;
pub mod backfill;
pub mod ingestion;
pub mod metrics;
pub mod normalizer;
pub mod organizations;
pub mod provider;
pub mod signature;

pub use agent_validation::{AgentView, AgentValidator};
pub use backfill::{BackfillReport, BackfillRequest, BackfillService};
pub use ingestion::{IngestOutcome, IngestionPipeline};
pub use metrics::{
    CallsQuery, CallsResult, MultiTenantMetrics, Overview, OverviewQuery, OverviewResult,
};
pub use normalizer::Normalizer;
pub use organizations::{OrganizationService, OrganizationSummary};
pub use provider::ProviderClient;
pub use signature::SignatureVerifier;

/// Business logic constants
pub mod constants {
    /// Metrics family name used in overview cache keys
    pub const OVERVIEW_METRIC: &str = "overview";

    /// Provider listing timeout in seconds
    pub const PROVIDER_TIMEOUT_SECS: u64 = 30;

    /// Upper bound on pages fetched by one backfill
    pub const MAX_BACKFILL_PAGES: u32 = 1000;
}
