//! Shared application state handed to every handler

use std::sync::Arc;
use vox_cache::CacheService;
use vox_core::traits::{AgentStore, ProviderApi, TenantStore};
use vox_core::AppConfig;
use vox_services::{
    AgentValidator, BackfillService, IngestionPipeline, MultiTenantMetrics, Normalizer,
    OrganizationService, SignatureVerifier,
};

/// Services wired over one backing store and one cache
pub struct AppState {
    pub pipeline: Arc<IngestionPipeline>,
    pub agents: AgentValidator,
    pub metrics: MultiTenantMetrics,
    pub organizations: OrganizationService,
    /// Absent when no provider API key is configured
    pub backfill: Option<BackfillService>,
    pub cache: Arc<CacheService>,
}

impl AppState {
    pub fn build(
        config: &AppConfig,
        calls: Arc<dyn TenantStore>,
        agents: Arc<dyn AgentStore>,
        provider: Option<Arc<dyn ProviderApi>>,
        cache: Arc<CacheService>,
    ) -> Self {
        let pipeline = Arc::new(IngestionPipeline::new(
            Arc::clone(&calls),
            Arc::clone(&agents),
            Arc::clone(&cache),
            Normalizer::new(config.provider.default_agent_id.clone()),
            SignatureVerifier::from_config(&config.webhook),
        ));
        let organizations = OrganizationService::new(Arc::clone(&calls), Arc::clone(&cache));
        let metrics = MultiTenantMetrics::new(
            calls,
            Arc::clone(&cache),
            organizations.clone(),
            config.metrics,
        );
        let backfill = provider.map(|provider| {
            BackfillService::new(
                provider,
                Arc::clone(&agents),
                Arc::clone(&pipeline),
                config.provider.backfill_page_size,
                config.provider.default_agent_id.clone(),
            )
        });

        Self {
            pipeline,
            agents: AgentValidator::new(agents, config.server.public_base_url.clone()),
            metrics,
            organizations,
            backfill,
            cache,
        }
    }
}
