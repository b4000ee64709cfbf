//! Shared fixtures for service tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;
use vox_cache::CacheService;
use vox_core::config::{CacheConfig, MetricsConfig};
use vox_core::models::{
    Agent, NewAgent, Organization, Principal, ProviderCall, ProviderCallListing, Role,
};
use vox_core::traits::{AgentStore, ProviderApi};
use vox_core::AppResult;
use vox_db::MemoryStore;
use vox_services::{
    IngestionPipeline, MultiTenantMetrics, Normalizer, OrganizationService, SignatureVerifier,
};

pub const SECRET: &str = "whsec_test";

pub struct Harness {
    pub store: MemoryStore,
    pub cache: Arc<CacheService>,
    pub pipeline: Arc<IngestionPipeline>,
    pub metrics: MultiTenantMetrics,
    pub organizations: OrganizationService,
    pub acme: Organization,
    pub globex: Organization,
}

pub fn organization(name: &str, slug: &str) -> Organization {
    Organization {
        id: Uuid::new_v4(),
        name: name.to_string(),
        slug: slug.to_string(),
        billing_rate_per_minute: dec!(0.50),
        cogs_per_minute: dec!(0.10),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

impl Harness {
    pub fn new(secret: Option<&str>) -> Self {
        let store = MemoryStore::new();
        let acme = organization("Acme", "acme");
        let globex = organization("Globex", "globex");
        store.insert_organization(acme.clone());
        store.insert_organization(globex.clone());

        let cache = Arc::new(CacheService::new(&CacheConfig::default()));
        let verifier = SignatureVerifier::new(
            secret.map(str::to_string),
            vec!["x-retell-signature".to_string()],
        );
        let pipeline = Arc::new(IngestionPipeline::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::clone(&cache),
            Normalizer::default(),
            verifier,
        ));
        let organizations = OrganizationService::new(Arc::new(store.clone()), Arc::clone(&cache));
        let metrics = MultiTenantMetrics::new(
            Arc::new(store.clone()),
            Arc::clone(&cache),
            organizations.clone(),
            MetricsConfig::default(),
        );

        Self {
            store,
            cache,
            pipeline,
            metrics,
            organizations,
            acme,
            globex,
        }
    }

    /// Register a pending agent directly in the store
    pub async fn register_agent(&self, organization_id: Uuid, agent_id: &str) -> Agent {
        let agent = Agent::new(
            organization_id,
            &NewAgent {
                agent_id: agent_id.to_string(),
                name: format!("Agent {}", agent_id),
            },
            Utc::now(),
        );
        self.store.create(&agent).await.unwrap()
    }
}

pub fn principal(role: Role, organization_id: Option<Uuid>) -> Principal {
    Principal {
        id: Uuid::new_v4(),
        role,
        organization_id,
        email: None,
    }
}

pub fn body(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap()
}

/// `call_ended` webhook for a 150 second call starting at `minute`
pub fn call_ended(call_id: &str, agent_id: &str, minute: u32) -> Value {
    json!({
        "event": "call_ended",
        "call": {
            "call_id": call_id,
            "agent_id": agent_id,
            "from_number": "4155551234",
            "to_number": "4155550000",
            "direction": "inbound",
            "status": "call_ended",
            "disconnection_reason": "customer_hangup",
            "started_at": format!("2024-01-01T00:{:02}:00Z", minute),
            "connected_at": format!("2024-01-01T00:{:02}:00Z", minute),
            "ended_at": format!("2024-01-01T00:{:02}:30Z", minute + 2)
        }
    })
}

/// Provider listing fake returning fixed pages by offset
#[derive(Default)]
pub struct FakeProvider {
    pub calls: Vec<Value>,
    pub requests: Mutex<Vec<ProviderCallListing>>,
}

#[async_trait]
impl ProviderApi for FakeProvider {
    async fn list_calls(&self, listing: &ProviderCallListing) -> AppResult<Vec<ProviderCall>> {
        self.requests.lock().push(listing.clone());
        self.calls
            .iter()
            .skip(listing.offset as usize)
            .take(listing.limit as usize)
            .cloned()
            .map(ProviderCall::from_value)
            .collect()
    }
}
