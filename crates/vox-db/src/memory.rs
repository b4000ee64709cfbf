//! In-memory store
//!
//! Implements both store traits over plain maps with the same merge, ordering
//! and uniqueness rules as the PostgreSQL stores. Cloning shares the data.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;
use vox_core::{
    models::{
        Agent, Call, CallCursor, CallFilter, CallUpsert, Organization, OverviewAggregate,
    },
    traits::{AgentStore, TenantStore},
    AppError, AppResult,
};

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    calls: RwLock<HashMap<String, Call>>,
    organizations: RwLock<HashMap<Uuid, Organization>>,
    agents: RwLock<HashMap<Uuid, Agent>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_organization(&self, org: Organization) {
        self.inner.organizations.write().insert(org.id, org);
    }

    /// Number of stored calls across all organizations
    pub fn call_count(&self) -> usize {
        self.inner.calls.read().len()
    }

    /// Make every operation fail with `StoreUnavailable` until reset
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> AppResult<()> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            Err(AppError::StoreUnavailable("memory store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TenantStore for MemoryStore {
    async fn upsert_call(&self, call: &CallUpsert) -> AppResult<Call> {
        self.check_available()?;
        let now = Utc::now();
        let mut calls = self.inner.calls.write();

        let stored = calls
            .entry(call.external_call_id.clone())
            .and_modify(|existing| existing.apply(call, now))
            .or_insert_with(|| Call::from_upsert(call, now));

        Ok(stored.clone())
    }

    async fn find_call(
        &self,
        organization_id: Uuid,
        external_call_id: &str,
    ) -> AppResult<Option<Call>> {
        self.check_available()?;
        Ok(self
            .inner
            .calls
            .read()
            .get(external_call_id)
            .filter(|call| call.organization_id == organization_id)
            .cloned())
    }

    async fn list_organizations(&self) -> AppResult<Vec<Organization>> {
        self.check_available()?;
        let mut orgs: Vec<Organization> =
            self.inner.organizations.read().values().cloned().collect();
        orgs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(orgs)
    }

    async fn update_organization_billing(
        &self,
        organization_id: Uuid,
        billing_rate_per_minute: Decimal,
        cogs_per_minute: Decimal,
    ) -> AppResult<Organization> {
        self.check_available()?;
        let mut orgs = self.inner.organizations.write();
        let org = orgs
            .get_mut(&organization_id)
            .ok_or_else(|| AppError::OrganizationNotFound(organization_id.to_string()))?;

        org.billing_rate_per_minute = billing_rate_per_minute;
        org.cogs_per_minute = cogs_per_minute;
        org.updated_at = Utc::now();
        Ok(org.clone())
    }

    async fn fetch_calls(
        &self,
        organization_id: Uuid,
        filter: &CallFilter,
        cursor: Option<&CallCursor>,
        limit: i64,
    ) -> AppResult<Vec<Call>> {
        self.check_available()?;
        let calls = self.inner.calls.read();

        let mut page: Vec<Call> = calls
            .values()
            .filter(|call| call.organization_id == organization_id && filter.matches(call))
            .filter(|call| {
                cursor.map_or(true, |c| {
                    c.precedes(call.occurred_at(), &call.external_call_id)
                })
            })
            .cloned()
            .collect();

        page.sort_by(|a, b| {
            (b.occurred_at(), &b.external_call_id).cmp(&(a.occurred_at(), &a.external_call_id))
        });
        page.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(page)
    }

    async fn overview(
        &self,
        organization_id: Uuid,
        filter: &CallFilter,
    ) -> AppResult<OverviewAggregate> {
        self.check_available()?;
        let calls = self.inner.calls.read();

        let mut aggregate = OverviewAggregate::default();
        calls
            .values()
            .filter(|call| call.organization_id == organization_id && filter.matches(call))
            .for_each(|call| aggregate.add(call));
        Ok(aggregate)
    }
}

#[async_trait]
impl AgentStore for MemoryStore {
    async fn create(&self, agent: &Agent) -> AppResult<Agent> {
        self.check_available()?;
        let mut agents = self.inner.agents.write();

        let duplicate = agents.values().any(|existing| {
            existing.agent_id == agent.agent_id || existing.webhook_path == agent.webhook_path
        });
        if duplicate {
            return Err(AppError::Validation(format!(
                "Agent {} is already registered",
                agent.agent_id
            )));
        }

        agents.insert(agent.id, agent.clone());
        Ok(agent.clone())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Agent>> {
        self.check_available()?;
        Ok(self.inner.agents.read().get(&id).cloned())
    }

    async fn find_by_webhook_path(&self, webhook_path: &str) -> AppResult<Option<Agent>> {
        self.check_available()?;
        Ok(self
            .inner
            .agents
            .read()
            .values()
            .find(|agent| agent.webhook_path == webhook_path)
            .cloned())
    }

    async fn find_by_provider_agent_id(&self, agent_id: &str) -> AppResult<Option<Agent>> {
        self.check_available()?;
        Ok(self
            .inner
            .agents
            .read()
            .values()
            .find(|agent| agent.agent_id == agent_id)
            .cloned())
    }

    async fn list(&self, organization_id: Uuid) -> AppResult<Vec<Agent>> {
        self.check_available()?;
        let mut agents: Vec<Agent> = self
            .inner
            .agents
            .read()
            .values()
            .filter(|agent| agent.organization_id == organization_id)
            .cloned()
            .collect();
        agents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(agents)
    }

    async fn save_state(&self, agent: &Agent) -> AppResult<Agent> {
        self.check_available()?;
        let mut agents = self.inner.agents.write();
        let stored = agents
            .get_mut(&agent.id)
            .ok_or_else(|| AppError::AgentNotFound(agent.id.to_string()))?;

        stored.status = agent.status;
        stored.is_validated = agent.is_validated;
        stored.last_webhook_received_at = agent.last_webhook_received_at;
        stored.error_message.clone_from(&agent.error_message);
        stored.updated_at = agent.updated_at;
        Ok(stored.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        self.check_available()?;
        Ok(self.inner.agents.write().remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;
    use serde_json::json;
    use vox_core::models::{AgentStatus, NewAgent};

    fn upsert(org: Uuid, id: &str, minute: u32) -> CallUpsert {
        CallUpsert {
            external_call_id: id.to_string(),
            organization_id: org,
            agent_id: "agent_abc".to_string(),
            started_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, minute, 0).unwrap()),
            connected_at: None,
            ended_at: None,
            direction: None,
            from_address: None,
            to_address: None,
            status: None,
            end_reason: None,
            duration_seconds: None,
            billed_minutes: None,
            summary: None,
            transcript: None,
            raw: json!({"call_id": id}),
        }
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let store = MemoryStore::new();
        let org = Uuid::new_v4();
        let call = upsert(org, "c1", 0);

        let first = store.upsert_call(&call).await.unwrap();
        let second = store.upsert_call(&call).await.unwrap();

        assert_eq!(store.call_count(), 1);
        assert_eq!(first.received_at, second.received_at);
        assert_eq!(first.raw, second.raw);
    }

    #[tokio::test]
    async fn test_fetch_calls_orders_and_pages() {
        let store = MemoryStore::new();
        let org = Uuid::new_v4();
        for (id, minute) in [("a", 1), ("b", 3), ("c", 2), ("d", 3)] {
            store.upsert_call(&upsert(org, id, minute)).await.unwrap();
        }

        let filter = CallFilter::default();
        let first = store.fetch_calls(org, &filter, None, 2).await.unwrap();
        let ids: Vec<_> = first.iter().map(|c| c.external_call_id.as_str()).collect();
        assert_eq!(ids, vec!["d", "b"]);

        let cursor = first[1].cursor();
        let second = store
            .fetch_calls(org, &filter, Some(&cursor), 10)
            .await
            .unwrap();
        let ids: Vec<_> = second.iter().map(|c| c.external_call_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
    }

    #[tokio::test]
    async fn test_tenant_isolation() {
        let store = MemoryStore::new();
        let org_a = Uuid::new_v4();
        let org_b = Uuid::new_v4();
        store.upsert_call(&upsert(org_a, "c1", 0)).await.unwrap();

        assert!(store.find_call(org_b, "c1").await.unwrap().is_none());
        let page = store
            .fetch_calls(org_b, &CallFilter::default(), None, 10)
            .await
            .unwrap();
        assert!(page.is_empty());
        assert_eq!(
            store.overview(org_b, &CallFilter::default()).await.unwrap(),
            OverviewAggregate::default()
        );
    }

    #[tokio::test]
    async fn test_window_filter() {
        let store = MemoryStore::new();
        let org = Uuid::new_v4();
        store.upsert_call(&upsert(org, "early", 0)).await.unwrap();
        store.upsert_call(&upsert(org, "late", 30)).await.unwrap();

        let filter = CallFilter {
            from: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(10)),
            ..Default::default()
        };
        let aggregate = store.overview(org, &filter).await.unwrap();
        assert_eq!(aggregate.total_calls, 1);
    }

    #[tokio::test]
    async fn test_update_billing() {
        let store = MemoryStore::new();
        let org = Organization {
            id: Uuid::new_v4(),
            name: "Acme".to_string(),
            slug: "acme".to_string(),
            billing_rate_per_minute: dec!(0.10),
            cogs_per_minute: dec!(0.05),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let id = org.id;
        store.insert_organization(org);

        let updated = store
            .update_organization_billing(id, dec!(0.30), dec!(0.08))
            .await
            .unwrap();
        assert_eq!(updated.billing_rate_per_minute, dec!(0.30));

        assert!(matches!(
            store
                .update_organization_billing(Uuid::new_v4(), dec!(1), dec!(1))
                .await,
            Err(AppError::OrganizationNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_agent_uniqueness_and_state() {
        let store = MemoryStore::new();
        let new_agent = NewAgent {
            agent_id: "agent_abc".to_string(),
            name: "Reception".to_string(),
        };
        let mut agent = Agent::new(Uuid::new_v4(), &new_agent, Utc::now());
        store.create(&agent).await.unwrap();

        let duplicate = Agent::new(Uuid::new_v4(), &new_agent, Utc::now());
        assert!(matches!(
            AgentStore::create(&store, &duplicate).await,
            Err(AppError::Validation(_))
        ));

        agent.record_webhook("agent_abc", Utc::now());
        let saved = store.save_state(&agent).await.unwrap();
        assert_eq!(saved.status, AgentStatus::Active);

        let found = store
            .find_by_webhook_path(&agent.webhook_path)
            .await
            .unwrap()
            .unwrap();
        assert!(found.is_validated);

        assert!(AgentStore::delete(&store, agent.id).await.unwrap());
        assert!(!AgentStore::delete(&store, agent.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_unavailable_store_fails() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.upsert_call(&upsert(Uuid::new_v4(), "c1", 0)).await,
            Err(AppError::StoreUnavailable(_))
        ));
        store.set_unavailable(false);
        assert!(store.list_organizations().await.is_ok());
    }
}
