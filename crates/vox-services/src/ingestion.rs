//! Webhook ingestion pipeline
//!
//! verify signature -> decode envelope -> (per-agent path: validate agent)
//! -> normalize -> idempotent upsert -> invalidate the tenant's metrics.
//!
//! Everything that can reject an event runs before the first write.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use vox_cache::CacheService;
use vox_core::models::{
    Call, CallUpsert, ProviderCall, WebhookCheck, WebhookEnvelope, WebhookEvent,
};
use vox_core::traits::{AgentStore, TenantStore};
use vox_core::{AppError, AppResult};

use crate::normalizer::Normalizer;
use crate::signature::SignatureVerifier;

/// What happened to one webhook delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    pub event: String,
    /// Set when a call was written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_call_id: Option<String>,
    /// True when this delivery moved the agent to `active`
    pub agent_validated: bool,
}

impl IngestOutcome {
    fn ignored(event: &WebhookEvent) -> Self {
        Self {
            event: event.to_string(),
            external_call_id: None,
            agent_validated: false,
        }
    }

    pub fn is_stored(&self) -> bool {
        self.external_call_id.is_some()
    }
}

/// Turns provider deliveries into stored calls
pub struct IngestionPipeline {
    calls: Arc<dyn TenantStore>,
    agents: Arc<dyn AgentStore>,
    cache: Arc<CacheService>,
    normalizer: Normalizer,
    verifier: SignatureVerifier,
}

impl IngestionPipeline {
    pub fn new(
        calls: Arc<dyn TenantStore>,
        agents: Arc<dyn AgentStore>,
        cache: Arc<CacheService>,
        normalizer: Normalizer,
        verifier: SignatureVerifier,
    ) -> Self {
        Self {
            calls,
            agents,
            cache,
            normalizer,
            verifier,
        }
    }

    pub fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }

    /// Shared webhook endpoint
    ///
    /// The tenant is resolved through the agent registered under the
    /// payload's agent id.
    ///
    /// # Errors
    ///
    /// - `SignatureInvalid` if the signature check fails
    /// - `InvalidPayload` if the body or call object is malformed
    /// - `AgentNotFound` if no agent is registered for the payload's agent id
    /// - `StoreUnavailable` if the store cannot be reached
    #[instrument(skip(self, signature, body), fields(body_len = body.len()))]
    pub async fn ingest(&self, signature: Option<&str>, body: &[u8]) -> AppResult<IngestOutcome> {
        self.verifier.verify(signature, body)?;
        let envelope = WebhookEnvelope::parse(body)?;

        if !envelope.event.is_call_event() {
            info!(event = %envelope.event, "Ignoring non-call webhook event");
            return Ok(IngestOutcome::ignored(&envelope.event));
        }

        let canonical = self.normalizer.normalize(&envelope.call)?;
        let agent = self
            .agents
            .find_by_provider_agent_id(&canonical.agent_id)
            .await?
            .ok_or_else(|| {
                warn!(agent_id = %canonical.agent_id, "Webhook for unregistered agent");
                AppError::AgentNotFound(canonical.agent_id.clone())
            })?;

        let stored = self
            .store(CallUpsert::from_canonical(agent.organization_id, &canonical))
            .await?;

        Ok(IngestOutcome {
            event: envelope.event.to_string(),
            external_call_id: Some(stored.external_call_id),
            agent_validated: false,
        })
    }

    /// Per-agent webhook endpoint
    ///
    /// Drives the agent validation state machine before the call is stored.
    /// Call events are normalized first, so a malformed call leaves the agent
    /// as it was. A mismatching agent id rejects the delivery and leaves the
    /// call store untouched.
    ///
    /// # Errors
    ///
    /// Same as [`IngestionPipeline::ingest`], plus `AgentNotFound` for an
    /// unknown `webhook_path` and `AgentIdMismatch` when the payload names a
    /// different agent.
    #[instrument(skip(self, signature, body), fields(body_len = body.len()))]
    pub async fn ingest_for_agent(
        &self,
        webhook_path: &str,
        signature: Option<&str>,
        body: &[u8],
    ) -> AppResult<IngestOutcome> {
        self.verifier.verify(signature, body)?;
        let envelope = WebhookEnvelope::parse(body)?;

        let mut agent = self
            .agents
            .find_by_webhook_path(webhook_path)
            .await?
            .ok_or_else(|| {
                warn!(webhook_path, "No agent registered for webhook path");
                AppError::AgentNotFound(webhook_path.to_string())
            })?;

        let received = envelope
            .agent_id()
            .ok_or_else(|| AppError::InvalidPayload("missing agent id".to_string()))?
            .to_string();

        let canonical = if envelope.event.is_call_event() {
            Some(self.normalizer.normalize(&envelope.call)?)
        } else {
            None
        };

        let check = agent.record_webhook(&received, Utc::now());
        match check {
            WebhookCheck::Mismatch { changed } => {
                warn!(
                    expected = %agent.agent_id,
                    received = %received,
                    state_changed = changed,
                    "Agent id mismatch on per-agent webhook"
                );
                if changed {
                    self.agents.save_state(&agent).await?;
                }
                return Err(AppError::AgentIdMismatch {
                    expected: agent.agent_id,
                    received,
                });
            }
            WebhookCheck::Activated => {
                self.agents.save_state(&agent).await?;
                info!(agent_id = %agent.agent_id, name = %agent.name, "Agent validated");
            }
            WebhookCheck::Recorded => {
                self.agents.save_state(&agent).await?;
                debug!(agent_id = %agent.agent_id, "Webhook receipt recorded");
            }
        }
        let agent_validated = check == WebhookCheck::Activated;

        let Some(canonical) = canonical else {
            info!(event = %envelope.event, "Ignoring non-call webhook event");
            return Ok(IngestOutcome {
                agent_validated,
                ..IngestOutcome::ignored(&envelope.event)
            });
        };

        let stored = self
            .store(CallUpsert::from_canonical(agent.organization_id, &canonical))
            .await?;

        Ok(IngestOutcome {
            event: envelope.event.to_string(),
            external_call_id: Some(stored.external_call_id),
            agent_validated,
        })
    }

    /// Normalize and store one call fetched from the provider API
    ///
    /// Used by backfill: no signature, no agent validation.
    #[instrument(skip(self, call))]
    pub async fn ingest_call(&self, organization_id: Uuid, call: &ProviderCall) -> AppResult<Call> {
        let canonical = self.normalizer.normalize(call)?;
        self.store(CallUpsert::from_canonical(organization_id, &canonical))
            .await
    }

    async fn store(&self, upsert: CallUpsert) -> AppResult<Call> {
        let stored = self.calls.upsert_call(&upsert).await?;
        let dropped = self.cache.invalidate_org_metrics(upsert.organization_id);

        debug!(
            call_id = %stored.external_call_id,
            organization_id = %stored.organization_id,
            billable = stored.is_billable(),
            metrics_dropped = dropped,
            "Call upserted"
        );
        Ok(stored)
    }
}
