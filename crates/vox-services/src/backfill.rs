//! Historical import from the provider API
//!
//! One retry-free pass: offset paging until a short page, each call going
//! through the same normalize + upsert path as webhooks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use vox_core::models::{Principal, ProviderCallListing};
use vox_core::traits::{AgentStore, ProviderApi};
use vox_core::{AppError, AppResult};

use crate::constants::MAX_BACKFILL_PAGES;
use crate::ingestion::IngestionPipeline;

#[derive(Debug, Clone, Deserialize)]
pub struct BackfillRequest {
    /// Provider agent id; falls back to the configured default agent
    #[serde(default)]
    pub agent_id: Option<String>,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub total_calls: u64,
    /// Calls the provider returned that could not be normalized
    pub skipped_calls: u64,
    pub pages: u32,
}

pub struct BackfillService {
    provider: Arc<dyn ProviderApi>,
    agents: Arc<dyn AgentStore>,
    pipeline: Arc<IngestionPipeline>,
    page_size: u32,
    default_agent_id: Option<String>,
}

impl BackfillService {
    pub fn new(
        provider: Arc<dyn ProviderApi>,
        agents: Arc<dyn AgentStore>,
        pipeline: Arc<IngestionPipeline>,
        page_size: u32,
        default_agent_id: Option<String>,
    ) -> Self {
        Self {
            provider,
            agents,
            pipeline,
            page_size: page_size.max(1),
            default_agent_id,
        }
    }

    /// Import an agent's calls in `[from, to]` into `organization_id`
    ///
    /// # Errors
    ///
    /// - `AuthorizationDenied` unless the caller is a super-admin
    /// - `Validation` for an empty window or when no agent id is known
    /// - `AuthorizationDenied` if the agent belongs to another organization
    /// - `Provider` / `StoreUnavailable` abort the pass; calls stored before
    ///   the failure stay stored
    #[instrument(skip(self, caller, request), fields(caller = %caller.id))]
    pub async fn backfill(
        &self,
        caller: &Principal,
        organization_id: Uuid,
        request: &BackfillRequest,
    ) -> AppResult<BackfillReport> {
        caller.require_super_admin()?;

        if request.from > request.to {
            return Err(AppError::Validation("from must not be after to".to_string()));
        }

        let agent_id = request
            .agent_id
            .clone()
            .or_else(|| self.default_agent_id.clone())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::Validation("agent_id is required".to_string()))?;

        if let Some(agent) = self.agents.find_by_provider_agent_id(&agent_id).await? {
            if agent.organization_id != organization_id {
                warn!(agent_id = %agent_id, "Backfill target organization does not own agent");
                return Err(AppError::AuthorizationDenied(
                    "agent belongs to another organization".to_string(),
                ));
            }
        }

        let mut report = BackfillReport::default();
        let mut offset = 0u32;

        while report.pages < MAX_BACKFILL_PAGES {
            let listing = ProviderCallListing {
                agent_id: agent_id.clone(),
                start_timestamp: request.from.timestamp_millis(),
                end_timestamp: request.to.timestamp_millis(),
                limit: self.page_size,
                offset,
            };
            let calls = self.provider.list_calls(&listing).await?;
            report.pages += 1;

            for call in &calls {
                match self.pipeline.ingest_call(organization_id, call).await {
                    Ok(_) => report.total_calls += 1,
                    Err(AppError::InvalidPayload(reason)) => {
                        warn!(reason = %reason, "Skipping unusable provider call");
                        report.skipped_calls += 1;
                    }
                    Err(e) => return Err(e),
                }
            }

            if calls.len() < self.page_size as usize {
                break;
            }
            offset = offset.saturating_add(self.page_size);
        }

        info!(
            organization_id = %organization_id,
            agent_id = %agent_id,
            total_calls = report.total_calls,
            skipped_calls = report.skipped_calls,
            pages = report.pages,
            "Backfill completed"
        );
        Ok(report)
    }
}
