//! Agent registration and webhook validation
//!
//! The state transitions themselves live on [`Agent`]; this service owns the
//! administrator surface around them.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use vox_core::models::{Agent, AgentStatusUpdate, AgentValidation, NewAgent, Principal};
use vox_core::traits::AgentStore;
use vox_core::{AppError, AppResult};

/// Agent as returned to administrators, with the URL to configure at the
/// provider
#[derive(Debug, Clone, Serialize)]
pub struct AgentView {
    #[serde(flatten)]
    pub agent: Agent,
    pub webhook_url: String,
}

/// Administrator operations on agents
pub struct AgentValidator {
    agents: Arc<dyn AgentStore>,
    public_base_url: String,
}

impl AgentValidator {
    pub fn new(agents: Arc<dyn AgentStore>, public_base_url: impl Into<String>) -> Self {
        Self {
            agents,
            public_base_url: public_base_url.into(),
        }
    }

    fn view(&self, agent: Agent) -> AgentView {
        AgentView {
            webhook_url: agent.webhook_url(&self.public_base_url),
            agent,
        }
    }

    async fn load(&self, id: Uuid) -> AppResult<Agent> {
        self.agents
            .get(id)
            .await?
            .ok_or_else(|| AppError::AgentNotFound(id.to_string()))
    }

    /// Register an agent in `pending_validation` with a fresh webhook path
    #[instrument(skip(self, caller, request), fields(agent_id = %request.agent_id))]
    pub async fn create_agent(
        &self,
        caller: &Principal,
        organization_id: Uuid,
        request: &NewAgent,
    ) -> AppResult<AgentView> {
        caller.require_super_admin()?;
        request.validate()?;

        let agent = Agent::new(organization_id, request, Utc::now());
        let created = self.agents.create(&agent).await?;

        info!(
            id = %created.id,
            organization_id = %organization_id,
            webhook_path = %created.webhook_path,
            "Agent registered, awaiting first webhook"
        );
        Ok(self.view(created))
    }

    #[instrument(skip(self, caller))]
    pub async fn list_agents(
        &self,
        caller: &Principal,
        organization_id: Uuid,
    ) -> AppResult<Vec<AgentView>> {
        caller.require_super_admin()?;
        let agents = self.agents.list(organization_id).await?;
        Ok(agents.into_iter().map(|a| self.view(a)).collect())
    }

    #[instrument(skip(self, caller))]
    pub async fn get_agent(&self, caller: &Principal, id: Uuid) -> AppResult<AgentView> {
        caller.require_super_admin()?;
        self.load(id).await.map(|a| self.view(a))
    }

    /// Poll the validation state; a pure read
    #[instrument(skip(self, caller))]
    pub async fn check_validation(&self, caller: &Principal, id: Uuid) -> AppResult<AgentValidation> {
        caller.require_super_admin()?;
        self.load(id).await.map(|a| a.validation())
    }

    #[instrument(skip(self, caller, update), fields(status = %update.status))]
    pub async fn update_status(
        &self,
        caller: &Principal,
        id: Uuid,
        update: &AgentStatusUpdate,
    ) -> AppResult<AgentView> {
        caller.require_super_admin()?;

        let mut agent = self.load(id).await?;
        let previous = agent.status;
        agent.apply_status(update, Utc::now());
        let saved = self.agents.save_state(&agent).await?;

        info!(agent_id = %saved.agent_id, from = %previous, to = %saved.status, "Agent status changed");
        Ok(self.view(saved))
    }

    #[instrument(skip(self, caller))]
    pub async fn delete_agent(&self, caller: &Principal, id: Uuid) -> AppResult<()> {
        caller.require_super_admin()?;

        if self.agents.delete(id).await? {
            info!(id = %id, "Agent deleted");
            Ok(())
        } else {
            warn!(id = %id, "Delete requested for unknown agent");
            Err(AppError::AgentNotFound(id.to_string()))
        }
    }
}
