//! Agent registry implementation
//!
//! PostgreSQL-backed storage for registered provider agents. The webhook path
//! and the provider agent id are both unique.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};
use tracing::{debug, instrument};
use uuid::Uuid;
use vox_core::{
    models::{Agent, AgentStatus},
    traits::AgentStore,
    AppError, AppResult,
};

use crate::store_error;

/// PostgreSQL implementation of AgentStore
pub struct PgAgentStore {
    pool: PgPool,
}

impl PgAgentStore {
    /// Create a new agent store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, column: &str, value: &str) -> AppResult<Option<Agent>> {
        let query = format!(
            "SELECT {} FROM agents WHERE {} = $1",
            AGENT_SELECT_COLUMNS, column
        );

        let row = sqlx::query_as::<Postgres, AgentRow>(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error("finding agent", e))?;

        Ok(row.map(Into::into))
    }
}

const AGENT_SELECT_COLUMNS: &str = r#"
    id, organization_id, agent_id, name, webhook_path,
    status, is_validated, last_webhook_received_at, error_message,
    created_at, updated_at
"#;

#[async_trait]
impl AgentStore for PgAgentStore {
    #[instrument(skip(self, agent), fields(agent_id = %agent.agent_id))]
    async fn create(&self, agent: &Agent) -> AppResult<Agent> {
        debug!("Creating agent");

        let query = format!(
            r#"
            INSERT INTO agents (
                id, organization_id, agent_id, name, webhook_path,
                status, is_validated, last_webhook_received_at, error_message,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            AGENT_SELECT_COLUMNS
        );

        let row = sqlx::query_as::<Postgres, AgentRow>(&query)
            .bind(agent.id)
            .bind(agent.organization_id)
            .bind(&agent.agent_id)
            .bind(&agent.name)
            .bind(&agent.webhook_path)
            .bind(agent.status.to_string())
            .bind(agent.is_validated)
            .bind(agent.last_webhook_received_at)
            .bind(&agent.error_message)
            .bind(agent.created_at)
            .bind(agent.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match store_error("creating agent", e) {
                AppError::Validation(_) => AppError::Validation(format!(
                    "Agent {} is already registered",
                    agent.agent_id
                )),
                other => other,
            })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn get(&self, id: Uuid) -> AppResult<Option<Agent>> {
        let query = format!("SELECT {} FROM agents WHERE id = $1", AGENT_SELECT_COLUMNS);

        let row = sqlx::query_as::<Postgres, AgentRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error("getting agent", e))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_by_webhook_path(&self, webhook_path: &str) -> AppResult<Option<Agent>> {
        self.find_one("webhook_path", webhook_path).await
    }

    #[instrument(skip(self))]
    async fn find_by_provider_agent_id(&self, agent_id: &str) -> AppResult<Option<Agent>> {
        self.find_one("agent_id", agent_id).await
    }

    #[instrument(skip(self))]
    async fn list(&self, organization_id: Uuid) -> AppResult<Vec<Agent>> {
        let query = format!(
            "SELECT {} FROM agents WHERE organization_id = $1 ORDER BY created_at DESC",
            AGENT_SELECT_COLUMNS
        );

        let rows = sqlx::query_as::<Postgres, AgentRow>(&query)
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| store_error("listing agents", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, agent), fields(agent_id = %agent.agent_id, status = %agent.status))]
    async fn save_state(&self, agent: &Agent) -> AppResult<Agent> {
        let query = format!(
            r#"
            UPDATE agents
            SET status = $2,
                is_validated = $3,
                last_webhook_received_at = $4,
                error_message = $5,
                updated_at = $6
            WHERE id = $1
            RETURNING {}
            "#,
            AGENT_SELECT_COLUMNS
        );

        let row = sqlx::query_as::<Postgres, AgentRow>(&query)
            .bind(agent.id)
            .bind(agent.status.to_string())
            .bind(agent.is_validated)
            .bind(agent.last_webhook_received_at)
            .bind(&agent.error_message)
            .bind(agent.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error("saving agent state", e))?;

        row.map(Into::into)
            .ok_or_else(|| AppError::AgentNotFound(agent.id.to_string()))
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM agents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("deleting agent", e))?;

        Ok(result.rows_affected() > 0)
    }
}

/// Helper struct for mapping database rows to domain model
#[derive(Debug, sqlx::FromRow)]
struct AgentRow {
    id: Uuid,
    organization_id: Uuid,
    agent_id: String,
    name: String,
    webhook_path: String,
    status: String,
    is_validated: bool,
    last_webhook_received_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AgentRow> for Agent {
    fn from(row: AgentRow) -> Self {
        Agent {
            id: row.id,
            organization_id: row.organization_id,
            agent_id: row.agent_id,
            name: row.name,
            webhook_path: row.webhook_path,
            status: AgentStatus::from_str(&row.status).unwrap_or_default(),
            is_validated: row.is_validated,
            last_webhook_received_at: row.last_webhook_received_at,
            error_message: row.error_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
