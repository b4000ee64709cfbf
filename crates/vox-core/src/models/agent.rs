//! Agent model
//!
//! An agent is a provider voice agent registered to one organization. Each
//! agent gets its own webhook path; the first webhook that arrives there tells
//! us whether the provider side was wired up with the right agent id.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Prefix of every per-agent webhook path
pub const AGENT_WEBHOOK_PREFIX: &str = "/webhooks/agent/";

const AGENT_ID_PREFIX: &str = "agent_";
const NAME_MIN_LEN: usize = 2;
const NAME_MAX_LEN: usize = 100;

/// Agent lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Registered, waiting for its first webhook
    #[default]
    PendingValidation,
    Active,
    /// Disabled by an administrator
    Inactive,
    /// The first webhook carried a different agent id
    Error,
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentStatus::PendingValidation => write!(f, "pending_validation"),
            AgentStatus::Active => write!(f, "active"),
            AgentStatus::Inactive => write!(f, "inactive"),
            AgentStatus::Error => write!(f, "error"),
        }
    }
}

impl AgentStatus {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending_validation" => Some(AgentStatus::PendingValidation),
            "active" => Some(AgentStatus::Active),
            "inactive" => Some(AgentStatus::Inactive),
            "error" => Some(AgentStatus::Error),
            _ => None,
        }
    }
}

/// Registered agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Internal identifier
    pub id: Uuid,

    pub organization_id: Uuid,

    /// Provider-assigned agent id (`agent_...`)
    pub agent_id: String,

    pub name: String,

    /// Unique per agent, never changes after creation
    pub webhook_path: String,

    pub status: AgentStatus,

    pub is_validated: bool,

    pub last_webhook_received_at: Option<DateTime<Utc>>,

    pub error_message: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Result of checking a webhook against its agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookCheck {
    /// First matching webhook; the agent is now active
    Activated,
    /// Matching webhook on an agent past validation
    Recorded,
    /// Agent id mismatch; `changed` is true when the agent moved to `error`
    Mismatch { changed: bool },
}

impl Agent {
    /// Build a new agent in `pending_validation` with a fresh webhook path
    pub fn new(organization_id: Uuid, new_agent: &NewAgent, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id,
            agent_id: new_agent.agent_id.clone(),
            name: new_agent.name.trim().to_string(),
            webhook_path: format!("{}{}", AGENT_WEBHOOK_PREFIX, Uuid::new_v4().simple()),
            status: AgentStatus::PendingValidation,
            is_validated: false,
            last_webhook_received_at: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Full URL the provider must be configured to call
    pub fn webhook_url(&self, public_base_url: &str) -> String {
        format!("{}{}", public_base_url.trim_end_matches('/'), self.webhook_path)
    }

    /// Apply a webhook carrying `received_agent_id` to this agent
    ///
    /// A match records the arrival time and activates an agent that is still
    /// pending. A mismatch moves a never-validated agent to `error`; an agent
    /// that already validated keeps its state.
    pub fn record_webhook(&mut self, received_agent_id: &str, now: DateTime<Utc>) -> WebhookCheck {
        if received_agent_id == self.agent_id {
            self.last_webhook_received_at = Some(now);
            self.updated_at = now;

            if self.status == AgentStatus::PendingValidation {
                self.status = AgentStatus::Active;
                self.is_validated = true;
                self.error_message = None;
                return WebhookCheck::Activated;
            }
            return WebhookCheck::Recorded;
        }

        if self.is_validated {
            return WebhookCheck::Mismatch { changed: false };
        }

        self.status = AgentStatus::Error;
        self.error_message = Some(format!(
            "Agent ID mismatch: expected {}, got {}",
            self.agent_id, received_agent_id
        ));
        self.updated_at = now;
        WebhookCheck::Mismatch { changed: true }
    }

    /// Administrator override of the lifecycle fields
    pub fn apply_status(&mut self, update: &AgentStatusUpdate, now: DateTime<Utc>) {
        self.status = update.status;
        if let Some(validated) = update.is_validated {
            self.is_validated = validated;
        }
        if update.status == AgentStatus::Active {
            self.error_message = None;
        }
        if update.error_message.is_some() {
            self.error_message.clone_from(&update.error_message);
        }
        self.updated_at = now;
    }

    /// Polling view of this agent's validation
    pub fn validation(&self) -> AgentValidation {
        AgentValidation {
            id: self.id,
            agent_id: self.agent_id.clone(),
            status: self.status,
            is_validated: self.is_validated,
            last_webhook_received_at: self.last_webhook_received_at,
            error_message: self.error_message.clone(),
        }
    }
}

/// Registration request
#[derive(Debug, Clone, Deserialize)]
pub struct NewAgent {
    pub agent_id: String,
    pub name: String,
}

impl NewAgent {
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the agent id is not `agent_` followed
    /// by alphanumerics, or the name is not 2 to 100 characters.
    pub fn validate(&self) -> Result<(), AppError> {
        let suffix = self
            .agent_id
            .strip_prefix(AGENT_ID_PREFIX)
            .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric()));
        if suffix.is_none() {
            return Err(AppError::Validation(format!(
                "agent_id must be '{}' followed by letters or digits",
                AGENT_ID_PREFIX
            )));
        }

        let len = self.name.trim().chars().count();
        if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len) {
            return Err(AppError::Validation(format!(
                "name must be between {} and {} characters",
                NAME_MIN_LEN, NAME_MAX_LEN
            )));
        }

        Ok(())
    }
}

/// Administrator status change
#[derive(Debug, Clone, Deserialize)]
pub struct AgentStatusUpdate {
    pub status: AgentStatus,
    #[serde(default)]
    pub is_validated: Option<bool>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// What a polling client sees
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentValidation {
    pub id: Uuid,
    pub agent_id: String,
    pub status: AgentStatus,
    pub is_validated: bool,
    pub last_webhook_received_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> Agent {
        let new_agent = NewAgent {
            agent_id: "agent_abc123".to_string(),
            name: "Front desk".to_string(),
        };
        Agent::new(Uuid::new_v4(), &new_agent, Utc::now())
    }

    #[test]
    fn test_new_agent_is_pending() {
        let agent = pending();
        assert_eq!(agent.status, AgentStatus::PendingValidation);
        assert!(!agent.is_validated);
        assert!(agent.webhook_path.starts_with(AGENT_WEBHOOK_PREFIX));
        assert_ne!(agent.webhook_path, pending().webhook_path);
    }

    #[test]
    fn test_matching_webhook_activates_once() {
        let mut agent = pending();
        assert_eq!(
            agent.record_webhook("agent_abc123", Utc::now()),
            WebhookCheck::Activated
        );
        assert_eq!(agent.status, AgentStatus::Active);
        assert!(agent.is_validated);
        assert!(agent.last_webhook_received_at.is_some());

        assert_eq!(
            agent.record_webhook("agent_abc123", Utc::now()),
            WebhookCheck::Recorded
        );
        assert_eq!(agent.status, AgentStatus::Active);
    }

    #[test]
    fn test_mismatch_on_pending_agent_errors() {
        let mut agent = pending();
        assert_eq!(
            agent.record_webhook("agent_other", Utc::now()),
            WebhookCheck::Mismatch { changed: true }
        );
        assert_eq!(agent.status, AgentStatus::Error);
        assert!(agent.error_message.is_some());
        assert!(agent.last_webhook_received_at.is_none());
    }

    #[test]
    fn test_mismatch_on_validated_agent_keeps_state() {
        let mut agent = pending();
        agent.record_webhook("agent_abc123", Utc::now());
        assert_eq!(
            agent.record_webhook("agent_other", Utc::now()),
            WebhookCheck::Mismatch { changed: false }
        );
        assert_eq!(agent.status, AgentStatus::Active);
        assert!(agent.error_message.is_none());
    }

    #[test]
    fn test_matching_webhook_on_inactive_agent_keeps_status() {
        let mut agent = pending();
        agent.record_webhook("agent_abc123", Utc::now());
        agent.apply_status(
            &AgentStatusUpdate {
                status: AgentStatus::Inactive,
                is_validated: None,
                error_message: None,
            },
            Utc::now(),
        );
        assert_eq!(
            agent.record_webhook("agent_abc123", Utc::now()),
            WebhookCheck::Recorded
        );
        assert_eq!(agent.status, AgentStatus::Inactive);
    }

    #[test]
    fn test_new_agent_validation() {
        let ok = NewAgent {
            agent_id: "agent_9f3a".to_string(),
            name: "Sales".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad_id = NewAgent {
            agent_id: "agent_with-dash".to_string(),
            ..ok.clone()
        };
        assert!(bad_id.validate().is_err());

        let no_suffix = NewAgent {
            agent_id: "agent_".to_string(),
            ..ok.clone()
        };
        assert!(no_suffix.validate().is_err());

        let short_name = NewAgent {
            name: "A".to_string(),
            ..ok
        };
        assert!(short_name.validate().is_err());
    }

    #[test]
    fn test_webhook_url() {
        let agent = pending();
        let url = agent.webhook_url("https://voice.example.com/");
        assert!(url.starts_with("https://voice.example.com/webhooks/agent/"));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(
            AgentStatus::from_str("PENDING_VALIDATION"),
            Some(AgentStatus::PendingValidation)
        );
        assert_eq!(AgentStatus::from_str("gone"), None);
        assert_eq!(AgentStatus::Error.to_string(), "error");
    }
}
