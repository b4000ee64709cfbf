//! Agent administration DTOs

use serde::Deserialize;
use validator::{Validate, ValidationError};
use vox_core::models::{AgentStatus, AgentStatusUpdate, NewAgent};

/// Register an agent
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAgentRequest {
    /// Provider agent id, `agent_` followed by letters or digits
    #[validate(custom(function = "validate_agent_id"))]
    pub agent_id: String,

    #[validate(length(min = 2, max = 100))]
    pub name: String,
}

fn validate_agent_id(agent_id: &str) -> Result<(), ValidationError> {
    match agent_id.strip_prefix("agent_") {
        Some(rest) if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric()) => Ok(()),
        _ => Err(ValidationError::new("agent_id_format")),
    }
}

impl CreateAgentRequest {
    pub fn to_new_agent(&self) -> NewAgent {
        NewAgent {
            agent_id: self.agent_id.clone(),
            name: self.name.trim().to_string(),
        }
    }
}

/// Change an agent's lifecycle fields
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateAgentStatusRequest {
    pub status: AgentStatus,

    #[serde(default)]
    pub is_validated: Option<bool>,

    #[serde(default)]
    #[validate(length(max = 500))]
    pub error_message: Option<String>,
}

impl From<UpdateAgentStatusRequest> for AgentStatusUpdate {
    fn from(req: UpdateAgentStatusRequest) -> Self {
        Self {
            status: req.status,
            is_validated: req.is_validated,
            error_message: req.error_message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_agent_validation() {
        let valid = CreateAgentRequest {
            agent_id: "agent_abc123".to_string(),
            name: "Front desk".to_string(),
        };
        assert!(valid.validate().is_ok());

        let bad_id = CreateAgentRequest {
            agent_id: "bot_abc".to_string(),
            ..valid.clone()
        };
        assert!(bad_id.validate().is_err());

        let short_name = CreateAgentRequest {
            name: "x".to_string(),
            ..valid
        };
        assert!(short_name.validate().is_err());
    }

    #[test]
    fn test_status_request_parsing() {
        let req: UpdateAgentStatusRequest =
            serde_json::from_str(r#"{"status": "inactive"}"#).unwrap();
        let update = AgentStatusUpdate::from(req);
        assert_eq!(update.status, AgentStatus::Inactive);
        assert_eq!(update.is_validated, None);

        assert!(serde_json::from_str::<UpdateAgentStatusRequest>(r#"{"status": "paused"}"#).is_err());
    }
}
