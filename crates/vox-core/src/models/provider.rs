//! Provider payload types
//!
//! The voice-agent provider delivers call data in two shapes: the webhook
//! envelope `{event, call: {...}}` and the bare call object returned by its
//! REST listing. Both carry the same call object, whose fields come under one
//! of two naming schemes. Everything here is decoded once at the boundary and
//! handed to the normalizer; fields the model does not know about are kept in
//! `extra` and in the retained raw payload.

use crate::error::AppError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Webhook event kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum WebhookEvent {
    CallStarted,
    CallEnded,
    CallAnalyzed,
    /// Any event name this system does not process
    Other(String),
}

impl WebhookEvent {
    pub fn as_str(&self) -> &str {
        match self {
            WebhookEvent::CallStarted => "call_started",
            WebhookEvent::CallEnded => "call_ended",
            WebhookEvent::CallAnalyzed => "call_analyzed",
            WebhookEvent::Other(name) => name,
        }
    }

    /// Whether events of this kind carry call data to persist
    pub fn is_call_event(&self) -> bool {
        !matches!(self, WebhookEvent::Other(_))
    }
}

impl From<String> for WebhookEvent {
    fn from(name: String) -> Self {
        match name.as_str() {
            "call_started" => WebhookEvent::CallStarted,
            "call_ended" => WebhookEvent::CallEnded,
            "call_analyzed" => WebhookEvent::CallAnalyzed,
            _ => WebhookEvent::Other(name),
        }
    }
}

impl From<WebhookEvent> for String {
    fn from(event: WebhookEvent) -> Self {
        event.as_str().to_string()
    }
}

impl<'de> Deserialize<'de> for WebhookEvent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(WebhookEvent::from)
    }
}

impl fmt::Display for WebhookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Post-call analysis block attached to `call_analyzed` events
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallAnalysis {
    #[serde(default)]
    pub call_summary: Option<String>,

    #[serde(default)]
    pub custom_analysis_data: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CallAnalysis {
    /// Summary written by a custom analysis prompt, if any
    pub fn detailed_call_summary(&self) -> Option<&str> {
        self.custom_analysis_data
            .as_ref()?
            .get("detailed_call_summary")?
            .as_str()
    }
}

/// Provider call object, in either naming scheme
///
/// Timestamps stay as raw JSON values because the provider sends epoch
/// milliseconds (number or string) in one scheme and ISO-8601 in the other.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderCall {
    // ---- identity ----
    #[serde(default)]
    pub call_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub agent_id: Option<String>,

    // ---- timing ----
    #[serde(default)]
    pub started_at: Option<Value>,
    #[serde(default)]
    pub start_timestamp: Option<Value>,
    #[serde(default)]
    pub connected_at: Option<Value>,
    #[serde(default)]
    pub ended_at: Option<Value>,
    #[serde(default)]
    pub end_timestamp: Option<Value>,

    // ---- parties ----
    #[serde(default)]
    pub from_number: Option<String>,
    #[serde(default)]
    pub from_phone_number: Option<String>,
    #[serde(default)]
    pub from_phone: Option<String>,
    #[serde(default)]
    pub caller_number: Option<String>,
    #[serde(default)]
    pub caller_phone: Option<String>,
    #[serde(default)]
    pub to_number: Option<String>,
    #[serde(default)]
    pub to_phone_number: Option<String>,
    #[serde(default)]
    pub to_phone: Option<String>,
    #[serde(default)]
    pub called_number: Option<String>,
    #[serde(default)]
    pub called_phone: Option<String>,

    // ---- classification ----
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub call_direction: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub call_status: Option<String>,
    #[serde(default)]
    pub end_reason: Option<String>,
    #[serde(default)]
    pub disconnection_reason: Option<String>,

    // ---- content ----
    #[serde(default)]
    pub call_analysis: Option<CallAnalysis>,
    #[serde(default)]
    pub detailed_summary: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub call_summary: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub call_transcript: Option<String>,

    /// Fields not modeled above
    #[serde(flatten)]
    pub extra: Map<String, Value>,

    /// The call object exactly as received
    #[serde(skip)]
    pub raw: Value,
}

impl ProviderCall {
    /// Decode a call object, retaining the original JSON for audit
    pub fn from_value(raw: Value) -> Result<Self, AppError> {
        if !raw.is_object() {
            return Err(AppError::InvalidPayload(
                "call must be a JSON object".to_string(),
            ));
        }

        let mut call = ProviderCall::deserialize(&raw)
            .map_err(|e| AppError::InvalidPayload(format!("malformed call object: {}", e)))?;
        call.raw = raw;
        Ok(call)
    }
}

/// Webhook envelope `{event, call}`
#[derive(Debug, Clone)]
pub struct WebhookEnvelope {
    pub event: WebhookEvent,
    pub call: ProviderCall,
}

#[derive(Deserialize)]
struct RawEnvelope {
    event: WebhookEvent,
    #[serde(default)]
    call: Option<Value>,
}

impl WebhookEnvelope {
    /// Parse a raw webhook body
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidPayload` if the body is not JSON, has no
    /// `event`, or has no `call` object.
    pub fn parse(body: &[u8]) -> Result<Self, AppError> {
        let envelope: RawEnvelope = serde_json::from_slice(body)
            .map_err(|e| AppError::InvalidPayload(format!("malformed webhook body: {}", e)))?;

        let call = envelope
            .call
            .ok_or_else(|| AppError::InvalidPayload("missing call object".to_string()))?;

        Ok(Self {
            event: envelope.event,
            call: ProviderCall::from_value(call)?,
        })
    }

    /// Agent id embedded in the payload, if present and non-empty
    pub fn agent_id(&self) -> Option<&str> {
        self.call.agent_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Provider listing request used by backfill
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCallListing {
    pub agent_id: String,
    /// Range start, epoch milliseconds
    pub start_timestamp: i64,
    /// Range end, epoch milliseconds
    pub end_timestamp: i64,
    pub limit: u32,
    pub offset: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_webhook_envelope() {
        let body = json!({
            "event": "call_ended",
            "call": {
                "call_id": "call_123",
                "agent_id": "agent_abc",
                "start_timestamp": 1704067200000_i64,
                "custom_field": "kept"
            }
        });

        let envelope = WebhookEnvelope::parse(body.to_string().as_bytes()).unwrap();
        assert_eq!(envelope.event, WebhookEvent::CallEnded);
        assert_eq!(envelope.call.call_id.as_deref(), Some("call_123"));
        assert_eq!(envelope.agent_id(), Some("agent_abc"));
        assert_eq!(envelope.call.extra.get("custom_field"), Some(&json!("kept")));
        assert_eq!(envelope.call.raw["custom_field"], json!("kept"));
    }

    #[test]
    fn test_unknown_event_is_kept() {
        let body = json!({"event": "call_transferred", "call": {"call_id": "c"}});
        let envelope = WebhookEnvelope::parse(body.to_string().as_bytes()).unwrap();
        assert_eq!(
            envelope.event,
            WebhookEvent::Other("call_transferred".to_string())
        );
        assert!(!envelope.event.is_call_event());
    }

    #[test]
    fn test_missing_call_is_invalid() {
        let err = WebhookEnvelope::parse(br#"{"event":"call_started"}"#).unwrap_err();
        assert!(matches!(err, AppError::InvalidPayload(_)));

        let err = WebhookEnvelope::parse(b"not json").unwrap_err();
        assert!(matches!(err, AppError::InvalidPayload(_)));
    }

    #[test]
    fn test_empty_agent_id_is_absent() {
        let body = json!({"event": "call_started", "call": {"call_id": "c", "agent_id": ""}});
        let envelope = WebhookEnvelope::parse(body.to_string().as_bytes()).unwrap();
        assert_eq!(envelope.agent_id(), None);
    }

    #[test]
    fn test_detailed_call_summary() {
        let analysis: CallAnalysis = serde_json::from_value(json!({
            "custom_analysis_data": {"detailed_call_summary": "long form"}
        }))
        .unwrap();
        assert_eq!(analysis.detailed_call_summary(), Some("long form"));
        assert_eq!(analysis.call_summary, None);
    }
}
