//! Call model
//!
//! A call moves through three shapes:
//! - [`CanonicalCall`]: what the normalizer produces from one provider payload
//! - [`CallUpsert`]: the typed, tenant-scoped write sent to the store, where
//!   `None` means "leave the stored value alone"
//! - [`Call`]: the stored record, merged field by field across events

use crate::error::AppError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Direction stored when no event ever reported one
pub const UNKNOWN_DIRECTION: &str = "unknown";

/// Call status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CallStatus {
    Answered,
    Completed,
    Failed,
    Missed,
    Busy,
    Voicemail,
    /// Provider value with no mapping, kept verbatim
    Other(String),
}

impl CallStatus {
    pub fn as_str(&self) -> &str {
        match self {
            CallStatus::Answered => "answered",
            CallStatus::Completed => "completed",
            CallStatus::Failed => "failed",
            CallStatus::Missed => "missed",
            CallStatus::Busy => "busy",
            CallStatus::Voicemail => "voicemail",
            CallStatus::Other(value) => value,
        }
    }
}

impl From<String> for CallStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "answered" => CallStatus::Answered,
            "completed" => CallStatus::Completed,
            "failed" => CallStatus::Failed,
            "missed" => CallStatus::Missed,
            "busy" => CallStatus::Busy,
            "voicemail" => CallStatus::Voicemail,
            _ => CallStatus::Other(value),
        }
    }
}

impl From<CallStatus> for String {
    fn from(status: CallStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a call ended
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EndReason {
    Hangup,
    Completed,
    NoAnswer,
    Busy,
    Voicemail,
    Error,
    #[default]
    Unknown,
    /// Provider value with no mapping, kept verbatim
    Other(String),
}

impl EndReason {
    pub fn as_str(&self) -> &str {
        match self {
            EndReason::Hangup => "hangup",
            EndReason::Completed => "completed",
            EndReason::NoAnswer => "no_answer",
            EndReason::Busy => "busy",
            EndReason::Voicemail => "voicemail",
            EndReason::Error => "error",
            EndReason::Unknown => "unknown",
            EndReason::Other(value) => value,
        }
    }
}

impl From<String> for EndReason {
    fn from(value: String) -> Self {
        match value.as_str() {
            "hangup" => EndReason::Hangup,
            "completed" => EndReason::Completed,
            "no_answer" => EndReason::NoAnswer,
            "busy" => EndReason::Busy,
            "voicemail" => EndReason::Voicemail,
            "error" => EndReason::Error,
            "unknown" => EndReason::Unknown,
            _ => EndReason::Other(value),
        }
    }
}

impl From<EndReason> for String {
    fn from(reason: EndReason) -> Self {
        reason.as_str().to_string()
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether anyone picked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallOutcome {
    Answered,
    Missed,
}

/// Normalized view of a single provider payload
///
/// Timestamps are ISO-8601 strings when the provider value could be
/// interpreted, otherwise the provider's text verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalCall {
    pub external_call_id: String,
    pub agent_id: String,
    pub started_at: Option<String>,
    pub connected_at: Option<String>,
    pub ended_at: Option<String>,
    pub direction: Option<String>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub status: Option<CallStatus>,
    pub end_reason: Option<EndReason>,
    pub duration_seconds: i64,
    pub billed_minutes: i64,
    /// False when the payload lacked the timestamps to compute a duration;
    /// the zero duration is then a default, not a measurement.
    pub timing_resolved: bool,
    pub summary: Option<String>,
    pub transcript: Option<String>,
    pub raw: Value,
}

impl CanonicalCall {
    /// A call is billable iff the caller-side address is known
    #[inline]
    pub fn is_billable(&self) -> bool {
        self.from_address.is_some()
    }

    pub fn outcome(&self) -> CallOutcome {
        if self.connected_at.is_some() {
            CallOutcome::Answered
        } else {
            CallOutcome::Missed
        }
    }
}

/// Tenant-scoped write for one call event
#[derive(Debug, Clone, PartialEq)]
pub struct CallUpsert {
    pub external_call_id: String,
    pub organization_id: Uuid,
    pub agent_id: String,
    pub started_at: Option<DateTime<Utc>>,
    pub connected_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub direction: Option<String>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub status: Option<CallStatus>,
    pub end_reason: Option<EndReason>,
    pub duration_seconds: Option<i64>,
    pub billed_minutes: Option<i64>,
    pub summary: Option<String>,
    pub transcript: Option<String>,
    pub raw: Value,
}

impl CallUpsert {
    /// Build the store write for a normalized call
    ///
    /// Timestamps the store cannot interpret are dropped here; the raw payload
    /// still carries them. A duration that was never measured is sent as
    /// `None` so it cannot overwrite one computed by an earlier event.
    pub fn from_canonical(organization_id: Uuid, call: &CanonicalCall) -> Self {
        let (duration_seconds, billed_minutes) = if call.timing_resolved {
            (Some(call.duration_seconds), Some(call.billed_minutes))
        } else {
            (None, None)
        };

        Self {
            external_call_id: call.external_call_id.clone(),
            organization_id,
            agent_id: call.agent_id.clone(),
            started_at: parse_timestamp(call.started_at.as_deref()),
            connected_at: parse_timestamp(call.connected_at.as_deref()),
            ended_at: parse_timestamp(call.ended_at.as_deref()),
            direction: call.direction.clone(),
            from_address: call.from_address.clone(),
            to_address: call.to_address.clone(),
            status: call.status.clone(),
            end_reason: call.end_reason.clone(),
            duration_seconds,
            billed_minutes,
            summary: call.summary.clone(),
            transcript: call.transcript.clone(),
            raw: call.raw.clone(),
        }
    }
}

fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?;
    match DateTime::parse_from_rfc3339(value) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(_) => {
            tracing::warn!(timestamp = %value, "Unparseable call timestamp, keeping raw only");
            None
        }
    }
}

/// Stored call record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub external_call_id: String,
    pub organization_id: Uuid,
    pub agent_id: String,
    pub started_at: Option<DateTime<Utc>>,
    pub connected_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub direction: String,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub status: Option<CallStatus>,
    pub end_reason: EndReason,
    pub duration_seconds: i64,
    pub billed_minutes: i64,
    pub summary: Option<String>,
    pub transcript: Option<String>,
    pub raw: Value,
    /// First time any event for this call was stored; never changes
    pub received_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Call {
    /// Create the record for the first event of a call
    pub fn from_upsert(upsert: &CallUpsert, now: DateTime<Utc>) -> Self {
        Self {
            external_call_id: upsert.external_call_id.clone(),
            organization_id: upsert.organization_id,
            agent_id: upsert.agent_id.clone(),
            started_at: upsert.started_at,
            connected_at: upsert.connected_at,
            ended_at: upsert.ended_at,
            direction: upsert
                .direction
                .clone()
                .unwrap_or_else(|| UNKNOWN_DIRECTION.to_string()),
            from_address: upsert.from_address.clone(),
            to_address: upsert.to_address.clone(),
            status: upsert.status.clone(),
            end_reason: upsert.end_reason.clone().unwrap_or_default(),
            duration_seconds: upsert.duration_seconds.unwrap_or(0),
            billed_minutes: upsert.billed_minutes.unwrap_or(0),
            summary: upsert.summary.clone(),
            transcript: upsert.transcript.clone(),
            raw: upsert.raw.clone(),
            received_at: now,
            updated_at: now,
        }
    }

    /// Merge a later event into this record
    ///
    /// Every field the event carries overwrites the stored one; every field it
    /// lacks is left alone. The raw payloads are merged key by key. The owning
    /// organization is fixed by the first event.
    pub fn apply(&mut self, upsert: &CallUpsert, now: DateTime<Utc>) {
        self.agent_id = upsert.agent_id.clone();

        merge(&mut self.started_at, &upsert.started_at);
        merge(&mut self.connected_at, &upsert.connected_at);
        merge(&mut self.ended_at, &upsert.ended_at);
        merge(&mut self.from_address, &upsert.from_address);
        merge(&mut self.to_address, &upsert.to_address);
        merge(&mut self.status, &upsert.status);
        merge(&mut self.summary, &upsert.summary);
        merge(&mut self.transcript, &upsert.transcript);

        if let Some(direction) = &upsert.direction {
            self.direction = direction.clone();
        }
        if let Some(reason) = &upsert.end_reason {
            self.end_reason = reason.clone();
        }
        if let Some(duration) = upsert.duration_seconds {
            self.duration_seconds = duration;
        }
        if let Some(minutes) = upsert.billed_minutes {
            self.billed_minutes = minutes;
        }

        match (&mut self.raw, &upsert.raw) {
            (Value::Object(stored), Value::Object(incoming)) => {
                for (key, value) in incoming {
                    stored.insert(key.clone(), value.clone());
                }
            }
            (stored, incoming) => *stored = incoming.clone(),
        }

        self.updated_at = now;
    }

    /// Sort key for listings: start time, or arrival time when unknown
    #[inline]
    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.started_at.unwrap_or(self.received_at)
    }

    /// A call is billable iff the caller-side address is known
    #[inline]
    pub fn is_billable(&self) -> bool {
        self.from_address.is_some()
    }

    #[inline]
    pub fn is_answered(&self) -> bool {
        self.connected_at.is_some()
    }

    pub fn outcome(&self) -> CallOutcome {
        if self.is_answered() {
            CallOutcome::Answered
        } else {
            CallOutcome::Missed
        }
    }

    /// Cursor pointing just past this call
    pub fn cursor(&self) -> CallCursor {
        CallCursor {
            occurred_at: self.occurred_at(),
            external_call_id: self.external_call_id.clone(),
        }
    }
}

fn merge<T: Clone>(stored: &mut Option<T>, incoming: &Option<T>) {
    if incoming.is_some() {
        stored.clone_from(incoming);
    }
}

/// Position in a call listing ordered by `(occurred_at, external_call_id)`
/// descending
///
/// The wire form is opaque to clients. A bare RFC 3339 timestamp is also
/// accepted and means "everything strictly older than this instant".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallCursor {
    pub occurred_at: DateTime<Utc>,
    pub external_call_id: String,
}

impl CallCursor {
    pub fn encode(&self) -> String {
        hex::encode(format!(
            "{}|{}",
            self.occurred_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            self.external_call_id
        ))
    }

    /// # Errors
    ///
    /// Returns `AppError::InvalidCursor` if the value is neither an encoded
    /// cursor nor an RFC 3339 timestamp.
    pub fn decode(value: &str) -> Result<Self, AppError> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
            return Ok(Self {
                occurred_at: ts.with_timezone(&Utc),
                external_call_id: String::new(),
            });
        }

        let invalid = || AppError::InvalidCursor(value.to_string());

        let bytes = hex::decode(value).map_err(|_| invalid())?;
        let text = String::from_utf8(bytes).map_err(|_| invalid())?;
        let (ts, id) = text.split_once('|').ok_or_else(invalid)?;
        let occurred_at = DateTime::parse_from_rfc3339(ts)
            .map_err(|_| invalid())?
            .with_timezone(&Utc);

        Ok(Self {
            occurred_at,
            external_call_id: id.to_string(),
        })
    }

    /// Whether a call at this position comes after the cursor in listing order
    pub fn precedes(&self, occurred_at: DateTime<Utc>, external_call_id: &str) -> bool {
        (occurred_at, external_call_id) < (self.occurred_at, self.external_call_id.as_str())
    }
}

/// Read filter shared by listings and aggregates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallFilter {
    /// Inclusive lower bound on `occurred_at`
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `occurred_at`
    pub to: Option<DateTime<Utc>>,
    pub is_billable: Option<bool>,
}

impl CallFilter {
    pub fn matches(&self, call: &Call) -> bool {
        let at = call.occurred_at();
        self.from.map_or(true, |from| at >= from)
            && self.to.map_or(true, |to| at <= to)
            && self
                .is_billable
                .map_or(true, |billable| call.is_billable() == billable)
    }
}

/// Raw counters the store computes for an overview; everything else is
/// derived from these by the metrics layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverviewAggregate {
    pub total_calls: i64,
    pub billable_calls: i64,
    pub answered_calls: i64,
    pub total_duration_seconds: i64,
    pub total_billed_minutes: i64,
    pub billable_billed_minutes: i64,
}

impl OverviewAggregate {
    /// Fold one call into the counters
    pub fn add(&mut self, call: &Call) {
        self.total_calls += 1;
        self.total_duration_seconds += call.duration_seconds;
        self.total_billed_minutes += call.billed_minutes;
        if call.is_billable() {
            self.billable_calls += 1;
            self.billable_billed_minutes += call.billed_minutes;
        }
        if call.is_answered() {
            self.answered_calls += 1;
        }
    }
}

/// One page of a call listing
#[derive(Debug, Clone, Serialize)]
pub struct CallPage {
    pub calls: Vec<Call>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}
