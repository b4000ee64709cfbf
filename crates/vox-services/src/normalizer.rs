//! Provider payload normalization
//!
//! Turns a decoded [`ProviderCall`] into a [`CanonicalCall`]. Pure: no I/O,
//! no clock. Every field is resolved from a fixed precedence list where the
//! first non-empty value wins.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;
use tracing::warn;
use vox_core::models::{CallStatus, CanonicalCall, EndReason, ProviderCall};
use vox_core::{AppError, AppResult};

/// Canonicalizes provider call objects
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    /// Used when a payload carries no agent id
    default_agent_id: Option<String>,
}

impl Normalizer {
    pub fn new(default_agent_id: Option<String>) -> Self {
        Self {
            default_agent_id: default_agent_id.filter(|id| !id.is_empty()),
        }
    }

    /// Normalize one provider call
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidPayload` if no call id, or no agent id and no
    /// default agent id, can be resolved.
    pub fn normalize(&self, call: &ProviderCall) -> AppResult<CanonicalCall> {
        let external_call_id = first_present([&call.call_id, &call.id])
            .ok_or_else(|| AppError::InvalidPayload("missing call id".to_string()))?;

        let agent_id = first_present([&call.agent_id])
            .or_else(|| self.default_agent_id.clone())
            .ok_or_else(|| AppError::InvalidPayload("missing agent id".to_string()))?;

        let started_at = first_timestamp([&call.started_at, &call.start_timestamp]);
        let connected_at = first_timestamp([&call.connected_at]);
        let ended_at = first_timestamp([&call.ended_at, &call.end_timestamp]);

        let duration = compute_duration(
            started_at.as_deref(),
            connected_at.as_deref(),
            ended_at.as_deref(),
        );
        let (duration_seconds, timing_resolved) = match duration {
            Some(seconds) => (seconds, true),
            None => (0, false),
        };

        let from_number = first_present([
            &call.from_number,
            &call.from_phone_number,
            &call.from_phone,
            &call.caller_number,
            &call.caller_phone,
        ]);
        let to_number = first_present([
            &call.to_number,
            &call.to_phone_number,
            &call.to_phone,
            &call.called_number,
            &call.called_phone,
        ]);

        Ok(CanonicalCall {
            external_call_id,
            agent_id,
            started_at,
            connected_at,
            ended_at,
            direction: first_present([&call.direction, &call.call_direction]),
            from_address: from_number.as_deref().and_then(normalize_phone),
            to_address: to_number.as_deref().and_then(normalize_phone),
            status: first_present([&call.status, &call.call_status]).map(|s| map_status(&s)),
            end_reason: first_present([&call.end_reason, &call.disconnection_reason])
                .map(|r| map_end_reason(&r)),
            duration_seconds,
            billed_minutes: billed_minutes(duration_seconds),
            timing_resolved,
            summary: resolve_summary(call),
            transcript: first_present([&call.transcript, &call.call_transcript]),
            raw: call.raw.clone(),
        })
    }
}

fn first_present<const N: usize>(candidates: [&Option<String>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .find(|value| !value.is_empty())
        .cloned()
}

fn first_timestamp<const N: usize>(candidates: [&Option<Value>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .find_map(convert_timestamp)
}

fn resolve_summary(call: &ProviderCall) -> Option<String> {
    let analysis = call.call_analysis.as_ref();
    let from_analysis = analysis
        .and_then(|a| a.call_summary.clone())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            analysis
                .and_then(|a| a.detailed_call_summary())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        });

    from_analysis.or_else(|| {
        first_present([&call.detailed_summary, &call.summary, &call.call_summary])
    })
}

/// Convert a provider timestamp to ISO-8601
///
/// - numbers and all-digit strings are epoch milliseconds
/// - strings containing `T` are taken as ISO-8601 already
/// - any other string passes through unchanged
///
/// Null, empty strings and non-scalar values resolve to `None`.
pub fn convert_timestamp(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64))?;
            format_millis(millis).or_else(|| {
                warn!(timestamp = %n, "Epoch timestamp out of range");
                None
            })
        }
        Value::String(s) if s.is_empty() => None,
        Value::String(s) if s.contains('T') => Some(s.clone()),
        Value::String(s) if s.bytes().all(|b| b.is_ascii_digit()) => s
            .parse::<i64>()
            .ok()
            .and_then(format_millis)
            .or_else(|| Some(s.clone())),
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => {
            warn!(timestamp = %other, "Ignoring non-scalar timestamp");
            None
        }
    }
}

fn format_millis(millis: i64) -> Option<String> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn parse_iso(value: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value?)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Whole seconds from connect (or start) to end, floored at zero
///
/// `None` when the end, or both connect and start, cannot be interpreted.
pub fn compute_duration(
    started_at: Option<&str>,
    connected_at: Option<&str>,
    ended_at: Option<&str>,
) -> Option<i64> {
    let ended = parse_iso(ended_at)?;
    let connected = parse_iso(connected_at).or_else(|| parse_iso(started_at))?;
    Some((ended - connected).num_milliseconds().div_euclid(1000).max(0))
}

/// Minutes billed for a duration, rounded up
#[inline]
pub fn billed_minutes(duration_seconds: i64) -> i64 {
    (duration_seconds.max(0) + 59) / 60
}

/// Normalize a phone number to E.164
///
/// - 11 digits starting with `1`: `+` prefix
/// - exactly 10 digits: `+1` prefix
/// - anything else: `+` followed by the digits
///
/// Returns `None` for values without any digit.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    match digits.len() {
        0 => None,
        10 => Some(format!("+1{}", digits)),
        11 if digits.starts_with('1') => Some(format!("+{}", digits)),
        _ => Some(format!("+{}", digits)),
    }
}

/// Provider call status to canonical status
pub fn map_status(raw: &str) -> CallStatus {
    match raw {
        "call_answered" => CallStatus::Answered,
        "call_ended" => CallStatus::Completed,
        "call_failed" => CallStatus::Failed,
        "no_answer" => CallStatus::Missed,
        "busy" => CallStatus::Busy,
        "voicemail" => CallStatus::Voicemail,
        other => CallStatus::Other(other.to_string()),
    }
}

/// Provider disconnection reason to canonical end reason
pub fn map_end_reason(raw: &str) -> EndReason {
    match raw {
        "customer_hangup" | "agent_hangup" => EndReason::Hangup,
        "call_ended" => EndReason::Completed,
        "no_answer" => EndReason::NoAnswer,
        "busy" => EndReason::Busy,
        "voicemail" => EndReason::Voicemail,
        "error" => EndReason::Error,
        other => EndReason::Other(other.to_string()),
    }
}
