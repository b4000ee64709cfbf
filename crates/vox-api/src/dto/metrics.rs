//! Metrics query DTOs

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};
use vox_services::{CallsQuery, OverviewQuery};

/// Query string of the metrics endpoints
///
/// Accepts both `organizationId`/`isBillable` and their snake_case forms.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_window"))]
pub struct MetricsQueryParams {
    /// Page size; clamped by the service when out of range
    #[serde(default)]
    pub limit: Option<i64>,

    #[serde(default)]
    #[validate(length(max = 512))]
    pub cursor: Option<String>,

    #[serde(default)]
    pub from: Option<DateTime<Utc>>,

    #[serde(default)]
    pub to: Option<DateTime<Utc>>,

    #[serde(default, rename = "organizationId", alias = "organization_id")]
    pub organization_id: Option<Uuid>,

    #[serde(default, rename = "isBillable", alias = "is_billable")]
    pub is_billable: Option<bool>,
}

fn validate_window(params: &MetricsQueryParams) -> Result<(), ValidationError> {
    match (params.from, params.to) {
        (Some(from), Some(to)) if from > to => Err(ValidationError::new("from_after_to")),
        _ => Ok(()),
    }
}

impl MetricsQueryParams {
    pub fn calls_query(&self) -> CallsQuery {
        CallsQuery {
            organization_id: self.organization_id,
            limit: self.limit,
            cursor: self.cursor.clone(),
            from: self.from,
            to: self.to,
            is_billable: self.is_billable,
        }
    }

    pub fn overview_query(&self) -> OverviewQuery {
        OverviewQuery {
            organization_id: self.organization_id,
            from: self.from,
            to: self.to,
            is_billable: self.is_billable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reversed_window_is_invalid() {
        let params = MetricsQueryParams {
            from: Some("2024-02-01T00:00:00Z".parse().unwrap()),
            to: Some("2024-01-01T00:00:00Z".parse().unwrap()),
            ..MetricsQueryParams::default()
        };
        assert!(params.validate().is_err());
        assert!(MetricsQueryParams::default().validate().is_ok());
    }

    #[test]
    fn test_query_string_aliases() {
        let org = Uuid::new_v4();
        let params: MetricsQueryParams =
            serde_json::from_value(serde_json::json!({"organizationId": org, "isBillable": true}))
                .unwrap();
        assert_eq!(params.organization_id, Some(org));
        assert_eq!(params.is_billable, Some(true));

        let params: MetricsQueryParams =
            serde_json::from_value(serde_json::json!({"organization_id": org, "limit": 10}))
                .unwrap();
        assert_eq!(params.calls_query().organization_id, Some(org));
        assert_eq!(params.calls_query().limit, Some(10));
    }
}
