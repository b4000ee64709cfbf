//! Organization administration DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::{Validate, ValidationError};
use vox_core::models::BillingUpdate;
use vox_services::BackfillRequest;

/// New per-minute rates
#[derive(Debug, Clone, Copy, Deserialize, Validate)]
pub struct UpdateBillingRequest {
    #[validate(custom(function = "validate_rate"))]
    pub billing_rate_per_minute: Decimal,

    #[validate(custom(function = "validate_rate"))]
    pub cogs_per_minute: Decimal,
}

fn validate_rate(rate: &Decimal) -> Result<(), ValidationError> {
    if *rate < Decimal::ZERO {
        return Err(ValidationError::new("negative_rate"));
    }
    Ok(())
}

impl From<UpdateBillingRequest> for BillingUpdate {
    fn from(req: UpdateBillingRequest) -> Self {
        Self {
            billing_rate_per_minute: req.billing_rate_per_minute,
            cogs_per_minute: req.cogs_per_minute,
        }
    }
}

/// Import a window of provider history
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_backfill_window"))]
pub struct BackfillRequestDto {
    #[serde(default)]
    #[validate(length(min = 1, max = 128))]
    pub agent_id: Option<String>,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

fn validate_backfill_window(req: &BackfillRequestDto) -> Result<(), ValidationError> {
    if req.from > req.to {
        return Err(ValidationError::new("from_after_to"));
    }
    Ok(())
}

impl From<BackfillRequestDto> for BackfillRequest {
    fn from(req: BackfillRequestDto) -> Self {
        Self {
            agent_id: req.agent_id,
            from: req.from,
            to: req.to,
        }
    }
}
