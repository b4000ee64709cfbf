//! Organization model
//!
//! The tenant boundary. Per-minute rates live here so that revenue and cost
//! are derived at read time and never stored on calls.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tenant organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,

    pub name: String,

    /// URL-safe unique name
    pub slug: String,

    /// Price charged to the tenant per billed minute
    pub billing_rate_per_minute: Decimal,

    /// Provider cost per billed minute
    pub cogs_per_minute: Decimal,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// Revenue for a number of billed minutes
    #[inline]
    pub fn revenue_for(&self, billed_minutes: i64) -> Decimal {
        Decimal::from(billed_minutes) * self.billing_rate_per_minute
    }

    /// Cost of goods for a number of billed minutes
    #[inline]
    pub fn cost_for(&self, billed_minutes: i64) -> Decimal {
        Decimal::from(billed_minutes) * self.cogs_per_minute
    }
}

/// New per-minute rates for an organization
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BillingUpdate {
    pub billing_rate_per_minute: Decimal,
    pub cogs_per_minute: Decimal,
}
