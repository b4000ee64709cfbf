//! Multi-tenant metrics
//!
//! Every read is scoped to exactly one organization. Non-privileged callers
//! are pinned to their own organization; a super-admin names one explicitly.
//! Overviews are cache-aside in the metrics cache, keyed by organization and
//! filter window.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;
use vox_cache::{keys, CacheService};
use vox_core::config::MetricsConfig;
use vox_core::models::{
    Call, CallCursor, CallFilter, CallPage, Organization, OverviewAggregate, Principal,
};
use vox_core::traits::{clamp_page_size, TenantStore};
use vox_core::{AppError, AppResult};

use crate::constants::OVERVIEW_METRIC;
use crate::organizations::{OrganizationService, OrganizationSummary};

/// Listing request
#[derive(Debug, Clone, Default)]
pub struct CallsQuery {
    /// Only honored for super-admins
    pub organization_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub cursor: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub is_billable: Option<bool>,
}

/// Overview request
#[derive(Debug, Clone, Default)]
pub struct OverviewQuery {
    pub organization_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub is_billable: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub limit: i64,
    pub cursor: Option<String>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallsResult {
    pub organization: OrganizationSummary,
    pub calls: Vec<Call>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OverviewWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Aggregate view of one organization's calls over a window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub total_calls: i64,
    pub billable_calls: i64,
    pub test_calls: i64,
    pub answered_calls: i64,
    pub missed_calls: i64,
    /// Percentage of calls answered, one decimal
    pub answer_rate: f64,
    pub total_duration_seconds: i64,
    pub total_billed_minutes: i64,
    pub avg_duration_seconds: f64,
    pub avg_billed_minutes: f64,
    pub expected_revenue: Decimal,
    pub expected_cost: Decimal,
    pub expected_margin: Decimal,
    pub window: OverviewWindow,
}

impl Overview {
    /// Derive the reported figures from raw counters and the tenant's rates
    ///
    /// Revenue and cost count billable calls only.
    pub fn derive(agg: &OverviewAggregate, org: &Organization, window: OverviewWindow) -> Self {
        let average = |sum: i64| {
            if agg.total_calls > 0 {
                sum as f64 / agg.total_calls as f64
            } else {
                0.0
            }
        };
        let answer_rate = if agg.total_calls > 0 {
            (agg.answered_calls as f64 * 1000.0 / agg.total_calls as f64).round() / 10.0
        } else {
            0.0
        };

        let expected_revenue = org.revenue_for(agg.billable_billed_minutes);
        let expected_cost = org.cost_for(agg.billable_billed_minutes);

        Self {
            total_calls: agg.total_calls,
            billable_calls: agg.billable_calls,
            test_calls: agg.total_calls - agg.billable_calls,
            answered_calls: agg.answered_calls,
            missed_calls: agg.total_calls - agg.answered_calls,
            answer_rate,
            total_duration_seconds: agg.total_duration_seconds,
            total_billed_minutes: agg.total_billed_minutes,
            avg_duration_seconds: average(agg.total_duration_seconds),
            avg_billed_minutes: average(agg.total_billed_minutes),
            expected_revenue,
            expected_cost,
            expected_margin: expected_revenue - expected_cost,
            window,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OverviewResult {
    pub organization: OrganizationSummary,
    pub overview: Overview,
}

/// Tenant-scoped read access to calls and aggregates
pub struct MultiTenantMetrics {
    store: Arc<dyn TenantStore>,
    cache: Arc<CacheService>,
    organizations: OrganizationService,
    config: MetricsConfig,
}

impl MultiTenantMetrics {
    pub fn new(
        store: Arc<dyn TenantStore>,
        cache: Arc<CacheService>,
        organizations: OrganizationService,
        config: MetricsConfig,
    ) -> Self {
        Self {
            store,
            cache,
            organizations,
            config,
        }
    }

    /// Resolve the organization a caller may read
    ///
    /// Decisions on explicit organization requests are remembered in the
    /// users cache.
    fn resolve_scope(&self, caller: &Principal, requested: Option<Uuid>) -> AppResult<Uuid> {
        let Some(org) = requested else {
            return caller.resolve_scope(None);
        };

        match self.cache.get_permission(caller.id, org) {
            Some(true) => return Ok(org),
            Some(false) => {
                return Err(AppError::AuthorizationDenied(
                    "cannot access another organization".to_string(),
                ))
            }
            None => {}
        }

        let decision = caller.resolve_scope(Some(org));
        match &decision {
            Ok(_) => self.cache.set_permission(caller.id, org, true),
            Err(AppError::AuthorizationDenied(_)) => {
                warn!(caller = %caller.id, organization_id = %org, "Cross-tenant read denied");
                self.cache.set_permission(caller.id, org, false);
            }
            Err(_) => {}
        }
        decision
    }

    /// One page of an organization's calls, newest first
    ///
    /// # Errors
    ///
    /// - `AuthorizationDenied` if the caller may not read the organization
    /// - `InvalidCursor` if `cursor` cannot be decoded
    /// - `OrganizationNotFound` / `StoreUnavailable` from the store
    #[instrument(skip(self, caller, query), fields(caller = %caller.id))]
    pub async fn get_calls(&self, caller: &Principal, query: &CallsQuery) -> AppResult<CallsResult> {
        let organization_id = self.resolve_scope(caller, query.organization_id)?;
        let cursor = query
            .cursor
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(CallCursor::decode)
            .transpose()?;
        let limit = clamp_page_size(
            query.limit,
            self.config.default_page_size,
            self.config.max_page_size,
        );

        let org = self.organizations.get_organization(organization_id).await?;
        let filter = CallFilter {
            from: query.from,
            to: query.to,
            is_billable: query.is_billable,
        };

        let rows = self
            .store
            .fetch_calls(organization_id, &filter, cursor.as_ref(), limit + 1)
            .await?;
        let page = paginate(rows, limit);

        debug!(
            organization_id = %organization_id,
            count = page.calls.len(),
            has_more = page.has_more,
            "Calls page served"
        );

        Ok(CallsResult {
            organization: OrganizationSummary::from(org.as_ref()),
            pagination: Pagination {
                limit,
                cursor: query.cursor.clone(),
                next_cursor: page.next_cursor,
                has_more: page.has_more,
                count: page.calls.len(),
            },
            calls: page.calls,
        })
    }

    /// Aggregate figures for an organization's window
    ///
    /// Open window bounds default to the last `default_window_days` days.
    #[instrument(skip(self, caller, query), fields(caller = %caller.id))]
    pub async fn get_overview(
        &self,
        caller: &Principal,
        query: &OverviewQuery,
    ) -> AppResult<OverviewResult> {
        let organization_id = self.resolve_scope(caller, query.organization_id)?;
        let org = self.organizations.get_organization(organization_id).await?;
        let range = keys::range_segment(query.from, query.to, query.is_billable);

        let overview = match self
            .cache
            .get_metrics::<Overview>(organization_id, OVERVIEW_METRIC, &range)
        {
            Some(cached) => {
                debug!(organization_id = %organization_id, range = %range, "Overview cache HIT");
                cached
            }
            None => {
                debug!(organization_id = %organization_id, range = %range, "Overview cache MISS");
                let now = Utc::now();
                let window = OverviewWindow {
                    from: query
                        .from
                        .unwrap_or_else(|| now - Duration::days(self.config.default_window_days)),
                    to: query.to.unwrap_or(now),
                };
                let filter = CallFilter {
                    from: Some(window.from),
                    to: Some(window.to),
                    is_billable: query.is_billable,
                };

                let aggregate = self.store.overview(organization_id, &filter).await?;
                let overview = Overview::derive(&aggregate, &org, window);
                self.cache
                    .set_metrics(organization_id, OVERVIEW_METRIC, &range, overview)
            }
        };

        Ok(OverviewResult {
            organization: OrganizationSummary::from(org.as_ref()),
            overview: overview.as_ref().clone(),
        })
    }

    /// Caller profile, remembered in the users cache
    pub fn profile(&self, caller: &Principal) -> Arc<Principal> {
        match self.cache.get_user::<Principal>(caller.id) {
            Some(profile) if profile.as_ref() == caller => profile,
            _ => self.cache.set_user(caller.id, caller.clone()),
        }
    }
}

/// Split a `limit + 1` fetch into a page and its continuation
fn paginate(mut rows: Vec<Call>, limit: i64) -> CallPage {
    let limit = usize::try_from(limit).unwrap_or(0);
    let has_more = rows.len() > limit;
    rows.truncate(limit);

    let next_cursor = if has_more {
        rows.last().map(|call| call.cursor().encode())
    } else {
        None
    };

    CallPage {
        calls: rows,
        next_cursor,
        has_more,
    }
}
