//! Tenant store implementation
//!
//! PostgreSQL-backed storage for calls and organizations. Uses runtime
//! queries (not compile-time macros) to avoid requiring a database
//! connection at build time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, instrument};
use uuid::Uuid;
use vox_core::{
    models::{
        Call, CallCursor, CallFilter, CallStatus, CallUpsert, EndReason, Organization,
        OverviewAggregate,
    },
    traits::TenantStore,
    AppError, AppResult,
};

use crate::store_error;

/// PostgreSQL implementation of TenantStore
pub struct PgTenantStore {
    pool: PgPool,
}

impl PgTenantStore {
    /// Create a new tenant store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const CALL_SELECT_COLUMNS: &str = r#"
    external_call_id, organization_id, agent_id,
    started_at, connected_at, ended_at,
    direction, from_address, to_address,
    status, end_reason,
    duration_seconds, billed_minutes,
    summary, transcript, raw,
    received_at, updated_at
"#;

const ORG_SELECT_COLUMNS: &str = r#"
    id, name, slug, billing_rate_per_minute, cogs_per_minute, created_at, updated_at
"#;

/// Append the tenant and filter predicates shared by listings and aggregates
fn push_filter<'a>(
    builder: &mut QueryBuilder<'a, Postgres>,
    organization_id: Uuid,
    filter: &CallFilter,
) {
    builder.push(" WHERE organization_id = ");
    builder.push_bind(organization_id);

    if let Some(from) = filter.from {
        builder.push(" AND occurred_at >= ");
        builder.push_bind(from);
    }
    if let Some(to) = filter.to {
        builder.push(" AND occurred_at <= ");
        builder.push_bind(to);
    }
    if let Some(billable) = filter.is_billable {
        builder.push(" AND is_billable = ");
        builder.push_bind(billable);
    }
}

#[async_trait]
impl TenantStore for PgTenantStore {
    #[instrument(skip(self, call), fields(call_id = %call.external_call_id))]
    async fn upsert_call(&self, call: &CallUpsert) -> AppResult<Call> {
        debug!("Upserting call");

        // Parameters are referenced directly in the UPDATE arm: EXCLUDED would
        // already carry the insert-time defaults.
        let query = format!(
            r#"
            INSERT INTO calls (
                external_call_id, organization_id, agent_id,
                started_at, connected_at, ended_at,
                direction, from_address, to_address,
                status, end_reason,
                duration_seconds, billed_minutes,
                summary, transcript, raw
            )
            VALUES (
                $1, $2, $3,
                $4, $5, $6,
                COALESCE($7, 'unknown'), $8, $9,
                $10, COALESCE($11, 'unknown'),
                COALESCE($12, 0), COALESCE($13, 0),
                $14, $15, $16
            )
            ON CONFLICT (external_call_id) DO UPDATE SET
                agent_id         = $3,
                started_at       = COALESCE($4, calls.started_at),
                connected_at     = COALESCE($5, calls.connected_at),
                ended_at         = COALESCE($6, calls.ended_at),
                direction        = COALESCE($7, calls.direction),
                from_address     = COALESCE($8, calls.from_address),
                to_address       = COALESCE($9, calls.to_address),
                status           = COALESCE($10, calls.status),
                end_reason       = COALESCE($11, calls.end_reason),
                duration_seconds = COALESCE($12, calls.duration_seconds),
                billed_minutes   = COALESCE($13, calls.billed_minutes),
                summary          = COALESCE($14, calls.summary),
                transcript       = COALESCE($15, calls.transcript),
                raw              = calls.raw || $16,
                updated_at       = NOW()
            RETURNING {}
            "#,
            CALL_SELECT_COLUMNS
        );

        let row = sqlx::query_as::<Postgres, CallRow>(&query)
            .bind(&call.external_call_id)
            .bind(call.organization_id)
            .bind(&call.agent_id)
            .bind(call.started_at)
            .bind(call.connected_at)
            .bind(call.ended_at)
            .bind(&call.direction)
            .bind(&call.from_address)
            .bind(&call.to_address)
            .bind(call.status.as_ref().map(|s| s.as_str().to_string()))
            .bind(call.end_reason.as_ref().map(|r| r.as_str().to_string()))
            .bind(call.duration_seconds)
            .bind(call.billed_minutes)
            .bind(&call.summary)
            .bind(&call.transcript)
            .bind(&call.raw)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| store_error("upserting call", e))?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn find_call(
        &self,
        organization_id: Uuid,
        external_call_id: &str,
    ) -> AppResult<Option<Call>> {
        let query = format!(
            "SELECT {} FROM calls WHERE organization_id = $1 AND external_call_id = $2",
            CALL_SELECT_COLUMNS
        );

        let row = sqlx::query_as::<Postgres, CallRow>(&query)
            .bind(organization_id)
            .bind(external_call_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error("finding call", e))?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn list_organizations(&self) -> AppResult<Vec<Organization>> {
        debug!("Listing all organizations");

        let query = format!(
            "SELECT {} FROM organizations ORDER BY name",
            ORG_SELECT_COLUMNS
        );

        let rows = sqlx::query_as::<Postgres, OrganizationRow>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| store_error("listing organizations", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn update_organization_billing(
        &self,
        organization_id: Uuid,
        billing_rate_per_minute: Decimal,
        cogs_per_minute: Decimal,
    ) -> AppResult<Organization> {
        let query = format!(
            r#"
            UPDATE organizations
            SET billing_rate_per_minute = $2,
                cogs_per_minute = $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ORG_SELECT_COLUMNS
        );

        let row = sqlx::query_as::<Postgres, OrganizationRow>(&query)
            .bind(organization_id)
            .bind(billing_rate_per_minute)
            .bind(cogs_per_minute)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error("updating organization billing", e))?;

        row.map(Into::into)
            .ok_or_else(|| AppError::OrganizationNotFound(organization_id.to_string()))
    }

    #[instrument(skip(self, filter, cursor))]
    async fn fetch_calls(
        &self,
        organization_id: Uuid,
        filter: &CallFilter,
        cursor: Option<&CallCursor>,
        limit: i64,
    ) -> AppResult<Vec<Call>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM calls",
            CALL_SELECT_COLUMNS
        ));
        push_filter(&mut builder, organization_id, filter);

        if let Some(cursor) = cursor {
            builder.push(" AND (occurred_at, external_call_id) < (");
            builder.push_bind(cursor.occurred_at);
            builder.push(", ");
            builder.push_bind(cursor.external_call_id.clone());
            builder.push(")");
        }

        builder.push(" ORDER BY occurred_at DESC, external_call_id DESC LIMIT ");
        builder.push_bind(limit);

        let rows = builder
            .build_query_as::<CallRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| store_error("fetching calls", e))?;

        debug!(count = rows.len(), "Fetched call page");
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, filter))]
    async fn overview(
        &self,
        organization_id: Uuid,
        filter: &CallFilter,
    ) -> AppResult<OverviewAggregate> {
        let mut builder = QueryBuilder::<Postgres>::new(
            r#"
            SELECT
                COUNT(*)::BIGINT AS total_calls,
                COUNT(*) FILTER (WHERE is_billable)::BIGINT AS billable_calls,
                COUNT(*) FILTER (WHERE connected_at IS NOT NULL)::BIGINT AS answered_calls,
                COALESCE(SUM(duration_seconds), 0)::BIGINT AS total_duration_seconds,
                COALESCE(SUM(billed_minutes), 0)::BIGINT AS total_billed_minutes,
                COALESCE(SUM(billed_minutes) FILTER (WHERE is_billable), 0)::BIGINT
                    AS billable_billed_minutes
            FROM calls
            "#,
        );
        push_filter(&mut builder, organization_id, filter);

        let row = builder
            .build_query_as::<OverviewRow>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| store_error("computing overview", e))?;

        Ok(row.into())
    }
}

/// Helper struct for mapping database rows to domain model
#[derive(Debug, sqlx::FromRow)]
struct CallRow {
    external_call_id: String,
    organization_id: Uuid,
    agent_id: String,
    started_at: Option<DateTime<Utc>>,
    connected_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    direction: String,
    from_address: Option<String>,
    to_address: Option<String>,
    status: Option<String>,
    end_reason: String,
    duration_seconds: i64,
    billed_minutes: i64,
    summary: Option<String>,
    transcript: Option<String>,
    raw: serde_json::Value,
    received_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CallRow> for Call {
    fn from(row: CallRow) -> Self {
        Call {
            external_call_id: row.external_call_id,
            organization_id: row.organization_id,
            agent_id: row.agent_id,
            started_at: row.started_at,
            connected_at: row.connected_at,
            ended_at: row.ended_at,
            direction: row.direction,
            from_address: row.from_address,
            to_address: row.to_address,
            status: row.status.map(CallStatus::from),
            end_reason: EndReason::from(row.end_reason),
            duration_seconds: row.duration_seconds,
            billed_minutes: row.billed_minutes,
            summary: row.summary,
            transcript: row.transcript,
            raw: row.raw,
            received_at: row.received_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrganizationRow {
    id: Uuid,
    name: String,
    slug: String,
    billing_rate_per_minute: Decimal,
    cogs_per_minute: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrganizationRow> for Organization {
    fn from(row: OrganizationRow) -> Self {
        Organization {
            id: row.id,
            name: row.name,
            slug: row.slug,
            billing_rate_per_minute: row.billing_rate_per_minute,
            cogs_per_minute: row.cogs_per_minute,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OverviewRow {
    total_calls: i64,
    billable_calls: i64,
    answered_calls: i64,
    total_duration_seconds: i64,
    total_billed_minutes: i64,
    billable_billed_minutes: i64,
}

impl From<OverviewRow> for OverviewAggregate {
    fn from(row: OverviewRow) -> Self {
        OverviewAggregate {
            total_calls: row.total_calls,
            billable_calls: row.billable_calls,
            answered_calls: row.answered_calls,
            total_duration_seconds: row.total_duration_seconds,
            total_billed_minutes: row.total_billed_minutes,
            billable_billed_minutes: row.billable_billed_minutes,
        }
    }
}
