//! VoxMetrics Database Layer
//!
//! This crate provides the backing-store implementations for the VoxMetrics
//! core. It includes:
//!
//! - Connection pool management and migrations with sqlx
//! - `PgTenantStore`: idempotent call upsert, cursor-paginated listings and
//!   overview aggregates over PostgreSQL
//! - `PgAgentStore`: the agent registry
//! - `MemoryStore`: an in-process store with the same semantics, used by
//!   service tests and local development

pub mod memory;
pub mod pool;
pub mod repositories;

pub use memory::MemoryStore;
pub use pool::{create_pool, run_migrations};
pub use repositories::*;

// Re-export commonly used types
pub use sqlx::{PgPool, Postgres};
pub use vox_core::{AppError, AppResult};

/// Map a sqlx failure to the core error taxonomy
///
/// Store failures are propagated unchanged; nothing in this crate retries.
pub(crate) fn store_error(context: &str, err: sqlx::Error) -> AppError {
    tracing::error!("Database error while {}: {}", context, err);
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Validation(format!("{}: duplicate value", context))
        }
        _ => AppError::StoreUnavailable(format!("{}: {}", context, err)),
    }
}
