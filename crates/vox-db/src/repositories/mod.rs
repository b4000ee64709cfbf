//! Store implementations
//!
//! Concrete PostgreSQL implementations of the store traits defined in
//! vox-core, using sqlx.

pub mod agent_repo;
pub mod tenant_repo;

pub use agent_repo::PgAgentStore;
pub use tenant_repo::PgTenantStore;
