//! Domain models for VoxMetrics
//!
//! Calls, agents, organizations and callers, plus the provider payload types
//! they are decoded from.

pub mod agent;
pub mod call;
pub mod organization;
pub mod principal;
pub mod provider;

pub use agent::{
    Agent, AgentStatus, AgentStatusUpdate, AgentValidation, NewAgent, WebhookCheck,
    AGENT_WEBHOOK_PREFIX,
};
pub use call::{
    Call, CallCursor, CallFilter, CallOutcome, CallPage, CallStatus, CallUpsert, CanonicalCall,
    EndReason, OverviewAggregate, UNKNOWN_DIRECTION,
};
pub use organization::{BillingUpdate, Organization};
pub use principal::{Principal, Role};
pub use provider::{CallAnalysis, ProviderCall, ProviderCallListing, WebhookEnvelope, WebhookEvent};
