//! HTTP request handlers

pub mod agents;
pub mod metrics;
pub mod monitoring;
pub mod organizations;
pub mod webhooks;

pub use agents::configure as configure_agents;
pub use metrics::configure as configure_metrics;
pub use monitoring::configure as configure_monitoring;
pub use organizations::configure as configure_organizations;
pub use webhooks::configure as configure_webhooks;
