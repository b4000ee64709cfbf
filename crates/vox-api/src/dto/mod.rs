//! Data Transfer Objects (DTOs) for API requests and responses

pub mod agents;
pub mod common;
pub mod metrics;
pub mod organizations;

pub use agents::*;
pub use common::*;
pub use metrics::*;
pub use organizations::*;
