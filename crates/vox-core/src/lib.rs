//! VoxMetrics Core Library
//!
//! This crate provides the foundational types, traits, and error handling
//! for the VoxMetrics system. It includes:
//!
//! - Domain models (Call, Agent, Organization, Principal)
//! - Provider payload types decoded at the webhook boundary
//! - Store traits for the tenant-scoped backing store and the provider API
//! - Unified error handling with HTTP response mapping
//! - Application configuration

pub mod config;
pub mod error;
pub mod models;
pub mod traits;

pub use config::AppConfig;
pub use error::AppError;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
