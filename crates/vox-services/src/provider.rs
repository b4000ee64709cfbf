//! Voice-agent provider REST client
//!
//! Only the call listing is used, by backfill.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, instrument};
use vox_core::config::ProviderConfig;
use vox_core::models::{ProviderCall, ProviderCallListing};
use vox_core::traits::ProviderApi;
use vox_core::{AppError, AppResult};

use crate::constants::PROVIDER_TIMEOUT_SECS;

const LIST_CALLS_PATH: &str = "/list-calls";

#[derive(Deserialize)]
struct ListCallsResponse {
    #[serde(default)]
    calls: Vec<Value>,
}

/// reqwest-backed [`ProviderApi`]
#[derive(Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ProviderClient {
    /// # Errors
    ///
    /// Returns `AppError::Config` if no API key is configured or the HTTP
    /// client cannot be built.
    pub fn new(config: &ProviderConfig) -> AppResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AppError::Config("provider.api_key is not set".to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Config(format!("provider client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl ProviderApi for ProviderClient {
    #[instrument(skip(self), fields(agent_id = %listing.agent_id, offset = listing.offset))]
    async fn list_calls(&self, listing: &ProviderCallListing) -> AppResult<Vec<ProviderCall>> {
        let url = format!("{}{}", self.base_url, LIST_CALLS_PATH);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(&[
                ("agent_id", listing.agent_id.clone()),
                ("start_timestamp", listing.start_timestamp.to_string()),
                ("end_timestamp", listing.end_timestamp.to_string()),
                ("limit", listing.limit.to_string()),
                ("offset", listing.offset.to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Provider request failed");
                AppError::Provider(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, "Provider rejected call listing");
            return Err(AppError::Provider(format!("list calls returned {}", status)));
        }

        let body: ListCallsResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Provider returned an unreadable listing");
            AppError::Provider(format!("malformed listing: {}", e))
        })?;

        debug!(count = body.calls.len(), "Provider listing fetched");
        body.calls.into_iter().map(ProviderCall::from_value).collect()
    }
}
