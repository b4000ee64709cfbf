//! Webhook signature verification
//!
//! HMAC-SHA256 over the raw request body, hex encoded. Comparison goes
//! through `Mac::verify_slice`, which is constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, warn};
use vox_core::config::WebhookConfig;
use vox_core::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

/// Verifies inbound webhook signatures against a shared secret
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    secret: Option<Vec<u8>>,
    headers: Vec<String>,
}

impl SignatureVerifier {
    pub fn new(secret: Option<String>, headers: Vec<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()).map(String::into_bytes),
            headers,
        }
    }

    pub fn from_config(config: &WebhookConfig) -> Self {
        Self::new(config.secret.clone(), config.signature_headers.clone())
    }

    /// Header names to read the signature from, in priority order
    pub fn header_names(&self) -> &[String] {
        &self.headers
    }

    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }

    /// Check `signature` against `body`
    ///
    /// Without a configured secret every body is accepted.
    ///
    /// # Errors
    ///
    /// Returns `AppError::SignatureInvalid` when a secret is configured and
    /// the signature is missing, not hex, or does not match.
    pub fn verify(&self, signature: Option<&str>, body: &[u8]) -> AppResult<()> {
        let Some(secret) = self.secret.as_deref() else {
            warn!("Webhook secret not configured, accepting unsigned payload");
            return Ok(());
        };

        let signature = signature.map(str::trim).filter(|s| !s.is_empty()).ok_or_else(|| {
            warn!("Webhook signature missing");
            AppError::SignatureInvalid
        })?;

        let expected = hex::decode(signature).map_err(|_| {
            warn!("Webhook signature is not valid hex");
            AppError::SignatureInvalid
        })?;

        let mut mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| AppError::Internal(format!("invalid webhook secret: {}", e)))?;
        mac.update(body);
        mac.verify_slice(&expected).map_err(|_| {
            warn!("Webhook signature mismatch");
            AppError::SignatureInvalid
        })?;

        debug!("Webhook signature verified");
        Ok(())
    }

    /// Hex HMAC of `body` under the configured secret
    pub fn sign(&self, body: &[u8]) -> Option<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_deref()?).ok()?;
        mac.update(body);
        Some(hex::encode(mac.finalize().into_bytes()))
    }
}
