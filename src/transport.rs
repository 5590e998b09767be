//! Upload Transport
//!
//! The contract a remote destination must satisfy, plus the default HTTP
//! implementation. A batch of sanitized events is serialized as a JSON
//! array and sent to the configured endpoint; no response schema is
//! defined. The transport supplies its own timeout; this subsystem imposes
//! none.

use async_trait::async_trait;
use std::time::Duration;

use crate::constants::TRANSPORT_TIMEOUT_SECS;
use crate::event::TelemetryEvent;

/// Transport failure, opaque to the uploader
#[derive(Debug, Clone)]
pub struct TransportError(pub String);

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for TransportError {}

/// Pluggable batch delivery seam
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one batch of sanitized events to the endpoint.
    ///
    /// A successful send has no observable effect other than the batch
    /// leaving memory; the uploader performs no retry on failure.
    async fn send(
        &self,
        endpoint: &str,
        batch: &[TelemetryEvent],
    ) -> Result<(), TransportError>;
}

/// Default HTTP transport posting the batch as a JSON array
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(TRANSPORT_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        endpoint: &str,
        batch: &[TelemetryEvent],
    ) -> Result<(), TransportError> {
        let response = self
            .client
            .post(endpoint)
            .json(batch)
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError(format!("server returned {}", status)));
        }

        log::debug!("Uploaded batch of {} events", batch.len());
        Ok(())
    }
}
