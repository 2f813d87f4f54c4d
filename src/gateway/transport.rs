//! HTTP transport.
//!
//! The [`Transport`] trait is the single seam between the gateway and the
//! network; tests substitute a scripted implementation.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};

use super::error::{GatewayError, Result};
use super::format::FormattedRequest;
use super::normalize;
use super::stream::{decode_frames, FrameStream};

/// Default timeout for one provider call.
///
/// Covers connection, request and the complete response body, including a
/// streamed one.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Response of a successful provider call.
pub enum TextResult {
    /// A complete JSON envelope.
    Complete(Value),
    /// Decoded frames of a streamed response.
    Stream(FrameStream),
}

impl fmt::Debug for TextResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete(value) => f.debug_tuple("Complete").field(value).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Sends formatted requests to a provider.
pub trait Transport: Send + Sync {
    /// Sends one request.
    ///
    /// Non-success statuses map to [`GatewayError::ProviderError`], failures
    /// to reach the provider to [`GatewayError::NetworkError`].
    fn send<'a>(
        &'a self,
        request: &'a FormattedRequest,
    ) -> Pin<Box<dyn Future<Output = Result<TextResult>> + Send + 'a>>;
}

/// [`Transport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport with [`DEFAULT_REQUEST_TIMEOUT`].
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a transport with a custom per-call timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::NetworkError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn send<'a>(
        &'a self,
        request: &'a FormattedRequest,
    ) -> Pin<Box<dyn Future<Output = Result<TextResult>> + Send + 'a>> {
        Box::pin(async move {
            info!(request = ?request, "Sending request to AI provider");

            let mut builder = self.client.post(&request.url).body(request.body_text());
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }

            let response = builder
                .send()
                .await
                .map_err(|e| GatewayError::NetworkError(e.to_string()))?;
            let response = check_error_response(response).await?;

            if request.streaming {
                debug!(status = %response.status(), "Reading streamed provider response");
                return Ok(TextResult::Stream(decode_frames(response.bytes_stream())));
            }

            let text = response
                .text()
                .await
                .map_err(|e| GatewayError::NetworkError(e.to_string()))?;
            let envelope: Value = serde_json::from_str(&text)
                .map_err(|e| GatewayError::InvalidResponseFormat(e.to_string()))?;

            debug!(response_len = text.len(), "Received AI provider response");
            Ok(TextResult::Complete(envelope))
        })
    }
}

/// Passes a successful response through; otherwise reads the body and
/// returns [`GatewayError::ProviderError`].
async fn check_error_response(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_else(|e| {
        debug!("Failed to read error response body: {e}");
        String::new()
    });
    Err(provider_error(status, &body))
}

/// Builds a [`GatewayError::ProviderError`] from a status and raw body.
pub(crate) fn provider_error(status: u16, body: &str) -> GatewayError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|envelope| normalize::error_message(&envelope))
        .unwrap_or_else(|| body.trim().to_string());
    debug!(status, message = %message, "AI provider returned an error");
    GatewayError::ProviderError { status, message }
}
