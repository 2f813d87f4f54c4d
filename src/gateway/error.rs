//! Gateway error handling.

use thiserror::Error;

/// Errors produced by the AI provider gateway.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The provider identifier is not registered.
    #[error("Unknown AI provider: {0}")]
    UnknownProvider(String),

    /// Configuration is missing, disabled or inconsistent with the provider.
    #[error("Invalid AI configuration: {0}")]
    InvalidConfig(String),

    /// The provider answered with a non-success status or reported a failure.
    #[error("AI provider request failed (HTTP {status}): {message}")]
    ProviderError {
        /// HTTP status code returned by the provider.
        status: u16,
        /// Message extracted from the provider's error envelope, or the raw body.
        message: String,
    },

    /// The request could not be sent or no response was received.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Reading the streamed response body failed part way through.
    #[error("Failed to read streamed response: {0}")]
    StreamDecodeError(String),

    /// A successful response did not carry the expected envelope.
    #[error("Invalid response format from AI provider: {0}")]
    InvalidResponseFormat(String),

    /// Image recognition was requested but no vision provider is enabled.
    #[error("Image recognition requires a vision-capable provider; enable the vision configuration")]
    VisionNotConfigured,

    /// The structured payload could not be located in, or parsed from, the answer.
    #[error("Failed to parse structured data from AI response: {0}")]
    ExtractionParseError(String),

    /// The caller's fragment callback failed and the call was aborted.
    #[error("Fragment callback failed: {0}")]
    CallbackError(String),

    /// Caller-supplied input was malformed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for gateway operations.
pub type Result<T, E = GatewayError> = std::result::Result<T, E>;

impl GatewayError {
    /// Returns true for errors raised before any network traffic.
    ///
    /// These are configuration and routing failures; retrying them without
    /// changing the configuration cannot succeed.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownProvider(_) | Self::InvalidConfig(_) | Self::VisionNotConfigured
        )
    }
}
