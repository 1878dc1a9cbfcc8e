//! Error types for the common library.
//!
//! This module provides a unified error hierarchy using `thiserror` so the
//! Flux adapter and the tool layer report failures consistently.
//!
//! # Error Categories
//!
//! - `ConfigError`: Missing or invalid configuration
//! - `Error::Validation`: Bad or missing caller input
//! - `Error::TransientNetwork`: Submission failed after exhausting retries
//! - `Error::Api`: Non-retryable HTTP rejection from the remote service
//! - `Error::Protocol`: Malformed or incomplete response envelope
//! - `Error::GenerationFailed`: The service reported the job as failed
//! - `Error::PollTimeout`: The job did not finish within the wait budget
//! - `Error::ImageFetch`: Downloading an edit source image failed
//! - `Error::MissingSample`: A ready job carried no output image
//! - `Error::Io`: File system operations

use serde_json::Value;
use thiserror::Error;

/// Unified error type for the Flux MCP server.
///
/// Only [`Error::TransientNetwork`] is ever retried, and only by the
/// submission path. Everything else surfaces to the caller immediately.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration errors (missing env vars, invalid values)
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Network-level failure during job submission, after all retries.
    #[error("Request to {endpoint} failed after {attempts} attempt(s): {message}")]
    TransientNetwork {
        /// The API endpoint that was called
        endpoint: String,
        /// How many submission attempts were made
        attempts: u32,
        /// Description of the last failure
        message: String,
    },

    /// API errors with endpoint and HTTP status context
    #[error("API error for {endpoint} (HTTP {status_code}): {message}")]
    Api {
        /// The API endpoint that was called
        endpoint: String,
        /// HTTP status code returned by the API
        status_code: u16,
        /// Error message from the API or describing the failure
        message: String,
    },

    /// The remote service answered with something we could not interpret.
    #[error("Protocol error from {endpoint}: {message}")]
    Protocol {
        /// The API endpoint that was called
        endpoint: String,
        /// What was wrong with the response
        message: String,
    },

    /// The remote service reported the job as `Error` or `Failed`.
    #[error("Generation failed for request {request_id}: {payload}")]
    GenerationFailed {
        /// Job identifier
        request_id: String,
        /// Raw poll payload, kept for diagnostics
        payload: Value,
    },

    /// The job did not reach a terminal status within the wait budget.
    #[error("Request {request_id} timed out after {elapsed_secs:.1}s")]
    PollTimeout {
        /// Job identifier
        request_id: String,
        /// Seconds spent polling before giving up
        elapsed_secs: f64,
    },

    /// Downloading or reading the edit source image failed.
    #[error("Failed to process input image {url}: {message}")]
    ImageFetch {
        /// The image reference that could not be fetched
        url: String,
        /// Underlying cause
        message: String,
    },

    /// A `Ready` job result without a usable `sample`.
    #[error("Missing sample in result: {payload}")]
    MissingSample {
        /// Raw poll payload, kept for diagnostics
        payload: Value,
    },

    /// File system I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new validation error.
    ///
    /// # Example
    ///
    /// ```
    /// use flux_mcp_common::error::Error;
    ///
    /// let err = Error::validation("prompt cannot be empty");
    /// assert!(err.to_string().contains("prompt cannot be empty"));
    /// ```
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// Create a new transient network error.
    pub fn transient(endpoint: impl Into<String>, attempts: u32, message: impl Into<String>) -> Self {
        Error::TransientNetwork {
            endpoint: endpoint.into(),
            attempts,
            message: message.into(),
        }
    }

    /// Create a new API error with endpoint, status code, and message.
    ///
    /// # Example
    ///
    /// ```
    /// use flux_mcp_common::error::Error;
    ///
    /// let err = Error::api("https://api.bfl.ai/v1/flux-pro-1.1", 422, "Unprocessable");
    /// assert!(err.to_string().contains("api.bfl.ai"));
    /// assert!(err.to_string().contains("422"));
    /// ```
    pub fn api(endpoint: impl Into<String>, status_code: u16, message: impl Into<String>) -> Self {
        Error::Api {
            endpoint: endpoint.into(),
            status_code,
            message: message.into(),
        }
    }

    /// Create a new protocol error.
    pub fn protocol(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Protocol {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a new generation failure carrying the raw payload.
    pub fn generation_failed(request_id: impl Into<String>, payload: Value) -> Self {
        Error::GenerationFailed {
            request_id: request_id.into(),
            payload,
        }
    }

    /// Create a new poll timeout error.
    ///
    /// # Example
    ///
    /// ```
    /// use flux_mcp_common::error::Error;
    ///
    /// let err = Error::poll_timeout("abc-123", 180.0);
    /// assert!(err.to_string().contains("abc-123"));
    /// assert!(err.to_string().contains("180"));
    /// ```
    pub fn poll_timeout(request_id: impl Into<String>, elapsed_secs: f64) -> Self {
        Error::PollTimeout {
            request_id: request_id.into(),
            elapsed_secs,
        }
    }

    /// Create a new image fetch error.
    pub fn image_fetch(url: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ImageFetch {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a new missing sample error.
    pub fn missing_sample(payload: Value) -> Self {
        Error::MissingSample { payload }
    }

    /// Whether the submission path may retry after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::TransientNetwork { .. })
    }
}

/// Configuration errors.
///
/// These errors occur when loading or validating configuration from
/// environment variables or `.env` files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set
    #[error("Required environment variable {0} is not set")]
    MissingEnvVar(String),

    /// An environment variable has an invalid value
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl ConfigError {
    /// Create a new missing environment variable error.
    pub fn missing_env_var(name: impl Into<String>) -> Self {
        ConfigError::MissingEnvVar(name.into())
    }

    /// Create a new invalid value error.
    pub fn invalid_value(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue(name.into(), reason.into())
    }
}

/// Result type alias using the unified Error type.
pub type Result<T> = std::result::Result<T, Error>;
