//! HTTP adapter for the Black Forest Labs Flux API.
//!
//! Every operation follows the same three steps:
//!
//! 1. **Submit** a job with `POST {base}/v1/{model}`, retrying transient
//!    failures with a linear backoff.
//! 2. **Poll** `GET {polling_url}?id={id}` at a fixed cadence until the job
//!    is `Ready`, fails, or the wait budget runs out.
//! 3. **Unwrap** the `result.sample` image URL from the final payload.
//!
//! [`FluxAdapter`] holds no mutable state besides the pooled
//! `reqwest::Client`, so it is cheap to clone and safe to share between tasks.

use crate::image_input;
use async_trait::async_trait;
use flux_mcp_common::config::Config;
use flux_mcp_common::error::{ConfigError, Error, Result};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-key";

/// Delay between two polls of the same job.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Timeout of a single poll request, independent of the overall budget.
pub const POLL_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Backoff step between submission attempts; attempt `n` waits `n` steps.
pub const RETRY_BACKOFF_STEP: Duration = Duration::from_millis(1500);

/// Operation tag recorded in edit metadata.
pub const EDIT_OPERATION: &str = "image_edit";

/// Mime type assumed for downloaded images without a `Content-Type`.
pub const DEFAULT_REMOTE_MIME: &str = "image/jpeg";

// =============================================================================
// Configuration
// =============================================================================

/// Requested output size. Aspect ratio and explicit dimensions never mix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OutputSize {
    /// Let the service pick dimensions for the ratio, e.g. `16:9`.
    AspectRatio { aspect_ratio: String },
    /// Explicit pixel dimensions.
    Dimensions { width: u32, height: u32 },
}

impl OutputSize {
    /// Pick the size to send; an aspect ratio wins over dimensions.
    pub fn resolve(aspect_ratio: Option<&str>, width: u32, height: u32) -> Self {
        match aspect_ratio.map(str::trim).filter(|r| !r.is_empty()) {
            Some(ratio) => OutputSize::AspectRatio {
                aspect_ratio: ratio.to_string(),
            },
            None => OutputSize::Dimensions { width, height },
        }
    }

    /// The configured aspect ratio, if any.
    pub fn aspect_ratio(&self) -> Option<&str> {
        match self {
            OutputSize::AspectRatio { aspect_ratio } => Some(aspect_ratio),
            OutputSize::Dimensions { .. } => None,
        }
    }
}

/// Immutable adapter settings, fixed at construction.
#[derive(Clone)]
pub struct AdapterConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub edit_model: String,
    pub raw_mode: bool,
    pub size: OutputSize,
    pub safety_tolerance: u8,
    pub prompt_upsampling: bool,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub poll_timeout: Duration,
    pub poll_interval: Duration,
    pub poll_request_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl AdapterConfig {
    /// Settings for `base_url` with every other value at its default.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let defaults = Config::default();
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Self::from_parts(&defaults, String::new())
        }
    }

    /// Build adapter settings from the loaded application configuration.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingEnvVar` if no API key is configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ConfigError::missing_env_var("BFL_API_KEY"))?;
        Ok(Self::from_parts(config, api_key))
    }

    fn from_parts(config: &Config, api_key: String) -> Self {
        Self {
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            edit_model: config.edit_model.clone(),
            raw_mode: config.raw_mode,
            size: OutputSize::resolve(config.aspect_ratio.as_deref(), config.width, config.height),
            safety_tolerance: config.safety_tolerance,
            prompt_upsampling: config.prompt_upsampling,
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            read_timeout: Duration::from_secs(config.read_timeout_secs),
            poll_timeout: Duration::from_secs(config.poll_timeout_secs),
            poll_interval: POLL_INTERVAL,
            poll_request_timeout: POLL_REQUEST_TIMEOUT,
            max_retries: config.max_retries,
            retry_backoff: RETRY_BACKOFF_STEP,
        }
    }

    /// Endpoint for text-to-image submissions.
    pub fn generate_endpoint(&self) -> String {
        format!("{}/v1/{}", self.base_url, self.model)
    }

    /// Endpoint for image-conditioned edit submissions.
    pub fn edit_endpoint(&self) -> String {
        format!("{}/v1/{}", self.base_url, self.edit_model)
    }

    /// Polling URL used when a submission response does not name one.
    ///
    /// This path has never been confirmed against a live response that
    /// omits `polling_url`.
    pub fn fallback_polling_url(&self) -> String {
        format!("{}/v1/get_result", self.base_url)
    }
}

impl fmt::Debug for AdapterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("edit_model", &self.edit_model)
            .field("raw_mode", &self.raw_mode)
            .field("size", &self.size)
            .field("safety_tolerance", &self.safety_tolerance)
            .field("prompt_upsampling", &self.prompt_upsampling)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("poll_timeout", &self.poll_timeout)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// API Request/Response Types
// =============================================================================

/// Output encoding for edited images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Jpeg => write!(f, "jpeg"),
            OutputFormat::Png => write!(f, "png"),
        }
    }
}

/// Text-to-image submission body.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub safety_tolerance: u8,
    pub prompt_upsampling: bool,
    pub raw: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance_scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_image: Option<String>,
    #[serde(flatten)]
    pub size: OutputSize,
}

/// Kontext edit submission body.
#[derive(Debug, Clone, Serialize)]
pub struct EditRequest {
    pub prompt: String,
    pub input_image: String,
    pub safety_tolerance: u8,
    pub prompt_upsampling: bool,
    pub output_format: OutputFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
}

/// Envelope returned by a submission.
#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: Option<String>,
    polling_url: Option<String>,
}

/// A submitted job, consumed by polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub id: String,
    pub polling_url: String,
}

/// Job status as reported by the polling endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Ready,
    Error,
    Failed,
    /// Any other status string; polling continues.
    Other(String),
}

impl JobStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "Pending" => JobStatus::Pending,
            "Ready" => JobStatus::Ready,
            "Error" => JobStatus::Error,
            "Failed" => JobStatus::Failed,
            other => JobStatus::Other(other.to_string()),
        }
    }

    /// Whether the job ended without output.
    pub fn is_failure(&self) -> bool {
        matches!(self, JobStatus::Error | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "Pending"),
            JobStatus::Ready => write!(f, "Ready"),
            JobStatus::Error => write!(f, "Error"),
            JobStatus::Failed => write!(f, "Failed"),
            JobStatus::Other(s) => write!(f, "{}", s),
        }
    }
}

/// One poll response: the parsed status plus the raw payload.
#[derive(Debug, Clone, PartialEq)]
pub struct JobResult {
    pub status: JobStatus,
    pub payload: Value,
}

impl JobResult {
    pub fn from_payload(payload: Value) -> Self {
        let status = JobStatus::parse(payload.get("status").and_then(Value::as_str).unwrap_or(""));
        Self { status, payload }
    }
}

/// Metadata returned alongside every output image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationMeta {
    /// Job identifier assigned by the service
    pub request_id: String,
    /// Model that produced the image
    pub model: String,
    /// Operation tag, present for edits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// Source image reference, present for edits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_image: Option<String>,
    /// Raw `result` object from the final poll
    pub result: Value,
}

/// A completed generation or edit.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutput {
    pub image_url: String,
    pub meta: GenerationMeta,
}

/// Pull the output image URL and nested result out of a `Ready` payload.
///
/// # Errors
/// `Error::MissingSample` when `result.sample` is absent, not a string, or empty.
pub fn extract_sample(result: &JobResult) -> Result<(String, Value)> {
    let nested = result
        .payload
        .get("result")
        .cloned()
        .unwrap_or_else(|| Value::Object(Default::default()));

    let sample = nested
        .get("sample")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    match sample {
        Some(sample) => Ok((sample, nested)),
        None => Err(Error::missing_sample(result.payload.clone())),
    }
}

// =============================================================================
// Generator seam
// =============================================================================

/// The two operations the tool layer drives.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Text-to-image, optionally conditioned on an input image.
    async fn generate(
        &self,
        prompt: &str,
        input_image: Option<&str>,
        guidance_scale: Option<f64>,
    ) -> Result<GenerationOutput>;

    /// Image-conditioned edit of `image_url`.
    async fn edit_image(
        &self,
        prompt: &str,
        image_url: &str,
        aspect_ratio: Option<&str>,
        seed: Option<i64>,
        output_format: OutputFormat,
    ) -> Result<GenerationOutput>;
}

// =============================================================================
// Adapter
// =============================================================================

enum PostFailure {
    Retryable(String),
    Fatal(Error),
}

/// Flux API client.
#[derive(Clone)]
pub struct FluxAdapter {
    config: Arc<AdapterConfig>,
    /// Carries the API key; only talks to `base_url` and its polling URLs.
    http: reqwest::Client,
    /// Fetches edit source images from arbitrary hosts, without credentials.
    downloads: reqwest::Client,
}

impl FluxAdapter {
    /// Create an adapter and its pooled HTTP clients.
    ///
    /// # Errors
    /// Returns a configuration error if the API key is not a valid header
    /// value or the HTTP client cannot be built.
    pub fn new(config: AdapterConfig) -> Result<Self> {
        let mut api_key = HeaderValue::from_str(&config.api_key).map_err(|_| {
            ConfigError::invalid_value("BFL_API_KEY", "contains characters not allowed in an HTTP header")
        })?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, api_key);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()
            .map_err(|e| ConfigError::invalid_value("HTTP client", e.to_string()))?;

        let downloads = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()
            .map_err(|e| ConfigError::invalid_value("HTTP client", e.to_string()))?;

        debug!(config = ?config, "Initialized FluxAdapter");

        Ok(Self {
            config: Arc::new(config),
            http,
            downloads,
        })
    }

    /// The adapter's settings.
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Build the submission body for a generation call.
    pub fn generation_request(
        &self,
        prompt: &str,
        input_image: Option<String>,
        guidance_scale: Option<f64>,
    ) -> GenerationRequest {
        GenerationRequest {
            prompt: prompt.to_string(),
            safety_tolerance: self.config.safety_tolerance,
            prompt_upsampling: self.config.prompt_upsampling,
            raw: self.config.raw_mode,
            guidance_scale,
            input_image,
            size: self.config.size.clone(),
        }
    }

    /// Build the submission body for an edit call.
    ///
    /// Without a per-call aspect ratio the configured one is used, if any.
    pub fn edit_request(
        &self,
        prompt: &str,
        input_image: String,
        aspect_ratio: Option<&str>,
        seed: Option<i64>,
        output_format: OutputFormat,
    ) -> EditRequest {
        let aspect_ratio = aspect_ratio
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .or_else(|| self.config.size.aspect_ratio())
            .map(str::to_string);

        EditRequest {
            prompt: prompt.to_string(),
            input_image,
            safety_tolerance: self.config.safety_tolerance,
            prompt_upsampling: self.config.prompt_upsampling,
            output_format,
            aspect_ratio,
            seed,
        }
    }

    /// Generate an image from a text prompt.
    #[instrument(level = "info", name = "flux_generate", skip_all, fields(model = %self.config.model))]
    pub async fn generate(
        &self,
        prompt: &str,
        input_image: Option<&str>,
        guidance_scale: Option<f64>,
    ) -> Result<GenerationOutput> {
        if prompt.trim().is_empty() {
            return Err(Error::validation("prompt cannot be empty"));
        }
        if let Some(scale) = guidance_scale {
            if !scale.is_finite() || scale <= 0.0 {
                return Err(Error::validation(format!("guidance_scale must be a positive number, got {}", scale)));
            }
        }

        let input_image = match input_image.filter(|r| !r.trim().is_empty()) {
            Some(reference) => Some(image_input::normalize_image_reference(reference).await?),
            None => None,
        };

        let request = self.generation_request(prompt, input_image, guidance_scale);
        let endpoint = self.config.generate_endpoint();
        let handle = self.submit(&endpoint, &request).await?;
        let result = self.poll_until_ready(&handle, self.config.poll_timeout).await?;
        let (image_url, nested) = extract_sample(&result)?;

        info!(request_id = %handle.id, "Image generated");

        Ok(GenerationOutput {
            image_url,
            meta: GenerationMeta {
                request_id: handle.id,
                model: self.config.model.clone(),
                operation: None,
                original_image: None,
                result: nested,
            },
        })
    }

    /// Edit an existing image with a Kontext model.
    #[instrument(
        level = "info",
        name = "flux_edit_image",
        skip_all,
        fields(model = %self.config.edit_model, output_format = %output_format)
    )]
    pub async fn edit_image(
        &self,
        prompt: &str,
        image_url: &str,
        aspect_ratio: Option<&str>,
        seed: Option<i64>,
        output_format: OutputFormat,
    ) -> Result<GenerationOutput> {
        if prompt.trim().is_empty() {
            return Err(Error::validation("prompt cannot be empty"));
        }
        if image_url.trim().is_empty() {
            return Err(Error::validation("image_url cannot be empty"));
        }

        let input_image = self.fetch_image_as_data_url(image_url).await?;
        let request = self.edit_request(prompt, input_image, aspect_ratio, seed, output_format);
        let endpoint = self.config.edit_endpoint();
        let handle = self.submit(&endpoint, &request).await?;
        let result = self.poll_until_ready(&handle, self.config.poll_timeout).await?;
        let (image_url_out, nested) = extract_sample(&result)?;

        info!(request_id = %handle.id, "Image edited");

        Ok(GenerationOutput {
            image_url: image_url_out,
            meta: GenerationMeta {
                request_id: handle.id,
                model: self.config.edit_model.clone(),
                operation: Some(EDIT_OPERATION.to_string()),
                original_image: Some(image_url.to_string()),
                result: nested,
            },
        })
    }

    /// Turn an edit source into inline data.
    ///
    /// Data URLs pass through, remote URLs are downloaded, and local files
    /// are read. Anything else is an `ImageFetch` error.
    pub async fn fetch_image_as_data_url(&self, reference: &str) -> Result<String> {
        if image_input::is_data_url(reference) {
            return Ok(reference.to_string());
        }
        if image_input::is_remote_url(reference) {
            return self.download_as_data_url(reference).await;
        }

        let normalized = image_input::normalize_image_reference(reference)
            .await
            .map_err(|e| Error::image_fetch(reference, e.to_string()))?;
        if image_input::is_data_url(&normalized) {
            Ok(normalized)
        } else {
            Err(Error::image_fetch(
                reference,
                "not an http(s) URL, data URL, or existing local file",
            ))
        }
    }

    async fn download_as_data_url(&self, url: &str) -> Result<String> {
        debug!(url = %url, "Downloading edit source image");

        let response = self
            .downloads
            .get(url)
            .header(ACCEPT, "image/*,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| Error::image_fetch(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::image_fetch(url, format!("HTTP {}", status)));
        }

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_REMOTE_MIME)
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::image_fetch(url, e.to_string()))?;

        debug!(url = %url, mime_type = %mime_type, size = bytes.len(), "Downloaded edit source image");
        Ok(image_input::to_data_url(&mime_type, &bytes))
    }

    /// Submit a job, retrying transient failures.
    ///
    /// # Errors
    /// - `TransientNetwork` once every attempt failed at the network level
    ///   or with a 5xx/429 status
    /// - `Api` for any other non-success status (not retried)
    /// - `Protocol` if the envelope is not JSON or has no `id`
    #[instrument(level = "debug", skip(self, payload))]
    pub async fn submit<T>(&self, endpoint: &str, payload: &T) -> Result<JobHandle>
    where
        T: Serialize + Sync + ?Sized,
    {
        let max_attempts = self.config.max_retries.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.post_once(endpoint, payload).await {
                Ok(body) => return self.parse_submission(endpoint, &body),
                Err(PostFailure::Fatal(err)) => return Err(err),
                Err(PostFailure::Retryable(message)) => {
                    warn!(attempt, max_attempts, error = %message, "Submission attempt failed");
                    last_error = message;
                    if attempt < max_attempts {
                        tokio::time::sleep(self.config.retry_backoff * attempt).await;
                    }
                }
            }
        }

        Err(Error::transient(endpoint, max_attempts, last_error))
    }

    async fn post_once<T>(&self, endpoint: &str, payload: &T) -> std::result::Result<String, PostFailure>
    where
        T: Serialize + Sync + ?Sized,
    {
        let response = self
            .http
            .post(endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    PostFailure::Fatal(Error::validation(format!("could not encode request: {}", e)))
                } else {
                    PostFailure::Retryable(describe_request_error(&e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PostFailure::Retryable(describe_request_error(&e)))?;

        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(PostFailure::Retryable(format!("HTTP {}: {}", status.as_u16(), body)));
        }
        if !status.is_success() {
            return Err(PostFailure::Fatal(Error::api(endpoint, status.as_u16(), body)));
        }

        Ok(body)
    }

    fn parse_submission(&self, endpoint: &str, body: &str) -> Result<JobHandle> {
        let envelope: SubmitResponse = serde_json::from_str(body)
            .map_err(|e| Error::protocol(endpoint, format!("invalid submission response: {}", e)))?;

        let id = envelope
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::protocol(endpoint, format!("submission response has no id: {}", body)))?;

        let polling_url = match envelope.polling_url.filter(|u| !u.is_empty()) {
            Some(url) => url,
            None => {
                let fallback = self.config.fallback_polling_url();
                warn!(
                    request_id = %id,
                    polling_url = %fallback,
                    "Submission response has no polling_url, using unverified fallback"
                );
                fallback
            }
        };

        info!(request_id = %id, "Job submitted");
        Ok(JobHandle { id, polling_url })
    }

    /// Poll a job at a fixed cadence until it is ready, fails, or `max_wait` elapses.
    ///
    /// Individual poll failures are logged and retried on the next tick.
    ///
    /// # Errors
    /// - `GenerationFailed` if the job reports `Error` or `Failed`
    /// - `PollTimeout` once `max_wait` has elapsed
    #[instrument(level = "debug", skip(self, handle), fields(request_id = %handle.id))]
    pub async fn poll_until_ready(&self, handle: &JobHandle, max_wait: Duration) -> Result<JobResult> {
        let started = Instant::now();
        let mut polls: u32 = 0;

        while started.elapsed() < max_wait {
            tokio::time::sleep(self.config.poll_interval).await;

            let remaining = max_wait.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                break;
            }
            polls += 1;

            let result = match self.poll_once(handle, remaining.min(self.config.poll_request_timeout)).await {
                Ok(result) => result,
                Err(reason) => {
                    debug!(poll = polls, error = %reason, "Poll failed, retrying on next tick");
                    continue;
                }
            };

            if result.status == JobStatus::Ready {
                info!(polls, elapsed_ms = started.elapsed().as_millis() as u64, "Job ready");
                return Ok(result);
            }
            if result.status.is_failure() {
                warn!(status = %result.status, "Job failed");
                return Err(Error::generation_failed(&handle.id, result.payload));
            }
            debug!(poll = polls, status = %result.status, "Job in progress");
        }

        let elapsed = started.elapsed();
        warn!(polls, elapsed_ms = elapsed.as_millis() as u64, "Job did not finish in time");
        Err(Error::poll_timeout(&handle.id, elapsed.as_secs_f64()))
    }

    async fn poll_once(&self, handle: &JobHandle, timeout: Duration) -> std::result::Result<JobResult, String> {
        let response = self
            .http
            .get(&handle.polling_url)
            .query(&[("id", handle.id.as_str())])
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| describe_request_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status));
        }

        let payload: Value = response.json().await.map_err(|e| describe_request_error(&e))?;
        Ok(JobResult::from_payload(payload))
    }
}

#[async_trait]
impl ImageGenerator for FluxAdapter {
    async fn generate(
        &self,
        prompt: &str,
        input_image: Option<&str>,
        guidance_scale: Option<f64>,
    ) -> Result<GenerationOutput> {
        FluxAdapter::generate(self, prompt, input_image, guidance_scale).await
    }

    async fn edit_image(
        &self,
        prompt: &str,
        image_url: &str,
        aspect_ratio: Option<&str>,
        seed: Option<i64>,
        output_format: OutputFormat,
    ) -> Result<GenerationOutput> {
        FluxAdapter::edit_image(self, prompt, image_url, aspect_ratio, seed, output_format).await
    }
}

fn describe_request_error(err: &reqwest::Error) -> String {
    let kind = if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connection failed"
    } else if err.is_decode() {
        "invalid body"
    } else {
        "request failed"
    };
    format!("{}: {}", kind, err)
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn adapter(size: OutputSize, raw: bool, tolerance: u8) -> FluxAdapter {
        let config = AdapterConfig {
            size,
            raw_mode: raw,
            safety_tolerance: tolerance,
            ..AdapterConfig::new("k", "https://api.example.test")
        };
        FluxAdapter::new(config).unwrap()
    }

    fn aspect_ratio_strategy() -> impl Strategy<Value = Option<String>> {
        prop_oneof![
            Just(None),
            (1u32..32, 1u32..32).prop_map(|(w, h)| Some(format!("{}:{}", w, h))),
        ]
    }

    proptest! {
        /// Aspect ratio and width/height never appear together, and one of them always does.
        #[test]
        fn size_fields_are_mutually_exclusive(
            ratio in aspect_ratio_strategy(),
            width in 256u32..2048,
            height in 256u32..2048,
            prompt in "[a-zA-Z ]{1,40}",
        ) {
            let size = OutputSize::resolve(ratio.as_deref(), width, height);
            let json = serde_json::to_value(adapter(size, false, 6).generation_request(&prompt, None, None)).unwrap();

            let has_ratio = json.get("aspect_ratio").is_some();
            let has_dims = json.get("width").is_some() && json.get("height").is_some();
            prop_assert!(has_ratio != has_dims);
            prop_assert_eq!(has_ratio, ratio.is_some());
            prop_assert!(json.get("width").is_some() == json.get("height").is_some());
        }

        /// Core fields always carry the configured values; optional ones appear only when given.
        #[test]
        fn core_fields_reflect_config(
            raw in any::<bool>(),
            tolerance in 0u8..=6,
            guidance in proptest::option::of(1.5f64..5.0),
        ) {
            let adapter = adapter(OutputSize::resolve(Some("1:1"), 1, 1), raw, tolerance);
            let json = serde_json::to_value(adapter.generation_request("p", None, guidance)).unwrap();

            prop_assert_eq!(json["raw"].as_bool(), Some(raw));
            prop_assert_eq!(json["safety_tolerance"].as_u64(), Some(tolerance as u64));
            prop_assert_eq!(json.get("guidance_scale").is_some(), guidance.is_some());
            prop_assert!(json.get("guidance_scale").map(|v| !v.is_null()).unwrap_or(true));
        }
    }
}
