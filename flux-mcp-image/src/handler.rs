//! Tool handler for Flux image generation and editing.
//!
//! Validates tool parameters, runs each call on its own task against an
//! [`ImageGenerator`], and shapes the outcome into the tool response.

use crate::adapter::{AdapterConfig, FluxAdapter, GenerationMeta, ImageGenerator, OutputFormat};
use flux_mcp_common::config::{Config, is_valid_aspect_ratio};
use flux_mcp_common::error::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{instrument, warn};

// =============================================================================
// Tool Parameters
// =============================================================================

/// Parameters for the `flux_generate` tool.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct FluxGenerateParams {
    /// Text prompt describing the image to generate
    pub prompt: String,

    /// Optional conditioning image: http(s) URL, data URL, or local file path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_image: Option<String>,

    /// Guidance scale; higher values follow the prompt more closely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance_scale: Option<f64>,
}

/// Parameters for the `flux_edit_image` tool.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct FluxEditParams {
    /// Instruction describing the edit to apply
    pub prompt: String,

    /// Image to edit: http(s) URL, data URL, or local file path
    pub image_url: String,

    /// Aspect ratio of the result, e.g. "16:9" (defaults to the configured ratio)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,

    /// Random seed for reproducible edits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,

    /// Output format: "jpeg" (default) or "png"
    #[serde(default)]
    pub output_format: OutputFormat,
}

/// Validation error details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn validation_error(field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Collapse a list of validation failures into a single error.
pub fn validation_failure(errors: &[ValidationError]) -> Error {
    let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    Error::validation(messages.join("; "))
}

impl FluxGenerateParams {
    /// Validate the parameters.
    ///
    /// # Returns
    /// - `Ok(())` if all parameters are valid
    /// - `Err(Vec<ValidationError>)` with all validation errors
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.prompt.trim().is_empty() {
            errors.push(validation_error("prompt", "Prompt cannot be empty"));
        }

        if let Some(scale) = self.guidance_scale {
            if !scale.is_finite() || scale <= 0.0 {
                errors.push(validation_error(
                    "guidance_scale",
                    format!("guidance_scale must be a positive number, got {}", scale),
                ));
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl FluxEditParams {
    /// Validate the parameters.
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.prompt.trim().is_empty() {
            errors.push(validation_error("prompt", "Prompt cannot be empty"));
        }

        if self.image_url.trim().is_empty() {
            errors.push(validation_error("image_url", "image_url cannot be empty"));
        }

        if let Some(ratio) = self.aspect_ratio.as_deref().filter(|r| !r.trim().is_empty()) {
            if !is_valid_aspect_ratio(ratio) {
                errors.push(validation_error(
                    "aspect_ratio",
                    format!("Invalid aspect ratio '{}', expected W:H such as 16:9", ratio),
                ));
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

// =============================================================================
// Tool Responses
// =============================================================================

/// Result of `flux_generate`, serialized as the tool's JSON text output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerateResponse {
    Success { image: String, meta: GenerationMeta },
    Error { message: String },
}

/// Result of `flux_edit_image`, serialized as the tool's JSON text output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EditResponse {
    Success {
        edited_image: String,
        original_image: String,
        meta: GenerationMeta,
    },
    Error {
        message: String,
    },
}

impl GenerateResponse {
    pub fn error(err: &Error) -> Self {
        GenerateResponse::Error { message: err.to_string() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, GenerateResponse::Success { .. })
    }
}

impl EditResponse {
    pub fn error(err: &Error) -> Self {
        EditResponse::Error { message: err.to_string() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, EditResponse::Success { .. })
    }
}

// =============================================================================
// Handler
// =============================================================================

/// Runs tool calls against an image generator.
#[derive(Clone)]
pub struct FluxHandler {
    generator: Arc<dyn ImageGenerator>,
}

impl FluxHandler {
    /// Create a handler backed by the Flux HTTP adapter.
    ///
    /// # Errors
    /// Returns a configuration error when no API key is configured.
    #[instrument(level = "debug", name = "flux_handler_new", skip_all)]
    pub fn new(config: &Config) -> Result<Self> {
        let adapter = FluxAdapter::new(AdapterConfig::from_config(config)?)?;
        Ok(Self::with_generator(Arc::new(adapter)))
    }

    /// Create a handler with an injected generator (for testing).
    pub fn with_generator(generator: Arc<dyn ImageGenerator>) -> Self {
        Self { generator }
    }

    /// Handle a `flux_generate` call.
    #[instrument(level = "info", name = "handle_flux_generate", skip_all)]
    pub async fn generate(&self, params: FluxGenerateParams) -> GenerateResponse {
        if let Err(errors) = params.validate() {
            return GenerateResponse::error(&validation_failure(&errors));
        }

        let generator = Arc::clone(&self.generator);
        let task = tokio::spawn(async move {
            generator
                .generate(&params.prompt, params.input_image.as_deref(), params.guidance_scale)
                .await
        });

        match task.await {
            Ok(Ok(output)) => GenerateResponse::Success {
                image: output.image_url,
                meta: output.meta,
            },
            Ok(Err(err)) => {
                warn!(error = %err, "flux_generate failed");
                GenerateResponse::error(&err)
            }
            Err(join_err) => {
                warn!(error = %join_err, "flux_generate task aborted");
                GenerateResponse::Error {
                    message: format!("Generation task aborted: {}", join_err),
                }
            }
        }
    }

    /// Handle a `flux_edit_image` call.
    #[instrument(level = "info", name = "handle_flux_edit_image", skip_all)]
    pub async fn edit_image(&self, params: FluxEditParams) -> EditResponse {
        if let Err(errors) = params.validate() {
            return EditResponse::error(&validation_failure(&errors));
        }

        let original_image = params.image_url.clone();
        let generator = Arc::clone(&self.generator);
        let task = tokio::spawn(async move {
            generator
                .edit_image(
                    &params.prompt,
                    &params.image_url,
                    params.aspect_ratio.as_deref(),
                    params.seed,
                    params.output_format,
                )
                .await
        });

        match task.await {
            Ok(Ok(output)) => EditResponse::Success {
                edited_image: output.image_url,
                original_image,
                meta: output.meta,
            },
            Ok(Err(err)) => {
                warn!(error = %err, "flux_edit_image failed");
                EditResponse::error(&err)
            }
            Err(join_err) => {
                warn!(error = %join_err, "flux_edit_image task aborted");
                EditResponse::Error {
                    message: format!("Edit task aborted: {}", join_err),
                }
            }
        }
    }
}
