//! MCP Server implementation for the Flux server.
//!
//! This module provides the MCP server handler that exposes:
//! - `flux_generate` tool for text-to-image generation
//! - `flux_edit_image` tool for image editing with Kontext models
//! - Resources for models and effective settings

use crate::adapter::ImageGenerator;
use crate::handler::{EditResponse, FluxEditParams, FluxGenerateParams, FluxHandler, GenerateResponse};
use crate::resources;
use flux_mcp_common::config::Config;
use flux_mcp_common::error::Error;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    model::{
        CallToolResult, Content, ListResourcesResult, ReadResourceResult, ResourceContents, ServerCapabilities,
        ServerInfo, Tool,
    },
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Name of the generation tool.
pub const GENERATE_TOOL: &str = "flux_generate";

/// Name of the edit tool.
pub const EDIT_TOOL: &str = "flux_edit_image";

/// MCP Server for Flux image generation.
#[derive(Clone)]
pub struct FluxServer {
    /// Handler, built on first tool use
    handler: Arc<RwLock<Option<FluxHandler>>>,
    /// Server configuration
    config: Config,
}

impl FluxServer {
    /// Create a new FluxServer with the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            handler: Arc::new(RwLock::new(None)),
            config,
        }
    }

    /// Create a server whose tools run against `generator` (for testing).
    pub fn with_generator(config: Config, generator: Arc<dyn ImageGenerator>) -> Self {
        Self {
            handler: Arc::new(RwLock::new(Some(FluxHandler::with_generator(generator)))),
            config,
        }
    }

    /// The server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the handler, building it on first use.
    async fn ensure_handler(&self) -> Result<FluxHandler, Error> {
        if let Some(handler) = self.handler.read().await.as_ref() {
            return Ok(handler.clone());
        }

        let mut slot = self.handler.write().await;
        if let Some(handler) = slot.as_ref() {
            return Ok(handler.clone());
        }
        let handler = FluxHandler::new(&self.config)?;
        *slot = Some(handler.clone());
        Ok(handler)
    }

    /// Generate an image from a text prompt.
    pub async fn generate(&self, params: FluxGenerateParams) -> Result<CallToolResult, McpError> {
        info!(prompt_len = params.prompt.len(), has_input_image = params.input_image.is_some(), "Generating image");

        let response = match self.ensure_handler().await {
            Ok(handler) => handler.generate(params).await,
            Err(e) => GenerateResponse::error(&e),
        };

        let success = response.is_success();
        tool_result(&response, success)
    }

    /// Edit an existing image.
    pub async fn edit_image(&self, params: FluxEditParams) -> Result<CallToolResult, McpError> {
        info!(prompt_len = params.prompt.len(), output_format = %params.output_format, "Editing image");

        let response = match self.ensure_handler().await {
            Ok(handler) => handler.edit_image(params).await,
            Err(e) => EditResponse::error(&e),
        };

        let success = response.is_success();
        tool_result(&response, success)
    }
}

/// Serialize a tool response as JSON text, flagging failures with `is_error`.
fn tool_result<T: Serialize>(response: &T, success: bool) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(response)
        .map_err(|e| McpError::internal_error(format!("Failed to serialize response: {}", e), None))?;

    if success {
        Ok(CallToolResult::success(vec![Content::text(text)]))
    } else {
        Ok(CallToolResult::error(vec![Content::text(text)]))
    }
}

fn parse_arguments<T: DeserializeOwned>(
    arguments: Option<serde_json::Map<String, serde_json::Value>>,
) -> Result<T, McpError> {
    arguments
        .map(|args| serde_json::from_value(serde_json::Value::Object(args)))
        .transpose()
        .map_err(|e| McpError::invalid_params(format!("Invalid parameters: {}", e), None))?
        .ok_or_else(|| McpError::invalid_params("Missing parameters", None))
}

fn input_schema<T: schemars::JsonSchema>() -> Arc<serde_json::Map<String, serde_json::Value>> {
    let schema = schemars::schema_for!(T);
    match serde_json::to_value(&schema).unwrap_or_default() {
        serde_json::Value::Object(map) => Arc::new(map),
        _ => Arc::new(serde_json::Map::new()),
    }
}

/// Tool definitions advertised by the server.
pub fn tools() -> Vec<Tool> {
    vec![
        Tool {
            name: Cow::Borrowed(GENERATE_TOOL),
            description: Some(Cow::Borrowed(
                "Generate an image from a text prompt using Black Forest Labs Flux. \
                 Optionally condition on an input image (URL, data URL, or local path). \
                 Returns JSON with the image URL and generation metadata.",
            )),
            input_schema: input_schema::<FluxGenerateParams>(),
            annotations: None,
            icons: None,
            meta: None,
            output_schema: None,
            title: None,
        },
        Tool {
            name: Cow::Borrowed(EDIT_TOOL),
            description: Some(Cow::Borrowed(
                "Edit an existing image with a Flux Kontext model. \
                 The image may be an http(s) URL, a data URL, or a local file path. \
                 Returns JSON with the edited image URL, the original reference, and metadata.",
            )),
            input_schema: input_schema::<FluxEditParams>(),
            annotations: None,
            icons: None,
            meta: None,
            output_schema: None,
            title: None,
        },
    ]
}

impl ServerHandler for FluxServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Image generation server using Black Forest Labs Flux. \
                 Use flux_generate to create images from text prompts, \
                 and flux_edit_image to edit an existing image with a text instruction."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().enable_resources().build(),
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _params: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<rmcp::model::ListToolsResult, McpError>> + Send + '_ {
        async move {
            Ok(rmcp::model::ListToolsResult {
                tools: tools(),
                next_cursor: None,
                meta: None,
            })
        }
    }

    fn call_tool(
        &self,
        params: rmcp::model::CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            match params.name.as_ref() {
                GENERATE_TOOL => self.generate(parse_arguments(params.arguments)?).await,
                EDIT_TOOL => self.edit_image(parse_arguments(params.arguments)?).await,
                _ => Err(McpError::invalid_params(format!("Unknown tool: {}", params.name), None)),
            }
        }
    }

    fn list_resources(
        &self,
        _params: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        async move {
            debug!("Listing resources");

            let models_resource = rmcp::model::Resource {
                raw: rmcp::model::RawResource {
                    uri: resources::MODELS_URI.to_string(),
                    name: "Flux Models".to_string(),
                    title: None,
                    description: Some("Known Flux models, their aliases and capabilities".to_string()),
                    mime_type: Some("application/json".to_string()),
                    size: None,
                    icons: None,
                    meta: None,
                },
                annotations: None,
            };

            let settings_resource = rmcp::model::Resource {
                raw: rmcp::model::RawResource {
                    uri: resources::SETTINGS_URI.to_string(),
                    name: "Generation Settings".to_string(),
                    title: None,
                    description: Some("Effective generation defaults; the API key is never included".to_string()),
                    mime_type: Some("application/json".to_string()),
                    size: None,
                    icons: None,
                    meta: None,
                },
                annotations: None,
            };

            Ok(ListResourcesResult {
                resources: vec![models_resource, settings_resource],
                next_cursor: None,
                meta: None,
            })
        }
    }

    fn read_resource(
        &self,
        params: rmcp::model::ReadResourceRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        async move {
            let uri = &params.uri;
            debug!(uri = %uri, "Reading resource");

            let content = match uri.as_str() {
                resources::MODELS_URI => resources::models_resource_json(&self.config),
                resources::SETTINGS_URI => resources::settings_resource_json(&self.config),
                _ => {
                    return Err(McpError::resource_not_found(format!("Unknown resource: {}", uri), None));
                }
            };

            Ok(ReadResourceResult {
                contents: vec![ResourceContents::text(content, uri.clone())],
            })
        }
    }
}
