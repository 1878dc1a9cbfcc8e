//! Flux MCP Image Server Library
//!
//! Image generation and editing through the Black Forest Labs Flux API,
//! exposed as MCP tools.

pub mod adapter;
pub mod handler;
pub mod image_input;
pub mod resources;
pub mod server;

pub use adapter::{AdapterConfig, FluxAdapter, GenerationMeta, GenerationOutput, ImageGenerator, OutputFormat};
pub use handler::{EditResponse, FluxEditParams, FluxGenerateParams, FluxHandler, GenerateResponse};
pub use server::FluxServer;
