//! Flux MCP Image Server
//!
//! MCP server for image generation and editing using Black Forest Labs Flux.

use anyhow::Result;
use clap::Parser;
use flux_mcp_common::{Config, McpServerBuilder, TransportArgs, tracing::init_tracing};
use flux_mcp_image::{FluxServer, resources, server};

/// Command-line arguments for the Flux server.
#[derive(Parser, Debug)]
#[command(name = "flux-mcp-image")]
#[command(about = "MCP server for image generation using Black Forest Labs Flux")]
struct Args {
    /// Transport configuration
    #[command(flatten)]
    transport: TransportArgs,

    /// Print configuration status and the tool list, then exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();

    let config = Config::from_env()?;
    tracing::info!(
        model = %config.model,
        edit_model = %config.edit_model,
        base_url = %config.base_url,
        api_key_configured = config.has_api_key(),
        "Configuration loaded"
    );
    if !config.has_api_key() {
        tracing::warn!("BFL_API_KEY not set; tool calls will fail until it is configured");
    }

    if args.check {
        print_check(&config);
        return Ok(());
    }

    let server = FluxServer::new(config);

    let transport = args.transport.into_transport();
    McpServerBuilder::new(server).with_transport(transport).run().await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Report configuration and tools on stdout.
fn print_check(config: &Config) {
    let tools = server::tools();
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_ref()).collect();

    println!("{}", resources::settings_resource_json(config));
    println!("tools: {}", names.join(", "));
    if config.has_api_key() {
        println!("status: ready");
    } else {
        println!("status: BFL_API_KEY not set");
    }
}
