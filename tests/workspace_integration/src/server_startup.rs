//! Server startup integration tests.
//!
//! The server must come up and advertise its tools and resources even
//! without an API key; the key is only needed once a tool runs.

use flux_mcp_common::Config;

/// Configuration as a fresh install would load it, with no API key.
pub fn test_config() -> Config {
    Config::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flux_mcp_image::{FluxServer, resources, server};
    use rmcp::ServerHandler;

    #[test]
    fn test_flux_server_startup_without_api_key() {
        let server = FluxServer::new(test_config());
        let info = server.get_info();

        let instructions = info.instructions.as_ref().unwrap().to_lowercase();
        assert!(instructions.contains("flux"), "Server instructions should mention 'flux'");
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.resources.is_some());
    }

    #[test]
    fn test_server_registers_both_tools() {
        let tools = server::tools();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_ref()).collect();
        assert_eq!(names, vec!["flux_generate", "flux_edit_image"]);
    }

    #[test]
    fn test_server_clone_shares_config() {
        let config = Config {
            model: "flux-pro-1.1-ultra".to_string(),
            ..test_config()
        };
        let server = FluxServer::new(config);
        let cloned = server.clone();
        assert_eq!(cloned.config().model, "flux-pro-1.1-ultra");
    }

    #[test]
    fn test_resources_render_for_default_config() {
        let config = test_config();

        let models: serde_json::Value = serde_json::from_str(&resources::models_resource_json(&config)).unwrap();
        assert!(models.as_array().is_some_and(|m| !m.is_empty()));

        let settings: serde_json::Value = serde_json::from_str(&resources::settings_resource_json(&config)).unwrap();
        assert_eq!(settings["base_url"], "https://api.bfl.ai");
        assert_eq!(settings["api_key_configured"], false);
    }
}
