//! MCP Resources for the Flux server.
//!
//! - `flux://models` - Known Flux models and their capabilities
//! - `flux://settings` - Effective generation defaults (API key redacted)

use flux_mcp_common::config::Config;
use flux_mcp_common::models::{FLUX_MODELS, ModelFamily};
use serde::Serialize;

/// URI of the models resource.
pub const MODELS_URI: &str = "flux://models";

/// URI of the settings resource.
pub const SETTINGS_URI: &str = "flux://settings";

/// Information about a known Flux model.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    /// Model identifier, also the endpoint path segment
    pub id: &'static str,
    /// Accepted aliases
    pub aliases: Vec<&'static str>,
    /// Model family
    pub family: ModelFamily,
    /// Whether the `raw` flag has an effect
    pub supports_raw: bool,
    /// Whether `guidance_scale` is accepted
    pub supports_guidance: bool,
    /// Whether this is the configured generate or edit model
    pub is_configured: bool,
}

/// Effective settings, as the adapter will use them.
#[derive(Debug, Clone, Serialize)]
pub struct SettingsInfo {
    pub base_url: String,
    pub model: String,
    pub edit_model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub safety_tolerance: u8,
    pub prompt_upsampling: bool,
    pub raw_mode: bool,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub poll_timeout_secs: u64,
    pub max_retries: u32,
    pub api_key_configured: bool,
}

/// List all known Flux models.
pub fn list_models(config: &Config) -> Vec<ModelInfo> {
    FLUX_MODELS
        .iter()
        .map(|m| ModelInfo {
            id: m.id,
            aliases: m.aliases.to_vec(),
            family: m.family,
            supports_raw: m.supports_raw,
            supports_guidance: m.supports_guidance,
            is_configured: m.id == config.model || m.id == config.edit_model,
        })
        .collect()
}

/// Summarize the effective settings. Only the presence of the API key is reported.
pub fn settings(config: &Config) -> SettingsInfo {
    let aspect_ratio = config.aspect_ratio.clone().filter(|r| !r.is_empty());
    let (width, height) = match aspect_ratio {
        Some(_) => (None, None),
        None => (Some(config.width), Some(config.height)),
    };

    SettingsInfo {
        base_url: config.base_url.clone(),
        model: config.model.clone(),
        edit_model: config.edit_model.clone(),
        aspect_ratio,
        width,
        height,
        safety_tolerance: config.safety_tolerance,
        prompt_upsampling: config.prompt_upsampling,
        raw_mode: config.raw_mode,
        connect_timeout_secs: config.connect_timeout_secs,
        read_timeout_secs: config.read_timeout_secs,
        poll_timeout_secs: config.poll_timeout_secs,
        max_retries: config.max_retries,
        api_key_configured: config.has_api_key(),
    }
}

/// Get models resource as JSON string.
pub fn models_resource_json(config: &Config) -> String {
    serde_json::to_string_pretty(&list_models(config)).unwrap_or_else(|_| "[]".to_string())
}

/// Get settings resource as JSON string.
pub fn settings_resource_json(config: &Config) -> String {
    serde_json::to_string_pretty(&settings(config)).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_models_marks_configured() {
        let models = list_models(&Config::default());
        assert_eq!(models.len(), FLUX_MODELS.len());

        let configured: Vec<&str> = models.iter().filter(|m| m.is_configured).map(|m| m.id).collect();
        assert_eq!(configured, vec!["flux-pro-1.1", "flux-kontext-pro"]);
    }

    #[test]
    fn test_models_resource_json_is_valid() {
        let json: serde_json::Value = serde_json::from_str(&models_resource_json(&Config::default())).unwrap();
        let models = json.as_array().unwrap();
        assert!(models.iter().any(|m| m["family"] == "kontext"));
    }

    #[test]
    fn test_settings_never_leak_api_key() {
        let config = Config {
            api_key: Some("sk-super-secret".to_string()),
            ..Config::default()
        };
        let json = settings_resource_json(&config);
        assert!(!json.contains("sk-super-secret"));

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["api_key_configured"], true);
        assert_eq!(value["aspect_ratio"], "16:9");
        assert!(value.get("width").is_none());
    }

    #[test]
    fn test_settings_report_dimensions_without_ratio() {
        let config = Config {
            aspect_ratio: None,
            width: 800,
            height: 600,
            ..Config::default()
        };
        let value = serde_json::to_value(settings(&config)).unwrap();
        assert_eq!(value["width"], 800);
        assert_eq!(value["height"], 600);
        assert!(value.get("aspect_ratio").is_none());
        assert_eq!(value["api_key_configured"], false);
    }
}
