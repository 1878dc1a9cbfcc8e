//! Model definitions and registry for the Flux model family.
//!
//! This module provides static model definitions and a registry for resolving
//! model names and aliases to their full definitions.

use serde::Serialize;

/// How a Flux model consumes its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// Pure text-to-image generation (optionally image-prompted).
    TextToImage,
    /// Image-conditioned editing; always requires an input image.
    Kontext,
}

/// Flux model definition.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FluxModel {
    /// Full model identifier, also the endpoint path segment
    pub id: &'static str,
    /// Model aliases for convenience
    #[serde(skip)]
    pub aliases: &'static [&'static str],
    /// Model family
    pub family: ModelFamily,
    /// Whether the model honours the `raw` flag
    pub supports_raw: bool,
    /// Whether the model accepts a `guidance_scale`
    pub supports_guidance: bool,
}

// =============================================================================
// Static Model Definitions
// =============================================================================

/// FLUX 1.1 [pro]
pub const FLUX_PRO_1_1: FluxModel = FluxModel {
    id: "flux-pro-1.1",
    aliases: &["flux-1.1-pro", "flux-pro-11", "pro-1.1"],
    family: ModelFamily::TextToImage,
    supports_raw: false,
    supports_guidance: false,
};

/// FLUX 1.1 [pro] Ultra
pub const FLUX_PRO_1_1_ULTRA: FluxModel = FluxModel {
    id: "flux-pro-1.1-ultra",
    aliases: &["flux-ultra", "flux-1.1-ultra", "ultra"],
    family: ModelFamily::TextToImage,
    supports_raw: true,
    supports_guidance: false,
};

/// FLUX.1 [pro]
pub const FLUX_PRO: FluxModel = FluxModel {
    id: "flux-pro",
    aliases: &["flux-1-pro", "flux.1-pro"],
    family: ModelFamily::TextToImage,
    supports_raw: false,
    supports_guidance: true,
};

/// FLUX.1 [dev]
pub const FLUX_DEV: FluxModel = FluxModel {
    id: "flux-dev",
    aliases: &["flux-1-dev", "flux.1-dev", "dev"],
    family: ModelFamily::TextToImage,
    supports_raw: false,
    supports_guidance: true,
};

/// FLUX.1 Kontext [pro]
pub const FLUX_KONTEXT_PRO: FluxModel = FluxModel {
    id: "flux-kontext-pro",
    aliases: &["kontext-pro", "kontext"],
    family: ModelFamily::Kontext,
    supports_raw: false,
    supports_guidance: false,
};

/// FLUX.1 Kontext [max]
pub const FLUX_KONTEXT_MAX: FluxModel = FluxModel {
    id: "flux-kontext-max",
    aliases: &["kontext-max"],
    family: ModelFamily::Kontext,
    supports_raw: false,
    supports_guidance: false,
};

/// All known Flux models
pub const FLUX_MODELS: &[FluxModel] = &[
    FLUX_PRO_1_1,
    FLUX_PRO_1_1_ULTRA,
    FLUX_PRO,
    FLUX_DEV,
    FLUX_KONTEXT_PRO,
    FLUX_KONTEXT_MAX,
];

/// Default model for text-to-image generation.
pub const DEFAULT_GENERATE_MODEL: &str = FLUX_PRO_1_1.id;

/// Default model for image-conditioned editing.
pub const DEFAULT_EDIT_MODEL: &str = FLUX_KONTEXT_PRO.id;

// =============================================================================
// Model Registry
// =============================================================================

/// Model registry for resolution and listing.
pub struct ModelRegistry;

impl ModelRegistry {
    /// Resolve a Flux model name or alias to full model definition.
    ///
    /// # Examples
    ///
    /// ```
    /// use flux_mcp_common::models::ModelRegistry;
    ///
    /// let model = ModelRegistry::resolve_flux("flux-pro-1.1");
    /// assert!(model.is_some());
    ///
    /// let model = ModelRegistry::resolve_flux("kontext");
    /// assert_eq!(model.unwrap().id, "flux-kontext-pro");
    /// ```
    pub fn resolve_flux(name: &str) -> Option<&'static FluxModel> {
        FLUX_MODELS
            .iter()
            .find(|model| model.id == name || model.aliases.contains(&name))
    }

    /// Canonical identifier for `name`.
    ///
    /// Unknown names are returned unchanged: the service adds models faster
    /// than this table is updated, and it reports unknown endpoints itself.
    pub fn canonical_flux_id(name: &str) -> String {
        Self::resolve_flux(name)
            .map(|m| m.id.to_string())
            .unwrap_or_else(|| name.to_string())
    }

    /// List all known Flux models.
    pub fn list_flux_models() -> &'static [FluxModel] {
        FLUX_MODELS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_flux_by_id() {
        let model = ModelRegistry::resolve_flux("flux-pro-1.1-ultra").unwrap();
        assert_eq!(model.id, "flux-pro-1.1-ultra");
        assert!(model.supports_raw);
    }

    #[test]
    fn test_resolve_flux_by_alias() {
        let model = ModelRegistry::resolve_flux("kontext-max").unwrap();
        assert_eq!(model.id, "flux-kontext-max");
        assert_eq!(model.family, ModelFamily::Kontext);
    }

    #[test]
    fn test_resolve_flux_unknown() {
        assert!(ModelRegistry::resolve_flux("imagen-3").is_none());
    }

    #[test]
    fn test_canonical_id_passes_unknown_through() {
        assert_eq!(ModelRegistry::canonical_flux_id("flux-2-preview"), "flux-2-preview");
        assert_eq!(ModelRegistry::canonical_flux_id("ultra"), "flux-pro-1.1-ultra");
    }

    #[test]
    fn test_defaults_are_registered() {
        let generate = ModelRegistry::resolve_flux(DEFAULT_GENERATE_MODEL).unwrap();
        assert_eq!(generate.family, ModelFamily::TextToImage);

        let edit = ModelRegistry::resolve_flux(DEFAULT_EDIT_MODEL).unwrap();
        assert_eq!(edit.family, ModelFamily::Kontext);
    }

    #[test]
    fn test_aliases_do_not_collide() {
        let mut seen = std::collections::HashSet::new();
        for model in ModelRegistry::list_flux_models() {
            assert!(seen.insert(model.id), "duplicate id {}", model.id);
            for alias in model.aliases {
                assert!(seen.insert(alias), "duplicate alias {}", alias);
            }
        }
    }
}
