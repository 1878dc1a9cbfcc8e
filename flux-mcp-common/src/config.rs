//! Configuration module for loading environment variables and settings.

use crate::error::ConfigError;
use crate::models::{DEFAULT_EDIT_MODEL, DEFAULT_GENERATE_MODEL, ModelRegistry};
use std::fmt;
use std::str::FromStr;

/// Default Black Forest Labs API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.bfl.ai";

/// Default aspect ratio sent with generation requests.
pub const DEFAULT_ASPECT_RATIO: &str = "16:9";

/// Largest safety tolerance the API accepts (most permissive).
pub const MAX_SAFETY_TOLERANCE: u8 = 6;

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Black Forest Labs API key. Tools report an error when absent.
    pub api_key: Option<String>,
    /// API base URL without a trailing slash
    pub base_url: String,
    /// Model used by `flux_generate`
    pub model: String,
    /// Model used by `flux_edit_image`
    pub edit_model: String,
    /// Aspect ratio; when `None`, `width` and `height` are sent instead
    pub aspect_ratio: Option<String>,
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Moderation tolerance, 0 (strict) to 6 (permissive)
    pub safety_tolerance: u8,
    /// Let the service rewrite prompts for more detail
    pub prompt_upsampling: bool,
    /// Request less processed, more natural-looking output
    pub raw_mode: bool,
    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Per-request read timeout in seconds
    pub read_timeout_secs: u64,
    /// Overall wait budget for a job in seconds
    pub poll_timeout_secs: u64,
    /// Submission attempts before giving up
    pub max_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_GENERATE_MODEL.to_string(),
            edit_model: DEFAULT_EDIT_MODEL.to_string(),
            aspect_ratio: Some(DEFAULT_ASPECT_RATIO.to_string()),
            width: 1024,
            height: 1024,
            safety_tolerance: MAX_SAFETY_TOLERANCE,
            prompt_upsampling: false,
            raw_mode: false,
            connect_timeout_secs: 10,
            read_timeout_secs: 120,
            poll_timeout_secs: 180,
            max_retries: 3,
        }
    }
}

// The API key must never reach logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("edit_model", &self.edit_model)
            .field("aspect_ratio", &self.aspect_ratio)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("safety_tolerance", &self.safety_tolerance)
            .field("prompt_upsampling", &self.prompt_upsampling)
            .field("raw_mode", &self.raw_mode)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("read_timeout_secs", &self.read_timeout_secs)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables and `.env` files.
    ///
    /// `.env.local` is read before `.env`; neither overrides variables that
    /// are already set in the process environment.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` if a variable is set but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Missing files are fine
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// Unset variables fall back to [`Config::default`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string());

        let api_key = get("BFL_API_KEY").filter(|k| !k.is_empty());

        let base_url = get("BFL_BASE_URL")
            .filter(|u| !u.is_empty())
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or(defaults.base_url);

        let model = get("FLUX_MODEL")
            .filter(|m| !m.is_empty())
            .map(|m| ModelRegistry::canonical_flux_id(&m))
            .unwrap_or(defaults.model);

        let edit_model = get("FLUX_EDIT_MODEL")
            .filter(|m| !m.is_empty())
            .map(|m| ModelRegistry::canonical_flux_id(&m))
            .unwrap_or(defaults.edit_model);

        // An explicitly empty value selects width/height
        let aspect_ratio = match get("FLUX_ASPECT_RATIO") {
            None => defaults.aspect_ratio,
            Some(ratio) if ratio.is_empty() => None,
            Some(ratio) => {
                if !is_valid_aspect_ratio(&ratio) {
                    return Err(ConfigError::invalid_value(
                        "FLUX_ASPECT_RATIO",
                        format!("'{}' is not of the form W:H", ratio),
                    ));
                }
                Some(ratio)
            }
        };

        let width = parse_var(&get, "FLUX_WIDTH", defaults.width)?;
        let height = parse_var(&get, "FLUX_HEIGHT", defaults.height)?;
        if width == 0 || height == 0 {
            return Err(ConfigError::invalid_value(
                "FLUX_WIDTH/FLUX_HEIGHT",
                "dimensions must be positive",
            ));
        }

        let safety_tolerance = parse_var(&get, "FLUX_SAFETY_TOLERANCE", defaults.safety_tolerance)?;
        if safety_tolerance > MAX_SAFETY_TOLERANCE {
            return Err(ConfigError::invalid_value(
                "FLUX_SAFETY_TOLERANCE",
                format!("must be between 0 and {}, got {}", MAX_SAFETY_TOLERANCE, safety_tolerance),
            ));
        }

        let prompt_upsampling = parse_bool(&get, "FLUX_PROMPT_UPSAMPLING", defaults.prompt_upsampling)?;
        let raw_mode = parse_bool(&get, "FLUX_RAW_MODE", defaults.raw_mode)?;

        let connect_timeout_secs =
            parse_var(&get, "FLUX_CONNECT_TIMEOUT_SECS", defaults.connect_timeout_secs)?;
        let read_timeout_secs = parse_var(&get, "FLUX_READ_TIMEOUT_SECS", defaults.read_timeout_secs)?;
        let poll_timeout_secs = parse_var(&get, "FLUX_POLL_TIMEOUT_SECS", defaults.poll_timeout_secs)?;

        let max_retries = parse_var(&get, "FLUX_MAX_RETRIES", defaults.max_retries)?;
        if max_retries == 0 {
            return Err(ConfigError::invalid_value("FLUX_MAX_RETRIES", "must be at least 1"));
        }

        Ok(Self {
            api_key,
            base_url,
            model,
            edit_model,
            aspect_ratio,
            width,
            height,
            safety_tolerance,
            prompt_upsampling,
            raw_mode,
            connect_timeout_secs,
            read_timeout_secs,
            poll_timeout_secs,
            max_retries,
        })
    }

    /// Whether an API key is available.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Check that `ratio` looks like `W:H` with two positive integers.
///
/// # Example
///
/// ```
/// use flux_mcp_common::config::is_valid_aspect_ratio;
///
/// assert!(is_valid_aspect_ratio("16:9"));
/// assert!(!is_valid_aspect_ratio("16x9"));
/// assert!(!is_valid_aspect_ratio("0:1"));
/// ```
pub fn is_valid_aspect_ratio(ratio: &str) -> bool {
    let Some((w, h)) = ratio.split_once(':') else {
        return false;
    };
    let positive = |s: &str| s.parse::<u32>().map(|n| n > 0).unwrap_or(false);
    positive(w) && positive(h)
}

fn parse_var<T, G>(get: &G, name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e| ConfigError::invalid_value(name, format!("'{}': {}", raw, e))),
    }
}

fn parse_bool<G>(get: &G, name: &str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(name).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(raw) => match raw.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::invalid_value(
                name,
                format!("'{}' is not a boolean", raw),
            )),
        },
    }
}
