//! Pack configuration
//!
//! Directories and remote endpoint settings shared by all nodes. Hosts build
//! one `PowerpackConfig` at startup (usually via [`PowerpackConfig::from_env`])
//! and hand it to [`crate::setup_extensions`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default values
pub mod defaults {
    /// Base output root for saved images
    pub const OUTPUT_DIR: &str = "output";
    /// Root of the model folders (`loras/`, `unet/`)
    pub const MODELS_DIR: &str = "models";
    /// Directory holding resolution preset files
    pub const PRESETS_DIR: &str = "presets";
    /// Remote text-generation base URL
    pub const API_BASE_URL: &str = "https://api.openai.com";
    /// Environment variable consulted for the API key
    pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
}

/// Environment variables read by [`PowerpackConfig::from_env`]
pub mod env_vars {
    pub const OUTPUT_DIR: &str = "POWERPACK_OUTPUT_DIR";
    pub const MODELS_DIR: &str = "POWERPACK_MODELS_DIR";
    pub const PRESETS_DIR: &str = "POWERPACK_PRESETS_DIR";
    pub const API_BASE_URL: &str = "POWERPACK_API_BASE_URL";
    pub const API_KEY_ENV: &str = "POWERPACK_API_KEY_ENV";
}

/// Configuration for the node pack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerpackConfig {
    /// Sandbox root: every saved file lands below this directory
    pub output_dir: PathBuf,
    /// Root of the model asset folders
    pub models_dir: PathBuf,
    /// Directory scanned for `*.json` resolution presets
    pub presets_dir: PathBuf,
    /// Base URL of the text-generation API (no trailing path)
    pub api_base_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
}

impl Default for PowerpackConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(defaults::OUTPUT_DIR),
            models_dir: PathBuf::from(defaults::MODELS_DIR),
            presets_dir: PathBuf::from(defaults::PRESETS_DIR),
            api_base_url: defaults::API_BASE_URL.to_string(),
            api_key_env: defaults::API_KEY_ENV.to_string(),
        }
    }
}

impl PowerpackConfig {
    /// Defaults overridden by `POWERPACK_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    ///
    /// Blank values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();
        if let Some(v) = get(env_vars::OUTPUT_DIR) {
            config.output_dir = PathBuf::from(v);
        }
        if let Some(v) = get(env_vars::MODELS_DIR) {
            config.models_dir = PathBuf::from(v);
        }
        if let Some(v) = get(env_vars::PRESETS_DIR) {
            config.presets_dir = PathBuf::from(v);
        }
        if let Some(v) = get(env_vars::API_BASE_URL) {
            config.api_base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = get(env_vars::API_KEY_ENV) {
            config.api_key_env = v;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = PowerpackConfig::default();
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_lookup_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (env_vars::OUTPUT_DIR, "/srv/comfy/output"),
            (env_vars::API_BASE_URL, "http://localhost:9000/"),
            (env_vars::PRESETS_DIR, "   "),
        ]);
        let config = PowerpackConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.output_dir, PathBuf::from("/srv/comfy/output"));
        assert_eq!(config.api_base_url, "http://localhost:9000");
        assert_eq!(config.presets_dir, PathBuf::from("presets"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PowerpackConfig =
            serde_json::from_str(r#"{"models_dir": "/models"}"#).unwrap();
        assert_eq!(config.models_dir, PathBuf::from("/models"));
        assert_eq!(config.output_dir, PathBuf::from("output"));
    }
}
