//! Environment-driven configuration.
//!
//! `main` loads `.env` first, so values there behave like real env vars.

use std::env;
use std::path::PathBuf;

use crate::ai::{GEMINI_DEFAULT_BASE_URL, GEMINI_DEFAULT_MODEL};

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub bind: String,
    /// When set, the chat client goes through this server instead of Gemini.
    pub server_url: Option<String>,
    pub storage_dir: Option<PathBuf>,
    pub send_instructions: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: GEMINI_DEFAULT_MODEL.to_string(),
            gemini_base_url: GEMINI_DEFAULT_BASE_URL.to_string(),
            bind: DEFAULT_BIND.to_string(),
            server_url: None,
            storage_dir: None,
            send_instructions: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        Self {
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_base_url: get("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            bind: get("ORHEN_BIND").unwrap_or(defaults.bind),
            server_url: get("ORHEN_SERVER_URL"),
            storage_dir: get("ORHEN_STORAGE_DIR").map(PathBuf::from),
            send_instructions: get("ORHEN_SEND_INSTRUCTIONS")
                .map(|value| is_truthy(&value))
                .unwrap_or(false),
        }
    }
}

pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(config_from(&[]), AppConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("GEMINI_API_KEY", "secret"),
            ("ORHEN_BIND", "0.0.0.0:8080"),
            ("ORHEN_SERVER_URL", "http://localhost:3000"),
            ("ORHEN_SEND_INSTRUCTIONS", "Yes"),
        ]);
        assert_eq!(config.gemini_api_key.as_deref(), Some("secret"));
        assert_eq!(config.bind, "0.0.0.0:8080");
        assert_eq!(config.server_url.as_deref(), Some("http://localhost:3000"));
        assert!(config.send_instructions);
    }

    #[test]
    fn blank_key_counts_as_missing() {
        assert!(config_from(&[("GEMINI_API_KEY", "  ")]).gemini_api_key.is_none());
    }

    #[test]
    fn truthy_values() {
        for value in ["1", "true", "YES", "on"] {
            assert!(is_truthy(value));
        }
        assert!(!is_truthy("off"));
    }
}
