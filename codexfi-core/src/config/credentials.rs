//! Credential resolution and provider selection.
//!
//! Each credential resolves env var first, then the plugin config file,
//! then empty. An empty credential is not an error here; the component
//! that needs it fails with `MissingCredentials` at call time.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Which LLM family handles extraction first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionProvider {
    #[default]
    Openai,
    Anthropic,
    Google,
}

impl ExtractionProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::Anthropic => "anthropic",
            Self::Google => "google",
        }
    }

    /// All providers, in fallback declaration order.
    pub fn all() -> [ExtractionProvider; 3] {
        [Self::Openai, Self::Anthropic, Self::Google]
    }

    /// Parse a configured name; anything unrecognized falls back to the
    /// default with a warning.
    pub fn parse_or_default(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" => Self::default(),
            "openai" => Self::Openai,
            "anthropic" => Self::Anthropic,
            "google" | "gemini" => Self::Google,
            other => {
                warn!(provider = other, "unknown extraction provider, using default");
                Self::default()
            }
        }
    }
}

/// Optional `config.json` in the data directory.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    voyage_api_key: String,
    #[serde(default)]
    openai_api_key: String,
    #[serde(default)]
    anthropic_api_key: String,
    #[serde(default)]
    gemini_api_key: String,
    #[serde(default)]
    extraction_provider: String,
}

/// Resolved credentials, passed explicitly to the components that need them.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub voyage_api_key: String,
    pub openai_api_key: String,
    pub anthropic_api_key: String,
    pub gemini_api_key: String,
    pub extraction_provider: ExtractionProvider,
}

impl Credentials {
    /// Resolve from the environment, then `config.json` under `data_dir`.
    pub fn resolve(data_dir: &Path) -> Self {
        let file = Self::read_config_file(data_dir);

        let provider_raw = env_or("CODEXFI_EXTRACTION_PROVIDER", &file.extraction_provider);
        Self {
            voyage_api_key: env_or("VOYAGE_API_KEY", &file.voyage_api_key),
            openai_api_key: env_or("OPENAI_API_KEY", &file.openai_api_key),
            anthropic_api_key: env_or("ANTHROPIC_API_KEY", &file.anthropic_api_key),
            gemini_api_key: env_or("GEMINI_API_KEY", &file.gemini_api_key),
            extraction_provider: ExtractionProvider::parse_or_default(&provider_raw),
        }
    }

    fn read_config_file(data_dir: &Path) -> ConfigFile {
        let path = data_dir.join("config.json");
        match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "unparseable config file, ignoring");
                ConfigFile::default()
            }),
            Err(_) => ConfigFile::default(),
        }
    }
}

fn env_or(var: &str, fallback: &str) -> String {
    match std::env::var(var) {
        Ok(v) if !v.is_empty() => v,
        _ => fallback.to_string(),
    }
}

/// Data directory: `$CODEXFI_DATA_DIR`, else `~/.codexfi`.
pub fn data_dir() -> std::path::PathBuf {
    if let Ok(dir) = std::env::var("CODEXFI_DATA_DIR") {
        if !dir.is_empty() {
            return std::path::PathBuf::from(dir);
        }
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".codexfi")
}
