//! Configuration for realty-extract.
//!
//! Settings come from an optional TOML (or JSON) file, then environment
//! overrides. The resolved [`Settings`] is handed to the pipeline; nothing
//! reads the environment after that.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::extract::{FlyerConfig, SectionConfig};
use crate::llm::EnrichmentConfig;
use crate::ocr::OcrConfig;
use crate::tables::StreamConfig;

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),
}

/// All pipeline settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub flyer: FlyerConfig,
    #[serde(default)]
    pub sections: SectionConfig,
    #[serde(default)]
    pub tables: StreamConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
}

impl Settings {
    /// Load settings from `path` if given, else defaults; env overrides applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let settings = match path {
            Some(path) => Self::load_from_path(path)?,
            None => Self::default(),
        };
        Ok(settings.with_env_overrides())
    }

    /// Parse a config file. `.json` files are read as JSON, anything else as TOML.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        debug!("loaded config from {}", path.display());

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(serde_json::from_str(&contents)?),
            _ => Ok(toml::from_str(&contents)?),
        }
    }

    /// Apply `OCR_*`, `GENAI_*`, `OPENAI_*`, and `VISION_MAX_PAGES` overrides.
    pub fn with_env_overrides(mut self) -> Self {
        self.ocr = self.ocr.with_env_overrides();
        self.enrichment = self.enrichment.with_env_overrides();
        self
    }
}
