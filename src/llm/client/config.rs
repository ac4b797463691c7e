//! Enrichment configuration.

use serde::{Deserialize, Serialize};

/// Which kind of completion call enrichment makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnrichmentProvider {
    /// Full text in, strict JSON object out.
    #[serde(rename = "openai")]
    Text,
    /// First pages as images in, strict JSON object out.
    #[serde(rename = "openai_vision")]
    Vision,
    /// Full text in, output constrained by the JSON schema.
    #[serde(rename = "lc", alias = "langchain", alias = "structured")]
    Structured,
}

impl EnrichmentProvider {
    /// Parse a provider name. Unknown names disable enrichment.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Some(Self::Text),
            "openai_vision" => Some(Self::Vision),
            "lc" | "langchain" | "structured" => Some(Self::Structured),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "openai",
            Self::Vision => "openai_vision",
            Self::Structured => "lc",
        }
    }
}

/// Configuration for the enrichment step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Provider mode; `None` disables enrichment
    #[serde(default)]
    pub provider: Option<EnrichmentProvider>,
    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,
    /// OpenAI-compatible API base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// API key sent as a bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Pages rendered for vision mode
    #[serde(default = "default_vision_max_pages")]
    pub vision_max_pages: usize,
    /// Render resolution for vision mode
    #[serde(default = "default_vision_dpi")]
    pub vision_dpi: u32,
    /// Maximum characters of document text sent
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Bound on the whole completion call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_endpoint() -> String {
    "https://api.openai.com".to_string()
}

fn default_vision_max_pages() -> usize {
    3
}

fn default_vision_dpi() -> u32 {
    220
}

fn default_max_content_chars() -> usize {
    120_000
}

fn default_temperature() -> f32 {
    0.2
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            provider: None,
            model: default_model(),
            endpoint: default_endpoint(),
            api_key: None,
            vision_max_pages: default_vision_max_pages(),
            vision_dpi: default_vision_dpi(),
            max_content_chars: default_max_content_chars(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EnrichmentConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub fn with_provider(mut self, provider: EnrichmentProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `GENAI_PROVIDER`: "openai", "openai_vision", "lc"/"langchain"; anything else disables
    /// - `OPENAI_MODEL`: Model name
    /// - `OPENAI_API_KEY`: API key
    /// - `OPENAI_BASE_URL`: API base URL
    /// - `VISION_MAX_PAGES`: Pages sent in vision mode
    /// - `GENAI_TIMEOUT_SECS`: Completion timeout
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(val) = lookup("GENAI_PROVIDER") {
            self.provider = EnrichmentProvider::from_str(&val);
        }
        if let Some(val) = lookup("OPENAI_MODEL") {
            self.model = val;
        }
        if let Some(val) = lookup("OPENAI_API_KEY") {
            self.api_key = Some(val);
        }
        if let Some(val) = lookup("OPENAI_BASE_URL") {
            self.endpoint = val.trim_end_matches('/').trim_end_matches("/v1").to_string();
        }
        if let Some(val) = lookup("VISION_MAX_PAGES") {
            if let Ok(n) = val.parse() {
                self.vision_max_pages = n;
            }
        }
        if let Some(val) = lookup("GENAI_TIMEOUT_SECS") {
            if let Ok(n) = val.parse() {
                self.timeout_secs = n;
            }
        }
        self
    }
}
