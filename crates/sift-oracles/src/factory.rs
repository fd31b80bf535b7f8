//! Oracle factory for creating oracle instances from configuration.
//!
//! This is the only place where provider API keys are read from the
//! environment.

use crate::coerce::LabelAliases;
use crate::{GeminiOracle, MockOracle, UniversalOracle};
use serde::{Deserialize, Serialize};
use sift_abstraction::{LabelOracle, LabelVocabulary, OracleFault};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error};

/// Oracle provider enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OracleProvider {
    /// Offline deterministic oracle.
    Mock,
    /// Google Gemini.
    Gemini,
    /// Any OpenAI-compatible Chat Completions server.
    #[serde(alias = "universal", alias = "openai")]
    OpenaiCompatible,
}

impl fmt::Display for OracleProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mock => "mock",
            Self::Gemini => "gemini",
            Self::OpenaiCompatible => "openai-compatible",
        })
    }
}

impl FromStr for OracleProvider {
    type Err = OracleFault;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "gemini" => Ok(Self::Gemini),
            "openai-compatible" | "universal" | "openai" => Ok(Self::OpenaiCompatible),
            other => {
                error!(provider = %other, "Unrecognized oracle provider");
                Err(OracleFault::Configuration(format!("Unrecognized oracle provider: {}", other)))
            }
        }
    }
}

fn default_provider() -> OracleProvider {
    OracleProvider::Gemini
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_output_tokens() -> u32 {
    60_000
}

/// The `[oracle]` configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Which provider to use.
    #[serde(default = "default_provider")]
    pub provider: OracleProvider,
    /// Provider model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Inline API key; takes precedence over `api_key_env`.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Endpoint override. Required for `openai-compatible`.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Output token budget per call.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Spelling corrections applied to responses before validation.
    #[serde(default)]
    pub aliases: LabelAliases,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            api_key: None,
            base_url: None,
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            aliases: LabelAliases::default(),
        }
    }
}

impl OracleConfig {
    /// Creates a config for `provider` with default settings.
    #[must_use]
    pub fn new(provider: OracleProvider, model: impl Into<String>) -> Self {
        Self { provider, model: model.into(), ..Self::default() }
    }

    /// Sets an explicit API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Returns the API key from the config or the configured environment variable.
    #[allow(clippy::disallowed_methods)] // env::var is needed for API key loading
    fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| env::var(&self.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// Factory for creating oracle instances.
pub struct OracleFactory;

impl OracleFactory {
    /// Creates an oracle from configuration.
    ///
    /// # Errors
    /// Returns `OracleFault::Configuration` if a required API key or base URL
    /// is missing.
    pub fn create(
        config: &OracleConfig,
        vocabulary: &LabelVocabulary,
    ) -> Result<Arc<dyn LabelOracle>, OracleFault> {
        debug!(provider = %config.provider, model = %config.model, "Creating oracle instance");

        match config.provider {
            OracleProvider::Mock => Ok(Arc::new(MockOracle::new(config.model.clone()))),
            OracleProvider::Gemini => {
                let api_key = config.resolve_api_key().ok_or_else(|| {
                    OracleFault::Configuration(format!(
                        "{} environment variable not set",
                        config.api_key_env
                    ))
                })?;
                let mut oracle =
                    GeminiOracle::with_api_key(config.model.clone(), api_key, vocabulary.clone())
                        .with_aliases(config.aliases.clone())
                        .with_generation(config.temperature, config.max_output_tokens);
                if let Some(base_url) = &config.base_url {
                    oracle = oracle.with_base_url(base_url.clone());
                }
                Ok(Arc::new(oracle))
            }
            OracleProvider::OpenaiCompatible => {
                let base_url = config.base_url.clone().ok_or_else(|| {
                    OracleFault::Configuration(
                        "base_url is required for the openai-compatible provider".to_string(),
                    )
                })?;
                let oracle = UniversalOracle::new(
                    config.model.clone(),
                    base_url,
                    config.resolve_api_key(),
                    vocabulary.clone(),
                )
                .with_aliases(config.aliases.clone())
                .with_generation(config.temperature, config.max_output_tokens);
                Ok(Arc::new(oracle))
            }
        }
    }
}
