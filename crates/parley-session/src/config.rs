//! Session configuration loading from file and environment variables.

use parley_types::Direction;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Top-level configuration for one translation session.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Translation direction, e.g. `"ru-en"`.
    #[serde(default)]
    pub direction: Direction,

    /// Number of recent transcripts that must agree for a word to count
    /// as stable. The empirically useful value is 2; exposed as
    /// configuration because it is a tuning parameter, not a structural
    /// one.
    #[serde(default = "default_stability_window")]
    pub stability_window: usize,

    /// Trailing tokens excluded from the stable prefix beyond the common
    /// prefix, guarding against a token that is about to be revised.
    #[serde(default)]
    pub stability_guard_tokens: usize,

    /// Minimum number of newly stabilized words before a translation
    /// request is issued and its delta dispatched.
    #[serde(default = "default_min_words_before_dispatch")]
    pub min_words_before_dispatch: usize,

    /// Inactivity duration that forces an utterance boundary.
    #[serde(default = "default_silence_reset_ms")]
    pub silence_reset_ms: u64,

    /// Translation collaborator settings.
    #[serde(default)]
    pub translator: TranslatorConfig,
}

/// Settings for the LLM translation collaborator.
#[derive(Clone, Deserialize)]
pub struct TranslatorConfig {
    /// Base URL of the OpenAI-compatible chat completions API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// API key. Never serialized or logged.
    #[serde(default)]
    pub api_key: String,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Completion token cap per request.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl fmt::Debug for TranslatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslatorConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .field("timeout_ms", &self.timeout_ms)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

fn default_stability_window() -> usize {
    2
}

fn default_min_words_before_dispatch() -> usize {
    2
}

fn default_silence_reset_ms() -> u64 {
    1500
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_model() -> String {
    "google/gemini-2.0-flash-001".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_tokens() -> u32 {
    200
}

fn default_temperature() -> f32 {
    0.3
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            direction: Direction::default(),
            stability_window: default_stability_window(),
            stability_guard_tokens: 0,
            min_words_before_dispatch: default_min_words_before_dispatch(),
            silence_reset_ms: default_silence_reset_ms(),
            translator: TranslatorConfig::default(),
        }
    }
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: String::new(),
            timeout_ms: default_timeout_ms(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `PARLEY_DIRECTION` overrides `direction` (e.g. `"en-ru"`)
/// - `PARLEY_OPENROUTER_API_KEY` overrides `translator.api_key`
/// - `PARLEY_MODEL` overrides `translator.model`
/// - `PARLEY_SILENCE_RESET_MS` overrides `silence_reset_ms`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<SessionConfig, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                SessionConfig::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => SessionConfig::default(),
    };

    // Environment variable overrides
    if let Ok(direction) = std::env::var("PARLEY_DIRECTION") {
        if let Ok(parsed) = direction.parse() {
            config.direction = parsed;
        }
    }
    if let Ok(key) = std::env::var("PARLEY_OPENROUTER_API_KEY") {
        config.translator.api_key = key;
    }
    if let Ok(model) = std::env::var("PARLEY_MODEL") {
        config.translator.model = model;
    }
    if let Ok(ms) = std::env::var("PARLEY_SILENCE_RESET_MS") {
        if let Ok(parsed) = ms.parse() {
            config.silence_reset_ms = parsed;
        }
    }

    Ok(config)
}
