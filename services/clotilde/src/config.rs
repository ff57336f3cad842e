//! Application Configuration Module
//!
//! Loads settings from environment variables (and an optional `.env` file)
//! into a single struct. Command-line flags are layered on top afterwards.

use crate::cli::Cli;
use crate::voice::SpeechBackend;
use clotilde_core::wikipedia::DEFAULT_TIMEOUT;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

pub const DEFAULT_RATE: f32 = 0.9;
pub const DEFAULT_LANGUAGE: &str = "en";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Explicitly chosen voice; `None` means the backend's default.
    pub voice: Option<String>,
    pub rate: f32,
    pub backend: SpeechBackend,
    pub jokes_path: Option<PathBuf>,
    pub wikipedia_language: String,
    pub wikipedia_base_url: Option<String>,
    pub http_timeout: Duration,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `CLOTILDE_SPEECH_BACKEND`: "say", "espeak" or "text". Defaults to the platform's program.
    // *   `CLOTILDE_VOICE`: Voice name for the backend. Defaults to the backend's stock voice.
    // *   `CLOTILDE_RATE`: Speed multiplier. Defaults to 0.9.
    // *   `CLOTILDE_JOKES_PATH`: (Optional) JSON joke corpus replacing the bundled one.
    // *   `WIKIPEDIA_LANGUAGE`: Wikipedia edition. Defaults to "en".
    // *   `WIKIPEDIA_BASE_URL`: (Optional) Overrides the edition URL entirely.
    // *   `HTTP_TIMEOUT_SECS`: Per-request timeout. Defaults to 10.
    // *   `RUST_LOG`: Logging level. Defaults to "WARN" so logs stay out of the conversation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let backend = match env::var("CLOTILDE_SPEECH_BACKEND") {
            Ok(value) => value.parse::<SpeechBackend>().map_err(|e| {
                ConfigError::InvalidValue("CLOTILDE_SPEECH_BACKEND".to_string(), e)
            })?,
            Err(_) => SpeechBackend::platform_default(),
        };

        let voice = env::var("CLOTILDE_VOICE").ok();

        let rate = match env::var("CLOTILDE_RATE") {
            Ok(value) => parse_rate(&value)
                .map_err(|e| ConfigError::InvalidValue("CLOTILDE_RATE".to_string(), e))?,
            Err(_) => DEFAULT_RATE,
        };

        let jokes_path = env::var("CLOTILDE_JOKES_PATH").ok().map(PathBuf::from);

        let wikipedia_language =
            env::var("WIKIPEDIA_LANGUAGE").unwrap_or_else(|_| DEFAULT_LANGUAGE.to_string());
        let wikipedia_base_url = env::var("WIKIPEDIA_BASE_URL").ok();

        let timeout_str =
            env::var("HTTP_TIMEOUT_SECS").unwrap_or_else(|_| DEFAULT_TIMEOUT.as_secs().to_string());
        let timeout_secs = timeout_str.parse::<u64>().map_err(|_| {
            ConfigError::InvalidValue(
                "HTTP_TIMEOUT_SECS".to_string(),
                format!("'{}' is not a number of seconds", timeout_str),
            )
        })?;

        let log_level_str = env::var("RUST_LOG").unwrap_or_else(|_| "WARN".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            voice,
            rate,
            backend,
            jokes_path,
            wikipedia_language,
            wikipedia_base_url,
            http_timeout: Duration::from_secs(timeout_secs),
            log_level,
        })
    }

    /// Applies command-line overrides.
    pub fn with_cli(mut self, cli: &Cli) -> Result<Self, ConfigError> {
        if let Some(backend) = cli.backend {
            self.backend = backend;
        }
        if let Some(voice) = &cli.voice {
            self.voice = Some(voice.clone());
        }
        if let Some(rate) = cli.rate {
            self.rate = validate_rate(rate)
                .map_err(|e| ConfigError::InvalidValue("--rate".to_string(), e))?;
        }
        if let Some(path) = &cli.jokes {
            self.jokes_path = Some(path.clone());
        }
        Ok(self)
    }

    /// The voice to speak with: the chosen one, else the backend's default.
    pub fn voice(&self) -> &str {
        self.voice
            .as_deref()
            .unwrap_or_else(|| self.backend.default_voice())
    }
}

fn parse_rate(value: &str) -> Result<f32, String> {
    value
        .parse::<f32>()
        .map_err(|_| format!("'{}' is not a number", value))
        .and_then(validate_rate)
}

fn validate_rate(rate: f32) -> Result<f32, String> {
    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        Err(format!("'{}' is not a positive speech rate", rate))
    }
}
