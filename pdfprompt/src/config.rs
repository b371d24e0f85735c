//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `PDFPROMPT_CONFIG`
//! environment variable. A missing file is not an error: every field has a default.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `PDFPROMPT_` override YAML values
//! 3. **GOOGLE_API_KEY** - Special case: overrides `gemini.api_key` if set
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `PDFPROMPT_GEMINI__MODEL=gemini-2.5-flash` sets the `gemini.model` field.
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Required: the Gemini API credential
//! GOOGLE_API_KEY="..."
//!
//! # Override server port
//! PDFPROMPT_PORT=8080
//!
//! # Give slow generations more time
//! PDFPROMPT_GEMINI__REQUEST_TIMEOUT=5m
//!
//! # Escape generated text before embedding it in the response
//! PDFPROMPT_RESPONSES__ESCAPE_HTML=true
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

use crate::errors::Error;

/// Instruction sent ahead of the caller's prompt text on every generation request.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "
        Analyze the structure in the attached PDF file.

        Write a report where you calculate the volume of concrete that would be needed to build the structure.

        Give a final result in cubic meters.

        Use the SANS codes for this problem.

        Format the response output as html.
        ";

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "PDFPROMPT_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment variables.
/// All fields have sensible defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Directory holding per-request scratch copies of uploaded PDFs.
    /// Created once at startup if it does not exist.
    pub scratch_dir: PathBuf,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
    /// Generative-content service settings
    pub gemini: GeminiConfig,
    /// Request size limits
    pub limits: LimitsConfig,
    /// How successful and failed uploads are rendered
    pub responses: ResponseConfig,
}

/// Settings for the Gemini REST API.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeminiConfig {
    /// API credential, usually supplied through `GOOGLE_API_KEY`
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL of the API (override for proxies and tests)
    pub base_url: Url,
    /// Model identifier used for content generation
    pub model: String,
    /// Upper bound on each round trip to the API (default: 120s)
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Fixed instruction placed before the caller's prompt text
    pub prompt_template: String,
}

// Hand-written so the API key never lands in logs.
impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url.as_str())
            .field("model", &self.model)
            .field("request_timeout", &self.request_timeout)
            .field("prompt_template", &self.prompt_template)
            .finish()
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: Url::parse("https://generativelanguage.googleapis.com/").expect("static URL is valid"),
            model: "gemini-2.0-flash".to_string(),
            request_timeout: Duration::from_secs(120),
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum multipart body size in bytes for `/upload`.
    /// Default: 20MB
    pub max_upload_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_size: 20 * 1024 * 1024, // 20MB
        }
    }
}

/// Response rendering options.
///
/// The defaults reproduce the behavior of a trusted internal deployment: generated text is embedded
/// as-is (the model is asked for HTML) and error bodies include the underlying detail.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResponseConfig {
    /// HTML-escape the generated text before embedding it in the response fragment
    pub escape_html: bool,
    /// Include the underlying error detail in 500 response bodies
    pub expose_error_detail: bool,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            escape_html: false,
            expose_error_detail: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            scratch_dir: PathBuf::from("uploads"),
            enable_otel_export: false,
            gemini: GeminiConfig::default(),
            limits: LimitsConfig::default(),
            responses: ResponseConfig::default(),
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.api_key().is_none() {
            return Err(Error::Internal {
                operation: "Config validation: GOOGLE_API_KEY environment variable is not set. \
                 Please set GOOGLE_API_KEY or add gemini.api_key to the config file."
                    .to_string(),
            });
        }

        if self.gemini.model.trim().is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: gemini.model cannot be empty".to_string(),
            });
        }

        if self.gemini.request_timeout.is_zero() {
            return Err(Error::Internal {
                operation: "Config validation: gemini.request_timeout must be greater than zero".to_string(),
            });
        }

        if self.limits.max_upload_size == 0 {
            return Err(Error::Internal {
                operation: "Config validation: limits.max_upload_size must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// The configured API key, treating an empty string as unset.
    pub fn api_key(&self) -> Option<&str> {
        self.gemini.api_key.as_deref().filter(|key| !key.trim().is_empty())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values. PDFPROMPT_CONFIG selects the
            // file itself and is not a config key.
            .merge(Env::prefixed("PDFPROMPT_").ignore(&["CONFIG"]).split("__"))
            // The conventional Google credential variable
            .merge(Env::raw().only(&["GOOGLE_API_KEY"]).map(|_| "gemini.api_key".into()))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
