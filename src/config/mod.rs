use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::info;
use url::Url;

use crate::errors::{AppError, AppResult};

pub mod defaults;
pub mod duration_serde;

use defaults::*;
use duration_serde::{duration, parse_default};

/// Where icons live and how candidate filenames are shaped
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IconSourceConfig {
    /// Repository path every candidate filename is appended to
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// File extension, without the dot
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Deepest split position for the prefix/suffix case permutations
    #[serde(default = "default_max_split_depth")]
    pub max_split_depth: usize,
    /// Deepest split position for the extra lower-prefix/upper-suffix forms
    #[serde(default = "default_extra_form_depth")]
    pub extra_form_depth: usize,
}

/// Bounded waits for the resolver's network operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Wait for a single candidate load attempt
    #[serde(default = "default_attempt_timeout", with = "duration")]
    pub attempt_timeout: Duration,
    /// Wait for the raw-content fetch of the sanitize fallback
    #[serde(default = "default_fetch_timeout", with = "duration")]
    pub fetch_timeout: Duration,
    /// TCP connect timeout of the HTTP client
    #[serde(default = "default_connect_timeout", with = "duration")]
    pub connect_timeout: Duration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: IconSourceConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    /// Manual override table: symbol -> exact icon URL
    #[serde(default = "default_overrides")]
    pub overrides: BTreeMap<String, String>,
}

fn default_base_url() -> String {
    DEFAULT_ICON_BASE_URL.to_string()
}

fn default_extension() -> String {
    DEFAULT_ICON_EXTENSION.to_string()
}

fn default_max_split_depth() -> usize {
    DEFAULT_MAX_SPLIT_DEPTH
}

fn default_extra_form_depth() -> usize {
    DEFAULT_EXTRA_FORM_DEPTH
}

fn default_attempt_timeout() -> Duration {
    parse_default(DEFAULT_ATTEMPT_TIMEOUT)
}

fn default_fetch_timeout() -> Duration {
    parse_default(DEFAULT_FETCH_TIMEOUT)
}

fn default_connect_timeout() -> Duration {
    parse_default(DEFAULT_CONNECT_TIMEOUT)
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

fn default_overrides() -> BTreeMap<String, String> {
    DEFAULT_OVERRIDES
        .iter()
        .map(|(symbol, file)| {
            (
                symbol.to_string(),
                format!("{DEFAULT_ICON_BASE_URL}/{file}.{DEFAULT_ICON_EXTENSION}"),
            )
        })
        .collect()
}

impl Default for IconSourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            extension: default_extension(),
            max_split_depth: default_max_split_depth(),
            extra_form_depth: default_extra_form_depth(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: default_attempt_timeout(),
            fetch_timeout: default_fetch_timeout(),
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: IconSourceConfig::default(),
            resolver: ResolverConfig::default(),
            overrides: default_overrides(),
        }
    }
}

impl Config {
    pub fn load() -> AppResult<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from_file(&config_file)
    }

    /// Load from a TOML file, falling back to defaults when it does not exist
    pub fn load_from_file<P: AsRef<Path>>(config_file: P) -> AppResult<Self> {
        let path = config_file.as_ref();
        let config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let parsed: Config = toml::from_str(&contents)?;
            info!("Configuration loaded from: {}", path.display());
            parsed
        } else {
            info!(
                "No configuration file at {}, using defaults",
                path.display()
            );
            Self::default()
        };

        let config = config.normalized();
        config.validate()?;
        Ok(config)
    }

    /// Upper-case override keys and strip a trailing slash from the base URL
    pub fn normalized(mut self) -> Self {
        self.overrides = self
            .overrides
            .into_iter()
            .map(|(symbol, url)| (symbol.trim().to_uppercase(), url.trim().to_string()))
            .collect();
        self.source.base_url = self.source.base_url.trim().trim_end_matches('/').to_string();
        self.source.extension = self
            .source
            .extension
            .trim()
            .trim_start_matches('.')
            .to_string();
        self
    }

    pub fn validate(&self) -> AppResult<()> {
        validate_http_url("source.base_url", &self.source.base_url)?;

        if self.source.extension.is_empty() {
            return Err(AppError::configuration("source.extension must not be empty"));
        }
        if self.source.max_split_depth == 0 {
            return Err(AppError::configuration(
                "source.max_split_depth must be at least 1",
            ));
        }

        for (symbol, url) in &self.overrides {
            if symbol.is_empty() {
                return Err(AppError::configuration("override symbol must not be empty"));
            }
            validate_http_url(&format!("overrides.{symbol}"), url)?;
        }

        Ok(())
    }
}

fn validate_http_url(field: &str, value: &str) -> AppResult<()> {
    let parsed = Url::parse(value)
        .map_err(|e| AppError::configuration(format!("{field}: invalid URL '{value}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(AppError::configuration(format!(
            "{field}: unsupported scheme '{other}'"
        ))),
    }
}
