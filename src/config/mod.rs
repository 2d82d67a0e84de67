//! Configuration handling for the application.
//!
//! Everything is read once from the environment by [`Config::from_env`] and
//! then passed by value into the components that need it. The binary loads a
//! `.env` file first, so the same variables can live there.

use std::env;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BrochureError;

/// Environment variable names.
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const ENV_DEFAULT_MODEL: &str = "DEFAULT_MODEL";
pub const ENV_DEFAULT_CLAUDE_MODEL: &str = "DEFAULT_CLAUDE_MODEL";
pub const ENV_MAX_CONTENT_LENGTH: &str = "MAX_CONTENT_LENGTH";
pub const ENV_REQUEST_TIMEOUT: &str = "REQUEST_TIMEOUT";
pub const ENV_MAX_RETRIES: &str = "MAX_RETRIES";
pub const ENV_OUTPUT_DIR: &str = "OUTPUT_DIR";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_CLAUDE_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_MAX_CONTENT_LENGTH: usize = 20_000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_OUTPUT_DIR: &str = "output/brochures";
const DEFAULT_LOG_LEVEL: &str = "info";

/// The two supported LLM vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
}

impl ProviderKind {
    /// Human-facing vendor name used in logs.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Anthropic => "Claude",
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }
}

impl Display for ProviderKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ProviderKind {
    type Err = BrochureError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "claude" | "anthropic" => Ok(Self::Anthropic),
            other => Err(BrochureError::Configuration(format!(
                "unsupported provider: {other}"
            ))),
        }
    }
}

/// Everything a provider client needs to talk to one vendor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub api_key: String,
    pub model: String,
    pub max_retries: u32,
}

/// Application runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    openai_api_key: Option<String>,
    anthropic_api_key: Option<String>,
    openai_model: String,
    claude_model: String,
    max_content_length: usize,
    request_timeout: Duration,
    max_retries: u32,
    output_dir: PathBuf,
    log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            anthropic_api_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            claude_model: DEFAULT_CLAUDE_MODEL.to_string(),
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Config {
    /// Load from environment variables, falling back to defaults.
    ///
    /// Fails only when a numeric variable is present but does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            openai_api_key: non_empty_var(ENV_OPENAI_API_KEY),
            anthropic_api_key: non_empty_var(ENV_ANTHROPIC_API_KEY),
            openai_model: non_empty_var(ENV_DEFAULT_MODEL).unwrap_or(defaults.openai_model),
            claude_model: non_empty_var(ENV_DEFAULT_CLAUDE_MODEL)
                .unwrap_or(defaults.claude_model),
            max_content_length: parse_var(ENV_MAX_CONTENT_LENGTH)?
                .unwrap_or(defaults.max_content_length),
            request_timeout: parse_var(ENV_REQUEST_TIMEOUT)?
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            max_retries: parse_var(ENV_MAX_RETRIES)?.unwrap_or(defaults.max_retries),
            output_dir: non_empty_var(ENV_OUTPUT_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            log_level: non_empty_var(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
        })
    }

    pub fn with_api_key(mut self, kind: ProviderKind, key: impl Into<String>) -> Self {
        match kind {
            ProviderKind::OpenAi => self.openai_api_key = Some(key.into()),
            ProviderKind::Anthropic => self.anthropic_api_key = Some(key.into()),
        }
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn api_key(&self, kind: ProviderKind) -> Option<&str> {
        match kind {
            ProviderKind::OpenAi => self.openai_api_key.as_deref(),
            ProviderKind::Anthropic => self.anthropic_api_key.as_deref(),
        }
    }

    pub fn default_model(&self, kind: ProviderKind) -> &str {
        match kind {
            ProviderKind::OpenAi => &self.openai_model,
            ProviderKind::Anthropic => &self.claude_model,
        }
    }

    /// Assembled-document budget in characters.
    pub fn max_content_length(&self) -> usize {
        self.max_content_length
    }
    /// Per-request HTTP timeout.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
    /// Directory generated brochures and metadata are written to.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
    /// Fallback `tracing` filter when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Resolves credentials and model for `kind`.
    ///
    /// Fails with a configuration error when no key is configured, so no
    /// request is ever attempted without a credential.
    pub fn provider_config(
        &self,
        kind: ProviderKind,
        model_override: Option<&str>,
    ) -> Result<ProviderConfig, BrochureError> {
        let api_key = self.api_key(kind).ok_or_else(|| {
            BrochureError::Configuration(format!(
                "{} API key not configured in environment",
                kind.display_name()
            ))
        })?;

        Ok(ProviderConfig {
            kind,
            api_key: api_key.to_string(),
            model: model_override
                .unwrap_or_else(|| self.default_model(kind))
                .to_string(),
            max_retries: self.max_retries,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError>
where
    T::Err: Display,
{
    match non_empty_var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                field: key,
                reason: e.to_string(),
            }),
        None => Ok(None),
    }
}

/// Errors that can occur while building a configuration.
#[derive(Debug)]
pub enum ConfigError {
    InvalidValue { field: &'static str, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Ensure environment-variable manipulating tests run serially.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const ALL_VARS: [&str; 9] = [
        ENV_OPENAI_API_KEY,
        ENV_ANTHROPIC_API_KEY,
        ENV_DEFAULT_MODEL,
        ENV_DEFAULT_CLAUDE_MODEL,
        ENV_MAX_CONTENT_LENGTH,
        ENV_REQUEST_TIMEOUT,
        ENV_MAX_RETRIES,
        ENV_OUTPUT_DIR,
        ENV_LOG_LEVEL,
    ];

    fn clear_env() {
        for key in ALL_VARS {
            unsafe {
                env::remove_var(key);
            }
        }
    }

    #[test]
    fn defaults_when_env_missing() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.max_retries(), 3);
        assert_eq!(cfg.max_content_length(), 20_000);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.default_model(ProviderKind::OpenAi), "gpt-4o-mini");
    }

    #[test]
    fn overrides_when_env_present() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var(ENV_OPENAI_API_KEY, "sk-test-key-0123456789");
            env::set_var(ENV_MAX_RETRIES, "5");
            env::set_var(ENV_OUTPUT_DIR, "/tmp/brochures");
            env::set_var(ENV_DEFAULT_CLAUDE_MODEL, "claude-3-haiku");
        }
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.api_key(ProviderKind::OpenAi), Some("sk-test-key-0123456789"));
        assert_eq!(cfg.max_retries(), 5);
        assert_eq!(cfg.output_dir(), Path::new("/tmp/brochures"));
        assert_eq!(cfg.default_model(ProviderKind::Anthropic), "claude-3-haiku");
        clear_env();
    }

    #[test]
    fn invalid_number_is_rejected() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var(ENV_REQUEST_TIMEOUT, "soon");
        }
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains(ENV_REQUEST_TIMEOUT));
        clear_env();
    }

    #[test]
    fn provider_config_requires_key() {
        let cfg = Config::default();
        let err = cfg.provider_config(ProviderKind::Anthropic, None).unwrap_err();
        assert!(matches!(err, BrochureError::Configuration(_)));

        let cfg = cfg.with_api_key(ProviderKind::Anthropic, "sk-ant-REDACTED");
        let provider = cfg
            .provider_config(ProviderKind::Anthropic, Some("claude-3-opus"))
            .unwrap();
        assert_eq!(provider.model, "claude-3-opus");
        assert_eq!(provider.max_retries, 3);
    }

    #[test]
    fn provider_kind_parses_aliases() {
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("claude".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
        assert!("gemini".parse::<ProviderKind>().is_err());
    }
}
