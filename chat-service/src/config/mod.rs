use crate::services::providers::openai::{
    OpenAiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS,
};
use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::path::PathBuf;

const DEFAULT_TRANSCRIPT_PATH: &str = "chat_log.txt";
const DEFAULT_SESSION_INACTIVITY_HOURS: u32 = 24;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub common: core_config::Config,
    pub openai: OpenAiConfig,
    pub transcript: TranscriptConfig,
    pub session: SessionConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone)]
pub struct TranscriptConfig {
    /// Transcript file; `None` disables the transcript.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Mark the session cookie `Secure` (requires HTTPS).
    pub secure_cookie: bool,
    /// Sessions expire after this many hours without a request. Never zero.
    pub inactivity_hours: u32,
}

#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// OTLP collector endpoint; spans are only exported when set.
    pub otlp_endpoint: Option<String>,
}

impl ChatConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        Self::from_lookup(common, |key| env::var(key).ok())
    }

    /// Build the service configuration from a variable lookup.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_prod = lookup("ENVIRONMENT").unwrap_or_else(|| "dev".to_string()) == "prod";
        let get = |key: &str, default: Option<&str>| get_var(&lookup, key, default, is_prod);

        let api_key = get("OPENAI_API_KEY", None)?;
        if api_key.trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "OPENAI_API_KEY is set but empty"
            )));
        }

        let timeout_secs = parse(
            "OPENAI_TIMEOUT_SECS",
            &get("OPENAI_TIMEOUT_SECS", Some(&DEFAULT_TIMEOUT_SECS.to_string()))?,
        )?;
        let secure_cookie = parse(
            "SESSION_COOKIE_SECURE",
            &get("SESSION_COOKIE_SECURE", Some("false"))?,
        )?;
        let inactivity_hours: u32 = parse(
            "SESSION_INACTIVITY_HOURS",
            &get(
                "SESSION_INACTIVITY_HOURS",
                Some(&DEFAULT_SESSION_INACTIVITY_HOURS.to_string()),
            )?,
        )?;
        if inactivity_hours == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "SESSION_INACTIVITY_HOURS must be at least 1"
            )));
        }

        let transcript_path = get("TRANSCRIPT_LOG_PATH", Some(DEFAULT_TRANSCRIPT_PATH))?;

        Ok(ChatConfig {
            common,
            openai: OpenAiConfig {
                api_key: Secret::new(api_key),
                base_url: get("OPENAI_BASE_URL", Some(DEFAULT_BASE_URL))?,
                model: get("OPENAI_MODEL", Some(DEFAULT_MODEL))?,
                timeout_secs,
            },
            transcript: TranscriptConfig {
                path: (!transcript_path.trim().is_empty()).then(|| PathBuf::from(transcript_path)),
            },
            session: SessionConfig {
                secure_cookie,
                inactivity_hours,
            },
            observability: ObservabilityConfig {
                log_level: lookup("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
                otlp_endpoint: lookup("OTLP_ENDPOINT").filter(|v| !v.trim().is_empty()),
            },
        })
    }
}

fn get_var<F>(lookup: &F, key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => Ok(val),
        None => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("{} has invalid value {:?}: {}", key, value, e))
    })
}
