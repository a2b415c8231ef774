//! Configuration types, built from environment variables.

use std::path::PathBuf;
use std::str::FromStr;

use secrecy::SecretString;

use crate::digest::MailConfig;
use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};
use crate::prioritize::ClassifierConfig;

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP listen port.
    pub port: u16,
    /// libSQL database file.
    pub db_path: PathBuf,
    /// Directory for daily log files (stderr only when unset).
    pub log_dir: Option<PathBuf>,
    pub llm: LlmConfig,
    pub classifier: ClassifierConfig,
    /// Outbound mail relay. `None` when `SMTP_HOST` is not set.
    pub mail: Option<MailConfig>,
}

impl AppConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = parse_or(&get, "TODO_ASSIST_PORT", 8080u16)?;
        let db_path = get("TODO_ASSIST_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/todo-assist.db"));
        let log_dir = get("TODO_ASSIST_LOG_DIR").map(PathBuf::from);

        let backend = match get("TODO_ASSIST_LLM_BACKEND") {
            Some(raw) => raw.parse::<LlmBackend>()?,
            None => LlmBackend::Anthropic,
        };
        let api_key_var = backend.api_key_var();
        let api_key = get(api_key_var)
            .ok_or_else(|| ConfigError::MissingEnvVar(api_key_var.to_string()))?;
        let model = get("TODO_ASSIST_MODEL").unwrap_or_else(|| backend.default_model().to_string());

        let defaults = ClassifierConfig::default();
        let classifier = ClassifierConfig {
            temperature: parse_or(
                &get,
                "TODO_ASSIST_CLASSIFIER_TEMPERATURE",
                defaults.temperature,
            )?,
            max_tokens: parse_or(&get, "TODO_ASSIST_CLASSIFIER_MAX_TOKENS", defaults.max_tokens)?,
        };
        if !(0.0..=2.0).contains(&classifier.temperature) {
            return Err(ConfigError::InvalidValue {
                key: "TODO_ASSIST_CLASSIFIER_TEMPERATURE".to_string(),
                message: format!("{} is outside 0.0..=2.0", classifier.temperature),
            });
        }

        let mail = match get("SMTP_HOST") {
            Some(smtp_host) => {
                let username = get("SMTP_USERNAME")
                    .ok_or_else(|| ConfigError::MissingEnvVar("SMTP_USERNAME".to_string()))?;
                let password = get("SMTP_PASSWORD")
                    .ok_or_else(|| ConfigError::MissingEnvVar("SMTP_PASSWORD".to_string()))?;
                Some(MailConfig {
                    smtp_port: parse_or(&get, "SMTP_PORT", 587u16)?,
                    from_address: get("MAIL_FROM_ADDRESS").unwrap_or_else(|| username.clone()),
                    smtp_host,
                    username,
                    password: SecretString::from(password),
                })
            }
            None => None,
        };

        Ok(Self {
            port,
            db_path,
            log_dir,
            llm: LlmConfig {
                backend,
                api_key: SecretString::from(api_key),
                model,
            },
            classifier,
            mail,
        })
    }
}

fn parse_or<T>(get: impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{raw}': {e}"),
        }),
        None => Ok(default),
    }
}
