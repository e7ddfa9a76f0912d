use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

const DEFAULT_GEMINI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent";
const DEFAULT_ARXIV_ENDPOINT: &str = "https://export.arxiv.org/api/query";
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:8000,http://127.0.0.1:8000";

const DEFAULT_GEMINI_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_TOKENS: u32 = 600;
const DEFAULT_ARXIV_TIMEOUT_SECS: u64 = 20;
const DEFAULT_ARXIV_MAX_RESULTS: usize = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub gemini: GeminiConfig,
    pub arxiv: ArxivConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
    /// Full `generateContent` URL; the model is part of the path.
    pub endpoint: String,
    pub timeout_secs: u64,
    /// Token budget used when a request does not carry a positive `maxTokens`.
    pub default_max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArxivConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
    /// Page size requested from arXiv and the cap on returned papers.
    pub max_results: usize,
    pub start: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

impl RelayConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let config = RelayConfig {
            common: common_config,
            gemini: GeminiConfig {
                api_key: get_env("GEMINI_API_KEY", None, is_prod)?,
                endpoint: get_env("GEMINI_ENDPOINT", Some(DEFAULT_GEMINI_ENDPOINT), is_prod)?,
                timeout_secs: parse_positive(
                    &get_env(
                        "GEMINI_TIMEOUT_SECS",
                        Some(&DEFAULT_GEMINI_TIMEOUT_SECS.to_string()),
                        is_prod,
                    )?,
                    DEFAULT_GEMINI_TIMEOUT_SECS,
                ),
                default_max_tokens: parse_positive(
                    &get_env(
                        "GEMINI_DEFAULT_MAX_TOKENS",
                        Some(&DEFAULT_MAX_TOKENS.to_string()),
                        is_prod,
                    )?,
                    DEFAULT_MAX_TOKENS,
                ),
            },
            arxiv: ArxivConfig {
                endpoint: get_env("ARXIV_ENDPOINT", Some(DEFAULT_ARXIV_ENDPOINT), is_prod)?,
                timeout_secs: parse_positive(
                    &get_env(
                        "ARXIV_TIMEOUT_SECS",
                        Some(&DEFAULT_ARXIV_TIMEOUT_SECS.to_string()),
                        is_prod,
                    )?,
                    DEFAULT_ARXIV_TIMEOUT_SECS,
                ),
                max_results: parse_positive(
                    &get_env(
                        "ARXIV_MAX_RESULTS",
                        Some(&DEFAULT_ARXIV_MAX_RESULTS.to_string()),
                        is_prod,
                    )?,
                    DEFAULT_ARXIV_MAX_RESULTS,
                ),
                start: get_env("ARXIV_START", Some("0"), is_prod)?
                    .parse()
                    .unwrap_or(0),
            },
            security: SecurityConfig {
                allowed_origins: parse_origins(&get_env(
                    "ALLOWED_ORIGINS",
                    Some(DEFAULT_ALLOWED_ORIGINS),
                    is_prod,
                )?),
            },
        };

        config.validate(is_prod)?;
        Ok(config)
    }

    fn validate(&self, is_prod: bool) -> Result<(), AppError> {
        if self.gemini.api_key.trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "GEMINI_API_KEY must not be empty"
            )));
        }

        if is_prod && self.security.allowed_origins.iter().any(|o| o == "*") {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Wildcard CORS origin not allowed in production"
            )));
        }

        Ok(())
    }
}

/// Zero or unparseable values fall back to `default`.
fn parse_positive<T>(raw: &str, default: T) -> T
where
    T: std::str::FromStr + PartialOrd + Default,
{
    raw.trim()
        .parse::<T>()
        .ok()
        .filter(|v| *v > T::default())
        .unwrap_or(default)
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
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
