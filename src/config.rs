use std::env;
use thiserror::Error;

const DEFAULT_SCRAPER_URL: &str = "https://api.firecrawl.dev";
const DEFAULT_LLM_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_LLM_MODEL: &str = "xiaomi/mimo-v2-flash:free";
const DEFAULT_SEARCH_RESULT_LIMIT: usize = 10;
const DEFAULT_MAP_RESULT_LIMIT: usize = 25;
const DEFAULT_SESSION_COOKIE: &str = "session_token";
const DEFAULT_LOGIN_PATH: &str = "/login";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the linkshelf server.
///
/// Loaded once in `main` and handed to the constructors that need it; nothing reads it
/// through a global.
#[derive(Debug, Clone)]
pub struct Config {
    /// Connection string for the SQLite database holding items and sessions.
    pub database_url: String,
    /// Base URL of the content-extraction API.
    pub scraper_url: String,
    /// Bearer token for the content-extraction API.
    pub scraper_api_key: String,
    /// Base URL of the OpenAI-compatible language-model API.
    pub llm_url: String,
    /// Bearer token for the language-model API.
    pub llm_api_key: String,
    /// Model identifier used for summaries and tags.
    pub llm_model: String,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Maximum number of web search results returned by discovery.
    pub search_result_limit: usize,
    /// Maximum number of links returned by site mapping.
    pub map_result_limit: usize,
    /// Name of the cookie carrying the session token.
    pub session_cookie_name: String,
    /// Where unauthenticated callers are redirected.
    pub login_path: String,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: load_env("DATABASE_URL")?,
            scraper_url: load_env_optional("SCRAPER_URL")
                .unwrap_or_else(|| DEFAULT_SCRAPER_URL.to_string()),
            scraper_api_key: load_env("SCRAPER_API_KEY")?,
            llm_url: load_env_optional("LLM_URL").unwrap_or_else(|| DEFAULT_LLM_URL.to_string()),
            llm_api_key: load_env("LLM_API_KEY")?,
            llm_model: load_env_optional("LLM_MODEL")
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            server_port: parse_optional("SERVER_PORT")?,
            search_result_limit: parse_optional("SEARCH_RESULT_LIMIT")?
                .unwrap_or(DEFAULT_SEARCH_RESULT_LIMIT),
            map_result_limit: parse_optional("MAP_RESULT_LIMIT")?
                .unwrap_or(DEFAULT_MAP_RESULT_LIMIT),
            session_cookie_name: load_env_optional("SESSION_COOKIE_NAME")
                .unwrap_or_else(|| DEFAULT_SESSION_COOKIE.to_string()),
            login_path: load_env_optional("LOGIN_PATH")
                .unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_string()),
        })
    }

    /// Read `.env` (when present) and then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config = Self::from_env()?;
        tracing::debug!(
            database = config.database_kind(),
            scraper_url = %config.scraper_url,
            llm_url = %config.llm_url,
            llm_model = %config.llm_model,
            server_port = ?config.server_port,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Scheme of the database URL, or `memory` for in-memory databases. Safe to log.
    pub fn database_kind(&self) -> &str {
        let url = self.database_url.trim();
        if url.contains(":memory:") || url.contains("mode=memory") {
            return "memory";
        }
        url.split_once(':').map_or("unknown", |(scheme, _)| scheme)
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    load_env_optional(key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}
