use reqwest::Url;
use thiserror::Error;

pub const API_URL_VAR: &str = "BOOKSHELF_API_URL";
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid api url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String }
}

/// Where the client finds the library API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: Url
}

impl Settings {
    /// Reads `.env` (if present) and then `BOOKSHELF_API_URL`, falling back to
    /// the local development server.
    pub fn load() -> Result<Self, ConfigError> {
        // a missing .env file is fine
        let _ = dotenvy::dotenv();
        Self::from_api_url(std::env::var(API_URL_VAR).ok())
    }

    /// Blank values count as unset.
    pub fn from_api_url(value: Option<String>) -> Result<Self, ConfigError> {
        let raw = value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Ok(Settings {
            api_url: parse_base_url(&raw)?
        })
    }
}

/// Parses an http(s) URL that endpoint paths can be joined onto.
pub fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: reason.to_string()
    };
    let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    match url.scheme() {
        "http" | "https" if !url.cannot_be_a_base() => Ok(url),
        "http" | "https" => Err(invalid("url cannot be used as a base")),
        _ => Err(invalid("only http and https are supported"))
    }
}
