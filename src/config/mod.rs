use anyhow::{ensure, Context};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::clicks::{DEFAULT_LOCATION_LABEL, DEFAULT_SOURCE_LABEL};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_server: ServerConfig,
    pub redirect_server: ServerConfig,
    /// Public prefix for short URLs handed back to clients
    pub redirect_base_url: String,
    pub redirect_status: RedirectMode,
    pub links: LinkConfig,
    pub clicks: ClickConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    pub default_validity_minutes: i64,
    pub max_batch_size: usize,
    pub shortcode_max_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickConfig {
    pub location_label: String,
    pub default_source_label: String,
    pub client_signature_max_len: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Empty means any origin
    pub allowed_origins: Vec<String>,
}

/// HTTP status used for redirects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectMode {
    MovedPermanently,
    #[default]
    Found,
    SeeOther,
    TemporaryRedirect,
    PermanentRedirect,
}

impl RedirectMode {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "301" => Some(RedirectMode::MovedPermanently),
            "302" => Some(RedirectMode::Found),
            "303" => Some(RedirectMode::SeeOther),
            "307" => Some(RedirectMode::TemporaryRedirect),
            "308" => Some(RedirectMode::PermanentRedirect),
            _ => None,
        }
    }

    pub fn status_code(self) -> StatusCode {
        match self {
            RedirectMode::MovedPermanently => StatusCode::MOVED_PERMANENTLY,
            RedirectMode::Found => StatusCode::FOUND,
            RedirectMode::SeeOther => StatusCode::SEE_OTHER,
            RedirectMode::TemporaryRedirect => StatusCode::TEMPORARY_REDIRECT,
            RedirectMode::PermanentRedirect => StatusCode::PERMANENT_REDIRECT,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            redirect_server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            redirect_base_url: "http://localhost:3000".to_string(),
            redirect_status: RedirectMode::default(),
            links: LinkConfig {
                default_validity_minutes: 30,
                max_batch_size: 5,
                shortcode_max_attempts: 16,
            },
            clicks: ClickConfig {
                location_label: DEFAULT_LOCATION_LABEL.to_string(),
                default_source_label: DEFAULT_SOURCE_LABEL.to_string(),
                client_signature_max_len: 50,
            },
            cors: CorsConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup, starting from the defaults
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(host) = lookup("API_HOST") {
            config.api_server.host = host;
        }
        if let Some(port) = lookup("API_PORT") {
            config.api_server.port = port
                .parse()
                .with_context(|| format!("API_PORT must be a port number, got '{port}'"))?;
        }

        if let Some(host) = lookup("REDIRECT_HOST") {
            config.redirect_server.host = host;
        }
        if let Some(port) = lookup("REDIRECT_PORT") {
            config.redirect_server.port = port
                .parse()
                .with_context(|| format!("REDIRECT_PORT must be a port number, got '{port}'"))?;
        }

        if let Some(base) = lookup("REDIRECT_BASE_URL") {
            config.redirect_base_url = base.trim_end_matches('/').to_string();
        }

        if let Some(status) = lookup("REDIRECT_STATUS") {
            config.redirect_status = RedirectMode::from_code(&status).unwrap_or_else(|| {
                tracing::warn!(
                    "Unknown REDIRECT_STATUS '{status}', falling back to 302. Supported values: 301, 302, 303, 307, 308"
                );
                RedirectMode::Found
            });
        }

        if let Some(minutes) = lookup("DEFAULT_VALIDITY_MINUTES") {
            config.links.default_validity_minutes = minutes
                .parse()
                .context("DEFAULT_VALIDITY_MINUTES must be an integer")?;
        }
        if let Some(size) = lookup("MAX_BATCH_SIZE") {
            config.links.max_batch_size = size.parse().context("MAX_BATCH_SIZE must be an integer")?;
        }
        if let Some(attempts) = lookup("SHORTCODE_MAX_ATTEMPTS") {
            config.links.shortcode_max_attempts = attempts
                .parse()
                .context("SHORTCODE_MAX_ATTEMPTS must be an integer")?;
        }

        if let Some(label) = lookup("CLICK_LOCATION_LABEL") {
            config.clicks.location_label = label;
        }
        if let Some(label) = lookup("CLICK_SOURCE_LABEL") {
            config.clicks.default_source_label = label;
        }
        if let Some(len) = lookup("CLIENT_SIGNATURE_MAX_LEN") {
            config.clicks.client_signature_max_len = len
                .parse()
                .context("CLIENT_SIGNATURE_MAX_LEN must be an integer")?;
        }

        if let Some(origins) = lookup("CORS_ALLOWED_ORIGINS") {
            config.cors.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect();
        }

        ensure!(
            config.links.default_validity_minutes > 0,
            "DEFAULT_VALIDITY_MINUTES must be positive"
        );
        ensure!(config.links.max_batch_size > 0, "MAX_BATCH_SIZE must be positive");
        ensure!(
            config.links.shortcode_max_attempts > 0,
            "SHORTCODE_MAX_ATTEMPTS must be positive"
        );

        Ok(config)
    }

    /// Full short URL for a shortcode
    pub fn short_url(&self, shortcode: &str) -> String {
        format!("{}/{}", self.redirect_base_url, shortcode)
    }
}
