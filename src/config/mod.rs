//! Configuration management for Mailgrant Core

use anyhow::{Context, Result};
use std::env;

/// Default identity used when a request names no user
pub const DEFAULT_USER_ID: &str = "default-user";

/// Nylas caps JSON-encoded attachments at 3 MiB per message
pub const DEFAULT_MAX_ATTACHMENT_BYTES: usize = 3 * 1024 * 1024;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server host
    pub http_host: String,
    /// HTTP server port
    pub http_port: u16,
    /// Externally reachable base URL of this service, used in re-auth links
    pub public_base_url: Option<String>,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Nylas provider configuration
    pub nylas: NylasConfig,
    /// Grant gate configuration
    pub gate: GateConfig,
    /// Outbound dispatch configuration
    pub dispatch: DispatchConfig,
    /// Grant administration API configuration
    pub admin: AdminConfig,
    /// Logging configuration
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct NylasConfig {
    /// API base URL (e.g., https://api.us.nylas.com)
    pub api_uri: String,
    /// Application API key, sent as bearer on grant-scoped calls
    pub api_key: String,
    pub client_id: String,
    /// Client secret for code exchange; Nylas v3 accepts the API key here
    pub client_secret: String,
    /// Redirect URI registered with Nylas (points at /oauth/exchange)
    pub callback_uri: String,
    /// Folder queried for sent messages
    pub sent_folder: String,
    /// Page size for message listings
    pub message_limit: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Identity used when neither a request parameter nor header names one
    pub fallback_user_id: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            fallback_user_id: DEFAULT_USER_ID.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Recipient used when a send request carries no `to` (single-recipient deployments)
    pub default_recipient: Option<String>,
    /// Upper bound on total decoded attachment bytes per message
    pub max_attachment_bytes: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_recipient: None,
            max_attachment_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AdminConfig {
    /// Bearer key for `/api/v1/grants`; the admin API is disabled when unset
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// "plain" or "json"
    pub log_format: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: "plain".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("NYLAS_API_KEY").context("NYLAS_API_KEY is required")?;

        Ok(Self {
            http_host: env::var("HTTP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .context("Invalid HTTP_PORT")?,
            public_base_url: non_empty_var("PUBLIC_BASE_URL"),
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").context("DATABASE_URL is required")?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()
                    .unwrap_or(2),
            },
            nylas: NylasConfig {
                api_uri: env::var("NYLAS_API_URI")
                    .unwrap_or_else(|_| "https://api.us.nylas.com".to_string()),
                client_id: env::var("NYLAS_CLIENT_ID").context("NYLAS_CLIENT_ID is required")?,
                client_secret: non_empty_var("NYLAS_CLIENT_SECRET")
                    .unwrap_or_else(|| api_key.clone()),
                api_key,
                callback_uri: env::var("NYLAS_CALLBACK_URI")
                    .unwrap_or_else(|_| "http://localhost:3001/oauth/exchange".to_string()),
                sent_folder: env::var("NYLAS_SENT_FOLDER").unwrap_or_else(|_| "SENT".to_string()),
                message_limit: env::var("NYLAS_MESSAGE_LIMIT")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
                timeout_secs: env::var("NYLAS_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .unwrap_or(30),
            },
            gate: GateConfig {
                fallback_user_id: non_empty_var("DEFAULT_USER_ID")
                    .unwrap_or_else(|| DEFAULT_USER_ID.to_string()),
            },
            dispatch: DispatchConfig {
                default_recipient: non_empty_var("DEFAULT_RECIPIENT_EMAIL"),
                max_attachment_bytes: env::var("MAX_ATTACHMENT_BYTES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_MAX_ATTACHMENT_BYTES),
            },
            admin: AdminConfig {
                api_key: non_empty_var("ADMIN_API_KEY"),
            },
            telemetry: TelemetryConfig {
                log_format: env::var("LOG_FORMAT")
                    .map(|s| s.to_lowercase())
                    .unwrap_or_else(|_| "plain".to_string()),
            },
        })
    }

    /// Get HTTP server address
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    /// Base for links pointing back at this service (empty means relative links)
    pub fn link_base(&self) -> &str {
        self.public_base_url
            .as_deref()
            .map(|s| s.trim_end_matches('/'))
            .unwrap_or("")
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
