// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atrium Works

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `BOT_TOKEN` | Shared Telegram bot secret | Required when auth enabled |
//! | `SESSION_SECRET` | HS256 token signing secret (min 32 bytes) | Required when auth enabled |
//! | `AUTH_ENABLED` | Global authentication toggle | `true` |
//! | `AUTH_STRICT_MODE` | Hard-reject (`true`) vs pass-through (`false`) on auth failures | `true` |
//! | `AUTH_EXEMPT_PATHS` | Comma list of exempt path prefixes | see [`DEFAULT_EXEMPT_PATHS`] |
//! | `AUTH_PROTECTED_PREFIX` | Namespace the gate protects | `/v1` |
//! | `AUTH_MAX_PAYLOAD_AGE_SECONDS` | Max accepted init-data age | `3600` |
//! | `AUTH_CACHE_TTL_SECONDS` | Identity cache TTL | `60` |
//! | `AUTH_CACHE_CAPACITY` | Identity cache LRU capacity | `1024` |
//! | `RATE_LIMIT_WINDOW_SECONDS` | Sliding-window length | `60` |
//! | `RATE_LIMIT_PER_PRINCIPAL` | Admissions per principal per window | `30` |
//! | `ACCESS_TOKEN_TTL_SECONDS` | Admin access-token lifetime | `43200` |
//! | `REFRESH_TOKEN_TTL_SECONDS` | Admin refresh-token lifetime | `2592000` |
//! | `ADMIN_ALLOWLIST` | Comma list of admin Telegram user ids | empty |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

/// Default exempt path prefixes: health checks, API documentation, the login
/// and refresh endpoints, and webhook endpoints that carry their own
/// signature scheme.
pub const DEFAULT_EXEMPT_PATHS: &str =
    "/health,/docs,/api-doc,/v1/admin/login,/v1/admin/refresh,/v1/webhook";

/// Minimum accepted `SESSION_SECRET` length in bytes.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server bind address.
    pub host: String,
    /// Server bind port.
    pub port: u16,
    /// Logging format (`json` or `pretty`).
    pub log_format: String,
    /// Authentication settings.
    pub auth: AuthSettings,
}

/// Authentication subsystem settings.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Global toggle; when `false` every request passes through.
    pub enabled: bool,
    /// Strict mode hard-rejects auth failures; permissive mode logs and
    /// passes the request through unauthenticated.
    pub strict: bool,
    /// Shared Telegram bot secret used by both signature schemes.
    pub bot_token: String,
    /// HS256 signing secret for admin session tokens.
    pub session_secret: String,
    /// Path prefixes exempt from authentication.
    pub exempt_paths: Vec<String>,
    /// Namespace prefix the gate protects; everything else passes through.
    pub protected_prefix: String,
    /// Maximum accepted age of a signed payload, in seconds.
    pub max_payload_age_seconds: u64,
    /// Identity cache TTL, in seconds.
    pub cache_ttl_seconds: u64,
    /// Identity cache LRU capacity.
    pub cache_capacity: usize,
    /// Rate-limit sliding-window length, in seconds.
    pub rate_limit_window_seconds: u64,
    /// Admissions per principal per window.
    pub rate_limit_per_principal: usize,
    /// Admin access-token lifetime, in seconds.
    pub access_token_ttl_seconds: u64,
    /// Admin refresh-token lifetime, in seconds.
    pub refresh_token_ttl_seconds: u64,
    /// Telegram user ids allowed to log in to the admin portal.
    pub admin_allowlist: Vec<String>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parse_var("PORT", 8080)?;
        let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

        Ok(Self {
            host,
            port,
            log_format,
            auth: AuthSettings::from_env()?,
        })
    }
}

impl AuthSettings {
    /// Load authentication settings from environment variables.
    ///
    /// `BOT_TOKEN` and `SESSION_SECRET` are only required while the auth
    /// subsystem is enabled, so a locally disabled instance can start with an
    /// empty environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let enabled = parse_var("AUTH_ENABLED", true)?;
        let strict = parse_var("AUTH_STRICT_MODE", true)?;

        let bot_token = match std::env::var("BOT_TOKEN") {
            Ok(token) => token,
            Err(_) if !enabled => String::new(),
            Err(_) => return Err(ConfigError::Missing("BOT_TOKEN")),
        };

        let session_secret = match std::env::var("SESSION_SECRET") {
            Ok(secret) => {
                if secret.len() < MIN_SESSION_SECRET_LEN {
                    return Err(ConfigError::Invalid(
                        "SESSION_SECRET must be at least 32 bytes",
                    ));
                }
                secret
            }
            Err(_) if !enabled => String::new(),
            Err(_) => return Err(ConfigError::Missing("SESSION_SECRET")),
        };

        let exempt_paths = std::env::var("AUTH_EXEMPT_PATHS")
            .unwrap_or_else(|_| DEFAULT_EXEMPT_PATHS.to_string());
        let admin_allowlist = std::env::var("ADMIN_ALLOWLIST").unwrap_or_default();

        Ok(Self {
            enabled,
            strict,
            bot_token,
            session_secret,
            exempt_paths: split_comma_list(&exempt_paths),
            protected_prefix: std::env::var("AUTH_PROTECTED_PREFIX")
                .unwrap_or_else(|_| "/v1".to_string()),
            max_payload_age_seconds: parse_var("AUTH_MAX_PAYLOAD_AGE_SECONDS", 3600)?,
            cache_ttl_seconds: parse_var("AUTH_CACHE_TTL_SECONDS", 60)?,
            cache_capacity: parse_var("AUTH_CACHE_CAPACITY", 1024)?,
            rate_limit_window_seconds: parse_var("RATE_LIMIT_WINDOW_SECONDS", 60)?,
            rate_limit_per_principal: parse_var("RATE_LIMIT_PER_PRINCIPAL", 30)?,
            access_token_ttl_seconds: parse_var("ACCESS_TOKEN_TTL_SECONDS", 43_200)?,
            refresh_token_ttl_seconds: parse_var("REFRESH_TOKEN_TTL_SECONDS", 2_592_000)?,
            admin_allowlist: split_comma_list(&admin_allowlist),
        })
    }
}

/// Parse an optional environment variable with a default.
fn parse_var<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match std::env::var(name) {
        Ok(value) => value.parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Split a comma-separated list, trimming whitespace and dropping empties.
fn split_comma_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}
