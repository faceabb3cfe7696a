// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atrium Works

//! # Authentication Module
//!
//! This module gates every inbound request to the API.
//!
//! ## Auth Flow
//!
//! 1. The Telegram Mini App sends the platform-signed init data with each
//!    request (`X-Telegram-Init-Data` header, or an `initData` body field).
//! 2. The [`gate::auth_gate`] middleware verifies the signature and
//!    freshness, rate-limits the caller, resolves the employee record
//!    through a short-TTL cache, and attaches the principal to the request.
//! 3. The admin portal performs one signed login (`login-widget` payload)
//!    and from then on presents `Authorization: Bearer <token>`, validated
//!    by the [`session::SessionIssuer`].
//!
//! ## Security
//!
//! - Both signature schemes compare digests in constant time
//! - Signed payloads expire after a configurable age (60 s skew allowance)
//! - Per-principal sliding-window rate limiting runs before any directory
//!   lookup that a forged burst could amplify
//! - Strict mode hard-rejects all failures; permissive mode passes requests
//!   through unauthenticated but never waives the principal-id or rate-limit
//!   checks

pub mod cache;
pub mod error;
pub mod extractor;
pub mod freshness;
pub mod gate;
pub mod principal;
pub mod rate_limit;
pub mod session;
pub mod signature;

pub use cache::IdentityCache;
pub use error::AuthError;
pub use extractor::{AdminAuth, CurrentUser, MaybeAuthContext, OptionalAdminAuth};
pub use gate::auth_gate;
pub use principal::{AdminPrincipal, AuthContext, EndUserPrincipal, Principal};
pub use rate_limit::SlidingWindowLimiter;
pub use session::SessionIssuer;

/// Shared fixtures for the crate's test suites.
#[cfg(test)]
pub(crate) mod testing {
    use crate::config::AuthSettings;

    /// Strict-mode settings with a deterministic bot token and a small rate
    /// limit so limiter tests stay fast. Tests override fields as needed.
    pub fn settings() -> AuthSettings {
        AuthSettings {
            enabled: true,
            strict: true,
            bot_token: "123456:TEST-TOKEN-abcdef".to_string(),
            session_secret: "unit-test-session-secret-0123456789abcdef".to_string(),
            exempt_paths: vec![
                "/health".to_string(),
                "/docs".to_string(),
                "/api-doc".to_string(),
                "/v1/admin/login".to_string(),
                "/v1/admin/refresh".to_string(),
                "/v1/webhook".to_string(),
            ],
            protected_prefix: "/v1".to_string(),
            max_payload_age_seconds: 3600,
            cache_ttl_seconds: 60,
            cache_capacity: 64,
            rate_limit_window_seconds: 60,
            rate_limit_per_principal: 3,
            access_token_ttl_seconds: 3600,
            refresh_token_ttl_seconds: 86_400,
            admin_allowlist: vec!["42".to_string()],
        }
    }
}
