// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atrium Works

//! Authentication errors.
//!
//! Every gate-level failure maps deterministically to one HTTP status and a
//! stable machine-readable code. Internal errors are logged with full context
//! at the point of origin and surfaced as a generic 500.

use axum::{
    http::{header::RETRY_AFTER, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No signed payload present on a protected request
    MissingAuthData,
    /// Signed payload could not be parsed into key/value fields
    MalformedPayload,
    /// Payload hash does not match the computed digest
    InvalidSignature,
    /// Payload is older than the configured maximum age
    Expired,
    /// Payload auth_date lies too far in the future
    FutureTimestamp,
    /// Verified payload carries no principal id
    MissingPrincipalId,
    /// Principal exceeded the sliding-window admission limit
    RateLimited {
        /// Seconds until the oldest window entry expires
        retry_after_seconds: u64,
    },
    /// Verified principal has no backing directory record
    UnknownPrincipal,
    /// Request-scoped group reference could not be resolved
    UnknownScope,
    /// Login id is not on the administrator allow-list
    NotWhitelisted,
    /// Admin account exists but is inactive
    AccountInactive,
    /// Admin account no longer exists
    AccountMissing,
    /// Bearer token has expired
    TokenExpired,
    /// Bearer token is malformed or carries an invalid signature
    TokenInvalid,
    /// Unexpected internal failure; detail is logged, never returned
    Internal,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

impl AuthError {
    /// Get the machine-readable code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthData => "missing_auth_data",
            AuthError::MalformedPayload => "malformed_payload",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::Expired => "auth_expired",
            AuthError::FutureTimestamp => "auth_date_in_future",
            AuthError::MissingPrincipalId => "missing_principal_id",
            AuthError::RateLimited { .. } => "rate_limited",
            AuthError::UnknownPrincipal => "unknown_principal",
            AuthError::UnknownScope => "unknown_scope",
            AuthError::NotWhitelisted => "not_admin",
            AuthError::AccountInactive => "account_inactive",
            AuthError::AccountMissing => "account_missing",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenInvalid => "token_invalid",
            AuthError::Internal => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthData
            | AuthError::MalformedPayload
            | AuthError::InvalidSignature
            | AuthError::Expired
            | AuthError::FutureTimestamp
            | AuthError::MissingPrincipalId
            | AuthError::TokenExpired
            | AuthError::TokenInvalid => StatusCode::UNAUTHORIZED,
            AuthError::UnknownPrincipal
            | AuthError::NotWhitelisted
            | AuthError::AccountInactive
            | AuthError::AccountMissing => StatusCode::FORBIDDEN,
            AuthError::UnknownScope => StatusCode::NOT_FOUND,
            AuthError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AuthError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingAuthData => write!(f, "Authentication data is required"),
            AuthError::MalformedPayload => write!(f, "Authentication payload is malformed"),
            AuthError::InvalidSignature => write!(f, "Authentication signature is invalid"),
            AuthError::Expired => write!(f, "Authentication data has expired"),
            AuthError::FutureTimestamp => {
                write!(f, "Authentication timestamp lies in the future")
            }
            AuthError::MissingPrincipalId => {
                write!(f, "Authentication payload carries no user id")
            }
            AuthError::RateLimited {
                retry_after_seconds,
            } => write!(f, "Too many requests, retry in {retry_after_seconds}s"),
            AuthError::UnknownPrincipal => write!(f, "User is not registered"),
            AuthError::UnknownScope => write!(f, "Group is not registered"),
            AuthError::NotWhitelisted => write!(f, "User is not an administrator"),
            AuthError::AccountInactive => write!(f, "Administrator account is inactive"),
            AuthError::AccountMissing => write!(f, "Administrator account no longer exists"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::TokenInvalid => write!(f, "Token is invalid"),
            AuthError::Internal => write!(f, "Internal server error"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retry_after = match &self {
            AuthError::RateLimited {
                retry_after_seconds,
            } => Some(*retry_after_seconds),
            _ => None,
        };
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            code: self.error_code().to_string(),
            retry_after,
        });

        let mut response = (status, body).into_response();
        if let Some(seconds) = retry_after {
            if let Ok(value) = seconds.to_string().parse() {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn missing_auth_returns_401() {
        let response = AuthError::MissingAuthData.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["code"], "missing_auth_data");
    }

    #[tokio::test]
    async fn unknown_principal_returns_403() {
        let response = AuthError::UnknownPrincipal.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unknown_scope_returns_404() {
        let response = AuthError::UnknownScope.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn rate_limited_sets_retry_after() {
        let response = AuthError::RateLimited {
            retry_after_seconds: 17,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(RETRY_AFTER).unwrap(), "17");

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["retry_after"], 17);
        assert_eq!(body["code"], "rate_limited");
    }

    #[tokio::test]
    async fn internal_error_body_is_generic() {
        let response = AuthError::Internal.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error"], "Internal server error");
    }

    #[test]
    fn not_whitelisted_maps_to_not_admin_code() {
        assert_eq!(AuthError::NotWhitelisted.error_code(), "not_admin");
        assert_eq!(AuthError::NotWhitelisted.status_code(), StatusCode::FORBIDDEN);
    }
}
