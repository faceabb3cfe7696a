// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atrium Works

//! # API Data Models
//!
//! This module defines the domain records owned by the directory collaborators
//! and the request/response structures used by the REST API. All API-facing
//! types derive `Serialize`, `Deserialize`, and `ToSchema` for automatic JSON
//! handling and OpenAPI documentation.
//!
//! ## Model Categories
//!
//! - **Employees / Groups**: records consulted during mini-app authentication
//! - **Admin Accounts**: records consulted during portal login and guard checks
//! - **Session DTOs**: login/refresh token exchange payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
// Directory Records
// =============================================================================

/// An employee known to the backing directory.
///
/// Resolved during mini-app authentication and attached to the request as the
/// end-user principal's backing record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct EmployeeRecord {
    /// Internal record identifier.
    pub id: String,
    /// Telegram user id (decimal string) presented by the mini app.
    pub external_id: String,
    /// Display name shown in the mini app.
    pub display_name: String,
    /// Telegram username, if the user has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Record creation time.
    pub created_at: DateTime<Utc>,
}

/// A group chat registered as a tenant scope.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct GroupRecord {
    /// Internal record identifier.
    pub id: String,
    /// Telegram chat id (decimal string, negative for groups).
    pub chat_id: String,
    /// Group title.
    pub title: String,
    /// Record creation time.
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Admin Accounts
// =============================================================================

/// Account status for administrator accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Account may log in and hold valid tokens.
    Active,
    /// Account is disabled; login and guard checks reject it.
    Inactive,
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountStatus::Active => write!(f, "active"),
            AccountStatus::Inactive => write!(f, "inactive"),
        }
    }
}

/// Administrator role carried in access-token claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AdminRole {
    /// Full access to the admin portal.
    Owner,
    /// Regular administrator.
    Admin,
}

impl AdminRole {
    /// Parse a role from its lowercase string form.
    pub fn parse(s: &str) -> Option<AdminRole> {
        match s {
            "owner" => Some(AdminRole::Owner),
            "admin" => Some(AdminRole::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for AdminRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdminRole::Owner => write!(f, "owner"),
            AdminRole::Admin => write!(f, "admin"),
        }
    }
}

/// An administrator account owned by the admin-account collaborator store.
///
/// Created or updated during portal login; read during guard checks.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct AdminAccountRecord {
    /// Internal record identifier.
    pub id: String,
    /// Telegram user id (decimal string) from the login-widget payload.
    pub external_id: String,
    /// First name from the widget profile.
    pub first_name: String,
    /// Last name from the widget profile, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Telegram username, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Portal role.
    pub role: AdminRole,
    /// Account status.
    pub status: AccountStatus,
    /// Record creation time.
    pub created_at: DateTime<Utc>,
    /// Last successful portal login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl AdminAccountRecord {
    /// Display name composed from the profile fields.
    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}

// =============================================================================
// Session DTOs
// =============================================================================

/// Admin portal login request: the login-widget payload as received from
/// Telegram. The `hash` signs exactly the other fields that were sent, so
/// absent optional fields are omitted from the check-string.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminLoginRequest {
    /// Telegram user id.
    pub id: i64,
    /// First name from the widget profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Last name from the widget profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Telegram username.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Profile photo URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// Widget signing time, Unix seconds.
    pub auth_date: i64,
    /// Hex HMAC signature over the remaining fields.
    pub hash: String,
}

/// Access + refresh token pair issued on successful login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPairResponse {
    /// Short-lived access token (JWT).
    pub access_token: String,
    /// Long-lived refresh token (JWT).
    pub refresh_token: String,
    /// Always `Bearer`.
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// Refresh request carrying the long-lived refresh token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshRequest {
    /// The refresh token issued at login.
    pub refresh_token: String,
}

/// New access token issued on refresh.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccessTokenResponse {
    /// Short-lived access token (JWT).
    pub access_token: String,
    /// Always `Bearer`.
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// Authenticated mini-app caller profile.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    /// Telegram user id of the caller.
    pub external_id: String,
    /// Display name from the employee record.
    pub display_name: String,
    /// Telegram username, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Resolved group scope, when the request carried `group_chat_id`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupRecord>,
}

/// Authenticated admin profile.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminMeResponse {
    /// Telegram user id of the administrator.
    pub external_id: String,
    /// Display name composed from profile fields.
    pub display_name: String,
    /// Telegram username, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Portal role.
    pub role: AdminRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_status_serializes_lowercase() {
        let json = serde_json::to_string(&AccountStatus::Active).unwrap();
        assert_eq!(json, r#""active""#);
        let back: AccountStatus = serde_json::from_str(r#""inactive""#).unwrap();
        assert_eq!(back, AccountStatus::Inactive);
    }

    #[test]
    fn admin_role_parses() {
        assert_eq!(AdminRole::parse("owner"), Some(AdminRole::Owner));
        assert_eq!(AdminRole::parse("admin"), Some(AdminRole::Admin));
        assert_eq!(AdminRole::parse("superuser"), None);
    }

    #[test]
    fn display_name_joins_profile_fields() {
        let record = AdminAccountRecord {
            id: "a-1".to_string(),
            external_id: "42".to_string(),
            first_name: "Ada".to_string(),
            last_name: Some("Lovelace".to_string()),
            username: None,
            role: AdminRole::Admin,
            status: AccountStatus::Active,
            created_at: Utc::now(),
            last_login_at: None,
        };
        assert_eq!(record.display_name(), "Ada Lovelace");
    }

    #[test]
    fn login_request_accepts_partial_profile() {
        let request: AdminLoginRequest = serde_json::from_str(
            r#"{"id": 42, "first_name": "Ada", "auth_date": 1700000000, "hash": "ff"}"#,
        )
        .unwrap();
        assert_eq!(request.id, 42);
        assert!(request.last_name.is_none());
        assert_eq!(request.hash, "ff");
    }
}
