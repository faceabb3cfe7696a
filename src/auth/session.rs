// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atrium Works

//! Admin session tokens.
//!
//! The portal performs one signed login (login-widget payload, Scheme B) and
//! from then on presents bearer tokens. Two token kinds are issued:
//!
//! - **access**: short TTL, carries the profile claims handlers need
//! - **refresh**: long TTL, carries only the subject
//!
//! Both are HS256 JWTs validated statelessly (signature + expiry); there is
//! no server-side revocation list. An inactive or deleted account is caught
//! on refresh and on every guard check, which re-resolves the account.

use std::collections::BTreeMap;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::error::AuthError;
use crate::auth::freshness::{check_timestamp_freshness, FreshnessError};
use crate::auth::principal::AdminPrincipal;
use crate::auth::signature::{verify_login_widget_signature, SignedPayload};
use crate::config::AuthSettings;
use crate::directory::AdminAccountStore;
use crate::models::{AccountStatus, AdminAccountRecord, AdminRole};

/// Clock skew tolerance for token validation (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

const KIND_ACCESS: &str = "access";
const KIND_REFRESH: &str = "refresh";

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject: the admin's Telegram user id.
    pub sub: String,
    /// Display name at issuance time.
    pub name: String,
    /// Username at issuance time, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Portal role at issuance time.
    pub role: AdminRole,
    /// Token kind discriminator (`access`).
    pub kind: String,
    /// Issued-at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

/// Claims carried by a refresh token: subject only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Subject: the admin's Telegram user id.
    pub sub: String,
    /// Token kind discriminator (`refresh`).
    pub kind: String,
    /// Issued-at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

/// Access + refresh pair issued at login.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// Issues and validates admin session tokens; performs the signed login.
pub struct SessionIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl_seconds: u64,
    refresh_ttl_seconds: u64,
    bot_token: String,
    max_payload_age_seconds: u64,
    allowlist: Vec<String>,
}

impl SessionIssuer {
    pub fn new(settings: &AuthSettings) -> Self {
        Self {
            encoding: EncodingKey::from_secret(settings.session_secret.as_bytes()),
            decoding: DecodingKey::from_secret(settings.session_secret.as_bytes()),
            access_ttl_seconds: settings.access_token_ttl_seconds,
            refresh_ttl_seconds: settings.refresh_token_ttl_seconds,
            bot_token: settings.bot_token.clone(),
            max_payload_age_seconds: settings.max_payload_age_seconds,
            allowlist: settings.admin_allowlist.clone(),
        }
    }

    /// Access token lifetime in seconds.
    pub fn access_ttl_seconds(&self) -> u64 {
        self.access_ttl_seconds
    }

    /// Perform a one-time signed login with a login-widget payload.
    ///
    /// Verifies the Scheme B signature and freshness, enforces the
    /// administrator allow-list, creates or updates the account record
    /// (profile fields and `last_login_at`), rejects inactive accounts, and
    /// issues an access + refresh pair.
    pub fn login(
        &self,
        fields: BTreeMap<String, String>,
        admins: &dyn AdminAccountStore,
    ) -> Result<(TokenPair, AdminAccountRecord), AuthError> {
        let payload =
            SignedPayload::from_fields(fields).map_err(|_| AuthError::MalformedPayload)?;

        if !verify_login_widget_signature(&payload, &self.bot_token) {
            return Err(AuthError::InvalidSignature);
        }

        if let Some(auth_date) = payload.auth_date() {
            check_timestamp_freshness(
                auth_date,
                self.max_payload_age_seconds,
                Utc::now().timestamp(),
            )
            .map_err(|e| match e {
                FreshnessError::Expired => AuthError::Expired,
                FreshnessError::FutureTimestamp => AuthError::FutureTimestamp,
                FreshnessError::MalformedTimestamp => AuthError::MalformedPayload,
            })?;
        }

        let external_id = payload
            .get("id")
            .ok_or(AuthError::MissingPrincipalId)?
            .to_string();

        if !self.allowlist.iter().any(|id| *id == external_id) {
            tracing::warn!(%external_id, "login attempt by non-whitelisted id");
            return Err(AuthError::NotWhitelisted);
        }

        let existing = admins.find_by_external_id(&external_id).map_err(|e| {
            tracing::error!(error = %e, "admin store lookup failed during login");
            AuthError::Internal
        })?;

        let now = Utc::now();
        let record = match existing {
            Some(mut account) => {
                if let Some(first_name) = payload.get("first_name") {
                    account.first_name = first_name.to_string();
                }
                if let Some(last_name) = payload.get("last_name") {
                    account.last_name = Some(last_name.to_string());
                }
                if let Some(username) = payload.get("username") {
                    account.username = Some(username.to_string());
                }
                account.last_login_at = Some(now);
                account
            }
            None => AdminAccountRecord {
                id: Uuid::new_v4().to_string(),
                external_id: external_id.clone(),
                first_name: payload
                    .get("first_name")
                    .unwrap_or("Administrator")
                    .to_string(),
                last_name: payload.get("last_name").map(str::to_string),
                username: payload.get("username").map(str::to_string),
                role: AdminRole::Admin,
                status: AccountStatus::Active,
                created_at: now,
                last_login_at: Some(now),
            },
        };

        let record = admins.upsert(record).map_err(|e| {
            tracing::error!(error = %e, "admin store upsert failed during login");
            AuthError::Internal
        })?;

        if record.status != AccountStatus::Active {
            return Err(AuthError::AccountInactive);
        }

        let pair = TokenPair {
            access_token: self.mint_access(&record)?,
            refresh_token: self.mint_refresh(&record)?,
            expires_in: self.access_ttl_seconds,
        };
        tracing::info!(external_id = %record.external_id, "admin login succeeded");
        Ok((pair, record))
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// Re-resolves the account so a deactivated or deleted administrator
    /// cannot extend their session.
    pub fn refresh(
        &self,
        refresh_token: &str,
        admins: &dyn AdminAccountStore,
    ) -> Result<(String, AdminAccountRecord), AuthError> {
        let claims = self.decode_refresh(refresh_token)?;

        let account = admins.find_by_external_id(&claims.sub).map_err(|e| {
            tracing::error!(error = %e, "admin store lookup failed during refresh");
            AuthError::Internal
        })?;

        let account = account.ok_or(AuthError::AccountMissing)?;
        if account.status != AccountStatus::Active {
            return Err(AuthError::AccountInactive);
        }

        Ok((self.mint_access(&account)?, account))
    }

    /// Guard check: validate a bearer `Authorization` header value and
    /// re-resolve the backing admin account.
    ///
    /// Invalid, expired, or missing tokens map to 401-class errors; a
    /// missing or inactive account maps to 403-class errors. The optional
    /// variant is built on top of this by discarding the error.
    pub fn guard(
        &self,
        bearer: Option<&str>,
        admins: &dyn AdminAccountStore,
    ) -> Result<AdminPrincipal, AuthError> {
        let header = bearer.ok_or(AuthError::MissingAuthData)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::TokenInvalid)?
            .trim();

        let claims = self.verify_access(token)?;

        let account = admins.find_by_external_id(&claims.sub).map_err(|e| {
            tracing::error!(error = %e, "admin store lookup failed during guard check");
            AuthError::Internal
        })?;

        let account = account.ok_or(AuthError::AccountMissing)?;
        if account.status != AccountStatus::Active {
            return Err(AuthError::AccountInactive);
        }
        Ok(AdminPrincipal::from(account))
    }

    /// Validate an access token and return its claims.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let data = decode::<AccessClaims>(token, &self.decoding, &self.validation())
            .map_err(map_token_error)?;
        if data.claims.kind != KIND_ACCESS {
            return Err(AuthError::TokenInvalid);
        }
        Ok(data.claims)
    }

    fn decode_refresh(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        let data = decode::<RefreshClaims>(token, &self.decoding, &self.validation())
            .map_err(map_token_error)?;
        if data.claims.kind != KIND_REFRESH {
            return Err(AuthError::TokenInvalid);
        }
        Ok(data.claims)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_aud = false;
        validation
    }

    fn mint_access(&self, account: &AdminAccountRecord) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: account.external_id.clone(),
            name: account.display_name(),
            username: account.username.clone(),
            role: account.role,
            kind: KIND_ACCESS.to_string(),
            iat: now,
            exp: now + self.access_ttl_seconds as i64,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            tracing::error!(error = %e, "access token encoding failed");
            AuthError::Internal
        })
    }

    fn mint_refresh(&self, account: &AdminAccountRecord) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = RefreshClaims {
            sub: account.external_id.clone(),
            kind: KIND_REFRESH.to_string(),
            iat: now,
            exp: now + self.refresh_ttl_seconds as i64,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            tracing::error!(error = %e, "refresh token encoding failed");
            AuthError::Internal
        })
    }
}

fn map_token_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::TokenInvalid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::signature::testkit;
    use crate::auth::testing;
    use crate::directory::InMemoryDirectory;

    fn issuer() -> SessionIssuer {
        SessionIssuer::new(&testing::settings())
    }

    fn widget_fields(id: &str) -> BTreeMap<String, String> {
        let auth_date = Utc::now().timestamp().to_string();
        testkit::signed_widget_fields(
            &[
                ("id", id),
                ("first_name", "Ada"),
                ("username", "ada"),
                ("auth_date", &auth_date),
            ],
            &testing::settings().bot_token,
        )
    }

    #[test]
    fn login_issues_pair_for_whitelisted_active_account() {
        let issuer = issuer();
        let admins = InMemoryDirectory::new();

        let (pair, record) = issuer.login(widget_fields("42"), &admins).unwrap();
        assert_eq!(record.external_id, "42");
        assert_eq!(record.first_name, "Ada");
        assert!(record.last_login_at.is_some());
        assert_eq!(pair.expires_in, issuer.access_ttl_seconds());

        let claims = issuer.verify_access(&pair.access_token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.name, "Ada");
        assert_eq!(claims.username.as_deref(), Some("ada"));
        assert_eq!(claims.role, AdminRole::Admin);
    }

    #[test]
    fn login_rejects_non_whitelisted_id() {
        let issuer = issuer();
        let admins = InMemoryDirectory::new();

        let err = issuer.login(widget_fields("999"), &admins).unwrap_err();
        assert_eq!(err, AuthError::NotWhitelisted);
    }

    #[test]
    fn login_rejects_inactive_account() {
        let issuer = issuer();
        let admins = InMemoryDirectory::new();
        admins.insert_admin("42", "Ada", AccountStatus::Inactive);

        let err = issuer.login(widget_fields("42"), &admins).unwrap_err();
        assert_eq!(err, AuthError::AccountInactive);
    }

    #[test]
    fn login_rejects_tampered_signature() {
        let issuer = issuer();
        let admins = InMemoryDirectory::new();

        let mut fields = widget_fields("42");
        fields.insert("first_name".to_string(), "Mallory".to_string());

        let err = issuer.login(fields, &admins).unwrap_err();
        assert_eq!(err, AuthError::InvalidSignature);
    }

    #[test]
    fn login_rejects_stale_payload() {
        let issuer = issuer();
        let admins = InMemoryDirectory::new();

        let stale = (Utc::now().timestamp() - 7200).to_string();
        let fields = testkit::signed_widget_fields(
            &[("id", "42"), ("first_name", "Ada"), ("auth_date", &stale)],
            &testing::settings().bot_token,
        );

        let err = issuer.login(fields, &admins).unwrap_err();
        assert_eq!(err, AuthError::Expired);
    }

    #[test]
    fn login_updates_existing_profile() {
        let issuer = issuer();
        let admins = InMemoryDirectory::new();
        admins.insert_admin("42", "Old Name", AccountStatus::Active);

        let (_, record) = issuer.login(widget_fields("42"), &admins).unwrap();
        assert_eq!(record.first_name, "Ada");
        assert_eq!(record.username.as_deref(), Some("ada"));
    }

    #[test]
    fn refresh_issues_new_access_token() {
        let issuer = issuer();
        let admins = InMemoryDirectory::new();
        let (pair, _) = issuer.login(widget_fields("42"), &admins).unwrap();

        let (access, record) = issuer.refresh(&pair.refresh_token, &admins).unwrap();
        assert_eq!(record.external_id, "42");
        assert_eq!(issuer.verify_access(&access).unwrap().sub, "42");
    }

    #[test]
    fn refresh_rejects_access_token() {
        let issuer = issuer();
        let admins = InMemoryDirectory::new();
        let (pair, _) = issuer.login(widget_fields("42"), &admins).unwrap();

        let err = issuer.refresh(&pair.access_token, &admins).unwrap_err();
        assert_eq!(err, AuthError::TokenInvalid);
    }

    #[test]
    fn refresh_rejects_deactivated_account() {
        let issuer = issuer();
        let admins = InMemoryDirectory::new();
        let (pair, mut record) = issuer.login(widget_fields("42"), &admins).unwrap();

        record.status = AccountStatus::Inactive;
        admins.upsert(record).unwrap();

        let err = issuer.refresh(&pair.refresh_token, &admins).unwrap_err();
        assert_eq!(err, AuthError::AccountInactive);
    }

    #[test]
    fn refresh_rejects_missing_account() {
        let issuer = issuer();
        let admins = InMemoryDirectory::new();
        let (pair, _) = issuer.login(widget_fields("42"), &admins).unwrap();

        // A fresh store simulates the account having been deleted.
        let empty = InMemoryDirectory::new();
        let err = issuer.refresh(&pair.refresh_token, &empty).unwrap_err();
        assert_eq!(err, AuthError::AccountMissing);
    }

    #[test]
    fn verify_access_rejects_garbage_and_refresh_tokens() {
        let issuer = issuer();
        let admins = InMemoryDirectory::new();
        let (pair, _) = issuer.login(widget_fields("42"), &admins).unwrap();

        assert_eq!(
            issuer.verify_access("not-a-token").unwrap_err(),
            AuthError::TokenInvalid
        );
        assert_eq!(
            issuer.verify_access(&pair.refresh_token).unwrap_err(),
            AuthError::TokenInvalid
        );
    }

    #[test]
    fn verify_access_rejects_expired_token() {
        let issuer = issuer();
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: "42".to_string(),
            name: "Ada".to_string(),
            username: None,
            role: AdminRole::Admin,
            kind: KIND_ACCESS.to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &issuer.encoding).unwrap();

        assert_eq!(
            issuer.verify_access(&token).unwrap_err(),
            AuthError::TokenExpired
        );
    }

    #[test]
    fn tampered_claims_invalidate_signature() {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

        let issuer = issuer();
        let admins = InMemoryDirectory::new();
        let (pair, _) = issuer.login(widget_fields("42"), &admins).unwrap();

        // Swap the subject inside the claims segment, keeping the original
        // signature.
        let parts: Vec<&str> = pair.access_token.split('.').collect();
        let claims_json = String::from_utf8(URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        let tampered = URL_SAFE_NO_PAD
            .encode(claims_json.replace(r#""sub":"42""#, r#""sub":"999""#).as_bytes());
        let forged = format!("{}.{}.{}", parts[0], tampered, parts[2]);

        assert_eq!(
            issuer.verify_access(&forged).unwrap_err(),
            AuthError::TokenInvalid
        );
    }

    #[test]
    fn guard_resolves_active_account() {
        let issuer = issuer();
        let admins = InMemoryDirectory::new();
        let (pair, _) = issuer.login(widget_fields("42"), &admins).unwrap();

        let header = format!("Bearer {}", pair.access_token);
        let principal = issuer.guard(Some(&header), &admins).unwrap();
        assert_eq!(principal.external_id, "42");
        assert_eq!(principal.display_name, "Ada");
    }

    #[test]
    fn guard_rejects_missing_header() {
        let issuer = issuer();
        let admins = InMemoryDirectory::new();
        assert_eq!(
            issuer.guard(None, &admins).unwrap_err(),
            AuthError::MissingAuthData
        );
    }

    #[test]
    fn guard_rejects_non_bearer_header() {
        let issuer = issuer();
        let admins = InMemoryDirectory::new();
        assert_eq!(
            issuer.guard(Some("Basic dXNlcg=="), &admins).unwrap_err(),
            AuthError::TokenInvalid
        );
    }

    #[test]
    fn guard_rejects_deactivated_account() {
        let issuer = issuer();
        let admins = InMemoryDirectory::new();
        let (pair, mut record) = issuer.login(widget_fields("42"), &admins).unwrap();

        record.status = AccountStatus::Inactive;
        admins.upsert(record).unwrap();

        let header = format!("Bearer {}", pair.access_token);
        assert_eq!(
            issuer.guard(Some(&header), &admins).unwrap_err(),
            AuthError::AccountInactive
        );
    }

    #[test]
    fn guard_rejects_deleted_account() {
        let issuer = issuer();
        let admins = InMemoryDirectory::new();
        let (pair, _) = issuer.login(widget_fields("42"), &admins).unwrap();

        let header = format!("Bearer {}", pair.access_token);
        let empty = InMemoryDirectory::new();
        assert_eq!(
            issuer.guard(Some(&header), &empty).unwrap_err(),
            AuthError::AccountMissing
        );
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let issuer = issuer();
        let mut other_settings = testing::settings();
        other_settings.session_secret = "another-secret-another-secret-another-secret".to_string();
        let other = SessionIssuer::new(&other_settings);

        let admins = InMemoryDirectory::new();
        let (pair, _) = other.login(widget_fields("42"), &admins).unwrap();

        assert_eq!(
            issuer.verify_access(&pair.access_token).unwrap_err(),
            AuthError::TokenInvalid
        );
    }
}
