// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atrium Works

//! Signed-payload parsing and signature verification.
//!
//! Two signature schemes share the same check-string construction but derive
//! their HMAC secret differently:
//!
//! - **Mini-app init data** ([`verify_mini_app_signature`]): secret =
//!   `HMAC-SHA256(key = "WebAppData", message = bot_token)`.
//! - **Login widget** ([`verify_login_widget_signature`]): secret =
//!   `SHA256(bot_token)`.
//!
//! The two schemes are not interchangeable. They are kept as distinct named
//! procedures with independent test suites; a swapped secret derivation breaks
//! exactly one scheme's tests.
//!
//! Both verifiers are pure, compare digests in constant time, and return
//! `false` on mismatch rather than erroring.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Key-derivation domain string for the mini-app scheme.
const MINI_APP_KEY_DOMAIN: &[u8] = b"WebAppData";

/// Signed-payload parse failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("payload carries no hash field")]
    MissingHash,
    #[error("payload field appears more than once: {0}")]
    DuplicateKey(String),
}

/// A parsed signed payload: the claim fields with the detached `hash`.
///
/// Field order in the wire payload never affects verification; the fields are
/// held sorted and the check-string is built from that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPayload {
    fields: BTreeMap<String, String>,
    hash: String,
}

impl SignedPayload {
    /// Build a payload from already-decoded key/value fields.
    ///
    /// The `hash` field is extracted and excluded from the check-string.
    pub fn from_fields(mut fields: BTreeMap<String, String>) -> Result<Self, PayloadError> {
        let hash = fields.remove("hash").ok_or(PayloadError::MissingHash)?;
        Ok(Self { fields, hash })
    }

    /// Parse a raw url-encoded init-data string.
    ///
    /// Requires exactly one value per key and at least a `hash` field.
    pub fn parse(raw: &str) -> Result<Self, PayloadError> {
        let mut fields = BTreeMap::new();
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            if fields
                .insert(key.clone().into_owned(), value.into_owned())
                .is_some()
            {
                return Err(PayloadError::DuplicateKey(key.into_owned()));
            }
        }
        Self::from_fields(fields)
    }

    /// Look up a claim field.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// The `auth_date` claim, if present.
    pub fn auth_date(&self) -> Option<&str> {
        self.get("auth_date")
    }

    /// Decode the nested `user` claim, if present.
    pub fn user(&self) -> Option<Result<PayloadUser, serde_json::Error>> {
        self.get("user").map(serde_json::from_str)
    }

    /// Sorted `key=value` lines joined with `\n`; the `hash` field is
    /// excluded by construction.
    pub fn check_string(&self) -> String {
        build_check_string(&self.fields)
    }

    /// The detached hash supplied with the payload.
    pub fn supplied_hash(&self) -> &str {
        &self.hash
    }
}

/// The object decoded from the payload's nested `user` JSON claim.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PayloadUser {
    /// Telegram user id; accepted as a JSON number or string.
    #[serde(deserialize_with = "id_from_number_or_string")]
    pub id: String,
    /// First name, when the platform supplies one.
    #[serde(default)]
    pub first_name: Option<String>,
    /// Username, when the user has one.
    #[serde(default)]
    pub username: Option<String>,
}

fn id_from_number_or_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::String(s) => Ok(s),
        other => Err(serde::de::Error::custom(format!(
            "user id must be a number or string, got {other}"
        ))),
    }
}

fn build_check_string(fields: &BTreeMap<String, String>) -> String {
    let mut lines = Vec::with_capacity(fields.len());
    for (key, value) in fields {
        lines.push(format!("{key}={value}"));
    }
    lines.join("\n")
}

/// Hex digest for the mini-app scheme: the secret is the bot token keyed
/// under the `WebAppData` domain string.
fn mini_app_digest(bot_token: &str, check_string: &str) -> String {
    let mut derivation =
        HmacSha256::new_from_slice(MINI_APP_KEY_DOMAIN).expect("HMAC accepts any key length");
    derivation.update(bot_token.as_bytes());
    let secret = derivation.finalize().into_bytes();

    let mut mac = HmacSha256::new_from_slice(&secret).expect("HMAC accepts any key length");
    mac.update(check_string.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Hex digest for the login-widget scheme: the secret is the plain SHA-256
/// of the bot token, with no intermediate HMAC.
fn login_widget_digest(bot_token: &str, check_string: &str) -> String {
    let secret = Sha256::digest(bot_token.as_bytes());

    let mut mac = HmacSha256::new_from_slice(&secret).expect("HMAC accepts any key length");
    mac.update(check_string.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a mini-app init-data payload against the bot token.
pub fn verify_mini_app_signature(payload: &SignedPayload, bot_token: &str) -> bool {
    let expected = mini_app_digest(bot_token, &payload.check_string());
    expected.as_bytes().ct_eq(payload.hash.as_bytes()).into()
}

/// Verify a login-widget payload against the bot token.
pub fn verify_login_widget_signature(payload: &SignedPayload, bot_token: &str) -> bool {
    let expected = login_widget_digest(bot_token, &payload.check_string());
    expected.as_bytes().ct_eq(payload.hash.as_bytes()).into()
}

/// Test-only signing helpers. Payloads built here verify by construction,
/// which is what the round-trip properties in the gate and session tests
/// rely on.
#[cfg(test)]
pub(crate) mod testkit {
    use super::*;

    /// Build a raw url-encoded init-data string, signed for the mini-app
    /// scheme, preserving the given field order on the wire.
    pub fn signed_init_data(fields: &[(&str, &str)], bot_token: &str) -> String {
        let map: BTreeMap<String, String> = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let hash = mini_app_digest(bot_token, &build_check_string(&map));

        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in fields {
            serializer.append_pair(key, value);
        }
        serializer.append_pair("hash", &hash);
        serializer.finish()
    }

    /// Build login-widget fields (including `hash`) signed for scheme B.
    pub fn signed_widget_fields(fields: &[(&str, &str)], bot_token: &str) -> BTreeMap<String, String> {
        let mut map: BTreeMap<String, String> = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let hash = login_widget_digest(bot_token, &build_check_string(&map));
        map.insert("hash".to_string(), hash);
        map
    }
}
