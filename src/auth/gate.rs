// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atrium Works

//! The per-request authentication gate.
//!
//! Every request entering the protected namespace passes through
//! [`auth_gate`] before reaching its handler:
//!
//! 1. Disabled subsystem, exempt paths, and paths outside the protected
//!    namespace pass through untouched.
//! 2. A bearer token, when present, authenticates the caller as an admin.
//! 3. Otherwise the signed mini-app payload is extracted (header, then JSON
//!    body field, then form field), verified, freshness-checked, rate-limited
//!    and resolved against the employee directory.
//!
//! Under strict mode every failure rejects with its mapped status; under
//! permissive mode most failures pass the request through unauthenticated
//! (logged), except a missing principal id and rate limiting, which reject in
//! both modes.
//!
//! The decision core ([`decide`]) is a pure function over the request parts
//! and buffered body returning a tagged outcome; only the middleware itself
//! touches transport I/O.

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{Request, State},
    http::{header::AUTHORIZATION, header::CONTENT_TYPE, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::auth::error::AuthError;
use crate::auth::freshness::{check_timestamp_freshness, FreshnessError};
use crate::auth::principal::{AuthContext, EndUserPrincipal, Principal};
use crate::auth::signature::{verify_mini_app_signature, SignedPayload};
use crate::error::ApiError;
use crate::state::AppState;

/// Dedicated header carrying the raw mini-app init data.
pub const INIT_DATA_HEADER: &str = "x-telegram-init-data";
/// Body field carrying the raw mini-app init data.
pub const INIT_DATA_FIELD: &str = "initData";
/// Optional body field referencing a registered group chat.
pub const GROUP_SCOPE_FIELD: &str = "group_chat_id";

/// Upper bound on buffered request bodies. The gate only needs the body to
/// read `initData`/`group_chat_id`; anything larger is not an auth payload.
const MAX_BUFFERED_BODY_BYTES: usize = 256 * 1024;

/// Outcome of the per-request decision procedure.
#[derive(Debug, PartialEq)]
enum GateOutcome {
    /// Attach the context and continue to the handler.
    Authenticated(AuthContext),
    /// Continue unauthenticated (exempt, disabled, or permissive fallback).
    Anonymous,
    /// Short-circuit with the mapped error response.
    Reject(AuthError),
}

/// Authentication middleware applied to the whole router.
pub async fn auth_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let settings = &state.settings;
    let path = request.uri().path();

    if !settings.enabled
        || is_exempt(path, &settings.exempt_paths)
        || !path.starts_with(&settings.protected_prefix)
    {
        return next.run(request).await;
    }

    let (mut parts, body) = request.into_parts();
    let bytes = match to_bytes(body, MAX_BUFFERED_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
                .into_response()
        }
    };

    let body_fields = BodyFields::extract(&parts.headers, &bytes);
    let outcome = decide(&state, &parts.headers, &body_fields);

    let context = match outcome {
        GateOutcome::Reject(err) => {
            tracing::debug!(code = err.error_code(), path = %parts.uri.path(), "request rejected");
            return err.into_response();
        }
        GateOutcome::Authenticated(context) => context,
        GateOutcome::Anonymous => AuthContext::anonymous(),
    };

    parts.extensions.insert(context);
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

/// Prefix match against the configured exemption list.
fn is_exempt(path: &str, exempt_paths: &[String]) -> bool {
    exempt_paths.iter().any(|prefix| path.starts_with(prefix))
}

/// Auth-relevant fields pulled from a buffered JSON or form body.
#[derive(Debug, Default, Clone)]
struct BodyFields {
    init_data: Option<String>,
    group_chat_id: Option<String>,
}

impl BodyFields {
    fn extract(headers: &HeaderMap, bytes: &Bytes) -> Self {
        if bytes.is_empty() {
            return Self::default();
        }

        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        if content_type.starts_with("application/json") {
            let Ok(value) = serde_json::from_slice::<serde_json::Value>(bytes) else {
                return Self::default();
            };
            return Self {
                init_data: scalar_field(&value, INIT_DATA_FIELD),
                group_chat_id: scalar_field(&value, GROUP_SCOPE_FIELD),
            };
        }

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let mut fields = Self::default();
            for (key, value) in url::form_urlencoded::parse(bytes) {
                match key.as_ref() {
                    INIT_DATA_FIELD => fields.init_data = Some(value.into_owned()),
                    GROUP_SCOPE_FIELD => fields.group_chat_id = Some(value.into_owned()),
                    _ => {}
                }
            }
            return fields;
        }

        Self::default()
    }
}

/// Read a top-level scalar body field as a string; numbers are accepted in
/// their decimal form.
fn scalar_field(value: &serde_json::Value, key: &str) -> Option<String> {
    match value.get(key) {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// The decision procedure over an in-namespace, non-exempt request.
fn decide(state: &AppState, headers: &HeaderMap, body: &BodyFields) -> GateOutcome {
    let settings = &state.settings;

    // Admin portal branch: a bearer token replaces the signed payload.
    if let Some(value) = headers.get(AUTHORIZATION) {
        let guarded = state
            .sessions
            .guard(value.to_str().ok(), state.admins.as_ref());
        return match guarded {
            Ok(admin) => GateOutcome::Authenticated(AuthContext {
                principal: Some(Principal::Admin(admin)),
                group: None,
            }),
            Err(err @ AuthError::Internal) => GateOutcome::Reject(err),
            Err(err) => soften(err, settings.strict),
        };
    }

    // Payload locations in precedence order: header, JSON body, form body.
    let raw = headers
        .get(INIT_DATA_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| body.init_data.clone());

    let Some(raw) = raw else {
        return soften(AuthError::MissingAuthData, settings.strict);
    };

    let payload = match SignedPayload::parse(&raw) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::debug!(error = %err, "init data failed to parse");
            return soften(AuthError::MalformedPayload, settings.strict);
        }
    };

    if !verify_mini_app_signature(&payload, &settings.bot_token) {
        return soften(AuthError::InvalidSignature, settings.strict);
    }

    // An absent auth_date skips the freshness check rather than failing it.
    if let Some(auth_date) = payload.auth_date() {
        let checked = check_timestamp_freshness(
            auth_date,
            settings.max_payload_age_seconds,
            Utc::now().timestamp(),
        );
        if let Err(err) = checked {
            let mapped = match err {
                FreshnessError::Expired => AuthError::Expired,
                FreshnessError::FutureTimestamp => AuthError::FutureTimestamp,
                FreshnessError::MalformedTimestamp => AuthError::MalformedPayload,
            };
            return soften(mapped, settings.strict);
        }
    }

    // Identity is mandatory once a signature passed, regardless of mode.
    let user = match payload.user() {
        Some(Ok(user)) => user,
        _ => return GateOutcome::Reject(AuthError::MissingPrincipalId),
    };

    // Rate limiting rejects in both modes.
    let decision = state.limiter.check(&user.id);
    if !decision.allowed {
        return GateOutcome::Reject(AuthError::RateLimited {
            retry_after_seconds: decision.retry_after_seconds,
        });
    }

    let record = match state
        .identity_cache
        .resolve(&user.id, state.employees.as_ref())
    {
        Ok(Some(record)) => record,
        Ok(None) => return soften(AuthError::UnknownPrincipal, settings.strict),
        Err(err) => {
            tracing::error!(error = %err, "employee lookup failed");
            return GateOutcome::Reject(AuthError::Internal);
        }
    };

    // Group scope is resolved uncached; an unresolvable reference is a hard
    // 404 in both modes.
    let group = match &body.group_chat_id {
        Some(chat_id) => match state.groups.find_by_chat_id(chat_id) {
            Ok(Some(group)) => Some(group),
            Ok(None) => return GateOutcome::Reject(AuthError::UnknownScope),
            Err(err) => {
                tracing::error!(error = %err, "group lookup failed");
                return GateOutcome::Reject(AuthError::Internal);
            }
        },
        None => None,
    };

    GateOutcome::Authenticated(AuthContext {
        principal: Some(Principal::EndUser(EndUserPrincipal {
            external_id: user.id,
            record,
        })),
        group,
    })
}

/// Apply the strict/permissive policy to a failure.
fn soften(err: AuthError, strict: bool) -> GateOutcome {
    if strict {
        GateOutcome::Reject(err)
    } else {
        tracing::warn!(
            code = err.error_code(),
            "auth failure passed through in permissive mode"
        );
        GateOutcome::Anonymous
    }
}
