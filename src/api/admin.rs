// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atrium Works

//! Admin portal endpoints: signed login, token refresh, and profile routes.

use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{AdminAuth, AuthError, OptionalAdminAuth};
use crate::models::{
    AccessTokenResponse, AdminLoginRequest, AdminMeResponse, RefreshRequest, TokenPairResponse,
};
use crate::state::AppState;

/// Portal overview, served to both authenticated and anonymous callers.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminOverviewResponse {
    pub service: String,
    /// Whether the caller presented a valid admin token.
    pub authenticated: bool,
    /// Display name of the authenticated viewer, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer: Option<String>,
}

/// One-time signed login with a Telegram login-widget payload.
#[utoipa::path(
    post,
    path = "/v1/admin/login",
    tag = "Admin",
    request_body = AdminLoginRequest,
    responses(
        (status = 200, description = "Access and refresh token pair", body = TokenPairResponse),
        (status = 401, description = "Invalid or stale widget payload"),
        (status = 403, description = "Not an administrator, or account inactive")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<AdminLoginRequest>,
) -> Result<Json<TokenPairResponse>, AuthError> {
    let fields = widget_fields(request);
    let (pair, _) = state.sessions.login(fields, state.admins.as_ref())?;

    Ok(Json(TokenPairResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: pair.expires_in,
    }))
}

/// Exchange a refresh token for a new access token.
#[utoipa::path(
    post,
    path = "/v1/admin/refresh",
    tag = "Admin",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = AccessTokenResponse),
        (status = 401, description = "Invalid or expired refresh token"),
        (status = 403, description = "Account inactive or deleted")
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<AccessTokenResponse>, AuthError> {
    let (access_token, _) = state
        .sessions
        .refresh(&request.refresh_token, state.admins.as_ref())?;

    Ok(Json(AccessTokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.sessions.access_ttl_seconds(),
    }))
}

/// Profile of the authenticated administrator.
#[utoipa::path(
    get,
    path = "/v1/admin/me",
    tag = "Admin",
    responses(
        (status = 200, description = "Administrator profile", body = AdminMeResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Account inactive or deleted")
    )
)]
pub async fn me(AdminAuth(admin): AdminAuth) -> Json<AdminMeResponse> {
    Json(AdminMeResponse {
        external_id: admin.external_id,
        display_name: admin.display_name,
        username: admin.username,
        role: admin.role,
    })
}

/// Portal overview; anonymous callers get the unpersonalized variant.
#[utoipa::path(
    get,
    path = "/v1/admin/overview",
    tag = "Admin",
    responses(
        (status = 200, description = "Portal overview", body = AdminOverviewResponse)
    )
)]
pub async fn overview(OptionalAdminAuth(admin): OptionalAdminAuth) -> Json<AdminOverviewResponse> {
    Json(AdminOverviewResponse {
        service: "atrium".to_string(),
        authenticated: admin.is_some(),
        viewer: admin.map(|a| a.display_name),
    })
}

/// Rebuild the key/value fields the widget signed. Numbers are hashed in
/// their decimal form; absent optional fields stay absent.
fn widget_fields(request: AdminLoginRequest) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    fields.insert("id".to_string(), request.id.to_string());
    fields.insert("auth_date".to_string(), request.auth_date.to_string());
    fields.insert("hash".to_string(), request.hash);
    if let Some(first_name) = request.first_name {
        fields.insert("first_name".to_string(), first_name);
    }
    if let Some(last_name) = request.last_name {
        fields.insert("last_name".to_string(), last_name);
    }
    if let Some(username) = request.username {
        fields.insert("username".to_string(), username);
    }
    if let Some(photo_url) = request.photo_url {
        fields.insert("photo_url".to_string(), photo_url);
    }
    fields
}
