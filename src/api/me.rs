// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atrium Works

use axum::{Extension, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{AuthContext, CurrentUser, MaybeAuthContext};
use crate::models::MeResponse;

/// Connectivity probe response for the mini app.
#[derive(Debug, Serialize, ToSchema)]
pub struct PingResponse {
    pub status: String,
    /// Whether the gate resolved a principal for this request.
    pub authenticated: bool,
}

/// Profile of the authenticated mini-app caller.
#[utoipa::path(
    get,
    path = "/v1/me",
    tag = "MiniApp",
    responses(
        (status = 200, description = "Resolved caller profile", body = MeResponse),
        (status = 401, description = "No authenticated user")
    )
)]
pub async fn get_me(
    CurrentUser(user): CurrentUser,
    Extension(context): Extension<AuthContext>,
) -> Json<MeResponse> {
    Json(MeResponse {
        external_id: user.external_id,
        display_name: user.record.display_name,
        username: user.record.username,
        group: context.group,
    })
}

/// Connectivity probe inside the protected namespace.
///
/// Serves both authenticated and anonymous callers, so permissive-mode
/// pass-throughs still get a 200 here.
#[utoipa::path(
    get,
    path = "/v1/ping",
    tag = "MiniApp",
    responses(
        (status = 200, description = "Service reachable", body = PingResponse)
    )
)]
pub async fn ping(MaybeAuthContext(context): MaybeAuthContext) -> Json<PingResponse> {
    let authenticated = context.map(|ctx| ctx.principal.is_some()).unwrap_or(false);
    Json(PingResponse {
        status: "ok".to_string(),
        authenticated,
    })
}
