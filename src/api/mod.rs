// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atrium Works

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::gate::auth_gate,
    models::{
        AccessTokenResponse, AdminLoginRequest, AdminMeResponse, AdminRole, GroupRecord,
        MeResponse, RefreshRequest, TokenPairResponse,
    },
    state::AppState,
};

pub mod admin;
pub mod health;
pub mod me;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/me", get(me::get_me))
        .route("/ping", get(me::ping))
        .route("/admin/login", post(admin::login))
        .route("/admin/refresh", post(admin::refresh))
        .route("/admin/me", get(admin::me))
        .route("/admin/overview", get(admin::overview))
        .with_state(state.clone());

    Router::new()
        .nest("/v1", v1_routes)
        .route("/health", get(health::health))
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn_with_state(state, auth_gate))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        me::get_me,
        me::ping,
        admin::login,
        admin::refresh,
        admin::me,
        admin::overview
    ),
    components(
        schemas(
            health::HealthResponse,
            me::PingResponse,
            MeResponse,
            GroupRecord,
            AdminRole,
            AdminLoginRequest,
            TokenPairResponse,
            RefreshRequest,
            AccessTokenResponse,
            AdminMeResponse,
            admin::AdminOverviewResponse
        )
    ),
    tags(
        (name = "Health", description = "Service health"),
        (name = "MiniApp", description = "Telegram Mini App endpoints"),
        (name = "Admin", description = "Admin portal authentication and profile")
    )
)]
struct ApiDoc;
