// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atrium Works

//! Axum extractors for authenticated principals.
//!
//! Use `CurrentUser` in mini-app handlers to require an end-user principal:
//!
//! ```rust,ignore
//! async fn my_handler(CurrentUser(user): CurrentUser) -> impl IntoResponse {
//!     // user.record is the resolved employee
//! }
//! ```
//!
//! `AdminAuth` is the required guard for portal handlers; `OptionalAdminAuth`
//! never rejects and lets a route serve both authenticated and anonymous
//! callers.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::principal::{AdminPrincipal, AuthContext, EndUserPrincipal};
use super::AuthError;
use crate::state::AppState;

/// Extractor requiring a mini-app end-user principal.
///
/// The gate resolves the principal; this extractor only reads it back from
/// the request extensions. An anonymous context (permissive pass-through)
/// rejects with 401 here, which is what turns "optional at the gate" into
/// "required at the handler".
pub struct CurrentUser(pub EndUserPrincipal);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .and_then(|context| context.end_user().cloned())
            .map(CurrentUser)
            .ok_or(AuthError::MissingAuthData)
    }
}

/// Extractor requiring an authenticated administrator.
///
/// Prefers a principal already resolved by the gate; otherwise runs the
/// guard check against the `Authorization` header directly, so admin routes
/// work even when mounted outside the gated namespace.
pub struct AdminAuth(pub AdminPrincipal);

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(admin) = parts
            .extensions
            .get::<AuthContext>()
            .and_then(|context| context.admin().cloned())
        {
            return Ok(AdminAuth(admin));
        }

        let bearer = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        state
            .sessions
            .guard(bearer, state.admins.as_ref())
            .map(AdminAuth)
    }
}

/// Infallible extractor for the gate's context.
///
/// Yields `None` when the gate never ran for this request (exempt path or
/// disabled auth subsystem); an anonymous pass-through yields a context with
/// no principal.
pub struct MaybeAuthContext(pub Option<AuthContext>);

impl FromRequestParts<AppState> for MaybeAuthContext {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthContext(
            parts.extensions.get::<AuthContext>().cloned(),
        ))
    }
}

/// Optional administrator extractor.
///
/// Any guard failure yields `None` instead of rejecting.
pub struct OptionalAdminAuth(pub Option<AdminPrincipal>);

impl FromRequestParts<AppState> for OptionalAdminAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match AdminAuth::from_request_parts(parts, state).await {
            Ok(AdminAuth(admin)) => Ok(OptionalAdminAuth(Some(admin))),
            Err(_) => Ok(OptionalAdminAuth(None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::principal::Principal;
    use crate::auth::testing;
    use crate::directory::InMemoryDirectory;
    use crate::models::AccountStatus;
    use axum::http::Request;
    use chrono::Utc;
    use std::sync::Arc;

    fn test_state() -> (AppState, Arc<InMemoryDirectory>) {
        let directory = Arc::new(InMemoryDirectory::new());
        (
            AppState::new(testing::settings(), directory.clone()),
            directory,
        )
    }

    fn parts_with_context(context: AuthContext) -> Parts {
        let mut parts = Request::builder()
            .uri("/test")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        parts.extensions.insert(context);
        parts
    }

    fn end_user_context(directory: &InMemoryDirectory) -> AuthContext {
        let record = directory.insert_employee("100", "Alice");
        AuthContext {
            principal: Some(Principal::EndUser(EndUserPrincipal {
                external_id: "100".to_string(),
                record,
            })),
            group: None,
        }
    }

    #[tokio::test]
    async fn current_user_reads_gate_context() {
        let (state, directory) = test_state();
        let mut parts = parts_with_context(end_user_context(&directory));

        let CurrentUser(user) = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(user.external_id, "100");
    }

    #[tokio::test]
    async fn current_user_rejects_anonymous_context() {
        let (state, _) = test_state();
        let mut parts = parts_with_context(AuthContext::anonymous());

        let result = CurrentUser::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingAuthData)));
    }

    #[tokio::test]
    async fn current_user_rejects_missing_context() {
        let (state, _) = test_state();
        let mut parts = Request::builder()
            .uri("/test")
            .body(())
            .unwrap()
            .into_parts()
            .0;

        let result = CurrentUser::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingAuthData)));
    }

    #[tokio::test]
    async fn admin_auth_validates_bearer_header() {
        let (state, directory) = test_state();
        let account = directory.insert_admin("42", "Ada", AccountStatus::Active);

        let fields = crate::auth::signature::testkit::signed_widget_fields(
            &[
                ("id", "42"),
                ("first_name", &account.first_name),
                ("auth_date", &Utc::now().timestamp().to_string()),
            ],
            &testing::settings().bot_token,
        );
        let (pair, _) = state.sessions.login(fields, state.admins.as_ref()).unwrap();

        let mut parts = Request::builder()
            .uri("/test")
            .header("Authorization", format!("Bearer {}", pair.access_token))
            .body(())
            .unwrap()
            .into_parts()
            .0;

        let AdminAuth(admin) = AdminAuth::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(admin.external_id, "42");
    }

    #[tokio::test]
    async fn admin_auth_rejects_without_header() {
        let (state, _) = test_state();
        let mut parts = Request::builder()
            .uri("/test")
            .body(())
            .unwrap()
            .into_parts()
            .0;

        let result = AdminAuth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingAuthData)));
    }

    #[tokio::test]
    async fn admin_auth_prefers_gate_context() {
        let (state, directory) = test_state();
        let record = directory.insert_admin("42", "Ada", AccountStatus::Active);
        let mut parts = parts_with_context(AuthContext {
            principal: Some(Principal::Admin(record.into())),
            group: None,
        });

        let AdminAuth(admin) = AdminAuth::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(admin.external_id, "42");
    }

    #[tokio::test]
    async fn maybe_context_is_none_when_gate_skipped() {
        let (state, _) = test_state();
        let mut parts = Request::builder()
            .uri("/test")
            .body(())
            .unwrap()
            .into_parts()
            .0;

        let MaybeAuthContext(context) = MaybeAuthContext::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert!(context.is_none());
    }

    #[tokio::test]
    async fn optional_admin_yields_none_on_failure() {
        let (state, _) = test_state();
        let mut parts = Request::builder()
            .uri("/test")
            .header("Authorization", "Bearer garbage")
            .body(())
            .unwrap()
            .into_parts()
            .0;

        let OptionalAdminAuth(admin) = OptionalAdminAuth::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert!(admin.is_none());
    }
}
