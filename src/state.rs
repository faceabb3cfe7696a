// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atrium Works

use std::sync::Arc;

use crate::auth::{IdentityCache, SessionIssuer, SlidingWindowLimiter};
use crate::config::AuthSettings;
use crate::directory::{AdminAccountStore, EmployeeDirectory, GroupDirectory, InMemoryDirectory};

/// Shared application state, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<AuthSettings>,
    pub employees: Arc<dyn EmployeeDirectory>,
    pub groups: Arc<dyn GroupDirectory>,
    pub admins: Arc<dyn AdminAccountStore>,
    pub sessions: Arc<SessionIssuer>,
    pub limiter: Arc<SlidingWindowLimiter>,
    pub identity_cache: Arc<IdentityCache>,
}

impl AppState {
    /// Build state over a single directory instance backing all three
    /// collaborator seams.
    pub fn new(settings: AuthSettings, directory: Arc<InMemoryDirectory>) -> Self {
        let sessions = Arc::new(SessionIssuer::new(&settings));
        let limiter = Arc::new(SlidingWindowLimiter::new(
            settings.rate_limit_window_seconds,
            settings.rate_limit_per_principal,
        ));
        let identity_cache = Arc::new(IdentityCache::new(
            settings.cache_capacity,
            settings.cache_ttl_seconds,
        ));

        Self {
            settings: Arc::new(settings),
            employees: directory.clone(),
            groups: directory.clone(),
            admins: directory,
            sessions,
            limiter,
            identity_cache,
        }
    }
}
