// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atrium Works

//! Resolved request principals.
//!
//! The gate attaches one [`AuthContext`] to every request inside the
//! protected namespace. In permissive mode a failed authentication leaves the
//! context anonymous instead of rejecting; handlers that require a principal
//! use the extractors, which turn an anonymous context into a 401.

use crate::models::{AccountStatus, AdminAccountRecord, AdminRole, EmployeeRecord, GroupRecord};

/// The identity resolved for one request. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// Mini-app end user backed by an employee record.
    EndUser(EndUserPrincipal),
    /// Admin portal caller backed by an admin account.
    Admin(AdminPrincipal),
}

/// A verified mini-app caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndUserPrincipal {
    /// Telegram user id from the verified payload.
    pub external_id: String,
    /// The employee record resolved through the identity cache.
    pub record: EmployeeRecord,
}

/// A verified admin portal caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminPrincipal {
    /// Telegram user id from the token subject.
    pub external_id: String,
    /// Display name from the account profile.
    pub display_name: String,
    /// Telegram username, if present.
    pub username: Option<String>,
    /// Portal role.
    pub role: AdminRole,
    /// Account status at resolution time.
    pub status: AccountStatus,
}

impl From<AdminAccountRecord> for AdminPrincipal {
    fn from(record: AdminAccountRecord) -> Self {
        Self {
            external_id: record.external_id.clone(),
            display_name: record.display_name(),
            username: record.username.clone(),
            role: record.role,
            status: record.status,
        }
    }
}

/// Per-request authentication context attached by the gate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    /// The resolved principal, absent on permissive pass-through.
    pub principal: Option<Principal>,
    /// The resolved group scope, when the request carried one.
    pub group: Option<GroupRecord>,
}

impl AuthContext {
    /// Context for a request that passed through unauthenticated.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// The end-user principal, if one was resolved.
    pub fn end_user(&self) -> Option<&EndUserPrincipal> {
        match &self.principal {
            Some(Principal::EndUser(user)) => Some(user),
            _ => None,
        }
    }

    /// The admin principal, if one was resolved.
    pub fn admin(&self) -> Option<&AdminPrincipal> {
        match &self.principal {
            Some(Principal::Admin(admin)) => Some(admin),
            _ => None,
        }
    }
}
