// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atrium Works

//! # Directory Collaborators
//!
//! Seams to the external persistence stores consulted during authentication:
//! the employee directory, the registered group chats, and the administrator
//! accounts. The auth core only ever reads (and, for admin accounts during
//! login, writes) through these traits.
//!
//! [`InMemoryDirectory`] is the reference implementation used by the binary
//! and the test suites. A database-backed implementation plugs in behind the
//! same traits.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use uuid::Uuid;

use crate::models::{AccountStatus, AdminAccountRecord, AdminRole, EmployeeRecord, GroupRecord};

/// Directory lookup failure.
///
/// The in-memory implementation only fails on lock poisoning; store-backed
/// implementations surface their transport errors here.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Directory unavailable: {0}")]
    Unavailable(String),
}

/// Employee lookup collaborator.
pub trait EmployeeDirectory: Send + Sync {
    /// Find an employee by their Telegram user id.
    fn find_by_external_id(&self, external_id: &str)
        -> Result<Option<EmployeeRecord>, DirectoryError>;
}

/// Group-chat lookup collaborator.
pub trait GroupDirectory: Send + Sync {
    /// Find a registered group by its Telegram chat id.
    fn find_by_chat_id(&self, chat_id: &str) -> Result<Option<GroupRecord>, DirectoryError>;
}

/// Administrator account collaborator.
pub trait AdminAccountStore: Send + Sync {
    /// Find an admin account by Telegram user id.
    fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<AdminAccountRecord>, DirectoryError>;

    /// Insert or replace an admin account record, keyed by external id.
    fn upsert(&self, record: AdminAccountRecord) -> Result<AdminAccountRecord, DirectoryError>;
}

/// In-memory directory backing all three collaborator traits.
#[derive(Default)]
pub struct InMemoryDirectory {
    employees: RwLock<HashMap<String, EmployeeRecord>>,
    groups: RwLock<HashMap<String, GroupRecord>>,
    admins: RwLock<HashMap<String, AdminAccountRecord>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an employee; returns the created record.
    pub fn insert_employee(
        &self,
        external_id: impl Into<String>,
        display_name: impl Into<String>,
    ) -> EmployeeRecord {
        let record = EmployeeRecord {
            id: Uuid::new_v4().to_string(),
            external_id: external_id.into(),
            display_name: display_name.into(),
            username: None,
            created_at: Utc::now(),
        };
        self.employees
            .write()
            .expect("employee map lock poisoned")
            .insert(record.external_id.clone(), record.clone());
        record
    }

    /// Register a group chat; returns the created record.
    pub fn insert_group(
        &self,
        chat_id: impl Into<String>,
        title: impl Into<String>,
    ) -> GroupRecord {
        let record = GroupRecord {
            id: Uuid::new_v4().to_string(),
            chat_id: chat_id.into(),
            title: title.into(),
            created_at: Utc::now(),
        };
        self.groups
            .write()
            .expect("group map lock poisoned")
            .insert(record.chat_id.clone(), record.clone());
        record
    }

    /// Register an admin account with the given status.
    pub fn insert_admin(
        &self,
        external_id: impl Into<String>,
        first_name: impl Into<String>,
        status: AccountStatus,
    ) -> AdminAccountRecord {
        let record = AdminAccountRecord {
            id: Uuid::new_v4().to_string(),
            external_id: external_id.into(),
            first_name: first_name.into(),
            last_name: None,
            username: None,
            role: AdminRole::Admin,
            status,
            created_at: Utc::now(),
            last_login_at: None,
        };
        self.admins
            .write()
            .expect("admin map lock poisoned")
            .insert(record.external_id.clone(), record.clone());
        record
    }
}

impl EmployeeDirectory for InMemoryDirectory {
    fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<EmployeeRecord>, DirectoryError> {
        let employees = self
            .employees
            .read()
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;
        Ok(employees.get(external_id).cloned())
    }
}

impl GroupDirectory for InMemoryDirectory {
    fn find_by_chat_id(&self, chat_id: &str) -> Result<Option<GroupRecord>, DirectoryError> {
        let groups = self
            .groups
            .read()
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;
        Ok(groups.get(chat_id).cloned())
    }
}

impl AdminAccountStore for InMemoryDirectory {
    fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<AdminAccountRecord>, DirectoryError> {
        let admins = self
            .admins
            .read()
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;
        Ok(admins.get(external_id).cloned())
    }

    fn upsert(&self, record: AdminAccountRecord) -> Result<AdminAccountRecord, DirectoryError> {
        let mut admins = self
            .admins
            .write()
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;
        admins.insert(record.external_id.clone(), record.clone());
        Ok(record)
    }
}
