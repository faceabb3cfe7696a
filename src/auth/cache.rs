// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atrium Works

//! TTL-bucketed memoization in front of the employee directory.
//!
//! The cache key pairs the external id with `floor(now / ttl)`, so expiry is
//! implicit: a lookup after the bucket rolls over misses and re-consults the
//! directory, and a hit can never return data older than one TTL. Resolved
//! "not found" results are cached the same way. The LRU capacity bounds
//! memory; entries from past buckets age out of the LRU naturally.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use chrono::Utc;
use lru::LruCache;

use crate::directory::{DirectoryError, EmployeeDirectory};
use crate::models::EmployeeRecord;

/// In-process cache for employee lookups during authentication.
pub struct IdentityCache {
    entries: Mutex<LruCache<(String, u64), Option<EmployeeRecord>>>,
    ttl_seconds: u64,
}

impl IdentityCache {
    /// Create a cache holding at most `capacity` entries with the given TTL.
    pub fn new(capacity: usize, ttl_seconds: u64) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap()),
            )),
            ttl_seconds: ttl_seconds.max(1),
        }
    }

    /// Resolve an employee by external id, consulting the directory at most
    /// once per TTL bucket.
    pub fn resolve(
        &self,
        external_id: &str,
        directory: &dyn EmployeeDirectory,
    ) -> Result<Option<EmployeeRecord>, DirectoryError> {
        self.resolve_at(external_id, Utc::now().timestamp().max(0) as u64, directory)
    }

    pub(crate) fn resolve_at(
        &self,
        external_id: &str,
        now: u64,
        directory: &dyn EmployeeDirectory,
    ) -> Result<Option<EmployeeRecord>, DirectoryError> {
        let bucket = now / self.ttl_seconds;
        let key = (external_id.to_string(), bucket);

        if let Ok(mut entries) = self.entries.lock() {
            if let Some(cached) = entries.get(&key) {
                return Ok(cached.clone());
            }
        }

        // Miss: consult the directory without holding the lock.
        let resolved = directory.find_by_external_id(external_id)?;

        if let Ok(mut entries) = self.entries.lock() {
            entries.put(key, resolved.clone());
        }
        Ok(resolved)
    }
}
