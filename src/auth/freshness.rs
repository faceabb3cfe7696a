// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Atrium Works

//! Signed-payload freshness check.
//!
//! A verified payload is only accepted while its `auth_date` is recent enough;
//! a small forward allowance absorbs clock skew between the platform and this
//! service.

/// Forward clock-skew allowance (60 seconds).
pub const FORWARD_SKEW_ALLOWANCE_SECONDS: i64 = 60;

/// Freshness check failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FreshnessError {
    #[error("auth_date does not parse as an integer")]
    MalformedTimestamp,
    #[error("payload is older than the configured maximum age")]
    Expired,
    #[error("auth_date lies more than the skew allowance in the future")]
    FutureTimestamp,
}

/// Check that `auth_date` (Unix seconds, decimal string) is no older than
/// `max_age_seconds` and no more than the skew allowance in the future.
///
/// Deterministic given `now`.
pub fn check_timestamp_freshness(
    auth_date: &str,
    max_age_seconds: u64,
    now: i64,
) -> Result<(), FreshnessError> {
    let auth_date: i64 = auth_date
        .parse()
        .map_err(|_| FreshnessError::MalformedTimestamp)?;

    let age = now - auth_date;
    if age > max_age_seconds as i64 {
        return Err(FreshnessError::Expired);
    }
    if age < -FORWARD_SKEW_ALLOWANCE_SECONDS {
        return Err(FreshnessError::FutureTimestamp);
    }
    Ok(())
}
