//! Time-based retention
//!
//! A sweep deletes, in one transaction:
//! - records whose `updated_at` is older than the record threshold
//! - session entries older than the session threshold
//! - cached responses older than the cache threshold
//! - search vectors no remaining record refers to
//!
//! A threshold of zero days disables that part of the sweep.

use crate::config::RetentionConfig;
use crate::types::format_timestamp;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;

/// Age limits applied by a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_age_days: u32,
    pub session_max_age_days: u32,
    pub response_cache_max_age_days: u32,
}

/// Timestamp cutoffs for one sweep; `None` skips that table
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PurgeCutoffs {
    pub records: Option<String>,
    pub sessions: Option<String>,
    pub responses: Option<String>,
}

/// What a sweep removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SweepReport {
    pub records: u64,
    pub sessions: u64,
    pub cached_responses: u64,
    pub orphaned_vectors: u64,
}

impl RetentionPolicy {
    /// A policy that deletes nothing except orphaned vectors
    pub fn disabled() -> Self {
        Self {
            max_age_days: 0,
            session_max_age_days: 0,
            response_cache_max_age_days: 0,
        }
    }

    pub fn cutoffs(&self, now: DateTime<Utc>) -> PurgeCutoffs {
        let cutoff = |days: u32| {
            (days > 0).then(|| format_timestamp(&(now - Duration::days(i64::from(days)))))
        };

        PurgeCutoffs {
            records: cutoff(self.max_age_days),
            sessions: cutoff(self.session_max_age_days),
            responses: cutoff(self.response_cache_max_age_days),
        }
    }
}

impl From<&RetentionConfig> for RetentionPolicy {
    fn from(config: &RetentionConfig) -> Self {
        Self {
            max_age_days: config.max_age_days,
            session_max_age_days: config.session_max_age_days,
            response_cache_max_age_days: config.response_cache_max_age_days,
        }
    }
}

impl SweepReport {
    pub fn total(&self) -> u64 {
        self.records + self.sessions + self.cached_responses + self.orphaned_vectors
    }
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records, {} session entries, {} cached responses, {} orphaned vectors",
            self.records, self.sessions, self.cached_responses, self.orphaned_vectors
        )
    }
}
