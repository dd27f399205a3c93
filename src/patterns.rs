//! Recurrence tracking for failed calls.
//!
//! Failures are keyed by a fingerprint of (status-or-kind, verb, url). The
//! ledger is bounded: once full, the least recently recorded fingerprint is
//! evicted, so counts reflect recent behavior rather than process lifetime.

use crate::types::{CallContext, RawCallFailure};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;

/// Default bound on distinct fingerprints, independent of the history size
pub const DEFAULT_MAX_PATTERNS: usize = 256;

/// A count above this marks the pattern as recurring
const RECURRING_THRESHOLD: u32 = 2;
/// A count above this escalates notification intensity
const ESCALATION_THRESHOLD: u32 = 5;

/// Derived key identifying "the same kind of failure"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(code: &str, method: &str, url: &str) -> Self {
        Self(format!("{}|{}|{}", code, method, url))
    }

    pub fn from_failure(failure: &RawCallFailure, context: &CallContext) -> Self {
        let code = match failure.status_code() {
            Some(status) => status.to_string(),
            None => failure.kind_label().to_string(),
        };
        Self::new(&code, &context.method, &context.url)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of one fingerprint's recurrence state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternInfo {
    pub fingerprint: Fingerprint,
    pub count: u32,
    pub last_seen: DateTime<Utc>,
    pub is_recurring: bool,
    pub is_escalated: bool,
}

impl PatternInfo {
    fn new(fingerprint: Fingerprint, count: u32, last_seen: DateTime<Utc>) -> Self {
        Self {
            fingerprint,
            count,
            last_seen,
            is_recurring: count > RECURRING_THRESHOLD,
            is_escalated: count > ESCALATION_THRESHOLD,
        }
    }

    /// Placeholder for errors that bypass the ledger, e.g. cancellations
    pub fn untracked(fingerprint: Fingerprint) -> Self {
        Self {
            fingerprint,
            count: 0,
            last_seen: Utc::now(),
            is_recurring: false,
            is_escalated: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    count: u32,
    last_seen: DateTime<Utc>,
}

/// Bounded, keyed counter of recent failures
pub struct PatternLedger {
    max_patterns: usize,
    entries: Mutex<IndexMap<Fingerprint, Entry>>,
}

impl PatternLedger {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_PATTERNS)
    }

    pub fn with_capacity(max_patterns: usize) -> Self {
        Self {
            max_patterns: max_patterns.max(1),
            entries: Mutex::new(IndexMap::new()),
        }
    }

    /// Record one occurrence and return the updated pattern state
    pub fn record(&self, fingerprint: &Fingerprint) -> PatternInfo {
        let mut entries = self.lock();
        let now = Utc::now();

        // Re-inserting moves the fingerprint to the most-recent position
        let count = match entries.shift_remove(fingerprint) {
            Some(entry) => entry.count + 1,
            None => 1,
        };
        entries.insert(
            fingerprint.clone(),
            Entry {
                count,
                last_seen: now,
            },
        );
        while entries.len() > self.max_patterns {
            entries.shift_remove_index(0);
        }

        PatternInfo::new(fingerprint.clone(), count, now)
    }

    /// Current state of every live fingerprint, most recent last
    pub fn snapshot(&self) -> Vec<PatternInfo> {
        self.lock()
            .iter()
            .map(|(fingerprint, entry)| {
                PatternInfo::new(fingerprint.clone(), entry.count, entry.last_seen)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop all recorded patterns; the only way counts reset
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, IndexMap<Fingerprint, Entry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for PatternLedger {
    fn default() -> Self {
        Self::new()
    }
}
