//! Bounded log of processed errors and the statistics derived from it.

use crate::classifier::{ErrorCategory, Severity};
use crate::patterns::PatternInfo;
use crate::processor::ProcessedError;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Default bound on retained errors
pub const DEFAULT_MAX_HISTORY: usize = 100;

/// Most-recent-first log of processed errors. Once full, the oldest entry is
/// discarded for every new one.
pub struct ErrorHistory {
    max_history: usize,
    entries: Mutex<VecDeque<ProcessedError>>,
}

/// Aggregate statistics over the retained errors, computed by one linear scan
#[derive(Debug, Clone, Serialize)]
pub struct ErrorStats {
    pub total: usize,
    pub last_hour: usize,
    pub last_day: usize,
    pub by_category: HashMap<ErrorCategory, usize>,
    pub by_severity: HashMap<Severity, usize>,
    /// Live fingerprints from the pattern ledger
    pub patterns: Vec<PatternInfo>,
}

impl ErrorHistory {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_HISTORY)
    }

    pub fn with_capacity(max_history: usize) -> Self {
        Self {
            max_history: max_history.max(1),
            entries: Mutex::new(VecDeque::new()),
        }
    }

    pub fn append(&self, error: ProcessedError) {
        let mut entries = self.lock();
        entries.push_front(error);
        while entries.len() > self.max_history {
            entries.pop_back();
        }
    }

    /// Update the retry count on a retained entry, so observers see retry
    /// progress for errors that are still being retried
    pub fn record_retry(&self, error_id: &str, retry_count: u32) -> bool {
        let mut entries = self.lock();
        match entries.iter_mut().find(|e| e.id == error_id) {
            Some(entry) => {
                entry.metadata.retry_count = retry_count;
                true
            }
            None => false,
        }
    }

    pub fn stats(&self, now: DateTime<Utc>) -> ErrorStats {
        let entries = self.lock();
        let hour_ago = now - Duration::hours(1);
        let day_ago = now - Duration::hours(24);

        let mut stats = ErrorStats {
            total: entries.len(),
            last_hour: 0,
            last_day: 0,
            by_category: HashMap::new(),
            by_severity: HashMap::new(),
            patterns: Vec::new(),
        };

        for entry in entries.iter() {
            if entry.timestamp > hour_ago {
                stats.last_hour += 1;
            }
            if entry.timestamp > day_ago {
                stats.last_day += 1;
            }
            *stats
                .by_category
                .entry(entry.classification.category)
                .or_insert(0) += 1;
            *stats
                .by_severity
                .entry(entry.classification.severity)
                .or_insert(0) += 1;
        }
        stats
    }

    /// Most recent entries, newest first
    pub fn recent(&self, limit: usize) -> Vec<ProcessedError> {
        self.lock().iter().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<ProcessedError>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ErrorHistory {
    fn default() -> Self {
        Self::new()
    }
}
