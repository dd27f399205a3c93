//! Turns raw call failures into durable, classified error records.
//!
//! The processor owns the classifier, the pattern ledger, and the history.
//! One instance is constructed at session start and shared by reference with
//! everything that reports failures.

use crate::classifier::{Classification, DefaultErrorClassifier, ErrorClassifier};
use crate::history::{ErrorHistory, ErrorStats, DEFAULT_MAX_HISTORY};
use crate::patterns::{Fingerprint, PatternInfo, PatternLedger, DEFAULT_MAX_PATTERNS};
use crate::types::{CallContext, RawCallFailure};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;
use uuid::Uuid;

/// Mutable bookkeeping attached to a processed error
#[derive(Debug, Clone, Serialize)]
pub struct ErrorMetadata {
    /// Incremented by the retry scheduler as attempts are made
    pub retry_count: u32,
    pub first_occurrence: DateTime<Utc>,
    pub pattern: PatternInfo,
}

/// The durable record created once per failed call
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedError {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub classification: Classification,
    pub context: CallContext,
    pub metadata: ErrorMetadata,
}

impl ProcessedError {
    pub fn is_cancelled(&self) -> bool {
        self.classification.category == crate::classifier::ErrorCategory::Cancelled
    }
}

/// Service object owning classification, pattern tracking, and history
pub struct ErrorProcessor {
    classifier: Box<dyn ErrorClassifier>,
    ledger: PatternLedger,
    history: ErrorHistory,
    sequence: AtomicU64,
}

impl ErrorProcessor {
    pub fn new() -> Self {
        Self::with_bounds(DEFAULT_MAX_HISTORY, DEFAULT_MAX_PATTERNS)
    }

    pub fn with_bounds(max_history: usize, max_patterns: usize) -> Self {
        Self {
            classifier: Box::new(DefaultErrorClassifier::new()),
            ledger: PatternLedger::with_capacity(max_patterns),
            history: ErrorHistory::with_capacity(max_history),
            sequence: AtomicU64::new(0),
        }
    }

    /// Swap in a custom classifier
    pub fn with_classifier(mut self, classifier: Box<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Classify a failure, record its pattern, and append it to history
    pub fn process(&self, failure: &RawCallFailure, context: CallContext) -> ProcessedError {
        let classification = self.classifier.classify(failure);
        let fingerprint = Fingerprint::from_failure(failure, &context);
        let pattern = self.ledger.record(&fingerprint);

        if pattern.is_recurring {
            warn!(
                fingerprint = %pattern.fingerprint,
                count = pattern.count,
                category = classification.category.as_str(),
                "recurring failure pattern detected"
            );
        }

        let now = Utc::now();
        let processed = ProcessedError {
            id: self.next_id(),
            timestamp: now,
            classification,
            context,
            metadata: ErrorMetadata {
                retry_count: 0,
                first_occurrence: now,
                pattern,
            },
        };
        self.history.append(processed.clone());
        processed
    }

    /// Record for a caller-initiated cancellation. Bypasses the ledger and
    /// history: cancellation is user intent, not a service failure.
    pub fn cancelled(&self, context: CallContext) -> ProcessedError {
        let fingerprint = Fingerprint::new("cancelled", &context.method, &context.url);
        let now = Utc::now();
        ProcessedError {
            id: self.next_id(),
            timestamp: now,
            classification: Classification::cancelled(),
            context,
            metadata: ErrorMetadata {
                retry_count: 0,
                first_occurrence: now,
                pattern: PatternInfo::untracked(fingerprint),
            },
        }
    }

    /// Write the running attempt count onto the error and its history entry
    pub fn note_retry(&self, error: &mut ProcessedError, retry_count: u32) {
        error.metadata.retry_count = retry_count;
        self.history.record_retry(&error.id, retry_count);
    }

    /// Classify without recording, for ad hoc use
    pub fn classify(&self, failure: &RawCallFailure) -> Classification {
        self.classifier.classify(failure)
    }

    /// History statistics plus the live pattern snapshot
    pub fn stats(&self) -> ErrorStats {
        let mut stats = self.history.stats(Utc::now());
        stats.patterns = self.ledger.snapshot();
        stats
    }

    pub fn history(&self) -> &ErrorHistory {
        &self.history
    }

    pub fn ledger(&self) -> &PatternLedger {
        &self.ledger
    }

    fn next_id(&self) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let tail = Uuid::new_v4().simple().to_string();
        format!("err_{}_{}", seq, &tail[..8])
    }
}

impl Default for ErrorProcessor {
    fn default() -> Self {
        Self::new()
    }
}
