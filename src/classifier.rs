//! Pure classification of failed remote calls.
//!
//! `classify` is total: every failure shape maps to a classification, and the
//! user-facing message never carries raw transport detail. The raw message is
//! preserved separately for diagnostics.

use crate::types::RawCallFailure;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Fallback delay when a rate-limit hint is absent or unparseable
const DEFAULT_RETRY_AFTER: Duration = Duration::from_millis(1000);

/// Failure categories with distinct handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Network,
    Timeout,
    Validation,
    Authentication,
    Authorization,
    Client,
    RateLimit,
    Server,
    Cancelled,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Validation => "validation",
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::Client => "client",
            Self::RateLimit => "rate_limit",
            Self::Server => "server",
            Self::Cancelled => "cancelled",
        }
    }
}

/// How badly a failure affects the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStrategy {
    None,
    Immediate,
    Linear,
    Exponential,
}

/// Structured verdict for one failed call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub category: ErrorCategory,
    pub severity: Severity,
    pub retry_strategy: RetryStrategy,
    pub is_retryable: bool,
    pub max_retries: u32,
    /// Explicit delay override, e.g. parsed from a rate-limit hint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_delay: Option<Duration>,
    pub user_message: String,
    pub technical_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<HashMap<String, String>>,
    #[serde(default)]
    pub requires_auth: bool,
}

impl Classification {
    fn not_retryable(
        category: ErrorCategory,
        severity: Severity,
        user_message: String,
        technical_message: String,
    ) -> Self {
        Self {
            category,
            severity,
            retry_strategy: RetryStrategy::None,
            is_retryable: false,
            max_retries: 0,
            retry_delay: None,
            user_message,
            technical_message,
            validation_errors: None,
            requires_auth: false,
        }
    }

    /// Verdict for a caller-initiated cancellation; never recorded as a
    /// service failure
    pub fn cancelled() -> Self {
        Self::not_retryable(
            ErrorCategory::Cancelled,
            Severity::Low,
            "The operation was cancelled.".to_string(),
            "Cancelled before completion".to_string(),
        )
    }
}

/// Trait for failure classification
pub trait ErrorClassifier: Send + Sync {
    /// Classify a failed call. Total: must return a verdict for every input.
    fn classify(&self, failure: &RawCallFailure) -> Classification;
}

/// Default classifier implementing the standard decision table
pub struct DefaultErrorClassifier;

impl DefaultErrorClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DefaultErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorClassifier for DefaultErrorClassifier {
    fn classify(&self, failure: &RawCallFailure) -> Classification {
        match failure {
            // Request sent, nothing came back
            RawCallFailure::Transport { message } => Classification {
                category: ErrorCategory::Network,
                severity: Severity::High,
                retry_strategy: RetryStrategy::Exponential,
                is_retryable: true,
                max_retries: 3,
                retry_delay: None,
                user_message:
                    "Unable to connect to the server. Please check your internet connection."
                        .to_string(),
                technical_message: message.clone(),
                validation_errors: None,
                requires_auth: false,
            },
            RawCallFailure::Timeout { message } => timeout_classification(message),
            // A timeout marker in the message wins over the status dispatch
            RawCallFailure::Status { message, .. } if message.contains("timeout") => {
                timeout_classification(message)
            }
            RawCallFailure::Status {
                status,
                message,
                body,
                retry_after,
            } => classify_status(*status, message, body.as_ref(), retry_after.as_deref()),
        }
    }
}

fn timeout_classification(message: &str) -> Classification {
    Classification {
        category: ErrorCategory::Timeout,
        severity: Severity::Medium,
        retry_strategy: RetryStrategy::Linear,
        is_retryable: true,
        max_retries: 2,
        retry_delay: None,
        user_message: "The request took too long to complete. Please try again.".to_string(),
        technical_message: message.to_string(),
        validation_errors: None,
        requires_auth: false,
    }
}

fn classify_status(
    status: u16,
    message: &str,
    body: Option<&Value>,
    retry_after: Option<&str>,
) -> Classification {
    match status {
        400 | 422 => {
            let (server_message, details) = extract_validation_details(body);
            Classification {
                category: ErrorCategory::Validation,
                severity: Severity::Low,
                retry_strategy: RetryStrategy::None,
                is_retryable: false,
                max_retries: 0,
                retry_delay: None,
                user_message: server_message
                    .unwrap_or_else(|| "Please check your input and try again.".to_string()),
                technical_message: message.to_string(),
                validation_errors: Some(details),
                requires_auth: false,
            }
        }
        401 => {
            let mut classification = Classification::not_retryable(
                ErrorCategory::Authentication,
                Severity::High,
                "Your session has expired. Please log in again.".to_string(),
                message.to_string(),
            );
            classification.requires_auth = true;
            classification
        }
        403 => Classification::not_retryable(
            ErrorCategory::Authorization,
            Severity::Medium,
            "You do not have permission to perform this action.".to_string(),
            message.to_string(),
        ),
        404 => Classification::not_retryable(
            ErrorCategory::Client,
            Severity::Low,
            "The requested resource was not found.".to_string(),
            message.to_string(),
        ),
        429 => Classification {
            category: ErrorCategory::RateLimit,
            severity: Severity::Medium,
            retry_strategy: RetryStrategy::Exponential,
            is_retryable: true,
            max_retries: 3,
            retry_delay: Some(parse_retry_after(retry_after)),
            user_message: "Too many requests. Please wait a moment and try again.".to_string(),
            technical_message: message.to_string(),
            validation_errors: None,
            requires_auth: false,
        },
        500 | 502 | 503 | 504 => Classification {
            category: ErrorCategory::Server,
            severity: Severity::High,
            retry_strategy: RetryStrategy::Exponential,
            is_retryable: true,
            max_retries: 2,
            retry_delay: None,
            user_message: "Server error. Please try again in a few moments.".to_string(),
            technical_message: message.to_string(),
            validation_errors: None,
            requires_auth: false,
        },
        // Unknown codes are not auto-retried
        _ => Classification::not_retryable(
            ErrorCategory::Client,
            Severity::Medium,
            "An unexpected error occurred. Please try again.".to_string(),
            message.to_string(),
        ),
    }
}

/// Pull a server-provided message and field-level details out of an error
/// body shaped like `{"error": {"message": ..., "details": {field: reason}}}`.
/// A bare `{"details": ...}` object is accepted as well.
fn extract_validation_details(body: Option<&Value>) -> (Option<String>, HashMap<String, String>) {
    let Some(body) = body else {
        return (None, HashMap::new());
    };
    let error = body.get("error").unwrap_or(body);

    let message = error
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string);

    let mut details = HashMap::new();
    if let Some(map) = error.get("details").and_then(Value::as_object) {
        for (field, reason) in map {
            let reason = match reason {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            details.insert(field.clone(), reason);
        }
    }
    (message, details)
}

/// Parse a Retry-After hint into a delay.
///
/// All-digits hints are seconds; date hints yield the time remaining until
/// that instant, floored at zero. Anything else, including an absent hint,
/// falls back to one second.
pub fn parse_retry_after(hint: Option<&str>) -> Duration {
    let Some(raw) = hint else {
        return DEFAULT_RETRY_AFTER;
    };
    let raw = raw.trim();

    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(seconds) = raw.parse::<u64>() {
            return Duration::from_secs(seconds);
        }
    }

    // HTTP dates are RFC 2822; accept RFC 3339 for lenient servers
    let parsed: Option<DateTime<Utc>> = DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|when| when.with_timezone(&Utc))
        .ok();
    match parsed {
        Some(when) => (when - Utc::now()).to_std().unwrap_or(Duration::ZERO),
        None => DEFAULT_RETRY_AFTER,
    }
}
