//! Presentation hints handed to the UI notification collaborator.

use crate::classifier::{ErrorCategory, Severity};
use crate::processor::ProcessedError;
use crate::traits::NotificationSink;
use std::time::Duration;

/// Standing warning shown when the same server failure keeps recurring
pub const TECHNICAL_DIFFICULTIES_MESSAGE: &str =
    "We're experiencing some technical difficulties. Our team has been notified.";

const DEFAULT_TOAST_DURATION: Duration = Duration::from_secs(5);
const ESCALATION_TOAST_DURATION: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Warning,
    Error,
}

/// One notification for the UI to display
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    /// Auto-dismiss delay; `None` keeps the toast up until dismissed by hand
    pub duration: Option<Duration>,
}

impl Toast {
    pub fn success<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Success,
            duration: Some(DEFAULT_TOAST_DURATION),
        }
    }

    pub fn warning<S: Into<String>>(message: S, duration: Duration) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Warning,
            duration: Some(duration),
        }
    }

    pub fn error<S: Into<String>>(message: S, duration: Option<Duration>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Error,
            duration,
        }
    }
}

/// Map a processed error onto the toasts the UI should show.
///
/// Low severity stays silent (recorded only). Recurring server failures get
/// the technical-difficulties warning on top of the per-call toast.
pub fn toasts_for(error: &ProcessedError) -> Vec<Toast> {
    let mut toasts = Vec::new();

    if error.classification.category == ErrorCategory::Server
        && error.metadata.pattern.count > 5
    {
        toasts.push(Toast::warning(
            TECHNICAL_DIFFICULTIES_MESSAGE,
            ESCALATION_TOAST_DURATION,
        ));
    }

    let message = error.classification.user_message.clone();
    match error.classification.severity {
        Severity::Low => {}
        Severity::Medium => toasts.push(Toast::warning(message, DEFAULT_TOAST_DURATION)),
        Severity::High => toasts.push(Toast::error(message, Some(DEFAULT_TOAST_DURATION))),
        Severity::Critical => toasts.push(Toast::error(message, None)),
    }
    toasts
}

/// Sink that drops every notification, for headless use
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self, _toast: Toast) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::ErrorProcessor;
    use crate::types::{CallContext, RawCallFailure};

    fn processed(status: u16, times: u32) -> ProcessedError {
        let processor = ErrorProcessor::new();
        let mut last = None;
        for _ in 0..times {
            last = Some(processor.process(
                &RawCallFailure::status(status),
                CallContext::new("op", "GET", "/campaigns"),
            ));
        }
        last.expect("at least one failure processed")
    }

    #[test]
    fn test_low_severity_is_silent() {
        assert!(toasts_for(&processed(404, 1)).is_empty());
    }

    #[test]
    fn test_medium_severity_is_a_timed_warning() {
        let toasts = toasts_for(&processed(403, 1));
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].kind, ToastKind::Warning);
        assert_eq!(toasts[0].duration, Some(DEFAULT_TOAST_DURATION));
    }

    #[test]
    fn test_high_severity_is_a_timed_error() {
        let toasts = toasts_for(&processed(500, 1));
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].kind, ToastKind::Error);
        assert!(toasts[0].duration.is_some());
    }

    #[test]
    fn test_recurring_server_failures_escalate() {
        let toasts = toasts_for(&processed(500, 6));
        assert_eq!(toasts.len(), 2);
        assert_eq!(toasts[0].message, TECHNICAL_DIFFICULTIES_MESSAGE);
        assert_eq!(toasts[0].duration, Some(ESCALATION_TOAST_DURATION));
        assert_eq!(toasts[1].kind, ToastKind::Error);
    }

    #[test]
    fn test_recurring_client_failures_do_not_escalate() {
        let toasts = toasts_for(&processed(404, 10));
        assert!(toasts.is_empty());
    }
}
