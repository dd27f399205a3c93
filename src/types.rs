use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Canonical shape of a failed remote call.
///
/// Transport-specific error types (reqwest errors, mock failures) are
/// converted into this at the boundary where the remote collaborator is
/// invoked, so the classifier never sees anything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawCallFailure {
    /// The request went out but no response came back.
    Transport { message: String },
    /// The transport reported that the request timed out.
    Timeout { message: String },
    /// The server answered with a non-success status.
    Status {
        status: u16,
        message: String,
        body: Option<Value>,
        retry_after: Option<String>,
    },
}

impl RawCallFailure {
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Create a status failure with the message shape the HTTP layer produces
    pub fn status(status: u16) -> Self {
        Self::Status {
            status,
            message: format!("Request failed with status code {}", status),
            body: None,
            retry_after: None,
        }
    }

    pub fn with_body(mut self, value: Value) -> Self {
        if let Self::Status { body, .. } = &mut self {
            *body = Some(value);
        }
        self
    }

    pub fn with_retry_after<S: Into<String>>(mut self, hint: S) -> Self {
        if let Self::Status { retry_after, .. } = &mut self {
            *retry_after = Some(hint.into());
        }
        self
    }

    /// HTTP status code, when a response was received
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw diagnostic message reported by the transport
    pub fn message(&self) -> &str {
        match self {
            Self::Transport { message } | Self::Timeout { message } => message,
            Self::Status { message, .. } => message,
        }
    }

    /// Stable label used in fingerprints for failures without a status code
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Timeout { .. } => "timeout",
            Self::Status { .. } => "status",
        }
    }
}

/// Context attached to a remote call for diagnostics and fingerprinting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallContext {
    /// Logical operation name, e.g. "update_campaign"
    pub operation: String,
    pub method: String,
    pub url: String,
    /// Request correlation id, propagated to logs and error records
    pub correlation_id: String,
    /// Caller-supplied metadata carried through to the processed error
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CallContext {
    pub fn new<S1, S2, S3>(operation: S1, method: S2, url: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self {
            operation: operation.into(),
            method: method.into(),
            url: url.into(),
            correlation_id: format!("req_{}", Uuid::new_v4().simple()),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_failure_construction() {
        let failure = RawCallFailure::status(429)
            .with_body(serde_json::json!({"error": "slow down"}))
            .with_retry_after("60");

        assert_eq!(failure.status_code(), Some(429));
        assert_eq!(failure.message(), "Request failed with status code 429");
        match failure {
            RawCallFailure::Status { retry_after, .. } => {
                assert_eq!(retry_after.as_deref(), Some("60"));
            }
            _ => panic!("expected status failure"),
        }
    }

    #[test]
    fn test_context_correlation_ids_are_unique() {
        let a = CallContext::new("update_campaign", "PUT", "/campaigns/1");
        let b = CallContext::new("update_campaign", "PUT", "/campaigns/1");
        assert_ne!(a.correlation_id, b.correlation_id);
        assert!(a.correlation_id.starts_with("req_"));
    }
}
