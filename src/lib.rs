//! Campaign Sync - Client-side resilience engine for campaign data services
//!
//! This crate sits between UI actions and a remote campaign service. It
//! classifies every failed call, retries the retryable ones with backoff and
//! jitter, applies state-mutating operations optimistically with rollback on
//! failure, and tracks recurring failure patterns for escalated warnings.

// Core modules
pub mod classifier;
pub mod config;
pub mod error;
pub mod types;

// Failure bookkeeping
pub mod history;
pub mod patterns;
pub mod processor;

// Domain model and collaborator seams
pub mod model;
pub mod notify;
pub mod store;
pub mod traits;

// Main functionality modules
pub mod engine;
pub mod http;
pub mod retry;

// Test support
pub mod testing;

// Re-export main types for convenience
pub use classifier::{
    parse_retry_after, Classification, DefaultErrorClassifier, ErrorCategory, ErrorClassifier,
    RetryStrategy, Severity,
};
pub use config::SyncConfig;
pub use engine::{MutationRequest, MutationStatus, SyncEngine};
pub use error::{Result, SyncError};
pub use history::{ErrorHistory, ErrorStats};
pub use http::HttpCampaignService;
pub use model::{
    Campaign, CampaignDraft, CampaignStatus, CampaignUpdate, DocumentDraft, DocumentReceipt,
    MediaDraft, MediaReceipt, NoteDraft, NoteReceipt, OptimisticMeta,
};
pub use notify::{Toast, ToastKind};
pub use patterns::{Fingerprint, PatternInfo, PatternLedger};
pub use processor::{ErrorProcessor, ProcessedError};
pub use retry::{CancellationHandle, RetryOptions, RetryScheduler};
pub use store::{InMemoryStore, Snapshot};
pub use traits::{CallResult, CampaignService, NotificationSink, StateStore};
pub use types::{CallContext, RawCallFailure};
