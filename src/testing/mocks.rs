use crate::model::{
    Campaign, CampaignDraft, CampaignMetrics, CampaignStatus, CampaignUpdate, Document,
    DocumentDraft, DocumentReceipt, HistoryEntry, MediaDraft, MediaItem, MediaReceipt, Note,
    NoteDraft, NoteReceipt, OptimisticMeta,
};
use crate::notify::Toast;
use crate::traits::{CallResult, CampaignService, NotificationSink};
use crate::types::RawCallFailure;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Mock campaign service with scripted failures.
///
/// Each call consumes one entry from the failure script; once the script is
/// drained (or when none was given), calls succeed with canned payloads.
pub struct MockCampaignService {
    script: Mutex<VecDeque<RawCallFailure>>,
    always_fail: Option<RawCallFailure>,
    campaigns: Vec<Campaign>,
    delay: Option<Duration>,
    calls: AtomicU32,
}

impl MockCampaignService {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            always_fail: None,
            campaigns: Vec::new(),
            delay: None,
            calls: AtomicU32::new(0),
        }
    }

    /// Fail the next calls with these outcomes, in order, then succeed
    pub fn with_failures(self, failures: Vec<RawCallFailure>) -> Self {
        Self {
            script: Mutex::new(failures.into()),
            ..self
        }
    }

    /// Fail every call with a clone of this outcome
    pub fn failing(self, failure: RawCallFailure) -> Self {
        Self {
            always_fail: Some(failure),
            ..self
        }
    }

    /// Campaigns returned by `fetch_campaigns`
    pub fn with_campaigns(self, campaigns: Vec<Campaign>) -> Self {
        Self { campaigns, ..self }
    }

    /// Hold every call for this long before resolving
    pub fn with_delay(self, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..self
        }
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    async fn next_outcome(&self) -> Result<u32, RawCallFailure> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(failure) = &self.always_fail {
            return Err(failure.clone());
        }
        let scripted = self
            .script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        match scripted {
            Some(failure) => Err(failure),
            None => Ok(call),
        }
    }
}

impl Default for MockCampaignService {
    fn default() -> Self {
        Self::new()
    }
}

impl CampaignService for MockCampaignService {
    async fn fetch_campaigns(&self) -> CallResult<Vec<Campaign>> {
        self.next_outcome().await?;
        Ok(self.campaigns.clone())
    }

    async fn create_campaign(&self, draft: &CampaignDraft) -> CallResult<Campaign> {
        let call = self.next_outcome().await?;
        let mut campaign = test_helpers::sample_campaign(&format!("srv-{}", call));
        campaign.name = draft.name.clone();
        campaign.status = draft.status;
        campaign.metrics = draft.metrics;
        Ok(campaign)
    }

    async fn update_campaign(&self, id: &str, update: &CampaignUpdate) -> CallResult<Campaign> {
        self.next_outcome().await?;
        let mut campaign = test_helpers::sample_campaign(id);
        update.apply_to(&mut campaign);
        campaign.modified_at = Utc::now();
        Ok(campaign)
    }

    async fn delete_campaign(&self, _id: &str) -> CallResult<()> {
        self.next_outcome().await?;
        Ok(())
    }

    async fn add_note(&self, _id: &str, draft: &NoteDraft) -> CallResult<NoteReceipt> {
        let call = self.next_outcome().await?;
        Ok(NoteReceipt {
            note: Note {
                id: format!("note-{}", call),
                text: draft.text.clone(),
                author: draft.author.clone(),
                created_at: Utc::now(),
                meta: OptimisticMeta::confirmed(),
            },
            history_entry: confirmed_history(call, "Added a note", &draft.author),
        })
    }

    async fn add_document(&self, _id: &str, draft: &DocumentDraft) -> CallResult<DocumentReceipt> {
        let call = self.next_outcome().await?;
        Ok(DocumentReceipt {
            document: Document {
                id: format!("doc-{}", call),
                name: draft.name.clone(),
                content_type: draft.content_type.clone(),
                size: draft.size,
                uploaded_by: draft.uploaded_by.clone(),
                uploaded_at: Utc::now(),
                meta: OptimisticMeta::confirmed(),
            },
            history_entry: confirmed_history(
                call,
                &format!("Uploaded document: {}", draft.name),
                &draft.uploaded_by,
            ),
        })
    }

    async fn add_media(&self, _id: &str, draft: &MediaDraft) -> CallResult<MediaReceipt> {
        let call = self.next_outcome().await?;
        Ok(MediaReceipt {
            media: MediaItem {
                id: format!("media-{}", call),
                url: draft.url.clone(),
                description: draft.description.clone(),
                added_by: draft.added_by.clone(),
                added_at: Utc::now(),
                meta: OptimisticMeta::confirmed(),
            },
            history_entry: confirmed_history(
                call,
                &format!("Added visual media: {}", draft.description),
                &draft.added_by,
            ),
        })
    }
}

fn confirmed_history(call: u32, action: &str, user: &str) -> HistoryEntry {
    HistoryEntry {
        id: format!("hist-{}", call),
        action: action.to_string(),
        user: user.to_string(),
        timestamp: Utc::now(),
        meta: OptimisticMeta::confirmed(),
    }
}

/// Notification sink that records every toast for assertions
#[derive(Default)]
pub struct RecordingSink {
    toasts: Mutex<Vec<Toast>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, toast: Toast) {
        self.toasts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(toast);
    }
}

/// Helper functions for creating test data
pub mod test_helpers {
    use super::*;

    pub fn sample_campaign(id: &str) -> Campaign {
        Campaign {
            id: id.to_string(),
            name: format!("Campaign {}", id),
            status: CampaignStatus::Live,
            metrics: CampaignMetrics {
                cost: 1200.0,
                revenue: 3600.0,
                unique_clicks: 540,
                registrations: 87,
            },
            notes: Vec::new(),
            documents: Vec::new(),
            media: Vec::new(),
            change_history: Vec::new(),
            modified_at: Utc::now(),
            meta: OptimisticMeta::confirmed(),
        }
    }

    pub fn network_failure() -> RawCallFailure {
        RawCallFailure::transport("Network Error")
    }

    pub fn timeout_failure() -> RawCallFailure {
        RawCallFailure::timeout("timeout of 30000ms exceeded")
    }

    pub fn server_failure(status: u16) -> RawCallFailure {
        RawCallFailure::status(status)
    }

    pub fn validation_failure() -> RawCallFailure {
        RawCallFailure::status(400).with_body(serde_json::json!({
            "error": {"message": "Name is required", "details": {"name": "required"}}
        }))
    }

    pub fn rate_limited(retry_after: &str) -> RawCallFailure {
        RawCallFailure::status(429).with_retry_after(retry_after)
    }

    pub fn note_draft() -> NoteDraft {
        NoteDraft {
            text: "Check creative rotation".to_string(),
            author: "dana".to_string(),
        }
    }

    pub fn document_draft() -> DocumentDraft {
        DocumentDraft {
            name: "brief.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            size: 48_213,
            uploaded_by: "dana".to_string(),
        }
    }

    pub fn media_draft() -> MediaDraft {
        MediaDraft {
            url: "https://cdn.example.com/banner.png".to_string(),
            description: "Spring banner".to_string(),
            added_by: "dana".to_string(),
        }
    }
}
