//! Optimistic mutation manager.
//!
//! Every state-mutating operation follows one protocol: guard the entity,
//! snapshot it, apply the tentative value, invoke the remote call through the
//! retry scheduler, then either confirm with server-authoritative data or
//! restore the snapshot. Mutations on the same entity are serialized by a
//! single-slot in-flight marker; mutations on different entities proceed
//! concurrently.

use crate::classifier::Classification;
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::history::ErrorStats;
use crate::model::{
    Campaign, CampaignDraft, CampaignUpdate, Document, DocumentDraft, DocumentReceipt,
    HistoryEntry, MediaDraft, MediaItem, MediaReceipt, Note, NoteDraft, NoteReceipt,
    OptimisticKind, OptimisticMeta,
};
use crate::notify::{toasts_for, Toast};
use crate::processor::{ErrorProcessor, ProcessedError};
use crate::retry::{CancellationHandle, RetryOptions, RetryScheduler};
use crate::store::Snapshot;
use crate::traits::{CallResult, CampaignService, NotificationSink, StateStore};
use crate::types::{CallContext, RawCallFailure};
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tracing::warn;

/// Lifecycle of one optimistic mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStatus {
    Pending,
    Confirmed,
    RolledBack,
}

/// Ephemeral record of one in-flight optimistic mutation
#[derive(Debug)]
pub struct MutationRecord {
    entity_id: String,
    temp_id: String,
    status: MutationStatus,
    snapshot: Snapshot,
}

impl MutationRecord {
    fn new(entity_id: &str, temp_id: &str, snapshot: Snapshot) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            temp_id: temp_id.to_string(),
            status: MutationStatus::Pending,
            snapshot,
        }
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn temp_id(&self) -> &str {
        &self.temp_id
    }

    pub fn status(&self) -> MutationStatus {
        self.status
    }

    fn confirm(&mut self) {
        if self.status == MutationStatus::Pending {
            self.status = MutationStatus::Confirmed;
        }
    }

    /// Restore the pre-mutation snapshot. A no-op unless the record is still
    /// pending, so repeated rollbacks cannot double-restore.
    fn rollback<K: StateStore + ?Sized>(&mut self, store: &K) {
        if self.status != MutationStatus::Pending {
            return;
        }
        store.restore(&self.snapshot);
        self.status = MutationStatus::RolledBack;
    }
}

/// Releases the entity's in-flight slot when the mutation resolves
struct InFlightSlot<'a> {
    slots: &'a Mutex<HashSet<String>>,
    entity_id: String,
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.entity_id);
    }
}

/// One mutation inside a batch
#[derive(Debug, Clone)]
pub enum MutationRequest {
    Update {
        entity_id: String,
        update: CampaignUpdate,
    },
    AddNote {
        entity_id: String,
        draft: NoteDraft,
    },
    AddDocument {
        entity_id: String,
        draft: DocumentDraft,
    },
    AddMedia {
        entity_id: String,
        draft: MediaDraft,
    },
}

/// The sync engine: optimistic mutations over a campaign collection, with
/// classification, retry, and rollback on failure
pub struct SyncEngine<S, K, N>
where
    S: CampaignService + 'static,
    K: StateStore + 'static,
    N: NotificationSink + 'static,
{
    service: Arc<S>,
    store: Arc<K>,
    processor: Arc<ErrorProcessor>,
    scheduler: RetryScheduler,
    sink: Arc<N>,
    retry: RetryOptions,
    in_flight: Mutex<HashSet<String>>,
    batch_concurrency: usize,
}

impl<S, K, N> SyncEngine<S, K, N>
where
    S: CampaignService + 'static,
    K: StateStore + 'static,
    N: NotificationSink + 'static,
{
    pub fn new(service: S, store: K, sink: N, config: SyncConfig) -> Self {
        let processor = Arc::new(ErrorProcessor::with_bounds(
            config.max_history,
            config.max_patterns,
        ));
        Self::with_processor(service, store, sink, config, processor)
    }

    /// Build around an externally owned processor, e.g. one shared with
    /// other engines
    pub fn with_processor(
        service: S,
        store: K,
        sink: N,
        config: SyncConfig,
        processor: Arc<ErrorProcessor>,
    ) -> Self {
        let scheduler = RetryScheduler::new(processor.clone());
        let retry = RetryOptions::new()
            .with_max_retries(config.max_retries)
            .with_base_delay(config.base_delay());
        Self {
            service: Arc::new(service),
            store: Arc::new(store),
            processor,
            scheduler,
            sink: Arc::new(sink),
            retry,
            in_flight: Mutex::new(HashSet::new()),
            batch_concurrency: config.batch_concurrency.max(1),
        }
    }

    /// Install a cancellation handle honored between retry attempts
    pub fn with_cancellation(mut self, handle: CancellationHandle) -> Self {
        self.retry.cancellation = Some(handle);
        self
    }

    pub fn store(&self) -> &K {
        &self.store
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn sink(&self) -> &N {
        &self.sink
    }

    pub fn processor(&self) -> &ErrorProcessor {
        &self.processor
    }

    /// True while a mutation for this entity is unresolved
    pub fn has_pending_mutation(&self, entity_id: &str) -> bool {
        self.lock_slots().contains(entity_id)
    }

    pub fn error_stats(&self) -> ErrorStats {
        self.processor.stats()
    }

    /// Ad hoc classification, without recording anything
    pub fn classify(&self, failure: &RawCallFailure) -> Classification {
        self.processor.classify(failure)
    }

    /// Fetch the full collection and replace local state with it
    pub async fn load_campaigns(&self) -> Result<Vec<Campaign>> {
        let context = CallContext::new("fetch_campaigns", "GET", "/campaigns");
        match self
            .scheduler
            .run(|| self.service.fetch_campaigns(), &context, &self.retry)
            .await
        {
            Ok(campaigns) => {
                self.store.replace_collection(campaigns.clone());
                Ok(campaigns)
            }
            Err(processed) => Err(self.surface(processed)),
        }
    }

    /// Create a campaign. Not optimistic: local state changes only after the
    /// server confirms.
    pub async fn create_campaign(&self, draft: CampaignDraft) -> Result<Campaign> {
        let context = CallContext::new("create_campaign", "POST", "/campaigns");
        match self
            .scheduler
            .run(|| self.service.create_campaign(&draft), &context, &self.retry)
            .await
        {
            Ok(campaign) => {
                self.store.upsert(campaign.clone());
                self.store.set_selected(Some(campaign.clone()));
                self.sink.notify(Toast::success("Campaign created successfully"));
                Ok(campaign)
            }
            Err(processed) => Err(self.surface(processed)),
        }
    }

    /// Delete a campaign. Not optimistic, but guarded: a pending mutation on
    /// the same id blocks the delete.
    pub async fn delete_campaign(&self, id: &str) -> Result<()> {
        let _slot = self.acquire_slot(id)?;
        if self.store.get(id).is_none() {
            return Err(SyncError::entity_not_found(id));
        }
        let context =
            CallContext::new("delete_campaign", "DELETE", format!("/campaigns/{}", id));
        match self
            .scheduler
            .run(|| self.service.delete_campaign(id), &context, &self.retry)
            .await
        {
            Ok(()) => {
                self.store.remove(id);
                self.sink.notify(Toast::success("Campaign deleted successfully"));
                Ok(())
            }
            Err(processed) => Err(self.surface(processed)),
        }
    }

    /// Optimistically apply field changes, then confirm with the
    /// authoritative campaign returned by the server
    pub async fn update_campaign(&self, id: &str, update: CampaignUpdate) -> Result<Campaign> {
        let context = CallContext::new("update_campaign", "PUT", format!("/campaigns/{}", id));
        self.run_optimistic(
            id,
            OptimisticKind::Update,
            context,
            |campaign, temp_id| {
                for action in update.describe(campaign) {
                    campaign
                        .change_history
                        .insert(0, HistoryEntry::tentative(action, "Current User"));
                }
                update.apply_to(campaign);
                campaign.modified_at = Utc::now();
                campaign.meta = OptimisticMeta::tentative(OptimisticKind::Update, temp_id);
            },
            |campaign, authoritative: &Campaign, _temp_id| {
                *campaign = authoritative.clone();
                campaign.clear_optimistic();
            },
            || self.service.update_campaign(id, &update),
            "Campaign updated successfully",
        )
        .await
    }

    /// Optimistically prepend a note, then swap in the server's note and
    /// history entry by temp id
    pub async fn add_note(&self, id: &str, draft: NoteDraft) -> Result<NoteReceipt> {
        let context =
            CallContext::new("add_note", "POST", format!("/campaigns/{}/notes", id));
        self.run_optimistic(
            id,
            OptimisticKind::Note,
            context,
            |campaign, temp_id| {
                campaign.notes.insert(0, Note::tentative(&draft, temp_id));
                campaign
                    .change_history
                    .insert(0, HistoryEntry::tentative("Added a note", &draft.author));
                campaign.modified_at = Utc::now();
                campaign.meta.optimistic = true;
            },
            |campaign, receipt: &NoteReceipt, temp_id| {
                if let Some(slot) = campaign
                    .notes
                    .iter_mut()
                    .find(|n| n.meta.temp_id.as_deref() == Some(temp_id))
                {
                    *slot = receipt.note.clone();
                }
                if let Some(slot) = campaign
                    .change_history
                    .iter_mut()
                    .find(|h| h.meta.is_optimistic() && h.action == "Added a note")
                {
                    *slot = receipt.history_entry.clone();
                }
                campaign.meta.clear();
            },
            || self.service.add_note(id, &draft),
            "Note added successfully",
        )
        .await
    }

    /// Optimistically append a document, then swap in the server's document
    /// and history entry by temp id
    pub async fn add_document(&self, id: &str, draft: DocumentDraft) -> Result<DocumentReceipt> {
        let context =
            CallContext::new("add_document", "POST", format!("/campaigns/{}/documents", id));
        let history_action = format!("Uploaded document: {}", draft.name);
        self.run_optimistic(
            id,
            OptimisticKind::Document,
            context,
            |campaign, temp_id| {
                campaign.documents.push(Document::tentative(&draft, temp_id));
                campaign
                    .change_history
                    .insert(0, HistoryEntry::tentative(history_action, &draft.uploaded_by));
                campaign.modified_at = Utc::now();
                campaign.meta.optimistic = true;
            },
            |campaign, receipt: &DocumentReceipt, temp_id| {
                if let Some(slot) = campaign
                    .documents
                    .iter_mut()
                    .find(|d| d.meta.temp_id.as_deref() == Some(temp_id))
                {
                    *slot = receipt.document.clone();
                }
                if let Some(slot) = campaign.change_history.iter_mut().find(|h| {
                    h.meta.is_optimistic() && h.action.starts_with("Uploaded document:")
                }) {
                    *slot = receipt.history_entry.clone();
                }
                campaign.meta.clear();
            },
            || self.service.add_document(id, &draft),
            "Document uploaded successfully",
        )
        .await
    }

    /// Optimistically append a media item, then swap in the server's media
    /// and history entry by temp id
    pub async fn add_media(&self, id: &str, draft: MediaDraft) -> Result<MediaReceipt> {
        let context = CallContext::new("add_media", "POST", format!("/campaigns/{}/media", id));
        let history_action = format!("Added visual media: {}", draft.description);
        self.run_optimistic(
            id,
            OptimisticKind::Media,
            context,
            |campaign, temp_id| {
                campaign.media.push(MediaItem::tentative(&draft, temp_id));
                campaign
                    .change_history
                    .insert(0, HistoryEntry::tentative(history_action, &draft.added_by));
                campaign.modified_at = Utc::now();
                campaign.meta.optimistic = true;
            },
            |campaign, receipt: &MediaReceipt, temp_id| {
                if let Some(slot) = campaign
                    .media
                    .iter_mut()
                    .find(|m| m.meta.temp_id.as_deref() == Some(temp_id))
                {
                    *slot = receipt.media.clone();
                }
                if let Some(slot) = campaign.change_history.iter_mut().find(|h| {
                    h.meta.is_optimistic() && h.action.starts_with("Added visual media:")
                }) {
                    *slot = receipt.history_entry.clone();
                }
                campaign.meta.clear();
            },
            || self.service.add_media(id, &draft),
            "Visual media added successfully",
        )
        .await
    }

    /// Run several mutations with bounded concurrency and one aggregate
    /// outcome toast. Results come back in request order.
    pub async fn execute_batch(&self, requests: Vec<MutationRequest>) -> Vec<Result<()>> {
        let semaphore = Arc::new(Semaphore::new(self.batch_concurrency));
        let mut tasks = FuturesUnordered::new();

        for (index, request) in requests.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            tasks.push(async move {
                let result = match semaphore.acquire().await {
                    Ok(_permit) => self.dispatch(request).await,
                    Err(e) => Err(SyncError::invalid_config(format!(
                        "Failed to acquire batch slot: {}",
                        e
                    ))),
                };
                (index, result)
            });
        }

        let mut collected: Vec<(usize, Result<()>)> = Vec::new();
        while let Some(outcome) = tasks.next().await {
            collected.push(outcome);
        }
        collected.sort_by_key(|(index, _)| *index);
        let results: Vec<Result<()>> = collected.into_iter().map(|(_, result)| result).collect();

        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        let failed = results.len() - succeeded;
        if !results.is_empty() {
            let toast = if failed == 0 {
                Toast::success(format!("All {} operations completed successfully", succeeded))
            } else if succeeded == 0 {
                Toast::error(
                    format!("All {} operations failed", failed),
                    Some(std::time::Duration::from_secs(5)),
                )
            } else {
                Toast::warning(
                    format!("{} operations succeeded, {} failed", succeeded, failed),
                    std::time::Duration::from_secs(5),
                )
            };
            self.sink.notify(toast);
        }
        results
    }

    async fn dispatch(&self, request: MutationRequest) -> Result<()> {
        match request {
            MutationRequest::Update { entity_id, update } => self
                .update_campaign(&entity_id, update)
                .await
                .map(|_| ()),
            MutationRequest::AddNote { entity_id, draft } => {
                self.add_note(&entity_id, draft).await.map(|_| ())
            }
            MutationRequest::AddDocument { entity_id, draft } => {
                self.add_document(&entity_id, draft).await.map(|_| ())
            }
            MutationRequest::AddMedia { entity_id, draft } => {
                self.add_media(&entity_id, draft).await.map(|_| ())
            }
        }
    }

    /// The shared optimistic protocol: guard, snapshot, apply, invoke,
    /// confirm or roll back
    async fn run_optimistic<T, Fut>(
        &self,
        entity_id: &str,
        kind: OptimisticKind,
        context: CallContext,
        apply: impl FnOnce(&mut Campaign, &str),
        confirm: impl FnOnce(&mut Campaign, &T, &str),
        call: impl FnMut() -> Fut,
        success_message: &str,
    ) -> Result<T>
    where
        Fut: Future<Output = CallResult<T>>,
    {
        let _slot = self.acquire_slot(entity_id)?;

        let snapshot = self
            .store
            .snapshot(entity_id)
            .ok_or_else(|| SyncError::entity_not_found(entity_id))?;
        let temp_id = OptimisticMeta::new_temp_id(kind);

        let mut tentative = snapshot.entry.clone();
        apply(&mut tentative, &temp_id);
        self.store.upsert(tentative);

        let mut record = MutationRecord::new(entity_id, &temp_id, snapshot);

        match self.scheduler.run(call, &context, &self.retry).await {
            Ok(value) => {
                if let Some(mut campaign) = self.store.get(entity_id) {
                    confirm(&mut campaign, &value, &temp_id);
                    self.store.upsert(campaign);
                }
                record.confirm();
                self.sink.notify(Toast::success(success_message));
                Ok(value)
            }
            Err(processed) => {
                record.rollback(self.store.as_ref());
                if !processed.is_cancelled() {
                    warn!(
                        entity_id,
                        operation = %context.operation,
                        category = processed.classification.category.as_str(),
                        "optimistic mutation rolled back"
                    );
                }
                Err(self.surface(processed))
            }
        }
    }

    /// Notify the UI and convert a processed error into the crate error type
    fn surface(&self, processed: ProcessedError) -> SyncError {
        if processed.is_cancelled() {
            return SyncError::Cancelled;
        }
        for toast in toasts_for(&processed) {
            self.sink.notify(toast);
        }
        SyncError::Remote(Box::new(processed))
    }

    fn acquire_slot(&self, entity_id: &str) -> Result<InFlightSlot<'_>> {
        let mut slots = self.lock_slots();
        if !slots.insert(entity_id.to_string()) {
            return Err(SyncError::concurrent_mutation(entity_id));
        }
        Ok(InFlightSlot {
            slots: &self.in_flight,
            entity_id: entity_id.to_string(),
        })
    }

    fn lock_slots(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use crate::testing::mocks::test_helpers::sample_campaign;

    fn snapshot_of(store: &InMemoryStore, id: &str) -> Snapshot {
        store.snapshot(id).expect("entry exists")
    }

    #[test]
    fn test_rollback_is_idempotent() {
        let store = InMemoryStore::with_campaigns(vec![sample_campaign("c-1")]);
        let snapshot = snapshot_of(&store, "c-1");
        let mut record = MutationRecord::new("c-1", "temp-1", snapshot);

        let mut tentative = sample_campaign("c-1");
        tentative.name = "Tentative".to_string();
        store.upsert(tentative);

        record.rollback(&store);
        assert_eq!(record.status(), MutationStatus::RolledBack);
        let restored = store.get("c-1").expect("entry exists");

        // A second rollback must not restore again or fail
        let mut late_edit = restored.clone();
        late_edit.name = "Edited After Rollback".to_string();
        store.upsert(late_edit);
        record.rollback(&store);

        assert_eq!(record.status(), MutationStatus::RolledBack);
        assert_eq!(
            store.get("c-1").map(|c| c.name),
            Some("Edited After Rollback".to_string())
        );
    }

    #[test]
    fn test_rollback_after_confirm_is_a_no_op() {
        let store = InMemoryStore::with_campaigns(vec![sample_campaign("c-1")]);
        let mut record = MutationRecord::new("c-1", "temp-1", snapshot_of(&store, "c-1"));

        let mut tentative = sample_campaign("c-1");
        tentative.name = "Confirmed".to_string();
        store.upsert(tentative);

        record.confirm();
        record.rollback(&store);

        assert_eq!(record.status(), MutationStatus::Confirmed);
        assert_eq!(store.get("c-1").map(|c| c.name), Some("Confirmed".to_string()));
    }
}
