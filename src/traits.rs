use crate::model::{
    Campaign, CampaignDraft, CampaignUpdate, DocumentDraft, DocumentReceipt, MediaDraft,
    MediaReceipt, NoteDraft, NoteReceipt,
};
use crate::notify::Toast;
use crate::store::Snapshot;
use crate::types::RawCallFailure;
use std::future::Future;

/// Result of one remote call, before any classification
pub type CallResult<T> = std::result::Result<T, RawCallFailure>;

/// Trait for the remote campaign service.
///
/// Implementations convert their transport-specific failures into
/// [`RawCallFailure`] before returning; the engine never sees anything else.
pub trait CampaignService: Send + Sync {
    fn fetch_campaigns(&self) -> impl Future<Output = CallResult<Vec<Campaign>>> + Send;

    fn create_campaign(
        &self,
        draft: &CampaignDraft,
    ) -> impl Future<Output = CallResult<Campaign>> + Send;

    fn update_campaign(
        &self,
        id: &str,
        update: &CampaignUpdate,
    ) -> impl Future<Output = CallResult<Campaign>> + Send;

    fn delete_campaign(&self, id: &str) -> impl Future<Output = CallResult<()>> + Send;

    fn add_note(
        &self,
        id: &str,
        draft: &NoteDraft,
    ) -> impl Future<Output = CallResult<NoteReceipt>> + Send;

    fn add_document(
        &self,
        id: &str,
        draft: &DocumentDraft,
    ) -> impl Future<Output = CallResult<DocumentReceipt>> + Send;

    fn add_media(
        &self,
        id: &str,
        draft: &MediaDraft,
    ) -> impl Future<Output = CallResult<MediaReceipt>> + Send;
}

/// Trait for the local state container.
///
/// The engine is the only writer; UI code reads through `collection` and
/// `selected`. The snapshot/restore/upsert operations act on the collection
/// entry and the selected projection together, under one lock, so a rollback
/// can never land halfway.
pub trait StateStore: Send + Sync {
    fn get(&self, id: &str) -> Option<Campaign>;

    fn collection(&self) -> Vec<Campaign>;

    fn replace_collection(&self, campaigns: Vec<Campaign>);

    fn selected(&self) -> Option<Campaign>;

    fn set_selected(&self, campaign: Option<Campaign>);

    /// Capture the entry and, if it mirrors this id, the selected projection
    fn snapshot(&self, id: &str) -> Option<Snapshot>;

    /// Write an entry back, mirroring it into the selected projection when
    /// the ids match
    fn upsert(&self, campaign: Campaign);

    fn remove(&self, id: &str);

    /// Put a snapshot back verbatim, all or nothing
    fn restore(&self, snapshot: &Snapshot);
}

/// Trait for the UI-facing notification collaborator
pub trait NotificationSink: Send + Sync {
    fn notify(&self, toast: Toast);
}
