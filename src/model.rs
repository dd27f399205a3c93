//! Campaign domain model shared between the engine and its collaborators.
//!
//! Collection elements carry an [`OptimisticMeta`] tag while a mutation is
//! unconfirmed; the confirm step clears the tag exactly once by matching on
//! the temp id, and rollback removes or restores the element wholesale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tags carried by entities and child items between optimistic apply and
/// confirmation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimisticMeta {
    #[serde(default)]
    pub optimistic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<OptimisticKind>,
}

impl OptimisticMeta {
    /// Tag for a freshly applied tentative value
    pub fn tentative(kind: OptimisticKind, temp_id: &str) -> Self {
        Self {
            optimistic: true,
            temp_id: Some(temp_id.to_string()),
            kind: Some(kind),
        }
    }

    /// Untagged state, as carried by confirmed data
    pub fn confirmed() -> Self {
        Self::default()
    }

    /// Generate a temp id for a tentative item of the given kind
    pub fn new_temp_id(kind: OptimisticKind) -> String {
        format!("temp-{}-{}", kind.as_str(), Uuid::new_v4().simple())
    }

    pub fn is_optimistic(&self) -> bool {
        self.optimistic
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Which mutation produced a tentative item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimisticKind {
    Update,
    Note,
    Document,
    Media,
    History,
}

impl OptimisticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Note => "note",
            Self::Document => "document",
            Self::Media => "media",
            Self::History => "history",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CampaignStatus {
    Draft,
    Live,
    Paused,
    Ended,
}

/// Aggregated performance numbers for one campaign
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignMetrics {
    pub cost: f64,
    pub revenue: f64,
    pub unique_clicks: u64,
    pub registrations: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub text: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub meta: OptimisticMeta,
}

impl Note {
    /// Tentative note as written into the collection before confirmation
    pub fn tentative(draft: &NoteDraft, temp_id: &str) -> Self {
        Self {
            id: temp_id.to_string(),
            text: draft.text.clone(),
            author: draft.author.clone(),
            created_at: Utc::now(),
            meta: OptimisticMeta::tentative(OptimisticKind::Note, temp_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub content_type: String,
    pub size: u64,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub meta: OptimisticMeta,
}

impl Document {
    pub fn tentative(draft: &DocumentDraft, temp_id: &str) -> Self {
        Self {
            id: temp_id.to_string(),
            name: draft.name.clone(),
            content_type: draft.content_type.clone(),
            size: draft.size,
            uploaded_by: draft.uploaded_by.clone(),
            uploaded_at: Utc::now(),
            meta: OptimisticMeta::tentative(OptimisticKind::Document, temp_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,
    pub url: String,
    pub description: String,
    pub added_by: String,
    pub added_at: DateTime<Utc>,
    #[serde(flatten)]
    pub meta: OptimisticMeta,
}

impl MediaItem {
    pub fn tentative(draft: &MediaDraft, temp_id: &str) -> Self {
        Self {
            id: temp_id.to_string(),
            url: draft.url.clone(),
            description: draft.description.clone(),
            added_by: draft.added_by.clone(),
            added_at: Utc::now(),
            meta: OptimisticMeta::tentative(OptimisticKind::Media, temp_id),
        }
    }
}

/// One line of the campaign change log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub action: String,
    pub user: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub meta: OptimisticMeta,
}

impl HistoryEntry {
    pub fn tentative<S: Into<String>>(action: S, user: &str) -> Self {
        let temp_id = OptimisticMeta::new_temp_id(OptimisticKind::History);
        Self {
            id: temp_id.clone(),
            action: action.into(),
            user: user.to_string(),
            timestamp: Utc::now(),
            meta: OptimisticMeta::tentative(OptimisticKind::History, &temp_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub status: CampaignStatus,
    #[serde(default)]
    pub metrics: CampaignMetrics,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub media: Vec<MediaItem>,
    #[serde(default)]
    pub change_history: Vec<HistoryEntry>,
    pub modified_at: DateTime<Utc>,
    #[serde(flatten)]
    pub meta: OptimisticMeta,
}

impl Campaign {
    /// True if the campaign or any of its child items still carries an
    /// optimistic tag
    pub fn has_optimistic_state(&self) -> bool {
        self.meta.is_optimistic()
            || self.notes.iter().any(|n| n.meta.is_optimistic())
            || self.documents.iter().any(|d| d.meta.is_optimistic())
            || self.media.iter().any(|m| m.meta.is_optimistic())
            || self.change_history.iter().any(|h| h.meta.is_optimistic())
    }

    /// Strip every optimistic tag, on the campaign and all children
    pub fn clear_optimistic(&mut self) {
        self.meta.clear();
        for note in &mut self.notes {
            note.meta.clear();
        }
        for document in &mut self.documents {
            document.meta.clear();
        }
        for item in &mut self.media {
            item.meta.clear();
        }
        for entry in &mut self.change_history {
            entry.meta.clear();
        }
    }
}

/// Payload for creating a new campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignDraft {
    pub name: String,
    pub status: CampaignStatus,
    #[serde(default)]
    pub metrics: CampaignMetrics,
}

/// Field-level changes applied by an update mutation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CampaignStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<CampaignMetrics>,
}

impl CampaignUpdate {
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn status(mut self, status: CampaignStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn metrics(mut self, metrics: CampaignMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Human-readable change log lines against the current state
    pub fn describe(&self, current: &Campaign) -> Vec<String> {
        let mut changes = Vec::new();
        if let Some(name) = &self.name {
            if name != &current.name {
                changes.push(format!(
                    "Changed campaign name from \"{}\" to \"{}\"",
                    current.name, name
                ));
            }
        }
        if let Some(status) = self.status {
            if status != current.status {
                changes.push(format!(
                    "Changed status from \"{:?}\" to \"{:?}\"",
                    current.status, status
                ));
            }
        }
        if let Some(metrics) = &self.metrics {
            if metrics.cost != current.metrics.cost {
                changes.push(format!(
                    "Updated cost from ${:.2} to ${:.2}",
                    current.metrics.cost, metrics.cost
                ));
            }
            if metrics.revenue != current.metrics.revenue {
                changes.push(format!(
                    "Updated revenue from ${:.2} to ${:.2}",
                    current.metrics.revenue, metrics.revenue
                ));
            }
        }
        changes
    }

    /// Write the changed fields onto the campaign
    pub fn apply_to(&self, campaign: &mut Campaign) {
        if let Some(name) = &self.name {
            campaign.name = name.clone();
        }
        if let Some(status) = self.status {
            campaign.status = status;
        }
        if let Some(metrics) = self.metrics {
            campaign.metrics = metrics;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub text: String,
    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentDraft {
    pub name: String,
    pub content_type: String,
    pub size: u64,
    pub uploaded_by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaDraft {
    pub url: String,
    pub description: String,
    pub added_by: String,
}

/// Server confirmation for an appended note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteReceipt {
    pub note: Note,
    pub history_entry: HistoryEntry,
}

/// Server confirmation for an uploaded document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentReceipt {
    pub document: Document,
    pub history_entry: HistoryEntry,
}

/// Server confirmation for an added media item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaReceipt {
    pub media: MediaItem,
    pub history_entry: HistoryEntry,
}
