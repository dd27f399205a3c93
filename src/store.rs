//! In-memory state container for the campaign collection and the
//! selected-campaign projection.
//!
//! Both live behind one lock so snapshot, upsert, and restore see and write
//! a consistent pair. All writes go through the sync engine.

use crate::model::Campaign;
use crate::traits::StateStore;
use std::sync::Mutex;

/// Consistent copy of one collection entry and, when it mirrored the same
/// id at capture time, the selected projection
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub entry: Campaign,
    /// Present only if the selected projection pointed at this entry
    pub selected: Option<Campaign>,
}

#[derive(Default)]
struct StoreState {
    campaigns: Vec<Campaign>,
    selected: Option<Campaign>,
}

/// Default [`StateStore`] implementation
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_campaigns(campaigns: Vec<Campaign>) -> Self {
        Self {
            state: Mutex::new(StoreState {
                campaigns,
                selected: None,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StateStore for InMemoryStore {
    fn get(&self, id: &str) -> Option<Campaign> {
        self.lock().campaigns.iter().find(|c| c.id == id).cloned()
    }

    fn collection(&self) -> Vec<Campaign> {
        self.lock().campaigns.clone()
    }

    fn replace_collection(&self, campaigns: Vec<Campaign>) {
        self.lock().campaigns = campaigns;
    }

    fn selected(&self) -> Option<Campaign> {
        self.lock().selected.clone()
    }

    fn set_selected(&self, campaign: Option<Campaign>) {
        self.lock().selected = campaign;
    }

    fn snapshot(&self, id: &str) -> Option<Snapshot> {
        let state = self.lock();
        let entry = state.campaigns.iter().find(|c| c.id == id)?.clone();
        let selected = state
            .selected
            .as_ref()
            .filter(|s| s.id == id)
            .cloned();
        Some(Snapshot { entry, selected })
    }

    fn upsert(&self, campaign: Campaign) {
        let mut state = self.lock();
        match state.campaigns.iter_mut().find(|c| c.id == campaign.id) {
            Some(slot) => *slot = campaign.clone(),
            None => state.campaigns.insert(0, campaign.clone()),
        }
        if state.selected.as_ref().is_some_and(|s| s.id == campaign.id) {
            state.selected = Some(campaign);
        }
    }

    fn remove(&self, id: &str) {
        let mut state = self.lock();
        state.campaigns.retain(|c| c.id != id);
        if state.selected.as_ref().is_some_and(|s| s.id == id) {
            state.selected = None;
        }
    }

    fn restore(&self, snapshot: &Snapshot) {
        let mut state = self.lock();
        match state
            .campaigns
            .iter_mut()
            .find(|c| c.id == snapshot.entry.id)
        {
            Some(slot) => *slot = snapshot.entry.clone(),
            None => state.campaigns.insert(0, snapshot.entry.clone()),
        }
        if let Some(selected) = &snapshot.selected {
            state.selected = Some(selected.clone());
        }
    }
}
