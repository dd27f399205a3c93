//! Shared builders for campaign-sync integration tests.

use campaign_sync::testing::mocks::test_helpers::sample_campaign;
use campaign_sync::testing::{MockCampaignService, RecordingSink};
use campaign_sync::{Campaign, InMemoryStore, StateStore, SyncConfig, SyncEngine};

pub type TestEngine = SyncEngine<MockCampaignService, InMemoryStore, RecordingSink>;

/// Config with a tiny base delay so retry tests stay fast
pub fn test_config() -> SyncConfig {
    SyncConfig::default().with_base_delay_ms(1)
}

/// Engine over one seeded campaign ("c-1"), selected in the projection
pub fn engine_with(service: MockCampaignService) -> TestEngine {
    engine_over(service, vec![sample_campaign("c-1")], test_config())
}

pub fn engine_over(
    service: MockCampaignService,
    campaigns: Vec<Campaign>,
    config: SyncConfig,
) -> TestEngine {
    let selected = campaigns.first().cloned();
    let store = InMemoryStore::with_campaigns(campaigns);
    store.set_selected(selected);
    SyncEngine::new(service, store, RecordingSink::new(), config)
}
