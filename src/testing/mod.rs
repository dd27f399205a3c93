//! Test support: mock collaborators and data factories.

pub mod mocks;

pub use mocks::{test_helpers, MockCampaignService, RecordingSink};
