//! End-to-end flows through the sync engine: optimistic apply, confirm,
//! rollback, retry, concurrency guards, and escalation.

mod common;

use campaign_sync::notify::TECHNICAL_DIFFICULTIES_MESSAGE;
use campaign_sync::testing::mocks::test_helpers::*;
use campaign_sync::testing::MockCampaignService;
use campaign_sync::{
    CampaignDraft, CampaignStatus, CampaignUpdate, CancellationHandle, ErrorCategory,
    MutationRequest, StateStore, SyncError, ToastKind,
};
use common::*;
use std::time::Duration;

#[tokio::test]
async fn test_update_round_trip_clears_optimistic_state() {
    let engine = engine_with(MockCampaignService::new());

    let update = CampaignUpdate::default().name("Renamed Campaign");
    let confirmed = engine.update_campaign("c-1", update).await.expect("update succeeds");

    assert_eq!(confirmed.name, "Renamed Campaign");
    let stored = engine.store().get("c-1").expect("entry exists");
    assert_eq!(stored.name, "Renamed Campaign");
    assert!(!stored.has_optimistic_state());
    assert!(!engine.has_pending_mutation("c-1"));

    // The selected projection mirrors the confirmed data
    let selected = engine.store().selected().expect("selection kept");
    assert_eq!(selected.name, "Renamed Campaign");

    let toasts = engine.sink().toasts();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].kind, ToastKind::Success);
}

#[tokio::test(start_paused = true)]
async fn test_tentative_state_is_visible_while_in_flight() {
    let service = MockCampaignService::new().with_delay(Duration::from_millis(100));
    let engine = engine_with(service);

    let (result, observed) = tokio::join!(
        engine.update_campaign("c-1", CampaignUpdate::default().name("Tentative Name")),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let mid_flight = engine.store().get("c-1").expect("entry exists");
            let pending = engine.has_pending_mutation("c-1");
            (mid_flight, pending)
        }
    );

    let (mid_flight, pending) = observed;
    assert!(pending);
    assert!(mid_flight.meta.is_optimistic());
    assert_eq!(mid_flight.name, "Tentative Name");

    assert!(result.is_ok());
    assert!(!engine.store().get("c-1").expect("entry exists").has_optimistic_state());
}

#[tokio::test]
async fn test_failed_update_restores_snapshot_verbatim() {
    let engine = engine_with(MockCampaignService::new().failing(validation_failure()));
    let before_collection = engine.store().collection();
    let before_selected = engine.store().selected();

    let error = engine
        .update_campaign("c-1", CampaignUpdate::default().name("Doomed"))
        .await
        .expect_err("update fails");

    assert_eq!(engine.store().collection(), before_collection);
    assert_eq!(engine.store().selected(), before_selected);
    assert!(!engine.has_pending_mutation("c-1"));

    let processed = error.processed().expect("remote failure");
    assert_eq!(processed.classification.category, ErrorCategory::Validation);
    // Validation failures are not retried
    assert_eq!(engine.service().call_count(), 1);
}

#[tokio::test]
async fn test_validation_details_surface_on_the_error() {
    let engine = engine_with(MockCampaignService::new().failing(validation_failure()));

    let error = engine
        .update_campaign("c-1", CampaignUpdate::default().name("Doomed"))
        .await
        .expect_err("update fails");

    let processed = error.processed().expect("remote failure");
    let details = processed
        .classification
        .validation_errors
        .as_ref()
        .expect("field errors extracted");
    assert_eq!(details.get("name").map(String::as_str), Some("required"));
    assert!(!processed.classification.is_retryable);
}

#[tokio::test(start_paused = true)]
async fn test_server_errors_retry_until_success() {
    // Three 500s, then success, with the default limit of three retries
    let service = MockCampaignService::new().with_failures(vec![
        server_failure(500),
        server_failure(500),
        server_failure(500),
    ]);
    let engine = engine_with(service);

    let confirmed = engine
        .update_campaign("c-1", CampaignUpdate::default().name("Persistent"))
        .await
        .expect("retries eventually succeed");

    assert_eq!(confirmed.name, "Persistent");
    assert_eq!(engine.service().call_count(), 4);

    // Every failed attempt was recorded; the newest carries the attempt count
    let history = engine.processor().history();
    assert_eq!(history.len(), 3);
    assert_eq!(history.recent(1)[0].metadata.retry_count, 3);
}

#[tokio::test(start_paused = true)]
async fn test_retries_exhaust_and_roll_back() {
    let engine = engine_with(MockCampaignService::new().failing(server_failure(503)));
    let before = engine.store().collection();

    let error = engine
        .update_campaign("c-1", CampaignUpdate::default().name("Doomed"))
        .await
        .expect_err("exhausts retries");

    // Initial attempt plus the default three retries
    assert_eq!(engine.service().call_count(), 4);
    assert_eq!(engine.store().collection(), before);
    assert_eq!(
        error.processed().expect("remote failure").classification.category,
        ErrorCategory::Server
    );
}

#[tokio::test]
async fn test_add_note_confirms_by_temp_id() {
    let engine = engine_with(MockCampaignService::new());

    let receipt = engine.add_note("c-1", note_draft()).await.expect("note added");

    let stored = engine.store().get("c-1").expect("entry exists");
    assert_eq!(stored.notes.len(), 1);
    assert_eq!(stored.notes[0].id, receipt.note.id);
    assert!(stored.notes[0].id.starts_with("note-"));
    assert_eq!(stored.change_history.len(), 1);
    assert_eq!(stored.change_history[0].action, "Added a note");
    assert!(!stored.has_optimistic_state());
}

#[tokio::test(start_paused = true)]
async fn test_failed_add_document_rolls_back_children() {
    let engine = engine_with(MockCampaignService::new().failing(network_failure()));

    let result = engine.add_document("c-1", document_draft()).await;

    assert!(result.is_err());
    let stored = engine.store().get("c-1").expect("entry exists");
    assert!(stored.documents.is_empty());
    assert!(stored.change_history.is_empty());
    assert!(!stored.has_optimistic_state());

    // Network failures are High severity: a timed error toast is shown
    let toasts = engine.sink().toasts();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].kind, ToastKind::Error);
    assert!(toasts[0].duration.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_same_entity_mutation_is_rejected() {
    let service = MockCampaignService::new().with_delay(Duration::from_millis(100));
    let engine = engine_with(service);

    let (first, second) = tokio::join!(
        engine.update_campaign("c-1", CampaignUpdate::default().name("First")),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            engine.add_note("c-1", note_draft()).await
        }
    );

    assert!(first.is_ok());
    assert!(matches!(
        second.expect_err("second mutation rejected"),
        SyncError::ConcurrentMutation { .. }
    ));

    // The rejected mutation left no tentative value behind
    let stored = engine.store().get("c-1").expect("entry exists");
    assert!(stored.notes.is_empty());
    assert!(!stored.has_optimistic_state());
}

#[tokio::test(start_paused = true)]
async fn test_different_entities_mutate_concurrently() {
    let service = MockCampaignService::new().with_delay(Duration::from_millis(100));
    let engine = engine_over(
        service,
        vec![sample_campaign("c-1"), sample_campaign("c-2")],
        test_config(),
    );

    let started = tokio::time::Instant::now();
    let (first, second) = tokio::join!(
        engine.update_campaign("c-1", CampaignUpdate::default().name("One")),
        engine.update_campaign("c-2", CampaignUpdate::default().name("Two"))
    );

    assert!(first.is_ok());
    assert!(second.is_ok());
    // Overlapping, not serialized: both resolve within one delay window
    assert!(started.elapsed() < Duration::from_millis(150));
}

#[tokio::test]
async fn test_recurring_server_failures_raise_standing_warning() {
    let config = test_config().with_max_retries(0);
    let engine = engine_over(
        MockCampaignService::new().failing(server_failure(500)),
        vec![sample_campaign("c-1")],
        config,
    );

    for _ in 0..6 {
        let _ = engine
            .update_campaign("c-1", CampaignUpdate::default().name("Doomed"))
            .await;
    }

    let toasts = engine.sink().toasts();
    assert!(toasts
        .iter()
        .any(|t| t.message == TECHNICAL_DIFFICULTIES_MESSAGE));
    // The standing warning appears only once the pattern escalates
    let warnings = toasts
        .iter()
        .filter(|t| t.message == TECHNICAL_DIFFICULTIES_MESSAGE)
        .count();
    assert_eq!(warnings, 1);
}

#[tokio::test]
async fn test_history_is_bounded() {
    let config = test_config().with_max_retries(0).with_history_bounds(5, 256);
    let engine = engine_over(
        MockCampaignService::new().failing(server_failure(500)),
        vec![sample_campaign("c-1")],
        config,
    );

    for _ in 0..7 {
        let _ = engine
            .update_campaign("c-1", CampaignUpdate::default().name("Doomed"))
            .await;
    }

    let stats = engine.error_stats();
    assert_eq!(stats.total, 5);
    assert_eq!(stats.by_category.get(&ErrorCategory::Server), Some(&5));
    assert_eq!(stats.patterns.len(), 1);
    assert_eq!(stats.patterns[0].count, 7);
}

#[tokio::test]
async fn test_create_and_delete_campaign() {
    let engine = engine_with(MockCampaignService::new());

    let created = engine
        .create_campaign(CampaignDraft {
            name: "Fresh Campaign".to_string(),
            status: CampaignStatus::Draft,
            metrics: Default::default(),
        })
        .await
        .expect("create succeeds");

    assert_eq!(engine.store().collection().len(), 2);
    assert_eq!(
        engine.store().selected().map(|c| c.id),
        Some(created.id.clone())
    );

    engine.delete_campaign(&created.id).await.expect("delete succeeds");
    assert_eq!(engine.store().collection().len(), 1);
    assert!(engine.store().selected().is_none());
}

#[tokio::test]
async fn test_mutation_for_unknown_entity_fails_fast() {
    let engine = engine_with(MockCampaignService::new());

    let error = engine
        .add_note("missing", note_draft())
        .await
        .expect_err("unknown entity");

    assert!(matches!(error, SyncError::EntityNotFound { .. }));
    // Failed guard never reaches the service
    assert_eq!(engine.service().call_count(), 0);
}

#[tokio::test]
async fn test_batch_reports_mixed_outcomes_in_order() {
    let engine = engine_with(MockCampaignService::new());

    let results = engine
        .execute_batch(vec![
            MutationRequest::Update {
                entity_id: "c-1".to_string(),
                update: CampaignUpdate::default().name("Batched"),
            },
            MutationRequest::AddNote {
                entity_id: "missing".to_string(),
                draft: note_draft(),
            },
        ])
        .await;

    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(SyncError::EntityNotFound { .. })));

    let toasts = engine.sink().toasts();
    let summary = toasts.last().expect("aggregate toast");
    assert_eq!(summary.kind, ToastKind::Warning);
    assert_eq!(summary.message, "1 operations succeeded, 1 failed");
}

#[tokio::test]
async fn test_cancelled_mutation_rolls_back_silently() {
    let handle = CancellationHandle::new();
    let engine = engine_with(MockCampaignService::new()).with_cancellation(handle.clone());
    let before = engine.store().collection();

    handle.cancel();
    let error = engine
        .update_campaign("c-1", CampaignUpdate::default().name("Abandoned"))
        .await
        .expect_err("cancelled");

    assert!(matches!(error, SyncError::Cancelled));
    assert_eq!(engine.store().collection(), before);
    // Cancellations are not failures: nothing recorded, nothing shown
    assert_eq!(engine.error_stats().total, 0);
    assert!(engine.sink().toasts().is_empty());
}

#[tokio::test]
async fn test_load_campaigns_replaces_collection() {
    let service = MockCampaignService::new()
        .with_campaigns(vec![sample_campaign("c-7"), sample_campaign("c-8")]);
    let engine = engine_with(service);

    let loaded = engine.load_campaigns().await.expect("load succeeds");

    assert_eq!(loaded.len(), 2);
    let ids: Vec<String> = engine.store().collection().iter().map(|c| c.id.clone()).collect();
    assert_eq!(ids, vec!["c-7".to_string(), "c-8".to_string()]);
}
