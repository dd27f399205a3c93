//! Boundary conversion tests for the reqwest-backed service: every
//! transport-specific outcome must arrive as a canonical RawCallFailure.

use campaign_sync::{
    CampaignService, CampaignUpdate, HttpCampaignService, NoteDraft, RawCallFailure, SyncConfig,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn service_for(server: &MockServer) -> HttpCampaignService {
    let config = SyncConfig::default().with_base_url(format!("{}/api", server.uri()));
    HttpCampaignService::new(&config).expect("client builds")
}

fn campaign_json(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": "Wire Campaign",
        "status": "Live",
        "metrics": {"cost": 10.0, "revenue": 30.0, "unique_clicks": 5, "registrations": 2},
        "modified_at": "2026-08-01T12:00:00Z"
    })
}

#[tokio::test]
async fn test_success_response_is_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/campaigns/c-1"))
        .and(header_exists("X-Request-ID"))
        .respond_with(ResponseTemplate::new(200).set_body_json(campaign_json("c-1")))
        .mount(&server)
        .await;

    let campaign = service_for(&server)
        .update_campaign("c-1", &CampaignUpdate::default().name("Wire Campaign"))
        .await
        .expect("update succeeds");

    assert_eq!(campaign.id, "c-1");
    assert_eq!(campaign.name, "Wire Campaign");
    assert!(!campaign.meta.is_optimistic());
}

#[tokio::test]
async fn test_error_status_converts_with_body_and_retry_hint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/campaigns/c-1/notes"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "60")
                .set_body_json(json!({"error": {"message": "slow down"}})),
        )
        .mount(&server)
        .await;

    let draft = NoteDraft {
        text: "hello".to_string(),
        author: "dana".to_string(),
    };
    let failure = service_for(&server)
        .add_note("c-1", &draft)
        .await
        .expect_err("rate limited");

    match failure {
        RawCallFailure::Status {
            status,
            message,
            body,
            retry_after,
        } => {
            assert_eq!(status, 429);
            assert_eq!(message, "Request failed with status code 429");
            assert_eq!(retry_after.as_deref(), Some("60"));
            let body = body.expect("json body kept");
            assert_eq!(body["error"]["message"], "slow down");
        }
        other => panic!("expected status failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_non_json_error_body_is_tolerated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/campaigns"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let failure = service_for(&server)
        .fetch_campaigns()
        .await
        .expect_err("bad gateway");

    match failure {
        RawCallFailure::Status { status, body, .. } => {
            assert_eq!(status, 502);
            assert!(body.is_none());
        }
        other => panic!("expected status failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_timeout_converts_to_timeout_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/campaigns"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = SyncConfig {
        base_url: format!("{}/api", server.uri()),
        request_timeout_seconds: 1,
        ..SyncConfig::default()
    };
    let service = HttpCampaignService::new(&config).expect("client builds");

    let failure = service.fetch_campaigns().await.expect_err("times out");
    assert!(matches!(failure, RawCallFailure::Timeout { .. }));
}

#[tokio::test]
async fn test_connection_failure_converts_to_transport_failure() {
    // Nothing listens on this port
    let config = SyncConfig::default().with_base_url("http://127.0.0.1:9/api");
    let service = HttpCampaignService::new(&config).expect("client builds");

    let failure = service.fetch_campaigns().await.expect_err("refused");
    assert!(matches!(failure, RawCallFailure::Transport { .. }));
}

#[tokio::test]
async fn test_delete_accepts_empty_response_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/campaigns/c-1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    service_for(&server)
        .delete_campaign("c-1")
        .await
        .expect("delete succeeds");
}
