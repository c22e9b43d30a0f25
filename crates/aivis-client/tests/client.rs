//! Integration tests for `AivisClient` using wiremock HTTP mocks.

use aivis_client::{AivisClient, ClientError};
use aivis_core::{CheckError, CompletionChecker, SnapshotError, SnapshotSource};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROJECT: &str = "6f1c2d8e-2b7a-4c1e-9a55-0d4b1e6f9a10";

fn test_client(base_url: &str) -> AivisClient {
    AivisClient::with_base_url(base_url, 30, 0, 0).expect("client construction should not fail")
}

fn progress_path() -> String {
    format!("/api/v1/projects/{PROJECT}/progress")
}

fn ranking_path() -> String {
    format!("/api/v1/projects/{PROJECT}/ranking")
}

fn snapshot_json() -> serde_json::Value {
    serde_json::json!({
        "brand": { "id": "b", "name": "Acme", "percentage": 30.0, "mentionCount": 30, "rank": 2 },
        "competitors": [
            { "id": "c1", "name": "Globex", "percentage": 50.0, "mentionCount": 50, "rank": 1 },
            { "id": "c2", "name": "Initech", "percentage": 20.0, "mentionCount": 20, "rank": 3 }
        ],
        "totalMentions": 100
    })
}

#[tokio::test]
async fn check_progress_returns_counts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(progress_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "processedPrompts": 12,
            "totalPrompts": 40,
            "allProcessed": false
        })))
        .mount(&server)
        .await;

    let progress = test_client(&server.uri())
        .check_progress(PROJECT)
        .await
        .expect("should parse progress");

    assert_eq!(progress.processed_units, 12);
    assert_eq!(progress.total_units, 40);
    assert!(!progress.all_processed);
}

#[tokio::test]
async fn check_progress_rederives_inconsistent_flag() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(progress_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "processedPrompts": 3,
            "totalPrompts": 4,
            "allProcessed": true
        })))
        .mount(&server)
        .await;

    let progress = test_client(&server.uri())
        .fetch_progress(PROJECT)
        .await
        .expect("should parse progress");

    assert!(!progress.all_processed);
}

#[tokio::test]
async fn check_progress_failure_is_transient() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(progress_path()))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let result = test_client(&server.uri()).check_progress(PROJECT).await;
    assert!(matches!(result, Err(CheckError::Transient(_))));
}

#[tokio::test]
async fn server_errors_are_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(progress_path()))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(progress_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "processedPrompts": 5,
            "totalPrompts": 5,
            "allProcessed": true
        })))
        .mount(&server)
        .await;

    let client = AivisClient::with_base_url(&server.uri(), 30, 2, 0).expect("client");
    let progress = client.fetch_progress(PROJECT).await.expect("retried to success");
    assert!(progress.all_processed);
}

#[tokio::test]
async fn ranking_snapshot_returns_validated_snapshot() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ranking_path()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "data": snapshot_json(), "error": null })),
        )
        .mount(&server)
        .await;

    let snapshot = test_client(&server.uri())
        .ranking_snapshot(PROJECT)
        .await
        .expect("should parse snapshot");

    assert_eq!(snapshot.total_mentions, 100);
    assert_eq!(snapshot.brand.rank, 2);
    assert_eq!(snapshot.competitors[0].name, "Globex");
}

#[tokio::test]
async fn ranking_accepts_legacy_count_field_name() {
    let server = MockServer::start().await;
    let mut snapshot = snapshot_json();
    let brand = snapshot["brand"].as_object_mut().expect("brand object");
    let count = brand.remove("mentionCount").expect("count");
    brand.insert("mentionOrCitationCount".to_string(), count);

    Mock::given(method("GET"))
        .and(path(ranking_path()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": snapshot })),
        )
        .mount(&server)
        .await;

    let snapshot = test_client(&server.uri())
        .fetch_ranking(PROJECT)
        .await
        .expect("should parse snapshot");
    assert_eq!(snapshot.brand.mention_count, 30);
}

#[tokio::test]
async fn ranking_not_ready_maps_to_not_ready() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ranking_path()))
        .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
            "data": null,
            "error": "not_ready: 4 of 5 prompts processed"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = AivisClient::with_base_url(&server.uri(), 30, 3, 0).expect("client");
    let result = client.ranking_snapshot(PROJECT).await;
    assert_eq!(
        result,
        Err(SnapshotError::NotReady("4 of 5 prompts processed".to_string()))
    );
}

#[tokio::test]
async fn ranking_no_data_maps_to_data_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ranking_path()))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "data": null,
            "error": "no_data: no mention records exist for this project"
        })))
        .mount(&server)
        .await;

    let result = test_client(&server.uri()).ranking_snapshot(PROJECT).await;
    assert_eq!(
        result,
        Err(SnapshotError::Data(
            "no mention records exist for this project".to_string()
        ))
    );
}

#[tokio::test]
async fn ranking_with_broken_ranks_is_rejected() {
    let server = MockServer::start().await;
    let mut snapshot = snapshot_json();
    snapshot["competitors"][1]["rank"] = serde_json::json!(7);

    Mock::given(method("GET"))
        .and(path(ranking_path()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": snapshot })),
        )
        .mount(&server)
        .await;

    let result = test_client(&server.uri()).fetch_ranking(PROJECT).await;
    assert!(matches!(result, Err(ClientError::InvalidSnapshot(_))));
}

#[tokio::test]
async fn malformed_body_is_a_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(progress_path()))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = test_client(&server.uri()).fetch_progress(PROJECT).await;
    assert!(matches!(result, Err(ClientError::Deserialize { .. })));
}
