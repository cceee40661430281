use httpmock::prelude::*;
use serde_json::{Value, json};
use std::time::Duration;
use triage_feed::{
    TriageError,
    api::FeedbackApi,
    config::ApiConfig,
    types::{CreateFeedbackRequest, FeedbackFilters, FeedbackStatus, Sentiment, Urgency},
};
use url::Url;

fn api_for(server: &MockServer) -> FeedbackApi {
    FeedbackApi::new(&ApiConfig {
        base_url: Url::parse(&server.base_url()).unwrap(),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn record(id: &str) -> Value {
    json!({
        "id": id,
        "customer_name": "Demo User",
        "email": "demo@example.com",
        "message": "The export function no longer works",
        "created_at": "2024-03-01T10:15:00",
        "analysis": {
            "sentiment": "negative",
            "urgency_level": "high",
            "category": "Bug",
            "summary": "Export broken after update",
            "recommended_action": "Escalate to engineering"
        },
        "agent_success": true,
        "overrides": []
    })
}

#[tokio::test]
async fn create_posts_body_and_returns_record() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/feedback").json_body(json!({
                "customer_name": "Demo User",
                "email": "demo@example.com",
                "message": "The export function no longer works"
            }));
            then.status(201)
                .header("content-type", "application/json")
                .json_body(record("abc"));
        })
        .await;

    let created = api_for(&server)
        .create(&CreateFeedbackRequest::new(
            "Demo User",
            "demo@example.com",
            "The export function no longer works",
        ))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(created.id, "abc");
    assert_eq!(created.status(), FeedbackStatus::Analyzed);
    assert_eq!(created.urgency(), Some(Urgency::High));
}

#[tokio::test]
async fn create_rejects_invalid_input_locally() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/feedback");
            then.status(201).json_body(record("never"));
        })
        .await;

    let result = api_for(&server)
        .create(&CreateFeedbackRequest::new("Demo", "no-at-sign", "hello"))
        .await;

    assert!(matches!(result, Err(TriageError::InvalidRequest(_))));
    mock.assert_hits_async(0).await;
}

#[tokio::test]
async fn create_surfaces_server_detail() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/feedback");
            then.status(500)
                .header("content-type", "application/json")
                .json_body(json!({ "detail": "Failed to create feedback: model unavailable" }));
        })
        .await;

    let err = api_for(&server)
        .create(&CreateFeedbackRequest::new("Demo", "demo@example.com", "hello"))
        .await
        .unwrap_err();

    match err {
        TriageError::Api { status, detail } => {
            assert_eq!(status, 500);
            assert_eq!(detail, "Failed to create feedback: model unavailable");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn create_falls_back_to_generic_message() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/feedback");
            then.status(502).body("bad gateway");
        })
        .await;

    let err = api_for(&server)
        .create(&CreateFeedbackRequest::new("Demo", "demo@example.com", "hello"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TriageError::Api { status: 502, ref detail } if detail == "Failed to submit feedback"
    ));
}

#[tokio::test]
async fn list_sends_paging_and_filters() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/feedback")
                .query_param("limit", "100")
                .query_param("skip", "20")
                .query_param("urgency", "high")
                .query_param("sentiment", "negative")
                .query_param("category", "Bug")
                .query_param("unresolved_only", "true");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "feedbacks": [record("1"), record("2")], "total": 42 }));
        })
        .await;

    let filters = FeedbackFilters {
        urgency: Some(Urgency::High),
        category: Some("Bug".to_string()),
        sentiment: Some(Sentiment::Negative),
        unresolved_only: true,
    };
    // above the backend's bound, so it is clamped to 100
    let page = api_for(&server).list(&filters, 500, 20).await.unwrap();

    mock.assert_async().await;
    assert_eq!(page.total, 42);
    assert_eq!(page.feedbacks.len(), 2);
    assert_eq!(page.feedbacks[1].id, "2");
}

#[tokio::test]
async fn list_without_filters_sends_only_paging() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/feedback")
                .query_param("limit", "50")
                .query_param("skip", "0");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "feedbacks": [], "total": 0 }));
        })
        .await;

    let page = api_for(&server)
        .list(&FeedbackFilters::default(), 50, 0)
        .await
        .unwrap();

    mock.assert_async().await;
    assert!(page.feedbacks.is_empty());
}

#[tokio::test]
async fn get_reports_not_found() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/feedback/missing");
            then.status(404)
                .header("content-type", "application/json")
                .json_body(json!({ "detail": "Feedback not found" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/feedback/abc");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(record("abc"));
        })
        .await;

    let api = api_for(&server);
    assert_eq!(api.get("abc").await.unwrap().id, "abc");

    let err = api.get("missing").await.unwrap_err();
    assert!(matches!(
        err,
        TriageError::Api { status: 404, ref detail } if detail == "Feedback not found"
    ));
}
