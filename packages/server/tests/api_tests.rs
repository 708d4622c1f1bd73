#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use carpecarb_lookup::{LookupError, LookupService, MockCompletionClient};
use carpecarb_server::{router, AppState};
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app_with(client: MockCompletionClient) -> (Router, AppState<MockCompletionClient>) {
    let state = AppState::new(LookupService::new(client, Duration::from_secs(5)));
    (router(state.clone()), state)
}

fn post_carbs(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/carbs")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app_with(MockCompletionClient::new(vec![]));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_multi_lookup_returns_items() {
    let client = MockCompletionClient::with_content(
        r#"[{"name":"Big Mac","carbs":45,"details":"1 burger"},{"name":"Medium Fries","carbs":44}]"#,
    );
    let (app, state) = app_with(client);

    let response = app
        .oneshot(post_carbs(r#"{"input":"  Big Mac and\nmedium fries "}"#))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(
        body,
        json!({
            "items": [
                {"name": "Big Mac", "carbs": 45.0, "details": "1 burger"},
                {"name": "Medium Fries", "carbs": 44.0, "details": null}
            ],
            "citations": []
        })
    );

    let requests = state.service.client().requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].messages.user, "Big Mac and medium fries");
}

#[tokio::test]
async fn test_single_lookup_returns_flat_item() {
    let client = MockCompletionClient::with_content(
        r#"{"name":"Apple","carbs":25,"details":"1 medium apple"}"#,
    );
    let (app, _) = app_with(client);

    let response = app
        .oneshot(post_carbs(r#"{"foodItem":"apple"}"#))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["name"], "Apple");
    assert_eq!(body["carbs"], 25.0);
    assert_eq!(body["citations"], json!([]));
}

#[tokio::test]
async fn test_invalid_input_never_reaches_client() {
    for payload in [r#"{"input":"a"}"#, r#"{"input":42}"#, r#"{}"#, "not json"] {
        let (app, state) = app_with(MockCompletionClient::new(vec![]));

        let response = app.oneshot(post_carbs(payload)).await.expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{payload}");
        let body = json_body(response).await;
        assert_eq!(body["error"]["status"], "invalid-argument");
        assert_eq!(state.service.client().calls(), 0);
    }
}

#[tokio::test]
async fn test_rate_limit_maps_to_429() {
    let client = MockCompletionClient::new(vec![Err(LookupError::RateLimited {
        retry_after_secs: Some(30),
    })]);
    let (app, _) = app_with(client);

    let response = app
        .oneshot(post_carbs(r#"{"input":"pizza"}"#))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok()),
        Some("30")
    );
    let body = json_body(response).await;
    assert_eq!(body["error"]["status"], "resource-exhausted");
    assert_eq!(body["error"]["kind"], "rate_limit");
}

#[tokio::test]
async fn test_unparseable_reply_is_internal() {
    let client = MockCompletionClient::with_content("Sorry, I cannot help with that.");
    let (app, _) = app_with(client);

    let response = app
        .oneshot(post_carbs(r#"{"input":"pizza"}"#))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["error"]["status"], "internal");
    assert_eq!(body["error"]["kind"], "parse");
}
