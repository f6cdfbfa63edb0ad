use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::json;

use crate::integration::init_tracing;
use crate::utils::{TEST_OFFER_SDP, TestApp};

#[tokio::test]
async fn test_offer_validation_errors_are_400() {
    init_tracing();

    let app = TestApp::new();
    let bodies = [
        json!({ "offer": { "type": "offer", "sdp": TEST_OFFER_SDP } }),
        json!({ "streamKey": "key123" }),
        json!({ "streamKey": "key123", "offer": { "type": "answer", "sdp": TEST_OFFER_SDP } }),
        json!({ "streamKey": "key123", "offer": { "type": "offer", "sdp": "" } }),
    ];

    for body in bodies {
        let (status, response) = app.request(Method::POST, "/bridge/s1/offer", Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(response["error"], "validation_error");
        assert!(response["message"].as_str().is_some_and(|m| !m.is_empty()));
    }
    assert!(app.engine().peers().is_empty());
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    init_tracing();

    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/bridge/s1/offer")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = app.raw_request(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_ice_candidate_errors() {
    init_tracing();

    let app = TestApp::new();

    let (status, body) = app
        .request(Method::POST, "/bridge/s1/ice-candidate", Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = app
        .request(
            Method::POST,
            "/bridge/unknown/ice-candidate",
            Some(json!({ "candidate": { "candidate": "candidate:1 1 udp 1 10.0.0.1 5000 typ host" } })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_bad_ice_candidate_is_400() {
    init_tracing();

    let app = TestApp::new();
    let (status, _) = app
        .request(
            Method::POST,
            "/bridge/s1/offer",
            Some(json!({
                "streamKey": "key123",
                "offer": { "type": "offer", "sdp": TEST_OFFER_SDP }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    for candidate in [json!({ "candidate": "" }), json!({ "candidate": "garbage" })] {
        let (status, body) = app
            .request(
                Method::POST,
                "/bridge/s1/ice-candidate",
                Some(json!({ "candidate": candidate })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{candidate}");
        assert_eq!(body["error"], "validation_error");
    }

    let (status, _) = app.request(Method::GET, "/bridge/s1/status", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unavailable_bridge_is_503() {
    init_tracing();

    let app = TestApp::unavailable();

    let (status, body) = app
        .request(
            Method::POST,
            "/bridge/s1/offer",
            Some(json!({
                "streamKey": "key123",
                "offer": { "type": "offer", "sdp": TEST_OFFER_SDP }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "dependency_unavailable");
    assert!(body["message"].as_str().is_some_and(|m| m.contains("bridge disabled")));

    let (status, body) = app
        .request(
            Method::POST,
            "/bridge/s1/ice-candidate",
            Some(json!({ "candidate": { "candidate": "candidate:1 1 udp 1 10.0.0.1 5000 typ host" } })),
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "dependency_unavailable");
    assert!(body["message"].as_str().is_some_and(|m| m.contains("bridge disabled")));

    // Stats and cleanup keep working.
    let (status, body) = app.request(Method::GET, "/bridge/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["activeStreams"], 0);
    let (status, _) = app.request(Method::DELETE, "/bridge/s1", None).await;
    assert_eq!(status, StatusCode::OK);
}
