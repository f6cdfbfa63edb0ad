use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use livebridge_core::{BridgeEvent, PeerState};
use std::time::Duration;
use tower::ServiceExt;

use crate::integration::init_tracing;
use crate::utils::{TestApp, WAIT_TIMEOUT_MS, offer_request};

#[tokio::test]
async fn test_events_for_unknown_stream_is_404() {
    init_tracing();

    let app = TestApp::new();
    let (status, body) = app.request(Method::GET, "/bridge/ghost/events", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_events_stream_ends_after_cleanup() {
    init_tracing();

    let app = TestApp::new();
    app.bridge.handle_offer("s1", offer_request("key123")).await.unwrap();

    let request = Request::builder()
        .method(Method::GET)
        .uri("/bridge/s1/events")
        .body(Body::empty())
        .unwrap();
    // The handler has subscribed once the response head is back.
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut rx = app.bridge.subscribe();
    app.engine().peer(0).set_state(PeerState::Connected).await;
    let connected = tokio::time::timeout(Duration::from_millis(WAIT_TIMEOUT_MS), async {
        while let Ok(notification) = rx.recv().await {
            if notification.event == BridgeEvent::Connected {
                return true;
            }
        }
        false
    })
    .await;
    assert_eq!(connected, Ok(true));
    app.bridge.cleanup_stream("s1").await;

    let bytes = tokio::time::timeout(
        Duration::from_millis(WAIT_TIMEOUT_MS),
        response.into_body().collect(),
    )
    .await
    .expect("event stream did not finish")
    .unwrap()
    .to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    let connected = text.find("event: connected").expect(&text);
    let cleaned = text.find("event: cleaned").expect(&text);
    assert!(connected < cleaned);
    assert!(text.contains("\"streamId\":\"s1\""));
}
