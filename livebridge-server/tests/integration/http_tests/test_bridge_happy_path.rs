use axum::http::{Method, StatusCode};
use livebridge_server::transport::MediaKind;
use serde_json::json;

use crate::integration::init_tracing;
use crate::utils::{TEST_OFFER_SDP, TEST_PUBLISH_BASE, TestApp, WAIT_TIMEOUT_MS, wait_until};

#[tokio::test]
async fn test_offer_stream_then_cleanup_over_http() {
    init_tracing();

    let app = TestApp::new();

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
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["answer"]["type"], "answer");
    assert!(body["answer"]["sdp"].as_str().is_some_and(|sdp| !sdp.is_empty()));
    assert!(body["iceCandidates"].is_array());
    assert_eq!(body["iceCandidates"][0]["sdpMid"], "0");

    let (status, body) = app
        .request(
            Method::POST,
            "/bridge/s1/ice-candidate",
            Some(json!({
                "candidate": {
                    "candidate": "candidate:4 1 udp 2130706431 192.168.1.9 52000 typ host",
                    "sdpMid": "0",
                    "sdpMLineIndex": 0
                }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let peer = app.engine().peer(0);
    peer.add_track(MediaKind::Audio).await;
    peer.add_track(MediaKind::Video).await;
    assert!(
        wait_until(
            || app.bridge.status("s1").is_ok_and(|s| s.pipeline_running),
            WAIT_TIMEOUT_MS
        )
        .await
    );
    assert_eq!(
        app.launcher.inputs()[0].target_url,
        format!("{TEST_PUBLISH_BASE}/key123")
    );

    let (status, body) = app.request(Method::GET, "/bridge/s1/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["streamId"], "s1");
    assert_eq!(body["streamKey"], "key123");
    assert_eq!(body["state"], "streaming");
    assert_eq!(body["hasAudio"], true);
    assert_eq!(body["hasVideo"], true);
    assert_eq!(body["pipelineRunning"], true);
    assert!(body["connectionState"].is_string());
    assert!(body["iceConnectionState"].is_string());

    let (status, body) = app.request(Method::GET, "/bridge/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "activeStreams": 1 }));

    let (status, body) = app.request(Method::DELETE, "/bridge/s1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let (status, body) = app.request(Method::GET, "/bridge/s1/status", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    // Deleting again is still a success.
    let (status, _) = app.request(Method::DELETE, "/bridge/s1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(peer.close_calls(), 1);
}
