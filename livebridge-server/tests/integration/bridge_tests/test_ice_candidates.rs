use livebridge_server::BridgeError;

use crate::integration::init_tracing;
use crate::utils::{TestBridge, candidate, offer_request};

#[tokio::test]
async fn test_candidate_reaches_live_session() {
    init_tracing();

    let tb = TestBridge::new();
    tb.bridge.handle_offer("s1", offer_request("key123")).await.unwrap();

    let remote = candidate("candidate:3 1 udp 2130706431 192.168.1.20 61000 typ host");
    let added = tb.bridge.handle_ice_candidate("s1", remote.clone()).await.unwrap();

    assert!(added);
    assert_eq!(tb.engine.peer(0).remote_candidates(), vec![remote]);
}

#[tokio::test]
async fn test_candidate_for_unknown_stream_is_not_added() {
    init_tracing();

    let tb = TestBridge::new();
    tb.bridge.handle_offer("s1", offer_request("key123")).await.unwrap();

    let added = tb
        .bridge
        .handle_ice_candidate("other", candidate("candidate:3 1 udp 1 10.0.0.2 6000 typ host"))
        .await
        .unwrap();

    assert!(!added);
    assert!(tb.engine.peer(0).remote_candidates().is_empty());
}

#[tokio::test]
async fn test_candidate_after_cleanup_is_not_added() {
    init_tracing();

    let tb = TestBridge::new();
    tb.bridge.handle_offer("s1", offer_request("key123")).await.unwrap();
    tb.bridge.cleanup_stream("s1").await;

    let added = tb
        .bridge
        .handle_ice_candidate("s1", candidate("candidate:3 1 udp 1 10.0.0.2 6000 typ host"))
        .await
        .unwrap();
    assert!(!added);
}

#[tokio::test]
async fn test_engine_rejection_is_a_validation_error() {
    init_tracing();

    let tb = TestBridge::new();
    tb.bridge.handle_offer("s1", offer_request("key123")).await.unwrap();

    let err = tb
        .bridge
        .handle_ice_candidate("s1", candidate("not a candidate"))
        .await
        .unwrap_err();

    assert!(matches!(err, BridgeError::Validation(_)), "{err:?}");
    assert_eq!(err.status_code(), 400);
    // The session survives a bad candidate.
    assert_eq!(tb.bridge.stats().active_streams, 1);
}

#[tokio::test]
async fn test_empty_candidate_is_rejected_before_the_engine() {
    init_tracing();

    let tb = TestBridge::new();
    tb.bridge.handle_offer("s1", offer_request("key123")).await.unwrap();

    let err = tb.bridge.handle_ice_candidate("s1", candidate("  ")).await.unwrap_err();

    assert!(matches!(err, BridgeError::Validation(_)), "{err:?}");
    assert!(tb.engine.peer(0).remote_candidates().is_empty());
}
