use livebridge_core::{BridgeEvent, OfferRequest, SessionDescription, SessionState};
use livebridge_server::transport::{PeerEvent, UnavailableEngine};
use livebridge_server::{BridgeError, BridgeManager};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::integration::init_tracing;
use crate::utils::{
    FAKE_ANSWER_SDP, PeerScript, RecordingLauncher, TEST_OFFER_SDP, TestBridge, candidate,
    collect_events, offer_request, test_config,
};

#[tokio::test]
async fn test_offer_is_answered_once_gathering_completes() {
    init_tracing();

    let tb = TestBridge::new();
    let started = Instant::now();
    let response = tb.bridge.handle_offer("s1", offer_request("key123")).await.unwrap();

    assert!(started.elapsed() < test_config().ice_gather_timeout);
    assert_eq!(response.answer.sdp_type, "answer");
    assert_eq!(response.answer.sdp, FAKE_ANSWER_SDP);
    assert_eq!(response.ice_candidates.len(), 1);

    let peer = tb.engine.peer(0);
    assert_eq!(peer.remote_offer().unwrap().sdp, TEST_OFFER_SDP);
    assert!(!peer.ice_servers.is_empty());

    let status = tb.bridge.status("s1").unwrap();
    assert_eq!(status.stream_key, "key123");
    assert_eq!(status.state, SessionState::WaitingTracks);
    assert!(!status.has_audio && !status.has_video && !status.pipeline_running);
    assert_eq!(tb.bridge.stats().active_streams, 1);
}

#[tokio::test]
async fn test_offer_returns_after_timeout_when_gathering_stalls() {
    init_tracing();

    let script = PeerScript {
        local_candidates: vec![
            candidate("candidate:1 1 udp 2130706431 10.0.0.1 50000 typ host"),
            candidate("candidate:2 1 udp 1694498815 203.0.113.5 50001 typ srflx"),
        ],
        complete_gathering: false,
        ..PeerScript::default()
    };
    let config = test_config();
    let timeout = config.ice_gather_timeout;
    let tb = TestBridge::with(script, RecordingLauncher::long_running(), config);

    let started = Instant::now();
    let response = tb.bridge.handle_offer("s1", offer_request("key123")).await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= timeout, "answered after {elapsed:?}");
    assert!(elapsed < timeout + Duration::from_millis(500), "answered after {elapsed:?}");
    assert_eq!(response.ice_candidates.len(), 2);
}

#[tokio::test]
async fn test_late_candidates_are_published() {
    init_tracing();

    let tb = TestBridge::new();
    let mut events = tb.bridge.subscribe();
    tb.bridge.handle_offer("s1", offer_request("key123")).await.unwrap();

    let late = candidate("candidate:9 1 udp 16777215 198.51.100.7 3478 typ relay");
    tb.engine.peer(0).emit(PeerEvent::IceCandidate(late.clone())).await;
    tb.bridge.cleanup_stream("s1").await;

    let received = collect_events(&mut events, "s1", 2000).await;
    assert_eq!(
        received,
        vec![BridgeEvent::IceCandidate { candidate: late }, BridgeEvent::Cleaned]
    );
}

#[tokio::test]
async fn test_invalid_offers_are_rejected_before_any_peer_exists() {
    init_tracing();

    let tb = TestBridge::new();
    let cases = [
        ("s1", OfferRequest { stream_key: None, ..offer_request("x") }),
        ("s1", OfferRequest { stream_key: Some("  ".into()), ..offer_request("x") }),
        ("", offer_request("key123")),
        ("s1", OfferRequest { offer: None, ..offer_request("key123") }),
        (
            "s1",
            OfferRequest {
                offer: Some(SessionDescription::answer(TEST_OFFER_SDP)),
                ..offer_request("key123")
            },
        ),
        (
            "s1",
            OfferRequest {
                offer: Some(SessionDescription::offer("")),
                ..offer_request("key123")
            },
        ),
    ];

    for (stream_id, request) in cases {
        let result = tb.bridge.handle_offer(stream_id, request).await;
        assert!(matches!(result, Err(BridgeError::Validation(_))), "{result:?}");
    }

    assert!(tb.engine.peers().is_empty());
    assert_eq!(tb.bridge.stats().active_streams, 0);
}

#[tokio::test]
async fn test_rejected_offer_tears_the_session_down() {
    init_tracing();

    let script = PeerScript {
        reject_offer: true,
        ..PeerScript::default()
    };
    let tb = TestBridge::with(script, RecordingLauncher::long_running(), test_config());

    let result = tb.bridge.handle_offer("s1", offer_request("key123")).await;

    assert!(matches!(result, Err(BridgeError::Negotiation(_))), "{result:?}");
    assert_eq!(tb.bridge.stats().active_streams, 0);
    assert_eq!(tb.engine.peer(0).close_calls(), 1);
    assert!(matches!(tb.bridge.status("s1"), Err(BridgeError::NotFound(_))));
}

#[tokio::test]
async fn test_unavailable_engine_fails_fast() {
    init_tracing();

    let bridge = BridgeManager::new(
        Arc::new(UnavailableEngine::new("no webrtc")),
        Arc::new(RecordingLauncher::long_running()),
        test_config(),
    );

    let result = bridge.handle_offer("s1", offer_request("key123")).await;
    assert!(matches!(result, Err(BridgeError::DependencyUnavailable(_))), "{result:?}");

    let result = bridge
        .handle_ice_candidate("s1", candidate("candidate:1 1 udp 1 10.0.0.1 5000 typ host"))
        .await;
    assert!(matches!(result, Err(BridgeError::DependencyUnavailable(_))), "{result:?}");
    assert_eq!(bridge.stats().active_streams, 0);
}
