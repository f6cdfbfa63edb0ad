use crate::app::AppState;
use crate::signaling::{RelayKind, SignalingRelay, SignalingService};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use livebridge_core::{ClientSignal, ConnectionId, JoinAck, ServerSignal, SignalError};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let connection_id = ConnectionId::new();
    let signaling = state.signaling.clone();
    let relay = state.relay.clone();

    ws.on_upgrade(move |socket| handle_socket(socket, connection_id, signaling, relay))
}

async fn handle_socket(
    socket: WebSocket,
    connection_id: ConnectionId,
    service: SignalingService,
    relay: SignalingRelay,
) {
    info!("New WebSocket connection: {}", connection_id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    service.add_peer(connection_id, tx);

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let service = service.clone();
        let relay = relay.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ClientSignal>(&text) {
                        Ok(signal) => dispatch(signal, connection_id, &service, &relay).await,
                        Err(e) => {
                            warn!("Invalid signal from {}: {}", connection_id, e);
                            service.send_signal(
                                connection_id,
                                &ServerSignal::Error(SignalError {
                                    message: format!("invalid message: {e}"),
                                }),
                            );
                        }
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    relay.disconnect(connection_id).await;
    service.remove_peer(&connection_id);
    info!("WebSocket disconnected: {}", connection_id);
}

async fn dispatch(
    signal: ClientSignal,
    connection_id: ConnectionId,
    service: &SignalingService,
    relay: &SignalingRelay,
) {
    match signal {
        ClientSignal::JoinRoom(join) => {
            match relay
                .join(connection_id, &join.room_id, &join.user_id, &join.user_type)
                .await
            {
                Ok(users) => {
                    let ack = JoinAck::joined(join.room_id.trim(), join.user_id.trim());
                    service.send_signal(connection_id, &ServerSignal::JoinRoomAck(ack));
                    service.send_signal(connection_id, &ServerSignal::RoomUsers(users));
                }
                Err(e) => {
                    warn!("Rejected join from {}: {}", connection_id, e);
                    let ack = JoinAck::rejected(e.to_string());
                    service.send_signal(connection_id, &ServerSignal::JoinRoomAck(ack));
                }
            }
        }
        ClientSignal::Offer(env) => {
            relay
                .relay(RelayKind::Offer, connection_id, &env.target_user_id, &env.room_id, env.payload)
                .await;
        }
        ClientSignal::Answer(env) => {
            relay
                .relay(RelayKind::Answer, connection_id, &env.target_user_id, &env.room_id, env.payload)
                .await;
        }
        ClientSignal::IceCandidate(env) => {
            relay
                .relay(
                    RelayKind::IceCandidate,
                    connection_id,
                    &env.target_user_id,
                    &env.room_id,
                    env.payload,
                )
                .await;
        }
        ClientSignal::StreamType(notice) => {
            relay
                .broadcast_stream_type(connection_id, &notice.room_id, notice.stream_type)
                .await;
        }
        ClientSignal::PeerConnectionState(report) => {
            let payload = json!({
                "userId": report.user_id,
                "connectionState": report.connection_state,
                "iceConnectionState": report.ice_connection_state,
            });
            relay
                .relay(
                    RelayKind::PeerConnectionState,
                    connection_id,
                    &report.target_user_id,
                    &report.room_id,
                    payload,
                )
                .await;
        }
        ClientSignal::LeaveRoom(leave) => {
            relay.leave(connection_id, &leave.room_id).await;
        }
    }
}
