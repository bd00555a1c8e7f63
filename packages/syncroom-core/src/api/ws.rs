//! WebSocket handler for room clients.
//!
//! Each socket is registered with the [`WsConnectionManager`], which owns its
//! outbound queue. Inbound frames are decoded into [`ClientEvent`]s and handed
//! to the [`SyncRouter`]; everything the router emits comes back through the
//! manager's queues, so this task only forwards queued text to the socket.
//!
//! [`WsConnectionManager`]: super::WsConnectionManager
//! [`SyncRouter`]: crate::sync::SyncRouter

use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::sink::SinkExt;
use futures::stream::StreamExt;

use crate::api::AppState;
use crate::error::{ErrorCode, SyncError};
use crate::events::{Broadcaster, Outbound, ServerEvent};
use crate::protocol_constants::WS_HEARTBEAT_CHECK_INTERVAL_SECS;
use crate::sync::{ClientEvent, SyncActionRequest};

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Queues a private reply for `conn_id`.
fn reply(state: &AppState, conn_id: &str, event: ServerEvent) {
    state.ws_manager.deliver(conn_id, &Outbound::private(event));
}

fn reply_error(state: &AppState, conn_id: &str, err: &SyncError) {
    log::debug!("[WS] Rejecting event from {}: {}", conn_id, err);
    reply(state, conn_id, ServerEvent::error(err.code(), err.to_string()));
}

/// Dispatches one decoded client event.
fn handle_event(state: &AppState, conn_id: &str, event: ClientEvent) {
    match event {
        ClientEvent::Join(request) => {
            // Membership first so the join notice reaches the joiner too.
            state
                .ws_manager
                .join_room(conn_id, &request.room, &request.username);
            state.router.join(conn_id, &request);
        }
        ClientEvent::SyncAction(raw) => match SyncActionRequest::from_value(raw) {
            Ok(request) => {
                state.router.sync_action(conn_id, &request);
            }
            Err(e) => reply_error(state, conn_id, &e),
        },
        ClientEvent::Leave(request) => {
            if let Some(username) = state.ws_manager.leave_room(conn_id, &request.room) {
                state.router.leave(conn_id, &request.room, &username);
            }
        }
        ClientEvent::Heartbeat => reply(state, conn_id, ServerEvent::HeartbeatAck),
    }
}

/// Handles one text frame.
fn handle_text(state: &AppState, conn_id: &str, text: &str) {
    match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => handle_event(state, conn_id, event),
        Err(e) => reply_error(state, conn_id, &SyncError::from(e)),
    }
}

/// Announces departure from every room the connection is still in.
fn leave_all_rooms(state: &AppState, conn_id: &str) {
    for (room, _) in state.ws_manager.rooms_of(conn_id) {
        if let Some(username) = state.ws_manager.leave_room(conn_id, &room) {
            state.router.leave(conn_id, &room, &username);
        }
    }
}

/// Returns how often a connection is pinged and checked for silence.
///
/// At least two pings go out per timeout window, so a client that only
/// answers pings is never considered silent.
fn heartbeat_check_interval(timeout: Duration) -> Duration {
    let max = Duration::from_secs(WS_HEARTBEAT_CHECK_INTERVAL_SECS);
    (timeout / 2).clamp(Duration::from_millis(100), max)
}

/// Main WebSocket connection handler.
async fn handle_ws(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut last_activity = Instant::now();
    let heartbeat_timeout = Duration::from_secs(state.config.ws_heartbeat_timeout_secs);

    // Register connection for tracking and force-close capability
    let (conn_guard, mut outbound_rx) = state.ws_manager.register();
    let cancel_token = conn_guard.cancel_token().clone();
    let conn_id = conn_guard.id().to_string();

    log::info!("[WS] New connection established: {}", conn_id);

    // Delay mode skips missed ticks rather than bursting to catch up.
    let mut heartbeat_interval = tokio::time::interval(heartbeat_check_interval(heartbeat_timeout));
    heartbeat_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            // Handle force-close request
            _ = cancel_token.cancelled() => {
                log::info!("[WS] Connection force-closed: {}", conn_id);
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
            // Handle incoming messages from the client
            msg = receiver.next() => {
                last_activity = Instant::now();
                match msg {
                    Some(Ok(Message::Text(text))) => handle_text(&state, &conn_id, text.as_str()),
                    Some(Ok(Message::Binary(_))) => {
                        reply_error(
                            &state,
                            &conn_id,
                            &SyncError::InvalidPayload("binary frames are not supported".into()),
                        );
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        log::debug!("[WS] Receive error on {}: {}", conn_id, e);
                        break;
                    }
                    _ => {}
                }
            }
            // Forward queued events for this connection
            Some(text) = outbound_rx.recv() => {
                if sender.send(Message::Text(text.as_ref().into())).await.is_err() {
                    break;
                }
            }
            // Ping, then check for silence. Pongs count as activity, so
            // clients that only listen stay connected.
            _ = heartbeat_interval.tick() => {
                if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
                if last_activity.elapsed() > heartbeat_timeout {
                    log::warn!("[WS] Heartbeat timeout: {}", conn_id);
                    break;
                }
            }
        }
    }

    leave_all_rooms(&state, &conn_id);
    log::info!("[WS] Connection closed: {}", conn_id);
    // ConnectionGuard drop unregisters the connection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::http::create_router;
    use crate::api::ws_connection::OutboundText;
    use crate::bootstrap::bootstrap_services;
    use crate::state::Config;
    use tokio::sync::mpsc::Receiver;
    use tokio_tungstenite::tungstenite::Message as ClientMessage;

    fn drain(rx: &mut Receiver<OutboundText>) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        while let Ok(text) = rx.try_recv() {
            out.push(serde_json::from_str(&text).unwrap());
        }
        out
    }

    #[tokio::test]
    async fn join_sends_state_then_notice() {
        let services = bootstrap_services(&Config::default()).unwrap();
        let state = services.app_state();
        let (guard, mut rx) = state.ws_manager.register();

        handle_text(&state, guard.id(), r#"{"event":"join","data":{"username":"ann","room":"movie"}}"#);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["event"], "sync_state");
        assert_eq!(events[1]["event"], "status");
        assert_eq!(events[1]["data"]["msg"], "ann has entered the room.");
    }

    #[tokio::test]
    async fn malformed_frame_gets_private_error() {
        let services = bootstrap_services(&Config::default()).unwrap();
        let state = services.app_state();
        let (guard, mut rx) = state.ws_manager.register();

        handle_text(&state, guard.id(), "not json");

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["event"], "error");
        assert_eq!(events[0]["data"]["code"], "invalid_payload");
    }

    #[tokio::test]
    async fn action_without_room_is_rejected() {
        let services = bootstrap_services(&Config::default()).unwrap();
        let state = services.app_state();
        let (guard, mut rx) = state.ws_manager.register();

        handle_text(&state, guard.id(), r#"{"event":"sync_action","data":{"type":"play"}}"#);

        let events = drain(&mut rx);
        assert_eq!(events[0]["data"]["code"], "missing_room");
        assert!(state.registry.is_empty());
    }

    #[tokio::test]
    async fn play_reaches_other_members() {
        let services = bootstrap_services(&Config::default()).unwrap();
        let state = services.app_state();
        let (a, mut rx_a) = state.ws_manager.register();
        let (b, mut rx_b) = state.ws_manager.register();
        handle_text(&state, a.id(), r#"{"event":"join","data":{"username":"ann","room":"movie"}}"#);
        handle_text(&state, b.id(), r#"{"event":"join","data":{"username":"bob","room":"movie"}}"#);
        drain(&mut rx_a);
        drain(&mut rx_b);

        handle_text(
            &state,
            a.id(),
            r#"{"event":"sync_action","data":{"type":"play","value":12.5,"room":"movie"}}"#,
        );

        let seen = drain(&mut rx_b);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["event"], "sync_action");
        assert_eq!(seen[0]["data"]["type"], "play");
        assert_eq!(seen[0]["data"]["value"], 12.5);
        assert_eq!(drain(&mut rx_a).len(), 1);
    }

    #[tokio::test]
    async fn numeric_room_joins_and_syncs_the_same_room() {
        let services = bootstrap_services(&Config::default()).unwrap();
        let state = services.app_state();
        let (a, mut rx_a) = state.ws_manager.register();
        let (b, mut rx_b) = state.ws_manager.register();
        handle_text(&state, a.id(), r#"{"event":"join","data":{"username":"ann","room":42}}"#);
        handle_text(&state, b.id(), r#"{"event":"join","data":{"username":"bob","room":"42"}}"#);
        drain(&mut rx_a);
        drain(&mut rx_b);

        handle_text(&state, a.id(), r#"{"event":"sync_action","data":{"type":"pause","value":3,"room":42}}"#);
        handle_text(&state, a.id(), r#"{"event":"sync_action","data":{"type":"seek","value":-1,"room":42}}"#);

        assert_eq!(state.ws_manager.member_count("42"), 2);
        let seen = drain(&mut rx_b);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["data"]["type"], "pause");
        let errors = drain(&mut rx_a);
        assert_eq!(errors.last().unwrap()["data"]["code"], "invalid_payload");
    }

    #[tokio::test]
    async fn leave_announces_and_stops_delivery() {
        let services = bootstrap_services(&Config::default()).unwrap();
        let state = services.app_state();
        let (a, mut rx_a) = state.ws_manager.register();
        let (b, mut rx_b) = state.ws_manager.register();
        handle_text(&state, a.id(), r#"{"event":"join","data":{"username":"ann","room":"movie"}}"#);
        handle_text(&state, b.id(), r#"{"event":"join","data":{"username":"bob","room":"movie"}}"#);
        drain(&mut rx_a);
        drain(&mut rx_b);

        handle_text(&state, b.id(), r#"{"event":"leave","data":{"room":"movie"}}"#);

        let seen = drain(&mut rx_a);
        assert_eq!(seen[0]["data"]["msg"], "bob has left the room.");
        assert!(drain(&mut rx_b).is_empty());
        assert_eq!(state.ws_manager.member_count("movie"), 1);
    }

    #[tokio::test]
    async fn heartbeat_is_acknowledged() {
        let services = bootstrap_services(&Config::default()).unwrap();
        let state = services.app_state();
        let (guard, mut rx) = state.ws_manager.register();

        handle_text(&state, guard.id(), r#"{"event":"heartbeat"}"#);

        assert_eq!(drain(&mut rx), vec![serde_json::json!({ "event": "heartbeat_ack" })]);
    }

    #[test]
    fn check_interval_fits_twice_into_timeout() {
        assert_eq!(
            heartbeat_check_interval(Duration::from_secs(60)),
            Duration::from_secs(WS_HEARTBEAT_CHECK_INTERVAL_SECS)
        );
        assert_eq!(
            heartbeat_check_interval(Duration::from_secs(2)),
            Duration::from_secs(1)
        );
    }

    #[tokio::test]
    async fn listening_client_outlives_heartbeat_timeout() {
        let config = Config {
            ws_heartbeat_timeout_secs: 2,
            ..Config::default()
        };
        let services = bootstrap_services(&config).unwrap();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = create_router(services.app_state());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
            .await
            .unwrap();
        let join = r#"{"event":"join","data":{"username":"ann","room":"movie"}}"#;
        socket
            .send(ClientMessage::Text(join.to_string().into()))
            .await
            .unwrap();

        // Only read from here on; the client library answers pings itself.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        let mut closed = false;
        while let Ok(frame) = tokio::time::timeout_at(deadline, socket.next()).await {
            match frame {
                Some(Ok(ClientMessage::Close(_))) | Some(Err(_)) | None => {
                    closed = true;
                    break;
                }
                Some(Ok(_)) => {}
            }
        }

        assert!(!closed);
        assert_eq!(services.ws_manager.member_count("movie"), 1);
    }
}
