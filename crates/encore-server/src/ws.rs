//! WebSocket session handling for the live auction stream.
//!
//! Clients connect to `GET /ws` with their resolved identity headers
//! and receive JSON-encoded [`ServerMessage`] frames. The session
//! subscribes to the broadcast stream *before* computing the snapshot,
//! then delivers the snapshot as the first frame -- a client joining
//! mid-round can never miss an update between "state I was given" and
//! "events I will receive".
//!
//! If a client falls behind, lagged events are skipped and the client
//! resumes from the most recent one; every event carries the full
//! leaderboard, so no state is lost. Personalized refund notices
//! arrive on the connection's unicast channel and are interleaved into
//! the same frame stream.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use encore_types::{Identity, ServerMessage};
use tracing::{debug, warn};

use crate::identity::Caller;
use crate::state::AppState;

/// Upgrade an HTTP request to a WebSocket connection and begin
/// streaming auction events.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_auction(
    ws: WebSocketUpgrade,
    caller: Caller,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state, caller.0))
}

/// Serialize a message and write it as a text frame.
async fn send_message(socket: &mut WebSocket, message: &ServerMessage) -> Result<(), ()> {
    let json = serde_json::to_string(message).map_err(|e| {
        warn!("failed to serialize server message: {e}");
    })?;
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

/// Handle the WebSocket lifecycle for one connected party.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>, identity: Identity) {
    debug!(party = %identity.party, role = %identity.role, "WebSocket client connected");

    // Subscribe before snapshotting so nothing can fall between the
    // snapshot and the first relayed event.
    let mut events = state.broadcaster.subscribe();
    let (connection, mut refunds) = state.broadcaster.register(identity.party).await;

    let snapshot = match state.engine.snapshot().await {
        Ok(Some(snapshot)) => ServerMessage::CurrentState(snapshot),
        Ok(None) => ServerMessage::NoActiveRound,
        Err(e) => {
            warn!(party = %identity.party, error = %e, "snapshot failed, dropping connection");
            state.broadcaster.unregister(identity.party, connection).await;
            return;
        }
    };
    if send_message(&mut socket, &snapshot).await.is_err() {
        state.broadcaster.unregister(identity.party, connection).await;
        return;
    }

    loop {
        tokio::select! {
            // A global auction event.
            result = events.recv() => {
                match result {
                    Ok(event) => {
                        if send_message(&mut socket, &ServerMessage::from(event)).await.is_err() {
                            debug!("WebSocket client disconnected (send failed)");
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        debug!(skipped = n, "WebSocket client lagged, skipping ahead");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        debug!("broadcast channel closed, shutting down WebSocket");
                        break;
                    }
                }
            }
            // A personalized refund notice.
            notice = refunds.recv() => {
                match notice {
                    Some(notice) => {
                        if send_message(&mut socket, &ServerMessage::RefundNotice(notice))
                            .await
                            .is_err()
                        {
                            debug!("WebSocket client disconnected (send failed)");
                            break;
                        }
                    }
                    None => break,
                }
            }
            // Client-side frames: only ping and close matter.
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(party = %identity.party, "WebSocket client disconnected");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("WebSocket client disconnected (pong failed)");
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        break;
                    }
                    _ => {
                        // Ignore other message types (text, binary from client).
                    }
                }
            }
        }
    }

    state.broadcaster.unregister(identity.party, connection).await;
}
