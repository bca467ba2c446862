//! WebSocket upgrade handler: one reader and one writer task per connection

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{Envelope, SessionHandle, SessionInput};
use crate::http::routes::AppError;
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{decode_client, encode, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    if state.session.is_closed() {
        return Err(AppError::Unavailable);
    }
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state)))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let participant_id = Uuid::new_v4();
    info!(participant_id = %participant_id, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    // Subscribe before announcing so this socket sees its own playerJoined
    let outbound_rx = state.session.subscribe();

    let connected = ServerMsg::Connected { id: participant_id };
    if let Err(e) = send_msg(&mut ws_sink, &connected).await {
        error!(participant_id = %participant_id, error = %e, "Failed to send connected");
        return;
    }

    if state
        .session
        .send(SessionInput::Connected { participant_id })
        .await
        .is_err()
    {
        warn!(participant_id = %participant_id, "Session closed before connect");
        return;
    }

    let rate_limiter = ConnectionRateLimiter::new(state.config.input_rate_limit);
    run_session(
        participant_id,
        ws_sink,
        ws_stream,
        &state.session,
        outbound_rx,
        rate_limiter,
    )
    .await;

    // Cleanup on disconnect
    let _ = state
        .session
        .send(SessionInput::Disconnected { participant_id })
        .await;

    info!(participant_id = %participant_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    participant_id: Uuid,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    session: &SessionHandle,
    mut outbound_rx: broadcast::Receiver<Envelope>,
    rate_limiter: ConnectionRateLimiter,
) {
    // Writer task: fan-out -> WebSocket, filtered by recipient
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = next_outbound(participant_id, &mut outbound_rx).await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(participant_id = %participant_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> coordinator
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    debug!(participant_id = %participant_id, "Rate limited inbound frame");
                    continue;
                }

                match decode_client(&text) {
                    Ok(msg) => {
                        let input = SessionInput::Event {
                            participant_id,
                            msg,
                            received_at: unix_millis(),
                        };
                        if session.send(input).await.is_err() {
                            debug!(participant_id = %participant_id, "Session input closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(participant_id = %participant_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                debug!(participant_id = %participant_id, "Binary frame ignored");
            }
            // axum answers pings itself
            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(participant_id = %participant_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(participant_id = %participant_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

/// Next fan-out message addressed to `participant_id`. A receiver that fell
/// behind skips what it missed and carries on; `None` once the coordinator
/// is gone.
async fn next_outbound(
    participant_id: Uuid,
    outbound_rx: &mut broadcast::Receiver<Envelope>,
) -> Option<ServerMsg> {
    loop {
        match outbound_rx.recv().await {
            Ok(envelope) if envelope.is_for(&participant_id) => return Some(envelope.msg),
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(
                    participant_id = %participant_id,
                    lagged_count = n,
                    "Client lagged, skipping {} events", n
                );
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!(participant_id = %participant_id, "Outbound channel closed");
                return None;
            }
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = encode(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
