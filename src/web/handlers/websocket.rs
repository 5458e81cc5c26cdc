//! WebSocket endpoint for live status updates
//!
//! Each socket is split in two. A writer task drains the bounded channel the
//! hub delivers into and turns hub messages into frames. The read loop below
//! answers `get_server_stats` requests and feeds pongs back to the hub's
//! heartbeat. Whichever side finishes first ends the session.

use axum::{
    body::Bytes,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::HubError;
use crate::models::ClientMessage;
use crate::services::OutboundMessage;
use crate::web::AppState;

/// Upgrade to a WebSocket subscribed to status broadcasts
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (tx, rx) = mpsc::channel(state.config.broadcast.subscriber_buffer);

    let handle = match state.hub.subscribe(tx).await {
        Ok(handle) => handle,
        Err(e) => {
            warn!("Rejected WebSocket subscriber: {}", e);
            let _ = sink.send(Message::Close(None)).await;
            return;
        }
    };
    info!(subscriber = %handle, "WebSocket client connected");

    let mut writer = tokio::spawn(write_outbound(sink, rx));

    loop {
        tokio::select! {
            _ = &mut writer => break,
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => match ClientMessage::parse(text.as_str()) {
                    Some(query) => {
                        if let Err(e) = state.hub.on_client_query(handle, query).await {
                            debug!(subscriber = %handle, "Failed to answer client query: {}", e);
                            if !matches!(e, HubError::Encoding { .. }) {
                                break;
                            }
                        }
                    }
                    None => debug!(subscriber = %handle, "Ignoring unrecognized client message"),
                },
                Some(Ok(Message::Pong(_))) => {
                    state.hub.acknowledge(handle).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(subscriber = %handle, "WebSocket receive error: {}", e);
                    break;
                }
            }
        }
    }

    state.hub.unsubscribe(handle).await;
    writer.abort();
    info!(subscriber = %handle, "WebSocket client disconnected");
}

/// Forward hub messages to the socket until the hub closes the channel
async fn write_outbound(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<OutboundMessage>,
) {
    while let Some(message) = rx.recv().await {
        let frame = match message {
            OutboundMessage::Text(text) => Message::Text(text.to_string().into()),
            OutboundMessage::Ping => Message::Ping(Bytes::new()),
            OutboundMessage::Close => break,
        };
        if sink.send(frame).await.is_err() {
            return;
        }
    }
    let _ = sink.send(Message::Close(None)).await;
}
