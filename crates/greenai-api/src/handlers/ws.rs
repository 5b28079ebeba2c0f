//! WebSocket upgrade handler and per-connection socket loop.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use greenai_realtime::connection::{ConnectionHandle, ConnectionMeta};
use greenai_realtime::message::OutboundMessage;
use greenai_realtime::message::serializer::serialize_outbound;

use crate::error::ApiError;
use crate::extractors::bearer_token;
use crate::state::AppState;

const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Query parameters accepted on the upgrade request.
#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    /// Access token, for clients that cannot set headers on the upgrade.
    pub token: Option<String>,
}

/// GET /ws?token={jwt}
///
/// The credential is checked before the upgrade; a rejected token gets a
/// plain 401 and nothing is registered.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let credential = query.token.as_deref().or_else(|| bearer_token(&headers));
    let meta = ConnectionMeta {
        remote_addr: header_value(&headers, "x-forwarded-for"),
        user_agent: header_value(&headers, "user-agent"),
    };

    let (handle, outbound_rx) = state.engine.connect(credential, meta).await?;

    let engine = state.engine.clone();
    let conn_id = handle.id;
    Ok(ws
        .on_failed_upgrade(move |e| {
            warn!(conn_id = %conn_id, error = %e, "WebSocket upgrade failed");
            engine.on_disconnect(conn_id);
        })
        .on_upgrade(move |socket| run_connection(state, handle, outbound_rx, socket)))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

/// Pumps frames between the socket and the engine until either side closes.
async fn run_connection(
    state: AppState,
    handle: Arc<ConnectionHandle>,
    outbound_rx: mpsc::Receiver<OutboundMessage>,
    socket: WebSocket,
) {
    let conn_id = handle.id;
    let cancel = handle.cancelled();
    let (ws_tx, mut ws_rx) = socket.split();

    info!(conn_id = %conn_id, user_id = %handle.user_id, "WebSocket connection established");

    let mut writer = tokio::spawn(write_loop(
        ws_tx,
        outbound_rx,
        cancel.clone(),
        state.engine.config().ping_interval(),
    ));
    let mut writer_done = false;

    loop {
        tokio::select! {
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    state.engine.handle_inbound(conn_id, text.as_str()).await;
                }
                Some(Ok(Message::Binary(_))) => {
                    handle.send(OutboundMessage::error(
                        "UNSUPPORTED",
                        "Binary frames are not supported",
                    ));
                }
                Some(Ok(Message::Pong(_))) => state.engine.touch(&handle),
                Some(Ok(Message::Ping(_))) => {}
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!(conn_id = %conn_id, error = %e, "WebSocket read error");
                    break;
                }
            },
            _ = cancel.cancelled() => break,
            _ = &mut writer => {
                writer_done = true;
                break;
            }
        }
    }

    state.engine.on_disconnect(conn_id);

    if !writer_done && tokio::time::timeout(WRITER_DRAIN_TIMEOUT, writer).await.is_err() {
        warn!(conn_id = %conn_id, "Outbound writer did not finish in time");
    }

    info!(conn_id = %conn_id, user_id = %handle.user_id, "WebSocket connection closed");
}

/// Forwards queued messages and keepalive pings to the socket.
///
/// On cancellation whatever is still queued is flushed before the close frame.
async fn write_loop(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<OutboundMessage>,
    cancel: CancellationToken,
    ping_every: Duration,
) {
    let mut ping = tokio::time::interval(ping_every);
    ping.tick().await;

    loop {
        tokio::select! {
            biased;
            msg = outbound_rx.recv() => {
                let Some(msg) = msg else { break };
                if !send_frame(&mut ws_tx, &msg).await {
                    return;
                }
            }
            _ = ping.tick() => {
                if !send_frame(&mut ws_tx, &OutboundMessage::ping()).await {
                    return;
                }
            }
            _ = cancel.cancelled() => {
                while let Ok(msg) = outbound_rx.try_recv() {
                    if !send_frame(&mut ws_tx, &msg).await {
                        return;
                    }
                }
                break;
            }
        }
    }

    let _ = ws_tx.send(Message::Close(None)).await;
}

async fn send_frame(ws_tx: &mut SplitSink<WebSocket, Message>, msg: &OutboundMessage) -> bool {
    match serialize_outbound(msg) {
        Ok(text) => ws_tx.send(Message::Text(text.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "Dropping unserializable message");
            true
        }
    }
}
