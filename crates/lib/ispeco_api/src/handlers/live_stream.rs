//! WebSocket live relay endpoint.
//!
//! The socket is upgraded before any authorization so rejections can be
//! reported as close codes; [`StreamGate`](ispeco_core::stream::StreamGate)
//! makes every decision after that.

use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use ispeco_core::stream::{CloseReason, FrameSink, Handshake, SessionOutcome, StreamError};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::AppState;
use crate::middleware::auth::resolve_principal;

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// Access token for clients that cannot set an `Authorization` header.
    pub token: Option<String>,
}

/// `GET /ws/live_stream/{camera_id}`
pub async fn live_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(camera_id): Path<String>,
    Query(query): Query<StreamQuery>,
    headers: HeaderMap,
) -> Response {
    let principal = resolve_principal(
        &headers,
        query.token.as_deref(),
        state.config.jwt_secret.as_bytes(),
    );
    ws.on_upgrade(move |socket| handle_socket(socket, state, principal, camera_id))
}

async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    principal: Option<Uuid>,
    camera_id: String,
) {
    let (ws_tx, ws_rx) = socket.split();
    let cancel = CancellationToken::new();
    let reader = tokio::spawn(watch_client(ws_rx, cancel.clone()));

    let mut sink = WsFrameSink { tx: ws_tx };
    let outcome = state
        .gate
        .run(
            Handshake {
                principal,
                camera_id,
            },
            &mut sink,
            cancel.clone(),
        )
        .await;

    cancel.cancel();
    reader.abort();

    match outcome {
        SessionOutcome::Rejected(reason) => {
            debug!(code = reason.code, "live stream rejected");
        }
        SessionOutcome::Finished { frames_sent, end } => {
            info!(frames_sent, ?end, "live stream finished");
        }
    }
}

/// Drain client messages until the peer closes or the socket fails.
async fn watch_client(mut ws_rx: SplitStream<WebSocket>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Pings are answered by the socket itself; other input is ignored.
                Some(Ok(_)) => {}
            }
        }
    }
    debug!("live stream client went away");
    cancel.cancel();
}

struct WsFrameSink {
    tx: SplitSink<WebSocket, Message>,
}

#[async_trait]
impl FrameSink for WsFrameSink {
    async fn send_frame(&mut self, frame: Bytes) -> Result<(), StreamError> {
        self.tx
            .send(Message::Binary(frame))
            .await
            .map_err(|_| StreamError::ClientGone)
    }

    async fn close(&mut self, reason: CloseReason) {
        let frame = CloseFrame {
            code: reason.code,
            reason: Utf8Bytes::from_static(reason.reason),
        };
        let _ = self.tx.send(Message::Close(Some(frame))).await;
    }
}
