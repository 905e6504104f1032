//! WebSocket proxy handling.
//!
//! # Responsibilities
//! - Complete the upstream handshake with the client's own headers
//! - Complete the upgrade handshake with the client
//! - Bidirectional frame forwarding
//!
//! # Data Flow
//! ```text
//! Client ←──── WebSocket frames ────→ Proxy ←──── WebSocket frames ────→ Upstream
//! ```
//!
//! # Design Decisions
//! - Upstream handshake happens first so a refused upstream is a 500, not a
//!   dangling client socket
//! - No origin/referer rewrite: headers go out as the client sent them
//! - Frame-level forwarding (no message buffering)
//! - Close frames propagated in both directions

use axum::body::Body;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::FromRequestParts;
use axum::http::header::{self, HeaderValue};
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::CloseFrame as UpstreamCloseFrame;
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::ProxyError;
use crate::transform::headers::websocket_handshake_headers;
use crate::upstream::Upstream;

type UpstreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Relay a WebSocket upgrade request to the upstream.
pub async fn proxy_websocket(
    upstream: &Upstream,
    request: Request<Body>,
) -> Result<Response, ProxyError> {
    let (mut parts, _body) = request.into_parts();
    let ws = match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let target = upstream.websocket_target(path_and_query)?;

    let mut handshake = Request::builder().uri(target.as_str()).body(())?;
    *handshake.headers_mut() = websocket_handshake_headers(
        &parts.headers,
        HeaderValue::from_str(&upstream.authority())?,
    );

    let (upstream_socket, upstream_response) = tokio_tungstenite::connect_async(handshake).await?;
    tracing::debug!(target = %target, "Upstream WebSocket connected");

    let protocol = upstream_response
        .headers()
        .get(header::SEC_WEBSOCKET_PROTOCOL)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let ws = match protocol {
        Some(protocol) => ws.protocols([protocol]),
        None => ws,
    };

    let path = parts.uri.path().to_string();
    Ok(ws.on_upgrade(move |client| relay_frames(client, upstream_socket, path)))
}

async fn relay_frames(client: WebSocket, upstream: UpstreamSocket, path: String) {
    let (mut client_tx, mut client_rx) = client.split();
    let (mut upstream_tx, mut upstream_rx) = upstream.split();

    let client_to_upstream = async {
        while let Some(Ok(msg)) = client_rx.next().await {
            let closing = matches!(msg, Message::Close(_));
            if upstream_tx.send(to_upstream(msg)).await.is_err() || closing {
                break;
            }
        }
    };

    let upstream_to_client = async {
        while let Some(Ok(msg)) = upstream_rx.next().await {
            let Some(msg) = to_client(msg) else {
                continue;
            };
            let closing = matches!(msg, Message::Close(_));
            if client_tx.send(msg).await.is_err() || closing {
                break;
            }
        }
    };

    tokio::select! {
        _ = client_to_upstream => {}
        _ = upstream_to_client => {}
    }
    tracing::debug!(path = %path, "WebSocket relay closed");
}

fn to_upstream(msg: Message) -> UpstreamMessage {
    match msg {
        Message::Text(text) => UpstreamMessage::Text(text.as_str().into()),
        Message::Binary(data) => UpstreamMessage::Binary(data),
        Message::Ping(data) => UpstreamMessage::Ping(data),
        Message::Pong(data) => UpstreamMessage::Pong(data),
        Message::Close(frame) => UpstreamMessage::Close(frame.map(|f| UpstreamCloseFrame {
            code: f.code.into(),
            reason: f.reason.as_str().into(),
        })),
    }
}

fn to_client(msg: UpstreamMessage) -> Option<Message> {
    let msg = match msg {
        UpstreamMessage::Text(text) => Message::Text(text.as_str().into()),
        UpstreamMessage::Binary(data) => Message::Binary(data),
        UpstreamMessage::Ping(data) => Message::Ping(data),
        UpstreamMessage::Pong(data) => Message::Pong(data),
        UpstreamMessage::Close(frame) => Message::Close(frame.map(|f| CloseFrame {
            code: f.code.into(),
            reason: f.reason.as_str().into(),
        })),
        UpstreamMessage::Frame(_) => return None,
    };
    Some(msg)
}
