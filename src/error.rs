//! Handler-level error type.
//!
//! Every route handler returns `Result<Response, ProxyError>`. The dispatch
//! in `http::server` logs the error with the request path and converts it
//! into a generic 500, so nothing below that point answers with an error
//! status of its own except the login bridge's 400/405.

use axum::http::header::InvalidHeaderValue;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::bundle::BundleError;

/// Body of every internal-error response.
pub const INTERNAL_ERROR_BODY: &str = "Internal error";

/// Errors that can occur while handling a proxied request.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Network failure or unreadable body talking to the upstream.
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    /// The upstream answered with something the bridge cannot interpret.
    #[error("unexpected upstream response: {0}")]
    UnexpectedResponse(String),

    /// The script bundle could not be obtained.
    #[error(transparent)]
    Bundle(#[from] BundleError),

    /// An upstream target URL could not be built.
    #[error("invalid upstream target: {0}")]
    Target(#[from] url::ParseError),

    /// The inbound request body could not be read.
    #[error("failed to read request body: {0}")]
    RequestBody(#[source] axum::Error),

    /// The upstream leg of a WebSocket handshake failed.
    #[error("upstream websocket handshake failed: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("invalid header value: {0}")]
    HeaderValue(#[from] InvalidHeaderValue),

    #[error("failed to build response: {0}")]
    Http(#[from] axum::http::Error),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY).into_response()
    }
}

/// Response used by the panic safety net.
pub fn internal_error_response() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY).into_response()
}
