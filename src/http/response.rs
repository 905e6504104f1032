//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay upstream responses to the client (streamed or rewritten)
//! - Apply the route's header relay policy
//! - Build the proxy's own responses (redirects, rewritten HTML)
//!
//! # Design Decisions
//! - Pass-through bodies are streamed, never buffered
//! - Hop-by-hop headers and `content-length` are recomputed by the server
//! - 3xx statuses from the upstream reach the client unchanged

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::http::StatusCode;
use axum::response::Response;

use crate::error::ProxyError;
use crate::transform::headers::{relay_headers, RelayPolicy};

/// Content type forced on rewritten HTML.
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Stream an upstream response to the client.
pub fn relay_stream(upstream: reqwest::Response, policy: &RelayPolicy) -> Response {
    let status = upstream.status();
    let headers = relay_headers(upstream.headers(), policy);
    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Build the response for rewritten HTML, keeping the upstream status.
pub fn rewritten_html(status: StatusCode, upstream_headers: &HeaderMap, html: String) -> Response {
    let mut headers = relay_headers(upstream_headers, &RelayPolicy::Full);
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(HTML_CONTENT_TYPE),
    );
    let mut response = Response::new(Body::from(html));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// `302 Found` pointing at `location`.
pub fn found(location: &str) -> Result<Response, ProxyError> {
    Ok(Response::builder()
        .status(StatusCode::FOUND)
        .header(header::LOCATION, location)
        .body(Body::empty())?)
}
