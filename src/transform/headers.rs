//! Header manipulation.
//!
//! # Responsibilities
//! - Strip hop-by-hop and transport headers in both directions
//! - Overwrite `origin`/`referer` so the upstream sees a same-origin call
//! - Synthesize browser fetch-metadata headers for static/API calls
//! - Relay upstream response headers according to a per-route policy
//! - Lift framing restrictions when frame embedding is enabled
//!
//! # Design Decisions
//! - Header allowlists are data (`RelayPolicy`) attached to routes
//! - WebSocket handshakes keep the client's headers verbatim except `host`

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::response::Response;
use url::Url;

use crate::error::ProxyError;

/// Headers meaningful only for a single transport hop.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "te",
    "trailer",
    "upgrade",
];

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Which upstream response headers reach the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayPolicy {
    /// Everything except hop-by-hop headers.
    Full,
    /// Only the listed headers (all values of each).
    Only(Vec<HeaderName>),
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// `origin` and `referer` values presented to the upstream.
#[derive(Debug, Clone)]
pub struct SpoofedOrigin {
    origin: HeaderValue,
    referer: HeaderValue,
}

impl SpoofedOrigin {
    /// Derive the header values from the upstream origin URL.
    pub fn from_url(url: &Url) -> Result<Self, ProxyError> {
        let origin = url.origin().ascii_serialization();
        Ok(Self {
            referer: HeaderValue::from_str(&format!("{}/", origin))?,
            origin: HeaderValue::from_str(&origin)?,
        })
    }

    pub fn origin(&self) -> &HeaderValue {
        &self.origin
    }

    pub fn referer(&self) -> &HeaderValue {
        &self.referer
    }

    /// Overwrite `origin` and `referer` in place.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(header::ORIGIN, self.origin.clone());
        headers.insert(header::REFERER, self.referer.clone());
    }
}

/// Copy inbound request headers that may travel to the upstream.
///
/// `accept-encoding` is dropped so the client negotiates an encoding it
/// can decode itself; `host` and `content-length` are set by the client.
pub fn outbound_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if is_hop_by_hop(name)
            || name == header::HOST
            || name == header::CONTENT_LENGTH
            || name == header::ACCEPT_ENCODING
        {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

/// Make a static/API call look like one issued by the site's own pages.
pub fn apply_browser_fingerprint(headers: &mut HeaderMap) {
    headers.insert("sec-fetch-site", HeaderValue::from_static("same-origin"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("cors"));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("empty"));
    headers
        .entry(header::USER_AGENT)
        .or_insert_with(|| HeaderValue::from_static(DEFAULT_USER_AGENT));
    headers
        .entry(header::ACCEPT_LANGUAGE)
        .or_insert_with(|| HeaderValue::from_static("en-US,en;q=0.9"));
}

/// Select the upstream response headers forwarded to the client.
pub fn relay_headers(upstream: &HeaderMap, policy: &RelayPolicy) -> HeaderMap {
    let mut headers = HeaderMap::new();
    match policy {
        RelayPolicy::Full => {
            for (name, value) in upstream {
                if is_hop_by_hop(name) || name == header::CONTENT_LENGTH {
                    continue;
                }
                headers.append(name.clone(), value.clone());
            }
        }
        RelayPolicy::Only(allowed) => {
            for name in allowed {
                for value in upstream.get_all(name) {
                    headers.append(name.clone(), value.clone());
                }
            }
        }
    }
    headers
}

/// Headers for the upstream leg of a WebSocket handshake.
///
/// Identical to the client's, with `host` pointed at the upstream and
/// extension negotiation removed (the upstream client speaks none).
pub fn websocket_handshake_headers(inbound: &HeaderMap, host: HeaderValue) -> HeaderMap {
    let mut headers = inbound.clone();
    headers.remove(header::SEC_WEBSOCKET_EXTENSIONS);
    headers.insert(header::HOST, host);
    headers
}

/// Remove framing restrictions from a response.
///
/// Policies are rewritten byte-wise so values that are not UTF-8 keep every
/// other directive.
pub fn allow_framing(headers: &mut HeaderMap) {
    headers.remove(header::X_FRAME_OPTIONS);

    let policies: Vec<HeaderValue> = headers
        .get_all(header::CONTENT_SECURITY_POLICY)
        .iter()
        .map(|v| {
            HeaderValue::from_bytes(&permit_frame_ancestors(v.as_bytes()))
                .unwrap_or_else(|_| v.clone())
        })
        .collect();
    headers.remove(header::CONTENT_SECURITY_POLICY);

    if policies.is_empty() {
        headers.insert(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("frame-ancestors *"),
        );
        return;
    }
    for policy in policies {
        headers.append(header::CONTENT_SECURITY_POLICY, policy);
    }
}

fn permit_frame_ancestors(policy: &[u8]) -> Vec<u8> {
    let mut directives: Vec<&[u8]> = policy
        .split(|b| *b == b';')
        .map(<[u8]>::trim_ascii)
        .filter(|d| !d.is_empty())
        .filter(|d| {
            let name = d
                .split(|b| b.is_ascii_whitespace())
                .next()
                .unwrap_or_default();
            !name.eq_ignore_ascii_case(b"frame-ancestors")
        })
        .collect();
    directives.push(b"frame-ancestors *");
    directives.join(&b"; "[..])
}

/// Response middleware applied to every route when frame embedding is on.
pub async fn frame_embedding(mut response: Response) -> Response {
    allow_framing(response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (k, v) in pairs {
            headers.append(*k, HeaderValue::from_static(v));
        }
        headers
    }

    #[test]
    fn spoofed_origin_overwrites_both() {
        let spoof = SpoofedOrigin::from_url(&Url::parse("https://www.gimkit.com").unwrap()).unwrap();
        let mut headers = map(&[
            ("origin", "https://proxy.example"),
            ("referer", "https://proxy.example/join"),
        ]);
        spoof.apply(&mut headers);
        assert_eq!(headers["origin"], "https://www.gimkit.com");
        assert_eq!(headers["referer"], "https://www.gimkit.com/");
        assert_eq!(headers.get_all("origin").iter().count(), 1);
    }

    #[test]
    fn spoofed_origin_keeps_port() {
        let spoof = SpoofedOrigin::from_url(&Url::parse("http://127.0.0.1:9000").unwrap()).unwrap();
        assert_eq!(spoof.origin(), "http://127.0.0.1:9000");
        assert_eq!(spoof.referer(), "http://127.0.0.1:9000/");
    }

    #[test]
    fn outbound_drops_transport_headers() {
        let inbound = map(&[
            ("host", "proxy.example"),
            ("connection", "keep-alive"),
            ("accept-encoding", "gzip, br"),
            ("content-length", "12"),
            ("cookie", "a=1"),
            ("cookie", "b=2"),
            ("content-type", "application/json"),
        ]);
        let out = outbound_headers(&inbound);
        assert!(out.get("host").is_none());
        assert!(out.get("connection").is_none());
        assert!(out.get("accept-encoding").is_none());
        assert!(out.get("content-length").is_none());
        assert_eq!(out.get_all("cookie").iter().count(), 2);
        assert_eq!(out["content-type"], "application/json");
    }

    #[test]
    fn fingerprint_keeps_client_user_agent() {
        let mut headers = map(&[("user-agent", "custom/1.0"), ("sec-fetch-site", "cross-site")]);
        apply_browser_fingerprint(&mut headers);
        assert_eq!(headers["user-agent"], "custom/1.0");
        assert_eq!(headers["sec-fetch-site"], "same-origin");
        assert_eq!(headers["sec-fetch-mode"], "cors");
        assert!(headers.contains_key("accept-language"));
    }

    #[test]
    fn selective_relay_only_keeps_listed() {
        let upstream = map(&[
            ("content-type", "image/png"),
            ("set-cookie", "a=1"),
            ("set-cookie", "b=2"),
            ("cache-control", "max-age=60"),
            ("x-powered-by", "express"),
            ("transfer-encoding", "chunked"),
        ]);
        let relayed = relay_headers(
            &upstream,
            &RelayPolicy::Only(vec![header::CONTENT_TYPE, header::SET_COOKIE]),
        );
        assert_eq!(relayed.len(), 3);
        assert_eq!(relayed["content-type"], "image/png");
        assert_eq!(relayed.get_all("set-cookie").iter().count(), 2);
        assert!(relayed.get("cache-control").is_none());
    }

    #[test]
    fn full_relay_strips_hop_by_hop() {
        let upstream = map(&[
            ("content-type", "text/css"),
            ("cache-control", "max-age=60"),
            ("transfer-encoding", "chunked"),
            ("connection", "close"),
            ("content-length", "10"),
        ]);
        let relayed = relay_headers(&upstream, &RelayPolicy::Full);
        assert_eq!(relayed.len(), 2);
        assert_eq!(relayed["cache-control"], "max-age=60");
    }

    #[test]
    fn websocket_headers_untouched_except_host() {
        let inbound = map(&[
            ("host", "proxy.example"),
            ("origin", "https://proxy.example"),
            ("referer", "https://proxy.example/join"),
            ("upgrade", "websocket"),
            ("connection", "Upgrade"),
            ("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ=="),
            ("sec-websocket-extensions", "permessage-deflate"),
        ]);
        let out = websocket_handshake_headers(&inbound, HeaderValue::from_static("www.gimkit.com"));
        assert_eq!(out["host"], "www.gimkit.com");
        assert_eq!(out["origin"], "https://proxy.example");
        assert_eq!(out["referer"], "https://proxy.example/join");
        assert_eq!(out["upgrade"], "websocket");
        assert_eq!(out["sec-websocket-key"], "dGhlIHNhbXBsZSBub25jZQ==");
        assert!(out.get("sec-websocket-extensions").is_none());
    }

    #[test]
    fn framing_restrictions_replaced() {
        let mut headers = map(&[
            ("x-frame-options", "SAMEORIGIN"),
            ("content-security-policy", "default-src 'self'; frame-ancestors 'self'"),
        ]);
        allow_framing(&mut headers);
        assert!(headers.get("x-frame-options").is_none());
        assert_eq!(
            headers["content-security-policy"],
            "default-src 'self'; frame-ancestors *"
        );
    }

    #[test]
    fn framing_directive_added_when_no_policy() {
        let mut headers = HeaderMap::new();
        allow_framing(&mut headers);
        assert_eq!(headers["content-security-policy"], "frame-ancestors *");
    }

    #[test]
    fn non_utf8_policy_keeps_its_directives() {
        let mut headers = HeaderMap::new();
        headers.append(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_bytes(b"default-src 'self' \xff; frame-ancestors 'none'").unwrap(),
        );
        headers.append(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("script-src 'self'"),
        );
        allow_framing(&mut headers);

        let values: Vec<&[u8]> = headers
            .get_all(header::CONTENT_SECURITY_POLICY)
            .iter()
            .map(HeaderValue::as_bytes)
            .collect();
        assert_eq!(
            values,
            vec![
                &b"default-src 'self' \xff; frame-ancestors *"[..],
                &b"script-src 'self'; frame-ancestors *"[..],
            ]
        );
    }
}
