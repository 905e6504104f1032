//! Outbound calls to the upstream origin.

use axum::body::Body;
use axum::http::header::{HeaderMap, HeaderValue};
use axum::http::request::Parts;
use axum::http::Method;
use serde::Serialize;
use std::time::Duration;
use url::Url;

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::transform::headers::{apply_browser_fingerprint, outbound_headers, SpoofedOrigin};

/// Settings shared by every outbound client: connect timeout and proxy
/// environment handling.
pub fn client_builder(config: &ProxyConfig) -> reqwest::ClientBuilder {
    let builder = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config.timeouts.connect_secs));
    if config.upstream.system_proxy {
        builder
    } else {
        builder.no_proxy()
    }
}

/// Build the HTTP client used for upstream calls. Redirects are never followed.
pub fn build_client(config: &ProxyConfig) -> Result<reqwest::Client, reqwest::Error> {
    client_builder(config)
        .redirect(reqwest::redirect::Policy::none())
        .build()
}

/// A fully prepared call to the upstream.
#[derive(Debug)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    /// Streamed inbound body; absent for GET and HEAD.
    pub body: Option<reqwest::Body>,
}

/// Whether requests with this method forward a body.
pub fn carries_body(method: &Method) -> bool {
    method != Method::GET && method != Method::HEAD
}

/// The single upstream origin.
#[derive(Debug, Clone)]
pub struct Upstream {
    client: reqwest::Client,
    origin: Url,
    spoof: SpoofedOrigin,
}

impl Upstream {
    pub fn with_client(client: reqwest::Client, origin: Url) -> Result<Self, ProxyError> {
        let spoof = SpoofedOrigin::from_url(&origin)?;
        Ok(Self {
            client,
            origin,
            spoof,
        })
    }

    /// `host[:port]` of the upstream, as sent in the `host` header.
    pub fn authority(&self) -> String {
        let host = self.origin.host_str().unwrap_or_default();
        match self.origin.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }

    /// Absolute upstream URL for an inbound path and query.
    ///
    /// Concatenated rather than joined so a path such as `//other.host/x`
    /// stays a path on the upstream.
    pub fn target(&self, path_and_query: &str) -> Result<Url, url::ParseError> {
        Url::parse(&format!(
            "{}{}",
            self.origin.origin().ascii_serialization(),
            path_and_query
        ))
    }

    /// WebSocket URL for an inbound path and query.
    pub fn websocket_target(&self, path_and_query: &str) -> Result<Url, url::ParseError> {
        let scheme = match self.origin.scheme() {
            "https" => "wss",
            _ => "ws",
        };
        Url::parse(&format!("{}://{}{}", scheme, self.authority(), path_and_query))
    }

    /// Derive the outbound call for an inbound request.
    pub fn build_request(
        &self,
        parts: &Parts,
        body: Body,
        browser_fingerprint: bool,
    ) -> Result<OutboundRequest, ProxyError> {
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let url = self.target(path_and_query)?;

        let mut headers = outbound_headers(&parts.headers);
        self.spoof.apply(&mut headers);
        if browser_fingerprint {
            apply_browser_fingerprint(&mut headers);
        }

        let body = carries_body(&parts.method)
            .then(|| reqwest::Body::wrap_stream(body.into_data_stream()));

        Ok(OutboundRequest {
            method: parts.method.clone(),
            url,
            headers,
            body,
        })
    }

    /// Perform the call. 3xx responses are returned as-is.
    pub async fn send(&self, request: OutboundRequest) -> Result<reqwest::Response, ProxyError> {
        tracing::debug!(method = %request.method, url = %request.url, "Forwarding to upstream");
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        Ok(builder.send().await?)
    }

    /// POST a JSON document to an upstream path with spoofed origin headers.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<reqwest::Response, ProxyError> {
        let mut headers = HeaderMap::new();
        self.spoof.apply(&mut headers);
        headers.insert(
            axum::http::header::ACCEPT,
            HeaderValue::from_static("application/json"),
        );
        Ok(self
            .client
            .post(self.target(path)?)
            .headers(headers)
            .json(payload)
            .send()
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn upstream(origin: &str) -> Upstream {
        Upstream::with_client(reqwest::Client::new(), Url::parse(origin).unwrap()).unwrap()
    }

    fn parts(method: Method, uri: &str) -> Parts {
        let (parts, _) = Request::builder()
            .method(method)
            .uri(uri)
            .header("host", "proxy.example")
            .header("origin", "https://proxy.example")
            .header("referer", "https://proxy.example/join")
            .header("accept-encoding", "br")
            .header("cookie", "session=abc")
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn target_keeps_path_and_query() {
        let up = upstream("https://www.gimkit.com");
        assert_eq!(
            up.target("/join?gc=42").unwrap().as_str(),
            "https://www.gimkit.com/join?gc=42"
        );
        assert_eq!(
            up.target("//evil.example/x").unwrap().host_str(),
            Some("www.gimkit.com")
        );
    }

    #[test]
    fn websocket_target_switches_scheme() {
        assert_eq!(
            upstream("https://www.gimkit.com")
                .websocket_target("/socket.io/?EIO=4")
                .unwrap()
                .as_str(),
            "wss://www.gimkit.com/socket.io/?EIO=4"
        );
        let local = upstream("http://127.0.0.1:9000");
        assert_eq!(local.authority(), "127.0.0.1:9000");
        assert_eq!(
            local.websocket_target("/ws").unwrap().as_str(),
            "ws://127.0.0.1:9000/ws"
        );
    }

    #[test]
    fn build_request_spoofs_and_filters() {
        let up = upstream("https://www.gimkit.com");
        let req = up
            .build_request(&parts(Method::GET, "/home?x=1"), Body::from("ignored"), false)
            .unwrap();

        assert_eq!(req.url.as_str(), "https://www.gimkit.com/home?x=1");
        assert_eq!(req.headers["origin"], "https://www.gimkit.com");
        assert_eq!(req.headers["referer"], "https://www.gimkit.com/");
        assert_eq!(req.headers["cookie"], "session=abc");
        assert!(req.headers.get("host").is_none());
        assert!(req.headers.get("accept-encoding").is_none());
        assert!(req.body.is_none());
        assert!(req.headers.get("sec-fetch-site").is_none());
    }

    #[test]
    fn build_request_keeps_body_for_post() {
        let up = upstream("https://www.gimkit.com");
        let req = up
            .build_request(&parts(Method::POST, "/api/x"), Body::from("{}"), true)
            .unwrap();
        assert!(req.body.is_some());
        assert_eq!(req.headers["sec-fetch-site"], "same-origin");
    }

    #[test]
    fn head_and_get_carry_no_body() {
        assert!(!carries_body(&Method::GET));
        assert!(!carries_body(&Method::HEAD));
        assert!(carries_body(&Method::POST));
        assert!(carries_body(&Method::DELETE));
    }
}
