//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the single catch-all handler
//! - Wire up middleware (tracing, request ID, panic safety net, framing)
//! - Bind server to listener with graceful shutdown
//! - Dispatch requests to the route classifier and per-kind handlers
//! - Turn every handler error into the generic internal-error response
//! - Observability (metrics, correlation IDs)

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use url::Url;

use crate::bundle::BundleCache;
use crate::config::{FeatureConfig, ProxyConfig};
use crate::error::{internal_error_response, ProxyError};
use crate::http::request::{MakeRequestUuid, RequestIdExt, X_REQUEST_ID};
use crate::http::response::{found, relay_stream, rewritten_html};
use crate::http::websocket::proxy_websocket;
use crate::login::LoginBridge;
use crate::observability::metrics;
use crate::routing::{Route, RouteKind, Router as ProxyRouter};
use crate::transform::headers::frame_embedding;
use crate::transform::html::is_html;
use crate::transform::HtmlRewriter;
use crate::upstream::{build_client, client_builder, Upstream};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ProxyRouter>,
    pub upstream: Arc<Upstream>,
    pub bundle: Arc<BundleCache>,
    pub rewriter: Arc<HtmlRewriter>,
    pub login: Arc<LoginBridge>,
    pub features: FeatureConfig,
    pub join_path: Arc<str>,
}

impl AppState {
    /// Build every collaborator from the configuration.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ProxyError> {
        let origin = Url::parse(&config.upstream.origin)?;
        let upstream = Arc::new(Upstream::with_client(build_client(config)?, origin)?);

        // The bundle host may move the script; its client follows redirects.
        let bundle = Arc::new(BundleCache::new(
            client_builder(config).build()?,
            Url::parse(&config.bundle.source_url)?,
            Duration::from_secs(config.bundle.ttl_secs),
        ));

        let rewriter = Arc::new(HtmlRewriter::new(
            &config.rewrite.asset_meta_property,
            config.asset_meta_content(),
        ));

        let login = Arc::new(LoginBridge::new(upstream.clone(), config));

        Ok(Self {
            router: Arc::new(ProxyRouter::from_config(config)),
            upstream,
            bundle,
            rewriter,
            login,
            features: config.features.clone(),
            join_path: config.routing.join_path.as_str().into(),
        })
    }
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, ProxyError> {
        let state = AppState::from_config(&config)?;
        let router = Self::build_router(&config, state.clone());
        Ok(Self {
            router,
            config,
            state,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let router = Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state);

        apply_layers(router, &config.features)
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.origin,
            routes = self.state.router.routes().len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

}

/// Wrap a router in the proxy's middleware stack.
///
/// A panicking handler becomes the generic 500 for that request only.
pub fn apply_layers(router: Router, features: &FeatureConfig) -> Router {
    let router = if features.frame_embedding {
        router.layer(axum::middleware::map_response(frame_embedding))
    } else {
        router
    };

    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(CatchPanicLayer::custom(handle_panic)),
    )
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "Handler panicked");
    internal_error_response()
}

/// Main proxy handler.
/// Classifies the request and hands it to the handler for its route kind.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request.request_id();
    let path = request.uri().path().to_string();
    let method = request.method().clone();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "Proxying request"
    );

    let route = match state.router.match_request(&request) {
        Some(r) => r,
        None => {
            tracing::info!(request_id = %request_id, path = %path, "No route matched");
            metrics::record_request("none", 404, start_time);
            return (StatusCode::NOT_FOUND, "Not found").into_response();
        }
    };

    let response = match dispatch(&state, route, request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                route = route.name,
                path = %path,
                error = %e,
                "Request failed"
            );
            e.into_response()
        }
    };

    metrics::record_request(route.name, response.status().as_u16(), start_time);
    response
}

async fn dispatch(
    state: &AppState,
    route: &Route,
    request: Request<Body>,
) -> Result<Response, ProxyError> {
    match route.kind {
        RouteKind::WebSocket => proxy_websocket(&state.upstream, request).await,
        RouteKind::Asset | RouteKind::Passthrough => forward(state, route, request, false).await,
        RouteKind::Static => {
            forward(state, route, request, state.features.browser_fingerprint).await
        }
        RouteKind::Join => join_page(state, route, request).await,
        RouteKind::RedirectToJoin => {
            let location = match request.uri().query() {
                Some(query) => format!("{}?{}", state.join_path, query),
                None => state.join_path.to_string(),
            };
            found(&location)
        }
        RouteKind::LoginPage => Ok(state.login.page()),
        RouteKind::LoginSubmit => state.login.submit(request).await,
    }
}

/// Forward to the upstream and stream the answer back in both directions.
async fn forward(
    state: &AppState,
    route: &Route,
    request: Request<Body>,
    browser_fingerprint: bool,
) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();
    let outbound = state
        .upstream
        .build_request(&parts, body, browser_fingerprint)?;
    let upstream_response = state.upstream.send(outbound).await?;
    Ok(relay_stream(upstream_response, &route.relay))
}

/// Forward the join page and inject the bundle into HTML answers.
async fn join_page(
    state: &AppState,
    route: &Route,
    request: Request<Body>,
) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();
    let outbound = state.upstream.build_request(&parts, body, false)?;
    let upstream_response = state.upstream.send(outbound).await?;

    let html = upstream_response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(is_html);
    if !html {
        return Ok(relay_stream(upstream_response, &route.relay));
    }

    let status = upstream_response.status();
    let headers = upstream_response.headers().clone();
    let text = upstream_response.text().await?;
    let bundle = state.bundle.get().await?;

    Ok(rewritten_html(
        status,
        &headers,
        state.rewriter.rewrite(&text, &bundle),
    ))
}
