//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Compile the fixed rule set from configuration
//! - Look up the matching route for a request
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) ordered scan, first match wins
//! - Explicit NoMatch rather than silent default

use axum::body::Body;
use axum::http::{header, Request};

use crate::config::ProxyConfig;
use crate::routing::matcher::{
    AnyMatcher, CatchAllMatcher, ExactPathMatcher, ExtensionMatcher, Matcher, PathPrefixMatcher,
    UpgradeMatcher,
};
use crate::transform::headers::RelayPolicy;

/// Handling strategy selected for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// WebSocket upgrade, relayed frame by frame.
    WebSocket,
    /// Binary asset, streamed with minimal header relay.
    Asset,
    /// Script/style/data or API call, streamed with full header relay.
    Static,
    /// Login bridge form page.
    LoginPage,
    /// Login bridge JSON submission.
    LoginSubmit,
    /// Join page, HTML gets the bundle injected.
    Join,
    /// Redirect to the join page.
    RedirectToJoin,
    /// Anything else, streamed unmodified.
    Passthrough,
}

/// A compiled route.
#[derive(Debug)]
pub struct Route {
    /// Route identifier for logging/metrics.
    pub name: &'static str,
    pub kind: RouteKind,
    /// Which upstream response headers reach the client.
    pub relay: RelayPolicy,
    matcher: Box<dyn Matcher>,
}

impl Route {
    pub fn new(
        name: &'static str,
        kind: RouteKind,
        relay: RelayPolicy,
        matcher: Box<dyn Matcher>,
    ) -> Self {
        Self {
            name,
            kind,
            relay,
            matcher,
        }
    }
}

/// Ordered route table.
#[derive(Debug)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Build a router from explicit routes, evaluated in the given order.
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Compile the rule set described by the configuration.
    pub fn from_config(config: &ProxyConfig) -> Self {
        let routing = &config.routing;
        let mut routes = Vec::new();

        if config.features.websocket_passthrough {
            routes.push(Route::new(
                "websocket",
                RouteKind::WebSocket,
                RelayPolicy::Full,
                Box::new(UpgradeMatcher),
            ));
        }

        routes.push(Route::new(
            "asset",
            RouteKind::Asset,
            RelayPolicy::Only(vec![header::CONTENT_TYPE, header::SET_COOKIE]),
            Box::new(ExtensionMatcher::new(routing.asset_extensions.iter().cloned())),
        ));

        let mut static_matchers: Vec<Box<dyn Matcher>> = vec![Box::new(ExtensionMatcher::new(
            routing.static_extensions.iter().cloned(),
        ))];
        for prefix in &routing.static_prefixes {
            static_matchers.push(Box::new(PathPrefixMatcher::new(prefix.clone())));
        }
        routes.push(Route::new(
            "static",
            RouteKind::Static,
            RelayPolicy::Full,
            Box::new(AnyMatcher::new(static_matchers)),
        ));

        if config.login.enabled {
            routes.push(Route::new(
                "login_page",
                RouteKind::LoginPage,
                RelayPolicy::Full,
                Box::new(ExactPathMatcher::new(config.login.page_path.clone())),
            ));
            routes.push(Route::new(
                "login_submit",
                RouteKind::LoginSubmit,
                RelayPolicy::Full,
                Box::new(ExactPathMatcher::new(config.login.submit_path.clone())),
            ));
        }

        routes.push(Route::new(
            "join",
            RouteKind::Join,
            RelayPolicy::Full,
            Box::new(ExactPathMatcher::new(routing.join_path.clone())),
        ));

        if routing.redirect_root_to_join {
            routes.push(Route::new(
                "root_redirect",
                RouteKind::RedirectToJoin,
                RelayPolicy::Full,
                Box::new(ExactPathMatcher::new("/")),
            ));
        }

        if routing.proxy_unmatched {
            routes.push(Route::new(
                "passthrough",
                RouteKind::Passthrough,
                RelayPolicy::Full,
                Box::new(CatchAllMatcher),
            ));
        }

        Self::new(routes)
    }

    /// Find the first route matching the request.
    pub fn match_request(&self, req: &Request<Body>) -> Option<&Route> {
        self.routes.iter().find(|route| route.matcher.matches(req))
    }

    /// All routes in evaluation order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}
