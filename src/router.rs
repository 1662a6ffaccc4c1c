//! Route table and request dispatch.
//!
//! Routes are kept in registration order and the first route whose method and
//! path pattern both match wins. There is no specificity ranking, and a route
//! with the right path but the wrong method is skipped rather than reported.
//!
//! Path patterns are split on `/` when registered. A segment containing
//! `{name}` tokens matches exactly one non-empty path segment, with each token
//! standing for one or more characters, and captures that whole segment; every
//! other segment must match literally. Captures are handed to the handler
//! positionally, left to right. The names are only markers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::controller::{ControllerRegistry, ResolveError};
use crate::error::{DispatchError, HandlerError};

pub type HandlerResult = std::result::Result<Value, HandlerError>;

/// A route handler. Receives the matched request and returns the response body.
pub type Handler = Arc<dyn Fn(&RouteRequest) -> HandlerResult + Send + Sync>;

/// What a handler gets to see of the request.
#[derive(Debug, Clone, Default)]
pub struct RouteRequest {
    params: Vec<String>,
    body: Bytes,
}

impl RouteRequest {
    pub fn new(params: Vec<String>, body: Bytes) -> Self {
        Self { params, body }
    }

    /// Captured path parameters in pattern order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Status code and JSON body produced for every dispatched request.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResult {
    pub status: StatusCode,
    pub body: Value,
}

impl DispatchResult {
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }
}

impl From<DispatchError> for DispatchResult {
    fn from(err: DispatchError) -> Self {
        Self {
            status: err.status(),
            body: json!({ "error": err.to_string() }),
        }
    }
}

impl IntoResponse for DispatchResult {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Wildcard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    // Segment holding one or more `{name}` tokens, e.g. `{id}` or `report-{id}`
    Param { names: Vec<String>, pieces: Vec<Piece> },
}

impl Segment {
    fn parse(raw: &str) -> Self {
        let mut names = Vec::new();
        let mut pieces = Vec::new();
        let mut rest = raw;

        while let Some(open) = rest.find('{') {
            let after = &rest[open + 1..];
            let Some(close) = after.find('}').filter(|close| *close > 0) else {
                break;
            };
            if open > 0 {
                pieces.push(Piece::Literal(rest[..open].to_string()));
            }
            names.push(after[..close].to_string());
            pieces.push(Piece::Wildcard);
            rest = &after[close + 1..];
        }

        if names.is_empty() {
            return Segment::Literal(raw.to_string());
        }
        if !rest.is_empty() {
            pieces.push(Piece::Literal(rest.to_string()));
        }
        Segment::Param { names, pieces }
    }
}

/// Whether `text` is fully covered by `pieces`. Each wildcard takes at least
/// one character.
fn pieces_match(pieces: &[Piece], text: &str) -> bool {
    match pieces.split_first() {
        None => text.is_empty(),
        Some((Piece::Literal(literal), rest)) => text
            .strip_prefix(literal.as_str())
            .is_some_and(|remaining| pieces_match(rest, remaining)),
        Some((Piece::Wildcard, rest)) => text
            .char_indices()
            .skip(1)
            .map(|(split, _)| split)
            .chain(std::iter::once(text.len()))
            .filter(|split| *split > 0)
            .any(|split| pieces_match(rest, &text[split..])),
    }
}

/// A path pattern compiled into fixed segments.
///
/// A segment containing `{name}` tokens matches any single non-empty path
/// segment of the right shape and captures that whole segment, so
/// `/files/report-{id}` against `/files/report-7` captures `report-7`.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Self {
        Self {
            raw: pattern.to_string(),
            segments: pattern.split('/').map(Segment::parse).collect(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Placeholder names in the order they appear.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Param { names, .. } => Some(names.iter().map(String::as_str)),
                Segment::Literal(_) => None,
            })
            .flatten()
    }

    /// Match `path` and return the captured values, or `None` if it does not
    /// match. Each placeholder segment contributes one value.
    pub fn captures(&self, path: &str) -> Option<Vec<String>> {
        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = Vec::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Param { pieces, .. } if pieces_match(pieces, part) => {
                    params.push(part.to_string())
                }
                _ => return None,
            }
        }
        Some(params)
    }
}

/// Where a route sends its requests.
#[derive(Clone)]
enum Target {
    Handler(Handler),
    // Named reference that failed to resolve at registration
    Unresolved {
        reference: String,
        error: ResolveError,
    },
}

#[derive(Clone)]
pub struct Route {
    method: Method,
    pattern: PathPattern,
    target: Target,
}

impl Route {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.target, Target::Handler(_))
    }
}

/// Ordered route table. Built once at startup, read-only afterwards.
#[derive(Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
    controllers: ControllerRegistry,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Router whose named routes resolve against `controllers`.
    pub fn with_controllers(controllers: ControllerRegistry) -> Self {
        Self {
            routes: Vec::new(),
            controllers,
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn route<F>(&mut self, method: Method, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&RouteRequest) -> HandlerResult + Send + Sync + 'static,
    {
        self.push(method, path, Target::Handler(Arc::new(handler)))
    }

    pub fn get<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&RouteRequest) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::GET, path, handler)
    }

    pub fn post<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&RouteRequest) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::POST, path, handler)
    }

    pub fn put<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&RouteRequest) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::PUT, path, handler)
    }

    pub fn delete<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&RouteRequest) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(Method::DELETE, path, handler)
    }

    /// Register a route by `"controller@action"` reference.
    ///
    /// The reference is resolved now. A reference that does not resolve still
    /// registers the route; requests that reach it get a 500.
    pub fn action(&mut self, method: Method, path: &str, reference: &str) -> &mut Self {
        let target = match self.controllers.resolve(reference) {
            Ok(handler) => Target::Handler(handler),
            Err(error) => {
                tracing::warn!(%method, path, reference, %error, "Route handler did not resolve");
                Target::Unresolved {
                    reference: reference.to_string(),
                    error,
                }
            }
        };
        self.push(method, path, target)
    }

    pub fn get_action(&mut self, path: &str, reference: &str) -> &mut Self {
        self.action(Method::GET, path, reference)
    }

    pub fn post_action(&mut self, path: &str, reference: &str) -> &mut Self {
        self.action(Method::POST, path, reference)
    }

    pub fn put_action(&mut self, path: &str, reference: &str) -> &mut Self {
        self.action(Method::PUT, path, reference)
    }

    pub fn delete_action(&mut self, path: &str, reference: &str) -> &mut Self {
        self.action(Method::DELETE, path, reference)
    }

    fn push(&mut self, method: Method, path: &str, target: Target) -> &mut Self {
        self.routes.push(Route {
            method,
            pattern: PathPattern::parse(path),
            target,
        });
        self
    }

    pub fn dispatch(&self, method: &Method, uri: &str) -> DispatchResult {
        self.dispatch_with_body(method, uri, Bytes::new())
    }

    /// Dispatch a request that carries a body. Query string and fragment are
    /// ignored for matching.
    pub fn dispatch_with_body(&self, method: &Method, uri: &str, body: Bytes) -> DispatchResult {
        let path = request_path(uri);
        match self.try_dispatch(method, &path, body) {
            Ok(body) => DispatchResult::ok(body),
            Err(err) => DispatchResult::from(err),
        }
    }

    fn try_dispatch(
        &self,
        method: &Method,
        path: &str,
        body: Bytes,
    ) -> std::result::Result<Value, DispatchError> {
        let (route, params) = self
            .routes
            .iter()
            .filter(|route| route.method == *method)
            .find_map(|route| route.pattern.captures(path).map(|params| (route, params)))
            .ok_or_else(|| {
                tracing::debug!(%method, path, "No route matched");
                DispatchError::NotFound
            })?;

        tracing::debug!(
            %method,
            path,
            pattern = route.pattern.as_str(),
            params = ?route.pattern.param_names().collect::<Vec<_>>(),
            "Route matched"
        );

        let handler = match &route.target {
            Target::Handler(handler) => handler,
            Target::Unresolved { reference, error } => {
                tracing::error!(%method, path, reference = %reference, "Route handler unavailable: {}", error);
                return Err((*error).into());
            }
        };

        handler(&RouteRequest::new(params, body)).map_err(|err| {
            tracing::error!(%method, path, "Handler failed: {}", err);
            DispatchError::Handler(err)
        })
    }
}

/// The path component of `uri`. Absolute URIs (`http://host/path`) go
/// through `Uri`; anything else is cut at the first `?` or `#`.
fn request_path(uri: &str) -> String {
    match uri.parse::<Uri>() {
        Ok(parsed) if parsed.scheme().is_some() => parsed.path().to_string(),
        _ => uri
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Controller;

    fn echo_params(req: &RouteRequest) -> HandlerResult {
        Ok(json!(req.params()))
    }

    fn tagged(tag: &'static str) -> impl Fn(&RouteRequest) -> HandlerResult {
        move |_req: &RouteRequest| Ok(json!({ "handler": tag }))
    }

    fn matches(pattern: &PathPattern, path: &str) -> bool {
        pattern.captures(path).is_some()
    }

    #[test]
    fn test_pattern_segments() {
        let pattern = PathPattern::parse("/jobs/{id}/items/{item}");
        assert_eq!(pattern.as_str(), "/jobs/{id}/items/{item}");
        assert_eq!(pattern.param_names().collect::<Vec<_>>(), vec!["id", "item"]);
        assert!(matches(&pattern, "/jobs/42/items/7"));
        assert!(!matches(&pattern, "/jobs/42/items"));
        assert!(!matches(&pattern, "/jobs//items/7"));
        assert!(!matches(&pattern, "/jobs/42/things/7"));
    }

    #[test]
    fn test_placeholder_inside_segment() {
        let pattern = PathPattern::parse("/files/report-{id}");
        assert_eq!(pattern.param_names().collect::<Vec<_>>(), vec!["id"]);
        assert_eq!(
            pattern.captures("/files/report-1"),
            Some(vec!["report-1".to_string()])
        );
        assert!(!matches(&pattern, "/files/report-"));
        assert!(!matches(&pattern, "/files/summary-1"));
        assert!(!matches(&pattern, "/files/report-1/pdf"));

        let pattern = PathPattern::parse("/exports/{name}.{ext}");
        assert_eq!(pattern.param_names().collect::<Vec<_>>(), vec!["name", "ext"]);
        assert_eq!(
            pattern.captures("/exports/jobs.2024.csv"),
            Some(vec!["jobs.2024.csv".to_string()])
        );
        assert!(!matches(&pattern, "/exports/jobs."));
        assert!(!matches(&pattern, "/exports/jobs"));
    }

    #[test]
    fn test_empty_braces_are_literal() {
        let pattern = PathPattern::parse("/files/{}");
        assert_eq!(pattern.param_names().count(), 0);
        assert!(matches(&pattern, "/files/{}"));
        assert!(!matches(&pattern, "/files/1"));
    }

    #[test]
    fn test_root_pattern() {
        let pattern = PathPattern::parse("/");
        assert!(matches(&pattern, "/"));
        assert!(!matches(&pattern, "/health"));
    }

    #[test]
    fn test_partial_placeholder_dispatch() {
        let mut router = Router::new();
        router.get("/files/report-{id}", echo_params);

        let result = router.dispatch(&Method::GET, "/files/report-1");
        assert_eq!(result.status, StatusCode::OK);
        assert_eq!(result.body, json!(["report-1"]));
    }

    #[test]
    fn test_health_scenario() {
        let mut router = Router::new();
        router.get("/health", |_req: &RouteRequest| Ok(json!({ "status": "healthy" })));

        let result = router.dispatch(&Method::GET, "/health");
        assert_eq!(result.status, StatusCode::OK);
        assert_eq!(result.body, json!({ "status": "healthy" }));
    }

    #[test]
    fn test_ingest_scenario() {
        let mut router = Router::new();
        router.post("/api/data/ingest", |_req: &RouteRequest| Ok(json!({ "job_id": "abc" })));

        let result = router.dispatch(&Method::POST, "/api/data/ingest");
        assert_eq!(result.status, StatusCode::OK);
        assert_eq!(result.body, json!({ "job_id": "abc" }));
    }

    #[test]
    fn test_empty_table_is_not_found() {
        let router = Router::new();
        let result = router.dispatch(&Method::GET, "/anything");
        assert_eq!(result.status, StatusCode::NOT_FOUND);
        assert_eq!(result.body, json!({ "error": "Route not found" }));
    }

    #[test]
    fn test_params_extracted_left_to_right() {
        let mut router = Router::new();
        router.get("/jobs/{id}/items/{item}", echo_params);

        let result = router.dispatch(&Method::GET, "/jobs/42/items/7");
        assert_eq!(result.status, StatusCode::OK);
        assert_eq!(result.body, json!(["42", "7"]));
    }

    #[test]
    fn test_segment_count_mismatch_never_matches() {
        let mut router = Router::new();
        router.get("/jobs/{id}", echo_params);

        for uri in ["/jobs", "/jobs/", "/jobs/42/extra"] {
            let result = router.dispatch(&Method::GET, uri);
            assert_eq!(result.status, StatusCode::NOT_FOUND, "{uri} should not match");
        }
        assert_eq!(router.dispatch(&Method::GET, "/jobs/42").body, json!(["42"]));
    }

    #[test]
    fn test_query_string_is_ignored() {
        let mut router = Router::new();
        router.get("/jobs", tagged("jobs"));
        router.get("/jobs/{id}", echo_params);

        assert_eq!(
            router.dispatch(&Method::GET, "/jobs?x=1"),
            router.dispatch(&Method::GET, "/jobs")
        );
        assert_eq!(
            router.dispatch(&Method::GET, "/jobs/9?page=2#top").body,
            json!(["9"])
        );
        assert_eq!(
            router.dispatch(&Method::GET, "http://localhost:8000/jobs?x=1").body,
            json!({ "handler": "jobs" })
        );
    }

    #[test]
    fn test_query_string_is_ignored_for_relative_paths() {
        let mut router = Router::new();
        router.get("jobs", tagged("jobs"));
        router.get("jobs/{id}", echo_params);

        let plain = router.dispatch(&Method::GET, "jobs");
        assert_eq!(plain.status, StatusCode::OK);
        assert_eq!(plain.body, json!({ "handler": "jobs" }));
        assert_eq!(router.dispatch(&Method::GET, "jobs?x=1"), plain);
        assert_eq!(router.dispatch(&Method::GET, "jobs#top"), plain);
        assert_eq!(router.dispatch(&Method::GET, "jobs/3?x=1").body, json!(["3"]));
    }

    #[test]
    fn test_request_path() {
        assert_eq!(request_path("/jobs?x=1"), "/jobs");
        assert_eq!(request_path("jobs"), "jobs");
        assert_eq!(request_path("jobs?x=1"), "jobs");
        assert_eq!(request_path("/jobs#frag"), "/jobs");
        assert_eq!(request_path("https://example.com/api/data/jobs?page=2"), "/api/data/jobs");
    }

    #[test]
    fn test_first_match_wins() {
        let mut router = Router::new();
        router
            .get("/jobs/{id}", tagged("first"))
            .get("/jobs/latest", tagged("second"))
            .get("/jobs/{id}", tagged("duplicate"));

        assert_eq!(
            router.dispatch(&Method::GET, "/jobs/latest").body,
            json!({ "handler": "first" })
        );
        assert_eq!(router.routes().len(), 3);
    }

    #[test]
    fn test_method_must_match() {
        let mut router = Router::new();
        router
            .post("/jobs", tagged("create"))
            .put("/jobs/{id}", tagged("update"))
            .delete("/jobs/{id}", tagged("remove"));

        assert_eq!(router.dispatch(&Method::GET, "/jobs").status, StatusCode::NOT_FOUND);
        assert_eq!(
            router.dispatch(&Method::PUT, "/jobs/3").body,
            json!({ "handler": "update" })
        );
        assert_eq!(
            router.dispatch(&Method::DELETE, "/jobs/3").body,
            json!({ "handler": "remove" })
        );
    }

    #[test]
    fn test_handler_failure_becomes_500() {
        let mut router = Router::new();
        router.get("/explode", |_req: &RouteRequest| Err(HandlerError::internal("boom")));

        let result = router.dispatch(&Method::GET, "/explode");
        assert_eq!(result.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(result.body, json!({ "error": "boom" }));
    }

    #[test]
    fn test_body_reaches_handler() {
        let mut router = Router::new();
        router.post("/echo", |req: &RouteRequest| {
            Ok(json!(String::from_utf8_lossy(req.body())))
        });

        let result = router.dispatch_with_body(&Method::POST, "/echo", Bytes::from_static(b"hello"));
        assert_eq!(result.body, json!("hello"));
    }

    #[test]
    fn test_named_routes() {
        let controllers = ControllerRegistry::new().register(
            "jobs",
            Controller::new()
                .action("show", echo_params)
                .action("fail", |_req: &RouteRequest| {
                    Err(HandlerError::internal("job store offline"))
                }),
        );
        let mut router = Router::with_controllers(controllers);
        router
            .get_action("/jobs/{id}", "jobs@show")
            .post_action("/jobs", "jobs@create")
            .put_action("/jobs/{id}", "queue@update")
            .delete_action("/jobs/{id}", "jobs@fail");

        assert!(router.routes()[0].is_resolved());
        assert!(!router.routes()[1].is_resolved());
        assert!(!router.routes()[2].is_resolved());

        assert_eq!(router.dispatch(&Method::GET, "/jobs/5").body, json!(["5"]));

        let missing_method = router.dispatch(&Method::POST, "/jobs");
        assert_eq!(missing_method.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(missing_method.body, json!({ "error": "Method not found" }));

        let missing_controller = router.dispatch(&Method::PUT, "/jobs/5");
        assert_eq!(missing_controller.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(missing_controller.body, json!({ "error": "Controller not found" }));

        let failed = router.dispatch(&Method::DELETE, "/jobs/5");
        assert_eq!(failed.body, json!({ "error": "job store offline" }));
    }

    #[test]
    fn test_unresolved_route_still_shadows_later_routes() {
        let mut router = Router::new();
        router
            .get_action("/health", "health@check")
            .get("/health", tagged("fallback"));

        let result = router.dispatch(&Method::GET, "/health");
        assert_eq!(result.body, json!({ "error": "Controller not found" }));
    }
}
