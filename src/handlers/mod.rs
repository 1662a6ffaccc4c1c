pub mod data;
pub mod health;
pub mod home;

use axum::{
    body::Bytes,
    extract::State,
    http::{Method, Uri},
};
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;

use crate::controller::ControllerRegistry;
use crate::router::DispatchResult;
use crate::{AppState, Config};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Every controller the service exposes, keyed by the name used in route references.
pub fn controllers(config: Arc<Config>) -> ControllerRegistry {
    ControllerRegistry::new()
        .register("home", home::controller(config.clone()))
        .register("health", health::controller(config))
        .register("data", data::controller())
}

/// Fallback for the HTTP server: hands every request to the route table.
pub async fn dispatch(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> DispatchResult {
    state.router.dispatch_with_body(&method, uri.path(), body)
}

/// RFC 3339 with a numeric offset, e.g. `2024-05-01T12:00:00+00:00`.
pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, false)
}

pub(crate) fn now() -> String {
    timestamp(Utc::now())
}
