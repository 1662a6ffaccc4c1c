//! HTTP application shell for the data ingestion platform.
//!
//! Requests enter through a single axum fallback and are matched against an
//! ordered route table ([`router::Router`]). Handlers are plain functions that
//! return a JSON body or a [`HandlerError`]; the router turns either into a
//! status code and body.

pub mod config;
pub mod controller;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;

use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use error::{AppError, DispatchError, HandlerError, Result};

use crate::router::Router;

pub struct AppState {
    pub config: Arc<Config>,
    pub router: Router,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        Self {
            router: routes(config.clone()),
            config,
        }
    }
}

/// The route table, in match order.
pub fn routes(config: Arc<Config>) -> Router {
    let mut router = Router::with_controllers(handlers::controllers(config));
    router
        .get_action("/", "home@index")
        .get_action("/health", "health@check")
        .post_action("/api/data/ingest", "data@ingest")
        .get_action("/api/data/jobs", "data@list_jobs")
        .get_action("/api/data/jobs/{id}", "data@show_job");
    router
}

pub fn build_app(state: Arc<AppState>) -> axum::Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    axum::Router::new()
        .fallback(handlers::dispatch)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
