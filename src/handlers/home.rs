use serde_json::json;
use std::sync::Arc;

use crate::controller::Controller;
use crate::handlers::{now, VERSION};
use crate::models::HomeResponse;
use crate::router::{HandlerResult, RouteRequest};
use crate::Config;

pub fn controller(config: Arc<Config>) -> Controller {
    Controller::new().action("index", move |_req: &RouteRequest| index(&config))
}

/// Service banner with the endpoint directory.
pub fn index(config: &Config) -> HandlerResult {
    let response = HomeResponse {
        message: format!("Welcome to {}", config.app.name),
        version: VERSION,
        environment: config.app.env.clone(),
        timestamp: now(),
        endpoints: json!({
            "health": "/health",
            "api": {
                "data_ingest": "POST /api/data/ingest",
                "jobs_list": "GET /api/data/jobs",
                "job_detail": "GET /api/data/jobs/{id}"
            }
        }),
    };

    Ok(serde_json::to_value(response)?)
}
