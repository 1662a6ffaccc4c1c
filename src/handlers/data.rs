//! Data ingestion and job endpoints.
//!
//! There is no job store behind these yet. Ingestion accepts any non-empty
//! JSON document and hands back a fresh job id; the job listings are fixed
//! placeholder records stamped relative to the current time.

use chrono::{Duration, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::controller::Controller;
use crate::handlers::{now, timestamp};
use crate::models::{
    FailedResponse, IngestResponse, JobDetail, JobList, JobResponse, JobStatus, JobSummary,
};
use crate::router::{HandlerResult, RouteRequest};

pub fn controller() -> Controller {
    Controller::new()
        .action("ingest", ingest)
        .action("list_jobs", list_jobs)
        .action("show_job", show_job)
}

pub fn ingest(req: &RouteRequest) -> HandlerResult {
    let input = match serde_json::from_slice::<Value>(req.body()) {
        Ok(input) if !is_blank(&input) => input,
        _ => return Ok(serde_json::to_value(FailedResponse::new("Invalid JSON input"))?),
    };

    let data_size = serde_json::to_vec(&input)?.len();
    let response = IngestResponse {
        message: "Data ingestion job created".to_string(),
        job_id: new_job_id(),
        status: JobStatus::Pending,
        timestamp: now(),
        data_size,
    };

    tracing::info!(job_id = %response.job_id, data_size, "Ingestion job created");

    Ok(serde_json::to_value(response)?)
}

pub fn list_jobs(_req: &RouteRequest) -> HandlerResult {
    let at = Utc::now();
    let jobs = vec![
        JobSummary {
            id: "job_example1".to_string(),
            status: JobStatus::Completed,
            created_at: timestamp(at - Duration::hours(1)),
            completed_at: Some(timestamp(at - Duration::minutes(30))),
            records_processed: 1000,
        },
        JobSummary {
            id: "job_example2".to_string(),
            status: JobStatus::Running,
            created_at: timestamp(at - Duration::minutes(15)),
            completed_at: None,
            records_processed: 500,
        },
    ];

    Ok(serde_json::to_value(JobList {
        total: jobs.len(),
        jobs,
        timestamp: timestamp(at),
    })?)
}

pub fn show_job(req: &RouteRequest) -> HandlerResult {
    let id = req.param(0).unwrap_or_default();
    if id.is_empty() {
        return Ok(serde_json::to_value(FailedResponse::new("Job ID is required"))?);
    }

    let at = Utc::now();
    let job = JobDetail {
        id: id.to_string(),
        status: JobStatus::Completed,
        source_type: "api".to_string(),
        records_processed: 1000,
        processing_time_ms: 5000,
        created_at: timestamp(at - Duration::hours(1)),
        started_at: timestamp(at - Duration::minutes(55)),
        completed_at: timestamp(at - Duration::minutes(50)),
        error_message: None,
    };

    Ok(serde_json::to_value(JobResponse {
        job,
        timestamp: timestamp(at),
    })?)
}

fn new_job_id() -> String {
    format!("job_{}", Uuid::new_v4().simple())
}

/// Empty documents and falsy scalars don't count as ingestible input.
fn is_blank(input: &Value) -> bool {
    match input {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty() || text == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use serde_json::json;

    fn request(params: &[&str], body: &'static [u8]) -> RouteRequest {
        RouteRequest::new(
            params.iter().map(|p| p.to_string()).collect(),
            Bytes::from_static(body),
        )
    }

    #[test]
    fn test_ingest_accepts_json() {
        let body = ingest(&request(&[], br#"{ "rows": [1, 2, 3] }"#)).unwrap();

        assert_eq!(body["status"], "pending");
        assert_eq!(body["message"], "Data ingestion job created");
        assert_eq!(body["data_size"], json!(r#"{"rows":[1,2,3]}"#.len()));
        assert!(body["job_id"].as_str().unwrap().starts_with("job_"));
    }

    #[test]
    fn test_ingest_job_ids_are_unique() {
        let first = ingest(&request(&[], b"[1]")).unwrap();
        let second = ingest(&request(&[], b"[1]")).unwrap();
        assert_ne!(first["job_id"], second["job_id"]);
    }

    #[test]
    fn test_ingest_rejects_invalid_or_empty_input() {
        let inputs: [&[u8]; 8] = [b"", b"not json", b"{}", b"[]", b"null", b"false", b"0", b"\"\""];
        for raw in inputs {
            let body = ingest(&RouteRequest::new(Vec::new(), Bytes::copy_from_slice(raw))).unwrap();
            assert_eq!(
                body,
                json!({ "error": "Invalid JSON input", "status": "failed" }),
                "input {:?}",
                String::from_utf8_lossy(raw)
            );
        }
    }

    #[test]
    fn test_list_jobs() {
        let body = list_jobs(&request(&[], b"")).unwrap();

        assert_eq!(body["total"], 2);
        assert_eq!(body["jobs"][0]["id"], "job_example1");
        assert_eq!(body["jobs"][0]["status"], "completed");
        assert_eq!(body["jobs"][1]["status"], "running");
        assert!(body["jobs"][1]["completed_at"].is_null());
        assert_eq!(body["jobs"][1]["records_processed"], 500);
    }

    #[test]
    fn test_show_job() {
        let body = show_job(&request(&["job_42"], b"")).unwrap();

        assert_eq!(body["job"]["id"], "job_42");
        assert_eq!(body["job"]["source_type"], "api");
        assert_eq!(body["job"]["processing_time_ms"], 5000);
        assert!(body["job"]["error_message"].is_null());
    }

    #[test]
    fn test_show_job_requires_id() {
        let body = show_job(&request(&[], b"")).unwrap();
        assert_eq!(body, json!({ "error": "Job ID is required", "status": "failed" }));
    }
}
