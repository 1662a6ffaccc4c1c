use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
}

#[derive(Debug, Serialize)]
pub struct JobSummary {
    pub id: String,
    pub status: JobStatus,
    pub created_at: String,
    pub completed_at: Option<String>,
    pub records_processed: u64,
}

#[derive(Debug, Serialize)]
pub struct JobList {
    pub jobs: Vec<JobSummary>,
    pub total: usize,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct JobDetail {
    pub id: String,
    pub status: JobStatus,
    pub source_type: String,
    pub records_processed: u64,
    pub processing_time_ms: u64,
    pub created_at: String,
    pub started_at: String,
    pub completed_at: String,
    pub error_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub job: JobDetail,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub message: String,
    pub job_id: String,
    pub status: JobStatus,
    pub timestamp: String,
    pub data_size: usize,
}

/// Returned with a 200 when a request is rejected by a placeholder handler.
#[derive(Debug, Serialize)]
pub struct FailedResponse {
    pub error: String,
    pub status: &'static str,
}

impl FailedResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            status: "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Warning,
    Critical,
}

#[derive(Debug, Serialize)]
pub struct DatabaseCheck {
    pub status: CheckStatus,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DiskCheck {
    pub status: CheckStatus,
    pub used_percent: f64,
    pub free_bytes: u64,
    pub total_bytes: u64,
}

#[derive(Debug, Serialize)]
pub struct MemoryCheck {
    pub status: CheckStatus,
    pub used_percent: f64,
    pub current_usage: u64,
    pub peak_usage: u64,
    pub limit: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub database: DatabaseCheck,
    pub disk_space: DiskCheck,
    pub memory: MemoryCheck,
}

impl HealthChecks {
    pub fn all_ok(&self) -> bool {
        [
            self.database.status,
            self.disk_space.status,
            self.memory.status,
        ]
        .iter()
        .all(|status| *status == CheckStatus::Ok)
    }
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub timestamp: String,
    pub checks: HealthChecks,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub message: String,
    pub version: &'static str,
    pub environment: String,
    pub timestamp: String,
    pub endpoints: Value,
}
