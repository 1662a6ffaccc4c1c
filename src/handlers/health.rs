//! Health check for load balancer monitoring.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sysinfo::{Disks, System};

use crate::controller::Controller;
use crate::handlers::{now, VERSION};
use crate::models::{CheckStatus, DatabaseCheck, DiskCheck, HealthChecks, HealthReport, MemoryCheck};
use crate::router::{HandlerResult, RouteRequest};
use crate::Config;

pub fn controller(config: Arc<Config>) -> Controller {
    let monitor = Arc::new(MemoryMonitor::new(config.memory_limit_bytes()));
    Controller::new().action("check", move |_req: &RouteRequest| check(&monitor))
}

/// Samples this process's resident memory and keeps the highest value seen.
#[derive(Debug, Default)]
pub struct MemoryMonitor {
    limit: Option<u64>,
    peak: AtomicU64,
}

impl MemoryMonitor {
    /// `limit` of `None` measures against the host's total memory.
    pub fn new(limit: Option<u64>) -> Self {
        Self {
            limit,
            peak: AtomicU64::new(0),
        }
    }

    /// Record a sample and return the peak including it.
    fn record(&self, usage: u64) -> u64 {
        self.peak.fetch_max(usage, Ordering::Relaxed).max(usage)
    }

    fn sample(&self) -> MemoryCheck {
        let mut system = System::new();
        system.refresh_memory();
        let limit = self.limit.unwrap_or_else(|| system.total_memory());

        let usage = sysinfo::get_current_pid().ok().and_then(|pid| {
            system.refresh_process(pid);
            system.process(pid).map(|process| process.memory())
        });

        match usage {
            Some(usage) => memory_check(usage, self.record(usage), limit),
            None => {
                tracing::warn!("Could not read process memory usage");
                MemoryCheck {
                    status: CheckStatus::Warning,
                    used_percent: 0.0,
                    current_usage: 0,
                    peak_usage: self.peak.load(Ordering::Relaxed),
                    limit,
                }
            }
        }
    }
}

pub fn check(monitor: &MemoryMonitor) -> HandlerResult {
    let checks = HealthChecks {
        database: check_database(),
        disk_space: check_disk_space(),
        memory: monitor.sample(),
    };

    let status = if checks.all_ok() { "healthy" } else { "unhealthy" };
    if status != "healthy" {
        tracing::warn!(?checks, "Health check degraded");
    }

    Ok(serde_json::to_value(HealthReport {
        status,
        timestamp: now(),
        checks,
        version: VERSION,
    })?)
}

fn check_database() -> DatabaseCheck {
    // No database wired up yet
    DatabaseCheck {
        status: CheckStatus::Ok,
        message: "Database connectivity check not implemented yet".to_string(),
    }
}

fn check_disk_space() -> DiskCheck {
    let disks = Disks::new_with_refreshed_list();
    let root = disks
        .iter()
        .find(|disk| disk.mount_point() == Path::new("/"))
        .or_else(|| disks.iter().next());

    let Some(disk) = root else {
        return DiskCheck {
            status: CheckStatus::Warning,
            used_percent: 0.0,
            free_bytes: 0,
            total_bytes: 0,
        };
    };

    let total = disk.total_space();
    let free = disk.available_space();
    let used_percent = percent(total.saturating_sub(free), total);

    DiskCheck {
        status: disk_status(used_percent),
        used_percent,
        free_bytes: free,
        total_bytes: total,
    }
}

fn memory_check(usage: u64, peak: u64, limit: u64) -> MemoryCheck {
    let used_percent = percent(usage, limit);
    MemoryCheck {
        status: memory_status(used_percent),
        used_percent,
        current_usage: usage,
        peak_usage: peak,
        limit,
    }
}

/// `used / total` as a percentage rounded to two decimals.
fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let ratio = used as f64 / total as f64 * 100.0;
    (ratio * 100.0).round() / 100.0
}

fn disk_status(used_percent: f64) -> CheckStatus {
    if used_percent > 95.0 {
        CheckStatus::Critical
    } else if used_percent >= 90.0 {
        CheckStatus::Warning
    } else {
        CheckStatus::Ok
    }
}

fn memory_status(used_percent: f64) -> CheckStatus {
    if used_percent > 90.0 {
        CheckStatus::Critical
    } else if used_percent >= 80.0 {
        CheckStatus::Warning
    } else {
        CheckStatus::Ok
    }
}
