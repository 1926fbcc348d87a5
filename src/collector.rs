// Host sensors via sysinfo: one Collect() call = one point-in-time snapshot.
// CPU and RAM failures abort the call; unreadable disk partitions are skipped.

use crate::error::CollectionError;
use crate::models::{CpuData, DiskData, Metric, MetricData, RamData};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use sysinfo::{Disks, MINIMUM_CPU_UPDATE_INTERVAL, System};
use tracing::instrument;

/// Produces the samples for one collection cycle.
///
/// Implementations are shared across concurrently running cycles.
pub trait Collect: Send + Sync + 'static {
    fn collect(&self) -> impl Future<Output = Result<Vec<Metric>, CollectionError>> + Send;
}

struct Sensors {
    sys: System,
    disks: Disks,
    /// When CPU usage was last refreshed; usage is the delta since then.
    last_cpu_refresh: Instant,
}

pub struct SystemCollector {
    sensors: Arc<Mutex<Sensors>>,
}

impl Default for SystemCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemCollector {
    pub fn new() -> Self {
        let mut sys = System::new();
        // Baseline for the first usage delta.
        sys.refresh_cpu_usage();
        sys.refresh_memory();
        let disks = Disks::new_with_refreshed_list();
        Self {
            sensors: Arc::new(Mutex::new(Sensors {
                sys,
                disks,
                last_cpu_refresh: Instant::now(),
            })),
        }
    }
}

impl Collect for SystemCollector {
    #[instrument(skip(self), fields(collector = "system", operation = "collect"))]
    async fn collect(&self) -> Result<Vec<Metric>, CollectionError> {
        let sensors = self.sensors.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = sensors
                .lock()
                .map_err(|e| CollectionError::Task(format!("sensor lock poisoned: {}", e)))?;
            let Sensors {
                sys,
                disks,
                last_cpu_refresh,
            } = &mut *guard;

            let wait = cpu_settle_delay(*last_cpu_refresh, Instant::now());
            if !wait.is_zero() {
                std::thread::sleep(wait);
            }
            let timestamp = Utc::now();

            let mut metrics = Vec::with_capacity(4);
            metrics.push(read_cpu(sys, timestamp)?);
            *last_cpu_refresh = Instant::now();
            metrics.push(read_ram(sys, timestamp)?);
            metrics.extend(read_disks(disks, timestamp));
            Ok::<_, CollectionError>(metrics)
        })
        .await
        .map_err(|e| CollectionError::Task(format!("collector task join: {}", e)))?
    }
}

fn read_cpu(sys: &mut System, timestamp: DateTime<Utc>) -> Result<Metric, CollectionError> {
    sys.refresh_cpu_usage();
    let cores = sys.cpus().len() as u32;
    if cores == 0 {
        return Err(CollectionError::Cpu("no CPUs reported".into()));
    }
    let usage = sys.global_cpu_usage() as f64;
    if !usage.is_finite() {
        return Err(CollectionError::Cpu(format!("invalid usage reading {usage}")));
    }
    let usage_percent = usage.clamp(0.0, 100.0);
    Ok(Metric::new(
        MetricData::Cpu(CpuData {
            usage_percent,
            cores,
        }),
        usage_percent,
        timestamp,
    ))
}

fn read_ram(sys: &mut System, timestamp: DateTime<Utc>) -> Result<Metric, CollectionError> {
    sys.refresh_memory();
    let total = sys.total_memory();
    if total == 0 {
        return Err(CollectionError::Memory("total memory reported as 0".into()));
    }
    let used = total.saturating_sub(sys.available_memory());
    let usage_percent = percent(used, total);
    Ok(Metric::new(
        MetricData::Ram(RamData {
            total,
            used,
            usage_percent,
        }),
        usage_percent,
        timestamp,
    ))
}

/// One sample per readable mount point.
fn read_disks(disks: &mut Disks, timestamp: DateTime<Utc>) -> Vec<Metric> {
    disks.refresh(true);
    let mut seen = HashSet::new();
    disks
        .list()
        .iter()
        .filter_map(|d| {
            let mount_point = d.mount_point().to_string_lossy().into_owned();
            let total = d.total_space();
            if total == 0 {
                tracing::debug!(mount = %mount_point, "skipping unreadable partition");
                return None;
            }
            if !seen.insert(mount_point.clone()) {
                return None;
            }
            let free = d.available_space().min(total);
            let used = total - free;
            let usage_percent = percent(used, total);
            Some(Metric::new(
                MetricData::Disk(DiskData {
                    mount_point,
                    total,
                    used,
                    free,
                    usage_percent,
                }),
                usage_percent,
                timestamp,
            ))
        })
        .collect()
}

/// Time still needed before a CPU refresh yields a meaningful usage delta.
fn cpu_settle_delay(last_refresh: Instant, now: Instant) -> Duration {
    MINIMUM_CPU_UPDATE_INTERVAL.saturating_sub(now.saturating_duration_since(last_refresh))
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_handles_zero_total() {
        assert_eq!(percent(5, 0), 0.0);
        assert_eq!(percent(1, 4), 25.0);
    }

    #[test]
    fn cpu_settle_delay_covers_remaining_window() {
        let last = Instant::now();
        assert_eq!(cpu_settle_delay(last, last), MINIMUM_CPU_UPDATE_INTERVAL);
        let later = last + MINIMUM_CPU_UPDATE_INTERVAL + Duration::from_millis(1);
        assert_eq!(cpu_settle_delay(last, later), Duration::ZERO);
        assert_eq!(cpu_settle_delay(later, last), MINIMUM_CPU_UPDATE_INTERVAL);
    }
}
