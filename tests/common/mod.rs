// Shared test helpers
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use hostmon::host_repo::HostRepo;
use hostmon::metric_repo::MetricRepo;
use hostmon::models::*;
use std::sync::Arc;
use tempfile::TempDir;

pub fn db_path(dir: &TempDir) -> String {
    dir.path().join("monitoring.db").to_str().unwrap().to_string()
}

pub async fn open_repos(dir: &TempDir) -> (Arc<HostRepo>, Arc<MetricRepo>) {
    let pool = hostmon::db::connect(&db_path(dir), 4).await.unwrap();
    let hosts = Arc::new(HostRepo::new(pool.clone()));
    hosts.init().await.unwrap();
    let metrics = Arc::new(MetricRepo::new(pool));
    metrics.init().await.unwrap();
    (hosts, metrics)
}

pub fn host(id: &str, priority: i64, status: HostStatus) -> Host {
    Host {
        id: id.into(),
        name: format!("{id}-name"),
        ip: "10.0.0.1".into(),
        priority,
        status,
    }
}

/// Fixed instant `secs` seconds after 2024-01-01T00:00:00Z.
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::seconds(secs)
}

pub fn cpu(value: f64, ts: DateTime<Utc>) -> Metric {
    Metric::new(
        MetricData::Cpu(CpuData {
            usage_percent: value,
            cores: 4,
        }),
        value,
        ts,
    )
}

pub fn ram(value: f64, ts: DateTime<Utc>) -> Metric {
    Metric::new(
        MetricData::Ram(RamData {
            total: 16_000_000_000,
            used: (16_000_000_000f64 * value / 100.0) as u64,
            usage_percent: value,
        }),
        value,
        ts,
    )
}

pub fn disk(mount: &str, value: f64, ts: DateTime<Utc>) -> Metric {
    Metric::new(
        MetricData::Disk(DiskData {
            mount_point: mount.into(),
            total: 1000,
            used: (value * 10.0) as u64,
            free: 1000 - (value * 10.0) as u64,
            usage_percent: value,
        }),
        value,
        ts,
    )
}

/// The two-sample scenario: cpu 42.5% on 4 cores, ram 70.1% of 16 GB.
pub fn cpu_and_ram_sample(ts: DateTime<Utc>) -> Vec<Metric> {
    vec![
        cpu(42.5, ts),
        Metric::new(
            MetricData::Ram(RamData {
                total: 16_000_000_000,
                used: 11_216_000_000,
                usage_percent: 70.1,
            }),
            70.1,
            ts,
        ),
    ]
}

/// Makes every insert of a `ram` sample fail, from a separate connection.
pub async fn fail_ram_inserts(dir: &TempDir) {
    let pool = hostmon::db::connect(&db_path(dir), 1).await.unwrap();
    sqlx::query(
        "CREATE TRIGGER fail_ram_insert BEFORE INSERT ON metrics
         WHEN NEW.type = 'ram'
         BEGIN SELECT RAISE(ABORT, 'disk I/O error'); END",
    )
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;
}
