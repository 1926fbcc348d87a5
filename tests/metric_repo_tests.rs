// MetricRepo tests: save, range queries, latest-per-type, purge

mod common;

use chrono::{Duration as ChronoDuration, Utc};
use common::*;
use hostmon::models::*;
use std::time::Duration;
use tempfile::TempDir;

fn batch(host_id: &str, metrics: Vec<Metric>) -> MetricBatch {
    let ts = metrics.first().map(|m| m.timestamp).unwrap_or_else(|| at(0));
    MetricBatch::new(host_id, metrics, ts)
}

#[tokio::test]
async fn metric_repo_init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let (_, repo) = open_repos(&dir).await;
    repo.init().await.unwrap();
}

#[tokio::test]
async fn save_then_query_returns_whole_batch_newest_first() {
    let dir = TempDir::new().unwrap();
    let (_, repo) = open_repos(&dir).await;

    repo.save(&batch("h1", vec![cpu(10.0, at(10)), ram(50.0, at(10))]))
        .await
        .unwrap();
    repo.save(&batch("h1", vec![cpu(20.0, at(20)), disk("/", 30.0, at(20))]))
        .await
        .unwrap();

    let all = repo
        .query_range("h1", None, at(0), at(100), 0)
        .await
        .unwrap();
    assert_eq!(all.len(), 4);
    assert!(all.iter().all(|m| m.host_id == "h1"));
    assert!(
        all.windows(2)
            .all(|w| w[0].metric.timestamp >= w[1].metric.timestamp)
    );
    assert_eq!(all[0].metric.timestamp, at(20));
    assert_eq!(all[3].metric.timestamp, at(10));
}

#[tokio::test]
async fn save_empty_batch_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    let (_, repo) = open_repos(&dir).await;
    repo.save(&batch("h1", vec![])).await.unwrap();

    let all = repo
        .query_range("h1", None, at(-1_000_000), at(1_000_000), 0)
        .await
        .unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn query_range_bounds_are_inclusive_and_scoped_to_host() {
    let dir = TempDir::new().unwrap();
    let (_, repo) = open_repos(&dir).await;
    for secs in [0, 10, 20, 30] {
        repo.save(&batch("h1", vec![cpu(secs as f64, at(secs))]))
            .await
            .unwrap();
    }
    repo.save(&batch("h2", vec![cpu(99.0, at(15))])).await.unwrap();

    let window = repo
        .query_range("h1", None, at(10), at(20), 0)
        .await
        .unwrap();
    let values: Vec<f64> = window.iter().map(|m| m.metric.value).collect();
    assert_eq!(values, vec![20.0, 10.0]);
}

#[tokio::test]
async fn query_range_filters_by_type_and_applies_limit() {
    let dir = TempDir::new().unwrap();
    let (_, repo) = open_repos(&dir).await;
    for secs in 0..5 {
        repo.save(&batch(
            "h1",
            vec![cpu(secs as f64, at(secs)), ram(50.0, at(secs))],
        ))
        .await
        .unwrap();
    }

    let cpus = repo
        .query_range("h1", Some(MetricType::Cpu), at(0), at(10), 0)
        .await
        .unwrap();
    assert_eq!(cpus.len(), 5);
    assert!(cpus.iter().all(|m| m.metric.metric_type() == MetricType::Cpu));

    let limited = repo
        .query_range("h1", Some(MetricType::Cpu), at(0), at(10), 2)
        .await
        .unwrap();
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].metric.value, 4.0);
    assert_eq!(limited[1].metric.value, 3.0);

    let negative = repo
        .query_range("h1", None, at(0), at(10), -5)
        .await
        .unwrap();
    assert_eq!(negative.len(), 10);
}

#[tokio::test]
async fn stored_payload_survives_round_trip() {
    let dir = TempDir::new().unwrap();
    let (_, repo) = open_repos(&dir).await;
    repo.save(&batch("h1", vec![disk("/var", 42.0, at(5))]))
        .await
        .unwrap();

    let stored = repo
        .query_range("h1", Some(MetricType::Disk), at(0), at(10), 0)
        .await
        .unwrap();
    match &stored[0].metric.data {
        MetricData::Disk(d) => {
            assert_eq!(d.mount_point, "/var");
            assert_eq!(d.total, 1000);
            assert_eq!(d.used, 420);
            assert_eq!(d.free, 580);
        }
        other => panic!("expected disk payload, got {other:?}"),
    }
}

#[tokio::test]
async fn latest_by_type_keeps_one_newest_sample_per_type() {
    let dir = TempDir::new().unwrap();
    let (_, repo) = open_repos(&dir).await;
    // Inserted out of order on purpose.
    repo.save(&batch("h1", vec![cpu(30.0, at(30)), ram(30.0, at(30))]))
        .await
        .unwrap();
    repo.save(&batch("h1", vec![cpu(10.0, at(10)), ram(10.0, at(10))]))
        .await
        .unwrap();
    repo.save(&batch("h1", vec![disk("/", 20.0, at(20))]))
        .await
        .unwrap();
    repo.save(&batch("h2", vec![cpu(99.0, at(99))])).await.unwrap();

    let latest = repo.latest_by_type("h1").await.unwrap();
    assert_eq!(latest.len(), 3);
    assert_eq!(latest[&MetricType::Cpu].metric.value, 30.0);
    assert_eq!(latest[&MetricType::Ram].metric.timestamp, at(30));
    assert_eq!(latest[&MetricType::Disk].metric.value, 20.0);
    assert!(latest.values().all(|m| m.host_id == "h1"));
}

#[tokio::test]
async fn latest_by_type_breaks_timestamp_ties_by_insertion_order() {
    let dir = TempDir::new().unwrap();
    let (_, repo) = open_repos(&dir).await;
    repo.save(&batch("h1", vec![cpu(1.0, at(50))])).await.unwrap();
    repo.save(&batch("h1", vec![cpu(2.0, at(50))])).await.unwrap();

    let latest = repo.latest_by_type("h1").await.unwrap();
    assert_eq!(latest[&MetricType::Cpu].metric.value, 2.0);
}

#[tokio::test]
async fn latest_by_type_for_unknown_host_is_empty() {
    let dir = TempDir::new().unwrap();
    let (_, repo) = open_repos(&dir).await;
    assert!(repo.latest_by_type("nobody").await.unwrap().is_empty());
}

#[tokio::test]
async fn purge_removes_only_old_samples_and_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let (_, repo) = open_repos(&dir).await;
    let now = Utc::now();
    let old = now - ChronoDuration::days(10);
    let recent = now - ChronoDuration::hours(1);
    repo.save(&batch("h1", vec![cpu(1.0, old), ram(1.0, old)]))
        .await
        .unwrap();
    repo.save(&batch("h1", vec![cpu(2.0, recent)])).await.unwrap();

    let retention = Duration::from_secs(7 * 24 * 3600);
    assert_eq!(repo.purge(retention).await.unwrap(), 2);
    assert_eq!(repo.purge(retention).await.unwrap(), 0);

    let remaining = repo
        .query_range(
            "h1",
            None,
            now - ChronoDuration::days(365),
            now + ChronoDuration::days(1),
            0,
        )
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].metric.value, 2.0);
}

#[tokio::test]
async fn purge_with_retention_beyond_time_range_deletes_nothing() {
    let dir = TempDir::new().unwrap();
    let (_, repo) = open_repos(&dir).await;
    repo.save(&batch("h1", vec![cpu(1.0, at(0))])).await.unwrap();

    let centuries = Duration::from_secs(u32::MAX as u64 * 3600);
    assert_eq!(repo.purge(centuries).await.unwrap(), 0);
    assert_eq!(repo.purge(Duration::MAX).await.unwrap(), 0);

    let remaining = repo
        .query_range("h1", None, at(-60), at(60), 0)
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
}

#[tokio::test]
async fn failed_insert_mid_batch_stores_nothing() {
    let dir = TempDir::new().unwrap();
    let (_, repo) = open_repos(&dir).await;
    fail_ram_inserts(&dir).await;

    let result = repo
        .save(&batch("h1", vec![cpu(10.0, at(0)), ram(50.0, at(0))]))
        .await;
    assert!(result.is_err());

    let stored = repo
        .query_range("h1", None, at(-60), at(60), 0)
        .await
        .unwrap();
    assert!(stored.is_empty());
}
