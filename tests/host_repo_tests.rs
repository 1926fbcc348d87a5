// HostRepo tests: seeding, existence, master resolution

mod common;

use common::*;
use hostmon::models::HostStatus;
use tempfile::TempDir;

#[tokio::test]
async fn exists_reflects_seeded_hosts() {
    let dir = TempDir::new().unwrap();
    let (hosts, _) = open_repos(&dir).await;
    hosts.upsert(&host("h1", 10, HostStatus::Online)).await.unwrap();

    assert!(hosts.exists("h1").await.unwrap());
    assert!(!hosts.exists("h2").await.unwrap());
}

#[tokio::test]
async fn upsert_updates_existing_record() {
    let dir = TempDir::new().unwrap();
    let (hosts, _) = open_repos(&dir).await;
    hosts.upsert(&host("h1", 10, HostStatus::Unknown)).await.unwrap();
    let mut changed = host("h1", 55, HostStatus::Offline);
    changed.ip = "10.0.0.9".into();
    hosts.upsert(&changed).await.unwrap();

    let stored = hosts.find_by_id("h1").await.unwrap().unwrap();
    assert_eq!(stored, changed);
}

#[tokio::test]
async fn upsert_rejects_priority_out_of_range() {
    let dir = TempDir::new().unwrap();
    let (hosts, _) = open_repos(&dir).await;
    assert!(hosts.upsert(&host("h1", 0, HostStatus::Online)).await.is_err());
    assert!(hosts.upsert(&host("h1", 101, HostStatus::Online)).await.is_err());
    assert!(!hosts.exists("h1").await.unwrap());
}

#[tokio::test]
async fn master_is_highest_priority_online_host() {
    let dir = TempDir::new().unwrap();
    let (hosts, _) = open_repos(&dir).await;
    hosts.upsert(&host("low", 10, HostStatus::Online)).await.unwrap();
    hosts.upsert(&host("high", 80, HostStatus::Online)).await.unwrap();
    hosts.upsert(&host("offline", 100, HostStatus::Offline)).await.unwrap();
    hosts.upsert(&host("unknown", 99, HostStatus::Unknown)).await.unwrap();

    let master = hosts.find_master().await.unwrap().unwrap();
    assert_eq!(master.id, "high");
}

#[tokio::test]
async fn master_ties_go_to_smallest_id() {
    let dir = TempDir::new().unwrap();
    let (hosts, _) = open_repos(&dir).await;
    hosts.upsert(&host("b", 50, HostStatus::Online)).await.unwrap();
    hosts.upsert(&host("a", 50, HostStatus::Online)).await.unwrap();

    assert_eq!(hosts.find_master().await.unwrap().unwrap().id, "a");
}

#[tokio::test]
async fn no_master_without_online_hosts() {
    let dir = TempDir::new().unwrap();
    let (hosts, _) = open_repos(&dir).await;
    assert!(hosts.find_master().await.unwrap().is_none());
    hosts.upsert(&host("h1", 90, HostStatus::Offline)).await.unwrap();
    assert!(hosts.find_master().await.unwrap().is_none());
}
