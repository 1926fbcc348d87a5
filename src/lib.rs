// Host metrics pipeline: agent-side collection and delivery, server-side ingestion and queries.

pub mod collector;
pub mod config;
pub mod db;
pub mod error;
pub mod host_repo;
pub mod ingest;
pub mod janitor;
pub mod logging;
pub mod metric_repo;
pub mod models;
pub mod routes;
pub mod scheduler;
pub mod sender;
pub mod signal;
pub mod version;
