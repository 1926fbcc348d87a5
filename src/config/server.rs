// Monitoring center configuration (TOML).

use serde::Deserialize;

use crate::models::{Host, MAX_PRIORITY, MIN_PRIORITY};

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub server: ListenConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    /// Host directory seed; upserted at startup.
    #[serde(default)]
    pub hosts: Vec<Host>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u32,
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,
    /// Optional cron expression for VACUUM (e.g. "0 0 3 * * *"). Uses local time.
    #[serde(default)]
    pub vacuum_schedule: Option<String>,
    /// Run VACUUM every N seconds when vacuum_schedule is not set.
    #[serde(default = "default_vacuum_interval_secs")]
    pub vacuum_interval_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age_hours: default_max_age_hours(),
            purge_interval_secs: default_purge_interval_secs(),
            vacuum_schedule: None,
            vacuum_interval_secs: default_vacuum_interval_secs(),
        }
    }
}

/// Upper bound for `retention.max_age_hours` (100 years).
pub const MAX_RETENTION_HOURS: u32 = 100 * 365 * 24;

fn default_max_age_hours() -> u32 {
    30 * 24
}

fn default_purge_interval_secs() -> u64 {
    3600
}

fn default_vacuum_interval_secs() -> u64 {
    24 * 3600
}

impl ServerConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("read config {}: {}", path, e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: ServerConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            (1..=MAX_RETENTION_HOURS).contains(&self.retention.max_age_hours),
            "retention.max_age_hours must be between 1 and {}, got {}",
            MAX_RETENTION_HOURS,
            self.retention.max_age_hours
        );
        anyhow::ensure!(
            self.retention.purge_interval_secs > 0,
            "retention.purge_interval_secs must be > 0, got {}",
            self.retention.purge_interval_secs
        );
        anyhow::ensure!(
            self.retention.vacuum_interval_secs > 0,
            "retention.vacuum_interval_secs must be > 0, got {}",
            self.retention.vacuum_interval_secs
        );
        for host in &self.hosts {
            anyhow::ensure!(!host.id.is_empty(), "hosts.id must be non-empty");
            anyhow::ensure!(
                (MIN_PRIORITY..=MAX_PRIORITY).contains(&host.priority),
                "hosts.priority must be between {} and {} for host {}, got {}",
                MIN_PRIORITY,
                MAX_PRIORITY,
                host.id,
                host.priority
            );
        }
        Ok(())
    }
}
