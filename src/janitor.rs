// Background retention worker: purge samples older than max_age every purge interval.
// VACUUM runs on a configurable schedule (cron expression or fixed interval).

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::RetentionConfig;
use crate::metric_repo::MetricRepo;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone)]
pub struct JanitorConfig {
    pub max_age: Duration,
    pub purge_interval: Duration,
    /// Optional cron expression for VACUUM (e.g. "0 0 3 * * *" = 03:00 daily). Uses local time.
    pub vacuum_schedule: Option<String>,
    /// Run VACUUM every interval when vacuum_schedule is not set.
    pub vacuum_interval: Duration,
}

impl From<&RetentionConfig> for JanitorConfig {
    fn from(c: &RetentionConfig) -> Self {
        Self {
            max_age: Duration::from_secs(c.max_age_hours as u64 * 3600),
            purge_interval: Duration::from_secs(c.purge_interval_secs),
            vacuum_schedule: c.vacuum_schedule.clone(),
            vacuum_interval: Duration::from_secs(c.vacuum_interval_secs),
        }
    }
}

/// Spawns the janitor. Runs until the runtime shuts down.
pub fn spawn(repo: Arc<MetricRepo>, config: JanitorConfig) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run(repo, config).await;
    })
}

#[instrument(skip(repo), fields(purge_interval_secs = config.purge_interval.as_secs()))]
async fn run(repo: Arc<MetricRepo>, config: JanitorConfig) {
    let mut purge_tick = tokio::time::interval(config.purge_interval);
    purge_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let timing = VacuumTiming::from_config(&config);
    let mut vacuum_at = timing.next_deadline();

    loop {
        let due = vacuum_at;
        tokio::select! {
            _ = purge_tick.tick() => {
                if let Err(e) = purge_once(&repo, &config).await {
                    warn!(error = %e, "purge failed");
                }
            }
            _ = sleep_until_or_forever(due) => {
                match repo.vacuum().await {
                    Ok(()) => info!("vacuum complete"),
                    Err(e) => warn!(error = %e, "vacuum failed"),
                }
                vacuum_at = timing.next_deadline();
            }
        }
    }
}

/// One retention pass. Returns the number of deleted samples.
pub async fn purge_once(repo: &MetricRepo, config: &JanitorConfig) -> anyhow::Result<u64> {
    let deleted = repo.purge(config.max_age).await?;
    if deleted > 0 {
        info!(deleted, max_age_secs = config.max_age.as_secs(), "old metrics purged");
    }
    Ok(deleted)
}

/// When VACUUM runs: local-time cron, a fixed period, or never.
enum VacuumTiming {
    Cron(cron::Schedule),
    Every(Duration),
    Never,
}

impl VacuumTiming {
    fn from_config(config: &JanitorConfig) -> Self {
        match config.vacuum_schedule.as_deref() {
            None => VacuumTiming::Every(config.vacuum_interval),
            Some(expr) => match cron::Schedule::from_str(expr) {
                Ok(schedule) => VacuumTiming::Cron(schedule),
                Err(e) => {
                    warn!(cron = %expr, error = %e, "invalid vacuum_schedule; VACUUM disabled");
                    VacuumTiming::Never
                }
            },
        }
    }

    fn next_delay(&self) -> Option<Duration> {
        match self {
            VacuumTiming::Cron(schedule) => {
                let now = chrono::Local::now();
                let next = schedule.after(&now).next()?;
                Some((next - now).to_std().unwrap_or(Duration::ZERO))
            }
            VacuumTiming::Every(period) => Some(*period),
            VacuumTiming::Never => None,
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.next_delay().and_then(|d| Instant::now().checked_add(d))
    }
}

async fn sleep_until_or_forever(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
