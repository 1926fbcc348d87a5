// Periodic collect-then-deliver loop for the agent.
//
// The first cycle runs inline at startup. After that every tick spawns an independent
// cycle task that is never joined: a slow or stuck delivery must not delay the next
// sample, so overlapping cycles are allowed and in-flight cycles are abandoned on
// shutdown. Each cycle is wrapped in a panic boundary so one bad cycle cannot end the loop.

use crate::collector::Collect;
use crate::config::apply_interval_floor;
use crate::error::{CollectionError, TransportError};
use crate::models::MetricBatch;
use crate::sender::Deliver;
use chrono::Utc;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval_at};
use tracing::instrument;

pub const MAX_SEND_ATTEMPTS: u32 = 3;

/// Bounded retry for `Deliver::send`. Backoff after failed attempt `n` is `n² * unit`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_SEND_ATTEMPTS,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_unit * attempt.saturating_mul(attempt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Waiting,
    Collecting,
    ShuttingDown,
}

#[derive(Debug)]
pub enum CycleOutcome {
    Delivered { samples: usize, attempts: u32 },
    CollectFailed(CollectionError),
    DeliveryFailed { attempts: u32, error: TransportError },
    Panicked(String),
}

impl CycleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CycleOutcome::Delivered { .. })
    }
}

pub struct Scheduler<C, D> {
    collector: Arc<C>,
    sender: Arc<D>,
    host_id: Arc<str>,
    interval: Duration,
    retry: RetryPolicy,
    state: SchedulerState,
}

impl<C: Collect, D: Deliver> Scheduler<C, D> {
    /// `interval` below the 10s floor is raised to it.
    pub fn new(collector: Arc<C>, sender: Arc<D>, host_id: &str, interval: Duration) -> Self {
        Self {
            collector,
            sender,
            host_id: Arc::from(host_id),
            interval: apply_interval_floor(interval),
            retry: RetryPolicy::default(),
            state: SchedulerState::Idle,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    fn transition(&mut self, next: SchedulerState) {
        tracing::trace!(from = ?self.state, to = ?next, "scheduler state");
        self.state = next;
    }

    /// Runs until `shutdown_rx` fires (or its sender is dropped).
    /// Cancellation is only observed while waiting for the next tick.
    #[instrument(
        name = "scheduler",
        skip_all,
        fields(host_id = %self.host_id, interval_secs = self.interval.as_secs())
    )]
    pub async fn run(mut self, mut shutdown_rx: oneshot::Receiver<()>) {
        // Ticks are anchored at startup so a slow first cycle does not shift the schedule.
        let start = Instant::now();
        self.transition(SchedulerState::Collecting);
        run_contained_cycle(
            self.collector.clone(),
            self.sender.clone(),
            self.host_id.clone(),
            self.retry,
        )
        .await;

        let mut tick = interval_at(start + self.interval, self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            self.transition(SchedulerState::Waiting);
            tokio::select! {
                _ = tick.tick() => {
                    self.transition(SchedulerState::Collecting);
                    tokio::spawn(run_contained_cycle(
                        self.collector.clone(),
                        self.sender.clone(),
                        self.host_id.clone(),
                        self.retry,
                    ));
                }
                _ = &mut shutdown_rx => {
                    self.transition(SchedulerState::ShuttingDown);
                    tracing::info!("scheduler shutting down; in-flight cycles are not awaited");
                    break;
                }
            }
        }
    }
}

/// One cycle behind a panic boundary; the outcome is logged here.
pub async fn run_contained_cycle<C: Collect, D: Deliver>(
    collector: Arc<C>,
    sender: Arc<D>,
    host_id: Arc<str>,
    retry: RetryPolicy,
) -> CycleOutcome {
    let outcome = AssertUnwindSafe(run_cycle(&*collector, &*sender, &host_id, retry))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| CycleOutcome::Panicked(panic_message(payload.as_ref())));

    match &outcome {
        CycleOutcome::Delivered { samples, attempts } => {
            tracing::info!(samples, attempts, "metrics delivered");
        }
        CycleOutcome::CollectFailed(e) => {
            tracing::warn!(error = %e, operation = "collect", "collection failed");
        }
        CycleOutcome::DeliveryFailed { attempts, error } => {
            tracing::warn!(
                error = %error,
                attempts,
                operation = "send",
                "delivery failed, batch dropped"
            );
        }
        CycleOutcome::Panicked(msg) => {
            tracing::error!(panic = %msg, "cycle panicked");
        }
    }
    outcome
}

/// Collect once, then send with bounded retry.
pub async fn run_cycle<C: Collect, D: Deliver>(
    collector: &C,
    sender: &D,
    host_id: &str,
    retry: RetryPolicy,
) -> CycleOutcome {
    let metrics = match collector.collect().await {
        Ok(m) => m,
        Err(e) => return CycleOutcome::CollectFailed(e),
    };
    let batch = MetricBatch::new(host_id, metrics, Utc::now());
    let samples = batch.metrics.len();
    let max_attempts = retry.max_attempts.max(1);

    let mut attempt = 1;
    loop {
        match sender.send(&batch).await {
            Ok(()) => return CycleOutcome::Delivered { samples, attempts: attempt },
            Err(error) if attempt >= max_attempts => {
                return CycleOutcome::DeliveryFailed {
                    attempts: attempt,
                    error,
                };
            }
            Err(error) => {
                let backoff = retry.backoff(attempt);
                tracing::debug!(
                    error = %error,
                    attempt,
                    timeout = error.is_timeout(),
                    backoff_ms = backoff.as_millis() as u64,
                    "send attempt failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}
