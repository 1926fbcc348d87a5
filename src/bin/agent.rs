use anyhow::Result;
use hostmon::collector::SystemCollector;
use hostmon::config::AgentConfig;
use hostmon::scheduler::Scheduler;
use hostmon::sender::HttpSender;
use hostmon::{logging, signal, version};
use std::sync::Arc;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let cfg = AgentConfig::from_env().map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
    tracing::info!(
        version = version::VERSION,
        host_id = %cfg.host_id,
        monitoring_center_url = %cfg.monitoring_center_url,
        polling_interval = ?cfg.polling_interval,
        "Starting agent"
    );

    let collector = Arc::new(SystemCollector::new());
    let sender = Arc::new(HttpSender::new(
        &cfg.monitoring_center_url,
        cfg.request_timeout,
    )?);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        signal::shutdown_signal().await;
        tracing::info!("Received shutdown signal");
        let _ = shutdown_tx.send(());
    });

    Scheduler::new(collector, sender, &cfg.host_id, cfg.polling_interval)
        .run(shutdown_rx)
        .await;

    tracing::info!("Agent stopped");
    Ok(())
}
