use anyhow::Result;
use hostmon::*;
use std::sync::Arc;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let app_config = config::ServerConfig::load()?;
    let pool = db::connect(
        &app_config.database.path,
        app_config.database.max_pool_size,
    )
    .await?;

    let host_repo = Arc::new(host_repo::HostRepo::new(pool.clone()));
    host_repo.init().await?;
    for host in &app_config.hosts {
        host_repo
            .upsert(host)
            .await
            .map_err(|e| anyhow::anyhow!("seed host {}: {}", host.id, e))?;
    }
    tracing::info!(hosts = app_config.hosts.len(), "host directory seeded");

    let metric_repo = Arc::new(metric_repo::MetricRepo::new(pool));
    metric_repo.init().await?;

    let _janitor = janitor::spawn(
        metric_repo.clone(),
        janitor::JanitorConfig::from(&app_config.retention),
    );

    let app = routes::app(host_repo, metric_repo);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            signal::shutdown_signal().await;
            tracing::info!("Received shutdown signal");
        })
        .await?;

    tracing::info!("Server exited");
    Ok(())
}
