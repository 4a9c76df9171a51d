use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dashwatch::config::Config;
use dashwatch::github::{GitHubClient, GitHubCollector};
use dashwatch::proto::dashboard_server::DashboardServer;
use dashwatch::scheduler::{Scheduler, SchedulerSettings};
use dashwatch::service::DashboardService;
use dashwatch::store::memory::InMemoryStore;

#[derive(Debug, Parser)]
#[command(name = "dashwatch", about = "GitHub issue, pull request and CI snapshot server")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "dashwatch.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = Config::load(&args.config)?;
    info!(
        org = %config.github.organization,
        repositories = config.github.repositories.len(),
        "loaded config from {}",
        args.config.display()
    );

    let client = GitHubClient::from_env(&config.github.api_url)?;
    let store = InMemoryStore::new();
    let scheduler = Scheduler::new(
        SchedulerSettings::from_config(&config),
        Arc::new(GitHubCollector::new(client)),
        store.clone(),
    );

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_signals(shutdown.clone()));

    let schedulers = scheduler.start(shutdown.clone());

    info!("dashwatch listening on {}", config.server.listen_addr);
    let served = Server::builder()
        .add_service(DashboardServer::new(DashboardService::with_config(
            store, &config,
        )))
        .serve_with_shutdown(config.server.listen_addr, shutdown.clone().cancelled_owned())
        .await;

    // Stop the fetch loops whether the server exited cleanly or not.
    schedulers.shutdown().await;
    info!("dashwatch stopped");
    served?;
    Ok(())
}

async fn watch_signals(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "cannot listen for SIGTERM");
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("received Ctrl+C, shutting down");
                }
            }
        }
    }
    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, shutting down");
        }
    }

    shutdown.cancel();
}
