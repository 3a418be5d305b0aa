use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use userd_bus::AmqpBus;
use userd_config::{CliOverrides, apply_overrides, load_config, validate_config};
use userd_proto::UsersServer;
use userd_server::health::{HealthService, PublishMonitor, StoreMonitor};
use userd_server::{CancellationToken, ServerError, UsersRpc, health};
use userd_service::{BcryptHasher, PublisherTiming, RandomIds, UserService};
use userd_store::MongoStore;

#[derive(Parser, Debug)]
#[command(name = "userd", version, about = "User management service")]
struct Args {
    /// Config file path (json/yaml/toml)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
    #[command(flatten)]
    overrides: CliOverrides,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let mut config = load_config(&args.config)?;
    apply_overrides(&mut config, &args.overrides);
    validate_config(&config)?;

    let level = config.logging.level.as_deref().unwrap_or("info");
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Set up graceful shutdown on SIGTERM/SIGINT
    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal_handler().await;
        info!("shutdown signal received");
        shutdown_signal.cancel();
    });

    let store = connect_store(&config).await?;
    let bus = AmqpBus::connect(&config.bus.uri, &config.bus.exchange, &config.bus.routing_key)
        .await
        .map_err(ServerError::from)?;

    let timing = PublisherTiming {
        min_poll: Duration::from_millis(config.publisher.min_poll_ms),
        max_poll: Duration::from_millis(config.publisher.max_poll_ms),
        retry_interval: Duration::from_secs(config.publisher.retry_interval_secs),
    };
    let service = Arc::new(UserService::new(
        Arc::new(store.clone()),
        Arc::new(bus),
        Arc::new(BcryptHasher::new()),
        Arc::new(RandomIds),
        timing,
    ));

    // outbox publisher pump
    let pump = {
        let service = Arc::clone(&service);
        let cancel = shutdown.clone();
        tokio::spawn(async move {
            service.publish_changes(cancel).await;
        })
    };

    // health endpoint
    let health_service = Arc::new(HealthService::new(vec![
        Box::new(StoreMonitor::new(store.clone())),
        Box::new(PublishMonitor::new(service.monitor())),
    ]));
    {
        let listen = config.server.health_listen.clone();
        let cancel = shutdown.clone();
        tokio::spawn(async move {
            if let Err(err) = health::serve(&listen, health_service, cancel).await {
                warn!(error = %err, "health endpoint exited");
            }
        });
    }

    // validated earlier, parse cannot fail here
    let addr: SocketAddr = config.server.rpc_listen.parse()?;
    info!(%addr, "gRPC listening");
    tonic::transport::Server::builder()
        .add_service(UsersServer::new(UsersRpc::new(Arc::clone(&service))))
        .serve_with_shutdown(addr, shutdown.clone().cancelled_owned())
        .await
        .map_err(ServerError::from)?;

    shutdown.cancel();
    let _ = pump.await;
    info!("shutdown complete");
    Ok(())
}

/// Connect to the store, create its indexes and fail fast if the database
/// is unreachable within the configured window.
async fn connect_store(config: &userd_config::Config) -> Result<MongoStore, ServerError> {
    let connect_timeout = Duration::from_secs(config.database.connect_timeout_secs);
    tokio::time::timeout(connect_timeout, async {
        let store = MongoStore::connect(
            &config.database.uri,
            &config.database.database,
            Duration::from_secs(config.database.find_timeout_secs),
        )
        .await?;
        store.ensure_indexes().await?;
        Ok::<_, ServerError>(store)
    })
    .await
    .map_err(|_| ServerError::ConnectTimeout)?
}

/// Wait for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal_handler() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
