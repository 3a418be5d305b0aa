//! HTTP health endpoint aggregating named monitors.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures::future::join_all;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use userd_service::{MIN_HEALTHY_RATIO, SuccessRateMonitor};
use userd_store::MongoStore;

/// Deadline for one health check round.
pub const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// A named health probe.
#[async_trait]
pub trait Monitor: Send + Sync {
    fn name(&self) -> &str;
    async fn check(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Pings the document store.
pub struct StoreMonitor {
    store: MongoStore,
}

impl StoreMonitor {
    pub fn new(store: MongoStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Monitor for StoreMonitor {
    fn name(&self) -> &str {
        "datastore"
    }

    async fn check(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.store.ping().await?;
        Ok(())
    }
}

/// Checks the publish success rate since the previous health round.
pub struct PublishMonitor {
    monitor: Arc<SuccessRateMonitor>,
}

impl PublishMonitor {
    pub fn new(monitor: Arc<SuccessRateMonitor>) -> Self {
        Self { monitor }
    }
}

#[async_trait]
impl Monitor for PublishMonitor {
    fn name(&self) -> &str {
        "publisher"
    }

    async fn check(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let rate = self.monitor.read_and_reset();
        if rate < MIN_HEALTHY_RATIO {
            return Err(format!(
                "publish success rate {rate:.3} is below the healthy minimum {MIN_HEALTHY_RATIO}"
            )
            .into());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub ok: bool,
    pub results: Vec<CheckResult>,
}

/// Runs all monitors concurrently and aggregates the verdict.
pub struct HealthService {
    monitors: Vec<Box<dyn Monitor>>,
}

impl HealthService {
    pub fn new(monitors: Vec<Box<dyn Monitor>>) -> Self {
        Self { monitors }
    }

    pub async fn check_all(&self) -> HealthReport {
        let checks = self.monitors.iter().map(|monitor| async {
            let ok = match monitor.check().await {
                Ok(()) => true,
                Err(err) => {
                    warn!(monitor = monitor.name(), error = %err, "health check failed");
                    false
                }
            };
            CheckResult {
                name: monitor.name().to_string(),
                ok,
            }
        });

        match tokio::time::timeout(CHECK_TIMEOUT, join_all(checks)).await {
            Ok(results) => HealthReport {
                ok: results.iter().all(|result| result.ok),
                results,
            },
            Err(_) => {
                warn!("health check round timed out");
                HealthReport {
                    ok: false,
                    results: Vec::new(),
                }
            }
        }
    }
}

/// Build the health router, exposing `GET /healthy`.
pub fn router(service: Arc<HealthService>) -> Router {
    Router::new()
        .route("/healthy", get(health_handler))
        .with_state(service)
}

/// Bind and serve the health endpoint until the token fires.
pub async fn serve(
    listen: &str,
    service: Arc<HealthService>,
    cancel: CancellationToken,
) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!(%listen, "health endpoint listening");
    axum::serve(listener, router(service))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
}

async fn health_handler(State(service): State<Arc<HealthService>>) -> impl IntoResponse {
    let report = service.check_all().await;
    let status = if report.ok {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(report))
}
