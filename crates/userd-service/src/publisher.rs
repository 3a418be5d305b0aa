//! The publisher pump: drains the store's outbox stream to the bus.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use userd_bus::{Bus, BusError};
use userd_store::{OutboxEntry, StoreError, UserStore};

use crate::monitor::SuccessRateMonitor;
use crate::service::UserService;
use crate::types::ChangeEvent;

#[derive(Debug, thiserror::Error)]
enum PublishError {
    #[error("encode: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("bus: {0}")]
    Bus(#[from] BusError),
    #[error("store: {0}")]
    Store(#[from] StoreError),
}

impl UserService {
    /// Drain outbox entries to the bus until `cancel` fires.
    ///
    /// Each claimed entry is published by an independent task with a
    /// deadline of one retry interval. Failures are only recorded against
    /// the monitor; the entry is never dropped, so the store's lease expiry
    /// re-surfaces it to some pump later.
    pub async fn publish_changes(&self, cancel: CancellationToken) {
        let mut events = self.store.events(
            cancel.child_token(),
            self.timing.min_poll,
            self.timing.max_poll,
            self.timing.retry_interval,
        );
        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                next = events.recv() => match next {
                    Some(result) => result,
                    None => break,
                },
            };
            match result {
                Err(err) => {
                    warn!(error = %err, "error receiving event from store");
                    self.monitor.record(false);
                }
                Ok(entry) => self.spawn_publish(cancel.clone(), entry),
            }
        }
    }

    fn spawn_publish(&self, cancel: CancellationToken, entry: OutboxEntry) {
        let store = Arc::clone(&self.store);
        let bus = Arc::clone(&self.bus);
        let monitor: Arc<SuccessRateMonitor> = Arc::clone(&self.monitor);
        let deadline = self.timing.retry_interval;
        tokio::spawn(async move {
            let publish = tokio::time::timeout(deadline, publish_one(store, bus, &entry));
            let ok = tokio::select! {
                _ = cancel.cancelled() => {
                    warn!(id = %entry.id, version = entry.version, "publish cancelled");
                    false
                }
                result = publish => match result {
                    Ok(Ok(())) => {
                        info!(
                            id = %entry.id,
                            version = entry.version,
                            action = entry.action.as_str(),
                            "published change event"
                        );
                        true
                    }
                    Ok(Err(err)) => {
                        warn!(
                            id = %entry.id,
                            version = entry.version,
                            error = %err,
                            "failed to publish change event"
                        );
                        false
                    }
                    Err(_) => {
                        warn!(
                            id = %entry.id,
                            version = entry.version,
                            "publish deadline exceeded"
                        );
                        false
                    }
                },
            };
            monitor.record(ok);
        });
    }
}

/// Send one event and, once the bus confirms it, drop the outbox head.
async fn publish_one(
    store: Arc<dyn UserStore>,
    bus: Arc<dyn Bus>,
    entry: &OutboxEntry,
) -> Result<(), PublishError> {
    let body = serde_json::to_vec(&ChangeEvent::from_entry(entry))?;
    let confirm = bus.send(body).await?;
    confirm.done().await?;
    store.process_event(entry.id, entry.version).await?;
    Ok(())
}
